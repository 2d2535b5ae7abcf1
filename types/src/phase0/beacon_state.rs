use serde::{Deserialize, Serialize};
use ssz::SszHash;

use crate::phase0::{
    consts::VALIDATOR_REGISTRY_LIMIT,
    containers::{BeaconBlockHeader, Fork, Validator},
    primitives::{Gwei, ParticipationFlags, Slot, UnixSeconds, H256},
};

/// Chain state after processing a block.
///
/// Participation is tracked with per-validator flags as in Altair rather than with pending
/// attestations as in Phase 0.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconState {
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
    pub slot: Slot,
    pub fork: Fork,
    pub latest_block_header: BeaconBlockHeader,
    pub validators: Vec<Validator>,
    pub balances: Vec<Gwei>,
    pub previous_epoch_participation: Vec<ParticipationFlags>,
    pub current_epoch_participation: Vec<ParticipationFlags>,
}

impl SszHash for BeaconState {
    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_fields(&[
            self.genesis_time.hash_tree_root(),
            self.genesis_validators_root,
            self.slot.hash_tree_root(),
            self.fork.hash_tree_root(),
            self.latest_block_header.hash_tree_root(),
            self.validators_root(),
            ssz::hash_packed_u64_list(&self.balances, VALIDATOR_REGISTRY_LIMIT),
            ssz::hash_packed_bytes_list(
                &self.previous_epoch_participation,
                VALIDATOR_REGISTRY_LIMIT,
            ),
            ssz::hash_packed_bytes_list(
                &self.current_epoch_participation,
                VALIDATOR_REGISTRY_LIMIT,
            ),
        ])
    }
}

impl BeaconState {
    #[must_use]
    pub fn validators_root(&self) -> H256 {
        ssz::hash_composite_list(&self.validators, VALIDATOR_REGISTRY_LIMIT)
    }

    #[must_use]
    pub fn validator(&self, validator_index: u64) -> Option<&Validator> {
        usize::try_from(validator_index)
            .ok()
            .and_then(|index| self.validators.get(index))
    }
}
