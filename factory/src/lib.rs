//! Signed blocks and attestations built on top of interop genesis states.
//!
//! Blocks are proposed by the validator selected for their slot and signed with its interop key.
//! Operations are applied without verifying signatures, so invalid attestations can be embedded
//! in otherwise valid blocks.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use bls::Signature;
use helper_functions::{accessors, misc, signing::SignForSingleFork, verifier::NullVerifier};
use itertools::Itertools as _;
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{
            Attestation, AttestationData, BeaconBlock, BeaconBlockBody, Checkpoint,
            SignedBeaconBlock,
        },
        primitives::{Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

/// Builds the smallest genesis state the configuration allows along with its genesis block.
#[must_use]
pub fn min_genesis_state<P: Preset>(config: &Config) -> (Arc<BeaconState>, Arc<SignedBeaconBlock>) {
    let genesis_state = interop::quick_start_beacon_state::<P>(
        config,
        config.min_genesis_time,
        config.min_genesis_active_validator_count,
    );

    let genesis_block = interop::genesis_block(&genesis_state);

    (Arc::new(genesis_state), Arc::new(genesis_block))
}

pub fn empty_block<P: Preset>(
    config: &Config,
    pre_state: Arc<BeaconState>,
    slot: Slot,
) -> Result<(Arc<SignedBeaconBlock>, Arc<BeaconState>)> {
    block::<P>(config, pre_state, slot, BeaconBlockBody::default())
}

/// Builds a block that differs from [`empty_block`] at the same slot only in its graffiti.
pub fn block_with_graffiti<P: Preset>(
    config: &Config,
    pre_state: Arc<BeaconState>,
    slot: Slot,
    graffiti: H256,
) -> Result<(Arc<SignedBeaconBlock>, Arc<BeaconState>)> {
    let body = BeaconBlockBody {
        graffiti,
        ..BeaconBlockBody::default()
    };

    block::<P>(config, pre_state, slot, body)
}

pub fn block_with_attestations<P: Preset>(
    config: &Config,
    pre_state: Arc<BeaconState>,
    slot: Slot,
    attestations: Vec<Attestation>,
) -> Result<(Arc<SignedBeaconBlock>, Arc<BeaconState>)> {
    let body = BeaconBlockBody {
        attestations,
        ..BeaconBlockBody::default()
    };

    block::<P>(config, pre_state, slot, body)
}

pub fn block<P: Preset>(
    config: &Config,
    pre_state: Arc<BeaconState>,
    slot: Slot,
    body: BeaconBlockBody,
) -> Result<(Arc<SignedBeaconBlock>, Arc<BeaconState>)> {
    let mut state = Arc::unwrap_or_clone(pre_state);

    if state.slot < slot {
        transition_functions::process_slots::<P>(config, &mut state, slot)?;
    }

    let proposer_index = accessors::get_beacon_proposer_index::<P>(&state)?;

    let mut block = BeaconBlock {
        slot,
        proposer_index,
        parent_root: state.latest_block_header.hash_tree_root(),
        state_root: H256::zero(),
        body,
    };

    transition_functions::process_block::<P>(config, &mut state, &block, NullVerifier)?;

    block.state_root = state.hash_tree_root();

    let secret_key = interop::secret_key(proposer_index);
    let signature = SignForSingleFork::<P>::sign(&block, config, &state, &secret_key);
    let signed_block = block.with_signature(signature.into());

    Ok((Arc::new(signed_block), Arc::new(state)))
}

/// Builds an attestation voting for `beacon_block_root` as both the head and the target.
///
/// The attesting indices are sorted and deduplicated.
pub fn attestation<P: Preset>(
    config: &Config,
    state: &BeaconState,
    beacon_block_root: H256,
    slot: Slot,
    attesting_indices: impl IntoIterator<Item = ValidatorIndex>,
) -> Result<Attestation> {
    let attesting_indices = attesting_indices
        .into_iter()
        .sorted_unstable()
        .dedup()
        .collect_vec();

    let data = AttestationData {
        slot,
        beacon_block_root,
        source: Checkpoint::default(),
        target: Checkpoint {
            epoch: misc::compute_epoch_at_slot::<P>(slot),
            root: beacon_block_root,
        },
    };

    let signature = attesting_indices
        .iter()
        .map(|validator_index| {
            let secret_key = interop::secret_key(*validator_index);
            SignForSingleFork::<P>::sign(&data, config, state, &secret_key)
        })
        .reduce(|mut aggregate: Signature, signature| {
            aggregate.aggregate_in_place(signature);
            aggregate
        })
        .ok_or_else(|| anyhow!("attestation must have at least one attester"))?;

    Ok(Attestation {
        attesting_indices,
        data,
        signature: signature.into(),
    })
}
