use anyhow::{ensure, Result};
use ssz::SszHash;
use types::{
    config::Config,
    phase0::{
        containers::{ForkData, SigningData},
        primitives::{DomainType, Epoch, Slot, ValidatorIndex, Version, H256},
    },
    preset::Preset,
};

use crate::error::Error;

#[must_use]
pub const fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SLOTS_PER_EPOCH.get()
}

#[must_use]
pub const fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slot % P::SLOTS_PER_EPOCH.get() == 0
}

#[must_use]
pub const fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    epoch + 1 + P::MAX_SEED_LOOKAHEAD
}

// > Return the 32-byte fork data root for the ``current_version`` and ``genesis_validators_root``.
// > This is used primarily in signature domains to avoid collisions across forks/chains.
fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> H256 {
    let fork_version = fork_version.unwrap_or(config.genesis_fork_version);
    let genesis_validators_root = genesis_validators_root.unwrap_or_else(H256::zero);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = H256::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

#[must_use]
pub fn compute_signing_root(object: &(impl SszHash + ?Sized), domain: H256) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

/// Selects a proposer from `indices` by rotating through them one slot at a time.
///
/// Committee shuffling is not modeled.
pub fn compute_proposer_index(
    indices: &[ValidatorIndex],
    slot: Slot,
    epoch: Epoch,
) -> Result<ValidatorIndex> {
    ensure!(!indices.is_empty(), Error::NoActiveValidators { epoch });

    let position = usize::try_from(slot % u64::try_from(indices.len())?)?;

    Ok(indices[position])
}
