use anyhow::Result;
use bls::PublicKey;
use tap::TryConv as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::GENESIS_EPOCH,
        containers::Validator,
        primitives::{DomainType, Epoch, Gwei, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub const fn get_current_epoch<P: Preset>(state: &BeaconState) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot)
}

#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &BeaconState) -> Epoch {
    get_current_epoch::<P>(state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

pub fn get_validator(state: &BeaconState, validator_index: ValidatorIndex) -> Result<&Validator> {
    state
        .validator(validator_index)
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
}

pub fn active_validator_indices(
    state: &BeaconState,
    epoch: Epoch,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    (0..)
        .zip(&state.validators)
        .filter(move |(_, validator)| predicates::is_active_validator(validator, epoch))
        .map(|(index, _)| index)
}

// > Return the combined effective balance of the active validators.
// > Note: ``get_total_balance`` returns ``EFFECTIVE_BALANCE_INCREMENT`` Gwei minimum to avoid
// > divisions by zero.
#[must_use]
pub fn get_total_active_balance<P: Preset>(state: &BeaconState, epoch: Epoch) -> Gwei {
    state
        .validators
        .iter()
        .filter(|validator| predicates::is_active_validator(validator, epoch))
        .map(|validator| validator.effective_balance)
        .sum::<Gwei>()
        .max(P::EFFECTIVE_BALANCE_INCREMENT.get())
}

pub fn get_beacon_proposer_index<P: Preset>(state: &BeaconState) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch::<P>(state);
    let indices = active_validator_indices(state, epoch).collect::<Vec<_>>();
    misc::compute_proposer_index(&indices, state.slot, epoch)
}

#[must_use]
pub fn get_validator_churn_limit<P: Preset>(config: &Config, state: &BeaconState) -> u64 {
    let active_validator_count = active_validator_indices(state, get_current_epoch::<P>(state))
        .count()
        .try_conv::<u64>()
        .unwrap_or(u64::MAX);

    (active_validator_count / config.churn_limit_quotient).max(config.min_per_epoch_churn_limit)
}

#[must_use]
pub fn get_domain<P: Preset>(
    config: &Config,
    state: &BeaconState,
    domain_type: DomainType,
    epoch: Option<Epoch>,
) -> H256 {
    let epoch = epoch.unwrap_or_else(|| get_current_epoch::<P>(state));
    let fork = state.fork;

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    misc::compute_domain(
        config,
        domain_type,
        Some(fork_version),
        Some(state.genesis_validators_root),
    )
}

pub fn public_key(state: &BeaconState, validator_index: ValidatorIndex) -> Result<PublicKey> {
    let validator = get_validator(state, validator_index)?;
    Ok(PublicKey::try_from(validator.pubkey)?)
}
