use anyhow::Result;
use helper_functions::{accessors, misc, mutators, predicates};
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{beacon_state::BeaconState, primitives::ValidatorIndex},
    preset::Preset,
};

/// Epoch processing without justification, rewards or slashings.
pub fn process_epoch<P: Preset>(config: &Config, state: &mut BeaconState) -> Result<()> {
    process_registry_updates::<P>(config, state)?;
    process_effective_balance_updates::<P>(state);
    process_participation_flag_updates(state);
    Ok(())
}

fn process_registry_updates<P: Preset>(config: &Config, state: &mut BeaconState) -> Result<()> {
    let current_epoch = accessors::get_current_epoch::<P>(state);
    let mut ejected = vec![];

    // > Process activation eligibility and ejections
    for (validator_index, validator) in (0..).zip(&mut state.validators) {
        if predicates::is_eligible_for_activation_queue::<P>(validator) {
            validator.activation_eligibility_epoch = current_epoch + 1;
        }

        if predicates::is_active_validator(validator, current_epoch)
            && validator.effective_balance <= config.ejection_balance
        {
            ejected.push(validator_index);
        }
    }

    for validator_index in ejected {
        mutators::initiate_validator_exit::<P>(config, state, validator_index)?;
    }

    // > Queue validators eligible for activation and not yet dequeued for activation
    let churn_limit = accessors::get_validator_churn_limit::<P>(config, state);

    let activation_queue = (0..)
        .zip(&state.validators)
        .filter(|(_, validator)| predicates::is_eligible_for_activation(validator, current_epoch))
        .sorted_by_key(|(index, validator)| (validator.activation_eligibility_epoch, *index))
        .map(|(index, _): (ValidatorIndex, _)| index)
        .take(usize::try_from(churn_limit)?)
        .collect_vec();

    // > Dequeued validators for activation up to churn limit
    let activation_epoch = misc::compute_activation_exit_epoch::<P>(current_epoch);

    for validator_index in activation_queue {
        state.validators[usize::try_from(validator_index)?].activation_epoch = activation_epoch;
    }

    Ok(())
}

/// Effective balances follow balances without hysteresis.
fn process_effective_balance_updates<P: Preset>(state: &mut BeaconState) {
    let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();

    for (validator, balance) in state.validators.iter_mut().zip(&state.balances) {
        validator.effective_balance = (balance - balance % increment).min(P::MAX_EFFECTIVE_BALANCE);
    }
}

fn process_participation_flag_updates(state: &mut BeaconState) {
    state.previous_epoch_participation = core::mem::replace(
        &mut state.current_epoch_participation,
        vec![0; state.validators.len()],
    );
}
