use core::cmp::Ordering;

use anyhow::Result;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::FAR_FUTURE_EPOCH,
        primitives::{Gwei, ValidatorIndex},
    },
    preset::Preset,
};

use crate::{accessors, error::Error, misc};

pub fn balance(state: &mut BeaconState, validator_index: ValidatorIndex) -> Result<&mut Gwei> {
    usize::try_from(validator_index)
        .ok()
        .and_then(|index| state.balances.get_mut(index))
        .ok_or_else(|| Error::ValidatorIndexOutOfBounds { validator_index }.into())
}

pub fn increase_balance(balance: &mut Gwei, delta: Gwei) {
    *balance = balance.saturating_add(delta);
}

// > Initiate the exit of the validator with index ``index``.
pub fn initiate_validator_exit<P: Preset>(
    config: &Config,
    state: &mut BeaconState,
    validator_index: ValidatorIndex,
) -> Result<()> {
    // > Return if validator already initiated exit
    if accessors::get_validator(state, validator_index)?.exit_epoch != FAR_FUTURE_EPOCH {
        return Ok(());
    }

    // > Compute exit queue epoch
    let mut exit_queue_epoch =
        misc::compute_activation_exit_epoch::<P>(accessors::get_current_epoch::<P>(state));
    let mut exit_queue_churn = 0;

    for validator in &state.validators {
        let exit_epoch = validator.exit_epoch;

        if exit_epoch == FAR_FUTURE_EPOCH {
            continue;
        }

        match exit_epoch.cmp(&exit_queue_epoch) {
            Ordering::Less => {}
            Ordering::Equal => exit_queue_churn += 1,
            Ordering::Greater => {
                exit_queue_epoch = exit_epoch;
                exit_queue_churn = 1;
            }
        }
    }

    if exit_queue_churn >= accessors::get_validator_churn_limit::<P>(config, state) {
        exit_queue_epoch += 1;
    }

    // > Set validator exit epoch and withdrawable epoch
    let withdrawable_epoch = exit_queue_epoch + config.min_validator_withdrawability_delay;
    let index = usize::try_from(validator_index)?;
    let validator = &mut state.validators[index];

    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = withdrawable_epoch;

    Ok(())
}

#[cfg(test)]
mod tests {
    use types::{phase0::containers::Validator, preset::Minimal};

    use super::*;

    fn state_with_active_validators(count: usize) -> BeaconState {
        BeaconState {
            validators: vec![
                Validator {
                    exit_epoch: FAR_FUTURE_EPOCH,
                    withdrawable_epoch: FAR_FUTURE_EPOCH,
                    ..Validator::default()
                };
                count
            ],
            balances: vec![0; count],
            ..BeaconState::default()
        }
    }

    #[test]
    fn exits_are_queued_after_seed_lookahead() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_with_active_validators(4);

        initiate_validator_exit::<Minimal>(&config, &mut state, 1)?;

        assert_eq!(state.validators[1].exit_epoch, 5);
        assert_eq!(state.validators[1].withdrawable_epoch, 261);
        assert_eq!(state.validators[0].exit_epoch, FAR_FUTURE_EPOCH);

        Ok(())
    }

    #[test]
    fn exits_beyond_churn_limit_move_to_next_epoch() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_with_active_validators(4);

        for validator_index in 0..3 {
            initiate_validator_exit::<Minimal>(&config, &mut state, validator_index)?;
        }

        assert_eq!(state.validators[0].exit_epoch, 5);
        assert_eq!(state.validators[1].exit_epoch, 5);
        assert_eq!(state.validators[2].exit_epoch, 6);

        Ok(())
    }

    #[test]
    fn second_exit_is_a_no_op() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_with_active_validators(2);

        initiate_validator_exit::<Minimal>(&config, &mut state, 0)?;
        let after_first = state.clone();
        initiate_validator_exit::<Minimal>(&config, &mut state, 0)?;

        assert_eq!(state, after_first);

        Ok(())
    }

    #[test]
    fn balance_fails_for_unknown_index() -> Result<()> {
        let mut state = state_with_active_validators(1);

        increase_balance(balance(&mut state, 0)?, 5);

        assert_eq!(state.balances, [5]);

        balance(&mut state, 1).expect_err("only one balance exists");

        Ok(())
    }
}
