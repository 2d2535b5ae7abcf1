use helper_functions::{accessors, predicates};
use serde::Serialize;
use types::{
    phase0::{
        beacon_state::BeaconState,
        consts::TIMELY_TARGET_FLAG,
        primitives::{Epoch, Gwei, ParticipationFlags},
    },
    preset::Preset,
};

/// Effective balances of active validators and of validators that attested to the correct target.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Serialize)]
pub struct Balances {
    pub current_epoch_active: Gwei,
    pub previous_epoch_active: Gwei,
    pub current_epoch_target_attesters: Gwei,
    pub previous_epoch_target_attesters: Gwei,
}

impl Balances {
    #[must_use]
    pub fn new<P: Preset>(state: &BeaconState) -> Self {
        let current_epoch = accessors::get_current_epoch::<P>(state);
        let previous_epoch = accessors::get_previous_epoch::<P>(state);

        Self {
            current_epoch_active: active_balance(state, current_epoch),
            previous_epoch_active: active_balance(state, previous_epoch),
            current_epoch_target_attesters: target_attesting_balance(
                state,
                current_epoch,
                &state.current_epoch_participation,
            ),
            previous_epoch_target_attesters: target_attesting_balance(
                state,
                previous_epoch,
                &state.previous_epoch_participation,
            ),
        }
    }
}

fn active_balance(state: &BeaconState, epoch: Epoch) -> Gwei {
    state
        .validators
        .iter()
        .filter(|validator| predicates::is_active_validator(validator, epoch))
        .map(|validator| validator.effective_balance)
        .sum()
}

fn target_attesting_balance(
    state: &BeaconState,
    epoch: Epoch,
    participation: &[ParticipationFlags],
) -> Gwei {
    state
        .validators
        .iter()
        .zip(participation)
        .filter(|(validator, flags)| {
            predicates::is_active_validator(validator, epoch)
                && !validator.slashed
                && *flags & TIMELY_TARGET_FLAG != 0
        })
        .map(|(validator, _)| validator.effective_balance)
        .sum()
}

#[cfg(test)]
mod tests {
    use types::{
        phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator},
        preset::Minimal,
    };

    use super::*;

    #[test]
    fn balances_count_only_target_attesters() {
        let validator = Validator {
            effective_balance: 32_000_000_000,
            exit_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        };

        let state = BeaconState {
            slot: 9,
            validators: vec![validator; 3],
            previous_epoch_participation: vec![TIMELY_TARGET_FLAG, 0, TIMELY_TARGET_FLAG],
            current_epoch_participation: vec![0, TIMELY_TARGET_FLAG, 0],
            ..BeaconState::default()
        };

        assert_eq!(
            Balances::new::<Minimal>(&state),
            Balances {
                current_epoch_active: 96_000_000_000,
                previous_epoch_active: 96_000_000_000,
                current_epoch_target_attesters: 32_000_000_000,
                previous_epoch_target_attesters: 64_000_000_000,
            },
        );
    }
}
