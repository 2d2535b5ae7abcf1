use types::{
    phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator, primitives::Epoch},
    preset::Preset,
};

// > Check if ``validator`` is active.
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// > Check if ``validator`` is eligible to be placed into the activation queue.
#[must_use]
pub const fn is_eligible_for_activation_queue<P: Preset>(validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
}

/// Finality is not tracked, so a validator is eligible as soon as its eligibility epoch has passed.
#[must_use]
pub const fn is_eligible_for_activation(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_eligibility_epoch < epoch && validator.activation_epoch == FAR_FUTURE_EPOCH
}

#[must_use]
pub fn is_sorted_and_unique<T: Ord>(values: &[T]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::preset::Minimal;

    use super::*;

    #[test_case(0, FAR_FUTURE_EPOCH, 0 => true)]
    #[test_case(1, FAR_FUTURE_EPOCH, 0 => false)]
    #[test_case(0, 5, 4 => true)]
    #[test_case(0, 5, 5 => false)]
    fn is_active_validator_respects_bounds(
        activation_epoch: Epoch,
        exit_epoch: Epoch,
        epoch: Epoch,
    ) -> bool {
        let validator = Validator {
            activation_epoch,
            exit_epoch,
            ..Validator::default()
        };

        is_active_validator(&validator, epoch)
    }

    #[test]
    fn fully_funded_new_validator_enters_activation_queue() {
        let validator = Validator {
            activation_eligibility_epoch: FAR_FUTURE_EPOCH,
            activation_epoch: FAR_FUTURE_EPOCH,
            effective_balance: 32_000_000_000,
            ..Validator::default()
        };

        assert!(is_eligible_for_activation_queue::<Minimal>(&validator));
        assert!(!is_eligible_for_activation(&validator, 3));
    }

    #[test_case(&[] => true)]
    #[test_case(&[1, 2, 5] => true)]
    #[test_case(&[1, 1] => false)]
    #[test_case(&[2, 1] => false)]
    fn is_sorted_and_unique_detects_duplicates(values: &[u64]) -> bool {
        is_sorted_and_unique(values)
    }
}
