use std::collections::BTreeMap;

use features::Feature;
use helper_functions::misc;
use parking_lot::Mutex;
use transition_functions::Balances;
use types::{
    phase0::{
        beacon_state::BeaconState,
        primitives::{Epoch, Slot},
    },
    preset::Preset,
};

/// Toggles that change how blocks are received.
///
/// Read once when the [`Controller`] is created.
///
/// [`Controller`]: crate::Controller
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ReceiverConfig {
    /// Blocks received through weighted paths become head unconditionally.
    pub disable_fork_choice: bool,
    /// Blocks received without verification replace the head in memory only.
    pub init_sync_cache_state: bool,
}

impl ReceiverConfig {
    #[must_use]
    pub fn from_features() -> Self {
        Self {
            disable_fork_choice: Feature::DisableForkChoice.is_enabled(),
            init_sync_cache_state: Feature::InitSyncCacheState.is_enabled(),
        }
    }
}

/// Balances observed after the most recent block processed in each epoch.
#[derive(Default)]
pub struct EpochParticipation {
    balances: Mutex<BTreeMap<Epoch, Balances>>,
}

impl EpochParticipation {
    /// Overwrites the entry for the epoch of `slot` with balances computed from `state`.
    pub fn record<P: Preset>(&self, slot: Slot, state: &BeaconState) {
        let epoch = misc::compute_epoch_at_slot::<P>(slot);
        let balances = Balances::new::<P>(state);

        self.balances.lock().insert(epoch, balances);
    }

    #[must_use]
    pub fn get(&self, epoch: Epoch) -> Option<Balances> {
        self.balances.lock().get(&epoch).copied()
    }

    #[must_use]
    pub fn epochs(&self) -> Vec<Epoch> {
        self.balances.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use types::{
        phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator},
        preset::Minimal,
    };

    use super::*;

    fn state_with_balances(slot: Slot, effective_balances: &[u64]) -> BeaconState {
        let validators = effective_balances
            .iter()
            .map(|effective_balance| Validator {
                effective_balance: *effective_balance,
                exit_epoch: FAR_FUTURE_EPOCH,
                withdrawable_epoch: FAR_FUTURE_EPOCH,
                ..Validator::default()
            })
            .collect();

        BeaconState {
            slot,
            validators,
            ..BeaconState::default()
        }
    }

    #[test]
    fn later_blocks_overwrite_earlier_ones_in_same_epoch() {
        let participation = EpochParticipation::default();

        participation.record::<Minimal>(1, &state_with_balances(1, &[10]));
        participation.record::<Minimal>(2, &state_with_balances(2, &[10, 20]));

        assert_eq!(participation.epochs(), [0]);
        assert_eq!(
            participation.get(0).map(|balances| balances.current_epoch_active),
            Some(30),
        );
    }

    #[test]
    fn entries_are_keyed_by_epoch_of_slot() {
        let participation = EpochParticipation::default();

        // Epochs in the minimal preset are 8 slots long.
        participation.record::<Minimal>(7, &state_with_balances(7, &[1]));
        participation.record::<Minimal>(8, &state_with_balances(8, &[1]));
        participation.record::<Minimal>(17, &state_with_balances(17, &[1]));

        assert_eq!(participation.epochs(), [0, 1, 2]);
        assert_eq!(participation.get(3), None);
    }

    #[test]
    fn configuration_follows_features() {
        Feature::DisableForkChoice.enable();

        let config = ReceiverConfig::from_features();

        Feature::DisableForkChoice.disable();

        assert!(config.disable_fork_choice);
        assert!(!ReceiverConfig::from_features().disable_fork_choice);
    }
}
