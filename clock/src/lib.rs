//! Wall-clock slot and epoch computation.
//!
//! Times before genesis map to the genesis slot. This matches how the chain treats the period
//! between the creation of the genesis state and the genesis time itself.

use core::time::Duration;
use std::time::SystemTime;

use anyhow::Result;
use helper_functions::misc;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Epoch, Slot, UnixSeconds},
    },
    preset::Preset,
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SlotTime {
    pub slot: Slot,
    /// Time elapsed since the start of `slot`.
    pub into_slot: Duration,
}

impl SlotTime {
    #[must_use]
    pub fn at_time(config: &Config, time: UnixSeconds, genesis_time: UnixSeconds) -> Self {
        Self::from_duration(config, Duration::from_secs(time), genesis_time)
    }

    pub fn current(config: &Config, genesis_time: UnixSeconds) -> Result<Self> {
        let duration_since_unix_epoch = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
        Ok(Self::from_duration(config, duration_since_unix_epoch, genesis_time))
    }

    #[must_use]
    pub const fn epoch<P: Preset>(self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }

    fn from_duration(
        config: &Config,
        duration_since_unix_epoch: Duration,
        genesis_time: UnixSeconds,
    ) -> Self {
        let unix_epoch_to_genesis = Duration::from_secs(genesis_time);

        // `Duration` does not implement `Div<Duration>` or `Rem<Duration>`,
        // so we have to do arithmetic on nanoseconds.
        let nanos_since_genesis = duration_since_unix_epoch
            .saturating_sub(unix_epoch_to_genesis)
            .as_nanos();

        let nanos_per_slot = slot_duration(config).as_nanos();
        let slots_since_genesis = u64::try_from(nanos_since_genesis / nanos_per_slot);
        let nanos_since_slot_start = u64::try_from(nanos_since_genesis % nanos_per_slot);

        Self {
            slot: GENESIS_SLOT.saturating_add(slots_since_genesis.unwrap_or(Slot::MAX)),
            into_slot: Duration::from_nanos(nanos_since_slot_start.unwrap_or_default()),
        }
    }
}

/// The epoch the wall clock is in, given the genesis time of the chain.
pub fn current_epoch<P: Preset>(config: &Config, genesis_time: UnixSeconds) -> Result<Epoch> {
    SlotTime::current(config, genesis_time).map(SlotTime::epoch::<P>)
}

#[must_use]
pub fn epoch_at_time<P: Preset>(
    config: &Config,
    time: UnixSeconds,
    genesis_time: UnixSeconds,
) -> Epoch {
    SlotTime::at_time(config, time, genesis_time).epoch::<P>()
}

#[must_use]
pub fn start_of_slot(config: &Config, genesis_time: UnixSeconds, slot: Slot) -> UnixSeconds {
    let slots_since_genesis = slot.saturating_sub(GENESIS_SLOT);
    genesis_time.saturating_add(slots_since_genesis.saturating_mul(config.seconds_per_slot.get()))
}

const fn slot_duration(config: &Config) -> Duration {
    Duration::from_secs(config.seconds_per_slot.get())
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use test_case::test_case;
    use types::preset::{Mainnet, Minimal};

    use super::*;

    #[test_case(100 => 0; "long before genesis")]
    #[test_case(777 => 0; "at genesis")]
    #[test_case(788 => 0; "11 seconds after genesis")]
    #[test_case(789 => 1; "12 seconds after genesis")]
    #[test_case(777 + 12 * 32 => 32; "first slot of epoch 1")]
    fn slot_at_time_with_mainnet_config(time: UnixSeconds) -> Slot {
        SlotTime::at_time(&Config::mainnet(), time, 777).slot
    }

    #[test_case(0 => 0)]
    #[test_case(6 * 8 - 1 => 0)]
    #[test_case(6 * 8 => 1)]
    #[test_case(6 * 8 * 100 => 100)]
    fn epoch_at_time_with_minimal_config(seconds_since_genesis: UnixSeconds) -> Epoch {
        epoch_at_time::<Minimal>(&Config::minimal(), 1000 + seconds_since_genesis, 1000)
    }

    #[test]
    fn time_into_slot_is_reported() {
        let slot_time = SlotTime::at_time(&Config::mainnet(), 777 + 12 * 3 + 5, 777);

        assert_eq!(slot_time.slot, 3);
        assert_eq!(slot_time.into_slot, Duration::from_secs(5));
        assert_eq!(slot_time.epoch::<Mainnet>(), 0);
    }

    #[test]
    fn start_of_slot_respects_seconds_per_slot() {
        let config = Config {
            seconds_per_slot: nonzero!(2_u64),
            ..Config::minimal()
        };

        assert_eq!(start_of_slot(&config, 50, 0), 50);
        assert_eq!(start_of_slot(&config, 50, 7), 64);
    }

    #[test]
    fn current_epoch_is_far_along_for_old_genesis() -> Result<()> {
        let config = Config::minimal();

        assert!(current_epoch::<Minimal>(&config, 0)? > 1000);
        assert_eq!(current_epoch::<Minimal>(&config, UnixSeconds::MAX)?, 0);

        Ok(())
    }
}
