use core::num::NonZeroU64;
use std::borrow::Cow;

use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};

use crate::{
    phase0::primitives::{Epoch, UnixSeconds, Version, H32},
    preset::PresetName,
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/configs).
/// Only the variables used by block processing and exit validation are present.
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
             `Config` has no invariants. It is intended to be deserialized from user input. \
              The `unsafe` block in `nonzero!` only operates on the literal passed to it."
)]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    pub genesis_delay: u64,
    pub genesis_fork_version: Version,
    pub min_genesis_active_validator_count: NonZeroU64,
    pub min_genesis_time: UnixSeconds,

    // Time parameters
    pub min_validator_withdrawability_delay: Epoch,
    pub seconds_per_slot: NonZeroU64,
    pub shard_committee_period: Epoch,

    // Validator cycle
    pub churn_limit_quotient: NonZeroU64,
    pub ejection_balance: u64,
    pub min_per_epoch_churn_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Use `default` as the default `config_name` and override it in `Config::mainnet`.
            // This way custom network data will be kept separate from mainnet data if a user
            // forgets to specify a custom `CONFIG_NAME`.
            config_name: Cow::Borrowed("default"),
            preset_base: PresetName::Mainnet,

            // Genesis
            genesis_delay: 604_800,
            genesis_fork_version: H32(hex!("00000000")),
            min_genesis_active_validator_count: nonzero!(1_u64 << 14),
            min_genesis_time: 0,

            // Time parameters
            min_validator_withdrawability_delay: 256,
            seconds_per_slot: nonzero!(12_u64),
            shard_committee_period: 256,

            // Validator cycle
            churn_limit_quotient: nonzero!(65536_u64),
            ejection_balance: 16_000_000_000,
            min_per_epoch_churn_limit: 4,
        }
    }
}

impl Config {
    /// [Mainnet configuration](https://github.com/ethereum/consensus-specs/blob/aac851f860fa384916f62027b2dbe3318a354c5b/configs/mainnet.yaml).
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            min_genesis_time: 1_606_824_000,
            ..Self::default()
        }
    }

    /// [Minimal configuration](https://github.com/ethereum/consensus-specs/blob/aac851f860fa384916f62027b2dbe3318a354c5b/configs/minimal.yaml).
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Genesis
            genesis_delay: 300,
            genesis_fork_version: H32(hex!("00000001")),
            min_genesis_active_validator_count: nonzero!(64_u64),
            min_genesis_time: 1_578_009_600,

            // Time parameters
            seconds_per_slot: nonzero!(6_u64),
            shard_committee_period: 64,

            // Validator cycle
            churn_limit_quotient: nonzero!(32_u64),
            min_per_epoch_churn_limit: 2,

            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variables_take_default_values() -> Result<(), serde_json::Error> {
        let config = serde_json::from_str::<Config>(
            r#"{"CONFIG_NAME": "custom", "PRESET_BASE": "minimal", "SHARD_COMMITTEE_PERIOD": 2048}"#,
        )?;

        assert_eq!(
            config,
            Config {
                config_name: Cow::Borrowed("custom"),
                preset_base: PresetName::Minimal,
                shard_committee_period: 2048,
                ..Config::default()
            },
        );

        Ok(())
    }

    #[test]
    fn minimal_config_uses_shorter_slots() {
        assert_eq!(Config::minimal().seconds_per_slot, nonzero!(6_u64));
        assert_eq!(Config::mainnet().seconds_per_slot, nonzero!(12_u64));
    }
}
