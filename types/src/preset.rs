use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use nonzero_ext::nonzero;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::phase0::primitives::Gwei;

/// Compile-time configuration variables.
///
/// See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets).
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    const NAME: PresetName;
    const SLOTS_PER_EPOCH: NonZeroU64;

    const EFFECTIVE_BALANCE_INCREMENT: NonZeroU64 = nonzero!(1_000_000_000_u64);
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_DEPOSIT_AMOUNT: Gwei = 1_000_000_000;
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    const NAME: PresetName = PresetName::Mainnet;
    const SLOTS_PER_EPOCH: NonZeroU64 = nonzero!(32_u64);
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    const NAME: PresetName = PresetName::Minimal;
    const SLOTS_PER_EPOCH: NonZeroU64 = nonzero!(8_u64);
}

#[derive(
    Clone, Copy, PartialEq, Eq, Default, Debug, Display, FromStr, Deserialize, Serialize,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    #[default]
    Mainnet,
    Minimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_names_match_their_presets() {
        assert_eq!(Mainnet::NAME.to_string(), "mainnet");
        assert_eq!(Minimal::NAME.to_string(), "minimal");
        assert_eq!("minimal".parse::<PresetName>().ok(), Some(PresetName::Minimal));
    }
}
