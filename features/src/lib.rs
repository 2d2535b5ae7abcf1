#![allow(
    unused_crate_dependencies,
    reason = "The `unused_crate_dependencies` lint checks every crate in a package separately. \
              See <https://github.com/rust-lang/rust/issues/57274>."
)]

use core::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};

use log::{info, warn};
use parse_display::{Display, FromStr};
use variant_count::VariantCount;

static FEATURES: [AtomicBool; Feature::VARIANT_COUNT] =
    [const { AtomicBool::new(false) }; Feature::VARIANT_COUNT];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, FromStr, VariantCount)]
pub enum Feature {
    // Blocks received through weighted paths become head without consulting fork choice.
    DisableForkChoice,
    // Blocks received during initial sync update the head in memory only.
    InitSyncCacheState,
    LogBlockProcessingTime,
}

impl Feature {
    // `Ordering::SeqCst` is slightly slower, but using other orderings could result in strange
    // behaviors. See the following for examples:
    // - <https://stackoverflow.com/questions/14861822/acquire-release-versus-sequentially-consistent-memory-order/14864466#14864466>
    // - <https://stackoverflow.com/questions/12340773/how-do-memory-order-seq-cst-and-memory-order-acq-rel-differ/12340924#12340924>
    const ORDERING: Ordering = Ordering::SeqCst;

    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        FEATURES[self as usize].load(Self::ORDERING)
    }

    #[inline]
    pub fn enable(self) {
        FEATURES[self as usize].store(true, Self::ORDERING)
    }

    #[inline]
    pub fn disable(self) {
        FEATURES[self as usize].store(false, Self::ORDERING)
    }

    pub fn log(self, message: impl Display) {
        info!("[{self}] {message}");
    }

    pub fn warn(self, message: impl Display) {
        warn!("[{self}] {message}");
    }
}

#[macro_export]
macro_rules! log {
    ($feature: ident, $($message: tt)+) => {{
        let feature = $crate::Feature::$feature;
        if feature.is_enabled() {
            feature.log(format_args!($($message)+))
        }
    }};
}
