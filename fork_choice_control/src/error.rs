use anyhow::Error as AnyhowError;
use parse_display::Display;
use thiserror::Error;
use types::phase0::primitives::H256;

/// The step of block receipt that failed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(style = "snake_case")]
pub enum Stage {
    Broadcast,
    Transition,
    HeadQuery,
    HeadLoad,
    HeadSave,
}

/// Failures of [`BlockReceiver`] methods.
///
/// Effects of steps that completed before the failure are not undone.
/// A block that passed the state transition stays in the fork choice store even if updating the
/// head failed afterwards. See [`ReceiveError::is_accepted`].
///
/// [`BlockReceiver`]: crate::BlockReceiver
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("could not broadcast block")]
    BroadcastFailed,
    #[error("could not process block from fork choice service: {cause:#}")]
    TransitionFailed {
        #[source]
        cause: AnyhowError,
    },
    #[error("could not get head from fork choice service: {cause:#}")]
    HeadQueryFailed {
        #[source]
        cause: AnyhowError,
    },
    #[error("could not load head from storage: {cause:#}")]
    HeadLoadFailed {
        #[source]
        cause: AnyhowError,
    },
    #[error("could not save head: {cause:#}")]
    HeadSaveFailed {
        #[source]
        cause: AnyhowError,
    },
    #[error("head block {block_root:?} not found in storage")]
    NilHeadBlock { block_root: H256 },
}

impl ReceiveError {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::BroadcastFailed => Stage::Broadcast,
            Self::TransitionFailed { .. } => Stage::Transition,
            Self::HeadQueryFailed { .. } => Stage::HeadQuery,
            Self::HeadLoadFailed { .. } | Self::NilHeadBlock { .. } => Stage::HeadLoad,
            Self::HeadSaveFailed { .. } => Stage::HeadSave,
        }
    }

    /// Whether the block made it into the fork choice store before the failure.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        !matches!(self, Self::BroadcastFailed | Self::TransitionFailed { .. })
    }
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("anchor block {block_root:?} is not in the fork choice store")]
    AnchorNotInStore { block_root: H256 },
    #[error("post-state of head block {block_root:?} is not available")]
    HeadStateNotFound { block_root: H256 },
}
