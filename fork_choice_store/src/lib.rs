//! A block tree with [LMD GHOST] head selection.
//!
//! Blocks are added once and never removed. The tree is rooted at the anchor block the [`Store`]
//! was created with, which is usually the genesis block. There is no finality, so no part of the
//! tree is ever pruned.
//!
//! Each validator contributes at most one vote, the latest one by target epoch. A vote adds the
//! validator's effective balance in the anchor state to the voted block and all of its ancestors.
//! The head is found by starting at the anchor and repeatedly moving to the heaviest child.
//! Ties are broken in favor of the child with the greater root.
//!
//! State transitions are run outside the lock protecting the tree. Two threads may process the
//! same block concurrently. Only the first one to take the write lock inserts it.
//!
//! [LMD GHOST]: https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md

pub use crate::{
    error::Error,
    misc::{ChainLink, LatestMessage, Storage},
    store::{ForkChoiceStore, Store},
};

mod error;
mod misc;
mod store;
