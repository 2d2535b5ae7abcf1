//! Block receipt on top of the fork choice store.
//!
//! This crate handles the following concerns:
//! - [Receiving blocks](`BlockReceiver`) through four entry points that differ in how much work
//!   they do and how much they trust the block.
//! - [Tracking the head](`HeadTracker`) and [persisting it](`HeadPersistence`).
//! - [Persistence](`DatabaseStorage`) of blocks, their post-states and the head pointer.
//! - Feeding attestations collected from blocks back into fork choice.
//! - Notifying other components of the application about processed blocks and new heads.
//! - Per-epoch participation bookkeeping.

pub use crate::{
    block_receiver::BlockReceiver,
    controller::Controller,
    error::{ReceiveError, Stage},
    events::{BlockProcessedEvent, Event, EventChannels, HeadEvent, Topic, DEFAULT_MAX_EVENTS},
    head::{ChainHead, DurableHead, HeadPersistence, HeadTracker, InMemoryHead},
    messages::P2pMessage,
    misc::{EpochParticipation, ReceiverConfig},
    storage::{get, save, BlockByRoot, DatabaseStorage, HeadBlockRoot, StateByBlockRoot},
    unbounded_sink::UnboundedSink,
};

mod block_receiver;
mod controller;
mod error;
mod events;
mod head;
mod messages;
mod misc;
mod storage;
mod unbounded_sink;

#[cfg(test)]
mod helpers;
