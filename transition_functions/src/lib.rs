pub use crate::{
    block_processing::{process_block, process_voluntary_exit, validate_operation_counts},
    epoch_intermediates::Balances,
    error::Error,
    slot_processing::{process_slots, ProcessSlots},
    state_transition::{state_transition, verify_block_signature, StateRootPolicy},
};

mod block_processing;
mod epoch_intermediates;
mod epoch_processing;
mod error;
mod slot_processing;
mod state_transition;
