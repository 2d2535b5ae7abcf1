use anyhow::{ensure, Result};
use helper_functions::misc;
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{beacon_state::BeaconState, containers::BeaconBlock, primitives::Slot},
    preset::Preset,
};

use crate::{epoch_processing, error::Error};

pub enum ProcessSlots {
    Always,
    IfNeeded,
    Never,
}

impl ProcessSlots {
    #[must_use]
    pub fn should_process(self, state: &BeaconState, block: &BeaconBlock) -> bool {
        match self {
            Self::Always => true,
            // The test for equality is intentional. It ensures that blocks attempting to "rewind"
            // the state are rejected early by `process_slots`.
            Self::IfNeeded => state.slot != block.slot,
            Self::Never => false,
        }
    }
}

pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut BeaconState,
    slot: Slot,
) -> Result<()> {
    ensure!(
        state.slot < slot,
        Error::SlotNotLater {
            current: state.slot,
            target: slot,
        },
    );

    while state.slot < slot {
        process_slot(state);

        // > Process epoch on the start slot of the next epoch
        if misc::is_epoch_start::<P>(state.slot + 1) {
            epoch_processing::process_epoch::<P>(config, state)?;
        }

        state.slot += 1;
    }

    Ok(())
}

fn process_slot(state: &mut BeaconState) {
    // > Cache latest block header state root
    if state.latest_block_header.state_root.is_zero() {
        state.latest_block_header.state_root = state.hash_tree_root();
    }
}
