use anyhow::{ensure, Result};
use helper_functions::{
    accessors,
    error::SignatureKind,
    signing::SignForSingleFork,
    verifier::Verifier,
};
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, SignedBeaconBlock},
    },
    preset::Preset,
};

use crate::{block_processing, error::Error, slot_processing, ProcessSlots};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

impl StateRootPolicy {
    fn verify(self, state: &BeaconState, block: &BeaconBlock) -> Result<()> {
        match self {
            Self::Verify => {
                let computed = state.hash_tree_root();
                let in_block = block.state_root;

                ensure!(
                    computed == in_block,
                    Error::StateRootMismatch { computed, in_block },
                );
            }
            Self::Trust => {}
        }

        Ok(())
    }
}

pub fn state_transition<P: Preset, V: Verifier>(
    config: &Config,
    state: &mut BeaconState,
    signed_block: &SignedBeaconBlock,
    process_slots: ProcessSlots,
    state_root_policy: StateRootPolicy,
    mut verifier: V,
) -> Result<()> {
    let block = &signed_block.message;

    block_processing::validate_operation_counts(&block.body)?;

    // > Process slots (including those with no blocks) since block
    if process_slots.should_process(state, block) {
        slot_processing::process_slots::<P>(config, state, block.slot)?;
    }

    // > Verify signature
    if !V::IS_NULL {
        verify_block_signature::<P>(config, state, signed_block, &mut verifier)?;
    }

    // > Process block
    block_processing::process_block::<P>(config, state, block, &mut verifier)?;

    // > Verify state root
    state_root_policy.verify(state, block)
}

pub fn verify_block_signature<P: Preset>(
    config: &Config,
    state: &BeaconState,
    signed_block: &SignedBeaconBlock,
    mut verifier: impl Verifier,
) -> Result<()> {
    let block = &signed_block.message;

    verifier.verify_singular(
        SignForSingleFork::<P>::signing_root(block, config, state),
        signed_block.signature,
        &accessors::public_key(state, block.proposer_index)?,
        SignatureKind::Block,
    )
}
