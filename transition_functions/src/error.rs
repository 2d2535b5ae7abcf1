use thiserror::Error;
use types::phase0::primitives::{Epoch, Slot, ValidatorIndex, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "attestation in slot {attestation_slot} is outside \
         inclusion range for state at slot {state_slot}"
    )]
    AttestationOutsideInclusionRange {
        state_slot: Slot,
        attestation_slot: Slot,
    },
    #[error("attestation has no attesting indices")]
    AttestationHasNoAttestingIndices,
    #[error("attestation votes for a checkpoint in the wrong epoch (target_epoch: {target_epoch})")]
    AttestationTargetsWrongEpoch { target_epoch: Epoch },
    #[error("attesting indices are not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error("block is not newer than latest block header ({block_slot} <= {block_header_slot})")]
    BlockNotNewerThanLatestBlockHeader {
        block_slot: Slot,
        block_header_slot: Slot,
    },
    #[error("block parent root ({in_block:?}) does not match latest block header ({computed:?})")]
    ParentRootMismatch { computed: H256, in_block: H256 },
    #[error("proposer (validator {index}) is slashed")]
    ProposerSlashed { index: ValidatorIndex },
    #[error("proposer index is incorrect (in_block: {in_block}, computed: {computed})")]
    ProposerIndexMismatch {
        in_block: ValidatorIndex,
        computed: ValidatorIndex,
    },
    #[error("block slot ({block_slot}) does not match state slot ({state_slot})")]
    SlotMismatch { state_slot: Slot, block_slot: Slot },
    #[error("target slot ({target}) is not later than current slot ({current})")]
    SlotNotLater { current: Slot, target: Slot },
    #[error("state root in block ({in_block:?}) does not match state ({computed:?})")]
    StateRootMismatch { computed: H256, in_block: H256 },
    #[error("block contains too many {kind} (maximum: {maximum}, in_block: {in_block})")]
    TooManyOperations {
        kind: &'static str,
        maximum: usize,
        in_block: usize,
    },
    #[error("validator {index} exited in epoch {exit_epoch}")]
    ValidatorAlreadyExited {
        index: ValidatorIndex,
        exit_epoch: Epoch,
    },
    #[error(
        "validator {index} has not been active long enough \
         (activation_epoch: {activation_epoch}, current_epoch: {current_epoch})"
    )]
    ValidatorHasNotBeenActiveLongEnough {
        index: ValidatorIndex,
        activation_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error("validator {index} is not active in epoch {current_epoch}")]
    ValidatorNotActive {
        index: ValidatorIndex,
        current_epoch: Epoch,
    },
    #[error("voluntary exit is expired (epoch: {epoch}, current_epoch: {current_epoch})")]
    VoluntaryExitIsExpired { epoch: Epoch, current_epoch: Epoch },
}
