use thiserror::Error;
use types::phase0::primitives::{Epoch, Slot, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation has no attesting indices (beacon_block_root: {beacon_block_root:?})")]
    AttestationHasNoAttestingIndices { beacon_block_root: H256 },
    #[error(
        "attestation votes for a block from the future \
         (beacon_block_root: {beacon_block_root:?}, attestation_slot: {attestation_slot}, \
         block_slot: {block_slot})"
    )]
    AttestationForFutureBlock {
        beacon_block_root: H256,
        attestation_slot: Slot,
        block_slot: Slot,
    },
    #[error(
        "attestation votes for a checkpoint in the wrong epoch \
         (attestation_slot: {attestation_slot}, target_epoch: {target_epoch})"
    )]
    AttestationTargetsWrongEpoch {
        attestation_slot: Slot,
        target_epoch: Epoch,
    },
    #[error("attestation votes for an unknown block: {beacon_block_root:?}")]
    AttestationForUnknownBlock { beacon_block_root: H256 },
    #[error(
        "block is from the future \
         (block_root: {block_root:?}, slot: {slot}, current_slot: {current_slot})"
    )]
    BlockFromFuture {
        block_root: H256,
        slot: Slot,
        current_slot: Slot,
    },
    #[error("block's parent is unknown (block_root: {block_root:?}, parent_root: {parent_root:?})")]
    UnknownParent { block_root: H256, parent_root: H256 },
}
