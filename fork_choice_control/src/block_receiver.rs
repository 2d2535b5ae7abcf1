use std::sync::Arc;

use fork_choice_store::ForkChoiceStore;
use log::debug;
use types::{phase0::containers::SignedBeaconBlock, preset::Preset};

use crate::{
    controller::Controller, error::ReceiveError, messages::P2pMessage,
    unbounded_sink::UnboundedSink,
};

/// Entry points for blocks entering the node.
///
/// | Method                                   | Broadcast | Votes in block | Signatures | Head update               |
/// | ---------------------------------------- | --------- | -------------- | ---------- | ------------------------- |
/// | `receive_block`                          | yes       | applied        | verified   | fork choice               |
/// | `receive_block_no_pubsub`                | no        | applied        | verified   | fork choice               |
/// | `receive_block_no_pubsub_no_fork_choice` | no        | ignored        | verified   | if not already head       |
/// | `receive_block_no_verify`                | no        | ignored        | skipped    | if not already head       |
///
/// Errors after the state transition leave the block in the fork choice store.
/// See [`ReceiveError::is_accepted`].
pub trait BlockReceiver {
    /// Publishes the block to peers before processing it like
    /// [`BlockReceiver::receive_block_no_pubsub`]. Nothing is processed if publishing fails.
    fn receive_block(&self, block: SignedBeaconBlock) -> Result<(), ReceiveError>;

    /// Hands the attestations in the block to the attestation pool after processing it.
    /// Failing to do so is logged and does not fail the call, but skips slot metrics,
    /// participation bookkeeping and the `processed_blocks_no_pubsub` counter.
    fn receive_block_no_pubsub(&self, block: SignedBeaconBlock) -> Result<(), ReceiveError>;

    fn receive_block_no_pubsub_no_fork_choice(
        &self,
        block: SignedBeaconBlock,
    ) -> Result<(), ReceiveError>;

    fn receive_block_no_verify(&self, block: SignedBeaconBlock) -> Result<(), ReceiveError>;
}

impl<P, F, N> BlockReceiver for Controller<P, F, N>
where
    P: Preset,
    F: ForkChoiceStore,
    N: UnboundedSink<P2pMessage>,
{
    fn receive_block(&self, block: SignedBeaconBlock) -> Result<(), ReceiveError> {
        let block = Arc::new(block);

        self.broadcast(&block)?;

        debug!("broadcast block (slot: {})", block.message.slot);

        receive_weighted(self, block)?;

        if let Some(metrics) = self.metrics() {
            metrics.processed_blocks.inc();
        }

        Ok(())
    }

    fn receive_block_no_pubsub(&self, block: SignedBeaconBlock) -> Result<(), ReceiveError> {
        receive_weighted(self, Arc::new(block))
    }

    fn receive_block_no_pubsub_no_fork_choice(
        &self,
        block: SignedBeaconBlock,
    ) -> Result<(), ReceiveError> {
        let processed = self.process_without_fork_choice(Arc::new(block))?;

        self.finish(&processed);

        if let Some(metrics) = self.metrics() {
            metrics.processed_blocks_no_pubsub_no_fork_choice.inc();
        }

        Ok(())
    }

    fn receive_block_no_verify(&self, block: SignedBeaconBlock) -> Result<(), ReceiveError> {
        let processed = self.process_unverified(Arc::new(block))?;

        self.finish(&processed);

        if let Some(metrics) = self.metrics() {
            metrics.processed_blocks_no_verify.inc();
        }

        Ok(())
    }
}

fn receive_weighted<P, F, N>(
    controller: &Controller<P, F, N>,
    block: Arc<SignedBeaconBlock>,
) -> Result<(), ReceiveError>
where
    P: Preset,
    F: ForkChoiceStore,
    N: UnboundedSink<P2pMessage>,
{
    let processed = controller.process_weighted(block)?;

    if !controller.save_block_attestations(&processed) {
        return Ok(());
    }

    controller.finish(&processed);

    if let Some(metrics) = controller.metrics() {
        metrics.processed_blocks_no_pubsub.inc();
    }

    Ok(())
}
