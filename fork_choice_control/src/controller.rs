// The controller owns everything block receipt touches besides the fork choice store itself:
// the cached head, durable storage, the attestation pool, notification channels and bookkeeping.
// The store is an internally synchronized service. The controller never holds a lock across calls
// to it, so blocks may be received from many threads at once. Replacing the head is a
// compare-and-swap against the head a decision was based on. A receiver that loses the race
// decides again against the new head.

use core::marker::PhantomData;
use std::{sync::Arc, time::Instant};

use anyhow::{anyhow, ensure, Result};
use fork_choice_store::{ForkChoiceStore, Storage};
use log::{debug, error, warn};
use operation_pools::AttestationPool;
use prometheus_metrics::Metrics;
use ssz::SszHash as _;
use transition_functions::Balances;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::SignedBeaconBlock,
        primitives::{Epoch, Slot, H256},
    },
    preset::Preset,
};

use crate::{
    error::{Error, ReceiveError},
    events::EventChannels,
    head::{ChainHead, DurableHead, HeadPersistence, HeadTracker, InMemoryHead},
    messages::P2pMessage,
    misc::{EpochParticipation, ReceiverConfig},
    unbounded_sink::UnboundedSink,
};

pub struct Controller<P: Preset, F, N> {
    store: F,
    storage: Arc<dyn Storage>,
    head: HeadTracker,
    durable_head: DurableHead,
    // Used by blocks received without verification.
    unverified_head: Box<dyn HeadPersistence>,
    attestation_pool: Arc<dyn AttestationPool>,
    event_channels: Arc<EventChannels>,
    participation: EpochParticipation,
    metrics: Option<Arc<Metrics>>,
    receiver_config: ReceiverConfig,
    p2p_tx: N,
    phantom: PhantomData<P>,
}

impl<P, F, N> Controller<P, F, N>
where
    P: Preset,
    F: ForkChoiceStore,
    N: UnboundedSink<P2pMessage>,
{
    /// Makes `anchor` the head and writes it to `storage`.
    ///
    /// `store` must already contain the anchor block.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        store: F,
        storage: Arc<dyn Storage>,
        anchor: ChainHead,
        p2p_tx: N,
        attestation_pool: Arc<dyn AttestationPool>,
        event_channels: Arc<EventChannels>,
        metrics: Option<Arc<Metrics>>,
        receiver_config: ReceiverConfig,
    ) -> Result<Self> {
        ensure!(
            store.contains_block(anchor.block_root),
            Error::AnchorNotInStore {
                block_root: anchor.block_root,
            },
        );

        let head = HeadTracker::new(anchor.clone());
        let durable_head = DurableHead::new(Arc::clone(&storage));

        durable_head.save_head(&head, &head.snapshot(), anchor)?;

        let unverified_head: Box<dyn HeadPersistence> = if receiver_config.init_sync_cache_state {
            Box::new(InMemoryHead)
        } else {
            Box::new(DurableHead::new(Arc::clone(&storage)))
        };

        Ok(Self {
            store,
            storage,
            head,
            durable_head,
            unverified_head,
            attestation_pool,
            event_channels,
            participation: EpochParticipation::default(),
            metrics,
            receiver_config,
            p2p_tx,
            phantom: PhantomData,
        })
    }

    #[must_use]
    pub const fn store(&self) -> &F {
        &self.store
    }

    #[must_use]
    pub const fn head_tracker(&self) -> &HeadTracker {
        &self.head
    }

    #[must_use]
    pub fn head(&self) -> Arc<ChainHead> {
        self.head.snapshot()
    }

    #[must_use]
    pub const fn event_channels(&self) -> &Arc<EventChannels> {
        &self.event_channels
    }

    #[must_use]
    pub const fn receiver_config(&self) -> ReceiverConfig {
        self.receiver_config
    }

    #[must_use]
    pub fn participation(&self, epoch: Epoch) -> Option<Balances> {
        self.participation.get(epoch)
    }

    #[must_use]
    pub const fn epoch_participation(&self) -> &EpochParticipation {
        &self.participation
    }

    /// Feeds attestations collected from block bodies into fork choice and updates the head.
    ///
    /// Attestations the store rejects are dropped. Returns the number of accepted attestations.
    pub fn apply_pool_attestations(&self) -> Result<usize, ReceiveError> {
        let attestations = self.attestation_pool.drain();
        let total = attestations.len();
        let mut accepted = 0;

        for attestation in &attestations {
            match self.store.on_attestation(attestation) {
                Ok(()) => accepted += 1,
                Err(error) => debug!("attestation from pool rejected: {error:#}"),
            }
        }

        debug!("applied pool attestations (accepted: {accepted}, total: {total})");

        self.update_head_from_store()?;

        Ok(accepted)
    }

    pub(crate) fn broadcast(&self, block: &Arc<SignedBeaconBlock>) -> Result<(), ReceiveError> {
        if P2pMessage::PublishBlock(Arc::clone(block)).send(&self.p2p_tx) {
            Ok(())
        } else {
            Err(ReceiveError::BroadcastFailed)
        }
    }

    pub(crate) fn process_weighted(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<ProcessedBlock, ReceiveError> {
        let processed = self.transition(block, F::on_block_cache_filtered_tree)?;

        if self.receiver_config.disable_fork_choice {
            self.make_head(&self.durable_head, &processed)?;
        } else if let Some(head) = self.update_head_from_store()? {
            if head.block_root != processed.block_root {
                self.report_competing_block(&processed, &head);
            }
        }

        self.send_block_processed_event(&processed, true);

        Ok(processed)
    }

    pub(crate) fn process_without_fork_choice(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<ProcessedBlock, ReceiveError> {
        let processed = self.transition(block, F::on_block)?;

        self.make_head(&self.durable_head, &processed)?;
        self.send_block_processed_event(&processed, true);

        Ok(processed)
    }

    pub(crate) fn process_unverified(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<ProcessedBlock, ReceiveError> {
        let processed = self.transition(block, F::on_block_initial_sync_state_transition)?;

        self.make_head(self.unverified_head.as_ref(), &processed)?;
        self.send_block_processed_event(&processed, false);

        Ok(processed)
    }

    /// Hands the attestations in the block to the pool. Returns `false` if the pool rejected them.
    pub(crate) fn save_block_attestations(&self, processed: &ProcessedBlock) -> bool {
        let attestations = &processed.block.message.body.attestations;

        if let Err(error) = self.attestation_pool.save_block_attestations(attestations) {
            error!(
                "could not save attestations of block {:?} to pool: {error:#}",
                processed.block_root,
            );
            return false;
        }

        true
    }

    /// Reports metrics, logs the outcome and records participation.
    pub(crate) fn finish(&self, processed: &ProcessedBlock) {
        let elapsed = processed.started.elapsed();
        let body = &processed.block.message.body;

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.set_beacon_slot(processed.slot());
            metrics.set_beacon_head_slot(self.head.snapshot().slot());
            metrics.block_processing_times.observe(elapsed.as_secs_f64());
        }

        debug!(
            "finished applying state transition \
             (block_root: {:?}, slot: {}, attestations: {}, deposits: {}, voluntary_exits: {})",
            processed.block_root,
            processed.slot(),
            body.attestations.len(),
            body.deposits.len(),
            body.voluntary_exits.len(),
        );

        features::log!(
            LogBlockProcessingTime,
            "block {:?} at slot {} processed in {elapsed:?}",
            processed.block_root,
            processed.slot(),
        );

        self.participation
            .record::<P>(processed.slot(), &processed.state);
    }

    pub(crate) fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_deref()
    }

    // Returns the new head if it changed.
    fn update_head_from_store(&self) -> Result<Option<Arc<ChainHead>>, ReceiveError> {
        loop {
            // Loaded before querying the store so that a head installed in between is detected.
            let current = self.head.snapshot();

            let head_root = self
                .store
                .head()
                .map_err(|cause| ReceiveError::HeadQueryFailed { cause })?;

            if head_root == current.block_root {
                return Ok(None);
            }

            let block = self
                .storage
                .block_by_root(head_root)
                .map_err(|cause| ReceiveError::HeadLoadFailed { cause })?
                .ok_or(ReceiveError::NilHeadBlock {
                    block_root: head_root,
                })?;

            let state = self
                .head_state(head_root)
                .map_err(|cause| ReceiveError::HeadLoadFailed { cause })?;

            let head = ChainHead {
                block_root: head_root,
                block,
                state,
            };

            if let Some(new_head) = self.save_head(&self.durable_head, &current, head)? {
                return Ok(Some(new_head));
            }
        }
    }

    // Makes the processed block the head unless it already is.
    fn make_head(
        &self,
        persistence: &dyn HeadPersistence,
        processed: &ProcessedBlock,
    ) -> Result<(), ReceiveError> {
        loop {
            let current = self.head.snapshot();

            if current.block_root == processed.block_root {
                return Ok(());
            }

            if self
                .save_head(persistence, &current, processed.to_head())?
                .is_some()
            {
                return Ok(());
            }
        }
    }

    fn transition(
        &self,
        block: Arc<SignedBeaconBlock>,
        process: impl FnOnce(&F, Arc<SignedBeaconBlock>) -> Result<Arc<BeaconState>>,
    ) -> Result<ProcessedBlock, ReceiveError> {
        let started = Instant::now();

        // Bodies over the list limits have no root.
        transition_functions::validate_operation_counts(&block.message.body)
            .map_err(|cause| ReceiveError::TransitionFailed { cause })?;

        let state = process(&self.store, Arc::clone(&block))
            .map_err(|cause| ReceiveError::TransitionFailed { cause })?;

        Ok(ProcessedBlock::new(block, state, started))
    }

    fn head_state(&self, block_root: H256) -> Result<Arc<BeaconState>> {
        if let Some(state) = self.store.state_by_block_root(block_root) {
            return Ok(state);
        }

        self.storage
            .state_by_block_root(block_root)?
            .ok_or_else(|| anyhow!(Error::HeadStateNotFound { block_root }))
    }

    fn save_head(
        &self,
        persistence: &dyn HeadPersistence,
        expected: &Arc<ChainHead>,
        head: ChainHead,
    ) -> Result<Option<Arc<ChainHead>>, ReceiveError> {
        let new_head = persistence
            .save_head(&self.head, expected, head)
            .map_err(|cause| ReceiveError::HeadSaveFailed { cause })?;

        if let Some(new_head) = new_head.as_ref() {
            self.event_channels
                .send_head_event(new_head.slot(), new_head.block_root);
        }

        Ok(new_head)
    }

    fn report_competing_block(&self, processed: &ProcessedBlock, head: &ChainHead) {
        warn!(
            "calculated head differs from new block \
             (block_root: {:?}, slot: {}, head_root: {:?}, head_slot: {})",
            processed.block_root,
            processed.slot(),
            head.block_root,
            head.slot(),
        );

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.competing_blocks.inc();
        }
    }

    fn send_block_processed_event(&self, processed: &ProcessedBlock, verified: bool) {
        self.event_channels
            .send_block_processed_event(processed.slot(), processed.block_root, verified);
    }
}

/// A block that passed the state transition.
pub(crate) struct ProcessedBlock {
    pub block_root: H256,
    pub block: Arc<SignedBeaconBlock>,
    pub state: Arc<BeaconState>,
    started: Instant,
}

impl ProcessedBlock {
    fn new(block: Arc<SignedBeaconBlock>, state: Arc<BeaconState>, started: Instant) -> Self {
        Self {
            block_root: block.message.hash_tree_root(),
            block,
            state,
            started,
        }
    }

    pub fn slot(&self) -> Slot {
        self.block.message.slot
    }

    fn to_head(&self) -> ChainHead {
        ChainHead {
            block_root: self.block_root,
            block: Arc::clone(&self.block),
            state: Arc::clone(&self.state),
        }
    }
}
