use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use anyhow::{bail, Result};
use fork_choice_store::{ForkChoiceStore, Storage, Store};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use operation_pools::{AttestationPool, InMemoryAttestationPool};
use prometheus_metrics::Metrics;
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, SignedBeaconBlock},
        primitives::{Slot, ValidatorIndex, H256},
    },
    preset::Minimal,
};

use crate::{
    controller::Controller, events::EventChannels, head::ChainHead, messages::P2pMessage,
    misc::ReceiverConfig, storage::DatabaseStorage,
};

pub type TestController<F> = Controller<Minimal, F, UnboundedSender<P2pMessage>>;

pub struct Context<F> {
    pub config: Arc<Config>,
    pub storage: Arc<TestStorage>,
    pub attestation_pool: Arc<dyn AttestationPool>,
    pub metrics: Arc<Metrics>,
    pub controller: TestController<F>,
    pub p2p_rx: UnboundedReceiver<P2pMessage>,
    pub genesis_state: Arc<BeaconState>,
    pub genesis_root: H256,
}

impl Context<Store<Minimal>> {
    pub fn new(receiver_config: ReceiverConfig) -> Result<Self> {
        Self::build(
            receiver_config,
            Arc::new(InMemoryAttestationPool::new()),
            core::convert::identity,
        )
    }
}

impl<F: ForkChoiceStore> Context<F> {
    pub fn build(
        receiver_config: ReceiverConfig,
        attestation_pool: Arc<dyn AttestationPool>,
        wrap_store: impl FnOnce(Store<Minimal>) -> F,
    ) -> Result<Self> {
        let config = Arc::new(Config::minimal());
        let storage = Arc::new(TestStorage::default());
        let metrics = Arc::new(Metrics::new()?);
        let (genesis_state, genesis_block) = factory::min_genesis_state::<Minimal>(&config);
        let genesis_root = genesis_block.message.hash_tree_root();
        let (p2p_tx, p2p_rx) = futures::channel::mpsc::unbounded();

        let store = Store::new(
            Arc::clone(&config),
            Arc::<TestStorage>::clone(&storage),
            Arc::clone(&genesis_block),
            Arc::clone(&genesis_state),
        );

        let anchor = ChainHead {
            block_root: genesis_root,
            block: genesis_block,
            state: Arc::clone(&genesis_state),
        };

        let controller = Controller::new(
            wrap_store(store),
            Arc::<TestStorage>::clone(&storage),
            anchor,
            p2p_tx,
            Arc::clone(&attestation_pool),
            Arc::new(EventChannels::default()),
            Some(Arc::clone(&metrics)),
            receiver_config,
        )?;

        Ok(Self {
            config,
            storage,
            attestation_pool,
            metrics,
            controller,
            p2p_rx,
            genesis_state,
            genesis_root,
        })
    }

    pub fn empty_block(
        &self,
        pre_state: &Arc<BeaconState>,
        slot: Slot,
    ) -> Result<(Arc<SignedBeaconBlock>, Arc<BeaconState>)> {
        factory::empty_block::<Minimal>(&self.config, Arc::clone(pre_state), slot)
    }

    pub fn block_with_attestations(
        &self,
        pre_state: &Arc<BeaconState>,
        slot: Slot,
        attestations: Vec<Attestation>,
    ) -> Result<(Arc<SignedBeaconBlock>, Arc<BeaconState>)> {
        factory::block_with_attestations::<Minimal>(
            &self.config,
            Arc::clone(pre_state),
            slot,
            attestations,
        )
    }

    /// Returns two children of the genesis block at slot 1 ordered by root.
    ///
    /// Without votes, fork choice prefers the second one.
    pub fn siblings(&self) -> Result<[(Arc<SignedBeaconBlock>, Arc<BeaconState>); 2]> {
        let first = self.empty_block(&self.genesis_state, 1)?;

        let second = factory::block_with_graffiti::<Minimal>(
            &self.config,
            Arc::clone(&self.genesis_state),
            1,
            H256::repeat_byte(1),
        )?;

        if root(&first.0) < root(&second.0) {
            Ok([first, second])
        } else {
            Ok([second, first])
        }
    }

    pub fn attestation(
        &self,
        beacon_block_root: H256,
        slot: Slot,
        attesting_indices: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Result<Attestation> {
        factory::attestation::<Minimal>(
            &self.config,
            &self.genesis_state,
            beacon_block_root,
            slot,
            attesting_indices,
        )
    }

    pub fn head_root(&self) -> H256 {
        self.controller.head_tracker().head_root()
    }
}

pub fn root(block: &SignedBeaconBlock) -> H256 {
    block.message.hash_tree_root()
}

pub fn owned(block: &Arc<SignedBeaconBlock>) -> SignedBeaconBlock {
    SignedBeaconBlock::clone(block)
}

/// Counts block loads. Can pretend that blocks are missing or that states cannot be written.
#[derive(Default)]
pub struct TestStorage {
    inner: DatabaseStorage,
    block_loads: AtomicUsize,
    hide_blocks: AtomicBool,
    fail_state_writes: AtomicBool,
}

impl TestStorage {
    pub fn block_loads(&self) -> usize {
        self.block_loads.load(Ordering::SeqCst)
    }

    pub fn hide_blocks(&self) {
        self.hide_blocks.store(true, Ordering::SeqCst)
    }

    pub fn fail_state_writes(&self) {
        self.fail_state_writes.store(true, Ordering::SeqCst)
    }

    pub fn state_count(&self) -> Result<usize> {
        self.inner.state_count()
    }
}

impl Storage for TestStorage {
    fn block_by_root(&self, block_root: H256) -> Result<Option<Arc<SignedBeaconBlock>>> {
        self.block_loads.fetch_add(1, Ordering::SeqCst);

        if self.hide_blocks.load(Ordering::SeqCst) {
            return Ok(None);
        }

        self.inner.block_by_root(block_root)
    }

    fn state_by_block_root(&self, block_root: H256) -> Result<Option<Arc<BeaconState>>> {
        self.inner.state_by_block_root(block_root)
    }

    fn save_block(&self, block_root: H256, block: &SignedBeaconBlock) -> Result<()> {
        self.inner.save_block(block_root, block)
    }

    fn save_state(&self, block_root: H256, state: &BeaconState) -> Result<()> {
        if self.fail_state_writes.load(Ordering::SeqCst) {
            bail!("state storage is unavailable");
        }

        self.inner.save_state(block_root, state)
    }

    fn save_head_block_root(&self, block_root: H256) -> Result<()> {
        self.inner.save_head_block_root(block_root)
    }

    fn head_block_root(&self) -> Result<Option<H256>> {
        self.inner.head_block_root()
    }
}

pub struct FailingAttestationPool;

impl AttestationPool for FailingAttestationPool {
    fn save_block_attestations(&self, _attestations: &[Attestation]) -> Result<()> {
        bail!("attestation pool is unavailable")
    }

    fn drain(&self) -> Vec<Attestation> {
        vec![]
    }
}

/// Accepts blocks but cannot report the head.
pub struct HeadlessStore(pub Store<Minimal>);

impl ForkChoiceStore for HeadlessStore {
    fn on_block(&self, block: Arc<SignedBeaconBlock>) -> Result<Arc<BeaconState>> {
        self.0.on_block(block)
    }

    fn on_block_cache_filtered_tree(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>> {
        self.0.on_block_cache_filtered_tree(block)
    }

    fn on_block_initial_sync_state_transition(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>> {
        self.0.on_block_initial_sync_state_transition(block)
    }

    fn on_attestation(&self, attestation: &Attestation) -> Result<()> {
        self.0.on_attestation(attestation)
    }

    fn head(&self) -> Result<H256> {
        bail!("head is unavailable")
    }

    fn state_by_block_root(&self, block_root: H256) -> Option<Arc<BeaconState>> {
        self.0.state_by_block_root(block_root)
    }

    fn contains_block(&self, block_root: H256) -> bool {
        self.0.contains_block(block_root)
    }
}

/// Stops the first head query made after [`PausingStore::arm`] until [`PausingStore::release`].
///
/// The query computes its result before stopping.
pub struct PausingStore {
    inner: Store<Minimal>,
    armed: AtomicBool,
    paused: Barrier,
    released: Barrier,
}

impl PausingStore {
    pub fn new(inner: Store<Minimal>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            paused: Barrier::new(2),
            released: Barrier::new(2),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn wait_until_paused(&self) {
        self.paused.wait();
    }

    pub fn release(&self) {
        self.released.wait();
    }
}

impl ForkChoiceStore for PausingStore {
    fn on_block(&self, block: Arc<SignedBeaconBlock>) -> Result<Arc<BeaconState>> {
        self.inner.on_block(block)
    }

    fn on_block_cache_filtered_tree(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>> {
        self.inner.on_block_cache_filtered_tree(block)
    }

    fn on_block_initial_sync_state_transition(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>> {
        self.inner.on_block_initial_sync_state_transition(block)
    }

    fn on_attestation(&self, attestation: &Attestation) -> Result<()> {
        self.inner.on_attestation(attestation)
    }

    fn head(&self) -> Result<H256> {
        let head = self.inner.head();

        if self.armed.swap(false, Ordering::SeqCst) {
            self.paused.wait();
            self.released.wait();
        }

        head
    }

    fn state_by_block_root(&self, block_root: H256) -> Option<Arc<BeaconState>> {
        self.inner.state_by_block_root(block_root)
    }

    fn contains_block(&self, block_root: H256) -> bool {
        self.inner.contains_block(block_root)
    }
}
