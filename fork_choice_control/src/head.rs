use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use derivative::Derivative;
use fork_choice_store::Storage;
use log::debug;
use parking_lot::Mutex;
use types::phase0::{
    beacon_state::BeaconState,
    containers::SignedBeaconBlock,
    primitives::{Slot, H256},
};

/// The block considered the tip of the canonical chain, along with its post-state.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ChainHead {
    pub block_root: H256,
    #[derivative(Debug = "ignore")]
    pub block: Arc<SignedBeaconBlock>,
    #[derivative(Debug = "ignore")]
    pub state: Arc<BeaconState>,
}

impl ChainHead {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block.message.slot
    }
}

/// Holds the current head.
///
/// Readers never block. They see either the old head or the new one, never a mix of the two.
/// Writers are serialized, and a write only succeeds if the head it was based on is still current.
pub struct HeadTracker {
    head: ArcSwap<ChainHead>,
    write_lock: Mutex<()>,
}

impl HeadTracker {
    #[must_use]
    pub fn new(head: ChainHead) -> Self {
        Self {
            head: ArcSwap::from_pointee(head),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.head.load().block_root
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<ChainHead> {
        self.head.load_full()
    }

    /// Runs `persist` and makes `head` visible if the current head is still `expected`.
    ///
    /// Returns the new head, or `None` without calling `persist` if the head was replaced after
    /// `expected` was loaded. The head is left unchanged if `persist` fails.
    pub fn replace_head(
        &self,
        expected: &Arc<ChainHead>,
        head: ChainHead,
        persist: impl FnOnce(&ChainHead) -> Result<()>,
    ) -> Result<Option<Arc<ChainHead>>> {
        let _write_guard = self.write_lock.lock();

        if !Arc::ptr_eq(&self.head.load(), expected) {
            debug!(
                "head changed concurrently, not replacing it (block_root: {:?})",
                head.block_root,
            );
            return Ok(None);
        }

        persist(&head)?;

        debug!("replacing head (block_root: {:?}, slot: {})", head.block_root, head.slot());

        let head = Arc::new(head);
        self.head.store(Arc::clone(&head));

        Ok(Some(head))
    }
}

/// A way of making a block the head.
pub trait HeadPersistence: Send + Sync {
    /// See [`HeadTracker::replace_head`].
    fn save_head(
        &self,
        tracker: &HeadTracker,
        expected: &Arc<ChainHead>,
        head: ChainHead,
    ) -> Result<Option<Arc<ChainHead>>>;
}

/// Writes the head to storage before making it visible.
///
/// If writing fails, the tracker keeps the old head.
pub struct DurableHead {
    storage: Arc<dyn Storage>,
}

impl DurableHead {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

impl HeadPersistence for DurableHead {
    fn save_head(
        &self,
        tracker: &HeadTracker,
        expected: &Arc<ChainHead>,
        head: ChainHead,
    ) -> Result<Option<Arc<ChainHead>>> {
        tracker.replace_head(expected, head, |head| {
            self.storage.save_block(head.block_root, &head.block)?;
            self.storage.save_state(head.block_root, &head.state)?;
            self.storage.save_head_block_root(head.block_root)
        })
    }
}

/// Replaces the head without touching storage. Used during initial sync.
pub struct InMemoryHead;

impl HeadPersistence for InMemoryHead {
    fn save_head(
        &self,
        tracker: &HeadTracker,
        expected: &Arc<ChainHead>,
        head: ChainHead,
    ) -> Result<Option<Arc<ChainHead>>> {
        tracker.replace_head(expected, head, |_| Ok(()))
    }
}
