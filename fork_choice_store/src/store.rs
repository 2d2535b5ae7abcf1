use core::{cmp::Reverse, marker::PhantomData};
use std::{collections::HashMap, sync::Arc};

use anyhow::{ensure, Result};
use clock::SlotTime;
use helper_functions::{
    misc,
    verifier::{NullVerifier, SingleVerifier, Verifier},
};
use log::debug;
use parking_lot::RwLock;
use ssz::SszHash as _;
use transition_functions::{ProcessSlots, StateRootPolicy};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, SignedBeaconBlock},
        primitives::{Gwei, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{
    error::Error,
    misc::{ChainLink, LatestMessage, Storage},
};

/// The fork choice operations block ingestion depends on.
///
/// The three `on_block*` methods differ in how much they trust the block:
///
/// | Method                                   | Signatures | Votes in block | Persisted       |
/// | ---------------------------------------- | ---------- | -------------- | --------------- |
/// | `on_block`                               | verified   | ignored        | block and state |
/// | `on_block_cache_filtered_tree`           | verified   | applied        | block and state |
/// | `on_block_initial_sync_state_transition` | skipped    | ignored        | block           |
///
/// All of them return the post-state of the block. Processing a block that is already in the
/// store returns the stored post-state without doing anything else.
pub trait ForkChoiceStore: Send + Sync {
    fn on_block(&self, block: Arc<SignedBeaconBlock>) -> Result<Arc<BeaconState>>;

    /// Also refreshes the cached head.
    fn on_block_cache_filtered_tree(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>>;

    fn on_block_initial_sync_state_transition(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>>;

    /// Records the votes in `attestation`. The signature is not verified.
    fn on_attestation(&self, attestation: &Attestation) -> Result<()>;

    fn head(&self) -> Result<H256>;

    fn state_by_block_root(&self, block_root: H256) -> Option<Arc<BeaconState>>;

    fn contains_block(&self, block_root: H256) -> bool;
}

#[derive(Clone, Copy)]
enum Ingestion {
    Plain,
    WithVotes,
    InitialSync,
}

impl Ingestion {
    const fn verifies_signatures(self) -> bool {
        !matches!(self, Self::InitialSync)
    }

    const fn applies_votes(self) -> bool {
        matches!(self, Self::WithVotes)
    }

    const fn persists_state(self) -> bool {
        !matches!(self, Self::InitialSync)
    }
}

#[derive(Default)]
struct BlockTree {
    blocks: HashMap<H256, ChainLink>,
    children: HashMap<H256, Vec<H256>>,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
    // Cleared by every mutation that does not recompute it.
    cached_head: Option<H256>,
}

impl BlockTree {
    fn insert(&mut self, chain_link: ChainLink) {
        self.children
            .entry(chain_link.parent_root())
            .or_default()
            .push(chain_link.block_root);

        self.blocks.insert(chain_link.block_root, chain_link);
    }
}

pub struct Store<P: Preset> {
    config: Arc<Config>,
    storage: Arc<dyn Storage>,
    anchor_root: H256,
    // Vote weights are effective balances in the anchor state.
    anchor_state: Arc<BeaconState>,
    tree: RwLock<BlockTree>,
    phantom: PhantomData<P>,
}

impl<P: Preset> Store<P> {
    /// Creates a store rooted at `anchor_block`. The anchor is not written to `storage`.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn Storage>,
        anchor_block: Arc<SignedBeaconBlock>,
        anchor_state: Arc<BeaconState>,
    ) -> Self {
        let anchor_root = anchor_block.message.hash_tree_root();

        let mut tree = BlockTree::default();

        tree.blocks.insert(
            anchor_root,
            ChainLink {
                block_root: anchor_root,
                block: anchor_block,
                state: Arc::clone(&anchor_state),
            },
        );

        Self {
            config,
            storage,
            anchor_root,
            anchor_state,
            tree: RwLock::new(tree),
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub const fn anchor_root(&self) -> H256 {
        self.anchor_root
    }

    #[must_use]
    pub fn chain_link(&self, block_root: H256) -> Option<ChainLink> {
        self.tree.read().blocks.get(&block_root).cloned()
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.tree
            .read()
            .latest_messages
            .get(&validator_index)
            .copied()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.tree.read().blocks.len()
    }

    fn process_block(
        &self,
        block: Arc<SignedBeaconBlock>,
        ingestion: Ingestion,
    ) -> Result<Arc<BeaconState>> {
        transition_functions::validate_operation_counts(&block.message.body)?;

        let block_root = block.message.hash_tree_root();
        let slot = block.message.slot;
        let parent_root = block.message.parent_root;

        let parent_state = {
            let tree = self.tree.read();

            if let Some(chain_link) = tree.blocks.get(&block_root) {
                debug!("block already in fork choice store (block_root: {block_root:?})");
                return Ok(Arc::clone(&chain_link.state));
            }

            let parent = tree.blocks.get(&parent_root).ok_or(Error::UnknownParent {
                block_root,
                parent_root,
            })?;

            Arc::clone(&parent.state)
        };

        let current_slot = SlotTime::current(&self.config, self.anchor_state.genesis_time)?.slot;

        ensure!(
            slot <= current_slot,
            Error::BlockFromFuture {
                block_root,
                slot,
                current_slot,
            },
        );

        let mut state = BeaconState::clone(&parent_state);

        if ingestion.verifies_signatures() {
            self.transition(&mut state, &block, SingleVerifier)?;
        } else {
            self.transition(&mut state, &block, NullVerifier)?;
        }

        let state = Arc::new(state);

        self.storage.save_block(block_root, &block)?;

        if ingestion.persists_state() {
            self.storage.save_state(block_root, &state)?;
        }

        let mut tree = self.tree.write();

        // Another thread may have inserted the block while this one was running the transition.
        if let Some(chain_link) = tree.blocks.get(&block_root) {
            return Ok(Arc::clone(&chain_link.state));
        }

        // Attestations cannot vote for the block that contains them.
        if ingestion.applies_votes() {
            for attestation in &block.message.body.attestations {
                if let Err(error) = Self::apply_attestation(&mut tree, attestation) {
                    debug!("vote in block ignored (block_root: {block_root:?}): {error:#}");
                }
            }
        }

        tree.insert(ChainLink {
            block_root,
            block,
            state: Arc::clone(&state),
        });

        tree.cached_head = ingestion
            .applies_votes()
            .then(|| self.compute_head(&tree));

        debug!("block added to fork choice store (block_root: {block_root:?}, slot: {slot})");

        Ok(state)
    }

    fn transition(
        &self,
        state: &mut BeaconState,
        block: &SignedBeaconBlock,
        verifier: impl Verifier,
    ) -> Result<()> {
        transition_functions::state_transition::<P, _>(
            &self.config,
            state,
            block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Verify,
            verifier,
        )
    }

    fn apply_attestation(tree: &mut BlockTree, attestation: &Attestation) -> Result<()> {
        let data = attestation.data;
        let beacon_block_root = data.beacon_block_root;

        ensure!(
            !attestation.attesting_indices.is_empty(),
            Error::AttestationHasNoAttestingIndices { beacon_block_root },
        );

        ensure!(
            data.target.epoch == misc::compute_epoch_at_slot::<P>(data.slot),
            Error::AttestationTargetsWrongEpoch {
                attestation_slot: data.slot,
                target_epoch: data.target.epoch,
            },
        );

        let voted_block = tree
            .blocks
            .get(&beacon_block_root)
            .ok_or(Error::AttestationForUnknownBlock { beacon_block_root })?;

        ensure!(
            voted_block.slot() <= data.slot,
            Error::AttestationForFutureBlock {
                beacon_block_root,
                attestation_slot: data.slot,
                block_slot: voted_block.slot(),
            },
        );

        let new_message = LatestMessage {
            epoch: data.target.epoch,
            beacon_block_root,
        };

        for validator_index in attestation.attesting_indices.iter().copied() {
            tree.latest_messages
                .entry(validator_index)
                .and_modify(|old_message| {
                    if new_message.epoch > old_message.epoch {
                        *old_message = new_message;
                    }
                })
                .or_insert(new_message);
        }

        Ok(())
    }

    fn compute_head(&self, tree: &BlockTree) -> H256 {
        let mut weights = HashMap::<H256, Gwei>::new();

        for (validator_index, message) in &tree.latest_messages {
            let balance = self
                .anchor_state
                .validator(*validator_index)
                .map(|validator| validator.effective_balance)
                .unwrap_or_default();

            *weights.entry(message.beacon_block_root).or_default() += balance;
        }

        // Blocks have greater slots than their parents, so visiting them in reverse slot order
        // adds every block's weight to its parent only after the weight is complete.
        let mut chain_links = tree
            .blocks
            .values()
            .filter(|chain_link| chain_link.block_root != self.anchor_root)
            .collect::<Vec<_>>();

        chain_links.sort_unstable_by_key(|chain_link| Reverse(chain_link.slot()));

        for chain_link in chain_links {
            let weight = weights
                .get(&chain_link.block_root)
                .copied()
                .unwrap_or_default();

            *weights.entry(chain_link.parent_root()).or_default() += weight;
        }

        let weight_of = |block_root: &H256| weights.get(block_root).copied().unwrap_or_default();

        let mut head = self.anchor_root;

        while let Some(best_child) = tree.children.get(&head).and_then(|children| {
            children
                .iter()
                .copied()
                .max_by_key(|child| (weight_of(child), *child))
        }) {
            head = best_child;
        }

        head
    }
}

impl<P: Preset> ForkChoiceStore for Store<P> {
    fn on_block(&self, block: Arc<SignedBeaconBlock>) -> Result<Arc<BeaconState>> {
        self.process_block(block, Ingestion::Plain)
    }

    fn on_block_cache_filtered_tree(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>> {
        self.process_block(block, Ingestion::WithVotes)
    }

    fn on_block_initial_sync_state_transition(
        &self,
        block: Arc<SignedBeaconBlock>,
    ) -> Result<Arc<BeaconState>> {
        self.process_block(block, Ingestion::InitialSync)
    }

    fn on_attestation(&self, attestation: &Attestation) -> Result<()> {
        let mut tree = self.tree.write();
        Self::apply_attestation(&mut tree, attestation)?;
        tree.cached_head = None;
        Ok(())
    }

    fn head(&self) -> Result<H256> {
        let tree = self.tree.read();

        if let Some(head) = tree.cached_head {
            return Ok(head);
        }

        Ok(self.compute_head(&tree))
    }

    fn state_by_block_root(&self, block_root: H256) -> Option<Arc<BeaconState>> {
        self.tree
            .read()
            .blocks
            .get(&block_root)
            .map(|chain_link| Arc::clone(&chain_link.state))
    }

    fn contains_block(&self, block_root: H256) -> bool {
        self.tree.read().blocks.contains_key(&block_root)
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use types::{
        phase0::{consts::MAX_VOLUNTARY_EXITS, containers::SignedVoluntaryExit},
        preset::Minimal,
    };

    use super::*;

    #[derive(Default)]
    struct MemoryStorage {
        blocks: Mutex<HashMap<H256, Arc<SignedBeaconBlock>>>,
        states: Mutex<HashMap<H256, Arc<BeaconState>>>,
        head: Mutex<Option<H256>>,
    }

    impl Storage for MemoryStorage {
        fn block_by_root(&self, block_root: H256) -> Result<Option<Arc<SignedBeaconBlock>>> {
            Ok(self.blocks.lock().get(&block_root).cloned())
        }

        fn state_by_block_root(&self, block_root: H256) -> Result<Option<Arc<BeaconState>>> {
            Ok(self.states.lock().get(&block_root).cloned())
        }

        fn save_block(&self, block_root: H256, block: &SignedBeaconBlock) -> Result<()> {
            self.blocks.lock().insert(block_root, Arc::new(block.clone()));
            Ok(())
        }

        fn save_state(&self, block_root: H256, state: &BeaconState) -> Result<()> {
            self.states.lock().insert(block_root, Arc::new(state.clone()));
            Ok(())
        }

        fn save_head_block_root(&self, block_root: H256) -> Result<()> {
            *self.head.lock() = Some(block_root);
            Ok(())
        }

        fn head_block_root(&self) -> Result<Option<H256>> {
            Ok(*self.head.lock())
        }
    }

    struct Context {
        config: Arc<Config>,
        storage: Arc<MemoryStorage>,
        store: Store<Minimal>,
        genesis_state: Arc<BeaconState>,
        genesis_root: H256,
    }

    fn context() -> Context {
        let config = Arc::new(Config::minimal());
        let storage = Arc::new(MemoryStorage::default());
        let (genesis_state, genesis_block) = factory::min_genesis_state::<Minimal>(&config);
        let genesis_root = genesis_block.message.hash_tree_root();

        let store = Store::new(
            Arc::clone(&config),
            Arc::<MemoryStorage>::clone(&storage),
            genesis_block,
            Arc::clone(&genesis_state),
        );

        Context {
            config,
            storage,
            store,
            genesis_state,
            genesis_root,
        }
    }

    // Two children of the genesis block that differ only in graffiti.
    fn sibling_blocks(context: &Context) -> Result<[Arc<SignedBeaconBlock>; 2]> {
        let Context {
            config,
            genesis_state,
            ..
        } = context;

        let (block_a, _) = factory::empty_block::<Minimal>(config, Arc::clone(genesis_state), 1)?;

        let (block_b, _) = factory::block_with_graffiti::<Minimal>(
            config,
            Arc::clone(genesis_state),
            1,
            H256::repeat_byte(1),
        )?;

        Ok([block_a, block_b])
    }

    fn root(block: &SignedBeaconBlock) -> H256 {
        block.message.hash_tree_root()
    }

    #[test]
    fn anchor_is_head_of_empty_store() -> Result<()> {
        let context = context();

        assert_eq!(context.store.head()?, context.genesis_root);
        assert_eq!(context.store.block_count(), 1);

        Ok(())
    }

    #[test]
    fn valid_child_becomes_head() -> Result<()> {
        let context = context();
        let (block, expected_state) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            1,
        )?;

        let state = context.store.on_block(Arc::clone(&block))?;

        assert_eq!(*state, *expected_state);
        assert!(context.store.contains_block(root(&block)));
        assert_eq!(context.store.head()?, root(&block));
        assert!(context.storage.block_by_root(root(&block))?.is_some());
        assert!(context.storage.state_by_block_root(root(&block))?.is_some());

        Ok(())
    }

    #[test]
    fn processing_block_twice_returns_stored_state() -> Result<()> {
        let context = context();
        let (block, _) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            1,
        )?;

        let first = context.store.on_block_cache_filtered_tree(Arc::clone(&block))?;
        let second = context.store.on_block(block)?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(context.store.block_count(), 2);

        Ok(())
    }

    #[test]
    fn block_with_unknown_parent_is_rejected() -> Result<()> {
        let context = context();
        let (_, state_1) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            1,
        )?;
        let (block_2, _) = factory::empty_block::<Minimal>(&context.config, state_1, 2)?;

        let error = context
            .store
            .on_block(Arc::clone(&block_2))
            .expect_err("parent of block 2 was never processed");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::UnknownParent { parent_root, .. })
                if *parent_root == block_2.message.parent_root,
        ));
        assert!(!context.store.contains_block(root(&block_2)));

        Ok(())
    }

    #[test]
    fn block_over_list_limit_is_rejected_before_hashing() -> Result<()> {
        let context = context();
        let (block, _) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            1,
        )?;

        let mut oversized = SignedBeaconBlock::clone(&block);
        oversized.message.body.voluntary_exits =
            vec![SignedVoluntaryExit::default(); MAX_VOLUNTARY_EXITS + 1];

        let error = context
            .store
            .on_block_initial_sync_state_transition(Arc::new(oversized))
            .expect_err("block has more voluntary exits than a list can hold");

        assert!(matches!(
            error.downcast_ref::<transition_functions::Error>(),
            Some(transition_functions::Error::TooManyOperations { .. }),
        ));
        assert_eq!(context.store.block_count(), 1);

        Ok(())
    }

    #[test]
    fn block_with_bad_signature_is_rejected_unless_syncing() -> Result<()> {
        let context = context();
        let (block, _) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            1,
        )?;

        let mut tampered = SignedBeaconBlock::clone(&block);
        tampered.signature = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            2,
        )?
        .0
        .signature;
        let tampered = Arc::new(tampered);

        context
            .store
            .on_block(Arc::clone(&tampered))
            .expect_err("block is signed over a different message");

        context
            .store
            .on_block_initial_sync_state_transition(Arc::clone(&tampered))?;

        assert!(context.store.contains_block(root(&tampered)));

        Ok(())
    }

    #[test]
    fn initial_sync_persists_block_but_not_state() -> Result<()> {
        let context = context();
        let (block, _) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            1,
        )?;

        context
            .store
            .on_block_initial_sync_state_transition(Arc::clone(&block))?;

        assert!(context.storage.block_by_root(root(&block))?.is_some());
        assert!(context.storage.state_by_block_root(root(&block))?.is_none());
        assert!(context.store.state_by_block_root(root(&block)).is_some());

        Ok(())
    }

    #[test]
    fn ties_are_broken_by_greater_root() -> Result<()> {
        let context = context();
        let [block_a, block_b] = sibling_blocks(&context)?;

        context.store.on_block(Arc::clone(&block_a))?;
        context.store.on_block(Arc::clone(&block_b))?;

        assert_eq!(context.store.head()?, root(&block_a).max(root(&block_b)));

        Ok(())
    }

    #[test]
    fn votes_outweigh_tie_breaking() -> Result<()> {
        let context = context();
        let [block_a, block_b] = sibling_blocks(&context)?;
        let lighter_root = root(&block_a).min(root(&block_b));

        context.store.on_block(block_a)?;
        context.store.on_block(block_b)?;

        let attestation = factory::attestation::<Minimal>(
            &context.config,
            &context.genesis_state,
            lighter_root,
            1,
            [3],
        )?;

        context.store.on_attestation(&attestation)?;

        assert_eq!(context.store.head()?, lighter_root);
        assert_eq!(
            context.store.latest_message(3),
            Some(LatestMessage {
                epoch: 0,
                beacon_block_root: lighter_root,
            }),
        );

        Ok(())
    }

    #[test]
    fn vote_in_same_epoch_does_not_replace_earlier_vote() -> Result<()> {
        let context = context();
        let [block_a, block_b] = sibling_blocks(&context)?;
        let lighter_root = root(&block_a).min(root(&block_b));
        let heavier_root = root(&block_a).max(root(&block_b));

        context.store.on_block(block_a)?;
        context.store.on_block(block_b)?;

        for beacon_block_root in [lighter_root, heavier_root] {
            let attestation = factory::attestation::<Minimal>(
                &context.config,
                &context.genesis_state,
                beacon_block_root,
                1,
                [0],
            )?;

            context.store.on_attestation(&attestation)?;
        }

        assert_eq!(context.store.head()?, lighter_root);

        Ok(())
    }

    #[test]
    fn votes_in_blocks_are_only_counted_by_cache_filtered_tree() -> Result<()> {
        let plain = context();
        let weighted = context();
        let [block_a, block_b] = sibling_blocks(&plain)?;
        let lighter_root = root(&block_a).min(root(&block_b));
        let heavier_root = root(&block_a).max(root(&block_b));

        let attestation = factory::attestation::<Minimal>(
            &plain.config,
            &plain.genesis_state,
            lighter_root,
            1,
            [0, 1, 2],
        )?;

        plain.store.on_block(Arc::clone(&block_a))?;
        plain.store.on_block(Arc::clone(&block_b))?;

        let lighter_state = plain
            .store
            .state_by_block_root(lighter_root)
            .ok_or_else(|| anyhow::anyhow!("lighter block is in the store"))?;

        let (block_c, _) = factory::block_with_attestations::<Minimal>(
            &plain.config,
            lighter_state,
            2,
            vec![attestation],
        )?;

        plain.store.on_block(Arc::clone(&block_c))?;

        weighted.store.on_block(block_a)?;
        weighted.store.on_block(block_b)?;
        weighted.store.on_block_cache_filtered_tree(Arc::clone(&block_c))?;

        assert_eq!(plain.store.head()?, heavier_root);
        assert_eq!(weighted.store.head()?, root(&block_c));

        Ok(())
    }

    #[test]
    fn attestation_for_unknown_block_is_rejected() -> Result<()> {
        let context = context();
        let unknown_root = H256::repeat_byte(0xaa);

        let attestation = factory::attestation::<Minimal>(
            &context.config,
            &context.genesis_state,
            unknown_root,
            1,
            [0],
        )?;

        let error = context
            .store
            .on_attestation(&attestation)
            .expect_err("block is not in the store");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::AttestationForUnknownBlock { beacon_block_root })
                if *beacon_block_root == unknown_root,
        ));
        assert_eq!(context.store.latest_message(0), None);

        Ok(())
    }

    #[test]
    fn attestation_for_future_block_is_rejected() -> Result<()> {
        let context = context();
        let (block, _) = factory::empty_block::<Minimal>(
            &context.config,
            Arc::clone(&context.genesis_state),
            3,
        )?;

        context.store.on_block(Arc::clone(&block))?;

        let attestation = factory::attestation::<Minimal>(
            &context.config,
            &context.genesis_state,
            root(&block),
            2,
            [0],
        )?;

        let error = context
            .store
            .on_attestation(&attestation)
            .expect_err("attestation is older than the block it votes for");

        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::AttestationForFutureBlock { .. }),
        ));

        Ok(())
    }
}
