use core::fmt::{Formatter, Result as FmtResult};
use std::sync::Arc;

use anyhow::Result;
use derivative::Derivative;
use helper_functions::misc;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::SignedBeaconBlock,
        primitives::{Epoch, Slot, H256},
    },
    preset::Preset,
};

/// A block in the tree along with its post-state.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ChainLink {
    pub block_root: H256,
    #[derivative(Debug(format_with = "fmt_block_concisely"))]
    pub block: Arc<SignedBeaconBlock>,
    #[derivative(Debug(format_with = "fmt_as_wildcard"))]
    pub state: Arc<BeaconState>,
}

impl ChainLink {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block.message.slot
    }

    #[must_use]
    pub fn parent_root(&self) -> H256 {
        self.block.message.parent_root
    }

    #[must_use]
    pub fn epoch<P: Preset>(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot())
    }
}

/// [`LatestMessage`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#latestmessage)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    // This corresponds to `AttestationData.beacon_block_root`, not to the target checkpoint root.
    pub beacon_block_root: H256,
}

/// Durable storage for blocks, their post-states and the head pointer. Keyed by block root.
pub trait Storage: Send + Sync {
    fn block_by_root(&self, block_root: H256) -> Result<Option<Arc<SignedBeaconBlock>>>;

    fn state_by_block_root(&self, block_root: H256) -> Result<Option<Arc<BeaconState>>>;

    fn save_block(&self, block_root: H256, block: &SignedBeaconBlock) -> Result<()>;

    fn save_state(&self, block_root: H256, state: &BeaconState) -> Result<()>;

    fn save_head_block_root(&self, block_root: H256) -> Result<()>;

    fn head_block_root(&self) -> Result<Option<H256>>;
}

fn fmt_block_concisely(block: &Arc<SignedBeaconBlock>, formatter: &mut Formatter) -> FmtResult {
    write!(formatter, "[block at slot {}]", block.message.slot)
}

fn fmt_as_wildcard(_: impl Sized, formatter: &mut Formatter) -> FmtResult {
    formatter.write_str("_")
}
