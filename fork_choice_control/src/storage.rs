use std::sync::Arc;

use anyhow::Result;
use database::{Database, PrefixableKey};
use derive_more::Display;
use serde::{de::DeserializeOwned, Serialize};
use types::phase0::{beacon_state::BeaconState, containers::SignedBeaconBlock, primitives::H256};

/// [`fork_choice_store::Storage`] backed by a [`Database`].
///
/// Values are serialized with `bincode`. Keys are strings that start with a prefix unique to
/// their kind.
#[derive(Default)]
pub struct DatabaseStorage {
    database: Database,
}

impl DatabaseStorage {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Database::in_memory())
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    pub fn block_count(&self) -> Result<usize> {
        self.count_keys::<BlockByRoot>()
    }

    pub fn state_count(&self) -> Result<usize> {
        self.count_keys::<StateByBlockRoot>()
    }

    fn count_keys<K: PrefixableKey>(&self) -> Result<usize> {
        let mut count = 0;

        for result in self.database.iterator_ascending(K::PREFIX..)? {
            let (key_bytes, _) = result?;

            if !K::has_prefix(&key_bytes) {
                break;
            }

            count += 1;
        }

        Ok(count)
    }
}

impl fork_choice_store::Storage for DatabaseStorage {
    fn block_by_root(&self, block_root: H256) -> Result<Option<Arc<SignedBeaconBlock>>> {
        get(&self.database, BlockByRoot(block_root)).map(|block| block.map(Arc::new))
    }

    fn state_by_block_root(&self, block_root: H256) -> Result<Option<Arc<BeaconState>>> {
        get(&self.database, StateByBlockRoot(block_root)).map(|state| state.map(Arc::new))
    }

    fn save_block(&self, block_root: H256, block: &SignedBeaconBlock) -> Result<()> {
        save(&self.database, BlockByRoot(block_root), block)
    }

    fn save_state(&self, block_root: H256, state: &BeaconState) -> Result<()> {
        save(&self.database, StateByBlockRoot(block_root), state)
    }

    fn save_head_block_root(&self, block_root: H256) -> Result<()> {
        save(&self.database, HeadBlockRoot, block_root)
    }

    fn head_block_root(&self) -> Result<Option<H256>> {
        get(&self.database, HeadBlockRoot)
    }
}

#[derive(Display)]
#[display("{}{_0:x}", Self::PREFIX)]
pub struct BlockByRoot(pub H256);

impl PrefixableKey for BlockByRoot {
    const PREFIX: &'static str = "b";
}

#[derive(Display)]
#[display("{}{_0:x}", Self::PREFIX)]
pub struct StateByBlockRoot(pub H256);

impl PrefixableKey for StateByBlockRoot {
    const PREFIX: &'static str = "s";
}

#[derive(Display)]
#[display("{}", Self::PREFIX)]
pub struct HeadBlockRoot;

impl PrefixableKey for HeadBlockRoot {
    const PREFIX: &'static str = "h";
}

pub fn save(
    database: &Database,
    key: impl core::fmt::Display,
    value: impl Serialize,
) -> Result<()> {
    database.put(serialize_key(key), bincode::serialize(&value)?)
}

pub fn get<V: DeserializeOwned>(
    database: &Database,
    key: impl core::fmt::Display,
) -> Result<Option<V>> {
    database
        .get(serialize_key(key))?
        .map(|bytes| bincode::deserialize(&bytes))
        .transpose()
        .map_err(Into::into)
}

fn serialize_key(key: impl core::fmt::Display) -> String {
    key.to_string()
}
