use core::ops::RangeFrom;
use std::sync::Arc;

use anyhow::Result;
use im::OrdMap;
use parking_lot::Mutex;
use snap::raw::{Decoder, Encoder};

/// An ordered key-value store held in memory.
///
/// Values are compressed with Snappy. Readers get consistent snapshots because every write
/// replaces the whole map.
#[derive(Default)]
pub struct Database {
    // Various methods of `OrdMap` and `Database` clone the elements of this map,
    // so they should be cheaply cloneable. This disqualifies `Vec<u8>` and `Box<[u8]>`.
    map: Mutex<InMemoryMap>,
}

type InMemoryMap = OrdMap<Arc<[u8]>, Arc<[u8]>>;

impl Database {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.map
            .lock()
            .get(key.as_ref())
            .map(|compressed| decompress(compressed))
            .transpose()
    }

    /// Iterates over a snapshot of the database. Later writes are not observed.
    pub fn iterator_ascending(
        &self,
        range: RangeFrom<impl AsRef<[u8]>>,
    ) -> Result<impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>>> {
        let start = range.start.as_ref();
        let map = self.map.lock().clone();
        let start_pair = map.get_key_value(start).map(|(key, value)| (key.clone(), value.clone()));
        let (_, mut above) = map.split(start);

        if let Some((key, value)) = start_pair {
            above.insert(key, value);
        }

        let pairs = above
            .into_iter()
            .map(|(key, value)| Ok((key.to_vec(), decompress(&value)?)));

        Ok(pairs)
    }

    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.put_batch(core::iter::once((key, value)))
    }

    /// Writes all pairs or none of them.
    pub fn put_batch(
        &self,
        pairs: impl IntoIterator<Item = (impl AsRef<[u8]>, impl AsRef<[u8]>)>,
    ) -> Result<()> {
        // Compress before taking the lock so that a failure leaves the map untouched.
        let compressed_pairs = pairs
            .into_iter()
            .map(|(key, value)| {
                let compressed = compress(value.as_ref())?;
                Ok((Arc::<[u8]>::from(key.as_ref()), Arc::<[u8]>::from(compressed)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut map = self.map.lock();
        let mut new_map = map.clone();

        for (key, value) in compressed_pairs {
            new_map.insert(key, value);
        }

        *map = new_map;

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

/// Keys of one kind start with the same prefix so that they sort next to each other.
pub trait PrefixableKey {
    const PREFIX: &'static str;

    #[must_use]
    fn has_prefix(bytes: &[u8]) -> bool {
        bytes.starts_with(Self::PREFIX.as_bytes())
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().compress_vec(data).map_err(Into::into)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    Decoder::new().decompress_vec(data).map_err(Into::into)
}
