//! Merkleization of consensus objects.
//!
//! Only the hashing half of SSZ is needed here. Blocks and states are persisted with `bincode`,
//! so there is no encoder or decoder.

pub use ethereum_types::{H160, H256, H32};
pub use hashing;

pub use crate::{
    merkle::{
        depth_for_chunk_count, hash_composite_list, hash_packed_bytes_list, hash_packed_u64_list,
        merkleize_bytes, merkleize_chunks, merkleize_fields, mix_in_length,
    },
    porcelain::SszHash,
};

mod basic;
mod merkle;
mod porcelain;

/// Implements [`SszHash`] for a container whose fields all implement it.
///
/// Fields are listed in declaration order. Fields of list types need their limits and must be
/// hashed by hand.
#[macro_export]
macro_rules! impl_container_hash {
    ($type: ty { $($field: ident),+ $(,)? }) => {
        impl $crate::SszHash for $type {
            fn hash_tree_root(&self) -> $crate::H256 {
                $crate::merkleize_fields(&[$($crate::SszHash::hash_tree_root(&self.$field)),+])
            }
        }
    };
}
