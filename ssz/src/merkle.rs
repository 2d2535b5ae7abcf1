use ethereum_types::H256;
use hashing::ZERO_HASHES;

use crate::porcelain::SszHash;

const BYTES_PER_CHUNK: usize = H256::len_bytes();

#[must_use]
pub const fn depth_for_chunk_count(chunk_count: usize) -> usize {
    chunk_count.next_power_of_two().trailing_zeros() as usize
}

/// Computes the root of a tree of the given depth whose leftmost leaves are `chunks`.
///
/// Missing leaves are zero chunks. Passing more than `2^depth` chunks is a bug in the caller.
#[must_use]
pub fn merkleize_chunks(chunks: impl IntoIterator<Item = H256>, depth: usize) -> H256 {
    let mut layer = chunks.into_iter().collect::<Vec<_>>();

    debug_assert!(layer.len() <= 1 << depth);

    if layer.is_empty() {
        return ZERO_HASHES[depth];
    }

    for zero_hash in ZERO_HASHES.iter().take(depth) {
        if layer.len() % 2 == 1 {
            layer.push(*zero_hash);
        }

        layer = layer
            .chunks_exact(2)
            .map(|pair| hashing::hash_256_256(pair[0], pair[1]))
            .collect();
    }

    layer[0]
}

/// Root of a container with the given field roots.
#[must_use]
pub fn merkleize_fields(field_roots: &[H256]) -> H256 {
    merkleize_chunks(
        field_roots.iter().copied(),
        depth_for_chunk_count(field_roots.len()),
    )
}

/// Root of a fixed-length byte vector.
#[must_use]
pub fn merkleize_bytes(bytes: impl AsRef<[u8]>) -> H256 {
    let chunks = pack(bytes.as_ref());
    let depth = depth_for_chunk_count(chunks.len());
    merkleize_chunks(chunks, depth)
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let length = u64::try_from(length).unwrap_or(u64::MAX);
    hashing::hash_256_256(root, length.hash_tree_root())
}

#[must_use]
pub fn hash_composite_list<T: SszHash>(values: &[T], limit: usize) -> H256 {
    let root = merkleize_chunks(
        values.iter().map(SszHash::hash_tree_root),
        depth_for_chunk_count(limit),
    );

    mix_in_length(root, values.len())
}

#[must_use]
pub fn hash_packed_u64_list(values: &[u64], limit: usize) -> H256 {
    let bytes = values
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect::<Vec<_>>();

    let chunk_limit = (limit * size_of::<u64>()).div_ceil(BYTES_PER_CHUNK);
    let root = merkleize_chunks(pack(&bytes), depth_for_chunk_count(chunk_limit));

    mix_in_length(root, values.len())
}

#[must_use]
pub fn hash_packed_bytes_list(bytes: &[u8], limit: usize) -> H256 {
    let chunk_limit = limit.div_ceil(BYTES_PER_CHUNK);
    let root = merkleize_chunks(pack(bytes), depth_for_chunk_count(chunk_limit));

    mix_in_length(root, bytes.len())
}

fn pack(bytes: &[u8]) -> Vec<H256> {
    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|bytes| {
            let mut chunk = H256::zero();
            chunk[..bytes.len()].copy_from_slice(bytes);
            chunk
        })
        .collect()
}
