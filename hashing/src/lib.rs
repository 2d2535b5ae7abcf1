
use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};

/// Roots of subtrees of the given depth with nothing but zero chunks in them.
///
/// `ZERO_HASHES[40]` is the root of an empty validator registry.
pub static ZERO_HASHES: Lazy<[H256; 41]> = Lazy::new(|| {
    let mut hashes = [H256::zero(); 41];

    for depth in 1..hashes.len() {
        hashes[depth] = hash_256_256(hashes[depth - 1], hashes[depth - 1]);
    }

    hashes
});

#[must_use]
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes).into())
}

#[must_use]
pub fn hash_64(value: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk[..size_of::<u64>()].copy_from_slice(&value.to_le_bytes());
    hash_bytes(chunk)
}

#[must_use]
pub fn hash_256(bytes: H256) -> H256 {
    hash_bytes(bytes)
}

#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    H256(
        Sha256::new()
            .chain_update(left)
            .chain_update(right)
            .finalize()
            .into(),
    )
}

#[must_use]
pub fn hash_384(bytes: impl AsRef<[u8; 48]>) -> H256 {
    hash_bytes(bytes.as_ref())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use itertools::Itertools as _;

    use super::*;

    #[test]
    fn higher_zero_hashes_are_calculated_from_lower_ones() {
        for (lower, higher) in ZERO_HASHES.iter().copied().tuple_windows() {
            assert_eq!(hash_256_256(lower, lower), higher);
        }
    }

    #[test]
    fn zero_hash_at_depth_1_matches_known_value() {
        assert_eq!(
            ZERO_HASHES[1],
            H256(hex!(
                "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
            )),
        );
    }

    #[test]
    fn hash_64_pads_value_to_a_chunk() {
        let mut chunk = [0; 32];
        chunk[0] = 1;
        assert_eq!(hash_64(1), hash_bytes(chunk));
    }
}
