use derive_more::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{SszHash, H256};

use crate::{consts::COMPRESSED_PUBLIC_KEY_SIZE, public_key::PublicKey};

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct PublicKeyBytes(COMPRESSED_PUBLIC_KEY_SIZE);
}

impl_fixed_hash_serde!(PublicKeyBytes, COMPRESSED_PUBLIC_KEY_SIZE);

impl From<PublicKey> for PublicKeyBytes {
    #[inline]
    fn from(public_key: PublicKey) -> Self {
        Self(public_key.as_raw().compress())
    }
}

impl hex::FromHex for PublicKeyBytes {
    type Error = <[u8; COMPRESSED_PUBLIC_KEY_SIZE] as hex::FromHex>::Error;

    fn from_hex<T: AsRef<[u8]>>(digits: T) -> Result<Self, Self::Error> {
        hex::FromHex::from_hex(digits).map(Self)
    }
}

impl SszHash for PublicKeyBytes {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_bytes(self)
    }
}
