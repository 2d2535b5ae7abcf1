use derive_more::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{SszHash, H256};

use crate::{consts::COMPRESSED_SIGNATURE_SIZE, error::Error, signature::Signature};

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct SignatureBytes(COMPRESSED_SIGNATURE_SIZE);
}

impl_fixed_hash_serde!(SignatureBytes, COMPRESSED_SIGNATURE_SIZE);

impl From<Signature> for SignatureBytes {
    #[inline]
    fn from(signature: Signature) -> Self {
        Self(signature.as_raw().compress())
    }
}

impl TryFrom<&[u8]> for SignatureBytes {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes = bytes
            .try_into()
            .map_err(|_| Error::InvalidSignatureLength {
                expected: COMPRESSED_SIGNATURE_SIZE,
                actual: bytes.len(),
            })?;

        Ok(Self(bytes))
    }
}

impl SszHash for SignatureBytes {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_bytes(self)
    }
}

impl SignatureBytes {
    /// The compressed point at infinity.
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.as_mut()[0] = 0xc0;
        bytes
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::empty()
    }
}
