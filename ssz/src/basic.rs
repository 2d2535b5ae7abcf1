use ethereum_types::{H160, H256, H32};

use crate::porcelain::SszHash;

impl SszHash for bool {
    fn hash_tree_root(&self) -> H256 {
        u8::from(*self).hash_tree_root()
    }
}

impl SszHash for u8 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[0] = *self;
        chunk
    }
}

impl SszHash for u64 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
        chunk
    }
}

impl SszHash for H256 {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszHash for H160 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        chunk
    }
}

impl SszHash for H32 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        chunk
    }
}
