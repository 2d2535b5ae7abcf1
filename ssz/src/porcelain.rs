use std::sync::Arc;

use ethereum_types::H256;

pub trait SszHash {
    fn hash_tree_root(&self) -> H256;
}

impl<T: SszHash + ?Sized> SszHash for &T {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        (*self).hash_tree_root()
    }
}

impl<T: SszHash + ?Sized> SszHash for Arc<T> {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        self.as_ref().hash_tree_root()
    }
}
