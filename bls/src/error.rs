use static_assertions::assert_eq_size;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature must be {expected} bytes but was {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },
    #[error("no public keys to aggregate")]
    NoPublicKeysToAggregate,
}

assert_eq_size!(Error, [usize; 3]);
