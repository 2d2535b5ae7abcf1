#![expect(clippy::module_name_repetitions)]

use anyhow::{ensure, Result};
use bls::{AggregateSignature, PublicKey, Signature, SignatureBytes};
use tap::TryConv as _;
use types::phase0::primitives::H256;

use crate::error::{Error, SignatureKind};

pub trait Verifier {
    const IS_NULL: bool;

    fn verify_singular(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
        signature_kind: SignatureKind,
    ) -> Result<()>;

    fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        signature_kind: SignatureKind,
    ) -> Result<()>;
}

impl<V: Verifier> Verifier for &mut V {
    const IS_NULL: bool = V::IS_NULL;

    #[inline]
    fn verify_singular(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_singular(message, signature_bytes, public_key, signature_kind)
    }

    #[inline]
    fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        (*self).verify_aggregate(message, signature_bytes, public_keys, signature_kind)
    }
}

/// Skips all signature checks. Used when processing blocks from trusted sources.
pub struct NullVerifier;

impl Verifier for NullVerifier {
    const IS_NULL: bool = true;

    #[inline]
    fn verify_singular(
        &mut self,
        _message: H256,
        _signature_bytes: SignatureBytes,
        _public_key: &PublicKey,
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn verify_aggregate<'keys>(
        &mut self,
        _message: H256,
        _signature_bytes: SignatureBytes,
        _public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        _signature_kind: SignatureKind,
    ) -> Result<()> {
        Ok(())
    }
}

pub struct SingleVerifier;

impl Verifier for SingleVerifier {
    const IS_NULL: bool = false;

    fn verify_singular(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        ensure!(
            signature_bytes
                .try_conv::<Signature>()?
                .verify(message, public_key),
            Error::SignatureInvalid(signature_kind),
        );

        Ok(())
    }

    fn verify_aggregate<'keys>(
        &mut self,
        message: H256,
        signature_bytes: SignatureBytes,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
        signature_kind: SignatureKind,
    ) -> Result<()> {
        ensure!(
            signature_bytes
                .try_conv::<AggregateSignature>()?
                .fast_aggregate_verify(message, public_keys),
            Error::SignatureInvalid(signature_kind),
        );

        Ok(())
    }
}
