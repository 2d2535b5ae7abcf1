use blst::{
    min_pk::{AggregateSignature as RawAggregateSignature, Signature as RawSignature},
    BLST_ERROR,
};
use derive_more::From;

use crate::{
    consts::DOMAIN_SEPARATION_TAG, error::Error, public_key::PublicKey,
    signature_bytes::SignatureBytes,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, From)]
pub struct Signature(RawSignature);

impl TryFrom<SignatureBytes> for Signature {
    type Error = Error;

    #[inline]
    fn try_from(bytes: SignatureBytes) -> Result<Self, Self::Error> {
        RawSignature::uncompress(bytes.as_bytes())
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl Signature {
    #[must_use]
    pub fn verify(&self, message: impl AsRef<[u8]>, public_key: &PublicKey) -> bool {
        let result = self.0.verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            &[],
            public_key.as_raw(),
            false,
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    #[must_use]
    pub fn fast_aggregate_verify<'keys>(
        &self,
        message: impl AsRef<[u8]>,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> bool {
        let public_keys = public_keys
            .into_iter()
            .map(PublicKey::as_raw)
            .collect::<Vec<_>>();

        let result = self.0.fast_aggregate_verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            public_keys.as_slice(),
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    #[inline]
    pub fn aggregate_in_place(&mut self, other: Self) {
        let mut self_aggregate = RawAggregateSignature::from_signature(&self.0);
        let other_aggregate = RawAggregateSignature::from_signature(&other.0);
        self_aggregate.add_aggregate(&other_aggregate);
        self.0 = self_aggregate.to_signature();
    }

    #[must_use]
    pub const fn as_raw(&self) -> &RawSignature {
        &self.0
    }
}
