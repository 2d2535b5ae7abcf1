use blst::min_pk::{AggregatePublicKey as RawAggregatePublicKey, PublicKey as RawPublicKey};
use derive_more::From;

use crate::{error::Error, public_key_bytes::PublicKeyBytes};

#[derive(Clone, Copy, PartialEq, Eq, Debug, From)]
pub struct PublicKey(RawPublicKey);

impl TryFrom<PublicKeyBytes> for PublicKey {
    type Error = Error;

    #[inline]
    fn try_from(bytes: PublicKeyBytes) -> Result<Self, Self::Error> {
        let raw =
            RawPublicKey::uncompress(bytes.as_bytes()).map_err(|_| Error::InvalidPublicKey)?;

        // Rejects the point at infinity and points outside the subgroup.
        raw.validate().map_err(|_| Error::InvalidPublicKey)?;

        Ok(Self(raw))
    }
}

impl PublicKey {
    pub fn aggregate_nonempty<'keys>(
        public_keys: impl IntoIterator<Item = &'keys Self>,
    ) -> Result<Self, Error> {
        let mut public_keys = public_keys.into_iter();

        let first = public_keys.next().ok_or(Error::NoPublicKeysToAggregate)?;
        let mut aggregate = RawAggregatePublicKey::from_public_key(first.as_raw());

        for public_key in public_keys {
            aggregate.add_aggregate(&RawAggregatePublicKey::from_public_key(public_key.as_raw()));
        }

        Ok(Self(aggregate.to_public_key()))
    }

    pub(crate) const fn as_raw(&self) -> &RawPublicKey {
        &self.0
    }
}
