use anyhow::Result;
use bls::{PublicKey, SecretKey, Signature, SignatureBytes};
use ssz::SszHash;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_VOLUNTARY_EXIT},
        containers::{AttestationData, BeaconBlock, VoluntaryExit},
        primitives::{DomainType, Epoch, H256},
    },
    preset::Preset,
};

use crate::{
    accessors,
    error::SignatureKind,
    misc,
    verifier::{SingleVerifier, Verifier as _},
};

/// Objects signed with a domain that depends on the fork active at a particular epoch.
pub trait SignForSingleFork<P: Preset>: SszHash {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn epoch(&self) -> Epoch;

    fn signing_root(&self, config: &Config, beacon_state: &BeaconState) -> H256 {
        let epoch = Some(self.epoch());
        let domain = accessors::get_domain::<P>(config, beacon_state, Self::DOMAIN_TYPE, epoch);
        misc::compute_signing_root(self, domain)
    }

    fn sign(
        &self,
        config: &Config,
        beacon_state: &BeaconState,
        secret_key: &SecretKey,
    ) -> Signature {
        secret_key.sign(self.signing_root(config, beacon_state))
    }

    fn verify(
        &self,
        config: &Config,
        beacon_state: &BeaconState,
        signature_bytes: SignatureBytes,
        public_key: &PublicKey,
    ) -> Result<()> {
        SingleVerifier.verify_singular(
            self.signing_root(config, beacon_state),
            signature_bytes,
            public_key,
            Self::SIGNATURE_KIND,
        )
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/99934ee16c7e990c8c39bc66e1aa58845057faa0/specs/phase0/validator.md#aggregate-signature>
impl<P: Preset> SignForSingleFork<P> for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Attestation;

    fn epoch(&self) -> Epoch {
        self.target.epoch
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/99934ee16c7e990c8c39bc66e1aa58845057faa0/specs/phase0/validator.md#signature>
impl<P: Preset> SignForSingleFork<P> for BeaconBlock {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

/// <https://github.com/ethereum/consensus-specs/blob/99934ee16c7e990c8c39bc66e1aa58845057faa0/specs/phase0/beacon-chain.md#voluntary-exits>
impl<P: Preset> SignForSingleFork<P> for VoluntaryExit {
    const DOMAIN_TYPE: DomainType = DOMAIN_VOLUNTARY_EXIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::VoluntaryExit;

    fn epoch(&self) -> Epoch {
        self.epoch
    }
}
