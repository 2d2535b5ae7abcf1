use thiserror::Error;
use types::phase0::containers::Attestation;

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation has no attesting indices: {attestation:?}")]
    AttestationHasNoAttestingIndices { attestation: Box<Attestation> },
    #[error("attesting indices are not sorted and unique: {attestation:?}")]
    AttestingIndicesNotSortedAndUnique { attestation: Box<Attestation> },
}
