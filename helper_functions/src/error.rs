use parse_display::Display;
use thiserror::Error;
use types::phase0::primitives::{Epoch, ValidatorIndex};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("attestation has no attesting indices")]
    AttestationHasNoAttestingIndices,
    #[error("attesting indices are not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error("no validators are active in epoch {epoch}")]
    NoActiveValidators { epoch: Epoch },
    #[error("{0} is invalid")]
    SignatureInvalid(SignatureKind),
    #[error("validator index {validator_index} is out of bounds")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum SignatureKind {
    #[display("attestation signature")]
    Attestation,
    #[display("block signature")]
    Block,
    #[display("deposit signature")]
    Deposit,
    #[display("voluntary exit signature")]
    VoluntaryExit,
}
