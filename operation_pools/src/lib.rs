pub use crate::{
    attestation_pool::{AttestationPool, InMemoryAttestationPool},
    error::Error,
    voluntary_exits::{
        validate_voluntary_exit, validate_voluntary_exit_at, ExitError, SignatureMalformation,
        SubmittedVoluntaryExit,
    },
};

mod attestation_pool;
mod error;
mod voluntary_exits;
