use bls::{Signature, SignatureBytes};
use helper_functions::{accessors, predicates, signing::SignForSingleFork};
use log::debug;
use thiserror::Error;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::FAR_FUTURE_EPOCH,
        containers::{SignedVoluntaryExit, VoluntaryExit},
        primitives::{Epoch, UnixSeconds, ValidatorIndex},
    },
    preset::Preset,
};

/// A voluntary exit as submitted by a validator client.
///
/// The signature has not been checked for length or validity yet.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SubmittedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ExitError {
    #[error("unknown validator index {0}")]
    UnknownValidator(ValidatorIndex),
    #[error("validator {0} has already initiated an exit")]
    AlreadyExited(ValidatorIndex),
    #[error("validator {0} is not active")]
    NotActive(ValidatorIndex),
    #[error("validator {validator_index} cannot exit before epoch {required_epoch}")]
    TooEarly {
        validator_index: ValidatorIndex,
        required_epoch: Epoch,
    },
    #[error("malformed signature: {0}")]
    MalformedSignature(SignatureMalformation),
    #[error("incorrect signature")]
    IncorrectSignature,
    #[error("could not read system clock: {0:#}")]
    SystemClock(anyhow::Error),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum SignatureMalformation {
    #[error("signature must be 96 bytes")]
    WrongLength { length: usize },
    #[error("could not unmarshal bytes into signature")]
    InvalidPoint,
}

/// Validates `exit` against `state` at the current wall-clock time.
///
/// Neither `state` nor anything else is modified.
pub fn validate_voluntary_exit<P: Preset>(
    config: &Config,
    state: &BeaconState,
    genesis_time: UnixSeconds,
    exit: &SubmittedVoluntaryExit,
) -> Result<SignedVoluntaryExit, ExitError> {
    let current_epoch =
        clock::current_epoch::<P>(config, genesis_time).map_err(ExitError::SystemClock)?;

    validate_at_epoch::<P>(config, state, current_epoch, exit)
}

/// Like [`validate_voluntary_exit`], but at the time `now` rather than the current time.
pub fn validate_voluntary_exit_at<P: Preset>(
    config: &Config,
    state: &BeaconState,
    genesis_time: UnixSeconds,
    now: UnixSeconds,
    exit: &SubmittedVoluntaryExit,
) -> Result<SignedVoluntaryExit, ExitError> {
    let current_epoch = clock::epoch_at_time::<P>(config, now, genesis_time);

    validate_at_epoch::<P>(config, state, current_epoch, exit)
}

fn validate_at_epoch<P: Preset>(
    config: &Config,
    state: &BeaconState,
    current_epoch: Epoch,
    exit: &SubmittedVoluntaryExit,
) -> Result<SignedVoluntaryExit, ExitError> {
    let SubmittedVoluntaryExit { message, signature } = exit;
    let validator_index = message.validator_index;

    let validator = state
        .validator(validator_index)
        .ok_or(ExitError::UnknownValidator(validator_index))?;

    if validator.exit_epoch != FAR_FUTURE_EPOCH {
        return Err(ExitError::AlreadyExited(validator_index));
    }

    if !predicates::is_active_validator(validator, current_epoch) {
        return Err(ExitError::NotActive(validator_index));
    }

    let required_epoch = validator
        .activation_epoch
        .saturating_add(config.shard_committee_period);

    if message.epoch.max(current_epoch) < required_epoch {
        return Err(ExitError::TooEarly {
            validator_index,
            required_epoch,
        });
    }

    let signature_bytes = SignatureBytes::try_from(signature.as_slice()).map_err(|_| {
        ExitError::MalformedSignature(SignatureMalformation::WrongLength {
            length: signature.len(),
        })
    })?;

    let decompressed = Signature::try_from(signature_bytes)
        .map_err(|_| ExitError::MalformedSignature(SignatureMalformation::InvalidPoint))?;

    let public_key = accessors::public_key(state, validator_index).map_err(|error| {
        debug!("public key of validator {validator_index} is invalid: {error:#}");
        ExitError::IncorrectSignature
    })?;

    let signing_root = SignForSingleFork::<P>::signing_root(message, config, state);

    if !decompressed.verify(signing_root, &public_key) {
        return Err(ExitError::IncorrectSignature);
    }

    Ok(SignedVoluntaryExit {
        message: *message,
        signature: signature_bytes,
    })
}
