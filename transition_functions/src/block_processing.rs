use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{
        get_beacon_proposer_index, get_current_epoch, get_previous_epoch, get_validator, public_key,
    },
    error::SignatureKind,
    misc::compute_epoch_at_slot,
    mutators::{balance, increase_balance, initiate_validator_exit},
    predicates::{is_active_validator, is_sorted_and_unique},
    signing::SignForSingleFork,
    verifier::Verifier,
};
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{
            FAR_FUTURE_EPOCH, MAX_ATTESTATIONS, MAX_DEPOSITS, MAX_VALIDATORS_PER_COMMITTEE,
            MAX_VOLUNTARY_EXITS, TIMELY_TARGET_FLAG,
        },
        containers::{
            Attestation, BeaconBlock, BeaconBlockBody, BeaconBlockHeader, Deposit,
            SignedVoluntaryExit, Validator,
        },
        primitives::{ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::error::Error;

pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState,
    block: &BeaconBlock,
    mut verifier: impl Verifier,
) -> Result<()> {
    process_block_header::<P>(state, block)?;
    process_operations::<P>(config, state, &block.body, &mut verifier)
}

fn process_block_header<P: Preset>(state: &mut BeaconState, block: &BeaconBlock) -> Result<()> {
    // > Verify that the slots match
    ensure!(
        block.slot == state.slot,
        Error::SlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        },
    );

    // > Verify that the block is newer than latest block header
    ensure!(
        block.slot > state.latest_block_header.slot,
        Error::BlockNotNewerThanLatestBlockHeader {
            block_slot: block.slot,
            block_header_slot: state.latest_block_header.slot,
        },
    );

    // > Verify that proposer index is the correct index
    let computed = get_beacon_proposer_index::<P>(state)?;
    let in_block = block.proposer_index;

    ensure!(
        computed == in_block,
        Error::ProposerIndexMismatch { computed, in_block },
    );

    // > Verify that the parent matches
    let computed = state.latest_block_header.hash_tree_root();
    let in_block = block.parent_root;

    ensure!(
        computed == in_block,
        Error::ParentRootMismatch { computed, in_block },
    );

    // > Cache current block as the new latest block
    state.latest_block_header = BeaconBlockHeader {
        // > Overwritten in the next process_slot call
        state_root: H256::zero(),
        ..block.to_header()
    };

    // > Verify proposer is not slashed
    let index = block.proposer_index;

    ensure!(
        !get_validator(state, index)?.slashed,
        Error::ProposerSlashed { index },
    );

    Ok(())
}

fn process_operations<P: Preset>(
    config: &Config,
    state: &mut BeaconState,
    body: &BeaconBlockBody,
    mut verifier: impl Verifier,
) -> Result<()> {
    validate_operation_counts(body)?;

    for attestation in &body.attestations {
        process_attestation::<P, _>(config, state, attestation, &mut verifier)?;
    }

    for deposit in &body.deposits {
        process_deposit::<P>(state, deposit)?;
    }

    for voluntary_exit in &body.voluntary_exits {
        process_voluntary_exit::<P>(config, state, *voluntary_exit, &mut verifier)?;
    }

    Ok(())
}

/// Checks that every list in `body` fits within its limit.
///
/// Block roots are only defined for bodies that pass this check, so it has to run before the block
/// is hashed.
pub fn validate_operation_counts(body: &BeaconBlockBody) -> Result<()> {
    check_operation_count("attestations", body.attestations.len(), MAX_ATTESTATIONS)?;
    check_operation_count("deposits", body.deposits.len(), MAX_DEPOSITS)?;
    check_operation_count("voluntary exits", body.voluntary_exits.len(), MAX_VOLUNTARY_EXITS)?;

    for attestation in &body.attestations {
        check_operation_count(
            "attesting indices",
            attestation.attesting_indices.len(),
            MAX_VALIDATORS_PER_COMMITTEE,
        )?;
    }

    Ok(())
}

fn check_operation_count(kind: &'static str, in_block: usize, maximum: usize) -> Result<()> {
    ensure!(
        in_block <= maximum,
        Error::TooManyOperations {
            kind,
            maximum,
            in_block,
        },
    );

    Ok(())
}

fn process_attestation<P: Preset, V: Verifier>(
    config: &Config,
    state: &mut BeaconState,
    attestation: &Attestation,
    mut verifier: V,
) -> Result<()> {
    let data = attestation.data;
    let current_epoch = get_current_epoch::<P>(state);
    let previous_epoch = get_previous_epoch::<P>(state);

    ensure!(
        data.target.epoch == current_epoch || data.target.epoch == previous_epoch,
        Error::AttestationTargetsWrongEpoch {
            target_epoch: data.target.epoch,
        },
    );

    ensure!(
        data.target.epoch == compute_epoch_at_slot::<P>(data.slot),
        Error::AttestationTargetsWrongEpoch {
            target_epoch: data.target.epoch,
        },
    );

    // > MIN_ATTESTATION_INCLUSION_DELAY <= state.slot - data.slot <= SLOTS_PER_EPOCH
    ensure!(
        data.slot < state.slot && state.slot <= data.slot + P::SLOTS_PER_EPOCH.get(),
        Error::AttestationOutsideInclusionRange {
            state_slot: state.slot,
            attestation_slot: data.slot,
        },
    );

    let indices = attestation.attesting_indices.as_slice();

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);
    ensure!(
        is_sorted_and_unique(indices),
        Error::AttestingIndicesNotSortedAndUnique,
    );

    if !V::IS_NULL {
        let public_keys = indices
            .iter()
            .map(|index| public_key(state, *index))
            .collect::<Result<Vec<_>>>()?;

        verifier.verify_aggregate(
            SignForSingleFork::<P>::signing_root(&data, config, state),
            attestation.signature,
            public_keys.iter(),
            SignatureKind::Attestation,
        )?;
    }

    let participation = if data.target.epoch == current_epoch {
        &mut state.current_epoch_participation
    } else {
        &mut state.previous_epoch_participation
    };

    for index in indices {
        if let Some(flags) = usize::try_from(*index)
            .ok()
            .and_then(|index| participation.get_mut(index))
        {
            *flags |= TIMELY_TARGET_FLAG;
        }
    }

    Ok(())
}

/// Deposits are applied without checking proofs or proofs of possession.
fn process_deposit<P: Preset>(state: &mut BeaconState, deposit: &Deposit) -> Result<()> {
    let data = deposit.data;

    if let Some(validator_index) = state
        .validators
        .iter()
        .position(|validator| validator.pubkey == data.pubkey)
    {
        increase_balance(
            balance(state, ValidatorIndex::try_from(validator_index)?)?,
            data.amount,
        );

        return Ok(());
    }

    let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();

    // > Add validator and balance entries
    state.validators.push(Validator {
        pubkey: data.pubkey,
        withdrawal_credentials: data.withdrawal_credentials,
        effective_balance: (data.amount - data.amount % increment).min(P::MAX_EFFECTIVE_BALANCE),
        slashed: false,
        activation_eligibility_epoch: FAR_FUTURE_EPOCH,
        activation_epoch: FAR_FUTURE_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
    });

    state.balances.push(data.amount);
    state.previous_epoch_participation.push(0);
    state.current_epoch_participation.push(0);

    Ok(())
}

pub fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut BeaconState,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    validate_voluntary_exit_with_verifier::<P, _>(config, state, signed_voluntary_exit, verifier)?;

    // > Initiate exit
    initiate_validator_exit::<P>(config, state, signed_voluntary_exit.message.validator_index)
}

fn validate_voluntary_exit_with_verifier<P: Preset, V: Verifier>(
    config: &Config,
    state: &BeaconState,
    signed_voluntary_exit: SignedVoluntaryExit,
    mut verifier: V,
) -> Result<()> {
    let voluntary_exit = signed_voluntary_exit.message;
    let index = voluntary_exit.validator_index;
    let validator = get_validator(state, index)?;
    let current_epoch = get_current_epoch::<P>(state);

    // > Verify the validator is active
    ensure!(
        is_active_validator(validator, current_epoch),
        Error::ValidatorNotActive {
            index,
            current_epoch,
        },
    );

    // > Verify exit has not been initiated
    ensure!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        Error::ValidatorAlreadyExited {
            index,
            exit_epoch: validator.exit_epoch,
        },
    );

    // > Exits must specify an epoch when they become valid; they are not valid before then
    ensure!(
        current_epoch >= voluntary_exit.epoch,
        Error::VoluntaryExitIsExpired {
            current_epoch,
            epoch: voluntary_exit.epoch,
        },
    );

    // > Verify the validator has been active long enough
    ensure!(
        current_epoch >= validator.activation_epoch + config.shard_committee_period,
        Error::ValidatorHasNotBeenActiveLongEnough {
            index,
            activation_epoch: validator.activation_epoch,
            current_epoch,
        },
    );

    // > Verify signature
    if !V::IS_NULL {
        verifier.verify_singular(
            SignForSingleFork::<P>::signing_root(&voluntary_exit, config, state),
            signed_voluntary_exit.signature,
            &public_key(state, index)?,
            SignatureKind::VoluntaryExit,
        )?;
    }

    Ok(())
}
