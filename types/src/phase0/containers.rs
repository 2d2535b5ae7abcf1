use bls::{PublicKeyBytes, SignatureBytes};
use serde::{Deserialize, Serialize};
use ssz::{impl_container_hash, SszHash};

use crate::phase0::{
    consts::{MAX_ATTESTATIONS, MAX_DEPOSITS, MAX_VALIDATORS_PER_COMMITTEE, MAX_VOLUNTARY_EXITS},
    primitives::{Epoch, Gwei, Slot, ValidatorIndex, Version, H256},
};

// Signatures and public keys are stored compressed and only decompressed when verifying them.

/// An attestation that names its attesters directly.
///
/// Committees are not modeled, so attesters are listed by index rather than by aggregation bits.
/// Indices must be sorted and unique.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Attestation {
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttestationData {
    pub slot: Slot,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlockBody {
    pub graffiti: H256,
    pub attestations: Vec<Attestation>,
    pub deposits: Vec<Deposit>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: H256,
}

/// A deposit without its Merkle proof. Deposits are taken from blocks as they are.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Deposit {
    pub data: DepositData,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub amount: Gwei,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Fork {
    pub previous_version: Version,
    pub current_version: Version,
    pub epoch: Epoch,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForkData {
    pub current_version: Version,
    pub genesis_validators_root: H256,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: SignatureBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SigningData {
    pub object_root: H256,
    pub domain: H256,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: ValidatorIndex,
}

impl SszHash for Attestation {
    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_fields(&[
            ssz::hash_packed_u64_list(&self.attesting_indices, MAX_VALIDATORS_PER_COMMITTEE),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for BeaconBlockBody {
    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_fields(&[
            self.graffiti,
            ssz::hash_composite_list(&self.attestations, MAX_ATTESTATIONS),
            ssz::hash_composite_list(&self.deposits, MAX_DEPOSITS),
            ssz::hash_composite_list(&self.voluntary_exits, MAX_VOLUNTARY_EXITS),
        ])
    }
}

impl_container_hash!(AttestationData { slot, beacon_block_root, source, target });
impl_container_hash!(BeaconBlock { slot, proposer_index, parent_root, state_root, body });
impl_container_hash!(BeaconBlockHeader {
    slot,
    proposer_index,
    parent_root,
    state_root,
    body_root,
});
impl_container_hash!(Checkpoint { epoch, root });
impl_container_hash!(Deposit { data });
impl_container_hash!(DepositData { pubkey, withdrawal_credentials, amount, signature });
impl_container_hash!(Fork { previous_version, current_version, epoch });
impl_container_hash!(ForkData { current_version, genesis_validators_root });
impl_container_hash!(SignedBeaconBlock { message, signature });
impl_container_hash!(SignedVoluntaryExit { message, signature });
impl_container_hash!(SigningData { object_root, domain });
impl_container_hash!(VoluntaryExit { epoch, validator_index });
impl_container_hash!(Validator {
    pubkey,
    withdrawal_credentials,
    effective_balance,
    slashed,
    activation_eligibility_epoch,
    activation_epoch,
    exit_epoch,
    withdrawable_epoch,
});

impl BeaconBlock {
    #[must_use]
    pub fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body.hash_tree_root(),
        }
    }

    #[must_use]
    pub const fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlock {
        SignedBeaconBlock {
            message: self,
            signature,
        }
    }
}
