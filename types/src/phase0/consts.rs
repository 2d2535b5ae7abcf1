use hex_literal::hex;

use crate::phase0::primitives::{DomainType, Epoch, Slot, H32};

pub const DOMAIN_BEACON_ATTESTER: DomainType = H32(hex!("01000000"));
pub const DOMAIN_BEACON_PROPOSER: DomainType = H32(hex!("00000000"));
pub const DOMAIN_DEPOSIT: DomainType = H32(hex!("03000000"));
pub const DOMAIN_VOLUNTARY_EXIT: DomainType = H32(hex!("04000000"));
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;

// List limits. These are the same in every preset.
pub const MAX_ATTESTATIONS: usize = 128;
pub const MAX_DEPOSITS: usize = 16;
pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;
pub const MAX_VOLUNTARY_EXITS: usize = 16;
pub const VALIDATOR_REGISTRY_LIMIT: usize = 1 << 40;

/// Set in [`ParticipationFlags`] of validators whose attestation for the epoch was included.
///
/// [`ParticipationFlags`]: crate::phase0::primitives::ParticipationFlags
pub const TIMELY_TARGET_FLAG: u8 = 1;
