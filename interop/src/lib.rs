use core::num::NonZeroU64;

use bls::{PublicKeyBytes, SecretKey, SecretKeyBytes, SignatureBytes};
use hex_literal::hex;
use num_bigint::BigUint;
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        containers::{
            BeaconBlock, BeaconBlockBody, BeaconBlockHeader, Fork, SignedBeaconBlock, Validator,
        },
        primitives::{UnixSeconds, ValidatorIndex},
    },
    preset::Preset,
};

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
///
/// Encoded in binary to avoid parsing a decimal string at runtime.
const CURVE_ORDER: &[u8] =
    &hex!("73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001");

const BLS_WITHDRAWAL_PREFIX: u8 = 0x00;

/// Builds a genesis state in which validators `0..validator_count` are active from the start.
///
/// Deposits are not replayed. Every validator starts with the maximum effective balance.
#[must_use]
pub fn quick_start_beacon_state<P: Preset>(
    config: &Config,
    genesis_time: UnixSeconds,
    validator_count: NonZeroU64,
) -> BeaconState {
    let validators = (0..validator_count.get())
        .map(|index| {
            let pubkey = PublicKeyBytes::from(secret_key(index).to_public_key());
            let mut withdrawal_credentials = hashing::hash_384(pubkey);

            withdrawal_credentials.as_bytes_mut()[0] = BLS_WITHDRAWAL_PREFIX;

            Validator {
                pubkey,
                withdrawal_credentials,
                effective_balance: P::MAX_EFFECTIVE_BALANCE,
                slashed: false,
                activation_eligibility_epoch: GENESIS_EPOCH,
                activation_epoch: GENESIS_EPOCH,
                exit_epoch: FAR_FUTURE_EPOCH,
                withdrawable_epoch: FAR_FUTURE_EPOCH,
            }
        })
        .collect::<Vec<_>>();

    let validator_count = validators.len();

    let mut state = BeaconState {
        genesis_time,
        fork: Fork {
            previous_version: config.genesis_fork_version,
            current_version: config.genesis_fork_version,
            epoch: GENESIS_EPOCH,
        },
        latest_block_header: BeaconBlockHeader {
            body_root: BeaconBlockBody::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        },
        validators,
        balances: vec![P::MAX_EFFECTIVE_BALANCE; validator_count],
        previous_epoch_participation: vec![0; validator_count],
        current_epoch_participation: vec![0; validator_count],
        ..BeaconState::default()
    };

    state.genesis_validators_root = state.validators_root();

    state
}

/// The block whose root the latest block header of a genesis state resolves to.
#[must_use]
pub fn genesis_block(genesis_state: &BeaconState) -> SignedBeaconBlock {
    BeaconBlock {
        state_root: genesis_state.hash_tree_root(),
        ..BeaconBlock::default()
    }
    .with_signature(SignatureBytes::empty())
}

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let index_hash = hashing::hash_256(validator_index.hash_tree_root());
    let curve_order = BigUint::from_bytes_be(CURVE_ORDER);
    let secret_key_uint = BigUint::from_bytes_le(index_hash.as_bytes()) % &curve_order;
    let unpadded = secret_key_uint.to_bytes_be();
    let mut padded = SecretKeyBytes::default();
    padded.as_mut()[size_of::<SecretKeyBytes>() - unpadded.len()..]
        .copy_from_slice(unpadded.as_slice());
    padded
        .try_into()
        .expect("the algorithm given in the standard should produce valid secret keys")
}

#[cfg(test)]
mod tests {
    use bls::PublicKey;
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn curve_order_matches_standard() {
        assert_eq!(
            BigUint::from_bytes_be(CURVE_ORDER).to_string(),
            "52435875175126190479447740508185965837690552500527637822603658699938581184513",
        );
    }

    // See <https://github.com/ethereum/eth2.0-pm/blob/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start/keygen_10_validators.yaml>.
    #[test]
    fn keypairs_match_standard() {
        let expected_keypairs = [
            (
                hex!("25295f0d1d592a90b333e26e85149708208e9f8e8bc18f6c77bd62f8ad7a6866"),
                hex!("a99a76ed7796f7be22d5b7e85deeb7c5677e88e511e0b337618f8c4eb61349b4bf2d153f649f7b53359fe8b94a38e44c"),
            ),
            (
                hex!("51d0b65185db6989ab0b560d6deed19c7ead0e24b9b6372cbecb1f26bdfad000"),
                hex!("b89bebc699769726a318c8e9971bd3171297c61aea4a6578a7a4f94b547dcba5bac16a89108b6b6a1fe3695d1a874a0b"),
            ),
            (
                hex!("315ed405fafe339603932eebe8dbfd650ce5dafa561f6928664c75db85f97857"),
                hex!("a3a32b0f8b4ddb83f1a0a853d81dd725dfe577d4f4c3db8ece52ce2b026eca84815c1a7e8e92a4de3d755733bf7e4a9b"),
            ),
            (
                hex!("25b1166a43c109cb330af8945d364722757c65ed2bfed5444b5a2f057f82d391"),
                hex!("88c141df77cd9d8d7a71a75c826c41a9c9f03c6ee1b180f3e7852f6a280099ded351b58d66e653af8e42816a4d8f532e"),
            ),
        ];

        for ((sk_bytes, pk_bytes), validator_index) in expected_keypairs.iter().copied().zip(0..) {
            let expected_public_key = PublicKey::try_from(PublicKeyBytes::from(pk_bytes))
                .expect("every public key given in the standard should be valid");

            let actual_secret_key = secret_key(validator_index);

            assert_eq!(actual_secret_key.to_bytes().as_ref(), sk_bytes.as_slice());
            assert_eq!(actual_secret_key.to_public_key(), expected_public_key);
        }
    }

    #[test]
    fn genesis_block_root_matches_latest_block_header_after_first_slot() {
        let config = Config::minimal();
        let validator_count = NonZeroU64::new(4).expect("4 is nonzero");
        let mut state = quick_start_beacon_state::<Minimal>(&config, 0, validator_count);
        let block = genesis_block(&state);

        state.latest_block_header.state_root = state.hash_tree_root();

        assert_eq!(
            state.latest_block_header.hash_tree_root(),
            block.message.hash_tree_root(),
        );
    }

    #[test]
    fn genesis_validators_are_active_from_genesis() {
        let config = Config::minimal();
        let validator_count = NonZeroU64::new(3).expect("3 is nonzero");
        let state = quick_start_beacon_state::<Minimal>(&config, 100, validator_count);

        assert_eq!(state.genesis_time, 100);
        assert_eq!(state.validators.len(), 3);
        assert_eq!(state.balances, [Minimal::MAX_EFFECTIVE_BALANCE; 3]);
        assert!(state
            .validators
            .iter()
            .all(|validator| validator.activation_epoch == GENESIS_EPOCH));
        assert_ne!(state.validators[0].pubkey, state.validators[1].pubkey);
    }
}
