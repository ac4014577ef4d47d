//! Helpers for constructing deterministic keys and states in tests.
//!
//! Real genesis construction (deposit processing, activation queue) lives in
//! `state_processing::genesis`; the builder here takes a shortcut by writing an already-active
//! validator registry straight into a fresh state.

use crate::{
    BeaconState, ChainSpec, Epoch, Eth1Data, EthSpec, Hash256, Keypair, PublicKeyBytes, SecretKey,
    Validator,
};
use int_to_bytes::int_to_fixed_bytes32;
use tree_hash::TreeHash;

/// Generates `validator_count` keypairs where the secret key is derived from the validator
/// index.
///
/// The keys are deterministic: the same index always produces the same keypair.
pub fn generate_deterministic_keypairs(validator_count: usize) -> Vec<Keypair> {
    (0..validator_count)
        .map(generate_deterministic_keypair)
        .collect()
}

/// Generates a single deterministic keypair, where the secret key is derived from the validator
/// index.
pub fn generate_deterministic_keypair(validator_index: usize) -> Keypair {
    // Offset by one so the all-zero IKM is never used.
    let sk = SecretKey::from_ikm(&int_to_fixed_bytes32(validator_index as u64 + 1));
    let pk = sk.public_key();
    Keypair::from_components(pk, sk)
}

/// Builds a state at the genesis slot with one active validator per keypair, each with the
/// maximum effective balance.
///
/// This bypasses deposit processing entirely; it is only suitable for tests.
pub fn build_initial_state<E: EthSpec>(
    keypairs: &[Keypair],
    genesis_time: u64,
    spec: &ChainSpec,
) -> BeaconState<E> {
    let eth1_data = Eth1Data {
        deposit_root: Hash256::zero(),
        deposit_count: keypairs.len() as u64,
        block_hash: Hash256::zero(),
    };

    let mut state = BeaconState::new(genesis_time, eth1_data, spec);

    for keypair in keypairs {
        let validator = Validator {
            pubkey: PublicKeyBytes::from(&keypair.pk),
            withdrawal_credentials: Hash256::zero(),
            effective_balance: spec.max_effective_balance,
            slashed: false,
            activation_eligibility_epoch: Epoch::new(0),
            activation_epoch: Epoch::new(0),
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
        };

        state
            .validators
            .push(validator)
            .expect("validator registry limit is far above test sizes");
        state
            .balances
            .push(spec.max_effective_balance)
            .expect("balances limit is far above test sizes");
        state
            .previous_epoch_participation
            .push(Default::default())
            .expect("participation limit is far above test sizes");
        state
            .current_epoch_participation
            .push(Default::default())
            .expect("participation limit is far above test sizes");
        state
            .inactivity_scores
            .push(0)
            .expect("inactivity scores limit is far above test sizes");
    }

    state.eth1_deposit_index = keypairs.len() as u64;
    state.genesis_validators_root = state.validators.tree_hash_root();

    state
}
