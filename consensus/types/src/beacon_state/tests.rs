use crate::test_utils::{build_initial_state, generate_deterministic_keypairs};
use crate::{
    BeaconState, ChainSpec, Epoch, EthSpec, Hash256, MinimalEthSpec, RelativeEpoch, Slot,
};
use ssz::{Decode, Encode};
use tree_hash::TreeHash;

type E = MinimalEthSpec;

fn test_state(validator_count: usize) -> (BeaconState<E>, ChainSpec) {
    let spec = E::default_spec();
    let state = build_initial_state::<E>(
        &generate_deterministic_keypairs(validator_count),
        0,
        &spec,
    );
    (state, spec)
}

#[test]
fn registry_vectors_remain_parallel() {
    let (state, _) = test_state(16);

    assert_eq!(state.validators.len(), state.balances.len());
    assert_eq!(state.validators.len(), state.current_epoch_participation.len());
    assert_eq!(state.validators.len(), state.previous_epoch_participation.len());
    assert_eq!(state.validators.len(), state.inactivity_scores.len());
}

#[test]
fn ssz_round_trip_preserves_tree_hash() {
    let (mut state, spec) = test_state(8);
    state.build_all_caches(&spec).unwrap();

    let bytes = state.as_ssz_bytes();
    let decoded = BeaconState::<E>::from_ssz_bytes(&bytes).unwrap();

    assert_eq!(decoded.tree_hash_root(), state.tree_hash_root());

    // The decoded state has empty caches; dropping the caches on the original must make the two
    // states identical.
    state.drop_all_caches();
    assert_eq!(decoded, state);
}

#[test]
fn proposer_index_is_deterministic() {
    let (mut state, spec) = test_state(16);
    state
        .build_committee_cache(RelativeEpoch::Current, &spec)
        .unwrap();

    for slot in 0..E::slots_per_epoch() {
        let slot = Slot::new(slot);
        let a = state.get_beacon_proposer_index(slot, &spec).unwrap();
        let b = state.get_beacon_proposer_index(slot, &spec).unwrap();
        assert_eq!(a, b);
        assert!(a < state.validators.len());
    }
}

#[test]
fn proposer_index_rejects_other_epochs() {
    let (state, spec) = test_state(16);

    let next_epoch_slot = Slot::new(E::slots_per_epoch());
    assert!(state
        .get_beacon_proposer_index(next_epoch_slot, &spec)
        .is_err());
}

#[test]
fn block_and_state_roots_respect_ring_bounds() {
    let (mut state, _) = test_state(8);

    // At slot zero, no historical roots are readable.
    assert!(state.get_block_root(Slot::new(0)).is_err());

    state.slot = Slot::new(1);
    state.set_block_root(Slot::new(0), Hash256::repeat_byte(1)).unwrap();
    assert_eq!(
        state.get_block_root(Slot::new(0)),
        Ok(&Hash256::repeat_byte(1))
    );

    // Slots at or ahead of the state are unreadable.
    assert!(state.get_block_root(Slot::new(1)).is_err());
}

#[test]
fn randao_mix_bounds() {
    let (mut state, _) = test_state(8);

    let epochs_per_vector = E::epochs_per_historical_vector() as u64;
    state.slot = Epoch::new(epochs_per_vector * 2).start_slot(E::slots_per_epoch());

    let current_epoch = state.current_epoch();

    assert!(state.get_randao_mix(current_epoch).is_ok());
    assert!(state.get_randao_mix(current_epoch - (epochs_per_vector - 1)).is_ok());
    assert!(state.get_randao_mix(current_epoch - epochs_per_vector).is_err());
    assert!(state.get_randao_mix(current_epoch + 1).is_err());
}

#[test]
fn effective_balance_invariants_at_genesis() {
    let (state, spec) = test_state(16);

    for validator in state.validators.iter() {
        assert!(validator.effective_balance <= spec.max_effective_balance);
        assert_eq!(
            validator.effective_balance % spec.effective_balance_increment,
            0
        );
    }
}

#[test]
fn total_active_balance_floors_at_increment() {
    let (state, spec) = test_state(4);

    let total = state.get_total_active_balance(&spec).unwrap();
    assert_eq!(total, 4 * spec.max_effective_balance);

    // A total over no validators is floored, not zero.
    assert_eq!(
        state.get_total_balance(&[], &spec).unwrap(),
        spec.effective_balance_increment
    );
}
