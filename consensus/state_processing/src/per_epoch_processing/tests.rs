use crate::per_epoch_processing::{
    process_effective_balance_updates, process_registry_updates,
};
use crate::per_slot_processing;
use types::test_utils::{build_initial_state, generate_deterministic_keypairs};
use types::*;

const VALIDATOR_COUNT: usize = 16;

fn state_and_spec<E: EthSpec>() -> (BeaconState<E>, ChainSpec) {
    let spec = E::default_spec();
    let state = build_initial_state::<E>(
        &generate_deterministic_keypairs(VALIDATOR_COUNT),
        1_600_000_000,
        &spec,
    );
    (state, spec)
}

#[test]
fn empty_genesis_epoch_advance_leaves_balances_untouched() {
    // Scenario: from genesis with 16 validators, advance a whole (mainnet-length) epoch with no
    // blocks.
    let (mut state, spec) = state_and_spec::<MainnetEthSpec>();
    let original_balances: Vec<_> = state.balances.to_vec();

    while state.slot < Slot::new(MainnetEthSpec::slots_per_epoch()) {
        per_slot_processing(&mut state, None, &spec).expect("per-slot processing succeeds");
    }

    assert_eq!(state.slot, Slot::new(32));
    assert_eq!(state.current_epoch(), Epoch::new(1));

    // Rewards and penalties are skipped for the genesis epoch.
    assert_eq!(state.balances.to_vec(), original_balances);

    // The randao accumulator has rotated: the new epoch starts from the old epoch's mix.
    assert_eq!(
        state.get_randao_mix(Epoch::new(1)).unwrap(),
        state.get_randao_mix(Epoch::new(0)).unwrap(),
    );

    // The fresh participation vector is empty.
    assert!(state
        .current_epoch_participation
        .iter()
        .all(|flags| flags.into_u8() == 0));

    // No justification may have occurred.
    assert_eq!(state.current_justified_checkpoint.epoch, Epoch::new(0));
    assert_eq!(state.finalized_checkpoint.epoch, Epoch::new(0));
}

#[test]
fn effective_balance_hysteresis() {
    let (mut state, spec) = state_and_spec::<MinimalEthSpec>();

    let cases = vec![
        // (balance, pre_effective, post_effective)
        (spec.max_effective_balance, spec.max_effective_balance, spec.max_effective_balance),
        // A drop smaller than the downward threshold does not move the effective balance.
        (
            spec.max_effective_balance - 1,
            spec.max_effective_balance,
            spec.max_effective_balance,
        ),
        // A drop larger than the downward threshold snaps downwards.
        (
            spec.max_effective_balance - spec.effective_balance_increment / 2,
            spec.max_effective_balance,
            spec.max_effective_balance - spec.effective_balance_increment,
        ),
        // A rise above the upward threshold snaps upwards, capped at the maximum.
        (
            spec.max_effective_balance + 2 * spec.effective_balance_increment,
            spec.max_effective_balance - spec.effective_balance_increment,
            spec.max_effective_balance,
        ),
    ];

    for (i, (balance, pre_effective, _)) in cases.iter().enumerate() {
        state.balances[i] = *balance;
        state.validators[i].effective_balance = *pre_effective;
    }

    process_effective_balance_updates(&mut state, &spec).unwrap();

    for (i, (_, _, post_effective)) in cases.iter().enumerate() {
        assert_eq!(
            state.validators[i].effective_balance,
            *post_effective,
            "case {}",
            i
        );
        assert_eq!(
            state.validators[i].effective_balance % spec.effective_balance_increment,
            0
        );
        assert!(state.validators[i].effective_balance <= spec.max_effective_balance);
    }
}

#[test]
fn registry_update_ejects_poor_validators() {
    let (mut state, spec) = state_and_spec::<MinimalEthSpec>();

    // Drop a validator's effective balance to the ejection threshold.
    state.validators[3].effective_balance = spec.ejection_balance;

    process_registry_updates(&mut state, &spec).unwrap();

    let ejected = &state.validators[3];
    assert_ne!(ejected.exit_epoch, spec.far_future_epoch);

    // The others stay untouched.
    assert_eq!(state.validators[0].exit_epoch, spec.far_future_epoch);
}

#[test]
fn registry_update_queues_new_validators_with_churn() {
    let (mut state, spec) = state_and_spec::<MinimalEthSpec>();

    // Add more not-yet-eligible validators than the churn limit.
    let extra = 8;
    for i in 0..extra {
        let mut validator = Validator {
            effective_balance: spec.max_effective_balance,
            ..Validator::default()
        };
        validator.withdrawal_credentials = Hash256::from_low_u64_be(i);
        state.validators.push(validator).unwrap();
        state.balances.push(spec.max_effective_balance).unwrap();
        state
            .previous_epoch_participation
            .push(Default::default())
            .unwrap();
        state
            .current_epoch_participation
            .push(Default::default())
            .unwrap();
        state.inactivity_scores.push(0).unwrap();
    }

    process_registry_updates(&mut state, &spec).unwrap();

    // All extras became eligible for the queue, none activated yet (eligibility must first be
    // finalized).
    for validator in state.validators.iter().skip(VALIDATOR_COUNT) {
        assert_eq!(
            validator.activation_eligibility_epoch,
            state.current_epoch() + 1
        );
        assert_eq!(validator.activation_epoch, spec.far_future_epoch);
    }
}
