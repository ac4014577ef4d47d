//! End-to-end tests driving the full orchestrator: state transition, fork choice, persistence
//! and events.

use beacon_chain::test_utils::BeaconChainHarness;
use beacon_chain::{BlockError, EventKind, PayloadStatus, ReceiveOutcome};
use store::ItemStore;
use types::{Epoch, EthSpec, Hash256, MinimalEthSpec, Slot};

type E = MinimalEthSpec;

const VALIDATOR_COUNT: usize = 16;

fn slots_per_epoch() -> u64 {
    E::slots_per_epoch()
}

#[test]
fn empty_slots_advance_without_balance_changes() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    let genesis_balances: Vec<_> = harness.chain.head().beacon_state.balances.to_vec();

    // Advance one whole epoch with no blocks.
    for slot in 1..=slots_per_epoch() {
        harness.chain.on_slot(Slot::new(slot)).unwrap();
    }

    // The head has not moved and no balances have changed (rewards are skipped in the genesis
    // epoch, and without blocks there is nothing to penalize).
    let head = harness.chain.head().clone();
    assert_eq!(head.beacon_block_root, harness.chain.genesis_block_root);
    assert_eq!(head.beacon_state.balances.to_vec(), genesis_balances);

    // No justification may have occurred.
    assert_eq!(
        harness.chain.fork_choice.read().justified_checkpoint().epoch,
        Epoch::new(0)
    );
}

#[test]
fn first_block_becomes_head() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    let genesis_root = harness.chain.genesis_block_root;

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.produce_signed_block(Slot::new(1));
    let block_root = harness.process_valid_block(block);

    let head = harness.chain.head().clone();
    assert_eq!(head.beacon_block_root, block_root);
    assert_eq!(head.beacon_state.slot, Slot::new(1));
    assert_eq!(head.beacon_block.parent_root(), genesis_root);

    // No justification change from a single block.
    assert_eq!(
        head.beacon_state.current_justified_checkpoint.epoch,
        Epoch::new(0)
    );

    // The head change was observed.
    let events = harness.events.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        EventKind::HeadChanged { new_head, reorg_depth: 0, .. } if *new_head == block_root
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, EventKind::BlockProcessed { .. })));
}

#[test]
fn full_participation_justifies_and_finalizes() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    // Run four epochs of fully-attested blocks.
    harness.extend_to_slot(Slot::new(4 * slots_per_epoch()));

    let head_state = harness.chain.head().beacon_state.clone();

    // Justification has reached at least epoch 2 (the first boundary at which the FFG rule
    // fires under full participation)...
    assert!(
        head_state.current_justified_checkpoint.epoch >= Epoch::new(2),
        "expected justification, got {:?}",
        head_state.current_justified_checkpoint
    );

    // ...and the finalization cascade has locked in epoch 2.
    assert_eq!(
        head_state.finalized_checkpoint.epoch,
        Epoch::new(2),
        "expected finalization of epoch 2, got {:?}",
        head_state.finalized_checkpoint
    );

    // Fork choice agrees with the state.
    assert_eq!(
        harness.chain.fork_choice.read().finalized_checkpoint().epoch,
        Epoch::new(2)
    );

    // The checkpoint events fired.
    let events = harness.events.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, EventKind::CheckpointJustified { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, EventKind::CheckpointFinalized { checkpoint } if checkpoint.epoch == Epoch::new(2))));
}

#[test]
fn finalized_checkpoint_is_monotonic() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    let mut last_finalized = Epoch::new(0);
    for epoch in 1..=5u64 {
        harness.extend_to_slot(Slot::new(epoch * slots_per_epoch()));
        let finalized = harness.chain.fork_choice.read().finalized_checkpoint().epoch;
        assert!(finalized >= last_finalized);
        last_finalized = finalized;
    }

    assert!(last_finalized >= Epoch::new(2));
}

#[test]
fn heavier_sibling_triggers_reorg() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    // Build a short chain.
    harness.extend_to_slot(Slot::new(4));

    let parent = harness.chain.head().clone();

    // Block H at slot 5, with no attestations in favour.
    harness.chain.on_slot(Slot::new(5)).unwrap();
    let block_h = harness.produce_signed_block(Slot::new(5));
    let root_h = harness.process_valid_block(block_h);
    assert_eq!(harness.chain.head_root(), root_h);

    // A competing block H' at slot 5, on the same parent, with different content.
    let mut state = parent.beacon_state.clone();
    state_processing::per_slot_processing(&mut state, None, &harness.spec).unwrap();
    state
        .build_committee_cache(types::RelativeEpoch::Current, &harness.spec)
        .unwrap();
    let proposer_index = state
        .get_beacon_proposer_index(Slot::new(5), &harness.spec)
        .unwrap();
    let randao_reveal = harness.sign_randao_reveal(&state, proposer_index, Slot::new(5));
    let mut block_h_prime = harness
        .chain
        .produce_block_on_state(parent.beacon_state.clone(), Slot::new(5), randao_reveal)
        .unwrap();
    block_h_prime.body.graffiti = Hash256::repeat_byte(0x66);

    // Fix up the state root for the modified body.
    let mut post_state = state.clone();
    let mut ctxt = state_processing::ConsensusContext::new(Slot::new(5));
    state_processing::per_block_processing(
        &mut post_state,
        &types::SignedBeaconBlock {
            message: block_h_prime.clone(),
            signature: types::Signature::empty(),
        },
        state_processing::BlockSignatureStrategy::NoVerification,
        &mut ctxt,
        &harness.spec,
    )
    .unwrap();
    block_h_prime.state_root = post_state.canonical_root();

    // Clear the events emitted so far; H's import and the sibling's arrival follow.
    harness.events.drain();

    let block_h_prime = harness.sign_block(block_h_prime, &state);
    let root_h_prime = harness.process_valid_block(block_h_prime);
    assert_ne!(root_h, root_h_prime);

    // All validators vote for H'. The votes are queued by fork choice until the next slot.
    for attestation in harness.make_attestations_for_block(Slot::new(5), root_h_prime) {
        harness
            .chain
            .process_attestation(attestation)
            .expect("vote for H' is valid");
    }

    // At the next slot the queued votes are applied and the head must sit on H'.
    harness.chain.on_slot(Slot::new(6)).unwrap();

    assert_eq!(harness.chain.head_root(), root_h_prime);

    // A depth-1 reorg away from H was observed. Depending on the root tie-break the switch may
    // have occurred at import or at the tick, but the event is the same.
    let events = harness.events.drain();
    assert!(
        events.iter().any(|e| matches!(
            e,
            EventKind::HeadChanged {
                new_head,
                old_head,
                reorg_depth: 1,
            } if *new_head == root_h_prime && *old_head == root_h
        )),
        "expected a depth-1 reorg event, got {:?}",
        events
    );
}

#[test]
fn bad_block_quarantines_descendants_but_not_siblings() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.extend_to_slot(Slot::new(3));
    harness.chain.on_slot(Slot::new(4)).unwrap();

    // A block whose claimed state root differs from the transitioned root by one bit.
    let good_block = harness.produce_signed_block(Slot::new(4));
    let mut bad_block = good_block.clone();
    let mut claimed = bad_block.message.state_root.to_fixed_bytes();
    claimed[0] ^= 0x01;
    bad_block.message.state_root = Hash256::from(claimed);
    // Re-sign over the modified message.
    let bad_block = harness.sign_block(bad_block.message, &harness.chain.head().beacon_state);
    let bad_root = bad_block.canonical_root();

    match harness.process_block(bad_block) {
        Err(BlockError::StateRootMismatch { .. }) => {}
        other => panic!("expected state root mismatch, got {:?}", other),
    }
    assert!(harness.chain.is_bad_block(&bad_root));

    // Any block claiming the bad block as parent is rejected without execution.
    harness.chain.on_slot(Slot::new(5)).unwrap();
    let mut child = harness.produce_signed_block(Slot::new(5));
    child.message.parent_root = bad_root;
    let child = harness.sign_block(child.message, &harness.chain.head().beacon_state);

    match harness.process_block(child) {
        Err(BlockError::ParentInvalid(root)) => assert_eq!(root, bad_root),
        other => panic!("expected parent-invalid, got {:?}", other),
    }

    // A sibling sharing the honest parent is validated independently and accepted.
    let sibling = harness.produce_signed_block(Slot::new(5));
    harness.process_valid_block(sibling);
}

#[test]
fn blocks_conflicting_with_finality_are_rejected() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    // Finalize some epochs.
    harness.extend_to_slot(Slot::new(4 * slots_per_epoch()));
    let finalized = harness.chain.fork_choice.read().finalized_checkpoint();
    assert!(finalized.epoch > Epoch::new(0));

    // A block at the finalized slot (or earlier) can never enter the chain.
    let finalized_slot = finalized.epoch.start_slot(slots_per_epoch());
    let mut block = harness.produce_signed_block(harness.chain.current_slot() + 1);
    block.message.slot = finalized_slot;
    let block = harness.sign_block(block.message, &harness.chain.head().beacon_state);

    match harness.process_block(block) {
        Err(BlockError::WouldRevertFinalizedSlot { .. }) => {}
        other => panic!("expected finalized-slot rejection, got {:?}", other),
    }
}

#[test]
fn future_blocks_are_ignored_not_rejected() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.produce_signed_block(Slot::new(1));

    // Wind the harness back: the chain clock is still at slot 1, deliver a slot-5 block.
    harness.chain.on_slot(Slot::new(1)).unwrap();
    let future_block = harness.produce_signed_block_on_state(
        harness.chain.head().beacon_state.clone(),
        Slot::new(5),
    );

    match harness.chain.receive_block(future_block) {
        ReceiveOutcome::Ignored(_) => {}
        other => panic!("expected ignore of future block, got {:?}", other),
    }

    // The present-slot block is accepted as normal.
    match harness.chain.receive_block(block) {
        ReceiveOutcome::Accepted(_) => {}
        other => panic!("expected acceptance, got {:?}", other),
    }

    // Re-delivery is ignored, not rejected.
    let head_block = harness.chain.head().beacon_block.clone();
    match harness.chain.receive_block(head_block) {
        ReceiveOutcome::Ignored(_) => {}
        other => panic!("expected ignore of known block, got {:?}", other),
    }
}

#[test]
fn unknown_parent_is_ignored() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let mut block = harness.produce_signed_block(Slot::new(1));
    block.message.parent_root = Hash256::repeat_byte(0xab);
    let block = harness.sign_block(block.message, &harness.chain.head().beacon_state);

    match harness.chain.receive_block(block) {
        ReceiveOutcome::Ignored(_) => {}
        other => panic!("expected ignore, got {:?}", other),
    }
}

#[test]
fn invalid_execution_payload_rejects_block() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();

    // Craft a block with a non-default payload which is consistent with the consensus checks,
    // then have the engine reject it.
    let head_state = harness.chain.head().beacon_state.clone();
    let mut block = harness.produce_signed_block(Slot::new(1));

    let mut state = head_state.clone();
    state_processing::per_slot_processing(&mut state, None, &harness.spec).unwrap();

    // The payload's randao is checked against the mix *after* the block's reveal is applied.
    let mut randao_state = state.clone();
    randao_state
        .update_randao_mix(
            randao_state.current_epoch(),
            &block.message.body.randao_reveal,
        )
        .unwrap();

    let mut payload = types::ExecutionPayload::<E>::default();
    payload.prev_randao = *randao_state
        .get_randao_mix(randao_state.current_epoch())
        .unwrap();
    payload.timestamp =
        state.genesis_time + block.message.slot.as_u64() * harness.spec.seconds_per_slot;
    payload.block_hash = Hash256::repeat_byte(0x11);
    block.message.body.execution_payload = payload;

    // Fix the state root for the new body.
    let mut post_state = state.clone();
    let mut ctxt = state_processing::ConsensusContext::new(block.message.slot);
    state_processing::per_block_processing(
        &mut post_state,
        &types::SignedBeaconBlock {
            message: block.message.clone(),
            signature: types::Signature::empty(),
        },
        state_processing::BlockSignatureStrategy::NoVerification,
        &mut ctxt,
        &harness.spec,
    )
    .unwrap();
    block.message.state_root = post_state.canonical_root();
    let block = harness.sign_block(block.message, &head_state);

    harness
        .mock_execution
        .set_status(Ok(PayloadStatus::Invalid));

    match harness.process_block(block) {
        Err(BlockError::ExecutionPayloadError(_)) => {}
        other => panic!("expected execution rejection, got {:?}", other),
    }
}

#[test]
fn replay_reproduces_head_state_root() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.extend_to_slot(Slot::new(2 * slots_per_epoch()));

    let head = harness.chain.head().clone();

    // Rebuild the head state by replaying every block from genesis.
    let genesis_state = state_processing::interop_genesis_state::<E>(
        &harness.keypairs,
        beacon_chain::test_utils::HARNESS_GENESIS_TIME,
        Hash256::repeat_byte(0x42),
        &harness.spec,
    )
    .unwrap();

    // Collect the canonical chain of blocks, genesis upward.
    let mut roots = vec![];
    {
        let fork_choice = harness.chain.fork_choice.read();
        let proto_array = fork_choice.proto_array().core_proto_array();
        for (root, _) in proto_array.iter_block_roots(&head.beacon_block_root) {
            roots.push(root);
        }
    }
    roots.reverse();

    let mut state = genesis_state;
    for root in roots {
        if root == harness.chain.genesis_block_root {
            continue;
        }
        let block = harness
            .chain
            .store
            .get::<types::SignedBeaconBlock<E>>(&root)
            .unwrap()
            .unwrap();

        state_processing::state_transition(
            &mut state,
            &block,
            state_processing::BlockSignatureStrategy::NoVerification,
            &harness.spec,
        )
        .unwrap();
    }

    assert_eq!(state.canonical_root(), head.beacon_state.canonical_root());
    assert_eq!(state.canonical_root(), head.beacon_block.state_root());
}
