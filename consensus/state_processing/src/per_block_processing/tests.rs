#![cfg(test)]

use crate::per_block_processing::errors::{
    BlockProcessingError, ExitInvalid, HeaderInvalid,
};
use crate::genesis::interop_genesis_state;
use crate::{
    per_block_processing, per_slot_processing, state_transition, BlockSignatureStrategy,
    ConsensusContext, StateTransitionError, VerifySignatures,
};
use types::test_utils::generate_deterministic_keypairs;
use types::*;

type E = MinimalEthSpec;

const VALIDATOR_COUNT: usize = 16;
const GENESIS_TIME: u64 = 1_600_000_000;

fn genesis_state(keypairs: &[Keypair], spec: &ChainSpec) -> BeaconState<E> {
    interop_genesis_state(keypairs, GENESIS_TIME, Hash256::repeat_byte(0x42), spec)
        .expect("genesis processing succeeds")
}

/// Produce a correctly-signed block with an empty body on top of `state`.
fn produce_block(
    state: &mut BeaconState<E>,
    keypairs: &[Keypair],
    slot: Slot,
    spec: &ChainSpec,
) -> SignedBeaconBlock<E> {
    while state.slot < slot {
        per_slot_processing(state, None, spec).unwrap();
    }
    state
        .build_committee_cache(RelativeEpoch::Current, spec)
        .unwrap();

    let proposer_index = state.get_beacon_proposer_index(slot, spec).unwrap();
    let keypair = &keypairs[proposer_index];

    // Sign the randao reveal.
    let epoch = slot.epoch(E::slots_per_epoch());
    let randao_domain = spec.get_domain(
        epoch,
        Domain::Randao,
        &state.fork,
        state.genesis_validators_root,
    );
    let randao_reveal = keypair.sk.sign(epoch.signing_root(randao_domain));

    let mut block = BeaconBlock {
        slot,
        proposer_index: proposer_index as u64,
        parent_root: state.latest_block_header.canonical_root(),
        state_root: Hash256::zero(),
        body: BeaconBlockBody {
            randao_reveal,
            eth1_data: state.eth1_data.clone(),
            ..BeaconBlockBody::empty()
        },
    };

    // Compute the post-state root on a throw-away copy of the state.
    let mut post_state = state.clone();
    let mut ctxt = ConsensusContext::new(slot);
    per_block_processing(
        &mut post_state,
        &SignedBeaconBlock {
            message: block.clone(),
            signature: Signature::empty(),
        },
        BlockSignatureStrategy::NoVerification,
        &mut ctxt,
        spec,
    )
    .expect("unsigned block applies cleanly");
    block.state_root = post_state.canonical_root();

    // Sign the block.
    let proposal_domain = spec.get_domain(
        epoch,
        Domain::BeaconProposer,
        &state.fork,
        state.genesis_validators_root,
    );
    let signature = keypair.sk.sign(block.signing_root(proposal_domain));

    SignedBeaconBlock {
        message: block,
        signature,
    }
}

#[test]
fn valid_block_ok() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let mut state = genesis_state(&keypairs, &spec);
    let genesis_root = state.latest_block_header.canonical_root();

    let block = produce_block(&mut state, &keypairs, Slot::new(1), &spec);

    let mut ctxt = ConsensusContext::new(block.slot());
    per_block_processing(
        &mut state,
        &block,
        BlockSignatureStrategy::VerifyIndividual,
        &mut ctxt,
        &spec,
    )
    .expect("block passes processing");

    assert_eq!(state.slot, Slot::new(1));
    assert_eq!(state.latest_block_header.parent_root, genesis_root);
    // No justification changes from a single block.
    assert_eq!(state.current_justified_checkpoint.epoch, Epoch::new(0));
}

#[test]
fn valid_block_ok_with_bulk_signature_verification() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let mut state = genesis_state(&keypairs, &spec);

    let block = produce_block(&mut state, &keypairs, Slot::new(1), &spec);

    let mut ctxt = ConsensusContext::new(block.slot());
    per_block_processing(
        &mut state,
        &block,
        BlockSignatureStrategy::VerifyBulk,
        &mut ctxt,
        &spec,
    )
    .expect("block passes bulk signature verification");
}

#[test]
fn invalid_block_header_state_slot() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let mut state = genesis_state(&keypairs, &spec);

    let mut block = produce_block(&mut state, &keypairs, Slot::new(1), &spec);
    block.message.slot = Slot::new(2);

    let mut ctxt = ConsensusContext::new(block.slot());
    let result = per_block_processing(
        &mut state,
        &block,
        BlockSignatureStrategy::NoVerification,
        &mut ctxt,
        &spec,
    );

    assert_eq!(
        result,
        Err(BlockProcessingError::HeaderInvalid {
            reason: HeaderInvalid::StateSlotMismatch
        })
    );
}

#[test]
fn invalid_proposal_signature() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let mut state = genesis_state(&keypairs, &spec);

    let mut block = produce_block(&mut state, &keypairs, Slot::new(1), &spec);
    // Replace the signature with one from an unrelated key.
    block.signature = Keypair::random().sk.sign(Hash256::zero());

    let mut ctxt = ConsensusContext::new(block.slot());
    let result = per_block_processing(
        &mut state,
        &block,
        BlockSignatureStrategy::VerifyIndividual,
        &mut ctxt,
        &spec,
    );

    assert_eq!(
        result,
        Err(BlockProcessingError::HeaderInvalid {
            reason: HeaderInvalid::ProposalSignatureInvalid
        })
    );
}

#[test]
fn state_transition_rejects_bad_state_root() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let mut state = genesis_state(&keypairs, &spec);

    let mut block = produce_block(&mut state.clone(), &keypairs, Slot::new(1), &spec);
    // Flip one bit of the claimed state root.
    let mut claimed = block.message.state_root.to_fixed_bytes();
    claimed[0] ^= 0x01;
    block.message.state_root = Hash256::from(claimed);

    let result = state_transition(
        &mut state,
        &block,
        BlockSignatureStrategy::NoVerification,
        &spec,
    );

    assert!(matches!(
        result,
        Err(StateTransitionError::StateRootMismatch { .. })
    ));
}

#[test]
fn state_transition_is_not_idempotent() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let mut state = genesis_state(&keypairs, &spec);

    let block = produce_block(&mut state.clone(), &keypairs, Slot::new(1), &spec);

    state_transition(
        &mut state,
        &block,
        BlockSignatureStrategy::NoVerification,
        &spec,
    )
    .expect("first application succeeds");

    // Re-applying the same block to the post-state must fail on the slot check.
    assert_eq!(
        state_transition(
            &mut state,
            &block,
            BlockSignatureStrategy::NoVerification,
            &spec,
        ),
        Err(StateTransitionError::BlockSlotBehindState)
    );
}

#[test]
fn exit_from_too_young_validator_rejected() {
    let spec = E::default_spec();
    let keypairs = generate_deterministic_keypairs(VALIDATOR_COUNT);
    let state = genesis_state(&keypairs, &spec);

    let exit = VoluntaryExit {
        epoch: Epoch::new(0),
        validator_index: 0,
    }
    .sign(
        &keypairs[0].sk,
        state.fork.current_version,
        state.genesis_validators_root,
        &spec,
    );

    let result = crate::per_block_processing::verify_exit(
        &state,
        &exit,
        VerifySignatures::True,
        &spec,
    );

    assert!(matches!(
        result,
        Err(crate::per_block_processing::errors::BlockOperationError::Invalid(
            ExitInvalid::TooYoungToExit { .. }
        ))
    ));
}
