//! A testing harness which drives a `BeaconChain` with a full validator set, producing signed
//! blocks and attestations exactly as the validators would.

use crate::builder::BeaconChainBuilder;
use crate::events::CollectingEventHandler;
use crate::execution_engine::MockExecutionEngine;
use crate::{BeaconChain, BeaconChainTypes, BlockError};
use slog::Logger;
use state_processing::interop_genesis_state;
use std::marker::PhantomData;
use std::sync::Arc;
use store::MemoryStore;
use types::test_utils::generate_deterministic_keypairs;
use types::*;

pub const HARNESS_GENESIS_TIME: u64 = 1_606_824_023;

/// A `BeaconChainTypes` instance backed by ephemeral storage and a mock execution engine.
pub struct EphemeralHarnessType<E: EthSpec>(PhantomData<E>);

impl<E: EthSpec> BeaconChainTypes for EphemeralHarnessType<E> {
    type EthSpec = E;
    type Store = MemoryStore<E>;
    type ExecutionEngine = MockExecutionEngine;
}

pub type HarnessChain<E> = BeaconChain<EphemeralHarnessType<E>>;

/// A testing harness which wraps a `BeaconChain` and a set of validator keypairs.
pub struct BeaconChainHarness<E: EthSpec> {
    pub chain: HarnessChain<E>,
    pub keypairs: Vec<Keypair>,
    pub spec: ChainSpec,
    pub events: Arc<CollectingEventHandler>,
    pub mock_execution: Arc<MockExecutionEngine>,
}

impl<E: EthSpec> BeaconChainHarness<E> {
    pub fn new(validator_count: usize) -> Self {
        let spec = E::default_spec();
        let keypairs = generate_deterministic_keypairs(validator_count);

        let genesis_state = interop_genesis_state::<E>(
            &keypairs,
            HARNESS_GENESIS_TIME,
            Hash256::repeat_byte(0x42),
            &spec,
        )
        .expect("genesis state is valid");

        let mock_execution = Arc::new(MockExecutionEngine::new());

        let chain = BeaconChainBuilder::<EphemeralHarnessType<E>>::new(spec.clone())
            .store(Arc::new(MemoryStore::open()))
            .genesis_state(genesis_state)
            .execution_engine(mock_execution.clone())
            .logger(test_logger())
            .build()
            .expect("chain builds from genesis");

        let events = Arc::new(CollectingEventHandler::new());
        chain.register_event_handler(events.clone());

        Self {
            chain,
            keypairs,
            spec,
            events,
            mock_execution,
        }
    }

    /// Produce a correctly-signed block at `slot`, on the current head.
    pub fn produce_signed_block(&self, slot: Slot) -> SignedBeaconBlock<E> {
        let head = self.chain.head().clone();
        self.produce_signed_block_on_state(head.beacon_state, slot)
    }

    /// Produce a correctly-signed block at `slot` on the given pre-state.
    pub fn produce_signed_block_on_state(
        &self,
        mut state: BeaconState<E>,
        slot: Slot,
    ) -> SignedBeaconBlock<E> {
        while state.slot < slot {
            state_processing::per_slot_processing(&mut state, None, &self.spec)
                .expect("per-slot processing succeeds");
        }
        state
            .build_committee_cache(RelativeEpoch::Current, &self.spec)
            .expect("committee cache builds");

        let proposer_index = state
            .get_beacon_proposer_index(slot, &self.spec)
            .expect("proposer is known");

        let randao_reveal = self.sign_randao_reveal(&state, proposer_index, slot);

        let block = self
            .chain
            .produce_block_on_state(state.clone(), slot, randao_reveal)
            .expect("block production succeeds");

        self.sign_block(block, &state)
    }

    /// Sign `block` with its proposer's key.
    pub fn sign_block(&self, block: BeaconBlock<E>, state: &BeaconState<E>) -> SignedBeaconBlock<E> {
        let proposer_index = block.proposer_index as usize;
        let domain = self.spec.get_domain(
            block.epoch(),
            Domain::BeaconProposer,
            &state.fork,
            state.genesis_validators_root,
        );
        let signature = self.keypairs[proposer_index]
            .sk
            .sign(block.signing_root(domain));

        SignedBeaconBlock {
            message: block,
            signature,
        }
    }

    /// Sign the randao reveal for a proposal at `slot`.
    pub fn sign_randao_reveal(
        &self,
        state: &BeaconState<E>,
        proposer_index: usize,
        slot: Slot,
    ) -> Signature {
        let epoch = slot.epoch(E::slots_per_epoch());
        let domain = self.spec.get_domain(
            epoch,
            Domain::Randao,
            &state.fork,
            state.genesis_validators_root,
        );
        self.keypairs[proposer_index]
            .sk
            .sign(epoch.signing_root(domain))
    }

    /// Produce one fully-aggregated attestation per committee for `slot`, with every committee
    /// member attesting to the current head.
    pub fn make_attestations(&self, slot: Slot) -> Vec<Attestation<E>> {
        let head_root = self.chain.head_root();
        self.make_attestations_for_block(slot, head_root)
    }

    /// As `make_attestations`, but voting for the given `beacon_block_root` (which must be a
    /// block at or before `slot` on the canonical chain's committees).
    pub fn make_attestations_for_block(
        &self,
        slot: Slot,
        beacon_block_root: Hash256,
    ) -> Vec<Attestation<E>> {
        let head = self.chain.head().clone();
        let mut state = head.beacon_state.clone();

        while state.slot < slot {
            state_processing::per_slot_processing(&mut state, None, &self.spec)
                .expect("per-slot processing succeeds");
        }
        state
            .build_committee_cache(RelativeEpoch::Current, &self.spec)
            .expect("committee cache builds");

        let attested_block_slot = self
            .chain
            .fork_choice
            .read()
            .get_block(&beacon_block_root)
            .map(|block| block.slot)
            .unwrap_or_else(|| head.beacon_block.slot());

        let epoch = slot.epoch(E::slots_per_epoch());
        let target_slot = epoch.start_slot(E::slots_per_epoch());
        let target_root = if target_slot >= attested_block_slot {
            beacon_block_root
        } else {
            *state
                .get_block_root(target_slot)
                .expect("target root is known")
        };

        let attestation_domain = self.spec.get_domain(
            epoch,
            Domain::BeaconAttester,
            &state.fork,
            state.genesis_validators_root,
        );

        let committees: Vec<OwnedBeaconCommittee> = state
            .get_beacon_committees_at_slot(slot)
            .expect("committees are known")
            .into_iter()
            .map(BeaconCommittee::into_owned)
            .collect();

        committees
            .into_iter()
            .map(|committee| {
                let data = AttestationData {
                    slot,
                    index: committee.index,
                    beacon_block_root,
                    source: state.current_justified_checkpoint,
                    target: Checkpoint {
                        epoch,
                        root: target_root,
                    },
                };

                let mut attestation =
                    Attestation::<E>::empty_for_signing(data, committee.committee.len())
                        .expect("attestation is constructible");

                let message = data.signing_root(attestation_domain);

                for (position, &validator_index) in committee.committee.iter().enumerate() {
                    let signature = self.keypairs[validator_index].sk.sign(message);
                    attestation
                        .add_signature(&signature, position)
                        .expect("attestation position is unset");
                }

                attestation
            })
            .collect()
    }

    /// Produce attestations for `slot` and feed them into the chain.
    pub fn attest_to_head(&self, slot: Slot) {
        for attestation in self.make_attestations(slot) {
            self.chain
                .process_attestation(attestation)
                .expect("harness attestations are valid");
        }
    }

    /// Extend the canonical chain with fully-attested blocks up to (and including)
    /// `target_slot`.
    pub fn extend_to_slot(&self, target_slot: Slot) {
        let mut slot = self.chain.current_slot() + 1;

        while slot <= target_slot {
            self.chain.on_slot(slot).expect("tick succeeds");

            let block = self.produce_signed_block(slot);
            self.process_valid_block(block);

            // Everybody attests to the new head; the votes are queued by fork choice until the
            // next slot begins.
            self.attest_to_head(slot);

            slot += 1u64;
        }
    }

    /// Import a block which is expected to be valid.
    pub fn process_valid_block(&self, block: SignedBeaconBlock<E>) -> Hash256 {
        match self.chain.process_block(block) {
            Ok(root) => root,
            Err(e) => panic!("harness block rejected: {:?}", e),
        }
    }

    /// Import a block, returning the error.
    pub fn process_block(&self, block: SignedBeaconBlock<E>) -> Result<Hash256, BlockError> {
        self.chain.process_block(block)
    }
}

/// A logger that discards everything.
pub fn test_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}
