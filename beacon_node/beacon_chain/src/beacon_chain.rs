use crate::beacon_fork_choice_store::BeaconForkChoiceStore;
use crate::beacon_snapshot::BeaconSnapshot;
use crate::chain_config::ChainConfig;
use crate::errors::{
    AttestationError, BeaconChainError as Error, BlockError, ExecutionPayloadError,
    OperationError,
};
use crate::events::{EventHandler, EventKind};
use crate::execution_engine::{ExecutionEngine, PayloadStatus};
use crate::state_cache::StateCache;
use fork_choice::{
    AttestationFromBlock, CountUnrealized, ForkChoice, ForkChoiceView, PayloadVerificationStatus,
    PersistedForkChoice,
};
use operation_pool::OperationPool;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use slog::{debug, info, warn, Logger};
use ssz::Encode;
use state_processing::{
    common::get_indexed_attestation, per_block_processing,
    per_block_processing::is_valid_indexed_attestation, per_slot_processing,
    BlockSignatureStrategy, ConsensusContext, VerifyOperation, VerifySignatures,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use store::{get_key_for_col, DBColumn, ItemStore, KeyValueStore, KeyValueStoreOp, StoreItem};
use types::*;

/// The key under which the `PersistedForkChoice` is stored in the `BeaconChain` column.
pub const FORK_CHOICE_DB_KEY: Hash256 = Hash256::zero();

/// Defines the behaviour of the `BeaconChain` regarding its backing store and external
/// collaborators.
pub trait BeaconChainTypes: Send + Sync + 'static {
    type EthSpec: EthSpec;
    type Store: ItemStore<Self::EthSpec>;
    type ExecutionEngine: ExecutionEngine<Self::EthSpec>;
}

/// The answer given to the network feeder for any received object.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome<T> {
    /// The object was valid and applied.
    Accepted(T),
    /// The object was neither applied nor found invalid; it may be retried later.
    Ignored(String),
    /// The object is invalid and must not be retried.
    Rejected(String),
}

/// The beacon chain orchestrator: the single writer over the cached head, the fork choice and
/// the persistent store.
///
/// Mutations are serialized through the fork-choice write lock; readers observe immutable
/// snapshots (`BeaconSnapshot`) which are swapped atomically on head changes.
pub struct BeaconChain<T: BeaconChainTypes> {
    pub spec: ChainSpec,
    pub config: ChainConfig,
    /// Persistent storage for blocks, states, etc.
    pub store: Arc<T::Store>,
    /// Stores all operations (e.g., `Attestation`, `Deposit`, etc) that are candidates for
    /// inclusion in a block.
    pub op_pool: OperationPool<T::EthSpec>,
    /// A state-machine that is updated with information from the network and chooses a
    /// canonical head block.
    pub fork_choice:
        RwLock<ForkChoice<BeaconForkChoiceStore<T::EthSpec, T::Store>, T::EthSpec>>,
    /// Stores a "snapshot" of the chain at the time the head-of-the-chain block was received.
    canonical_head: RwLock<BeaconSnapshot<T::EthSpec>>,
    /// An LRU of recent states, with the head/justified/finalized states pinned.
    state_cache: Mutex<StateCache<T::EthSpec>>,
    /// Blocks which failed the state transition; their descendants are rejected without
    /// re-execution.
    bad_blocks: Mutex<HashSet<Hash256>>,
    /// Synchronous observers of chain events.
    event_handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    /// The external execution engine.
    pub execution_engine: Arc<T::ExecutionEngine>,
    /// The root of the genesis block.
    pub genesis_block_root: Hash256,
    /// Logging to CLI, etc.
    pub(crate) log: Logger,
}

impl<T: BeaconChainTypes> BeaconChain<T> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        spec: ChainSpec,
        config: ChainConfig,
        store: Arc<T::Store>,
        fork_choice: ForkChoice<BeaconForkChoiceStore<T::EthSpec, T::Store>, T::EthSpec>,
        canonical_head: BeaconSnapshot<T::EthSpec>,
        execution_engine: Arc<T::ExecutionEngine>,
        genesis_block_root: Hash256,
        log: Logger,
    ) -> Self {
        let mut state_cache = StateCache::new(config.state_cache_size);
        state_cache.update_pinned(vec![(
            canonical_head.beacon_state_root(),
            canonical_head.beacon_state.clone(),
        )]);

        Self {
            spec,
            config,
            store,
            op_pool: OperationPool::new(),
            fork_choice: RwLock::new(fork_choice),
            canonical_head: RwLock::new(canonical_head),
            state_cache: Mutex::new(state_cache),
            bad_blocks: Mutex::new(HashSet::new()),
            event_handlers: RwLock::new(vec![]),
            execution_engine,
            genesis_block_root,
            log,
        }
    }

    /// Subscribe an observer to chain events. Events are delivered synchronously, on the writer
    /// task, in subscription order.
    pub fn register_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.event_handlers.write().push(handler);
    }

    fn emit(&self, kind: EventKind) {
        for handler in self.event_handlers.read().iter() {
            handler.register(kind.clone());
        }
    }

    /// Returns a read-lock guard to the canonical head snapshot.
    pub fn head(&self) -> RwLockReadGuard<BeaconSnapshot<T::EthSpec>> {
        self.canonical_head.read()
    }

    /// Returns the block root of the canonical head.
    pub fn head_root(&self) -> Hash256 {
        self.canonical_head.read().beacon_block_root
    }

    /// The current slot, as far as the fork choice store is aware.
    ///
    /// The value only advances via `Self::on_slot`; the orchestrator does not read a wall
    /// clock itself.
    pub fn current_slot(&self) -> Slot {
        use fork_choice::ForkChoiceStore as _;
        self.fork_choice.read().fc_store().get_current_slot()
    }

    /*
     * Inbound objects
     */

    /// Handler for blocks arriving from the network feeder.
    pub fn receive_block(
        &self,
        signed_block: SignedBeaconBlock<T::EthSpec>,
    ) -> ReceiveOutcome<Hash256> {
        match self.process_block(signed_block) {
            Ok(root) => ReceiveOutcome::Accepted(root),
            Err(
                e @ (BlockError::ParentUnknown(_)
                | BlockError::FutureSlot { .. }
                | BlockError::BlockIsAlreadyKnown),
            ) => ReceiveOutcome::Ignored(format!("{:?}", e)),
            Err(e) => ReceiveOutcome::Rejected(format!("{:?}", e)),
        }
    }

    /// Handler for attestations arriving from the network feeder.
    pub fn receive_attestation(
        &self,
        attestation: Attestation<T::EthSpec>,
    ) -> ReceiveOutcome<()> {
        match self.process_attestation(attestation) {
            Ok(()) => ReceiveOutcome::Accepted(()),
            Err(
                e @ (AttestationError::UnknownHeadBlock { .. }
                | AttestationError::UnknownTargetEpoch { .. }),
            ) => ReceiveOutcome::Ignored(format!("{:?}", e)),
            Err(e) => ReceiveOutcome::Rejected(format!("{:?}", e)),
        }
    }

    /// Accept some block and attempt to add it to the chain.
    ///
    /// The pipeline is: validate, transition, persist (atomically), publish to fork choice,
    /// recompute the head. Failure at any phase drops the block without partial effects.
    pub fn process_block(
        &self,
        signed_block: SignedBeaconBlock<T::EthSpec>,
    ) -> Result<Hash256, BlockError> {
        let block_root = signed_block.canonical_root();

        match self.process_block_inner(&signed_block, block_root) {
            Ok(()) => {
                self.emit(EventKind::BlockProcessed {
                    block_root,
                    slot: signed_block.slot(),
                });

                debug!(
                    self.log,
                    "Beacon block imported";
                    "block_root" => ?block_root,
                    "slot" => %signed_block.slot(),
                );

                Ok(block_root)
            }
            Err(e) => {
                if block_is_at_fault(&e) {
                    self.record_bad_block(block_root);
                }

                self.emit(EventKind::BlockRejected {
                    block_root,
                    reason: format!("{:?}", e),
                });

                Err(e)
            }
        }
    }

    fn process_block_inner(
        &self,
        signed_block: &SignedBeaconBlock<T::EthSpec>,
        block_root: Hash256,
    ) -> Result<(), BlockError> {
        let block = &signed_block.message;
        let current_slot = self.current_slot();

        if block_root == self.genesis_block_root {
            return Err(BlockError::GenesisBlock);
        }

        if self.fork_choice.read().contains_block(&block_root) {
            return Err(BlockError::BlockIsAlreadyKnown);
        }

        // Reject descendants of known-bad blocks without re-execution. Siblings that descend
        // from an honest ancestor are validated independently.
        if self.is_bad_block(&block.parent_root) {
            return Err(BlockError::ParentInvalid(block.parent_root));
        }

        let finalized_slot = self
            .fork_choice
            .read()
            .finalized_checkpoint()
            .epoch
            .start_slot(T::EthSpec::slots_per_epoch());
        if block.slot <= finalized_slot {
            return Err(BlockError::WouldRevertFinalizedSlot {
                block_slot: block.slot,
                finalized_slot,
            });
        }

        if block.slot > current_slot {
            return Err(BlockError::FutureSlot {
                present_slot: current_slot,
                block_slot: block.slot,
            });
        }

        // The parent must be in the fork choice (i.e., processed and not pruned).
        let parent_proto_block = self
            .fork_choice
            .read()
            .get_block(&block.parent_root)
            .ok_or(BlockError::ParentUnknown(block.parent_root))?;

        // Fetch the pre-state: the post-state of the parent, from cache or by replay.
        let mut state = self
            .state_for_block_production(parent_proto_block.state_root, block.parent_root)
            .map_err(BlockError::from)?;

        // Advance the pre-state to the block's slot, crossing epoch boundaries as required.
        let mut state_root_opt = Some(parent_proto_block.state_root);
        while state.slot < block.slot {
            per_slot_processing(&mut state, state_root_opt.take(), &self.spec)?;
        }

        // Whether payload checks (and the external engine) apply to this block.
        let execution_enabled =
            state_processing::per_block_processing::is_execution_enabled(&state, &block.body);

        // The state transition, with all signatures (proposer, randao, operations, sync
        // aggregate) verified in bulk as a unit.
        let mut ctxt = ConsensusContext::new(block.slot).set_current_block_root(block_root);
        per_block_processing(
            &mut state,
            signed_block,
            BlockSignatureStrategy::VerifyBulk,
            &mut ctxt,
            &self.spec,
        )?;

        // The claimed state root must match the computed one, bit-for-bit.
        let state_root = state.canonical_root();
        if block.state_root != state_root {
            return Err(BlockError::StateRootMismatch {
                block: block.state_root,
                local: state_root,
            });
        }

        // Consult the execution engine. Execution validity itself is delegated; a missing
        // answer leaves the block optimistic.
        let payload_verification_status = if execution_enabled {
            match self
                .execution_engine
                .notify_new_payload(&block.body.execution_payload)
            {
                Ok(PayloadStatus::Valid) => PayloadVerificationStatus::Verified,
                Ok(PayloadStatus::Syncing) => PayloadVerificationStatus::Optimistic,
                Ok(PayloadStatus::Invalid) => {
                    return Err(ExecutionPayloadError::RejectedByExecutionEngine.into());
                }
                Err(e) => {
                    warn!(
                        self.log,
                        "Execution engine unavailable";
                        "error" => e,
                        "info" => "block imported optimistically",
                    );
                    PayloadVerificationStatus::Optimistic
                }
            }
        } else {
            PayloadVerificationStatus::Irrelevant
        };

        // Persist the block, its state and the archive mark in one atomic batch.
        let batch = vec![
            signed_block.as_kv_store_op(block_root),
            state.as_kv_store_op(state_root),
            archive_op(block.slot, block_root),
        ];
        self.store
            .do_atomically(batch)
            .map_err(|e| BlockError::from(Error::from(e)))?;

        // Register the block with the fork choice.
        {
            let mut fork_choice = self.fork_choice.write();
            fork_choice
                .on_block(
                    current_slot,
                    block,
                    block_root,
                    // Block timeliness is not tracked (there is no wall clock down here); no
                    // proposer boost is awarded.
                    Duration::from_secs(self.spec.seconds_per_slot),
                    &state,
                    payload_verification_status,
                    &self.spec,
                    CountUnrealized::from(self.config.count_unrealized),
                )
                .map_err(|e| BlockError::from(Error::from(e)))?;
        }

        self.state_cache.lock().put(state_root, state);

        // Re-run head selection and emit any events.
        self.recompute_head(current_slot)
            .map_err(BlockError::from)?;

        Ok(())
    }

    /// Accept some attestation from the network feeder, apply it to fork choice and make it a
    /// candidate for block inclusion.
    pub fn process_attestation(
        &self,
        attestation: Attestation<T::EthSpec>,
    ) -> Result<(), AttestationError> {
        if attestation.num_set_aggregation_bits() == 0 {
            return Err(AttestationError::EmptyAggregationBitfield);
        }

        if !self
            .fork_choice
            .read()
            .contains_block(&attestation.data.beacon_block_root)
        {
            return Err(AttestationError::UnknownHeadBlock {
                beacon_block_root: attestation.data.beacon_block_root,
            });
        }

        // Resolve the committee against (a descendant of) the head state.
        let mut state = self.head().beacon_state.clone();

        let target_epoch = attestation.data.target.epoch;
        if target_epoch > state.current_epoch() {
            // The attestation is ahead of the head; advance a copy of the head state through
            // the empty slots.
            let target_slot = target_epoch.start_slot(T::EthSpec::slots_per_epoch());
            while state.slot < target_slot {
                per_slot_processing(&mut state, None, &self.spec)
                    .map_err(Error::SlotProcessingError)?;
            }
        }

        let relative_epoch = RelativeEpoch::from_epoch(state.current_epoch(), target_epoch)
            .map_err(|_| AttestationError::UnknownTargetEpoch { target_epoch })?;
        state
            .build_committee_cache(relative_epoch, &self.spec)
            .map_err(Error::BeaconStateError)?;

        let committee = state.get_beacon_committee(attestation.data.slot, attestation.data.index)?;

        if committee.committee.len() != attestation.aggregation_bits.len() {
            return Err(AttestationError::InvalidCommitteeLength);
        }

        let indexed_attestation = get_indexed_attestation(committee.committee, &attestation)
            .map_err(AttestationError::Invalid)?;

        // BLS aggregate verification.
        if is_valid_indexed_attestation(
            &state,
            &indexed_attestation,
            VerifySignatures::True,
            &self.spec,
        )
        .is_err()
        {
            return Err(AttestationError::InvalidSignature);
        }

        let current_slot = self.current_slot();
        self.fork_choice
            .write()
            .on_attestation(
                current_slot,
                &indexed_attestation,
                AttestationFromBlock::False,
                &self.spec,
            )
            .map_err(|e| AttestationError::ForkChoiceError(format!("{:?}", e)))?;

        self.op_pool.insert_attestation(attestation.clone());

        self.emit(EventKind::AttestationProcessed {
            beacon_block_root: attestation.data.beacon_block_root,
            target_epoch,
        });

        Ok(())
    }

    /// Accept a voluntary exit, verify it and make it a candidate for block inclusion.
    pub fn process_voluntary_exit(
        &self,
        exit: SignedVoluntaryExit,
    ) -> Result<(), OperationError> {
        let head = self.head();
        let verified = exit.validate(&head.beacon_state, &self.spec)?;
        drop(head);
        self.op_pool.insert_voluntary_exit(verified);
        Ok(())
    }

    /// Accept a proposer slashing, verify it and make it a candidate for block inclusion.
    pub fn process_proposer_slashing(
        &self,
        slashing: ProposerSlashing,
    ) -> Result<(), OperationError> {
        let head = self.head();
        let verified = slashing.validate(&head.beacon_state, &self.spec)?;
        drop(head);
        self.op_pool.insert_proposer_slashing(verified);
        Ok(())
    }

    /// Accept an attester slashing: verify it, feed the equivocating validators into fork
    /// choice (their weight is removed permanently) and make the slashing a candidate for
    /// block inclusion.
    pub fn process_attester_slashing(
        &self,
        slashing: AttesterSlashing<T::EthSpec>,
    ) -> Result<(), OperationError> {
        let head = self.head();
        let verified = slashing.validate(&head.beacon_state, &self.spec)?;

        self.fork_choice
            .write()
            .on_attester_slashing(verified.as_inner());

        self.op_pool
            .insert_attester_slashing(verified, &head.beacon_state);
        Ok(())
    }

    /// Accept a deposit observed on the eth1 chain, making it a candidate for block inclusion.
    pub fn process_deposit(
        &self,
        deposit_index: u64,
        deposit: Deposit,
    ) -> operation_pool::DepositInsertStatus {
        self.op_pool.insert_deposit(deposit_index, deposit)
    }

    /*
     * Clock
     */

    /// Advance the chain clock to `slot`.
    ///
    /// Ticks the fork choice (pulling unrealized justification at epoch boundaries before any
    /// head recomputation) and prunes the operation pool.
    pub fn on_slot(&self, slot: Slot) -> Result<(), Error> {
        self.fork_choice
            .write()
            .update_time(slot, &self.spec)
            .map_err(Error::ForkChoiceError)?;

        self.recompute_head(slot)?;

        if slot % T::EthSpec::slots_per_epoch() == 0 {
            let current_epoch = slot.epoch(T::EthSpec::slots_per_epoch());
            let head = self.head().clone();
            self.op_pool.prune_attestations(current_epoch);
            self.op_pool.prune_voluntary_exits(&head.beacon_state);
        }

        Ok(())
    }

    /*
     * Head management
     */

    /// Execute fork choice to find the canonical head; on changes, rotate the head snapshot and
    /// notify observers, the store and the execution engine.
    pub fn recompute_head(&self, current_slot: Slot) -> Result<(), Error> {
        let (old_view, new_view) = {
            let mut fork_choice = self.fork_choice.write();
            let old_view = fork_choice.cached_fork_choice_view();
            fork_choice.get_head(current_slot, &self.spec)?;
            (old_view, fork_choice.cached_fork_choice_view())
        };

        if new_view.justified_checkpoint != old_view.justified_checkpoint {
            info!(
                self.log,
                "Checkpoint justified";
                "epoch" => %new_view.justified_checkpoint.epoch,
                "root" => ?new_view.justified_checkpoint.root,
            );
            self.emit(EventKind::CheckpointJustified {
                checkpoint: new_view.justified_checkpoint,
            });
        }

        if new_view.head_block_root != old_view.head_block_root {
            self.rotate_head(&new_view)?;
        }

        if new_view.finalized_checkpoint.epoch > old_view.finalized_checkpoint.epoch {
            self.on_finalization(new_view.finalized_checkpoint)?;
        }

        Ok(())
    }

    /// Swap the canonical head snapshot for the new head, emitting `HeadChanged`.
    fn rotate_head(&self, new_view: &ForkChoiceView) -> Result<(), Error> {
        let new_head_root = new_view.head_block_root;

        let beacon_block = self
            .store
            .get::<SignedBeaconBlock<T::EthSpec>>(&new_head_root)?
            .ok_or(Error::MissingBeaconBlock(new_head_root))?;
        let beacon_state =
            self.state_for_block_production(beacon_block.state_root(), new_head_root)?;

        let old_head = {
            let mut head = self.canonical_head.write();
            let old_head = head.clone();
            *head = BeaconSnapshot::new(beacon_block, new_head_root, beacon_state);
            old_head
        };

        let reorg_depth = self.reorg_depth(
            old_head.beacon_block_root,
            old_head.beacon_block.slot(),
            new_head_root,
        );

        if reorg_depth > 0 {
            warn!(
                self.log,
                "Beacon chain re-org";
                "previous_head" => ?old_head.beacon_block_root,
                "new_head" => ?new_head_root,
                "reorg_depth" => reorg_depth,
            );
        }

        // Re-pin the head, justified and finalized states; anything else may now be evicted.
        self.update_pinned_states(new_view)?;

        self.emit(EventKind::HeadChanged {
            new_head: new_head_root,
            old_head: old_head.beacon_block_root,
            reorg_depth,
        });

        // Tell the execution engine about the new head, best-effort.
        let fcu_params = self.fork_choice.read().get_forkchoice_update_parameters();
        if let (Some(head_hash), finalized_hash) =
            (fcu_params.head_hash, fcu_params.finalized_hash)
        {
            let _ = self.execution_engine.notify_forkchoice_updated(
                head_hash,
                finalized_hash.unwrap_or_else(Hash256::zero),
            );
        }

        Ok(())
    }

    /// On a new finalized checkpoint: prune the fork choice, the operation pool and persist the
    /// fork choice and checkpoint marks.
    fn on_finalization(&self, finalized_checkpoint: Checkpoint) -> Result<(), Error> {
        info!(
            self.log,
            "Checkpoint finalized";
            "epoch" => %finalized_checkpoint.epoch,
            "root" => ?finalized_checkpoint.root,
        );

        // Re-root the block tree at the new finalized block; non-descendants are discarded.
        self.fork_choice.write().prune()?;

        let head = self.head().clone();
        self.op_pool
            .prune_all(&head.beacon_state, head.beacon_state.current_epoch());

        self.persist_fork_choice()?;

        self.emit(EventKind::CheckpointFinalized {
            checkpoint: finalized_checkpoint,
        });

        Ok(())
    }

    /// The number of slots between the old head and the common ancestor of the old and new
    /// heads. Zero when the new head descends from the old head.
    fn reorg_depth(&self, old_head_root: Hash256, old_head_slot: Slot, new_head_root: Hash256) -> u64 {
        let fork_choice = self.fork_choice.read();
        let proto_array = fork_choice.proto_array().core_proto_array();

        let new_head_ancestors: HashSet<Hash256> = proto_array
            .iter_block_roots(&new_head_root)
            .map(|(root, _)| root)
            .collect();

        if new_head_ancestors.contains(&old_head_root) {
            return 0;
        }

        proto_array
            .iter_block_roots(&old_head_root)
            .find(|(root, _)| new_head_ancestors.contains(root))
            .map(|(_, ancestor_slot)| old_head_slot.saturating_sub(ancestor_slot).as_u64())
            // The old head is unreachable (e.g., pruned); report the full distance.
            .unwrap_or_else(|| old_head_slot.as_u64())
    }

    fn update_pinned_states(&self, view: &ForkChoiceView) -> Result<(), Error> {
        let mut pins = vec![];

        let head = self.canonical_head.read();
        pins.push((head.beacon_state_root(), head.beacon_state.clone()));
        drop(head);

        for root in [view.justified_checkpoint.root, view.finalized_checkpoint.root] {
            if let Some(block) = self.store.get::<SignedBeaconBlock<T::EthSpec>>(&root)? {
                if let Some(state) = self.store.get::<BeaconState<T::EthSpec>>(&block.state_root())? {
                    pins.push((block.state_root(), state));
                }
            }
        }

        self.state_cache.lock().update_pinned(pins);
        Ok(())
    }

    /*
     * State lookups
     */

    /// Fetch the state with the given root from the cache or store, reconstructing it by replay
    /// from the nearest stored ancestor state when necessary.
    pub fn state_for_block_production(
        &self,
        state_root: Hash256,
        block_root: Hash256,
    ) -> Result<BeaconState<T::EthSpec>, Error> {
        if let Some(state) = self.state_cache.lock().get(&state_root) {
            return Ok(state);
        }

        if let Some(state) = self.store.get::<BeaconState<T::EthSpec>>(&state_root)? {
            return Ok(state);
        }

        self.reconstruct_state(state_root, block_root)
    }

    /// Replay blocks from the nearest available snapshot to reconstruct the state with root
    /// `state_root` (the post-state of `block_root`).
    fn reconstruct_state(
        &self,
        state_root: Hash256,
        block_root: Hash256,
    ) -> Result<BeaconState<T::EthSpec>, Error> {
        // Walk back through the ancestors of `block_root` until a block with a stored
        // post-state is found, collecting the blocks to replay.
        let mut blocks_to_replay: Vec<SignedBeaconBlock<T::EthSpec>> = vec![];
        let mut base_state: Option<BeaconState<T::EthSpec>> = None;

        {
            let fork_choice = self.fork_choice.read();
            let proto_array = fork_choice.proto_array().core_proto_array();

            for node in proto_array.iter_nodes(&block_root) {
                if let Some(state) = self
                    .state_cache
                    .lock()
                    .get(&node.state_root)
                    .or(self.store.get::<BeaconState<T::EthSpec>>(&node.state_root)?)
                {
                    base_state = Some(state);
                    break;
                }

                let block = self
                    .store
                    .get::<SignedBeaconBlock<T::EthSpec>>(&node.root)?
                    .ok_or(Error::MissingBeaconBlock(node.root))?;
                blocks_to_replay.push(block);
            }
        }

        let mut state = base_state.ok_or(Error::UnableToReconstructState {
            state_root,
            block_root,
        })?;

        // Replay, oldest first. The blocks were validated when first imported; signatures and
        // state roots are not re-checked.
        for block in blocks_to_replay.iter().rev() {
            while state.slot < block.slot() {
                per_slot_processing(&mut state, None, &self.spec)?;
            }

            let mut ctxt = ConsensusContext::new(block.slot());
            per_block_processing(
                &mut state,
                block,
                BlockSignatureStrategy::NoVerification,
                &mut ctxt,
                &self.spec,
            )
            .map_err(|_| Error::UnableToReconstructState {
                state_root,
                block_root,
            })?;
        }

        if state.canonical_root() != state_root {
            return Err(Error::UnableToReconstructState {
                state_root,
                block_root,
            });
        }

        self.state_cache.lock().put(state_root, state.clone());

        Ok(state)
    }

    /*
     * Bad blocks
     */

    /// Returns `true` if the given root previously failed the state transition.
    pub fn is_bad_block(&self, block_root: &Hash256) -> bool {
        if self.bad_blocks.lock().contains(block_root) {
            return true;
        }

        // Fall back to the persisted marks, in case of a restart.
        self.store
            .key_exists(DBColumn::BadBlock.into(), block_root.as_bytes())
            .unwrap_or(false)
    }

    fn record_bad_block(&self, block_root: Hash256) {
        self.bad_blocks.lock().insert(block_root);

        if let Err(e) =
            self.store
                .put_bytes(DBColumn::BadBlock.into(), block_root.as_bytes(), &[])
        {
            warn!(
                self.log,
                "Failed to persist bad-block mark";
                "block_root" => ?block_root,
                "error" => ?e,
            );
        }
    }

    /*
     * Block production
     */

    /// Produce a block on `state`, including operations from the pool.
    ///
    /// The returned block has a correct `state_root`, but an empty signature.
    pub fn produce_block_on_state(
        &self,
        mut state: BeaconState<T::EthSpec>,
        produce_at_slot: Slot,
        randao_reveal: Signature,
    ) -> Result<BeaconBlock<T::EthSpec>, Error> {
        while state.slot < produce_at_slot {
            per_slot_processing(&mut state, None, &self.spec)?;
        }

        // Pool attestations may target the previous epoch.
        state.build_committee_cache(RelativeEpoch::Previous, &self.spec)?;
        state.build_committee_cache(RelativeEpoch::Current, &self.spec)?;

        let parent_root = state.latest_block_header.canonical_root();
        let proposer_index = state.get_beacon_proposer_index(produce_at_slot, &self.spec)? as u64;

        let (proposer_slashings, attester_slashings) = self.op_pool.get_slashings(&state);
        let attestations = self
            .op_pool
            .get_attestations(&state, &self.spec)
            .unwrap_or_default();
        let deposits = self.op_pool.get_deposits(&state);
        let voluntary_exits = self.op_pool.get_voluntary_exits(&state, &self.spec);

        let mut block = BeaconBlock {
            slot: produce_at_slot,
            proposer_index,
            parent_root,
            state_root: Hash256::zero(),
            body: BeaconBlockBody {
                randao_reveal,
                eth1_data: state.eth1_data.clone(),
                graffiti: Hash256::zero(),
                proposer_slashings: VariableList::new(proposer_slashings)
                    .map_err(BeaconStateError::SszTypesError)?,
                attester_slashings: VariableList::new(attester_slashings)
                    .map_err(BeaconStateError::SszTypesError)?,
                attestations: VariableList::new(attestations)
                    .map_err(BeaconStateError::SszTypesError)?,
                deposits: VariableList::new(deposits).map_err(BeaconStateError::SszTypesError)?,
                voluntary_exits: VariableList::new(voluntary_exits)
                    .map_err(BeaconStateError::SszTypesError)?,
                sync_aggregate: SyncAggregate::new(),
                execution_payload: ExecutionPayload::default(),
            },
        };

        // Run the unsigned block through the transition to obtain the state root.
        let mut post_state = state;
        let mut ctxt = ConsensusContext::new(block.slot).set_proposer_index(proposer_index);
        per_block_processing(
            &mut post_state,
            &SignedBeaconBlock {
                message: block.clone(),
                signature: Signature::empty(),
            },
            BlockSignatureStrategy::NoVerification,
            &mut ctxt,
            &self.spec,
        )
        .map_err(|e| Error::UnableToProduceBlock(format!("{:?}", e)))?;

        block.state_root = post_state.canonical_root();

        Ok(block)
    }

    /*
     * Persistence
     */

    /// Write the fork choice (and its store) to disk so the chain may resume after a restart.
    pub fn persist_fork_choice(&self) -> Result<(), Error> {
        let fork_choice = self.fork_choice.read();
        let persisted = fork_choice.to_persisted();
        let fc_store_bytes = fork_choice.fc_store().to_persisted().as_ssz_bytes();
        drop(fork_choice);

        let (justified_checkpoint, finalized_checkpoint) = {
            let fork_choice = self.fork_choice.read();
            (
                fork_choice.justified_checkpoint(),
                fork_choice.finalized_checkpoint(),
            )
        };

        let batch = vec![
            KeyValueStoreOp::PutKeyValue(
                get_key_for_col(DBColumn::BeaconChain.into(), FORK_CHOICE_DB_KEY.as_bytes()),
                persisted.as_ssz_bytes(),
            ),
            KeyValueStoreOp::PutKeyValue(
                get_key_for_col(DBColumn::BeaconCheckpoint.into(), b"fc_store"),
                fc_store_bytes,
            ),
            KeyValueStoreOp::PutKeyValue(
                get_key_for_col(DBColumn::BeaconCheckpoint.into(), b"head"),
                self.head_root().as_bytes().to_vec(),
            ),
            KeyValueStoreOp::PutKeyValue(
                get_key_for_col(DBColumn::BeaconCheckpoint.into(), b"justified"),
                justified_checkpoint.as_ssz_bytes(),
            ),
            KeyValueStoreOp::PutKeyValue(
                get_key_for_col(DBColumn::BeaconCheckpoint.into(), b"finalized"),
                finalized_checkpoint.as_ssz_bytes(),
            ),
        ];

        self.store.do_atomically(batch).map_err(Error::StoreError)
    }

    /// Load a previously persisted fork choice, if any.
    pub fn load_persisted_fork_choice(&self) -> Result<Option<PersistedForkChoice>, Error> {
        let bytes = self.store.get_bytes(
            DBColumn::BeaconChain.into(),
            FORK_CHOICE_DB_KEY.as_bytes(),
        )?;

        match bytes {
            Some(bytes) => {
                use ssz::Decode;
                Ok(Some(PersistedForkChoice::from_ssz_bytes(&bytes).map_err(
                    |e| Error::StoreError(store::Error::SszDecodeError(e)),
                )?))
            }
            None => Ok(None),
        }
    }
}

/// Is the error a judgement on the block itself (as opposed to an internal failure or a missing
/// precondition)? Only at-fault blocks enter the bad-block set.
fn block_is_at_fault(e: &BlockError) -> bool {
    matches!(
        e,
        BlockError::ProposalSignatureInvalid
            | BlockError::StateRootMismatch { .. }
            | BlockError::PerBlockProcessingError(_)
            | BlockError::ParentInvalid(_)
            | BlockError::ExecutionPayloadError(
                ExecutionPayloadError::RejectedByExecutionEngine
            )
    )
}

/// A `ChainArchive` mark: `slot ++ block_root -> ()`, allowing finalized roots to be iterated
/// per slot.
fn archive_op(slot: Slot, block_root: Hash256) -> KeyValueStoreOp {
    let mut key = slot.as_u64().to_be_bytes().to_vec();
    key.extend_from_slice(block_root.as_bytes());
    KeyValueStoreOp::PutKeyValue(
        get_key_for_col(DBColumn::ChainArchive.into(), &key),
        vec![],
    )
}
