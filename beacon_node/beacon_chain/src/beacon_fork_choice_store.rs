use fork_choice::ForkChoiceStore;
use ssz_derive::{Decode, Encode};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;
use store::{Error as StoreError, ItemStore};
use types::{BeaconBlock, BeaconState, Checkpoint, EthSpec, Hash256, Slot};

#[derive(Debug)]
pub enum Error {
    UnableToReadSlot,
    MissingBlock(Hash256),
    MissingState(Hash256),
    InvalidPersistedBytes(ssz::DecodeError),
    StoreError(StoreError),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::StoreError(e)
    }
}

/// Returns the effective balances for every validator in the given `state`.
///
/// Any validator who is not active in the state's current epoch is assigned a balance of zero.
pub fn get_effective_balances<E: EthSpec>(state: &BeaconState<E>) -> Vec<u64> {
    let current_epoch = state.current_epoch();
    state
        .validators
        .iter()
        .map(|validator| {
            if validator.is_active_at(current_epoch) {
                validator.effective_balance
            } else {
                0
            }
        })
        .collect()
}

/// Implements `fork_choice::ForkChoiceStore` in order to provide a persistent backing to the
/// `fork_choice::ForkChoice` struct.
#[derive(Debug)]
pub struct BeaconForkChoiceStore<E: EthSpec, S: ItemStore<E>> {
    store: Arc<S>,
    time: Slot,
    finalized_checkpoint: Checkpoint,
    justified_checkpoint: Checkpoint,
    justified_balances: Vec<u64>,
    best_justified_checkpoint: Checkpoint,
    unrealized_justified_checkpoint: Checkpoint,
    unrealized_finalized_checkpoint: Checkpoint,
    proposer_boost_root: Hash256,
    equivocating_indices: BTreeSet<u64>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec, S: ItemStore<E>> PartialEq for BeaconForkChoiceStore<E, S> {
    /// This implementation ignores the `store`.
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
            && self.finalized_checkpoint == other.finalized_checkpoint
            && self.justified_checkpoint == other.justified_checkpoint
            && self.justified_balances == other.justified_balances
            && self.best_justified_checkpoint == other.best_justified_checkpoint
            && self.unrealized_justified_checkpoint == other.unrealized_justified_checkpoint
            && self.unrealized_finalized_checkpoint == other.unrealized_finalized_checkpoint
            && self.proposer_boost_root == other.proposer_boost_root
            && self.equivocating_indices == other.equivocating_indices
    }
}

impl<E: EthSpec, S: ItemStore<E>> BeaconForkChoiceStore<E, S> {
    /// Initialize `Self` from an anchor (usually genesis), where the `anchor_state` is the
    /// post-state of the `anchor_block` at `anchor_block_root`.
    pub fn get_forkchoice_store(
        store: Arc<S>,
        anchor_block_root: Hash256,
        anchor_state: &BeaconState<E>,
    ) -> Self {
        let anchor_epoch = anchor_state.current_epoch();
        let justified_checkpoint = Checkpoint {
            epoch: anchor_epoch,
            root: anchor_block_root,
        };
        let finalized_checkpoint = justified_checkpoint;

        Self {
            store,
            time: anchor_state.slot,
            justified_checkpoint,
            justified_balances: get_effective_balances(anchor_state),
            finalized_checkpoint,
            best_justified_checkpoint: justified_checkpoint,
            unrealized_justified_checkpoint: justified_checkpoint,
            unrealized_finalized_checkpoint: finalized_checkpoint,
            proposer_boost_root: Hash256::zero(),
            equivocating_indices: BTreeSet::new(),
            _phantom: PhantomData,
        }
    }

    /// Save the current state of `Self` to an SSZ-encodable struct.
    pub fn to_persisted(&self) -> PersistedForkChoiceStore {
        PersistedForkChoiceStore {
            time: self.time,
            finalized_checkpoint: self.finalized_checkpoint,
            justified_checkpoint: self.justified_checkpoint,
            justified_balances: self.justified_balances.clone(),
            best_justified_checkpoint: self.best_justified_checkpoint,
            unrealized_justified_checkpoint: self.unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint: self.unrealized_finalized_checkpoint,
            proposer_boost_root: self.proposer_boost_root,
            equivocating_indices: self.equivocating_indices.iter().copied().collect(),
        }
    }

    /// Restore `Self` from a previously-generated `PersistedForkChoiceStore`.
    pub fn from_persisted(
        persisted: PersistedForkChoiceStore,
        store: Arc<S>,
    ) -> Result<Self, Error> {
        Ok(Self {
            store,
            time: persisted.time,
            finalized_checkpoint: persisted.finalized_checkpoint,
            justified_checkpoint: persisted.justified_checkpoint,
            justified_balances: persisted.justified_balances,
            best_justified_checkpoint: persisted.best_justified_checkpoint,
            unrealized_justified_checkpoint: persisted.unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint: persisted.unrealized_finalized_checkpoint,
            proposer_boost_root: persisted.proposer_boost_root,
            equivocating_indices: persisted.equivocating_indices.into_iter().collect(),
            _phantom: PhantomData,
        })
    }
}

impl<E: EthSpec, S: ItemStore<E>> ForkChoiceStore<E> for BeaconForkChoiceStore<E, S> {
    type Error = Error;

    fn get_current_slot(&self) -> Slot {
        self.time
    }

    fn set_current_slot(&mut self, slot: Slot) {
        self.time = slot
    }

    fn on_verified_block(
        &mut self,
        _block: &BeaconBlock<E>,
        _block_root: Hash256,
        _state: &BeaconState<E>,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn justified_checkpoint(&self) -> &Checkpoint {
        &self.justified_checkpoint
    }

    fn justified_balances(&self) -> &[u64] {
        &self.justified_balances
    }

    fn best_justified_checkpoint(&self) -> &Checkpoint {
        &self.best_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> &Checkpoint {
        &self.finalized_checkpoint
    }

    fn unrealized_justified_checkpoint(&self) -> &Checkpoint {
        &self.unrealized_justified_checkpoint
    }

    fn unrealized_finalized_checkpoint(&self) -> &Checkpoint {
        &self.unrealized_finalized_checkpoint
    }

    fn proposer_boost_root(&self) -> Hash256 {
        self.proposer_boost_root
    }

    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.finalized_checkpoint = checkpoint
    }

    fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), Error> {
        self.justified_checkpoint = checkpoint;

        // The justified balances are those of the state at the newly justified checkpoint.
        let justified_block = self
            .store
            .get::<types::SignedBeaconBlock<E>>(&self.justified_checkpoint.root)?
            .ok_or(Error::MissingBlock(self.justified_checkpoint.root))?;

        let state_root = justified_block.state_root();
        let state = self
            .store
            .get::<BeaconState<E>>(&state_root)?
            .ok_or(Error::MissingState(state_root))?;

        self.justified_balances = get_effective_balances(&state);

        Ok(())
    }

    fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.best_justified_checkpoint = checkpoint
    }

    fn set_unrealized_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.unrealized_justified_checkpoint = checkpoint;
    }

    fn set_unrealized_finalized_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.unrealized_finalized_checkpoint = checkpoint;
    }

    fn set_proposer_boost_root(&mut self, proposer_boost_root: Hash256) {
        self.proposer_boost_root = proposer_boost_root;
    }

    fn equivocating_indices(&self) -> &BTreeSet<u64> {
        &self.equivocating_indices
    }

    fn extend_equivocating_indices(&mut self, indices: impl IntoIterator<Item = u64>) {
        self.equivocating_indices.extend(indices);
    }
}

/// The SSZ-encodable form of the fork choice store, for persistence across restarts.
#[derive(Encode, Decode, Clone)]
pub struct PersistedForkChoiceStore {
    pub time: Slot,
    pub finalized_checkpoint: Checkpoint,
    pub justified_checkpoint: Checkpoint,
    pub justified_balances: Vec<u64>,
    pub best_justified_checkpoint: Checkpoint,
    pub unrealized_justified_checkpoint: Checkpoint,
    pub unrealized_finalized_checkpoint: Checkpoint,
    pub proposer_boost_root: Hash256,
    pub equivocating_indices: Vec<u64>,
}
