mod attestation;
mod attestation_id;
mod max_cover;

pub use attestation::AttMaxCover;
pub use attestation_id::AttestationId;
pub use max_cover::{maximum_cover, MaxCover};

use parking_lot::RwLock;
use state_processing::per_block_processing::errors::{
    AttesterSlashingValidationError, ExitValidationError, ProposerSlashingValidationError,
};
use state_processing::per_block_processing::{
    get_slashable_indices_modular, verify_attestation_for_block_inclusion, verify_exit,
    VerifySignatures,
};
use state_processing::{SigVerifiedOp, VerifyOperation};
use std::collections::{hash_map::Entry, BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;
use types::{
    Attestation, AttesterSlashing, BeaconState, BeaconStateError, ChainSpec, Deposit, Epoch,
    EthSpec, ProposerSlashing, SignedVoluntaryExit, Unsigned, Validator,
};

#[derive(Debug, PartialEq)]
pub enum OpPoolError {
    GetAttestationsTotalBalanceError(BeaconStateError),
    GetBlockRootError(BeaconStateError),
    IncorrectOpPoolVariant,
}

/// The result of inserting a `Deposit` into the pool.
#[derive(Debug, PartialEq, Clone)]
pub enum DepositInsertStatus {
    /// The deposit was not already in the pool.
    Fresh,
    /// The deposit already existed in the pool.
    Duplicate,
    /// The deposit conflicted with an existing deposit, which was replaced.
    Replaced(Box<Deposit>),
}

/// A pool of operations awaiting inclusion in a block: attestations, slashings, voluntary exits
/// and deposits.
///
/// Entries are deduplicated by operation-specific keys and pruned when finalization makes them
/// redundant. All maps are behind independent `RwLock`s so that the read paths (block
/// production) do not contend with the write paths (gossip processing).
#[derive(Default)]
pub struct OperationPool<E: EthSpec + Default> {
    /// Map from attestation ID to the list of non-aggregatable attestations seen for that data.
    attestations: RwLock<HashMap<AttestationId, Vec<Attestation<E>>>>,
    /// Set of attester slashings, deduplicated by their slashable indices.
    attester_slashings: RwLock<Vec<SigVerifiedOp<AttesterSlashing<E>>>>,
    /// Map from proposer index to slashing.
    proposer_slashings: RwLock<HashMap<u64, SigVerifiedOp<ProposerSlashing>>>,
    /// Map from exiting validator to their exit data.
    voluntary_exits: RwLock<HashMap<u64, SigVerifiedOp<SignedVoluntaryExit>>>,
    /// Map from deposit index to deposit. Ordered so deposits can be drawn consecutively.
    deposits: RwLock<BTreeMap<u64, Deposit>>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> OperationPool<E> {
    /// Create a new operation pool.
    pub fn new() -> Self {
        Self::default()
    }

    /*
     * Attestations
     */

    /// Insert an attestation into the pool, aggregating it with existing attestations if
    /// possible.
    ///
    /// ## Note
    ///
    /// This function assumes the given `attestation` has already been verified.
    pub fn insert_attestation(&self, attestation: Attestation<E>) {
        let id = AttestationId::from_data(&attestation.data);

        // Take a write lock on the attestations map.
        let mut attestations = self.attestations.write();

        let existing_attestations = match attestations.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(vec![attestation]);
                return;
            }
            Entry::Occupied(entry) => entry.into_mut(),
        };

        let mut aggregated = false;
        for existing_attestation in existing_attestations.iter_mut() {
            if existing_attestation.signers_disjoint_from(&attestation) {
                existing_attestation.aggregate(&attestation);
                aggregated = true;
            } else if *existing_attestation == attestation {
                aggregated = true;
            }
        }

        if !aggregated {
            existing_attestations.push(attestation);
        }
    }

    /// Total number of attestations in the pool, including attestations for the same data.
    pub fn num_attestations(&self) -> usize {
        self.attestations.read().values().map(Vec::len).sum()
    }

    /// Get a list of attestations for inclusion in a block.
    ///
    /// Attestations are scored by the number of attesters whose timely-target flag is not yet
    /// recorded on-chain, and selected with a greedy maximum-cover over the block's attestation
    /// limit.
    pub fn get_attestations(
        &self,
        state: &BeaconState<E>,
        spec: &ChainSpec,
    ) -> Result<Vec<Attestation<E>>, OpPoolError> {
        // Attestations for the current fork, obtained from the attestation pool.
        let attestations = self.attestations.read();

        let valid_attestations = attestations
            .values()
            .flatten()
            .filter(|attestation| {
                // Ensure attestations are valid for block inclusion. The signatures were
                // verified when the attestations entered the pool.
                verify_attestation_for_block_inclusion(
                    state,
                    attestation,
                    VerifySignatures::False,
                    spec,
                )
                .is_ok()
            })
            .filter_map(|attestation| AttMaxCover::new(attestation, state));

        Ok(maximum_cover(
            valid_attestations,
            E::MaxAttestations::to_usize(),
        ))
    }

    /// Removes attestations which are too old to be included in a block.
    pub fn prune_attestations(&self, current_epoch: Epoch) {
        self.attestations.write().retain(|id, _| {
            // All the attestations in this bucket have the same data.
            id.slot() + E::slots_per_epoch() >= current_epoch.start_slot(E::slots_per_epoch())
        });
    }

    /*
     * Slashings
     */

    /// Insert a proposer slashing into the pool.
    pub fn insert_proposer_slashing(
        &self,
        verified_proposer_slashing: SigVerifiedOp<ProposerSlashing>,
    ) {
        let slashing = verified_proposer_slashing.as_inner();
        let proposer_index = slashing.signed_header_1.message.proposer_index;
        self.proposer_slashings
            .write()
            .insert(proposer_index, verified_proposer_slashing);
    }

    /// Insert an attester slashing into the pool.
    ///
    /// Slashings which do not cover any validator that is not already covered by a pooled
    /// slashing are dropped.
    pub fn insert_attester_slashing(
        &self,
        verified_slashing: SigVerifiedOp<AttesterSlashing<E>>,
        state: &BeaconState<E>,
    ) {
        let mut slashings = self.attester_slashings.write();

        let covered: HashSet<u64> = slashings
            .iter()
            .flat_map(|existing| {
                slashable_indices_unchecked(existing.as_inner(), state)
            })
            .collect();

        let new_indices = slashable_indices_unchecked(verified_slashing.as_inner(), state);
        if new_indices.iter().any(|index| !covered.contains(index)) {
            slashings.push(verified_slashing);
        }
    }

    /// Get proposer and attester slashings for inclusion in a block.
    ///
    /// This function computes both types of slashings together, because attester slashings may
    /// be invalidated by proposer slashings included earlier in the block.
    pub fn get_slashings(
        &self,
        state: &BeaconState<E>,
    ) -> (Vec<ProposerSlashing>, Vec<AttesterSlashing<E>>) {
        let proposer_slashings = self
            .proposer_slashings
            .read()
            .values()
            .filter(|slashing| {
                state
                    .validators
                    .get(slashing.as_inner().signed_header_1.message.proposer_index as usize)
                    .map_or(false, |validator| !validator.slashed)
            })
            .take(E::MaxProposerSlashings::to_usize())
            .map(|slashing| slashing.as_inner().clone())
            .collect::<Vec<_>>();

        // Set of validators to be slashed, so we don't attempt to construct invalid attester
        // slashings.
        let mut to_be_slashed: HashSet<u64> = proposer_slashings
            .iter()
            .map(|slashing| slashing.signed_header_1.message.proposer_index)
            .collect();

        let attester_slashings = self
            .attester_slashings
            .read()
            .iter()
            .filter_map(|slashing| {
                // Take all slashings that will slash 1 or more validators.
                let slashed_validators = get_slashable_indices_modular(
                    state,
                    slashing.as_inner(),
                    |index, validator| {
                        validator.is_slashable_at(state.current_epoch())
                            && !to_be_slashed.contains(&index)
                    },
                )
                .ok()?;

                to_be_slashed.extend(slashed_validators);
                Some(slashing.as_inner().clone())
            })
            .take(E::MaxAttesterSlashings::to_usize())
            .collect();

        (proposer_slashings, attester_slashings)
    }

    /// Prune proposer slashings for validators which have been slashed or withdrawn.
    pub fn prune_proposer_slashings(&self, head_state: &BeaconState<E>) {
        prune_validator_hash_map(
            &mut self.proposer_slashings.write(),
            |validator| validator.slashed || validator.is_withdrawable_at(head_state.current_epoch()),
            head_state,
        );
    }

    /// Prune attester slashings for all slashed or withdrawn validators.
    pub fn prune_attester_slashings(&self, head_state: &BeaconState<E>) {
        self.attester_slashings.write().retain(|slashing| {
            // Check that the slashing still covers at least one un-slashed validator.
            get_slashable_indices_modular(head_state, slashing.as_inner(), |_, validator| {
                validator.is_slashable_at(head_state.current_epoch())
            })
            .is_ok()
        });
    }

    /*
     * Voluntary exits
     */

    /// Insert a voluntary exit.
    pub fn insert_voluntary_exit(&self, verified_exit: SigVerifiedOp<SignedVoluntaryExit>) {
        let exit = verified_exit.as_inner();
        self.voluntary_exits
            .write()
            .insert(exit.message.validator_index, verified_exit);
    }

    /// Get a list of voluntary exits for inclusion in a block.
    pub fn get_voluntary_exits(
        &self,
        state: &BeaconState<E>,
        spec: &ChainSpec,
    ) -> Vec<SignedVoluntaryExit> {
        self.voluntary_exits
            .read()
            .values()
            .filter(|exit| {
                verify_exit(state, exit.as_inner(), VerifySignatures::False, spec).is_ok()
            })
            .take(E::MaxVoluntaryExits::to_usize())
            .map(|exit| exit.as_inner().clone())
            .collect()
    }

    /// Prune if validator has already exited at or before the finalized checkpoint of the head.
    pub fn prune_voluntary_exits(&self, head_state: &BeaconState<E>) {
        prune_validator_hash_map(
            &mut self.voluntary_exits.write(),
            // This condition is slightly too loose, since there will be some finalized exits
            // that are missed here.
            //
            // We choose simplicity over the gain of pruning more exits since they are small and
            // should not be seen frequently.
            |validator| validator.exit_epoch <= head_state.finalized_checkpoint.epoch,
            head_state,
        );
    }

    /*
     * Deposits
     */

    /// Add a deposit to the pool.
    ///
    /// No two distinct deposits may be stored with the same index.
    pub fn insert_deposit(
        &self,
        deposit_index: u64,
        deposit: Deposit,
    ) -> DepositInsertStatus {
        use DepositInsertStatus::*;

        match self.deposits.write().entry(deposit_index) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(deposit);
                Fresh
            }
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                if *entry.get() == deposit {
                    Duplicate
                } else {
                    Replaced(Box::new(entry.insert(deposit)))
                }
            }
        }
    }

    /// Get an ordered list of deposits for inclusion in a block.
    ///
    /// Take at most the maximum number of deposits, beginning from the current deposit index.
    pub fn get_deposits(&self, state: &BeaconState<E>) -> Vec<Deposit> {
        let outstanding_deposit_len = state
            .get_outstanding_deposit_len()
            .unwrap_or(0);

        self.deposits
            .read()
            .range(state.eth1_deposit_index..)
            .take_while(|(&index, _)| {
                // The deposits must be consecutive, starting from the state's deposit index.
                index
                    < state
                        .eth1_deposit_index
                        .saturating_add(E::MaxDeposits::to_u64())
                    && index < state.eth1_deposit_index.saturating_add(outstanding_deposit_len)
            })
            .scan(state.eth1_deposit_index, |expected, (&index, deposit)| {
                if index == *expected {
                    *expected += 1;
                    Some(deposit.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Remove all deposits with index less than the deposit index of the latest finalised block.
    pub fn prune_deposits(&self, state: &BeaconState<E>) {
        let mut deposits = self.deposits.write();
        *deposits = deposits.split_off(&state.eth1_deposit_index);
    }

    /// Total number of deposits in the pool.
    pub fn num_deposits(&self) -> usize {
        self.deposits.read().len()
    }

    /// Prune all types of transactions given the latest head state and head fork.
    pub fn prune_all(&self, head_state: &BeaconState<E>, current_epoch: Epoch) {
        self.prune_attestations(current_epoch);
        self.prune_proposer_slashings(head_state);
        self.prune_attester_slashings(head_state);
        self.prune_voluntary_exits(head_state);
        self.prune_deposits(head_state);
    }

    /// Total number of voluntary exits in the pool.
    pub fn num_voluntary_exits(&self) -> usize {
        self.voluntary_exits.read().len()
    }

    /// Total number of attester slashings in the pool.
    pub fn num_attester_slashings(&self) -> usize {
        self.attester_slashings.read().len()
    }

    /// Total number of proposer slashings in the pool.
    pub fn num_proposer_slashings(&self) -> usize {
        self.proposer_slashings.read().len()
    }
}

/// The slashable indices of an attester slashing, ignoring the slashability predicate.
fn slashable_indices_unchecked<E: EthSpec>(
    slashing: &AttesterSlashing<E>,
    state: &BeaconState<E>,
) -> Vec<u64> {
    get_slashable_indices_modular(state, slashing, |_, _| true).unwrap_or_default()
}

/// Prune a `HashMap` keyed by validator index, dropping entries for which `prune_if` returns
/// `true` or whose validator is unknown.
fn prune_validator_hash_map<E: EthSpec, T, F>(
    map: &mut HashMap<u64, SigVerifiedOp<T>>,
    prune_if: F,
    head_state: &BeaconState<E>,
) where
    F: Fn(&Validator) -> bool,
{
    map.retain(|&validator_index, _| {
        head_state
            .validators
            .get(validator_index as usize)
            .map_or(true, |validator| !prune_if(validator))
    });
}

/// Compute a fingerprint that never conflicts, so errors are re-exported coherently.
pub type VerifiedExit = SigVerifiedOp<SignedVoluntaryExit>;
pub type VerifiedProposerSlashing = SigVerifiedOp<ProposerSlashing>;
pub type VerifiedAttesterSlashing<E> = SigVerifiedOp<AttesterSlashing<E>>;

/// Re-exported so callers can `validate` operations before insertion without depending on
/// `state_processing` directly.
pub mod verify {
    pub use state_processing::{SigVerifiedOp, VerifyOperation};

    pub use super::{
        AttesterSlashingValidationError, ExitValidationError, ProposerSlashingValidationError,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::{build_initial_state, generate_deterministic_keypairs};
    use types::{Hash256, MinimalEthSpec, Slot, VoluntaryExit};

    type E = MinimalEthSpec;

    fn test_state() -> (BeaconState<E>, ChainSpec) {
        let spec = E::default_spec();
        let state =
            build_initial_state::<E>(&generate_deterministic_keypairs(16), 0, &spec);
        (state, spec)
    }

    #[test]
    fn exits_deduplicate_by_validator_index() {
        let (mut state, spec) = test_state();
        let keypairs = generate_deterministic_keypairs(16);
        let pool = OperationPool::<E>::new();

        // Move the state far enough forward that genesis validators are allowed to exit.
        state.slot = Epoch::new(spec.shard_committee_period).start_slot(E::slots_per_epoch());

        for _ in 0..2 {
            let exit = VoluntaryExit {
                epoch: Epoch::new(0),
                validator_index: 4,
            }
            .sign(
                &keypairs[4].sk,
                state.fork.current_version,
                state.genesis_validators_root,
                &spec,
            );

            let verified = VerifyOperation::<E>::validate(exit, &state, &spec)
                .expect("exit verifies against an old enough state");
            pool.insert_voluntary_exit(verified);
        }

        assert_eq!(pool.num_voluntary_exits(), 1);
    }

    #[test]
    fn deposits_are_returned_in_order() {
        let (state, _) = test_state();
        let pool = OperationPool::<E>::new();

        let deposit = |amount: u64| Deposit {
            proof: <_>::default(),
            data: types::DepositData {
                pubkey: types::PublicKeyBytes::empty(),
                withdrawal_credentials: Hash256::zero(),
                amount,
                signature: types::SignatureBytes::empty(),
            },
        };

        // `state.eth1_deposit_index` is 16 after genesis; insert a gap at 18.
        let base = state.eth1_deposit_index;
        assert_eq!(
            pool.insert_deposit(base, deposit(1)),
            DepositInsertStatus::Fresh
        );
        assert_eq!(
            pool.insert_deposit(base, deposit(1)),
            DepositInsertStatus::Duplicate
        );
        assert_eq!(
            pool.insert_deposit(base + 2, deposit(3)),
            DepositInsertStatus::Fresh
        );

        // `get_deposits` requires the eth1 data to acknowledge the outstanding deposits.
        let mut state = state;
        state.eth1_data.deposit_count = base + 3;

        // Only the contiguous prefix is returned.
        let deposits = pool.get_deposits(&state);
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].data.amount, 1);
    }

    #[test]
    fn attestation_pool_aggregates() {
        let (mut state, spec) = test_state();
        state.build_all_caches(&spec).unwrap();

        let committee = state
            .get_beacon_committee(Slot::new(0), 0)
            .unwrap()
            .into_owned();

        let data = types::AttestationData {
            slot: Slot::new(0),
            index: 0,
            beacon_block_root: Hash256::repeat_byte(1),
            source: state.current_justified_checkpoint,
            target: types::Checkpoint {
                epoch: Epoch::new(0),
                root: Hash256::repeat_byte(1),
            },
        };

        let pool = OperationPool::<E>::new();

        // Two disjoint single-bit attestations for the same data aggregate into one.
        for position in 0..2 {
            let mut att =
                Attestation::<E>::empty_for_signing(data, committee.committee.len()).unwrap();
            att.aggregation_bits.set(position, true).unwrap();
            pool.insert_attestation(att);
        }

        let attestations = pool.attestations.read();
        let stored = attestations.values().flatten().collect::<Vec<_>>();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].num_set_aggregation_bits(), 2);
    }
}
