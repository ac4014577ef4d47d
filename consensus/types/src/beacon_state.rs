use crate::{
    beacon_state::exit_cache::ExitCache, beacon_state::pubkey_cache::PubkeyCache,
    AggregatePublicKey, BeaconBlockHeader, BeaconCommittee, BitVector, ChainSpec, Checkpoint,
    CommitteeIndex, Domain, Epoch, Eth1Data, EthSpec, ExecutionPayloadHeader, FixedVector, Fork,
    Hash256, HistoricalBatch, ParticipationFlags, PublicKeyBytes, RelativeEpoch, Signature, Slot,
    SyncCommittee, Validator, VariableList,
};
use eth2_hashing::hash;
use int_to_bytes::{int_to_bytes4, int_to_bytes8};
use safe_arith::{ArithError, SafeArith};
use serde_derive::{Deserialize, Serialize};
use ssz::Encode as SszEncode;
use ssz_derive::{Decode, Encode};
use ssz_types::typenum::Unsigned;
use swap_or_not_shuffle::compute_shuffled_index;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

pub use self::committee_cache::CommitteeCache;

pub mod committee_cache;
pub mod exit_cache;
pub mod pubkey_cache;

#[cfg(test)]
mod tests;

pub const CACHED_EPOCHS: usize = 3;
const MAX_RANDOM_BYTE: u64 = u8::max_value() as u64;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// A state for a different hard-fork was required.
    EpochOutOfBounds,
    SlotOutOfBounds,
    UnknownValidator(usize),
    UnableToDetermineProducer,
    InvalidBitfield,
    ValidatorIsWithdrawable,
    ValidatorIsInactive {
        val_index: usize,
    },
    UnableToShuffle,
    ShuffleIndexOutOfBounds(usize),
    IsAggregatorOutOfBounds,
    BlockRootsOutOfBounds(usize),
    StateRootsOutOfBounds(usize),
    SlashingsOutOfBounds(usize),
    BalancesOutOfBounds(usize),
    RandaoMixesOutOfBounds(usize),
    CommitteeCachesOutOfBounds(usize),
    ParticipationOutOfBounds(usize),
    InactivityScoresOutOfBounds(usize),
    TooManyValidators,
    InsufficientValidators,
    InsufficientRandaoMixes,
    NoCommittee {
        slot: Slot,
        index: CommitteeIndex,
    },
    ZeroSlotsPerEpoch,
    PubkeyCacheInconsistent,
    PubkeyCacheIncomplete {
        cache_len: usize,
        registry_len: usize,
    },
    ExitCacheUninitialized,
    CommitteeCacheUninitialized(Option<RelativeEpoch>),
    SyncCommitteeCacheUninitialized,
    BlsError(bls::Error),
    SszTypesError(ssz_types::Error),
    ArithError(ArithError),
    RelativeEpochError(crate::relative_epoch::Error),
    IncorrectAttestationSource,
    InvalidCommitteeIndex(CommitteeIndex),
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Error {
        Error::SszTypesError(e)
    }
}

impl From<bls::Error> for Error {
    fn from(e: bls::Error) -> Error {
        Error::BlsError(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::ArithError(e)
    }
}

impl From<crate::relative_epoch::Error> for Error {
    fn from(e: crate::relative_epoch::Error) -> Error {
        Error::RelativeEpochError(e)
    }
}

/// The state of the `BeaconChain` at some slot.
///
/// The "hard" consensus fields come first and are the only fields which contribute to the SSZ
/// encoding and tree hash root. The caches at the bottom are derived data; re-deriving any cache
/// from the hard fields always yields the same value, and a freshly-decoded state simply has
/// empty caches.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "E: EthSpec")]
pub struct BeaconState<E>
where
    E: EthSpec,
{
    // Versioning
    #[serde(with = "eth2_serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    pub slot: Slot,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Hash256, E::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Hash256, E::SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<Hash256, E::HistoricalRootsLimit>,

    // Ethereum 1.0 chain data
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, E::SlotsPerEth1VotingPeriod>,
    #[serde(with = "eth2_serde_utils::quoted_u64")]
    pub eth1_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, E::ValidatorRegistryLimit>,
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub balances: VariableList<u64, E::ValidatorRegistryLimit>,

    // Randomness
    pub randao_mixes: FixedVector<Hash256, E::EpochsPerHistoricalVector>,

    // Slashings
    #[serde(with = "ssz_types::serde_utils::quoted_u64_fixed_vec")]
    pub slashings: FixedVector<u64, E::EpochsPerSlashingsVector>,

    // Participation
    pub previous_epoch_participation: VariableList<ParticipationFlags, E::ValidatorRegistryLimit>,
    pub current_epoch_participation: VariableList<ParticipationFlags, E::ValidatorRegistryLimit>,

    // Finality
    pub justification_bits: BitVector<E::JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    // Inactivity
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub inactivity_scores: VariableList<u64, E::ValidatorRegistryLimit>,

    // Light-client sync committees
    pub current_sync_committee: SyncCommittee<E>,
    pub next_sync_committee: SyncCommittee<E>,

    // Execution
    pub latest_execution_payload_header: ExecutionPayloadHeader<E>,

    // Caching (not in the spec)
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub committee_caches: [CommitteeCache; CACHED_EPOCHS],
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub pubkey_cache: PubkeyCache,
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub exit_cache: ExitCache,
}

impl<E: EthSpec> BeaconState<E> {
    /// Create a new state at genesis, with the zero hash as the latest block header and
    /// empty registries.
    pub fn new(genesis_time: u64, eth1_data: Eth1Data, spec: &ChainSpec) -> Self {
        BeaconState {
            // Versioning
            genesis_time,
            genesis_validators_root: Hash256::zero(), // Set later.
            slot: spec.genesis_slot,
            fork: spec.fork_at_epoch(E::genesis_epoch()),

            // History
            latest_block_header: BeaconBlockHeader {
                slot: spec.genesis_slot,
                proposer_index: 0,
                parent_root: Hash256::zero(),
                state_root: Hash256::zero(),
                body_root: Hash256::zero(),
            },
            block_roots: FixedVector::from_elem(Hash256::zero()),
            state_roots: FixedVector::from_elem(Hash256::zero()),
            historical_roots: VariableList::empty(),

            // Eth1
            eth1_data,
            eth1_data_votes: VariableList::empty(),
            eth1_deposit_index: 0,

            // Validator registry
            validators: VariableList::empty(),
            balances: VariableList::empty(),

            // Randomness
            randao_mixes: FixedVector::from_elem(Hash256::zero()),

            // Slashings
            slashings: FixedVector::from_elem(0),

            // Participation
            previous_epoch_participation: VariableList::empty(),
            current_epoch_participation: VariableList::empty(),

            // Finality
            justification_bits: BitVector::new(),
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),

            // Inactivity
            inactivity_scores: VariableList::empty(),

            // Sync committees
            current_sync_committee: SyncCommittee::temporary(),
            next_sync_committee: SyncCommittee::temporary(),

            // Execution
            latest_execution_payload_header: ExecutionPayloadHeader::default(),

            // Caching (not in spec)
            committee_caches: [
                CommitteeCache::default(),
                CommitteeCache::default(),
                CommitteeCache::default(),
            ],
            pubkey_cache: PubkeyCache::default(),
            exit_cache: ExitCache::default(),
        }
    }

    /// Returns the `tree_hash_root` of the state.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    /// The epoch corresponding to `self.slot`.
    pub fn current_epoch(&self) -> Epoch {
        self.slot.epoch(E::slots_per_epoch())
    }

    /// The epoch prior to `self.current_epoch()`.
    ///
    /// If the current epoch is the genesis epoch, the genesis_epoch is returned.
    pub fn previous_epoch(&self) -> Epoch {
        let current_epoch = self.current_epoch();
        if current_epoch > E::genesis_epoch() {
            current_epoch - 1
        } else {
            current_epoch
        }
    }

    /// The epoch following `self.current_epoch()`.
    pub fn next_epoch(&self) -> Result<Epoch, Error> {
        Ok(self.current_epoch() + 1)
    }

    /// Compute the number of committees at `slot`.
    ///
    /// Makes use of the committee cache.
    pub fn get_committee_count_at_slot(&self, slot: Slot) -> Result<u64, Error> {
        let cache = self.committee_cache_at_slot(slot)?;
        Ok(cache.committees_per_slot())
    }

    /// Get the number of committees per slot at `epoch`, computing it from the state without
    /// touching the committee cache.
    pub fn get_committee_count_per_slot(
        &self,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<usize, Error> {
        let active = self.get_active_validator_indices(epoch);
        Ok(E::get_committee_count_per_slot(active.len(), spec)?)
    }

    /// Returns the active validator indices for the given epoch, in ascending order.
    ///
    /// Does not utilize the cache, performs a full iteration over the validator registry.
    pub fn get_active_validator_indices(&self, epoch: Epoch) -> Vec<usize> {
        get_active_validator_indices(&self.validators, epoch)
    }

    /// Returns the committee cache for some `slot`, if that slot's epoch is cached.
    fn committee_cache_at_slot(&self, slot: Slot) -> Result<&CommitteeCache, Error> {
        let epoch = slot.epoch(E::slots_per_epoch());
        let relative_epoch = RelativeEpoch::from_epoch(self.current_epoch(), epoch)?;
        self.committee_cache(relative_epoch)
    }

    /// Returns the cached committee for some `(slot, index)` tuple.
    pub fn get_beacon_committee(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<BeaconCommittee, Error> {
        let cache = self.committee_cache_at_slot(slot)?;
        cache
            .get_beacon_committee(slot, index)
            .ok_or(Error::NoCommittee { slot, index })
    }

    /// Returns all committees for `slot`.
    pub fn get_beacon_committees_at_slot(&self, slot: Slot) -> Result<Vec<BeaconCommittee>, Error> {
        let cache = self.committee_cache_at_slot(slot)?;
        cache.get_beacon_committees_at_slot(slot)
    }

    /// Returns the block root which decided the proposer shuffling for the current epoch. This
    /// root can be used to key this proposer shuffling.
    pub fn proposer_shuffling_decision_root(&self, block_root: Hash256) -> Result<Hash256, Error> {
        let decision_slot = self
            .current_epoch()
            .start_slot(E::slots_per_epoch())
            .saturating_sub(1u64);

        if self.slot <= decision_slot {
            Ok(block_root)
        } else {
            Ok(*self.get_block_root(decision_slot)?)
        }
    }

    /// Returns the beacon proposer index for the `slot` in `self.current_epoch()`.
    pub fn get_beacon_proposer_index(
        &self,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<usize, Error> {
        // Proposer indices are only known for the current epoch, due to the dependence on the
        // effective balances of validators, which change at every epoch transition.
        let epoch = slot.epoch(E::slots_per_epoch());
        if epoch != self.current_epoch() {
            return Err(Error::SlotOutOfBounds);
        }

        let seed = self.get_beacon_proposer_seed(slot, spec)?;
        let indices = self.get_active_validator_indices(epoch);

        self.compute_proposer_index(&indices, &seed, spec)
    }

    /// Compute the seed to use for the beacon proposer selection at the given `slot`.
    fn get_beacon_proposer_seed(&self, slot: Slot, spec: &ChainSpec) -> Result<Vec<u8>, Error> {
        let epoch = slot.epoch(E::slots_per_epoch());
        let mut preimage = self
            .get_seed(epoch, Domain::BeaconProposer, spec)?
            .as_bytes()
            .to_vec();
        preimage.append(&mut int_to_bytes8(slot.as_u64()));
        Ok(hash(&preimage))
    }

    /// Compute the proposer (not necessarily for the Beacon chain) from a list of indices.
    ///
    /// Spec v0.12.1
    pub fn compute_proposer_index(
        &self,
        indices: &[usize],
        seed: &[u8],
        spec: &ChainSpec,
    ) -> Result<usize, Error> {
        if indices.is_empty() {
            return Err(Error::InsufficientValidators);
        }

        let mut i = 0;
        loop {
            let shuffled_index = compute_shuffled_index(
                i.safe_rem(indices.len())?,
                indices.len(),
                seed,
                spec.shuffle_round_count,
            )
            .ok_or(Error::UnableToShuffle)?;

            let candidate_index = *indices
                .get(shuffled_index)
                .ok_or(Error::ShuffleIndexOutOfBounds(shuffled_index))?;

            let random_byte = Self::shuffling_random_byte(i, seed)?;

            let effective_balance = self.get_effective_balance(candidate_index)?;

            if effective_balance.safe_mul(MAX_RANDOM_BYTE)?
                >= spec
                    .max_effective_balance
                    .safe_mul(u64::from(random_byte))?
            {
                return Ok(candidate_index);
            }
            i.safe_add_assign(1)?;
        }
    }

    /// Get a random byte from the given `seed`.
    ///
    /// Used by the proposer and sync committee selection functions.
    fn shuffling_random_byte(i: usize, seed: &[u8]) -> Result<u8, Error> {
        let mut preimage = seed.to_vec();
        preimage.append(&mut int_to_bytes8(i.safe_div(32)? as u64));
        let index = i.safe_rem(32)?;

        hash(&preimage)
            .get(index)
            .copied()
            .ok_or(Error::ShuffleIndexOutOfBounds(index))
    }

    /// Get the canonical root of the `latest_block_header`, filling in its state root if necessary.
    ///
    /// It needs filling in on all slots where there isn't a skip.
    pub fn get_latest_block_root(&self, current_state_root: Hash256) -> Hash256 {
        if self.latest_block_header.state_root.is_zero() {
            let mut latest_block_header = self.latest_block_header.clone();
            latest_block_header.state_root = current_state_root;
            latest_block_header.canonical_root()
        } else {
            self.latest_block_header.canonical_root()
        }
    }

    /// Safely obtains the index for `block_roots`, given some `slot`.
    fn get_latest_block_roots_index(&self, slot: Slot) -> Result<usize, Error> {
        if slot < self.slot && self.slot <= slot + E::slots_per_historical_root() as u64 {
            Ok(slot.as_usize().safe_rem(E::slots_per_historical_root())?)
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// Return the block root at a recent `slot`.
    pub fn get_block_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        self.block_roots
            .get(i)
            .ok_or(Error::BlockRootsOutOfBounds(i))
    }

    /// Return the block root at a recent `epoch`.
    ///
    /// Note that the block root at the start of an epoch is the root of the block at the epoch's
    /// first slot, or an earlier block if that slot was skipped.
    pub fn get_block_root_at_epoch(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        self.get_block_root(epoch.start_slot(E::slots_per_epoch()))
    }

    /// Sets the block root for some given slot.
    pub fn set_block_root(&mut self, slot: Slot, block_root: Hash256) -> Result<(), Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        self.block_roots[i] = block_root;
        Ok(())
    }

    /// Safely obtains the index for `state_roots`, given some `slot`.
    fn get_latest_state_roots_index(&self, slot: Slot) -> Result<usize, Error> {
        if slot < self.slot && self.slot <= slot + E::slots_per_historical_root() as u64 {
            Ok(slot.as_usize().safe_rem(E::slots_per_historical_root())?)
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// Gets the state root for some slot.
    pub fn get_state_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_state_roots_index(slot)?;
        self.state_roots
            .get(i)
            .ok_or(Error::StateRootsOutOfBounds(i))
    }

    /// Sets the latest state root for slot.
    pub fn set_state_root(&mut self, slot: Slot, state_root: Hash256) -> Result<(), Error> {
        let i = self.get_latest_state_roots_index(slot)?;
        self.state_roots[i] = state_root;
        Ok(())
    }

    /// Safely obtain the index for `randao_mixes`.
    fn get_randao_mix_index(&self, epoch: Epoch) -> Result<usize, Error> {
        let current_epoch = self.current_epoch();
        let len = E::EpochsPerHistoricalVector::to_u64();

        if current_epoch < epoch + len && epoch <= current_epoch {
            Ok(epoch.as_usize().safe_rem(len as usize)?)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /// Return the randao mix at a recent ``epoch``.
    pub fn get_randao_mix(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        let i = self.get_randao_mix_index(epoch)?;
        self.randao_mixes
            .get(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))
    }

    /// Set the randao mix at a recent ``epoch``.
    pub fn set_randao_mix(&mut self, epoch: Epoch, mix: Hash256) -> Result<(), Error> {
        let i = epoch
            .as_usize()
            .safe_rem(E::EpochsPerHistoricalVector::to_usize())?;
        self.randao_mixes[i] = mix;
        Ok(())
    }

    /// XOR-mixes the entropy of a `randao_reveal` into the current epoch's randao mix.
    ///
    /// Spec v0.12.1
    pub fn update_randao_mix(&mut self, epoch: Epoch, signature: &Signature) -> Result<(), Error> {
        let i = epoch
            .as_usize()
            .safe_rem(E::EpochsPerHistoricalVector::to_usize())?;

        let signature_hash = Hash256::from_slice(&hash(&signature.as_ssz_bytes()));

        let current_mix = *self
            .randao_mixes
            .get(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))?;
        self.randao_mixes[i] = current_mix ^ signature_hash;

        Ok(())
    }

    /// Generate a seed for the given `epoch`.
    pub fn get_seed(
        &self,
        epoch: Epoch,
        domain_type: Domain,
        spec: &ChainSpec,
    ) -> Result<Hash256, Error> {
        // Bypass the safe getter for the randao mix: the spec requires the seed for epoch N to
        // reach into the "future" region of the ring at the genesis epochs.
        let i = epoch
            .as_u64()
            .safe_add(E::EpochsPerHistoricalVector::to_u64())?
            .safe_sub(spec.min_seed_lookahead.as_u64())?
            .safe_sub(1)?;
        let i_mod = i.safe_rem(E::EpochsPerHistoricalVector::to_u64())? as usize;
        let mix = self
            .randao_mixes
            .get(i_mod)
            .ok_or(Error::RandaoMixesOutOfBounds(i_mod))?;

        let domain_bytes = int_to_bytes4(spec.get_domain_constant(domain_type));
        let epoch_bytes = int_to_bytes8(epoch.as_u64());

        const NUM_DOMAIN_BYTES: usize = 4;
        const NUM_EPOCH_BYTES: usize = 8;
        const NUM_MIX_BYTES: usize = 32;

        let mut preimage = [0; NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES + NUM_MIX_BYTES];
        preimage[0..NUM_DOMAIN_BYTES].copy_from_slice(&domain_bytes);
        preimage[NUM_DOMAIN_BYTES..NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES]
            .copy_from_slice(&epoch_bytes);
        preimage[NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES..].copy_from_slice(mix.as_bytes());

        Ok(Hash256::from_slice(&hash(&preimage)))
    }

    /// Safely obtain a reference to the validator at `validator_index`.
    pub fn get_validator(&self, validator_index: usize) -> Result<&Validator, Error> {
        self.validators
            .get(validator_index)
            .ok_or(Error::UnknownValidator(validator_index))
    }

    /// Safely obtain a mutable reference to the validator at `validator_index`.
    pub fn get_validator_mut(&mut self, validator_index: usize) -> Result<&mut Validator, Error> {
        self.validators
            .get_mut(validator_index)
            .ok_or(Error::UnknownValidator(validator_index))
    }

    /// Return the effective balance for a validator with the given `validator_index`.
    pub fn get_effective_balance(&self, validator_index: usize) -> Result<u64, Error> {
        self.get_validator(validator_index)
            .map(|v| v.effective_balance)
    }

    /// Get the inactivity score for a single validator.
    pub fn get_inactivity_score(&self, validator_index: usize) -> Result<u64, Error> {
        self.inactivity_scores
            .get(validator_index)
            .copied()
            .ok_or(Error::InactivityScoresOutOfBounds(validator_index))
    }

    /// Get a mutable reference to the inactivity score for a single validator.
    pub fn get_inactivity_score_mut(&mut self, validator_index: usize) -> Result<&mut u64, Error> {
        self.inactivity_scores
            .get_mut(validator_index)
            .ok_or(Error::InactivityScoresOutOfBounds(validator_index))
    }

    /// Return the balance of the validator at `validator_index`.
    pub fn get_balance(&self, validator_index: usize) -> Result<u64, Error> {
        self.balances
            .get(validator_index)
            .copied()
            .ok_or(Error::BalancesOutOfBounds(validator_index))
    }

    /// Return a mutable reference to the balance of the validator at `validator_index`.
    pub fn get_balance_mut(&mut self, validator_index: usize) -> Result<&mut u64, Error> {
        self.balances
            .get_mut(validator_index)
            .ok_or(Error::BalancesOutOfBounds(validator_index))
    }

    /// Return the combined effective balance of an array of validators.
    ///
    /// The return value is floored at `EFFECTIVE_BALANCE_INCREMENT` (1 ETH on mainnet) to avoid
    /// divisions by zero.
    ///
    /// Spec v1.1.0
    pub fn get_total_balance(
        &self,
        validator_indices: &[usize],
        spec: &ChainSpec,
    ) -> Result<u64, Error> {
        let mut total = 0u64;
        for index in validator_indices {
            total = total.safe_add(self.get_effective_balance(*index)?)?;
        }
        Ok(std::cmp::max(total, spec.effective_balance_increment))
    }

    /// Return the combined effective balance of all active validators of the current epoch.
    ///
    /// Spec v1.1.0
    pub fn get_total_active_balance(&self, spec: &ChainSpec) -> Result<u64, Error> {
        let active_indices = self.get_active_validator_indices(self.current_epoch());
        self.get_total_balance(&active_indices, spec)
    }

    /// Safely obtain the index for `slashings`, given some `epoch`.
    fn get_slashings_index(&self, epoch: Epoch) -> Result<usize, Error> {
        Ok(epoch
            .as_usize()
            .safe_rem(E::EpochsPerSlashingsVector::to_usize())?)
    }

    /// Get the total slashed balances for some epoch.
    pub fn get_slashings(&self, epoch: Epoch) -> Result<u64, Error> {
        let i = self.get_slashings_index(epoch)?;
        self.slashings
            .get(i)
            .copied()
            .ok_or(Error::SlashingsOutOfBounds(i))
    }

    /// Set the total slashed balances for some epoch.
    pub fn set_slashings(&mut self, epoch: Epoch, value: u64) -> Result<(), Error> {
        let i = self.get_slashings_index(epoch)?;
        self.slashings[i] = value;
        Ok(())
    }

    /// Get the entire `slashings` vector.
    pub fn get_all_slashings(&self) -> &[u64] {
        &self.slashings
    }

    /// Return the churn limit for the current epoch (number of validators who can leave per
    /// epoch).
    ///
    /// Uses the current epoch committee cache if it exists, otherwise computes the active
    /// validator count fresh.
    pub fn get_churn_limit(&self, spec: &ChainSpec) -> Result<u64, Error> {
        let active_validator_count = match self.committee_cache(RelativeEpoch::Current) {
            Ok(cache) => cache.active_validator_count(),
            Err(_) => self.get_active_validator_indices(self.current_epoch()).len(),
        };

        Ok(std::cmp::max(
            spec.min_per_epoch_churn_limit,
            (active_validator_count as u64).safe_div(spec.churn_limit_quotient)?,
        ))
    }

    /// Return the epoch at which an activation or exit triggered in `epoch` takes effect.
    ///
    /// Spec v0.12.1
    pub fn compute_activation_exit_epoch(
        &self,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<Epoch, Error> {
        Ok(epoch + 1 + spec.max_seed_lookahead.as_u64())
    }

    /// Returns `true` if the state is in an "inactivity leak": too many epochs since
    /// finalization.
    ///
    /// Spec v1.1.0
    pub fn is_in_inactivity_leak(&self, previous_epoch: Epoch, spec: &ChainSpec) -> bool {
        (previous_epoch - self.finalized_checkpoint.epoch).as_u64()
            > spec.min_epochs_to_inactivity_penalty
    }

    /// Returns `true` if the validator is eligible for penalties and rewards at the previous
    /// epoch.
    ///
    /// Spec: `get_eligible_validator_indices`
    pub fn is_eligible_validator(&self, previous_epoch: Epoch, val: &Validator) -> bool {
        val.is_active_at(previous_epoch)
            || (val.slashed && previous_epoch + 1 < val.withdrawable_epoch)
    }

    /// Get the sync committee for the epoch which begins `EPOCHS_PER_SYNC_COMMITTEE_PERIOD`
    /// after the current sync committee period.
    ///
    /// Spec v1.1.0: `get_next_sync_committee`
    pub fn get_next_sync_committee(&self, spec: &ChainSpec) -> Result<SyncCommittee<E>, Error> {
        let sync_committee_indices = self.get_next_sync_committee_indices(spec)?;

        let pubkeys = sync_committee_indices
            .iter()
            .map(|&index| {
                self.validators
                    .get(index)
                    .map(|v| v.pubkey)
                    .ok_or(Error::UnknownValidator(index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let decompressed = pubkeys
            .iter()
            .map(|pk| pk.decompress())
            .collect::<Result<Vec<_>, _>>()?;

        let aggregate_pubkey =
            AggregatePublicKey::aggregate(&decompressed.iter().collect::<Vec<_>>())?
                .to_public_key();

        Ok(SyncCommittee {
            pubkeys: FixedVector::new(pubkeys)?,
            aggregate_pubkey: PublicKeyBytes::from(aggregate_pubkey),
        })
    }

    /// Effective-balance-weighted sampling of the validator set for the next sync committee.
    ///
    /// Spec v1.1.0: `get_next_sync_committee_indices`
    pub fn get_next_sync_committee_indices(&self, spec: &ChainSpec) -> Result<Vec<usize>, Error> {
        let epoch = self.current_epoch() + 1;

        let active_validator_indices = self.get_active_validator_indices(epoch);
        let active_validator_count = active_validator_indices.len();
        if active_validator_count == 0 {
            return Err(Error::InsufficientValidators);
        }

        let seed = self.get_seed(epoch, Domain::SyncCommittee, spec)?;

        let mut i = 0;
        let mut sync_committee_indices = Vec::with_capacity(E::SyncCommitteeSize::to_usize());
        while sync_committee_indices.len() < E::SyncCommitteeSize::to_usize() {
            let shuffled_index = compute_shuffled_index(
                i.safe_rem(active_validator_count)?,
                active_validator_count,
                seed.as_bytes(),
                spec.shuffle_round_count,
            )
            .ok_or(Error::UnableToShuffle)?;

            let candidate_index = *active_validator_indices
                .get(shuffled_index)
                .ok_or(Error::ShuffleIndexOutOfBounds(shuffled_index))?;

            let random_byte = Self::shuffling_random_byte(i, seed.as_bytes())?;

            let effective_balance = self.get_effective_balance(candidate_index)?;

            if effective_balance.safe_mul(MAX_RANDOM_BYTE)?
                >= spec
                    .max_effective_balance
                    .safe_mul(u64::from(random_byte))?
            {
                sync_committee_indices.push(candidate_index);
            }
            i.safe_add_assign(1)?;
        }
        Ok(sync_committee_indices)
    }

    /// The number of deposits which have been acknowledged by eth1 voting but not yet processed
    /// into the registry.
    pub fn get_outstanding_deposit_len(&self) -> Result<u64, Error> {
        Ok(self
            .eth1_data
            .deposit_count
            .saturating_sub(self.eth1_deposit_index))
    }

    /// Generate a historical batch from the state's block and state root rings.
    pub fn historical_batch(&self) -> HistoricalBatch<E> {
        HistoricalBatch {
            block_roots: self.block_roots.clone(),
            state_roots: self.state_roots.clone(),
        }
    }

    /// If a validator pubkey exists in the validator registry, returns `Some(i)`, otherwise
    /// returns `None`.
    ///
    /// Requires a fully up-to-date `pubkey_cache`, returns an error if this is not the case.
    pub fn get_validator_index(&self, pubkey: &PublicKeyBytes) -> Result<Option<usize>, Error> {
        if self.pubkey_cache.len() == self.validators.len() {
            Ok(self.pubkey_cache.get(pubkey))
        } else {
            Err(Error::PubkeyCacheIncomplete {
                cache_len: self.pubkey_cache.len(),
                registry_len: self.validators.len(),
            })
        }
    }

    /*
     * Caches
     */

    /// Build all the caches.
    pub fn build_all_caches(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        self.build_committee_cache(RelativeEpoch::Previous, spec)?;
        self.build_committee_cache(RelativeEpoch::Current, spec)?;
        self.build_committee_cache(RelativeEpoch::Next, spec)?;
        self.update_pubkey_cache()?;
        self.build_exit_cache(spec)?;
        Ok(())
    }

    /// Drop all caches, so that the state is as if freshly decoded.
    pub fn drop_all_caches(&mut self) {
        self.committee_caches = [
            CommitteeCache::default(),
            CommitteeCache::default(),
            CommitteeCache::default(),
        ];
        self.pubkey_cache = PubkeyCache::default();
        self.exit_cache = ExitCache::default();
    }

    /// Build an epoch cache, unless it is has already been built.
    pub fn build_committee_cache(
        &mut self,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        let i = Self::committee_cache_index(relative_epoch);
        let is_initialized = self
            .committee_caches
            .get(i)
            .ok_or(Error::CommitteeCachesOutOfBounds(i))?
            .is_initialized_at(relative_epoch.into_epoch(self.current_epoch()));

        if !is_initialized {
            self.force_build_committee_cache(relative_epoch, spec)?;
        }

        Ok(())
    }

    /// Always builds the requested committee cache, even if it is already initialized.
    pub fn force_build_committee_cache(
        &mut self,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        let epoch = relative_epoch.into_epoch(self.current_epoch());
        let i = Self::committee_cache_index(relative_epoch);

        let cache = CommitteeCache::initialized(self, epoch, spec)?;
        *self
            .committee_caches
            .get_mut(i)
            .ok_or(Error::CommitteeCachesOutOfBounds(i))? = cache;
        Ok(())
    }

    /// Advances the cache for this state into the next epoch.
    ///
    /// This should be used if the `slot` of this state is advanced beyond an epoch boundary.
    ///
    /// Note: the caches must be built before this. The `Next` cache becomes the `Current` and the
    /// `Current` cache becomes the `Previous`. The `Next` cache is left empty to be built as
    /// required.
    pub fn advance_caches(&mut self) {
        self.committee_caches.rotate_left(1);

        let next = Self::committee_cache_index(RelativeEpoch::Next);
        self.committee_caches[next] = CommitteeCache::default();
    }

    fn committee_cache_index(relative_epoch: RelativeEpoch) -> usize {
        match relative_epoch {
            RelativeEpoch::Previous => 0,
            RelativeEpoch::Current => 1,
            RelativeEpoch::Next => 2,
        }
    }

    /// Returns the cache for some `RelativeEpoch`. Returns an error if the cache has not been
    /// initialized.
    pub fn committee_cache(&self, relative_epoch: RelativeEpoch) -> Result<&CommitteeCache, Error> {
        let i = Self::committee_cache_index(relative_epoch);
        let cache = self
            .committee_caches
            .get(i)
            .ok_or(Error::CommitteeCachesOutOfBounds(i))?;

        if cache.is_initialized_at(relative_epoch.into_epoch(self.current_epoch())) {
            Ok(cache)
        } else {
            Err(Error::CommitteeCacheUninitialized(Some(relative_epoch)))
        }
    }

    /// Updates the pubkey cache, if required.
    ///
    /// Adds all `pubkeys` from the `validators` which are not already in the cache. Will
    /// never re-add a pubkey.
    pub fn update_pubkey_cache(&mut self) -> Result<(), Error> {
        // Required to borrow `self.validators` and `self.pubkey_cache` simultaneously.
        let pubkey_cache = &mut self.pubkey_cache;

        for (i, validator) in self
            .validators
            .iter()
            .enumerate()
            .skip(pubkey_cache.len())
        {
            let success = pubkey_cache.insert(validator.pubkey, i);
            if !success {
                return Err(Error::PubkeyCacheInconsistent);
            }
        }

        Ok(())
    }

    /// Build the exit cache, if it needs to be built.
    pub fn build_exit_cache(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        if self.exit_cache.check_initialized().is_err() {
            self.exit_cache = ExitCache::new(&self.validators, spec)?;
        }
        Ok(())
    }
}

/// Returns the active validator indices for the given epoch, in ascending order.
pub fn get_active_validator_indices(validators: &[Validator], epoch: Epoch) -> Vec<usize> {
    let mut active = Vec::with_capacity(validators.len());

    for (index, validator) in validators.iter().enumerate() {
        if validator.is_active_at(epoch) {
            active.push(index)
        }
    }

    active.shrink_to_fit();

    active
}
