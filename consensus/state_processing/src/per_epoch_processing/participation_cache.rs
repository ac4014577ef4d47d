//! Provides the `ParticipationCache`, a custom cache which attempts to reduce CPU and memory
//! usage by:
//!
//! - Caching a map of `validator_index -> participation_flags` for all active validators in the
//!   previous and current epochs.
//! - Caching the total balances of:
//!   - All active validators.
//!   - All active validators matching each of the three "timely" flags.
//! - Caching the "eligible" validators.
//!
//! Additionally, this cache is used to compute unrealized justification in fork choice, so its
//! construction must not mutate the state.

use crate::common::{get_base_reward, BaseRewardPerIncrement};
use safe_arith::{ArithError, SafeArith};
use types::consts::altair::{
    NUM_FLAG_INDICES, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
};
use types::{
    BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec, ParticipationFlags, Unsigned,
};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    InvalidFlagIndex(usize),
    MissingValidator(usize),
    BeaconState(BeaconStateError),
    Arith(ArithError),
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Self {
        Self::BeaconState(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Self::Arith(e)
    }
}

impl From<Error> for super::EpochProcessingError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidFlagIndex(i) => Self::InvalidFlagIndex(i),
            Error::MissingValidator(i) => Self::MissingValidator(i),
            Error::BeaconState(e) => Self::BeaconStateError(e),
            Error::Arith(e) => Self::ArithError(e),
        }
    }
}

/// A balance which will never be below the specified `minimum`.
///
/// This is an effort to ensure the `EFFECTIVE_BALANCE_INCREMENT` minimum is always respected.
#[derive(PartialEq, Debug, Clone, Copy)]
struct Balance {
    raw: u64,
    minimum: u64,
}

impl Balance {
    /// Initialize the balance to `0`, or the given `minimum`.
    pub fn zero(minimum: u64) -> Self {
        Self { raw: 0, minimum }
    }

    /// Returns the balance with respect to the initialization `minimum`.
    pub fn get(&self) -> u64 {
        std::cmp::max(self.raw, self.minimum)
    }

    /// Add-assign to the balance.
    pub fn safe_add_assign(&mut self, other: u64) -> Result<(), ArithError> {
        self.raw.safe_add_assign(other)
    }
}

/// Caches the participation values for one epoch (either the previous or current).
#[derive(PartialEq, Debug, Clone)]
struct SingleEpochParticipationCache {
    /// Stores the sum of the balances for all validators in `self.unslashed_participating_indices`
    /// for all flags in `NUM_FLAG_INDICES`.
    ///
    /// A flag balance is only incremented if a validator is in that flag set.
    total_flag_balances: [Balance; NUM_FLAG_INDICES],
    /// Stores the sum of all balances of all validators in `self.unslashed_participating_indices`
    /// (regardless of which flags are set).
    total_active_balance: Balance,
}

impl SingleEpochParticipationCache {
    fn new(spec: &ChainSpec) -> Self {
        let zero_balance = Balance::zero(spec.effective_balance_increment);

        Self {
            total_flag_balances: [zero_balance; NUM_FLAG_INDICES],
            total_active_balance: zero_balance,
        }
    }

    /// Returns the total balance of attesters who have `flag_index` set.
    fn total_flag_balance(&self, flag_index: usize) -> Result<u64, Error> {
        self.total_flag_balances
            .get(flag_index)
            .map(Balance::get)
            .ok_or(Error::InvalidFlagIndex(flag_index))
    }

    /// Process an **active** validator, reading from the `epoch_participation` flags with
    /// respect to the epoch this cache covers.
    fn process_active_validator(
        &mut self,
        effective_balance: u64,
        is_slashed: bool,
        epoch_participation: ParticipationFlags,
    ) -> Result<(), Error> {
        // All active validators increase the total active balance.
        self.total_active_balance.safe_add_assign(effective_balance)?;

        // Only unslashed validators may proceed.
        if is_slashed {
            return Ok(());
        }

        // Iterate through all the flags and increment the total flag balances for whichever flags
        // are set for the validator.
        for (flag, balance) in self.total_flag_balances.iter_mut().enumerate() {
            if epoch_participation
                .has_flag(flag)
                .map_err(|_| Error::InvalidFlagIndex(flag))?
            {
                balance.safe_add_assign(effective_balance)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct ValidatorInfo {
    pub effective_balance: u64,
    pub base_reward: u64,
    pub is_eligible: bool,
    pub is_slashed: bool,
    pub is_active_current_epoch: bool,
    pub is_active_previous_epoch: bool,
    pub previous_epoch_participation: ParticipationFlags,
}

impl ValidatorInfo {
    #[inline]
    pub fn is_unslashed_participating_index(&self, flag_index: usize) -> Result<bool, Error> {
        Ok(self.is_active_previous_epoch
            && !self.is_slashed
            && self
                .previous_epoch_participation
                .has_flag(flag_index)
                .map_err(|_| Error::InvalidFlagIndex(flag_index))?)
    }
}

/// Maintains a cache to be used during epoch processing (and unrealized-justification
/// computation in fork choice).
#[derive(PartialEq, Debug, Clone)]
pub struct ParticipationCache {
    current_epoch: Epoch,
    /// Caches information about active validators pertaining to `self.current_epoch`.
    current_epoch_participation: SingleEpochParticipationCache,
    previous_epoch: Epoch,
    /// Caches information about active validators pertaining to `self.previous_epoch`.
    previous_epoch_participation: SingleEpochParticipationCache,
    /// Caches validator information relevant to `process_epoch`.
    validators: Vec<Option<ValidatorInfo>>,
    /// Caches the result of the `get_eligible_validator_indices` function.
    eligible_indices: Vec<usize>,
    /// Caches the indices and effective balances of validators that need to be processed by
    /// `process_slashings`.
    process_slashings_indices: Vec<(usize, u64)>,
}

impl ParticipationCache {
    /// Instantiate `Self`, returning a fully initialized cache.
    ///
    /// Does not mutate `state`.
    pub fn new<E: EthSpec>(state: &BeaconState<E>, spec: &ChainSpec) -> Result<Self, Error> {
        let current_epoch = state.current_epoch();
        let previous_epoch = state.previous_epoch();

        let mut current_epoch_participation = SingleEpochParticipationCache::new(spec);
        let mut previous_epoch_participation = SingleEpochParticipationCache::new(spec);

        let mut validators = vec![None; state.validators.len()];
        let mut eligible_indices = Vec::with_capacity(state.validators.len());
        let mut process_slashings_indices = vec![];

        // We need to compute the total active balance before computing the base rewards, and the
        // total active balance requires a full pass over the validators.
        let current_epoch_total_active_balance = state
            .get_total_balance(&state.get_active_validator_indices(current_epoch), spec)
            .map_err(Error::BeaconState)?;
        let base_reward_per_increment =
            BaseRewardPerIncrement::new(current_epoch_total_active_balance, spec)?;

        for (val_index, val) in state.validators.iter().enumerate() {
            let is_active_current_epoch = val.is_active_at(current_epoch);
            let is_active_previous_epoch = val.is_active_at(previous_epoch);
            let is_eligible = state.is_eligible_validator(previous_epoch, val);

            let curr_epoch_flags = state
                .current_epoch_participation
                .get(val_index)
                .copied()
                .ok_or(Error::MissingValidator(val_index))?;
            let prev_epoch_flags = state
                .previous_epoch_participation
                .get(val_index)
                .copied()
                .ok_or(Error::MissingValidator(val_index))?;

            if is_active_current_epoch {
                current_epoch_participation.process_active_validator(
                    val.effective_balance,
                    val.slashed,
                    curr_epoch_flags,
                )?;
            }

            if is_active_previous_epoch {
                previous_epoch_participation.process_active_validator(
                    val.effective_balance,
                    val.slashed,
                    prev_epoch_flags,
                )?;
            }

            if val.slashed
                && current_epoch + E::EpochsPerSlashingsVector::to_u64().safe_div(2)?
                    == val.withdrawable_epoch
            {
                process_slashings_indices.push((val_index, val.effective_balance));
            }

            // Note: a validator might still be "eligible" whilst returning `false` to
            // `Validator::is_active_at`.
            if is_eligible {
                eligible_indices.push(val_index);
            }

            if is_eligible || is_active_current_epoch {
                let base_reward =
                    get_base_reward(val.effective_balance, base_reward_per_increment, spec)?;
                validators[val_index] = Some(ValidatorInfo {
                    effective_balance: val.effective_balance,
                    base_reward,
                    is_eligible,
                    is_slashed: val.slashed,
                    is_active_current_epoch,
                    is_active_previous_epoch,
                    previous_epoch_participation: prev_epoch_flags,
                });
            }
        }

        Ok(Self {
            current_epoch,
            current_epoch_participation,
            previous_epoch,
            previous_epoch_participation,
            validators,
            eligible_indices,
            process_slashings_indices,
        })
    }

    /// Equivalent to the specification `get_eligible_validator_indices` function.
    pub fn eligible_validator_indices(&self) -> &[usize] {
        &self.eligible_indices
    }

    /// The indices (and effective balances) of validators which must be penalized in
    /// `process_slashings` this epoch.
    pub fn process_slashings_indices(&self) -> &[(usize, u64)] {
        &self.process_slashings_indices
    }

    /*
     * Balances
     */

    pub fn current_epoch_total_active_balance(&self) -> u64 {
        self.current_epoch_participation.total_active_balance.get()
    }

    pub fn current_epoch_target_attesting_balance(&self) -> Result<u64, Error> {
        self.current_epoch_participation
            .total_flag_balance(TIMELY_TARGET_FLAG_INDEX)
    }

    pub fn previous_epoch_total_active_balance(&self) -> u64 {
        self.previous_epoch_participation.total_active_balance.get()
    }

    pub fn previous_epoch_target_attesting_balance(&self) -> Result<u64, Error> {
        self.previous_epoch_flag_attesting_balance(TIMELY_TARGET_FLAG_INDEX)
    }

    pub fn previous_epoch_source_attesting_balance(&self) -> Result<u64, Error> {
        self.previous_epoch_flag_attesting_balance(TIMELY_SOURCE_FLAG_INDEX)
    }

    pub fn previous_epoch_head_attesting_balance(&self) -> Result<u64, Error> {
        self.previous_epoch_flag_attesting_balance(TIMELY_HEAD_FLAG_INDEX)
    }

    pub fn previous_epoch_flag_attesting_balance(&self, flag_index: usize) -> Result<u64, Error> {
        self.previous_epoch_participation
            .total_flag_balance(flag_index)
    }

    /*
     * Validators
     */

    pub fn get_validator(&self, val_index: usize) -> Result<&ValidatorInfo, Error> {
        self.validators
            .get(val_index)
            .ok_or(Error::MissingValidator(val_index))?
            .as_ref()
            .ok_or(Error::MissingValidator(val_index))
    }

    /// Always returns false for a slashed validator.
    pub fn is_active_unslashed_in_previous_epoch(&self, val_index: usize) -> bool {
        self.validators
            .get(val_index)
            .and_then(Option::as_ref)
            .map_or(false, |validator| {
                validator.is_active_previous_epoch && !validator.is_slashed
            })
    }
}
