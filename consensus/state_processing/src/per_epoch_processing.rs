pub mod effective_balance_updates;
pub mod errors;
pub mod historical_roots_update;
pub mod inactivity_updates;
pub mod justification_and_finalization;
pub mod justification_and_finalization_state;
pub mod participation_cache;
pub mod participation_flag_updates;
pub mod registry_updates;
pub mod resets;
pub mod rewards_and_penalties;
pub mod slashings;
pub mod sync_committee_updates;
pub mod weigh_justification_and_finalization;

#[cfg(test)]
mod tests;

pub use self::effective_balance_updates::process_effective_balance_updates;
pub use self::errors::EpochProcessingError as Error;
pub use self::errors::EpochProcessingError;
pub use self::historical_roots_update::process_historical_roots_update;
pub use self::inactivity_updates::process_inactivity_updates;
pub use self::justification_and_finalization::process_justification_and_finalization;
pub use self::justification_and_finalization_state::JustificationAndFinalizationState;
pub use self::participation_cache::ParticipationCache;
pub use self::participation_flag_updates::process_participation_flag_updates;
pub use self::registry_updates::process_registry_updates;
pub use self::resets::{process_eth1_data_reset, process_randao_mixes_reset, process_slashings_reset};
pub use self::rewards_and_penalties::process_rewards_and_penalties;
pub use self::slashings::process_slashings;
pub use self::sync_committee_updates::process_sync_committee_updates;
pub use self::weigh_justification_and_finalization::weigh_justification_and_finalization;

use types::{BeaconState, ChainSpec, EthSpec, RelativeEpoch};

/// A `Delta` defines the rewards and penalties attributable to a single validator within a single
/// epoch transition.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Delta {
    pub rewards: u64,
    pub penalties: u64,
}

impl Delta {
    /// Reward with `reward`.
    pub fn reward(&mut self, reward: u64) -> Result<(), Error> {
        self.rewards = self.rewards.checked_add(reward).ok_or(Error::DeltaOverflow)?;
        Ok(())
    }

    /// Penalize with `penalty`.
    pub fn penalize(&mut self, penalty: u64) -> Result<(), Error> {
        self.penalties = self
            .penalties
            .checked_add(penalty)
            .ok_or(Error::DeltaOverflow)?;
        Ok(())
    }

    /// Combine two deltas.
    pub fn combine(&mut self, other: Delta) -> Result<(), Error> {
        self.reward(other.rewards)?;
        self.penalize(other.penalties)
    }
}

/// Performs per-epoch processing, mutating the given `BeaconState`.
///
/// The sub-steps run in the order mandated by the specification; re-ordering them changes the
/// post-state root.
pub fn process_epoch<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // Ensure the committee caches are built.
    state.build_committee_cache(RelativeEpoch::Previous, spec)?;
    state.build_committee_cache(RelativeEpoch::Current, spec)?;
    state.build_committee_cache(RelativeEpoch::Next, spec)?;

    // Pre-compute participating indices and total balances.
    let participation_cache = ParticipationCache::new(state, spec)?;

    // Justification and finalization.
    let justification_and_finalization_state =
        process_justification_and_finalization(state, &participation_cache)?;
    justification_and_finalization_state.apply_changes_to_state(state);

    process_inactivity_updates(state, &participation_cache, spec)?;

    // Rewards and Penalties.
    process_rewards_and_penalties(state, &participation_cache, spec)?;

    // Registry Updates.
    process_registry_updates(state, spec)?;

    // Slashings.
    process_slashings(
        state,
        participation_cache.current_epoch_total_active_balance(),
        spec,
    )?;

    // Reset eth1 data votes.
    process_eth1_data_reset(state)?;

    // Update effective balances with hysteresis (lag).
    process_effective_balance_updates(state, spec)?;

    // Reset slashings
    process_slashings_reset(state)?;

    // Set randao mix
    process_randao_mixes_reset(state)?;

    // Set historical root accumulator
    process_historical_roots_update(state)?;

    // Rotate current/previous epoch participation
    process_participation_flag_updates(state)?;

    process_sync_committee_updates(state, spec)?;

    // Rotate the epoch caches to suit the epoch transition.
    state.advance_caches();

    Ok(())
}
