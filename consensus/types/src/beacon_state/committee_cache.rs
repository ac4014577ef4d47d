#![allow(clippy::integer_arithmetic)]

use crate::beacon_state::{get_active_validator_indices, Error};
use crate::{BeaconCommittee, BeaconState, ChainSpec, CommitteeIndex, Domain, Epoch, EthSpec, Slot};
use serde_derive::{Deserialize, Serialize};
use swap_or_not_shuffle::shuffle_list;

/// Computes and stores the shuffling for an epoch. Provides various getters to allow callers to
/// read the committees for the given epoch.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct CommitteeCache {
    initialized_epoch: Option<Epoch>,
    shuffling: Vec<usize>,
    committees_per_slot: u64,
    slots_per_epoch: u64,
}

impl CommitteeCache {
    /// Return a new, fully initialized cache.
    ///
    /// Spec v0.12.1
    pub fn initialized<E: EthSpec>(
        state: &BeaconState<E>,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<CommitteeCache, Error> {
        // The seed for `epoch` reaches `MIN_SEED_LOOKAHEAD + 1` epochs back through the randao
        // ring; epochs further in the future than `current_epoch + 1` do not have a stable seed.
        if epoch > state.current_epoch().saturating_add(1u64) {
            return Err(Error::EpochOutOfBounds);
        }

        let active_validator_indices = get_active_validator_indices(&state.validators, epoch);

        if active_validator_indices.is_empty() {
            return Err(Error::InsufficientValidators);
        }

        let committees_per_slot =
            E::get_committee_count_per_slot(active_validator_indices.len(), spec)? as u64;

        let seed = state.get_seed(epoch, Domain::BeaconAttester, spec)?;

        let shuffling = shuffle_list(
            active_validator_indices,
            spec.shuffle_round_count,
            seed.as_bytes(),
            false,
        )
        .ok_or(Error::UnableToShuffle)?;

        Ok(CommitteeCache {
            initialized_epoch: Some(epoch),
            shuffling,
            committees_per_slot,
            slots_per_epoch: E::slots_per_epoch(),
        })
    }

    /// Returns `true` if the cache has been initialized at the supplied `epoch`.
    ///
    /// An non-initialized cache does not provide any useful information.
    pub fn is_initialized_at(&self, epoch: Epoch) -> bool {
        Some(epoch) == self.initialized_epoch
    }

    /// Returns the shuffled list of active validator indices for the initialized epoch.
    ///
    /// Always returns `&[]` for a non-initialized epoch.
    pub fn shuffling(&self) -> &[usize] {
        &self.shuffling
    }

    /// Returns the epoch this cache was initialized at, if any.
    pub fn initialized_epoch(&self) -> Option<Epoch> {
        self.initialized_epoch
    }

    /// Returns the number of active validators in the initialized epoch.
    ///
    /// Always returns `usize::default()` for a non-initialized epoch.
    pub fn active_validator_count(&self) -> usize {
        self.shuffling.len()
    }

    /// Returns the total number of committees in the initialized epoch.
    ///
    /// Always returns `usize::default()` for a non-initialized epoch.
    pub fn epoch_committee_count(&self) -> usize {
        (self.committees_per_slot * self.slots_per_epoch) as usize
    }

    /// Returns the number of committees per slot for this cache's epoch.
    pub fn committees_per_slot(&self) -> u64 {
        self.committees_per_slot
    }

    /// Get the Beacon committee for the given `slot` and `index`.
    ///
    /// Return `None` if the cache is uninitialized, or the `slot` or `index` is out of range.
    pub fn get_beacon_committee(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Option<BeaconCommittee> {
        if self.initialized_epoch.is_none()
            || !self.is_initialized_at(slot.epoch(self.slots_per_epoch))
            || index >= self.committees_per_slot
        {
            return None;
        }

        let committee_index =
            (slot.as_u64() % self.slots_per_epoch) * self.committees_per_slot + index;
        let committee = self.compute_committee(committee_index as usize)?;

        Some(BeaconCommittee {
            slot,
            index,
            committee,
        })
    }

    /// Get all the Beacon committees at a given `slot`.
    pub fn get_beacon_committees_at_slot(&self, slot: Slot) -> Result<Vec<BeaconCommittee>, Error> {
        if self.initialized_epoch.is_none() {
            return Err(Error::CommitteeCacheUninitialized(None));
        }

        (0..self.committees_per_slot)
            .map(|index| {
                self.get_beacon_committee(slot, index)
                    .ok_or(Error::NoCommittee { slot, index })
            })
            .collect()
    }

    /// Returns a slice of `self.shuffling` that represents the `index`'th committee in the
    /// epoch.
    ///
    /// Spec: `compute_committee`
    fn compute_committee(&self, index: usize) -> Option<&[usize]> {
        let count = self.epoch_committee_count();
        if count == 0 {
            return None;
        }

        // Note: `count != 0` is enforced above.
        let start = (self.shuffling.len() * index) / count;
        let end = (self.shuffling.len() * (index + 1)) / count;

        self.shuffling.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generate_deterministic_keypairs;
    use crate::MinimalEthSpec;

    fn new_state<E: EthSpec>(validator_count: usize) -> BeaconState<E> {
        let spec = &E::default_spec();
        crate::test_utils::build_initial_state::<E>(
            &generate_deterministic_keypairs(validator_count),
            0,
            spec,
        )
    }

    #[test]
    fn every_validator_is_assigned_exactly_once() {
        let validator_count = 32;
        let state = new_state::<MinimalEthSpec>(validator_count);
        let spec = &MinimalEthSpec::default_spec();

        let cache = CommitteeCache::initialized(&state, state.current_epoch(), spec).unwrap();

        let mut seen = vec![0_usize; validator_count];
        for slot in state.current_epoch().slot_iter(MinimalEthSpec::slots_per_epoch()) {
            for committee in cache.get_beacon_committees_at_slot(slot).unwrap() {
                for &validator_index in committee.committee {
                    seen[validator_index] += 1;
                }
            }
        }

        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn uninitialized_cache_returns_nothing() {
        let cache = CommitteeCache::default();

        assert!(!cache.is_initialized_at(Epoch::new(0)));
        assert_eq!(cache.active_validator_count(), 0);
        assert_eq!(cache.epoch_committee_count(), 0);
        assert!(cache.get_beacon_committee(Slot::new(0), 0).is_none());
    }

    #[test]
    fn cache_rejects_distant_future_epoch() {
        let state = new_state::<MinimalEthSpec>(16);
        let spec = &MinimalEthSpec::default_spec();

        let distant_epoch = state.current_epoch() + 10u64;
        assert_eq!(
            CommitteeCache::initialized(&state, distant_epoch, spec),
            Err(Error::EpochOutOfBounds)
        );
    }
}
