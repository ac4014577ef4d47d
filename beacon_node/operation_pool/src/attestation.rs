use crate::max_cover::MaxCover;
use state_processing::common::get_attesting_indices;
use std::collections::HashSet;
use types::consts::altair::TIMELY_TARGET_FLAG_INDEX;
use types::{Attestation, BeaconState, EthSpec};

/// An attestation scored by the number of "fresh" validators it introduces: attesters whose
/// timely-target participation flag is not yet set in the state.
#[derive(Debug, Clone)]
pub struct AttMaxCover<'a, E: EthSpec> {
    /// Underlying attestation.
    pub att: &'a Attestation<E>,
    /// The validators whose participation would be updated by including this attestation.
    pub fresh_validators: HashSet<u64>,
}

impl<'a, E: EthSpec> AttMaxCover<'a, E> {
    pub fn new(att: &'a Attestation<E>, state: &BeaconState<E>) -> Option<Self> {
        let committee = state
            .get_beacon_committee(att.data.slot, att.data.index)
            .ok()?;
        let attesting_indices =
            get_attesting_indices::<E>(committee.committee, &att.aggregation_bits).ok()?;

        let epoch_participation = if att.data.target.epoch == state.current_epoch() {
            &state.current_epoch_participation
        } else {
            &state.previous_epoch_participation
        };

        let fresh_validators = attesting_indices
            .into_iter()
            .filter(|&index| {
                epoch_participation
                    .get(index as usize)
                    .map_or(false, |participation| {
                        !participation
                            .has_flag(TIMELY_TARGET_FLAG_INDEX)
                            .unwrap_or(true)
                    })
            })
            .collect();

        Some(Self {
            att,
            fresh_validators,
        })
    }
}

impl<'a, E: EthSpec> MaxCover for AttMaxCover<'a, E> {
    type Object = Attestation<E>;
    type Set = HashSet<u64>;

    fn object(&self) -> Attestation<E> {
        self.att.clone()
    }

    fn covering_set(&self) -> &HashSet<u64> {
        &self.fresh_validators
    }

    /// Sneaky: we keep all the attestations in the max-cover `obj` rather than just the
    /// attestation data. If two attestations have the same attestation data and aggregation
    /// bits, then they are equal in their covering sets.
    fn update_covering_set(&mut self, best_att: &Attestation<E>, covered_validators: &HashSet<u64>) {
        if self.att.data.slot == best_att.data.slot && self.att.data.index == best_att.data.index {
            self.fresh_validators
                .retain(|validator| !covered_validators.contains(validator))
        }
    }

    fn score(&self) -> usize {
        self.fresh_validators.len()
    }
}
