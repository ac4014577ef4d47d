use super::{Error, ParticipationCache};
use safe_arith::SafeArith;
use types::consts::altair::TIMELY_TARGET_FLAG_INDEX;
use types::{BeaconState, ChainSpec, EthSpec};

/// Update the inactivity scores of all eligible validators.
///
/// Validators which attested to the correct target decay toward zero; the rest are penalised
/// with an increment. Outside an inactivity leak, every score additionally recovers by the
/// recovery rate.
pub fn process_inactivity_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // Inactivity scores start updating in the epoch after the genesis epoch.
    if state.current_epoch() == E::genesis_epoch() {
        return Ok(());
    }

    let previous_epoch = state.previous_epoch();
    let is_in_inactivity_leak = state.is_in_inactivity_leak(previous_epoch, spec);

    for &index in participation_cache.eligible_validator_indices() {
        let is_timely_target_attester = participation_cache
            .get_validator(index)?
            .is_unslashed_participating_index(TIMELY_TARGET_FLAG_INDEX)?;

        let inactivity_score = state.get_inactivity_score_mut(index)?;

        // Increase the inactivity score of inactive validators
        if is_timely_target_attester {
            *inactivity_score = inactivity_score.saturating_sub(1);
        } else {
            inactivity_score.safe_add_assign(spec.inactivity_score_bias)?;
        }

        // Decrease the inactivity score of all eligible validators during a leak-free epoch
        if !is_in_inactivity_leak {
            *inactivity_score =
                inactivity_score.saturating_sub(spec.inactivity_score_recovery_rate);
        }
    }

    Ok(())
}
