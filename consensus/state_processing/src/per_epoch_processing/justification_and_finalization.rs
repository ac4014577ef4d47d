use super::weigh_justification_and_finalization;
use super::{Error, JustificationAndFinalizationState, ParticipationCache};
use safe_arith::SafeArith;
use types::{BeaconState, EthSpec};

/// Update the justified and finalized checkpoints for matching target attestations.
///
/// This function returns a *new* justification/finalization state rather than mutating the
/// given `state`: fork choice uses it to compute "unrealized" checkpoints without committing
/// them.
pub fn process_justification_and_finalization<E: EthSpec>(
    state: &BeaconState<E>,
    participation_cache: &ParticipationCache,
) -> Result<JustificationAndFinalizationState<E>, Error> {
    let justification_and_finalization_state = JustificationAndFinalizationState::new(state);

    if state.current_epoch() <= E::genesis_epoch() + 1 {
        return Ok(justification_and_finalization_state);
    }

    let total_active_balance = participation_cache.current_epoch_total_active_balance();
    let previous_target_balance =
        participation_cache.previous_epoch_target_attesting_balance()?;
    let current_target_balance = participation_cache.current_epoch_target_attesting_balance()?;

    weigh_justification_and_finalization(
        justification_and_finalization_state,
        total_active_balance,
        previous_target_balance,
        current_target_balance,
    )
}
