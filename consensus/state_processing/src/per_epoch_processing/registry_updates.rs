use super::Error;
use crate::common::initiate_validator_exit;
use itertools::Itertools;
use types::{BeaconState, ChainSpec, EthSpec, Validator};

/// Performs a validator registry update, if required.
///
/// Marks eligible validators, queues activations (ordered by activation-eligibility epoch with
/// the validator index as tie-breaker), applies the churn limit and ejects validators whose
/// effective balance fell below the ejection threshold.
///
/// Spec v0.12.1
pub fn process_registry_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // Process activation eligibility and ejections.
    //
    // Collect eligible and exiting validators (we need to avoid mutating the state while
    // iterating).
    let current_epoch = state.current_epoch();
    let is_ejectable = |validator: &Validator| {
        validator.is_active_at(current_epoch)
            && validator.effective_balance <= spec.ejection_balance
    };
    let indices_to_update: Vec<usize> = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.is_eligible_for_activation_queue(spec) || is_ejectable(validator)
        })
        .map(|(idx, _)| idx)
        .collect();

    for index in indices_to_update {
        if state.get_validator(index)?.is_eligible_for_activation_queue(spec) {
            state.get_validator_mut(index)?.activation_eligibility_epoch = current_epoch + 1;
        }
        if is_ejectable(state.get_validator(index)?) {
            initiate_validator_exit(state, index, spec)?;
        }
    }

    // Queue validators eligible for activation and not dequeued for activation prior to finalized
    // epoch.
    let activation_queue = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| validator.is_eligible_for_activation(state, spec))
        .sorted_by_key(|(index, validator)| (validator.activation_eligibility_epoch, *index))
        .map(|(index, _)| index)
        .collect_vec();

    // Dequeue validators for activation up to churn limit.
    let churn_limit = state.get_churn_limit(spec)? as usize;
    let delayed_activation_epoch =
        state.compute_activation_exit_epoch(current_epoch, spec)?;
    for index in activation_queue.into_iter().take(churn_limit) {
        state.get_validator_mut(index)?.activation_epoch = delayed_activation_epoch;
    }

    Ok(())
}
