use super::Error;
use crate::common::decrease_balance;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec, Unsigned};

/// Process slashings.
///
/// For each validator whose withdrawable epoch is at the mid-point of the slashings ring, apply
/// the proportional penalty derived from the ring sum, capped by the multiplier.
pub fn process_slashings<E: EthSpec>(
    state: &mut BeaconState<E>,
    total_balance: u64,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let sum_slashings = state
        .get_all_slashings()
        .iter()
        .try_fold(0_u64, |sum, slashing| sum.safe_add(*slashing))?;

    let adjusted_total_slashing_balance = std::cmp::min(
        sum_slashings.safe_mul(spec.proportional_slashing_multiplier)?,
        total_balance,
    );

    let target_withdrawable_epoch =
        epoch + E::EpochsPerSlashingsVector::to_u64().safe_div(2)?;
    let indices: Vec<(usize, u64)> = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.slashed && target_withdrawable_epoch == validator.withdrawable_epoch
        })
        .map(|(index, validator)| (index, validator.effective_balance))
        .collect();

    for (index, validator_effective_balance) in indices {
        let increment = spec.effective_balance_increment;
        let penalty_numerator = validator_effective_balance
            .safe_div(increment)?
            .safe_mul(adjusted_total_slashing_balance)?;
        let penalty = penalty_numerator
            .safe_div(total_balance)?
            .safe_mul(increment)?;

        decrease_balance(state, index, penalty)?;
    }

    Ok(())
}
