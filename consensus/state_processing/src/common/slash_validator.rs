use crate::common::{decrease_balance, increase_balance, initiate_validator_exit};
use crate::ConsensusContext;
use safe_arith::SafeArith;
use std::cmp;
use types::consts::altair::{PROPOSER_WEIGHT, WEIGHT_DENOMINATOR};
use types::{BeaconState, BeaconStateError as Error, ChainSpec, EthSpec, Unsigned};

/// Slash the validator with index `slashed_index`.
///
/// Spec v1.1.0
pub fn slash_validator<E: EthSpec>(
    state: &mut BeaconState<E>,
    slashed_index: usize,
    opt_whistleblower_index: Option<usize>,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let epoch = state.current_epoch();

    initiate_validator_exit(state, slashed_index, spec)?;

    let validator = state.get_validator_mut(slashed_index)?;
    validator.slashed = true;
    validator.withdrawable_epoch = cmp::max(
        validator.withdrawable_epoch,
        epoch + E::EpochsPerSlashingsVector::to_u64(),
    );
    let validator_effective_balance = validator.effective_balance;

    state.set_slashings(
        epoch,
        state
            .get_slashings(epoch)?
            .safe_add(validator_effective_balance)?,
    )?;

    decrease_balance(
        state,
        slashed_index,
        validator_effective_balance.safe_div(spec.min_slashing_penalty_quotient)?,
    )?;

    // Apply proposer and whistleblower rewards
    let proposer_index = ctxt
        .get_proposer_index(state, spec)
        .map_err(|_| Error::UnableToDetermineProducer)? as usize;
    let whistleblower_index = opt_whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward =
        validator_effective_balance.safe_div(spec.whistleblower_reward_quotient)?;
    let proposer_reward = whistleblower_reward
        .safe_mul(PROPOSER_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR)?;

    increase_balance(state, proposer_index, proposer_reward)?;
    increase_balance(
        state,
        whistleblower_index,
        whistleblower_reward.safe_sub(proposer_reward)?,
    )?;

    Ok(())
}
