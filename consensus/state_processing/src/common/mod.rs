mod base_reward;
mod deposit_data_tree;
mod get_attestation_participation;
mod get_attesting_indices;
mod initiate_validator_exit;
mod slash_validator;

pub use base_reward::{get_base_reward, get_base_reward_per_increment, BaseRewardPerIncrement};
pub use deposit_data_tree::DepositDataTree;
pub use get_attestation_participation::get_attestation_participation_flag_indices;
pub use get_attesting_indices::{get_attesting_indices, get_indexed_attestation};
pub use initiate_validator_exit::initiate_validator_exit;
pub use slash_validator::slash_validator;

use safe_arith::{ArithError, SafeArith};
use types::{BeaconState, BeaconStateError, EthSpec};

/// Increase the balance of a validator, erroring upon overflow, as per the spec.
pub fn increase_balance<E: EthSpec>(
    state: &mut BeaconState<E>,
    index: usize,
    delta: u64,
) -> Result<(), BeaconStateError> {
    increase_balance_directly(state.get_balance_mut(index)?, delta)
}

/// Decrease the balance of a validator, saturating upon overflow, as per the spec.
pub fn decrease_balance<E: EthSpec>(
    state: &mut BeaconState<E>,
    index: usize,
    delta: u64,
) -> Result<(), BeaconStateError> {
    decrease_balance_directly(state.get_balance_mut(index)?, delta)
}

/// Increase the balance of a validator, erroring upon overflow, as per the spec.
pub fn increase_balance_directly(balance: &mut u64, delta: u64) -> Result<(), BeaconStateError> {
    balance.safe_add_assign(delta)?;
    Ok(())
}

/// Decrease the balance of a validator, saturating upon overflow, as per the spec.
pub fn decrease_balance_directly(balance: &mut u64, delta: u64) -> Result<(), BeaconStateError> {
    *balance = balance.saturating_sub(delta);
    Ok(())
}

/// Compute the timestamp at `slot`, from the state's genesis time.
///
/// Spec: `compute_timestamp_at_slot`
pub fn compute_timestamp_at_slot<E: EthSpec>(
    state: &BeaconState<E>,
    spec: &types::ChainSpec,
) -> Result<u64, ArithError> {
    let slots_since_genesis = state.slot.as_u64().safe_sub(spec.genesis_slot.as_u64())?;
    slots_since_genesis
        .safe_mul(spec.seconds_per_slot)
        .and_then(|since_genesis| state.genesis_time.safe_add(since_genesis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_decrement_saturates_at_zero() {
        let mut balance = 5;
        decrease_balance_directly(&mut balance, 10).unwrap();
        assert_eq!(balance, 0);

        let mut balance = 0;
        decrease_balance_directly(&mut balance, 1).unwrap();
        assert_eq!(balance, 0);
    }

    #[test]
    fn balance_increment_errors_on_overflow() {
        let mut balance = u64::max_value();
        assert!(increase_balance_directly(&mut balance, 1).is_err());
    }
}
