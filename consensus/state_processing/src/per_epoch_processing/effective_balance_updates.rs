use super::Error;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

/// Update the effective balances of all validators with hysteresis (lag).
///
/// A validator's effective balance only moves when the actual balance drifts outside the
/// hysteresis window, and always snaps to a multiple of `EFFECTIVE_BALANCE_INCREMENT` capped at
/// `MAX_EFFECTIVE_BALANCE`.
pub fn process_effective_balance_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let hysteresis_increment = spec
        .effective_balance_increment
        .safe_div(spec.hysteresis_quotient)?;
    let downward_threshold =
        hysteresis_increment.safe_mul(spec.hysteresis_downward_multiplier)?;
    let upward_threshold = hysteresis_increment.safe_mul(spec.hysteresis_upward_multiplier)?;

    // Both the validator registry and the balances list are needed simultaneously; split the
    // borrow via the raw fields.
    let (validators, balances) = (&mut state.validators, &state.balances);
    for (index, validator) in validators.iter_mut().enumerate() {
        let balance = balances
            .get(index)
            .copied()
            .ok_or(types::BeaconStateError::BalancesOutOfBounds(index))?;

        if balance.safe_add(downward_threshold)? < validator.effective_balance
            || validator.effective_balance.safe_add(upward_threshold)? < balance
        {
            validator.effective_balance = std::cmp::min(
                balance.safe_sub(balance.safe_rem(spec.effective_balance_increment)?)?,
                spec.max_effective_balance,
            );
        }
    }
    Ok(())
}
