use integer_sqrt::IntegerSquareRoot;
use safe_arith::{ArithError, SafeArith};
use types::ChainSpec;

/// The base reward per effective-balance increment, shared by all validators in an epoch.
///
/// This value is expensive to compute (it involves an integer square root) and is valid for an
/// entire epoch, so callers are encouraged to compute it once and pass it around.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BaseRewardPerIncrement(u64);

impl BaseRewardPerIncrement {
    pub fn new(total_active_balance: u64, spec: &ChainSpec) -> Result<Self, ArithError> {
        get_base_reward_per_increment(total_active_balance, spec).map(Self)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Returns the base reward for some validator, given its effective balance.
///
/// Spec v1.1.0
pub fn get_base_reward(
    effective_balance: u64,
    base_reward_per_increment: BaseRewardPerIncrement,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    effective_balance
        .safe_div(spec.effective_balance_increment)?
        .safe_mul(base_reward_per_increment.as_u64())
}

/// Returns the base reward per effective-balance increment.
///
/// Spec v1.1.0
pub fn get_base_reward_per_increment(
    total_active_balance: u64,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    spec.effective_balance_increment
        .safe_mul(spec.base_reward_factor)?
        .safe_div(total_active_balance.integer_sqrt())
}
