use super::Error;
use safe_arith::SafeArith;
use tree_hash::TreeHash;
use types::{EthSpec, Unsigned};

use types::BeaconState;

pub fn process_historical_roots_update<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), Error> {
    let next_epoch = state.next_epoch()?;
    if next_epoch
        .as_u64()
        .safe_rem(E::SlotsPerHistoricalRoot::to_u64().safe_div(E::slots_per_epoch())?)?
        == 0
    {
        let historical_batch = state.historical_batch();
        state
            .historical_roots
            .push(historical_batch.tree_hash_root())?;
    }
    Ok(())
}
