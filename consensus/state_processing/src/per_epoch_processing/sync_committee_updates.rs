use super::Error;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

/// At the boundary of a sync committee period, shift the next sync committee into the current
/// position and derive a fresh next committee from the active validator set.
pub fn process_sync_committee_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let next_epoch = state.next_epoch()?;
    if next_epoch
        .as_u64()
        .safe_rem(spec.epochs_per_sync_committee_period.as_u64())?
        == 0
    {
        state.current_sync_committee = state.next_sync_committee.clone();
        state.next_sync_committee = state.get_next_sync_committee(spec)?;
    }
    Ok(())
}
