use super::Error;
use safe_arith::SafeArith;
use types::{BeaconState, EthSpec, Unsigned, VariableList};

pub fn process_eth1_data_reset<E: EthSpec>(state: &mut BeaconState<E>) -> Result<(), Error> {
    if state
        .slot
        .as_u64()
        .safe_add(1)?
        .safe_rem(E::SlotsPerEth1VotingPeriod::to_u64())?
        == 0
    {
        state.eth1_data_votes = VariableList::empty();
    }
    Ok(())
}

pub fn process_slashings_reset<E: EthSpec>(state: &mut BeaconState<E>) -> Result<(), Error> {
    let next_epoch = state.next_epoch()?;
    state.set_slashings(next_epoch, 0)?;
    Ok(())
}

pub fn process_randao_mixes_reset<E: EthSpec>(state: &mut BeaconState<E>) -> Result<(), Error> {
    let current_epoch = state.current_epoch();
    let next_epoch = state.next_epoch()?;
    state.set_randao_mix(next_epoch, *state.get_randao_mix(current_epoch)?)?;
    Ok(())
}
