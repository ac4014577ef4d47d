use super::Error;
use types::{BeaconState, EthSpec, ParticipationFlags, VariableList};

/// Rotate the participation flag vectors: the current epoch's flags become the previous
/// epoch's, and the current epoch starts empty.
pub fn process_participation_flag_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), Error> {
    state.previous_epoch_participation =
        std::mem::replace(&mut state.current_epoch_participation, VariableList::empty());

    state.current_epoch_participation = VariableList::new(vec![
        ParticipationFlags::default();
        state.validators.len()
    ])?;

    Ok(())
}
