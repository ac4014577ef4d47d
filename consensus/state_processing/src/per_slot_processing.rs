use crate::{per_epoch_processing::EpochProcessingError, process_epoch};
use safe_arith::{ArithError, SafeArith};
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, Hash256};

#[derive(Debug, PartialEq)]
pub enum Error {
    BeaconStateError(BeaconStateError),
    EpochProcessingError(EpochProcessingError),
    ArithError(ArithError),
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<EpochProcessingError> for Error {
    fn from(e: EpochProcessingError) -> Error {
        Error::EpochProcessingError(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Self::ArithError(e)
    }
}

/// Advances a state forward by one slot, performing per-epoch processing if required.
///
/// If the root of the supplied `state` is known, then it can be passed as `state_root`. If
/// `state_root` is `None`, the root of `state` will be computed with a full tree hash. Providing
/// the `state_root` makes this function several orders of magnitude faster.
pub fn per_slot_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root: Option<Hash256>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    cache_state(state, state_root)?;

    if state.slot > spec.genesis_slot
        && state.slot.as_u64().safe_add(1)?.safe_rem(E::slots_per_epoch())? == 0
    {
        process_epoch(state, spec)?;
    }

    state.slot += 1u64;

    Ok(())
}

/// Cache the state root and block root of the current slot into the state's historical rings,
/// and fill in the latest block header's state root if it is zeroed (i.e., the header was
/// inserted by block processing in this slot).
fn cache_state<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root: Option<Hash256>,
) -> Result<(), Error> {
    let previous_state_root = if let Some(root) = state_root {
        root
    } else {
        state.canonical_root()
    };

    // Note: increment the state slot here to allow use of our `state_root` and `block_root`
    // getter/setter functions.
    //
    // This is a bit hacky, however it gets the job done safely without lots of code.
    let previous_slot = state.slot;
    state.slot += 1u64;

    // Store the previous slot's post state transition root.
    state.set_state_root(previous_slot, previous_state_root)?;

    // Cache latest block header state root
    if state.latest_block_header.state_root == Hash256::zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    // Cache block root
    let latest_block_root = state.latest_block_header.canonical_root();
    state.set_block_root(previous_slot, latest_block_root)?;

    // Set the state slot back to what it should be.
    state.slot = previous_slot;

    Ok(())
}
