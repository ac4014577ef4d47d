use crate::{
    per_block_processing, per_slot_processing, BlockProcessingError, BlockSignatureStrategy,
    ConsensusContext,
};
use types::{BeaconState, ChainSpec, EthSpec, Hash256, SignedBeaconBlock};

#[derive(Debug, PartialEq)]
pub enum StateTransitionError {
    /// The block's slot is not ahead of the state's slot.
    BlockSlotBehindState,
    SlotProcessingError(crate::per_slot_processing::Error),
    BlockProcessingError(BlockProcessingError),
    /// The transition succeeded but the resulting state root does not match the root claimed by
    /// the block.
    StateRootMismatch {
        block: Hash256,
        local: Hash256,
    },
}

impl From<crate::per_slot_processing::Error> for StateTransitionError {
    fn from(e: crate::per_slot_processing::Error) -> Self {
        Self::SlotProcessingError(e)
    }
}

impl From<BlockProcessingError> for StateTransitionError {
    fn from(e: BlockProcessingError) -> Self {
        Self::BlockProcessingError(e)
    }
}

/// The complete per-block state transition, as defined by the specification:
///
/// 1. Process slots (including the epoch boundary) until `state.slot == block.slot`.
/// 2. Process the block.
/// 3. Verify the block's claimed state root against the freshly-computed root.
///
/// This function is the normative reference for the rest of the workspace: given identical
/// inputs, any implementation must produce the identical post-state root.
pub fn state_transition<E: EthSpec>(
    state: &mut BeaconState<E>,
    signed_block: &SignedBeaconBlock<E>,
    block_signature_strategy: BlockSignatureStrategy,
    spec: &ChainSpec,
) -> Result<(), StateTransitionError> {
    let block = &signed_block.message;

    if block.slot <= state.slot {
        return Err(StateTransitionError::BlockSlotBehindState);
    }

    while state.slot < block.slot {
        per_slot_processing(state, None, spec)?;
    }

    let mut ctxt = ConsensusContext::new(block.slot);

    per_block_processing(
        state,
        signed_block,
        block_signature_strategy,
        &mut ctxt,
        spec,
    )?;

    let local = state.canonical_root();
    if block.state_root != local {
        return Err(StateTransitionError::StateRootMismatch {
            block: block.state_root,
            local,
        });
    }

    Ok(())
}
