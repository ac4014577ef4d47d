use super::errors::{BlockProcessingError, ExecutionPayloadInvalid};
use crate::common::compute_timestamp_at_slot;
use types::{BeaconBlockBody, BeaconState, ChainSpec, EthSpec, ExecutionPayload, ExecutionPayloadHeader};

/// Returns `true` once the chain has included a non-default execution payload.
///
/// Spec: `is_merge_transition_complete`
pub fn is_merge_transition_complete<E: EthSpec>(state: &BeaconState<E>) -> bool {
    state.latest_execution_payload_header != ExecutionPayloadHeader::default()
}

/// Returns `true` if the payload of `body` must be processed against `state`.
///
/// A default payload before the merge transition means "no execution data yet" and is skipped.
///
/// Spec: `is_execution_enabled`
pub fn is_execution_enabled<E: EthSpec>(
    state: &BeaconState<E>,
    body: &BeaconBlockBody<E>,
) -> bool {
    is_merge_transition_complete(state) || !body.execution_payload.is_default()
}

/// Performs the consensus-side checks of the execution payload and rotates the latest payload
/// header.
///
/// The validity of the payload's execution semantics is delegated to the external execution
/// engine and is **not** checked here.
///
/// Spec: `process_execution_payload`
pub fn process_execution_payload<E: EthSpec>(
    state: &mut BeaconState<E>,
    payload: &ExecutionPayload<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Verify consistency of the parent hash with respect to the previous execution payload
    // header.
    if is_merge_transition_complete(state) {
        block_verify!(
            payload.parent_hash == state.latest_execution_payload_header.block_hash,
            ExecutionPayloadInvalid::ParentHashMismatch {
                state: state.latest_execution_payload_header.block_hash,
                payload: payload.parent_hash,
            }
            .into()
        );
    }

    // Verify prev_randao.
    let expected_randao = *state.get_randao_mix(state.current_epoch())?;
    block_verify!(
        payload.prev_randao == expected_randao,
        ExecutionPayloadInvalid::PrevRandaoMismatch {
            state: expected_randao,
            payload: payload.prev_randao,
        }
        .into()
    );

    // Verify timestamp.
    let expected_timestamp = compute_timestamp_at_slot(state, spec)?;
    block_verify!(
        payload.timestamp == expected_timestamp,
        ExecutionPayloadInvalid::TimestampMismatch {
            state: expected_timestamp,
            payload: payload.timestamp,
        }
        .into()
    );

    // Cache the execution payload header.
    state.latest_execution_payload_header = ExecutionPayloadHeader::from(payload);

    Ok(())
}
