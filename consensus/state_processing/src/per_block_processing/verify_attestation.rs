use super::errors::{AttestationInvalid as Invalid, BlockOperationError};
use super::is_valid_indexed_attestation::is_valid_indexed_attestation;
use super::VerifySignatures;
use crate::common::get_indexed_attestation;
use types::*;

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Returns `Ok(())` if the given `attestation` is valid to be included in a block that is applied
/// to `state`. Otherwise, returns a descriptive `Err`.
///
/// Optionally verifies the aggregate signature, depending on `verify_signatures`.
pub fn verify_attestation_for_block_inclusion<E: EthSpec>(
    state: &BeaconState<E>,
    attestation: &Attestation<E>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<IndexedAttestation<E>> {
    let data = &attestation.data;

    verify!(
        data.slot + spec.min_attestation_inclusion_delay <= state.slot,
        Invalid::IncludedTooEarly {
            state: state.slot,
            delay: spec.min_attestation_inclusion_delay,
            attestation: data.slot,
        }
    );
    verify!(
        state.slot <= data.slot + E::slots_per_epoch(),
        Invalid::IncludedTooLate {
            state: state.slot,
            attestation: data.slot,
        }
    );

    verify_attestation_for_state(state, attestation, verify_signatures, spec)
}

/// Returns `Ok(())` if `attestation` is a valid attestation to the chain that precedes the given
/// `state`.
///
/// Returns a descriptive `Err` if the attestation is malformed or does not accurately reflect the
/// beacon chain represented by `state`.
pub fn verify_attestation_for_state<E: EthSpec>(
    state: &BeaconState<E>,
    attestation: &Attestation<E>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<IndexedAttestation<E>> {
    let data = &attestation.data;

    verify!(
        data.target.epoch == data.slot.epoch(E::slots_per_epoch()),
        Invalid::TargetEpochSlotMismatch {
            target_epoch: data.target.epoch,
            slot_epoch: data.slot.epoch(E::slots_per_epoch()),
        }
    );
    verify!(
        data.target.epoch == state.previous_epoch() || data.target.epoch == state.current_epoch(),
        Invalid::BadTargetEpoch
    );

    // The attestation's source must match the state's justified checkpoint for the target
    // epoch. (The participation-flag computation re-checks this, however the explicit check
    // here gives a more precise error.)
    let (justified_checkpoint, is_current) = if data.target.epoch == state.current_epoch() {
        (state.current_justified_checkpoint, true)
    } else {
        (state.previous_justified_checkpoint, false)
    };

    verify!(
        data.source == justified_checkpoint,
        Invalid::WrongJustifiedCheckpoint {
            state: Box::new(justified_checkpoint),
            attestation: Box::new(data.source),
            is_current,
        }
    );

    // Check the attestation's committee and convert to indexed form.
    let committee = state.get_beacon_committee(data.slot, data.index)?;

    verify!(
        attestation.aggregation_bits.len() == committee.committee.len(),
        Invalid::BadAggregationBitfieldLength {
            committee_len: committee.committee.len(),
            bitfield_len: attestation.aggregation_bits.len(),
        }
    );

    // An attestation with no participants carries no information and is invalid.
    verify!(
        attestation.aggregation_bits.num_set_bits() > 0,
        Invalid::EmptyAggregationBitfield
    );

    let indexed_attestation = get_indexed_attestation(committee.committee, attestation)?;

    is_valid_indexed_attestation(state, &indexed_attestation, verify_signatures, spec)?;

    Ok(indexed_attestation)
}
