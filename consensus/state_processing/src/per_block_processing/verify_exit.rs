use super::errors::{BlockOperationError, ExitInvalid as Invalid};
use super::signature_sets::{exit_signature_set, get_pubkey_from_state};
use super::VerifySignatures;
use types::*;

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Indicates if an `Exit` is valid to be included in a block in the current epoch of the given
/// state.
///
/// Returns `Ok(())` if the `Exit` is valid, otherwise indicates the reason for invalidity.
///
/// Spec v0.12.1
pub fn verify_exit<E: EthSpec>(
    state: &BeaconState<E>,
    signed_exit: &SignedVoluntaryExit,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    let exit = &signed_exit.message;

    let validator = state
        .validators
        .get(exit.validator_index as usize)
        .ok_or_else(|| error(Invalid::ValidatorUnknown(exit.validator_index)))?;

    // Verify the validator is active.
    verify!(
        validator.is_active_at(state.current_epoch()),
        Invalid::NotActive(exit.validator_index)
    );

    // Verify that the validator has not yet exited.
    verify!(
        validator.exit_epoch == spec.far_future_epoch,
        Invalid::AlreadyInitiatedExit(exit.validator_index)
    );

    // Exits must specify an epoch when they become valid; they are not valid before then.
    verify!(
        state.current_epoch() >= exit.epoch,
        Invalid::FutureEpoch {
            state: state.current_epoch(),
            exit: exit.epoch,
        }
    );

    // Verify the validator has been active long enough.
    let earliest_exit_epoch = validator.activation_epoch + spec.shard_committee_period;
    verify!(
        state.current_epoch() >= earliest_exit_epoch,
        Invalid::TooYoungToExit {
            current_epoch: state.current_epoch(),
            earliest_exit_epoch,
        }
    );

    if verify_signatures.is_true() {
        verify!(
            exit_signature_set(state, |i| get_pubkey_from_state(state, i), signed_exit, spec)?
                .verify(),
            Invalid::BadSignature
        );
    }

    Ok(())
}
