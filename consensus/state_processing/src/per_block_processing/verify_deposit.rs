use super::errors::{BlockOperationError, DepositInvalid as Invalid};
use super::signature_sets::deposit_pubkey_signature_message;
use merkle_proof::verify_merkle_proof;
use tree_hash::TreeHash;
use types::*;

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

/// Verify `Deposit.pubkey` signed `Deposit.signature`.
///
/// Note: this signature is not checked with the other block signatures: a deposit with an
/// invalid signature is skipped rather than invalidating the whole block.
///
/// Spec v0.12.1
pub fn verify_deposit_signature(deposit_data: &DepositData, spec: &ChainSpec) -> Result<()> {
    let (pubkey, signature, msg) = deposit_pubkey_signature_message(deposit_data, spec)
        .ok_or_else(|| BlockOperationError::invalid(Invalid::BadBlsBytes))?;

    verify!(signature.verify(&pubkey, msg), Invalid::BadSignature);

    Ok(())
}

/// Returns a `Some(validator index)` if a pubkey already exists in the `validators`, otherwise
/// returns `None`.
///
/// Builds the pubkey cache if it is not already built.
pub fn get_existing_validator_index<E: EthSpec>(
    state: &mut BeaconState<E>,
    pub_key: &PublicKeyBytes,
) -> Result<Option<u64>> {
    state.update_pubkey_cache()?;
    let validator_index = state.get_validator_index(pub_key)?;
    Ok(validator_index.map(|idx| idx as u64))
}

/// Verify that a deposit is included in the state's eth1 deposit root.
///
/// The deposit index is provided as a parameter so we can check proofs
/// before they're due to be processed, and in parallel.
///
/// Spec v0.12.1
pub fn verify_deposit_merkle_proof<E: EthSpec>(
    state: &BeaconState<E>,
    deposit: &Deposit,
    deposit_index: u64,
    spec: &ChainSpec,
) -> Result<()> {
    let leaf = deposit.data.tree_hash_root();

    verify!(
        verify_merkle_proof(
            leaf,
            &deposit.proof[..],
            spec.deposit_contract_tree_depth as usize + 1,
            deposit_index as usize,
            state.eth1_data.deposit_root,
        ),
        Invalid::BadMerkleProof
    );

    Ok(())
}
