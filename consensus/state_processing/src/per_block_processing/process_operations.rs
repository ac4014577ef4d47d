use super::errors::{BlockProcessingError, IntoWithIndex};
use super::{
    verify_attestation_for_block_inclusion, verify_attester_slashing, verify_deposit_merkle_proof,
    verify_deposit_signature, verify_exit, verify_proposer_slashing, VerifySignatures,
};
use crate::common::{
    get_attestation_participation_flag_indices, get_base_reward, initiate_validator_exit,
    increase_balance, slash_validator, BaseRewardPerIncrement,
};
use crate::ConsensusContext;
use safe_arith::SafeArith;
use types::consts::altair::{PARTICIPATION_FLAG_WEIGHTS, PROPOSER_WEIGHT, WEIGHT_DENOMINATOR};
use types::*;

/// Process the operations of a block, in the order mandated by the specification:
/// proposer slashings, attester slashings, attestations, deposits, voluntary exits.
///
/// Any admissibility failure aborts the whole block with an indexed error.
pub fn process_operations<E: EthSpec>(
    state: &mut BeaconState<E>,
    block_body: &BeaconBlockBody<E>,
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    process_proposer_slashings(
        state,
        &block_body.proposer_slashings,
        verify_signatures,
        ctxt,
        spec,
    )?;
    process_attester_slashings(
        state,
        &block_body.attester_slashings,
        verify_signatures,
        ctxt,
        spec,
    )?;
    process_attestations(state, &block_body.attestations, verify_signatures, spec)?;
    process_deposits(state, &block_body.deposits, spec)?;
    process_exits(state, &block_body.voluntary_exits, verify_signatures, spec)?;

    Ok(())
}

/// Validates each `ProposerSlashing` and updates the state.
///
/// Returns an `Err` describing the invalid object or cause of failure.
pub fn process_proposer_slashings<E: EthSpec>(
    state: &mut BeaconState<E>,
    proposer_slashings: &[ProposerSlashing],
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    for (i, proposer_slashing) in proposer_slashings.iter().enumerate() {
        verify_proposer_slashing(proposer_slashing, state, verify_signatures, spec)
            .map_err(|e| e.into_with_index(i))?;

        slash_validator(
            state,
            proposer_slashing.signed_header_1.message.proposer_index as usize,
            None,
            ctxt,
            spec,
        )?;
    }

    Ok(())
}

/// Validates each `AttesterSlashing` and updates the state.
///
/// Returns an `Err` describing the invalid object or cause of failure.
pub fn process_attester_slashings<E: EthSpec>(
    state: &mut BeaconState<E>,
    attester_slashings: &[AttesterSlashing<E>],
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    for (i, attester_slashing) in attester_slashings.iter().enumerate() {
        let slashable_indices =
            verify_attester_slashing(state, attester_slashing, verify_signatures, spec)
                .map_err(|e| e.into_with_index(i))?;

        for i in slashable_indices {
            slash_validator(state, i as usize, None, ctxt, spec)?;
        }
    }

    Ok(())
}

/// Validates each `Attestation`, updating the state's participation flags and rewarding the
/// proposer.
///
/// Returns an `Err` describing the invalid object or cause of failure.
pub fn process_attestations<E: EthSpec>(
    state: &mut BeaconState<E>,
    attestations: &[Attestation<E>],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Ensure the previous and current epoch committee caches are built.
    state.build_committee_cache(RelativeEpoch::Previous, spec)?;
    state.build_committee_cache(RelativeEpoch::Current, spec)?;

    let total_active_balance = state.get_total_active_balance(spec)?;
    let base_reward_per_increment = BaseRewardPerIncrement::new(total_active_balance, spec)?;

    let proposer_index = state.get_beacon_proposer_index(state.slot, spec)? as u64;

    for (i, attestation) in attestations.iter().enumerate() {
        let indexed_attestation =
            verify_attestation_for_block_inclusion(state, attestation, verify_signatures, spec)
                .map_err(|e| e.into_with_index(i))?;

        let data = &attestation.data;
        let inclusion_delay = state.slot.as_u64().safe_sub(data.slot.as_u64())?;

        // Matching roots, participation flag indices
        let participation_flag_indices =
            get_attestation_participation_flag_indices(state, data, inclusion_delay, spec)?;

        // Update epoch participation flags.
        let mut proposer_reward_numerator = 0u64;
        for &validator_index in indexed_attestation.attesting_indices.iter() {
            let validator_index = validator_index as usize;

            let validator_effective_balance = state.get_effective_balance(validator_index)?;

            for (flag_index, &weight) in PARTICIPATION_FLAG_WEIGHTS.iter().enumerate() {
                let epoch_participation = if data.target.epoch == state.current_epoch() {
                    state
                        .current_epoch_participation
                        .get_mut(validator_index)
                        .ok_or(BeaconStateError::ParticipationOutOfBounds(validator_index))?
                } else {
                    state
                        .previous_epoch_participation
                        .get_mut(validator_index)
                        .ok_or(BeaconStateError::ParticipationOutOfBounds(validator_index))?
                };

                if participation_flag_indices.contains(&flag_index)
                    && !epoch_participation.has_flag(flag_index)?
                {
                    epoch_participation.add_flag(flag_index)?;

                    let base_reward = get_base_reward(
                        validator_effective_balance,
                        base_reward_per_increment,
                        spec,
                    )?;
                    proposer_reward_numerator
                        .safe_add_assign(base_reward.safe_mul(weight)?)?;
                }
            }
        }

        let proposer_reward_denominator = WEIGHT_DENOMINATOR
            .safe_sub(PROPOSER_WEIGHT)?
            .safe_mul(WEIGHT_DENOMINATOR)?
            .safe_div(PROPOSER_WEIGHT)?;
        let proposer_reward =
            proposer_reward_numerator.safe_div(proposer_reward_denominator)?;
        increase_balance(state, proposer_index as usize, proposer_reward)?;
    }

    Ok(())
}

/// Validates each `Deposit` and updates the state.
///
/// Returns an `Err` describing the invalid object or cause of failure.
pub fn process_deposits<E: EthSpec>(
    state: &mut BeaconState<E>,
    deposits: &[Deposit],
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Verify that the block contains as many deposits as it should.
    let expected_deposit_len = std::cmp::min(
        E::MaxDeposits::to_u64(),
        state.get_outstanding_deposit_len()?,
    );
    block_verify!(
        deposits.len() as u64 == expected_deposit_len,
        BlockProcessingError::DepositCountInvalid {
            expected: expected_deposit_len as usize,
            found: deposits.len(),
        }
    );

    // Verify Merkle proofs.
    for (i, deposit) in deposits.iter().enumerate() {
        verify_deposit_merkle_proof(
            state,
            deposit,
            state.eth1_deposit_index.safe_add(i as u64)?,
            spec,
        )
        .map_err(|e| e.into_with_index(i))?;
    }

    // Update the state in series.
    for deposit in deposits {
        process_deposit(state, deposit, spec, false)?;
    }

    Ok(())
}

/// Process a single deposit, optionally verifying its merkle proof.
///
/// Spec v0.12.1
pub fn process_deposit<E: EthSpec>(
    state: &mut BeaconState<E>,
    deposit: &Deposit,
    spec: &ChainSpec,
    verify_merkle_proof: bool,
) -> Result<(), BlockProcessingError> {
    let deposit_index = state.eth1_deposit_index as usize;
    if verify_merkle_proof {
        verify_deposit_merkle_proof(state, deposit, state.eth1_deposit_index, spec)
            .map_err(|e| e.into_with_index(deposit_index))?;
    }

    state.eth1_deposit_index.safe_add_assign(1)?;

    // Get an `Option<u64>` where `u64` is the validator index if this deposit public key
    // already exists in the beacon_state.
    let validator_index = super::get_existing_validator_index(state, &deposit.data.pubkey)
        .map_err(|e| e.into_with_index(deposit_index))?;

    let amount = deposit.data.amount;

    if let Some(index) = validator_index {
        // Update the existing validator balance.
        increase_balance(state, index as usize, amount)?;
    } else {
        // The signature should be checked for new validators. Return early for a bad signature.
        if verify_deposit_signature(&deposit.data, spec).is_err() {
            return Ok(());
        }

        // Create a new validator.
        let validator = Validator {
            pubkey: deposit.data.pubkey,
            withdrawal_credentials: deposit.data.withdrawal_credentials,
            activation_eligibility_epoch: spec.far_future_epoch,
            activation_epoch: spec.far_future_epoch,
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
            effective_balance: std::cmp::min(
                amount.safe_sub(amount.safe_rem(spec.effective_balance_increment)?)?,
                spec.max_effective_balance,
            ),
            slashed: false,
        };
        state.validators.push(validator)?;
        state.balances.push(amount)?;

        // Altair-style participation and inactivity tracking for the new validator.
        state
            .previous_epoch_participation
            .push(ParticipationFlags::default())?;
        state
            .current_epoch_participation
            .push(ParticipationFlags::default())?;
        state.inactivity_scores.push(0)?;
    }

    Ok(())
}

/// Validates each `SignedVoluntaryExit` and updates the state.
///
/// Returns an `Err` describing the invalid object or cause of failure.
pub fn process_exits<E: EthSpec>(
    state: &mut BeaconState<E>,
    voluntary_exits: &[SignedVoluntaryExit],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Verify and apply each exit in series. We iterate in series because higher-index exits may
    // become invalid due to the application of lower-index ones.
    for (i, exit) in voluntary_exits.iter().enumerate() {
        verify_exit(state, exit, verify_signatures, spec).map_err(|e| e.into_with_index(i))?;

        initiate_validator_exit(state, exit.message.validator_index as usize, spec)?;
    }
    Ok(())
}
