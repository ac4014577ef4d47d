use super::errors::{BlockProcessingError, SyncAggregateInvalid};
use super::signature_sets::sync_aggregate_signature_set;
use super::VerifySignatures;
use crate::common::{decrease_balance, increase_balance};
use safe_arith::SafeArith;
use types::consts::altair::{PROPOSER_WEIGHT, SYNC_REWARD_WEIGHT, WEIGHT_DENOMINATOR};
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, SyncAggregate, Unsigned};

/// Verify the sync aggregate against the current sync committee, then credit the proposer and
/// participants and penalize the non-participants.
///
/// Spec v1.1.0
pub fn process_sync_aggregate<E: EthSpec>(
    state: &mut BeaconState<E>,
    aggregate: &SyncAggregate<E>,
    proposer_index: u64,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // An aggregate with no participants must carry the infinity signature, regardless of the
    // verification strategy (bulk verification has no set to check for it).
    if aggregate.num_set_bits() == 0 && !aggregate.sync_committee_signature.is_infinity() {
        return Err(SyncAggregateInvalid::SignatureInvalid.into());
    }

    // Verify sync committee aggregate signature signing over the previous slot block root.
    if verify_signatures.is_true() {
        let previous_slot = state.slot.saturating_sub(1u64);
        let block_root = *state.get_block_root(previous_slot)?;

        if let Some(signature_set) =
            sync_aggregate_signature_set(state, aggregate, state.slot, block_root, spec)?
        {
            if !signature_set.verify() {
                return Err(SyncAggregateInvalid::SignatureInvalid.into());
            }
        }
    }

    // Compute participant and proposer rewards.
    let total_active_balance = state.get_total_active_balance(spec)?;
    let total_active_increments =
        total_active_balance.safe_div(spec.effective_balance_increment)?;
    let total_base_rewards = crate::common::get_base_reward_per_increment(total_active_balance, spec)?
        .safe_mul(total_active_increments)?;
    let max_participant_rewards = total_base_rewards
        .safe_mul(SYNC_REWARD_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR)?
        .safe_div(E::slots_per_epoch())?;
    let participant_reward =
        max_participant_rewards.safe_div(E::SyncCommitteeSize::to_u64())?;
    let proposer_reward = participant_reward
        .safe_mul(PROPOSER_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR.safe_sub(PROPOSER_WEIGHT)?)?;

    // Resolve the sync committee pubkeys back to validator indices.
    //
    // The pubkey cache covers the whole registry, so each lookup is constant time.
    state.update_pubkey_cache()?;

    let committee_pubkeys = state.current_sync_committee.pubkeys.clone();

    for (participant_index, participation_bit) in committee_pubkeys
        .iter()
        .zip(aggregate.sync_committee_bits.iter())
    {
        let participant_index = state
            .get_validator_index(participant_index)?
            .ok_or(BeaconStateError::PubkeyCacheInconsistent)?;

        if participation_bit {
            increase_balance(state, participant_index, participant_reward)?;
            increase_balance(state, proposer_index as usize, proposer_reward)?;
        } else {
            decrease_balance(state, participant_index, participant_reward)?;
        }
    }

    Ok(())
}
