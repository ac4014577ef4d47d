#![allow(clippy::integer_arithmetic)]

use super::signature_sets::{
    attester_slashing_signature_sets, block_proposal_signature_set_with_root,
    exit_signature_set, randao_signature_set, sync_aggregate_signature_set, Error as SignatureSetError,
};
use bls::SignatureSet;
use rayon::prelude::*;
use std::borrow::Cow;
use types::{
    BeaconState, BeaconStateError, ChainSpec, EthSpec, Hash256, PublicKey, SignedBeaconBlock,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// All public keys were found but signature verification failed. The block is invalid.
    SignatureInvalid,
    /// An attestation in the block was invalid. The block is invalid.
    AttestationValidationError(super::errors::BlockOperationError<super::errors::AttestationInvalid>),
    /// There was an error whilst attempting to get a set of signatures. The block is invalid.
    SignatureSetError(SignatureSetError),
    /// There was an error whilst interacting with the state. May or may not indicate an invalid
    /// block.
    BeaconStateError(BeaconStateError),
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<SignatureSetError> for Error {
    fn from(e: SignatureSetError) -> Error {
        Error::SignatureSetError(e)
    }
}

/// Reads the BLS signatures and keys from a `SignedBeaconBlock`, storing them as a `Vec` of
/// `SignatureSet`.
///
/// This allows for optimizations related to batch BLS operations (see the
/// `Self::verify_entire_block(..)` function). Signature batching is all-or-nothing: a batch
/// either succeeds as a unit or the whole block is rejected; partial acceptance is forbidden.
pub struct BlockSignatureVerifier<'a, E, F>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKey>> + Clone,
{
    get_pubkey: F,
    state: &'a BeaconState<E>,
    spec: &'a ChainSpec,
    sets: Vec<SignatureSet<'a>>,
}

impl<'a, E, F> BlockSignatureVerifier<'a, E, F>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKey>> + Clone,
{
    /// Create a new verifier without any included signatures. See the `include...` functions to
    /// add signatures, and the `verify`
    pub fn new(state: &'a BeaconState<E>, get_pubkey: F, spec: &'a ChainSpec) -> Self {
        Self {
            get_pubkey,
            state,
            spec,
            sets: vec![],
        }
    }

    /// Verify all* the signatures in the given `SignedBeaconBlock`, returning `Ok(())` if the
    /// signatures are valid.
    ///
    /// * : _Does not verify any signatures in the block body that are also verified separately
    /// outside of block processing (e.g., deposits, whose signatures may legally be invalid)._
    pub fn verify_entire_block(
        state: &'a BeaconState<E>,
        get_pubkey: F,
        block: &'a SignedBeaconBlock<E>,
        block_root: Option<Hash256>,
        spec: &'a ChainSpec,
    ) -> Result<()> {
        let mut verifier = Self::new(state, get_pubkey, spec);
        verifier.include_all_signatures(block, block_root)?;
        verifier.verify()
    }

    /// Includes all signatures on the block (except deposit signatures) for verification.
    pub fn include_all_signatures(
        &mut self,
        block: &'a SignedBeaconBlock<E>,
        block_root: Option<Hash256>,
    ) -> Result<()> {
        self.include_block_proposal(block, block_root)?;
        self.include_all_signatures_except_proposal(block)?;

        Ok(())
    }

    /// Includes all signatures on the block (except the proposal signature and deposit
    /// signatures) for verification.
    pub fn include_all_signatures_except_proposal(
        &mut self,
        block: &'a SignedBeaconBlock<E>,
    ) -> Result<()> {
        self.include_randao_reveal(block)?;
        self.include_proposer_slashings(block)?;
        self.include_attester_slashings(block)?;
        self.include_attestations(block)?;
        // Deposits are not included because they can legally have invalid signatures.
        self.include_exits(block)?;
        self.include_sync_aggregate(block)?;

        Ok(())
    }

    /// Includes the block signature for verification.
    pub fn include_block_proposal(
        &mut self,
        block: &'a SignedBeaconBlock<E>,
        block_root: Option<Hash256>,
    ) -> Result<()> {
        let set = block_proposal_signature_set_with_root(
            self.state,
            self.get_pubkey.clone(),
            block,
            block_root,
            self.spec,
        )?;
        self.sets.push(set);
        Ok(())
    }

    /// Includes the randao signature for verification.
    pub fn include_randao_reveal(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let set = randao_signature_set(
            self.state,
            self.get_pubkey.clone(),
            &block.message,
            self.spec,
        )?;
        self.sets.push(set);
        Ok(())
    }

    /// Includes all proposer slashing signatures for verification.
    pub fn include_proposer_slashings(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        for proposer_slashing in block.message.body.proposer_slashings.iter() {
            let (set_1, set_2) = super::signature_sets::proposer_slashing_signature_set(
                self.state,
                self.get_pubkey.clone(),
                proposer_slashing,
                self.spec,
            )?;
            self.sets.push(set_1);
            self.sets.push(set_2);
        }
        Ok(())
    }

    /// Includes all attester slashing signatures for verification.
    pub fn include_attester_slashings(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        for attester_slashing in block.message.body.attester_slashings.iter() {
            let (set_1, set_2) = attester_slashing_signature_sets(
                self.state,
                self.get_pubkey.clone(),
                attester_slashing,
                self.spec,
            )?;
            self.sets.push(set_1);
            self.sets.push(set_2);
        }
        Ok(())
    }

    /// Includes all attestation signatures for verification.
    pub fn include_attestations(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        for attestation in block.message.body.attestations.iter() {
            let committee = self
                .state
                .get_beacon_committee(attestation.data.slot, attestation.data.index)?;
            let indexed_attestation =
                crate::common::get_indexed_attestation(committee.committee, attestation)
                    .map_err(Error::AttestationValidationError)?;

            let set = super::signature_sets::indexed_attestation_signature_set(
                self.state,
                self.get_pubkey.clone(),
                &attestation.signature,
                // The indexed attestation is re-computed during `process_operations`; it is
                // only needed here to resolve the attesting pubkeys.
                &indexed_attestation,
                self.spec,
            )?;
            self.sets.push(set);
        }
        Ok(())
    }

    /// Includes all voluntary exit signatures for verification.
    pub fn include_exits(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        for exit in block.message.body.voluntary_exits.iter() {
            let set = exit_signature_set(self.state, self.get_pubkey.clone(), exit, self.spec)?;
            self.sets.push(set);
        }
        Ok(())
    }

    /// Includes the sync aggregate signature for verification, unless it has no participants.
    pub fn include_sync_aggregate(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let previous_slot = block.slot().saturating_sub(1u64);
        let block_root = *self.state.get_block_root(previous_slot)?;

        if let Some(set) = sync_aggregate_signature_set(
            self.state,
            &block.message.body.sync_aggregate,
            block.slot(),
            block_root,
            self.spec,
        )? {
            self.sets.push(set);
        }
        Ok(())
    }

    /// Verify all the signature sets, as a unit.
    ///
    /// The signature sets are verified in parallel; either the entire batch succeeds or the
    /// block is invalid.
    pub fn verify(self) -> Result<()> {
        let iter = self.sets.par_iter();

        if iter.map(|set| set.verify()).all(|success| success) {
            Ok(())
        } else {
            Err(Error::SignatureInvalid)
        }
    }
}
