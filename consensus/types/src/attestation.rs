use crate::{AggregateSignature, AttestationData, BitList, EthSpec};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(Debug, PartialEq)]
pub enum Error {
    SszTypesError(ssz_types::Error),
    AlreadySigned(usize),
}

/// Details an attestation that can be slashable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "E: EthSpec")]
pub struct Attestation<E: EthSpec> {
    pub aggregation_bits: BitList<E::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: AggregateSignature,
}

impl<E: EthSpec> Attestation<E> {
    /// Produces an attestation with an empty aggregation bitfield and an infinity signature.
    pub fn empty_for_signing(
        data: AttestationData,
        committee_length: usize,
    ) -> Result<Self, Error> {
        Ok(Self {
            aggregation_bits: BitList::with_capacity(committee_length)
                .map_err(Error::SszTypesError)?,
            data,
            signature: AggregateSignature::infinity(),
        })
    }

    /// Are the aggregation bitfields of these attestations disjoint?
    pub fn signers_disjoint_from(&self, other: &Self) -> bool {
        self.aggregation_bits
            .intersection(&other.aggregation_bits)
            .is_zero()
    }

    /// Aggregate another `Attestation` into `self`, assuming `self` and `other` attest to the
    /// same data and have disjoint aggregation bits.
    pub fn aggregate(&mut self, other: &Self) {
        debug_assert_eq!(self.data, other.data);
        self.aggregation_bits = self.aggregation_bits.union(&other.aggregation_bits);
        self.signature.add_assign_aggregate(&other.signature);
    }

    /// Sets the bit for `committee_position` and aggregates `signature` into `self.signature`.
    ///
    /// Returns an `AlreadySigned` error if the bit was already set.
    pub fn add_signature(
        &mut self,
        signature: &crate::Signature,
        committee_position: usize,
    ) -> Result<(), Error> {
        if self
            .aggregation_bits
            .get(committee_position)
            .map_err(Error::SszTypesError)?
        {
            Err(Error::AlreadySigned(committee_position))
        } else {
            self.aggregation_bits
                .set(committee_position, true)
                .map_err(Error::SszTypesError)?;

            self.signature.add_assign(signature);

            Ok(())
        }
    }

    /// Returns the number of set aggregation bits.
    pub fn num_set_aggregation_bits(&self) -> usize {
        self.aggregation_bits.num_set_bits()
    }
}
