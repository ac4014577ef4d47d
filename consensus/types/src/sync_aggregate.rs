use crate::{AggregateSignature, BitVector, EthSpec};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// An aggregate of sync-committee signatures over the previous slot's block root.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "E: EthSpec")]
pub struct SyncAggregate<E: EthSpec> {
    pub sync_committee_bits: BitVector<E::SyncCommitteeSize>,
    pub sync_committee_signature: AggregateSignature,
}

impl<E: EthSpec> SyncAggregate<E> {
    /// New aggregate with no participants and the infinity signature.
    pub fn new() -> Self {
        Self {
            sync_committee_bits: BitVector::new(),
            sync_committee_signature: AggregateSignature::infinity(),
        }
    }

    /// Returns how many participation bits are set.
    pub fn num_set_bits(&self) -> usize {
        self.sync_committee_bits.num_set_bits()
    }
}

impl<E: EthSpec> Default for SyncAggregate<E> {
    fn default() -> Self {
        Self::new()
    }
}
