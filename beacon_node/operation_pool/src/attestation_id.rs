use types::{AttestationData, CommitteeIndex, Hash256, Slot};
use tree_hash::TreeHash;

/// Serialized `AttestationData` augmented with the committee position, used to key attestations
/// in the pool.
///
/// Attestations with equal `AttestationId`s attest to the same data and may be aggregated
/// together.
#[derive(PartialEq, Eq, Clone, Hash, Debug)]
pub struct AttestationId {
    slot: Slot,
    index: CommitteeIndex,
    attestation_data_root: Hash256,
}

impl AttestationId {
    pub fn from_data(attestation: &AttestationData) -> Self {
        AttestationId {
            slot: attestation.slot,
            index: attestation.index,
            attestation_data_root: attestation.tree_hash_root(),
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }
}
