use crate::{CommitteeIndex, Slot};

/// A committee of validators assigned to attest at a specific slot.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BeaconCommittee<'a> {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub committee: &'a [usize],
}

impl<'a> BeaconCommittee<'a> {
    /// Produce an owned version of this committee.
    pub fn into_owned(self) -> OwnedBeaconCommittee {
        OwnedBeaconCommittee {
            slot: self.slot,
            index: self.index,
            committee: self.committee.to_vec(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct OwnedBeaconCommittee {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub committee: Vec<usize>,
}
