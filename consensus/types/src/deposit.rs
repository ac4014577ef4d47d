use crate::{DepositData, FixedVector, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::typenum::U33;
use tree_hash_derive::TreeHash;

/// The depth of the Merkle tree of the eth1 deposit contract.
pub const DEPOSIT_TREE_DEPTH: usize = 32;

/// A deposit to potentially become a beacon chain validator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    /// A Merkle branch into the deposit tree, with the deposit count mixed in as the final node.
    pub proof: FixedVector<Hash256, U33>,
    pub data: DepositData,
}
