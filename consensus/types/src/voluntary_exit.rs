use crate::{
    ChainSpec, Epoch, Hash256, SecretKey, SignedRoot, SignedVoluntaryExit,
};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// An exit voluntarily submitted by a validator who wishes to withdraw.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct VoluntaryExit {
    /// Earliest epoch when voluntary exit can be processed.
    pub epoch: Epoch,
    #[serde(with = "eth2_serde_utils::quoted_u64")]
    pub validator_index: u64,
}

impl SignedRoot for VoluntaryExit {}

impl VoluntaryExit {
    pub fn sign(
        self,
        secret_key: &SecretKey,
        fork_version: [u8; 4],
        genesis_validators_root: Hash256,
        spec: &ChainSpec,
    ) -> SignedVoluntaryExit {
        let domain =
            spec.compute_domain(crate::Domain::VoluntaryExit, fork_version, genesis_validators_root);
        let message = self.signing_root(domain);

        SignedVoluntaryExit {
            message: self,
            signature: secret_key.sign(message),
        }
    }
}
