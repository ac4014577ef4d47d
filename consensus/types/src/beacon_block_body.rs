use crate::{
    Attestation, AttesterSlashing, Deposit, Eth1Data, EthSpec, ExecutionPayload, Hash256,
    ProposerSlashing, Signature, SignedVoluntaryExit, SyncAggregate, VariableList,
};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The body of a `BeaconChain` block, containing operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "E: EthSpec")]
pub struct BeaconBlockBody<E: EthSpec> {
    pub randao_reveal: Signature,
    pub eth1_data: Eth1Data,
    pub graffiti: Hash256,
    pub proposer_slashings: VariableList<ProposerSlashing, E::MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing<E>, E::MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation<E>, E::MaxAttestations>,
    pub deposits: VariableList<Deposit, E::MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, E::MaxVoluntaryExits>,
    pub sync_aggregate: SyncAggregate<E>,
    pub execution_payload: ExecutionPayload<E>,
}

impl<E: EthSpec> BeaconBlockBody<E> {
    /// An empty body, suitable for a genesis block or as a template for block production.
    pub fn empty() -> Self {
        Self {
            randao_reveal: Signature::empty(),
            eth1_data: Eth1Data::default(),
            graffiti: Hash256::zero(),
            proposer_slashings: VariableList::empty(),
            attester_slashings: VariableList::empty(),
            attestations: VariableList::empty(),
            deposits: VariableList::empty(),
            voluntary_exits: VariableList::empty(),
            sync_aggregate: SyncAggregate::new(),
            execution_payload: ExecutionPayload::default(),
        }
    }
}
