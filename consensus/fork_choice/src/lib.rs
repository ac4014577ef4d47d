mod fork_choice;
mod fork_choice_store;

pub use crate::fork_choice::{
    AttestationFromBlock, CountUnrealized, Error, ForkChoice, ForkChoiceView,
    ForkchoiceUpdateParameters, InvalidAttestation, InvalidBlock, PayloadVerificationStatus,
    PersistedForkChoice, QueuedAttestation,
};
pub use fork_choice_store::ForkChoiceStore;
pub use proto_array::{Block as ProtoBlock, ExecutionStatus, InvalidationOperation};
