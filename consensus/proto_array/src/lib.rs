mod error;
mod proto_array;
mod proto_array_fork_choice;
mod ssz_container;

pub use crate::proto_array::{calculate_committee_fraction, InvalidationOperation};
pub use crate::proto_array_fork_choice::{Block, ExecutionStatus, ProtoArrayForkChoice};
pub use error::Error;

pub mod core {
    pub use super::proto_array::{ProposerBoost, ProtoArray, ProtoNode};
    pub use super::proto_array_fork_choice::VoteTracker;
    pub use super::ssz_container::SszContainer;
}
