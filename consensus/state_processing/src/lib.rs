//! The state-transition engine: pure, deterministic functions mapping
//! `(pre-state, signed-block)` to a post-state.
//!
//! Given identical inputs, any two invocations must produce identical post-state roots; the
//! functions here are the normative reference for the rest of the workspace.

#[macro_use]
mod macros;

pub mod common;
pub mod consensus_context;
pub mod genesis;
pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;
pub mod state_advance;
pub mod state_transition;
pub mod verify_operation;

pub use consensus_context::{ConsensusContext, ContextError};
pub use genesis::{
    initialize_beacon_state_from_eth1, interop_genesis_state, is_valid_genesis_state,
    process_activations,
};
pub use per_block_processing::{
    errors::BlockProcessingError, per_block_processing, process_block_header,
    signature_sets, verify_block_signature, BlockSignatureStrategy, BlockSignatureVerifier,
    VerifySignatures,
};
pub use per_epoch_processing::{errors::EpochProcessingError, process_epoch};
pub use per_slot_processing::{per_slot_processing, Error as SlotProcessingError};
pub use state_transition::{state_transition, StateTransitionError};
pub use verify_operation::{SigVerifiedOp, VerifyOperation};
