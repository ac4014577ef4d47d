use crate::beacon_fork_choice_store;
use state_processing::per_block_processing::errors::{
    AttesterSlashingValidationError, ExitValidationError, ProposerSlashingValidationError,
};
use state_processing::{BlockProcessingError, EpochProcessingError, SlotProcessingError};
use types::{BeaconStateError, Checkpoint, Epoch, Hash256, Slot};

/// An error at the chain level. Indicates corruption or misuse rather than an invalid input
/// object.
#[derive(Debug)]
pub enum BeaconChainError {
    MissingBeaconBlock(Hash256),
    MissingBeaconState(Hash256),
    UnableToReconstructState {
        state_root: Hash256,
        block_root: Hash256,
    },
    BeaconStateError(BeaconStateError),
    SlotProcessingError(SlotProcessingError),
    EpochProcessingError(EpochProcessingError),
    StoreError(store::Error),
    ForkChoiceError(fork_choice::Error<beacon_fork_choice_store::Error>),
    ForkChoiceStoreError(beacon_fork_choice_store::Error),
    MissingFinalizedBlock {
        finalized_checkpoint: Checkpoint,
    },
    UnableToProduceBlock(String),
}

macro_rules! easy_from_to {
    ($from: ident, $to: ident) => {
        impl From<$from> for $to {
            fn from(e: $from) -> $to {
                $to::$from(e)
            }
        }
    };
}

impl From<store::Error> for BeaconChainError {
    fn from(e: store::Error) -> Self {
        BeaconChainError::StoreError(e)
    }
}

impl From<fork_choice::Error<beacon_fork_choice_store::Error>> for BeaconChainError {
    fn from(e: fork_choice::Error<beacon_fork_choice_store::Error>) -> Self {
        BeaconChainError::ForkChoiceError(e)
    }
}

easy_from_to!(BeaconStateError, BeaconChainError);
easy_from_to!(SlotProcessingError, BeaconChainError);
easy_from_to!(EpochProcessingError, BeaconChainError);

/// Reasons a block may be invalid, may not be importable yet, or may be unprocessable.
#[derive(Debug)]
pub enum BlockError {
    /// The parent block was not found in the chain; the block may be retried once the parent is
    /// known. This is an "ignore" rather than a "reject".
    ParentUnknown(Hash256),
    /// The parent (or an earlier ancestor) previously failed the state transition; descendants
    /// of a bad block are rejected without re-execution.
    ParentInvalid(Hash256),
    /// The block's slot is ahead of the current slot; the block may become valid in the future.
    FutureSlot {
        present_slot: Slot,
        block_slot: Slot,
    },
    /// The block conflicts with finalization and can never enter the canonical chain.
    WouldRevertFinalizedSlot {
        block_slot: Slot,
        finalized_slot: Slot,
    },
    /// The genesis block cannot be (re-)imported.
    GenesisBlock,
    /// The block is already known and does not need to be re-imported.
    BlockIsAlreadyKnown,
    /// The proposer signature is invalid.
    ProposalSignatureInvalid,
    /// The state transition succeeded but the resulting state root does not match the root
    /// claimed by the block. The block root is recorded as bad.
    StateRootMismatch {
        block: Hash256,
        local: Hash256,
    },
    /// An operation in the block failed its admissibility check.
    PerBlockProcessingError(BlockProcessingError),
    /// The state could not be advanced to the block's slot.
    SlotProcessingError(SlotProcessingError),
    /// The execution engine rejected the payload, or could not be reached.
    ExecutionPayloadError(ExecutionPayloadError),
    /// An internal error occurred; the validity of the block is unknown.
    BeaconChainError(Box<BeaconChainError>),
}

impl From<BlockProcessingError> for BlockError {
    fn from(e: BlockProcessingError) -> Self {
        BlockError::PerBlockProcessingError(e)
    }
}

easy_from_to!(SlotProcessingError, BlockError);
easy_from_to!(ExecutionPayloadError, BlockError);

impl From<BeaconChainError> for BlockError {
    fn from(e: BeaconChainError) -> Self {
        BlockError::BeaconChainError(Box::new(e))
    }
}

#[derive(Debug)]
pub enum ExecutionPayloadError {
    /// The execution engine reported the payload as invalid: the block and all its descendants
    /// are rejected.
    RejectedByExecutionEngine,
    /// The execution engine did not answer. The block is neither accepted nor rejected; it may
    /// be imported optimistically.
    ExecutionEngineUnavailable,
}

/// Reasons an attestation may be invalid or unprocessable.
#[derive(Debug)]
pub enum AttestationError {
    /// The attestation has zero aggregation bits set and carries no information.
    EmptyAggregationBitfield,
    /// The attestation points to a block we have not processed; it may become valid later.
    UnknownHeadBlock { beacon_block_root: Hash256 },
    /// The attestation's target epoch is not reachable from our head state's committees.
    UnknownTargetEpoch { target_epoch: Epoch },
    /// The aggregation bitfield does not match the committee size.
    InvalidCommitteeLength,
    /// The aggregate BLS signature is invalid.
    InvalidSignature,
    /// The attestation failed validation in the state-transition sense.
    Invalid(state_processing::per_block_processing::errors::AttestationValidationError),
    /// Fork-choice rejected the attestation.
    ForkChoiceError(String),
    /// An internal error occurred; the validity of the attestation is unknown.
    BeaconChainError(Box<BeaconChainError>),
}

impl From<BeaconChainError> for AttestationError {
    fn from(e: BeaconChainError) -> Self {
        AttestationError::BeaconChainError(Box::new(e))
    }
}

impl From<BeaconStateError> for AttestationError {
    fn from(e: BeaconStateError) -> Self {
        AttestationError::BeaconChainError(Box::new(BeaconChainError::BeaconStateError(e)))
    }
}

/// Reasons an operation (exit, slashing, deposit) submission may fail.
#[derive(Debug)]
pub enum OperationError {
    ExitValidationError(ExitValidationError),
    ProposerSlashingValidationError(ProposerSlashingValidationError),
    AttesterSlashingValidationError(AttesterSlashingValidationError),
    BeaconChainError(Box<BeaconChainError>),
}

easy_from_to!(ExitValidationError, OperationError);
easy_from_to!(ProposerSlashingValidationError, OperationError);
easy_from_to!(AttesterSlashingValidationError, OperationError);

impl From<BeaconChainError> for OperationError {
    fn from(e: BeaconChainError) -> Self {
        OperationError::BeaconChainError(Box::new(e))
    }
}
