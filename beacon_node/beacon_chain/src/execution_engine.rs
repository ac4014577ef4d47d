use parking_lot::RwLock;
use types::{EthSpec, ExecutionPayload, Hash256};

/// The verdict of an execution engine on a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadStatus {
    /// The payload is valid.
    Valid,
    /// The payload is invalid; the block and all its descendants must be rejected.
    Invalid,
    /// The engine has not yet imported the data required to make a judgement; the block may be
    /// imported optimistically.
    Syncing,
}

/// The external execution engine collaborator.
///
/// Execution validity is delegated entirely to the implementer; the consensus core only routes
/// payloads and fork-choice updates through this capability. A failure to answer (timeout,
/// connection loss) must be reported as an `Err`, which the chain treats as "unavailable": the
/// block remains optimistic.
pub trait ExecutionEngine<E: EthSpec>: Send + Sync {
    /// Submit a payload for validation.
    fn notify_new_payload(&self, payload: &ExecutionPayload<E>) -> Result<PayloadStatus, String>;

    /// Notify the engine of the current head/finalized pair.
    fn notify_forkchoice_updated(
        &self,
        head_block_hash: Hash256,
        finalized_block_hash: Hash256,
    ) -> Result<(), String>;
}

/// An execution engine which returns a pre-programmed status for every payload.
///
/// Used for testing, and for nodes running without an execution connection.
pub struct MockExecutionEngine {
    status: RwLock<Result<PayloadStatus, String>>,
}

impl MockExecutionEngine {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(Ok(PayloadStatus::Valid)),
        }
    }

    /// All future payloads will receive the given status.
    pub fn set_status(&self, status: Result<PayloadStatus, String>) {
        *self.status.write() = status;
    }
}

impl Default for MockExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EthSpec> ExecutionEngine<E> for MockExecutionEngine {
    fn notify_new_payload(&self, _payload: &ExecutionPayload<E>) -> Result<PayloadStatus, String> {
        self.status.read().clone()
    }

    fn notify_forkchoice_updated(
        &self,
        _head_block_hash: Hash256,
        _finalized_block_hash: Hash256,
    ) -> Result<(), String> {
        Ok(())
    }
}
