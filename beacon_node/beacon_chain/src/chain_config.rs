use types::Checkpoint;

/// The default size of the in-memory state LRU (not counting the pinned head, justified and
/// finalized states). Chosen empirically; the floor is the set of pinned states.
pub const DEFAULT_STATE_CACHE_SIZE: usize = 32;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ChainConfig {
    /// Maximum number of slots to skip when importing a consensus message (e.g., block,
    /// attestation, etc).
    ///
    /// If `None`, there is no limit.
    pub import_max_skip_slots: Option<u64>,
    /// A user-input `Checkpoint` that must exist in the beacon chain's sync path.
    ///
    /// If `None`, there is no weak subjectivity verification.
    pub weak_subjectivity_checkpoint: Option<Checkpoint>,
    /// Number of non-pinned states to hold in the in-memory LRU.
    pub state_cache_size: usize,
    /// Whether to compute unrealized justification/finalization when importing blocks.
    pub count_unrealized: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            import_max_skip_slots: None,
            weak_subjectivity_checkpoint: None,
            state_cache_size: DEFAULT_STATE_CACHE_SIZE,
            count_unrealized: true,
        }
    }
}
