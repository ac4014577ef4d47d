use parking_lot::Mutex;
use types::{Checkpoint, Epoch, Hash256, Slot};

/// A capability for observing the chain.
///
/// Handlers are held in an explicit registry and invoked synchronously on the writer task, in
/// registration order. A handler must therefore be quick; anything slow should hand off to its
/// own queue.
pub trait EventHandler: Send + Sync {
    fn register(&self, kind: EventKind);
}

/// An event handler that discards all events.
#[derive(Default)]
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {
    fn register(&self, _kind: EventKind) {}
}

/// An event handler that stores all events, for inspection in tests.
#[derive(Default)]
pub struct CollectingEventHandler {
    pub events: Mutex<Vec<EventKind>>,
}

impl CollectingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<EventKind> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for CollectingEventHandler {
    fn register(&self, kind: EventKind) {
        self.events.lock().push(kind);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// The canonical head moved.
    ///
    /// `reorg_depth` is zero when the new head is a descendant of the old head, otherwise it is
    /// the number of slots between the old head and the common ancestor of the two heads.
    HeadChanged {
        new_head: Hash256,
        old_head: Hash256,
        reorg_depth: u64,
    },
    CheckpointJustified {
        checkpoint: Checkpoint,
    },
    CheckpointFinalized {
        checkpoint: Checkpoint,
    },
    BlockProcessed {
        block_root: Hash256,
        slot: Slot,
    },
    BlockRejected {
        block_root: Hash256,
        reason: String,
    },
    AttestationProcessed {
        beacon_block_root: Hash256,
        target_epoch: Epoch,
    },
}
