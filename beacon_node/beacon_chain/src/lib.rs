//! The chain orchestrator: receives blocks and attestations, drives the state-transition
//! engine, persists the results and keeps the fork choice (and its observers) up to date.

mod beacon_chain;
mod beacon_fork_choice_store;
mod beacon_snapshot;
pub mod builder;
mod chain_config;
mod errors;
pub mod events;
mod execution_engine;
mod state_cache;
pub mod test_utils;

pub use self::beacon_chain::{
    BeaconChain, BeaconChainTypes, ReceiveOutcome, FORK_CHOICE_DB_KEY,
};
pub use self::beacon_snapshot::BeaconSnapshot;
pub use self::chain_config::ChainConfig;
pub use self::errors::{
    AttestationError, BeaconChainError, BlockError, ExecutionPayloadError, OperationError,
};
pub use self::execution_engine::{ExecutionEngine, MockExecutionEngine, PayloadStatus};
pub use beacon_fork_choice_store::BeaconForkChoiceStore;
pub use events::{CollectingEventHandler, EventHandler, EventKind, NullEventHandler};
pub use state_cache::StateCache;
