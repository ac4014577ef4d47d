use crate::beacon_fork_choice_store::BeaconForkChoiceStore;
use crate::beacon_snapshot::BeaconSnapshot;
use crate::chain_config::ChainConfig;
use crate::{BeaconChain, BeaconChainTypes};
use fork_choice::ForkChoice;
use slog::{info, Logger};
use std::sync::Arc;
use store::ItemStore;
use types::{BeaconBlock, BeaconState, ChainSpec, EthSpec, Hash256, Signature, SignedBeaconBlock};

/// An error during chain start-up.
#[derive(Debug)]
pub enum BuilderError {
    MissingStore,
    MissingGenesisState,
    MissingExecutionEngine,
    MissingLogger,
    GenesisError(String),
}

/// Builds a `BeaconChain` from a genesis state.
///
/// Restoring a chain from a persisted fork choice is not handled here; see
/// `BeaconChain::load_persisted_fork_choice`.
pub struct BeaconChainBuilder<T: BeaconChainTypes> {
    spec: ChainSpec,
    config: ChainConfig,
    store: Option<Arc<T::Store>>,
    genesis_state: Option<BeaconState<T::EthSpec>>,
    execution_engine: Option<Arc<T::ExecutionEngine>>,
    log: Option<Logger>,
}

impl<T: BeaconChainTypes> BeaconChainBuilder<T> {
    pub fn new(spec: ChainSpec) -> Self {
        Self {
            spec,
            config: ChainConfig::default(),
            store: None,
            genesis_state: None,
            execution_engine: None,
            log: None,
        }
    }

    pub fn chain_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<T::Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn genesis_state(mut self, genesis_state: BeaconState<T::EthSpec>) -> Self {
        self.genesis_state = Some(genesis_state);
        self
    }

    pub fn execution_engine(mut self, execution_engine: Arc<T::ExecutionEngine>) -> Self {
        self.execution_engine = Some(execution_engine);
        self
    }

    pub fn logger(mut self, log: Logger) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> Result<BeaconChain<T>, BuilderError> {
        let store = self.store.ok_or(BuilderError::MissingStore)?;
        let mut genesis_state = self.genesis_state.ok_or(BuilderError::MissingGenesisState)?;
        let execution_engine = self
            .execution_engine
            .ok_or(BuilderError::MissingExecutionEngine)?;
        let log = self.log.ok_or(BuilderError::MissingLogger)?;

        genesis_state
            .build_all_caches(&self.spec)
            .map_err(|e| BuilderError::GenesisError(format!("{:?}", e)))?;

        let genesis_state_root = genesis_state.canonical_root();

        // The genesis block points at the genesis state; its signature is (and remains) empty.
        let genesis_block = SignedBeaconBlock {
            message: BeaconBlock {
                state_root: genesis_state_root,
                ..BeaconBlock::empty(&self.spec)
            },
            signature: Signature::empty(),
        };
        let genesis_block_root = genesis_block.canonical_root();

        store
            .put(&genesis_block_root, &genesis_block)
            .and_then(|()| store.put(&genesis_state_root, &genesis_state))
            .map_err(|e| BuilderError::GenesisError(format!("{:?}", e)))?;

        let fc_store = BeaconForkChoiceStore::get_forkchoice_store(
            store.clone(),
            genesis_block_root,
            &genesis_state,
        );

        let fork_choice = ForkChoice::from_anchor(
            fc_store,
            &genesis_block,
            &genesis_state,
            Some(genesis_state.slot),
            &self.spec,
        )
        .map_err(|e| BuilderError::GenesisError(format!("{:?}", e)))?;

        info!(
            log,
            "Beacon chain initialized";
            "validator_count" => genesis_state.validators.len(),
            "genesis_state_root" => ?genesis_state_root,
            "genesis_block_root" => ?genesis_block_root,
        );

        let canonical_head =
            BeaconSnapshot::new(genesis_block, genesis_block_root, genesis_state);

        Ok(BeaconChain::new(
            self.spec,
            self.config,
            store,
            fork_choice,
            canonical_head,
            execution_engine,
            genesis_block_root,
            log,
        ))
    }
}
