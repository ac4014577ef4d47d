use crate::common::DepositDataTree;
use crate::per_block_processing::process_operations::process_deposit;
use crate::per_block_processing::errors::BlockProcessingError;
use safe_arith::{ArithError, SafeArith};
use tree_hash::TreeHash;
use types::{
    BeaconBlock, BeaconState, ChainSpec, Deposit, Eth1Data, EthSpec, Hash256, Unsigned,
    DEPOSIT_TREE_DEPTH,
};

/// Initialize a `BeaconState` from the genesis deposits, exactly as the deposit contract would
/// have produced them.
///
/// Spec: `initialize_beacon_state_from_eth1`
pub fn initialize_beacon_state_from_eth1<E: EthSpec>(
    eth1_block_hash: Hash256,
    eth1_timestamp: u64,
    deposits: Vec<Deposit>,
    spec: &ChainSpec,
) -> Result<BeaconState<E>, BlockProcessingError> {
    let genesis_time = eth2_genesis_time(eth1_timestamp, spec)?;
    let eth1_data = Eth1Data {
        // Set deposit_root to zero; this is updated in `process_deposit`.
        deposit_root: Hash256::zero(),
        deposit_count: deposits.len() as u64,
        block_hash: eth1_block_hash,
    };
    let mut state = BeaconState::new(genesis_time, eth1_data, spec);

    // Seed RANDAO with Eth1 entropy.
    for i in 0..E::EpochsPerHistoricalVector::to_usize() {
        state.randao_mixes[i] = eth1_block_hash;
    }

    // The genesis block's body root goes into the initial latest block header.
    state.latest_block_header = BeaconBlock::<E>::empty(spec).temporary_block_header();

    let mut deposit_tree = DepositDataTree::create(&[], 0, DEPOSIT_TREE_DEPTH);

    for deposit in deposits.iter() {
        deposit_tree
            .push_leaf(deposit.data.tree_hash_root())
            .map_err(BlockProcessingError::MerkleTreeError)?;
        state.eth1_data.deposit_root = deposit_tree.root();
        process_deposit(&mut state, deposit, spec, true)?;
    }

    process_activations(&mut state, spec)?;

    // Now that we have our validators, initialize the caches (including the committees)
    state.build_all_caches(spec)?;

    // Set genesis validators root for domain separation and chain versioning
    state.genesis_validators_root = state.validators.tree_hash_root();

    // Fill in the sync committees. At genesis both committees are derived from the same epoch.
    state.current_sync_committee = state.get_next_sync_committee(spec)?;
    state.next_sync_committee = state.get_next_sync_committee(spec)?;

    Ok(state)
}

/// Determine whether a candidate genesis state is suitable for starting the chain.
///
/// Spec v0.12.1
pub fn is_valid_genesis_state<E: EthSpec>(state: &BeaconState<E>, spec: &ChainSpec) -> bool {
    state.genesis_time >= spec.min_genesis_time
        && state
            .get_active_validator_indices(E::genesis_epoch())
            .len() as u64
            >= spec.min_genesis_active_validator_count
}

/// Activate genesis validators, if their balance is acceptable.
///
/// Spec v0.12.1
pub fn process_activations<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let (validators, balances) = (&mut state.validators, &state.balances);
    for (index, validator) in validators.iter_mut().enumerate() {
        let balance = balances
            .get(index)
            .copied()
            .ok_or(types::BeaconStateError::BalancesOutOfBounds(index))?;
        validator.effective_balance = std::cmp::min(
            balance.safe_sub(balance.safe_rem(spec.effective_balance_increment)?)?,
            spec.max_effective_balance,
        );
        if validator.effective_balance == spec.max_effective_balance {
            validator.activation_eligibility_epoch = E::genesis_epoch();
            validator.activation_epoch = E::genesis_epoch();
        }
    }
    Ok(())
}

/// Returns the `genesis_time` for the given eth1 block timestamp.
pub fn eth2_genesis_time(eth1_timestamp: u64, spec: &ChainSpec) -> Result<u64, ArithError> {
    eth1_timestamp.safe_add(spec.genesis_delay)
}

/// Builds the set of genesis deposits, one per keypair, each depositing the maximum effective
/// balance.
///
/// The Merkle proof of deposit `i` is generated against the tree containing exactly the first
/// `i + 1` deposits, matching the incremental deposit root checked during genesis processing.
pub fn genesis_deposits(
    keypairs: &[bls::Keypair],
    spec: &ChainSpec,
) -> Result<Vec<Deposit>, String> {
    let mut tree = DepositDataTree::create(&[], 0, DEPOSIT_TREE_DEPTH);
    let mut deposits = vec![];

    for (i, keypair) in keypairs.iter().enumerate() {
        let pubkey = types::PublicKeyBytes::from(&keypair.pk);
        let mut data = types::DepositData {
            pubkey,
            withdrawal_credentials: Hash256::from_slice(&bls::get_withdrawal_credentials(
                &pubkey,
                spec.bls_withdrawal_prefix_byte,
            )),
            amount: spec.max_effective_balance,
            signature: types::SignatureBytes::empty(),
        };
        data.signature = data.create_signature(&keypair.sk, spec);

        tree.push_leaf(data.tree_hash_root())
            .map_err(|e| format!("Unable to push deposit leaf: {:?}", e))?;
        let (_, proof) = tree
            .generate_proof(i)
            .map_err(|e| format!("Unable to generate deposit proof: {:?}", e))?;

        deposits.push(Deposit {
            proof: types::FixedVector::new(proof)
                .map_err(|e| format!("Invalid deposit proof length: {:?}", e))?,
            data,
        });
    }

    Ok(deposits)
}

/// Builds a genesis state with one active validator per keypair, following the deterministic
/// "interop" convention.
pub fn interop_genesis_state<E: EthSpec>(
    keypairs: &[bls::Keypair],
    genesis_time: u64,
    eth1_block_hash: Hash256,
    spec: &ChainSpec,
) -> Result<BeaconState<E>, String> {
    let deposits = genesis_deposits(keypairs, spec)?;

    let mut state = initialize_beacon_state_from_eth1(eth1_block_hash, 0, deposits, spec)
        .map_err(|e| format!("Unable to initialize genesis state: {:?}", e))?;

    state.genesis_time = genesis_time;

    Ok(state)
}
