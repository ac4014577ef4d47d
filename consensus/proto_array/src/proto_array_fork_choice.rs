use crate::error::Error;
use crate::proto_array::{InvalidationOperation, ProposerBoost, ProtoArray, ProtoNode};
use crate::ssz_container::SszContainer;
use serde_derive::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use ssz_derive::{Decode, Encode};
use std::collections::{BTreeSet, HashMap};
use types::{ChainSpec, Checkpoint, Epoch, EthSpec, Hash256, Slot};

pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

#[derive(Default, PartialEq, Clone, Copy, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct VoteTracker {
    pub(crate) current_root: Hash256,
    pub(crate) next_root: Hash256,
    pub(crate) next_epoch: Epoch,
}

/// Indicates whether an execution engine has validated a block's execution payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// An EL has determined that the payload is valid.
    Valid(Hash256),
    /// An EL has determined that the payload is invalid.
    Invalid(Hash256),
    /// An EL has not yet verified the execution payload.
    Optimistic(Hash256),
    /// The block is either prior to the merge fork, or after the merge fork but before the
    /// terminal PoW block.
    Irrelevant,
}

impl ExecutionStatus {
    pub fn irrelevant() -> Self {
        ExecutionStatus::Irrelevant
    }

    pub fn block_hash(&self) -> Option<Hash256> {
        match self {
            ExecutionStatus::Valid(hash)
            | ExecutionStatus::Invalid(hash)
            | ExecutionStatus::Optimistic(hash) => Some(*hash),
            ExecutionStatus::Irrelevant => None,
        }
    }

    /// Returns `true` if the block:
    ///
    /// - Has a valid payload, or
    /// - Does not have execution enabled.
    pub fn is_valid_or_irrelevant(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Valid(_) | ExecutionStatus::Irrelevant
        )
    }

    /// Returns `true` if the block has a payload and it has not yet been verified by an EL.
    pub fn is_strictly_optimistic(&self) -> bool {
        matches!(self, ExecutionStatus::Optimistic(_))
    }

    /// Returns `true` if the block has a payload which was either (a) not verified or (b) found
    /// to be invalid.
    pub fn is_optimistic_or_invalid(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Optimistic(_) | ExecutionStatus::Invalid(_)
        )
    }

    /// Returns `true` if the block has a payload and an EL has determined it to be invalid.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ExecutionStatus::Invalid(_))
    }

    /// Returns `true` if the block has execution enabled.
    pub fn is_execution_enabled(&self) -> bool {
        !matches!(self, ExecutionStatus::Irrelevant)
    }
}

/// The execution status is encoded as a one-byte tag followed by the execution block hash
/// (zeroed for `Irrelevant`).
impl Encode for ExecutionStatus {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1 + 32
    }

    fn ssz_bytes_len(&self) -> usize {
        <Self as Encode>::ssz_fixed_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        let (tag, hash) = match self {
            ExecutionStatus::Valid(hash) => (0, *hash),
            ExecutionStatus::Invalid(hash) => (1, *hash),
            ExecutionStatus::Optimistic(hash) => (2, *hash),
            ExecutionStatus::Irrelevant => (3, Hash256::zero()),
        };
        buf.push(tag);
        buf.extend_from_slice(hash.as_bytes());
    }
}

impl Decode for ExecutionStatus {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1 + 32
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != <Self as Decode>::ssz_fixed_len() {
            return Err(DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: <Self as Decode>::ssz_fixed_len(),
            });
        }

        let hash = Hash256::from_slice(&bytes[1..]);
        match bytes[0] {
            0 => Ok(ExecutionStatus::Valid(hash)),
            1 => Ok(ExecutionStatus::Invalid(hash)),
            2 => Ok(ExecutionStatus::Optimistic(hash)),
            3 => Ok(ExecutionStatus::Irrelevant),
            other => Err(DecodeError::BytesInvalid(format!(
                "unknown execution status tag: {}",
                other
            ))),
        }
    }
}

/// A block that is to be applied to the fork choice.
///
/// A simplified version of `SignedBeaconBlock` plus the fork-choice-relevant values from its
/// post-state.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub slot: Slot,
    pub root: Hash256,
    pub parent_root: Option<Hash256>,
    pub state_root: Hash256,
    pub target_root: Hash256,
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub unrealized_justified_checkpoint: Option<Checkpoint>,
    pub unrealized_finalized_checkpoint: Option<Checkpoint>,
    /// Indicates if an execution node has marked this block as valid.
    pub execution_status: ExecutionStatus,
}

/// A Vec-wrapper which will grow to match any request.
///
/// E.g., a `get` or `insert` to an out-of-bounds element will cause the Vec to grow (using
/// Default) to the smallest size required to fulfill the request.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct ElasticList<T>(pub Vec<T>);

impl<T> ElasticList<T>
where
    T: Default,
{
    fn ensure(&mut self, i: usize) {
        if self.0.len() <= i {
            self.0.resize_with(i + 1, Default::default);
        }
    }

    pub fn get_mut(&mut self, i: usize) -> &mut T {
        self.ensure(i);
        &mut self.0[i]
    }

    pub fn get_ref(&self, i: usize) -> Option<&T> {
        self.0.get(i)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

#[derive(PartialEq, Clone, Debug)]
pub struct ProtoArrayForkChoice {
    pub(crate) proto_array: ProtoArray,
    pub(crate) votes: ElasticList<VoteTracker>,
    pub(crate) balances: Vec<u64>,
}

impl ProtoArrayForkChoice {
    #[allow(clippy::too_many_arguments)]
    pub fn new<E: EthSpec>(
        current_slot: Slot,
        finalized_block_slot: Slot,
        finalized_block_state_root: Hash256,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        execution_status: ExecutionStatus,
    ) -> Result<Self, Error> {
        let mut proto_array = ProtoArray {
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            justified_checkpoint,
            finalized_checkpoint,
            nodes: Vec::with_capacity(1),
            indices: HashMap::with_capacity(1),
            previous_proposer_boost: ProposerBoost::default(),
        };

        let block = Block {
            slot: finalized_block_slot,
            root: finalized_checkpoint.root,
            parent_root: None,
            state_root: finalized_block_state_root,
            // We are using the finalized_root as the target_root, since it always lies on an
            // epoch boundary.
            target_root: finalized_checkpoint.root,
            justified_checkpoint,
            finalized_checkpoint,
            unrealized_justified_checkpoint: Some(justified_checkpoint),
            unrealized_finalized_checkpoint: Some(finalized_checkpoint),
            execution_status,
        };

        proto_array.on_block::<E>(block, current_slot)?;

        Ok(Self {
            proto_array,
            votes: ElasticList::default(),
            balances: vec![],
        })
    }

    /// Process an attestation which references `block_root` in the attestation's `target.root`.
    pub fn process_attestation(
        &mut self,
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    ) -> Result<(), Error> {
        let vote = self.votes.get_mut(validator_index);

        if target_epoch > vote.next_epoch || *vote == VoteTracker::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }

        Ok(())
    }

    /// Process a block that was seen on the network.
    pub fn process_block<E: EthSpec>(
        &mut self,
        block: Block,
        current_slot: Slot,
    ) -> Result<(), Error> {
        if block.parent_root.is_none() {
            return Err(Error::NodeUnknown(block.root));
        }

        self.proto_array.on_block::<E>(block, current_slot)
    }

    /// Find the head, starting from the justified checkpoint.
    #[allow(clippy::too_many_arguments)]
    pub fn find_head<E: EthSpec>(
        &mut self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        justified_state_balances: &[u64],
        proposer_boost_root: Hash256,
        equivocating_indices: &BTreeSet<u64>,
        current_slot: Slot,
        spec: &ChainSpec,
    ) -> Result<Hash256, Error> {
        let old_balances = std::mem::take(&mut self.balances);
        let new_balances = justified_state_balances;

        let deltas = compute_deltas(
            &self.proto_array.indices,
            &mut self.votes,
            &old_balances,
            new_balances,
            equivocating_indices,
        )?;

        self.proto_array.apply_score_changes::<E>(
            deltas,
            justified_checkpoint,
            finalized_checkpoint,
            new_balances,
            proposer_boost_root,
            current_slot,
            spec,
        )?;

        self.balances = new_balances.to_vec();

        self.proto_array
            .find_head::<E>(&justified_checkpoint.root, current_slot)
    }

    /// See `ProtoArray::propagate_execution_payload_validation` for documentation.
    pub fn process_execution_payload_validation(
        &mut self,
        block_root: Hash256,
    ) -> Result<(), Error> {
        self.proto_array
            .propagate_execution_payload_validation(block_root)
    }

    /// See `ProtoArray::propagate_execution_payload_invalidation` for documentation.
    pub fn process_execution_payload_invalidation(
        &mut self,
        op: &InvalidationOperation,
    ) -> Result<(), Error> {
        self.proto_array.propagate_execution_payload_invalidation(op)
    }

    pub fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<(), Error> {
        self.proto_array.maybe_prune(finalized_root)
    }

    pub fn set_prune_threshold(&mut self, prune_threshold: usize) {
        self.proto_array.prune_threshold = prune_threshold;
    }

    pub fn len(&self) -> usize {
        self.proto_array.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proto_array.nodes.is_empty()
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.indices.contains_key(block_root)
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<Block> {
        let block_index = self.proto_array.indices.get(block_root)?;
        let block = self.proto_array.nodes.get(*block_index)?;
        let parent_root = block
            .parent
            .and_then(|i| self.proto_array.nodes.get(i))
            .map(|parent| parent.root);

        Some(Block {
            slot: block.slot,
            root: block.root,
            parent_root,
            state_root: block.state_root,
            target_root: block.target_root,
            justified_checkpoint: block.justified_checkpoint?,
            finalized_checkpoint: block.finalized_checkpoint?,
            unrealized_justified_checkpoint: block.unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint: block.unrealized_finalized_checkpoint,
            execution_status: block.execution_status,
        })
    }

    /// Returns the `block.execution_status` field, if the block is present.
    pub fn get_block_execution_status(&self, block_root: &Hash256) -> Option<ExecutionStatus> {
        let block_index = self.proto_array.indices.get(block_root)?;
        let block = self.proto_array.nodes.get(*block_index)?;
        Some(block.execution_status)
    }

    /// Returns the weight of a given block.
    pub fn get_weight(&self, block_root: &Hash256) -> Option<u64> {
        let block_index = self.proto_array.indices.get(block_root)?;
        self.proto_array
            .nodes
            .get(*block_index)
            .map(|node| node.weight)
    }

    /// Returns the node with the given `block_root`, if any.
    pub fn get_node(&self, block_root: &Hash256) -> Option<&ProtoNode> {
        let index = self.proto_array.indices.get(block_root)?;
        self.proto_array.nodes.get(*index)
    }

    /// Returns `true` if `block_root` is equal to the finalized root, or a known descendant of
    /// it.
    ///
    /// Always returns `false` if either input root is unknown.
    ///
    /// ## Notes
    ///
    /// Still returns `true` if `block_root` is known and a descendant of the finalized root,
    /// even if it is no longer canonical.
    pub fn is_finalized_checkpoint_or_descendant<E: EthSpec>(&self, block_root: Hash256) -> bool {
        let finalized_root = self.proto_array.finalized_checkpoint.root;
        let finalized_slot = self
            .proto_array
            .finalized_checkpoint
            .epoch
            .start_slot(E::slots_per_epoch());

        let mut node = if let Some(node) = self
            .proto_array
            .indices
            .get(&block_root)
            .and_then(|index| self.proto_array.nodes.get(*index))
        {
            node
        } else {
            // An unknown root is not a finalized descendant. This line can only be reached if
            // the user supplies a root that is not known to fork choice.
            return false;
        };

        // The finalized and justified checkpoints represent a list of known ancestors of
        // `node` that are likely to coincide with the store's finalized checkpoint.
        //
        // Run this check once, outside of the loop rather than inside the loop.
        // If the conditions don't match for this node then they're unlikely to
        // start matching for its ancestors.
        for checkpoint in &[
            node.finalized_checkpoint,
            node.justified_checkpoint,
            node.unrealized_finalized_checkpoint,
            node.unrealized_justified_checkpoint,
        ] {
            if checkpoint.map_or(false, |cp| cp.root == finalized_root) {
                return true;
            }
        }

        while node.slot > finalized_slot {
            let parent = if let Some(parent_index) = node.parent {
                self.proto_array.nodes.get(parent_index)
            } else {
                None
            };

            node = if let Some(parent) = parent {
                parent
            } else {
                return false;
            };
        }

        node.root == finalized_root
    }

    /// Returns the latest message for a given validator, if any.
    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        if validator_index < self.votes.0.len() {
            let vote = &self.votes.0[validator_index];

            if *vote == VoteTracker::default() {
                None
            } else {
                Some((vote.next_root, vote.next_epoch))
            }
        } else {
            None
        }
    }

    /// Returns a read-lock free view of the underlying proto array.
    pub fn core_proto_array(&self) -> &ProtoArray {
        &self.proto_array
    }

    /// See `ProtoArray` documentation.
    pub fn core_proto_array_mut(&mut self) -> &mut ProtoArray {
        &mut self.proto_array
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        SszContainer::from(self).as_ssz_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let container = SszContainer::from_ssz_bytes(bytes)
            .map_err(|e| format!("Failed to decode ProtoArrayForkChoice: {:?}", e))?;
        container
            .try_into()
            .map_err(|e| format!("Failed to initialize ProtoArrayForkChoice: {:?}", e))
    }
}

/// Returns a list of `deltas`, where there is one delta for each of the indices in
/// `indices`.
///
/// The deltas are formed by a change between `old_balances` and `new_balances`, and/or a change
/// of vote in `votes`.
///
/// ## Errors
///
/// - If a value in `indices` is greater to or equal to `indices.len()`.
/// - If some `Hash256` in `votes` is not a key in `indices` (except for `Hash256::zero()`, this
///   is always valid).
fn compute_deltas(
    indices: &HashMap<Hash256, usize>,
    votes: &mut ElasticList<VoteTracker>,
    old_balances: &[u64],
    new_balances: &[u64],
    equivocating_indices: &BTreeSet<u64>,
) -> Result<Vec<i64>, Error> {
    let mut deltas = vec![0_i64; indices.len()];

    for (val_index, vote) in votes.iter_mut().enumerate() {
        // There is no need to create a score change if the validator has never voted or both
        // their votes are for the zero hash (alias to the genesis block).
        if vote.current_root == Hash256::zero() && vote.next_root == Hash256::zero() {
            continue;
        }

        // If the validator was slashed for an equivocation, any existing weight is removed and
        // no new weight is ever added; the votes are poisoned with the zero hash.
        if equivocating_indices.contains(&(val_index as u64)) {
            if vote.current_root != Hash256::zero() {
                if let Some(current_delta_index) = indices.get(&vote.current_root).copied() {
                    let old_balance = old_balances.get(val_index).copied().unwrap_or(0);
                    let delta = deltas
                        .get(current_delta_index)
                        .ok_or(Error::InvalidNodeDelta(current_delta_index))?
                        .checked_sub(old_balance as i64)
                        .ok_or(Error::DeltaOverflow(current_delta_index))?;

                    // Array access safe due to check on previous line.
                    deltas[current_delta_index] = delta;
                }
            }

            vote.current_root = Hash256::zero();
            vote.next_root = Hash256::zero();
            continue;
        }

        // If the validator's vote is not known in the `indices`, use a balance of zero.
        //
        // It is possible that the balance list is not the same length as the vote list. This
        // comes from the fact that we do not prune the balance list when validators are
        // slashed/exited.
        let old_balance = old_balances.get(val_index).copied().unwrap_or(0);
        let new_balance = new_balances.get(val_index).copied().unwrap_or(0);

        if vote.current_root != vote.next_root || old_balance != new_balance {
            // We ignore the vote if it is not known in `indices`. We assume that it is outside
            // of our tree (i.e., pre-finalization) and therefore not interesting.
            if let Some(current_delta_index) = indices.get(&vote.current_root).copied() {
                let delta = deltas
                    .get(current_delta_index)
                    .ok_or(Error::InvalidNodeDelta(current_delta_index))?
                    .checked_sub(old_balance as i64)
                    .ok_or(Error::DeltaOverflow(current_delta_index))?;

                // Array access safe due to check on previous line.
                deltas[current_delta_index] = delta;
            }

            // We ignore the vote if it is not known in `indices`. We assume that it is outside
            // of our tree (i.e., pre-finalization) and therefore not interesting.
            if let Some(next_delta_index) = indices.get(&vote.next_root).copied() {
                let delta = deltas
                    .get(next_delta_index)
                    .ok_or(Error::InvalidNodeDelta(next_delta_index))?
                    .checked_add(new_balance as i64)
                    .ok_or(Error::DeltaOverflow(next_delta_index))?;

                // Array access safe due to check on previous line.
                deltas[next_delta_index] = delta;
            }

            vote.current_root = vote.next_root;
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    type E = MinimalEthSpec;

    fn checkpoint(epoch: u64, root_byte: u8) -> Checkpoint {
        Checkpoint {
            epoch: Epoch::new(epoch),
            root: Hash256::repeat_byte(root_byte),
        }
    }

    fn new_fork_choice() -> (ProtoArrayForkChoice, Checkpoint) {
        let genesis_checkpoint = checkpoint(0, 1);
        let fc = ProtoArrayForkChoice::new::<E>(
            Slot::new(0),
            Slot::new(0),
            Hash256::zero(),
            genesis_checkpoint,
            genesis_checkpoint,
            ExecutionStatus::irrelevant(),
        )
        .unwrap();
        (fc, genesis_checkpoint)
    }

    fn block(slot: u64, root: Hash256, parent: Hash256, genesis_checkpoint: Checkpoint) -> Block {
        Block {
            slot: Slot::new(slot),
            root,
            parent_root: Some(parent),
            state_root: Hash256::zero(),
            target_root: genesis_checkpoint.root,
            justified_checkpoint: genesis_checkpoint,
            finalized_checkpoint: genesis_checkpoint,
            unrealized_justified_checkpoint: Some(genesis_checkpoint),
            unrealized_finalized_checkpoint: Some(genesis_checkpoint),
            execution_status: ExecutionStatus::irrelevant(),
        }
    }

    #[test]
    fn votes_move_the_head() {
        let (mut fc, genesis_checkpoint) = new_fork_choice();
        let genesis_root = genesis_checkpoint.root;
        let spec = E::default_spec();

        let block_a = Hash256::repeat_byte(2);
        let block_b = Hash256::repeat_byte(3);

        fc.process_block::<E>(block(1, block_a, genesis_root, genesis_checkpoint), Slot::new(1))
            .unwrap();
        fc.process_block::<E>(block(1, block_b, genesis_root, genesis_checkpoint), Slot::new(1))
            .unwrap();

        let balances = vec![1; 2];
        let no_equivocations = BTreeSet::new();

        // With no votes, the tie is broken by the highest root.
        let head = fc
            .find_head::<E>(
                genesis_checkpoint,
                genesis_checkpoint,
                &balances,
                Hash256::zero(),
                &no_equivocations,
                Slot::new(1),
                &spec,
            )
            .unwrap();
        assert_eq!(head, std::cmp::max(block_a, block_b));

        // Two votes for the lower root move the head.
        let lower = std::cmp::min(block_a, block_b);
        fc.process_attestation(0, lower, Epoch::new(0)).unwrap();
        fc.process_attestation(1, lower, Epoch::new(0)).unwrap();

        let head = fc
            .find_head::<E>(
                genesis_checkpoint,
                genesis_checkpoint,
                &balances,
                Hash256::zero(),
                &no_equivocations,
                Slot::new(1),
                &spec,
            )
            .unwrap();
        assert_eq!(head, lower);
    }

    #[test]
    fn equivocating_validators_lose_their_weight() {
        let (mut fc, genesis_checkpoint) = new_fork_choice();
        let genesis_root = genesis_checkpoint.root;
        let spec = E::default_spec();

        let block_a = Hash256::repeat_byte(2);
        let block_b = Hash256::repeat_byte(3);

        fc.process_block::<E>(block(1, block_a, genesis_root, genesis_checkpoint), Slot::new(1))
            .unwrap();
        fc.process_block::<E>(block(1, block_b, genesis_root, genesis_checkpoint), Slot::new(1))
            .unwrap();

        let lower = std::cmp::min(block_a, block_b);
        let higher = std::cmp::max(block_a, block_b);

        // Three validators on the lower block, one on the higher.
        for i in 0..3 {
            fc.process_attestation(i, lower, Epoch::new(0)).unwrap();
        }
        fc.process_attestation(3, higher, Epoch::new(0)).unwrap();

        let balances = vec![1; 4];
        let no_equivocations = BTreeSet::new();

        let head = fc
            .find_head::<E>(
                genesis_checkpoint,
                genesis_checkpoint,
                &balances,
                Hash256::zero(),
                &no_equivocations,
                Slot::new(1),
                &spec,
            )
            .unwrap();
        assert_eq!(head, lower);

        // Slash two of the validators on the lower block; the head flips.
        let equivocations: BTreeSet<u64> = vec![0, 1].into_iter().collect();
        let head = fc
            .find_head::<E>(
                genesis_checkpoint,
                genesis_checkpoint,
                &balances,
                Hash256::zero(),
                &equivocations,
                Slot::new(1),
                &spec,
            )
            .unwrap();
        assert_eq!(head, higher);

        // Their weight is never re-added, even if they attest again.
        fc.process_attestation(0, lower, Epoch::new(1)).unwrap();
        let head = fc
            .find_head::<E>(
                genesis_checkpoint,
                genesis_checkpoint,
                &balances,
                Hash256::zero(),
                &equivocations,
                Slot::new(2),
                &spec,
            )
            .unwrap();
        assert_eq!(head, higher);
    }

    #[test]
    fn pruning_keeps_descendants() {
        let (mut fc, genesis_checkpoint) = new_fork_choice();
        let genesis_root = genesis_checkpoint.root;

        // genesis <- a <- b
        let block_a = Hash256::repeat_byte(2);
        let block_b = Hash256::repeat_byte(3);
        fc.process_block::<E>(block(1, block_a, genesis_root, genesis_checkpoint), Slot::new(1))
            .unwrap();
        fc.process_block::<E>(block(2, block_b, block_a, genesis_checkpoint), Slot::new(2))
            .unwrap();

        fc.set_prune_threshold(0);
        fc.maybe_prune(block_a).unwrap();

        assert!(!fc.contains_block(&genesis_root));
        assert!(fc.contains_block(&block_a));
        assert!(fc.contains_block(&block_b));
        assert_eq!(fc.get_block(&block_b).unwrap().parent_root, Some(block_a));
    }

    #[test]
    fn ssz_round_trip() {
        let (mut fc, genesis_checkpoint) = new_fork_choice();
        let genesis_root = genesis_checkpoint.root;

        let block_a = Hash256::repeat_byte(2);
        fc.process_block::<E>(block(1, block_a, genesis_root, genesis_checkpoint), Slot::new(1))
            .unwrap();
        fc.process_attestation(0, block_a, Epoch::new(0)).unwrap();

        let bytes = fc.as_bytes();
        let decoded = ProtoArrayForkChoice::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, fc);
    }
}
