use crate::error::{Error, InvalidBestNodeInfo};
use crate::proto_array_fork_choice::{Block, ExecutionStatus};
use serde_derive::{Deserialize, Serialize};
use ssz::four_byte_option_impl;
use ssz_derive::{Decode, Encode};
use std::collections::{HashMap, HashSet};
use types::{ChainSpec, Checkpoint, Epoch, EthSpec, Hash256, Slot};

// Define a "legacy" implementation of `Option<usize>` which uses four bytes for encoding the
// union selector.
four_byte_option_impl!(four_byte_option_usize, usize);
four_byte_option_impl!(four_byte_option_checkpoint, Checkpoint);

/// The aggregated weight the block proposer of the current slot is credited with, to defend
/// against balancing attacks.
#[derive(Default, PartialEq, Clone, Copy, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct ProposerBoost {
    pub root: Hash256,
    pub score: u64,
}

/// A block within the fork-choice DAG.
///
/// Parent, best-child and best-descendant are indices into the flat `ProtoArray::nodes` table;
/// there are no direct references between nodes, which keeps the structure acyclic and makes
/// pruning O(n).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct ProtoNode {
    /// The `slot` is not necessary for `ProtoArray`, it just exists so external components can
    /// easily query the block slot. This is useful for upstream fork choice logic.
    pub slot: Slot,
    /// The `state_root` is not necessary for `ProtoArray` either, it also just exists for
    /// upstream components (namely pre-state lookups).
    pub state_root: Hash256,
    /// The root that would be used for the `attestation.data.target.root` if an LMD vote was
    /// cast for this block.
    pub target_root: Hash256,
    pub root: Hash256,
    #[ssz(with = "four_byte_option_usize")]
    pub parent: Option<usize>,
    /// The justified checkpoint carried by this block's post-state.
    #[ssz(with = "four_byte_option_checkpoint")]
    pub justified_checkpoint: Option<Checkpoint>,
    /// The finalized checkpoint carried by this block's post-state.
    #[ssz(with = "four_byte_option_checkpoint")]
    pub finalized_checkpoint: Option<Checkpoint>,
    pub weight: u64,
    #[ssz(with = "four_byte_option_usize")]
    pub best_child: Option<usize>,
    #[ssz(with = "four_byte_option_usize")]
    pub best_descendant: Option<usize>,
    /// The justified checkpoint the block's state *would* have if epoch processing were run on
    /// it, even though the epoch boundary has not been crossed yet.
    #[ssz(with = "four_byte_option_checkpoint")]
    pub unrealized_justified_checkpoint: Option<Checkpoint>,
    /// As `unrealized_justified_checkpoint`, but for finalization.
    #[ssz(with = "four_byte_option_checkpoint")]
    pub unrealized_finalized_checkpoint: Option<Checkpoint>,
    /// Indicates if an execution node has marked this block as valid. Also contains the execution
    /// block hash.
    pub execution_status: ExecutionStatus,
}

/// Indicates the block (and its descendants) that should be marked as invalid due to a failed
/// execution payload.
#[derive(Clone, Debug, PartialEq)]
pub enum InvalidationOperation {
    /// Invalidate only `block_root` and its descendants.
    InvalidateOne { block_root: Hash256 },
    /// Invalidate `head_block_root` and all of its ancestors with a payload later than
    /// `latest_valid_ancestor`, along with all their descendants.
    InvalidateMany {
        head_block_root: Hash256,
        always_invalidate_head: bool,
        latest_valid_ancestor: Hash256,
    },
}

impl InvalidationOperation {
    pub fn block_root(&self) -> Hash256 {
        match self {
            InvalidationOperation::InvalidateOne { block_root } => *block_root,
            InvalidationOperation::InvalidateMany {
                head_block_root, ..
            } => *head_block_root,
        }
    }

    pub fn latest_valid_ancestor(&self) -> Option<Hash256> {
        match self {
            InvalidationOperation::InvalidateOne { .. } => None,
            InvalidationOperation::InvalidateMany {
                latest_valid_ancestor,
                ..
            } => Some(*latest_valid_ancestor),
        }
    }

    pub fn invalidate_block_root(&self) -> bool {
        match self {
            InvalidationOperation::InvalidateOne { .. } => true,
            InvalidationOperation::InvalidateMany {
                always_invalidate_head,
                ..
            } => *always_invalidate_head,
        }
    }
}

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct ProtoArray {
    /// Do not attempt to prune the tree unless it has at least this many nodes. Small prunes
    /// simply waste time.
    pub prune_threshold: usize,
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub nodes: Vec<ProtoNode>,
    pub indices: HashMap<Hash256, usize>,
    pub previous_proposer_boost: ProposerBoost,
}

impl ProtoArray {
    /// Iterate backwards through the array, touching all nodes and their parents and potentially
    /// the best-child of each parent.
    ///
    /// The structure of the `self.nodes` array ensures that the child of each node is always
    /// touched before its parent.
    ///
    /// For each node, the following is done:
    ///
    /// - Update the node's weight with the corresponding delta (and proposer boost).
    /// - Back-propagate each node's delta to its parents delta.
    /// - Compare the current node with the parents best-child, updating it if the current node
    ///   should become the best child.
    /// - If required, update the parents best-descendant with the current node or its
    ///   best-descendant.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_score_changes<E: EthSpec>(
        &mut self,
        mut deltas: Vec<i64>,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        new_justified_balances: &[u64],
        proposer_boost_root: Hash256,
        current_slot: Slot,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        if deltas.len() != self.indices.len() {
            return Err(Error::InvalidDeltaLen {
                deltas: deltas.len(),
                indices: self.indices.len(),
            });
        }

        if justified_checkpoint != self.justified_checkpoint
            || finalized_checkpoint != self.finalized_checkpoint
        {
            self.justified_checkpoint = justified_checkpoint;
            self.finalized_checkpoint = finalized_checkpoint;
        }

        // Default the proposer boost score to zero.
        let mut proposer_score = 0;

        // Iterate backwards through all indices in `self.nodes`.
        for node_index in (0..self.nodes.len()).rev() {
            let node = self
                .nodes
                .get_mut(node_index)
                .ok_or(Error::InvalidNodeIndex(node_index))?;

            // There is no need to adjust the balances or manage parent of the zero hash since it
            // is an alias to the genesis block. The weight applied to the genesis block is
            // irrelevant as we _always_ choose it and it's impossible for it to have a parent.
            if node.root == Hash256::zero() {
                continue;
            }

            let mut node_delta = deltas
                .get(node_index)
                .copied()
                .ok_or(Error::InvalidNodeDelta(node_index))?;

            // If we find the node for which the proposer boost was previously applied, decrease
            // the delta by the previous score amount.
            if self.previous_proposer_boost.root != Hash256::zero()
                && self.previous_proposer_boost.root == node.root
            {
                node_delta = node_delta
                    .checked_sub(self.previous_proposer_boost.score as i64)
                    .ok_or(Error::DeltaOverflow(node_index))?;
            }
            // If we find the node matching the current proposer boost root, increase the delta
            // by the new score amount.
            if proposer_boost_root != Hash256::zero() && proposer_boost_root == node.root {
                proposer_score =
                    calculate_committee_fraction::<E>(new_justified_balances, spec.proposer_score_boost)
                        .ok_or(Error::ProposerBoostOverflow(node_index))?;
                node_delta = node_delta
                    .checked_add(proposer_score as i64)
                    .ok_or(Error::DeltaOverflow(node_index))?;
            }

            // Apply the delta to the node.
            if node_delta < 0 {
                // Note: I am conflicted about whether to use `saturating_sub` or `checked_sub`
                // here.
                //
                // I can't think of any valid reason why `node_delta.abs()` should be greater
                // than `node.weight`, so I have chosen `checked_sub` to try and fail-fast if
                // there is some error.
                //
                // However, I am not fully convinced that some valid case for `saturating_sub`
                // does not exist.
                node.weight = node
                    .weight
                    .checked_sub(node_delta.unsigned_abs())
                    .ok_or(Error::DeltaOverflow(node_index))?;
            } else {
                node.weight = node
                    .weight
                    .checked_add(node_delta as u64)
                    .ok_or(Error::DeltaOverflow(node_index))?;
            }

            // Update the parent delta (if any).
            if let Some(parent_index) = node.parent {
                let parent_delta = deltas
                    .get_mut(parent_index)
                    .ok_or(Error::InvalidParentDelta(parent_index))?;

                // Back-propagate the nodes delta to its parent.
                *parent_delta += node_delta;
            }
        }

        // After applying all deltas, update the `previous_proposer_boost`.
        self.previous_proposer_boost = ProposerBoost {
            root: proposer_boost_root,
            score: proposer_score,
        };

        // A second time, iterate backwards through all indices in `self.nodes`.
        //
        // We _must_ perform these functions separate from the weight-updating loop above to
        // ensure that we have a fully coherent set of weights before updating parent
        // best-child/descendant.
        for node_index in (0..self.nodes.len()).rev() {
            let node = self
                .nodes
                .get(node_index)
                .ok_or(Error::InvalidNodeIndex(node_index))?;

            // If the node has a parent, try to update its best-child and best-descendant.
            if let Some(parent_index) = node.parent {
                self.maybe_update_best_child_and_descendant::<E>(
                    parent_index,
                    node_index,
                    current_slot,
                )?;
            }
        }

        Ok(())
    }

    /// Register a block with the fork choice.
    ///
    /// It is only sane to supply a `None` parent for the genesis block.
    pub fn on_block<E: EthSpec>(&mut self, block: Block, current_slot: Slot) -> Result<(), Error> {
        // If the block is already known, simply ignore it.
        if self.indices.contains_key(&block.root) {
            return Ok(());
        }

        let node_index = self.nodes.len();

        let node = ProtoNode {
            slot: block.slot,
            root: block.root,
            target_root: block.target_root,
            state_root: block.state_root,
            parent: block
                .parent_root
                .and_then(|parent| self.indices.get(&parent).copied()),
            justified_checkpoint: Some(block.justified_checkpoint),
            finalized_checkpoint: Some(block.finalized_checkpoint),
            weight: 0,
            best_child: None,
            best_descendant: None,
            unrealized_justified_checkpoint: block.unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint: block.unrealized_finalized_checkpoint,
            execution_status: block.execution_status,
        };

        // If the parent has an invalid execution status, return an error before adding the block
        // to the DAG.
        if let Some(parent_index) = node.parent {
            let parent = self
                .nodes
                .get(parent_index)
                .ok_or(Error::InvalidParentIndex(parent_index))?;
            if parent.execution_status.is_invalid() {
                return Err(Error::NodeUnknown(block.root));
            }
        }

        self.indices.insert(node.root, node_index);
        self.nodes.push(node.clone());

        if let Some(parent_index) = node.parent {
            self.maybe_update_best_child_and_descendant::<E>(parent_index, node_index, current_slot)?;
        }

        Ok(())
    }

    /// Invalidate zero or more blocks, as per the `InvalidationOperation`.
    ///
    /// The block identified by `op` is invalidated (perhaps conditionally), along with all of
    /// its descendants. Ancestors between the block and the latest valid ancestor (if known)
    /// are also invalidated; ancestors at or below the latest valid ancestor are marked valid.
    pub fn propagate_execution_payload_invalidation(
        &mut self,
        op: &InvalidationOperation,
    ) -> Result<(), Error> {
        let mut invalidated_indices: HashSet<usize> = HashSet::default();
        let head_block_root = op.block_root();

        let head_index = *self
            .indices
            .get(&head_block_root)
            .ok_or(Error::NodeUnknown(head_block_root))?;

        // Collect the ancestors of the head block which must transition to invalid or valid.
        let mut latest_valid_ancestor_found = false;
        let mut index = head_index;
        let mut first = true;
        loop {
            let node = self
                .nodes
                .get(index)
                .ok_or(Error::InvalidNodeIndex(index))?;

            let latest_valid_hash = op.latest_valid_ancestor();
            let is_latest_valid_ancestor = latest_valid_hash
                .map_or(false, |hash| node.execution_status.block_hash() == Some(hash));

            if is_latest_valid_ancestor {
                // This is the latest valid ancestor; it and everything below it stays (or
                // becomes) valid.
                latest_valid_ancestor_found = true;
                break;
            }

            if first && !op.invalidate_block_root() {
                // The head itself is spared invalidation.
                first = false;
            } else {
                match node.execution_status {
                    ExecutionStatus::Valid(hash) => {
                        // It would be a consensus failure for a valid payload to become invalid.
                        return Err(Error::ValidExecutionStatusBecameInvalid {
                            block_root: node.root,
                            payload_block_hash: hash,
                        });
                    }
                    ExecutionStatus::Optimistic(hash) | ExecutionStatus::Invalid(hash) => {
                        invalidated_indices.insert(index);
                        let node = self
                            .nodes
                            .get_mut(index)
                            .ok_or(Error::InvalidNodeIndex(index))?;
                        node.execution_status = ExecutionStatus::Invalid(hash);

                        // Clear the best descendant; it can no longer be valid for the head.
                        node.best_child = None;
                        node.best_descendant = None;
                    }
                    ExecutionStatus::Irrelevant => break,
                }
                first = false;
            }

            if op.latest_valid_ancestor().is_none() {
                // Without a latest-valid-ancestor hash only the block itself (and descendants,
                // below) are invalidated.
                break;
            }

            if let Some(parent_index) = self
                .nodes
                .get(index)
                .ok_or(Error::InvalidNodeIndex(index))?
                .parent
            {
                index = parent_index;
            } else {
                break;
            }
        }

        // Mark the ancestors at/below the latest valid ancestor as valid.
        if latest_valid_ancestor_found {
            let mut index = index;
            loop {
                let node = self
                    .nodes
                    .get_mut(index)
                    .ok_or(Error::InvalidNodeIndex(index))?;
                if let ExecutionStatus::Optimistic(hash) = node.execution_status {
                    node.execution_status = ExecutionStatus::Valid(hash);
                }
                if let Some(parent_index) = node.parent {
                    index = parent_index;
                } else {
                    break;
                }
            }
        }

        // Invalidate all descendants of invalidated blocks. Descendants always have a higher
        // index than their ancestors, so a single forward pass suffices.
        for index in 0..self.nodes.len() {
            let node = self
                .nodes
                .get(index)
                .ok_or(Error::InvalidNodeIndex(index))?;

            if let Some(parent_index) = node.parent {
                if invalidated_indices.contains(&parent_index) {
                    let node = self
                        .nodes
                        .get_mut(index)
                        .ok_or(Error::InvalidNodeIndex(index))?;
                    match node.execution_status {
                        ExecutionStatus::Valid(hash) => {
                            return Err(Error::ValidExecutionStatusBecameInvalid {
                                block_root: node.root,
                                payload_block_hash: hash,
                            })
                        }
                        ExecutionStatus::Optimistic(hash) | ExecutionStatus::Invalid(hash) => {
                            node.execution_status = ExecutionStatus::Invalid(hash)
                        }
                        // An irrelevant node cannot be a descendant of a node with a payload.
                        ExecutionStatus::Irrelevant => {
                            return Err(Error::IrrelevantDescendant {
                                block_root: node.root,
                            })
                        }
                    }
                    node.best_child = None;
                    node.best_descendant = None;

                    invalidated_indices.insert(index);
                }
            }
        }

        Ok(())
    }

    /// Marks the block with the given root - and all of its optimistic ancestors - as valid.
    pub fn propagate_execution_payload_validation(
        &mut self,
        block_root: Hash256,
    ) -> Result<(), Error> {
        let mut index = *self
            .indices
            .get(&block_root)
            .ok_or(Error::NodeUnknown(block_root))?;

        loop {
            let node = self
                .nodes
                .get_mut(index)
                .ok_or(Error::InvalidNodeIndex(index))?;

            match node.execution_status {
                // There is no work to do; a valid node has valid ancestors.
                ExecutionStatus::Valid(_) => return Ok(()),
                // An irrelevant node (and all its ancestors) has no payload to validate.
                ExecutionStatus::Irrelevant => return Ok(()),
                ExecutionStatus::Optimistic(hash) => {
                    node.execution_status = ExecutionStatus::Valid(hash)
                }
                ExecutionStatus::Invalid(hash) => {
                    return Err(Error::InvalidAncestorOfValidPayload {
                        ancestor_block_root: node.root,
                        ancestor_payload_block_hash: hash,
                    })
                }
            }

            if let Some(parent_index) = node.parent {
                index = parent_index;
            } else {
                return Ok(());
            }
        }
    }

    /// Follows the best-descendant links to find the best-block (i.e., head-block).
    ///
    /// ## Notes
    ///
    /// The result of this function is not guaranteed to be accurate if `Self::on_block` has
    /// been called without a subsequent `Self::apply_score_changes` call. This is because
    /// `on_block` does not attempt to walk backwards through the tree and update the
    /// best-child/best-descendant links.
    pub fn find_head<E: EthSpec>(
        &self,
        justified_root: &Hash256,
        current_slot: Slot,
    ) -> Result<Hash256, Error> {
        let justified_index = self
            .indices
            .get(justified_root)
            .copied()
            .ok_or(Error::JustifiedNodeUnknown(*justified_root))?;

        let justified_node = self
            .nodes
            .get(justified_index)
            .ok_or(Error::InvalidJustifiedIndex(justified_index))?;

        let best_descendant_index = justified_node.best_descendant.unwrap_or(justified_index);

        let best_node = self
            .nodes
            .get(best_descendant_index)
            .ok_or(Error::InvalidBestDescendant(best_descendant_index))?;

        // Perform a sanity check that the node is indeed valid to be the head.
        if !self.node_is_viable_for_head::<E>(best_node, current_slot) {
            return Err(Error::InvalidBestNode(Box::new(InvalidBestNodeInfo {
                current_slot,
                start_root: *justified_root,
                justified_checkpoint: self.justified_checkpoint,
                finalized_checkpoint: self.finalized_checkpoint,
                head_root: best_node.root,
                head_justified_checkpoint: best_node.justified_checkpoint,
                head_finalized_checkpoint: best_node.finalized_checkpoint,
            })));
        }

        Ok(best_node.root)
    }

    /// Update the tree with new finalization information. The tree is only actually pruned if
    /// both of the two following criteria are met:
    ///
    /// - The supplied finalized epoch and root are different to the current values.
    /// - The number of nodes in `self` is at least `self.prune_threshold`.
    pub fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<(), Error> {
        let finalized_index = *self
            .indices
            .get(&finalized_root)
            .ok_or(Error::FinalizedNodeUnknown(finalized_root))?;

        if finalized_index < self.prune_threshold {
            // Pruning at small numbers incurs more cost than benefit.
            return Ok(());
        }

        // Remove the `self.indices` key/values for all the to-be-deleted nodes.
        for node_index in 0..finalized_index {
            let root = &self
                .nodes
                .get(node_index)
                .ok_or(Error::InvalidNodeIndex(node_index))?
                .root;
            self.indices.remove(root);
        }

        // Drop all the nodes prior to finalization.
        self.nodes = self.nodes.split_off(finalized_index);

        // Adjust the indices map.
        for (_root, index) in self.indices.iter_mut() {
            *index = index
                .checked_sub(finalized_index)
                .ok_or(Error::IndexOverflow("indices"))?;
        }

        // Iterate through all the existing nodes and adjust their indices to match the new
        // layout of `self.nodes`.
        for node in self.nodes.iter_mut() {
            if let Some(parent) = node.parent {
                // If `node.parent` is less than `finalized_index`, set it to `None`.
                node.parent = parent.checked_sub(finalized_index);
            }
            if let Some(best_child) = node.best_child {
                node.best_child = Some(
                    best_child
                        .checked_sub(finalized_index)
                        .ok_or(Error::IndexOverflow("best_child"))?,
                );
            }
            if let Some(best_descendant) = node.best_descendant {
                node.best_descendant = Some(
                    best_descendant
                        .checked_sub(finalized_index)
                        .ok_or(Error::IndexOverflow("best_descendant"))?,
                );
            }
        }

        Ok(())
    }

    /// Observe the parent at `parent_index` with respect to the child at `child_index` and
    /// potentially modify the `parent.best_child` and `parent.best_descendant` values.
    ///
    /// ## Detail
    ///
    /// There are four outcomes:
    ///
    /// - The child is already the best child but it's now invalid due to a FFG change and should
    ///   be removed.
    /// - The child is already the best child and the parent is updated with the new
    ///   best-descendant.
    /// - The child is not the best child but becomes the best child.
    /// - The child is not the best child and does not become the best child.
    fn maybe_update_best_child_and_descendant<E: EthSpec>(
        &mut self,
        parent_index: usize,
        child_index: usize,
        current_slot: Slot,
    ) -> Result<(), Error> {
        let child = self
            .nodes
            .get(child_index)
            .ok_or(Error::InvalidNodeIndex(child_index))?;

        let parent = self
            .nodes
            .get(parent_index)
            .ok_or(Error::InvalidNodeIndex(parent_index))?;

        let child_leads_to_viable_head =
            self.node_leads_to_viable_head::<E>(child, current_slot)?;

        // These three variables are aliases to the three options that we may set the
        // `parent.best_child` and `parent.best_descendant` to.
        //
        // I use the aliases to assist readability.
        let change_to_none = (None, None);
        let change_to_child = (
            Some(child_index),
            child.best_descendant.or(Some(child_index)),
        );
        let no_change = (parent.best_child, parent.best_descendant);

        let (new_best_child, new_best_descendant) = if let Some(best_child_index) =
            parent.best_child
        {
            if best_child_index == child_index && !child_leads_to_viable_head {
                // If the child is already the best-child of the parent but it's not viable for
                // the head, remove it.
                change_to_none
            } else if best_child_index == child_index {
                // If the child is the best-child already, set it again to ensure that the
                // best-descendant of the parent is updated.
                change_to_child
            } else {
                let best_child = self
                    .nodes
                    .get(best_child_index)
                    .ok_or(Error::InvalidBestDescendant(best_child_index))?;

                let best_child_leads_to_viable_head =
                    self.node_leads_to_viable_head::<E>(best_child, current_slot)?;

                if child_leads_to_viable_head && !best_child_leads_to_viable_head {
                    // The child leads to a viable head, but the current best-child doesn't.
                    change_to_child
                } else if !child_leads_to_viable_head && best_child_leads_to_viable_head {
                    // The best child leads to a viable head, but the child doesn't.
                    no_change
                } else if child.weight == best_child.weight {
                    // Tie-breaker of equal weights by root.
                    if child.root >= best_child.root {
                        change_to_child
                    } else {
                        no_change
                    }
                } else {
                    // Choose the winner by weight.
                    if child.weight >= best_child.weight {
                        change_to_child
                    } else {
                        no_change
                    }
                }
            }
        } else if child_leads_to_viable_head {
            // There is no current best-child and the child is viable.
            change_to_child
        } else {
            // There is no current best-child but the child is not viable.
            no_change
        };

        let parent = self
            .nodes
            .get_mut(parent_index)
            .ok_or(Error::InvalidNodeIndex(parent_index))?;

        parent.best_child = new_best_child;
        parent.best_descendant = new_best_descendant;

        Ok(())
    }

    /// Indicates if the node itself is viable for the head, or if it's best descendant is viable
    /// for the head.
    fn node_leads_to_viable_head<E: EthSpec>(
        &self,
        node: &ProtoNode,
        current_slot: Slot,
    ) -> Result<bool, Error> {
        let best_descendant_is_viable_for_head =
            if let Some(best_descendant_index) = node.best_descendant {
                let best_descendant = self
                    .nodes
                    .get(best_descendant_index)
                    .ok_or(Error::InvalidBestDescendant(best_descendant_index))?;

                self.node_is_viable_for_head::<E>(best_descendant, current_slot)
            } else {
                false
            };

        Ok(best_descendant_is_viable_for_head
            || self.node_is_viable_for_head::<E>(node, current_slot))
    }

    /// This is the equivalent to the `filter_block_tree` function in the consensus spec:
    ///
    /// https://github.com/ethereum/consensus-specs/blob/dev/specs/phase0/fork-choice.md#filter_block_tree
    ///
    /// Any node that has a different finalized or justified epoch should not be viable for the
    /// head.
    ///
    /// Nodes from prior epochs are allowed to use their unrealized checkpoints, since their
    /// epoch processing is already "due".
    fn node_is_viable_for_head<E: EthSpec>(&self, node: &ProtoNode, current_slot: Slot) -> bool {
        if node.execution_status.is_invalid() {
            return false;
        }

        let genesis_epoch = Epoch::new(0);
        let current_epoch = current_slot.epoch(E::slots_per_epoch());
        let node_epoch = node.slot.epoch(E::slots_per_epoch());

        let checkpoint_match_predicate =
            |node_justified_checkpoint: Checkpoint, node_finalized_checkpoint: Checkpoint| {
                let correct_justified = node_justified_checkpoint == self.justified_checkpoint
                    || self.justified_checkpoint.epoch == genesis_epoch;
                let correct_finalized = node_finalized_checkpoint == self.finalized_checkpoint
                    || self.finalized_checkpoint.epoch == genesis_epoch;
                correct_justified && correct_finalized
            };

        if let (
            Some(unrealized_justified_checkpoint),
            Some(unrealized_finalized_checkpoint),
            Some(justified_checkpoint),
            Some(finalized_checkpoint),
        ) = (
            node.unrealized_justified_checkpoint,
            node.unrealized_finalized_checkpoint,
            node.justified_checkpoint,
            node.finalized_checkpoint,
        ) {
            if node_epoch < current_epoch {
                checkpoint_match_predicate(
                    unrealized_justified_checkpoint,
                    unrealized_finalized_checkpoint,
                )
            } else {
                checkpoint_match_predicate(justified_checkpoint, finalized_checkpoint)
            }
        } else if let (Some(justified_checkpoint), Some(finalized_checkpoint)) =
            (node.justified_checkpoint, node.finalized_checkpoint)
        {
            checkpoint_match_predicate(justified_checkpoint, finalized_checkpoint)
        } else {
            false
        }
    }

    /// Return a reverse iterator over the nodes which comprise the chain ending at `block_root`.
    pub fn iter_nodes<'a>(&'a self, block_root: &Hash256) -> Iter<'a> {
        let next_node_index = self.indices.get(block_root).copied();
        Iter {
            next_node_index,
            proto_array: self,
        }
    }

    /// Return a reverse iterator over the block roots of the chain ending at `block_root`.
    ///
    /// Note that unlike many other iterators, this one WILL NOT yield anything at skipped slots.
    pub fn iter_block_roots<'a>(
        &'a self,
        block_root: &Hash256,
    ) -> impl Iterator<Item = (Hash256, Slot)> + 'a {
        self.iter_nodes(block_root)
            .map(|node| (node.root, node.slot))
    }
}

/// Reverse iterator over one path through a `ProtoArray`.
pub struct Iter<'a> {
    next_node_index: Option<usize>,
    proto_array: &'a ProtoArray,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ProtoNode;

    fn next(&mut self) -> Option<Self::Item> {
        let next_node_index = self.next_node_index?;
        let node = self.proto_array.nodes.get(next_node_index)?;
        self.next_node_index = node.parent;
        Some(node)
    }
}

/// A helper method to calculate the proposer boost based on the given `justified_balances`.
///
/// Spec:
///
/// https://github.com/ethereum/consensus-specs/blob/dev/specs/phase0/fork-choice.md#get_latest_attesting_balance
pub fn calculate_committee_fraction<E: EthSpec>(
    justified_balances: &[u64],
    proposer_score_boost: u64,
) -> Option<u64> {
    let total_active_balance: u64 = justified_balances
        .iter()
        .fold(0_u64, |acc, balance| acc.saturating_add(*balance));
    let committee_weight = total_active_balance.checked_div(E::slots_per_epoch())?;
    committee_weight
        .checked_mul(proposer_score_boost)?
        .checked_div(100)
}
