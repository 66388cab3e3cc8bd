//! Forcing-chain composite structures: closures, branches, and the
//! binary / multiple / rectangle / BUG containers plus blossom loops.
//!
//! A closure is the full implication consequence of assuming one node
//! state. Containers pair the anchor that justified branching with the
//! evidence chains themselves.

use std::collections::HashMap;

use super::chain::Chain;
use super::node::{Candidate, CandidateSet, NodeId};
use crate::bitset::BitSet;

/// Where a multi-branch combination is rooted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForcingAnchor {
    /// One branch per candidate digit of a cell.
    Cell(usize),
    /// One branch per position of a digit in a house.
    House { house: usize, digit: u8 },
}

/// A single forcing branch: the alternating implication path from the
/// assumed seed node to a forced node.
#[derive(Debug, Clone)]
pub struct ForcingBranch {
    pub chain: Chain,
}

/// Result of propagating one assumed node state to fixpoint.
///
/// `on` / `off` keep insertion order (deterministic given sealed
/// dictionaries); the index maps answer membership queries. When a
/// contradiction is found, propagation stops immediately and the closure
/// holds whatever was accumulated up to that point.
pub struct Closure {
    pub seed: NodeId,
    pub on: Vec<NodeId>,
    pub off: Vec<NodeId>,
    on_index: HashMap<CandidateSet, NodeId>,
    off_index: HashMap<CandidateSet, NodeId>,
    pub contradiction: Option<Contradiction>,
}

/// A key forced to both states by the same assumption.
#[derive(Debug, Clone)]
pub struct Contradiction {
    pub key: CandidateSet,
    pub as_on: NodeId,
    pub as_off: NodeId,
}

impl Closure {
    pub fn new(seed: NodeId) -> Self {
        Closure {
            seed,
            on: Vec::new(),
            off: Vec::new(),
            on_index: HashMap::new(),
            off_index: HashMap::new(),
            contradiction: None,
        }
    }

    /// Record a node forced on. Returns false if the key was already there.
    pub fn push_on(&mut self, key: CandidateSet, id: NodeId) -> bool {
        if self.on_index.contains_key(&key) {
            return false;
        }
        self.on_index.insert(key, id);
        self.on.push(id);
        true
    }

    pub fn push_off(&mut self, key: CandidateSet, id: NodeId) -> bool {
        if self.off_index.contains_key(&key) {
            return false;
        }
        self.off_index.insert(key, id);
        self.off.push(id);
        true
    }

    pub fn forced_on(&self, key: &CandidateSet) -> Option<NodeId> {
        self.on_index.get(key).copied()
    }

    pub fn forced_off(&self, key: &CandidateSet) -> Option<NodeId> {
        self.off_index.get(key).copied()
    }
}

/// Two branches from one seed candidate: either its on-closure collapses
/// (contradiction) or the on- and off-closures converge on the same node.
#[derive(Debug, Clone)]
pub struct BinaryForcingChains {
    pub seed: Candidate,
    pub branches: Vec<ForcingBranch>,
    /// True when the step came from a contradiction rather than convergence.
    pub contradiction: bool,
}

/// All digits of a cell, or all positions of a digit in a house, forcing
/// the same node.
#[derive(Debug, Clone)]
pub struct MultipleForcingChains {
    pub anchor: ForcingAnchor,
    pub branches: Vec<ForcingBranch>,
}

/// Forcing chains rooted at the extra candidates of a unique rectangle:
/// at least one extra must hold or the rectangle is deadly.
#[derive(Debug, Clone)]
pub struct RectangleForcingChains {
    pub cells: [usize; 4],
    pub digits: [u8; 2],
    pub branches: Vec<ForcingBranch>,
}

/// Forcing chains rooted at the extra candidates of a BUG+n state.
#[derive(Debug, Clone)]
pub struct BugForcingChains {
    pub extras: Vec<Candidate>,
    pub branches: Vec<ForcingBranch>,
}

/// Entry candidate -> strong branch map closing onto an exit cell/house
/// whose candidates the branch targets cover exactly.
#[derive(Debug, Clone)]
pub struct BlossomLoop {
    pub entry: ForcingAnchor,
    pub exit: ForcingAnchor,
    pub branches: Vec<(Candidate, ForcingBranch)>,
}

impl BlossomLoop {
    /// Digits rooted at the entry, for the completeness invariant.
    pub fn entry_digits(&self) -> BitSet {
        self.branches.iter().map(|(c, _)| c.digit()).collect()
    }

    /// Entry cells, for house-rooted blossoms.
    pub fn entry_cells(&self) -> Vec<usize> {
        let mut cells: Vec<usize> = self.branches.iter().map(|(c, _)| c.cell()).collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}
