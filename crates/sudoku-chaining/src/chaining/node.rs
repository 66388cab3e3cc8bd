//! Implication-graph vertices.
//!
//! A node is a non-empty candidate set plus an assumed truth state: "on"
//! means at least one member candidate is true, "off" means all are false.
//! Nodes live in an arena indexed by integer id; provenance (which node
//! implied which) sits in side tables so that equality and hashing never
//! see it.

use std::collections::HashMap;

use super::fabric::Fabric;
use super::link::LinkPattern;
use crate::bitset::BitSet;
use crate::grid::Position;

/// A single cell x digit pair, packed into a `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate(u16);

impl Candidate {
    #[inline]
    pub fn new(cell: usize, digit: u8) -> Self {
        debug_assert!(cell < 81 && (1..=9).contains(&digit));
        Candidate((cell * 9) as u16 + (digit - 1) as u16)
    }

    #[inline]
    pub fn cell(self) -> usize {
        (self.0 / 9) as usize
    }

    #[inline]
    pub fn digit(self) -> u8 {
        (self.0 % 9) as u8 + 1
    }

    #[inline]
    pub fn position(self) -> Position {
        Position::from_index(self.cell())
    }

    /// Whether the two candidates cannot both be true: same cell with
    /// different digits, or same digit in a shared house.
    pub fn conflicts_with(self, other: Candidate, fab: &Fabric) -> bool {
        if self == other {
            return false;
        }
        if self.cell() == other.cell() {
            return true;
        }
        self.digit() == other.digit() && fab.sees(self.cell(), other.cell())
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.position(), self.digit())
    }
}

/// Sorted, deduplicated set of candidates. The key type of the link
/// dictionaries; a set with more than one member is a *grouped* node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateSet(Vec<Candidate>);

impl CandidateSet {
    pub fn single(cand: Candidate) -> Self {
        CandidateSet(vec![cand])
    }

    pub fn from_candidates<I: IntoIterator<Item = Candidate>>(cands: I) -> Self {
        let mut v: Vec<Candidate> = cands.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        debug_assert!(!v.is_empty());
        CandidateSet(v)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.0.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// More than one member candidate.
    #[inline]
    pub fn is_grouped(&self) -> bool {
        self.0.len() > 1
    }

    #[inline]
    pub fn contains(&self, cand: Candidate) -> bool {
        self.0.binary_search(&cand).is_ok()
    }

    /// The sole member, if the set is a singleton.
    pub fn sole(&self) -> Option<Candidate> {
        if self.0.len() == 1 {
            Some(self.0[0])
        } else {
            None
        }
    }

    pub fn cells(&self) -> Vec<usize> {
        let mut cells: Vec<usize> = self.0.iter().map(|c| c.cell()).collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    pub fn digits(&self) -> BitSet {
        self.0.iter().map(|c| c.digit()).collect()
    }

    /// Whether `cand` conflicts with every member, i.e. "this node on"
    /// forces `cand` off.
    pub fn excludes(&self, cand: Candidate, fab: &Fabric) -> bool {
        !self.contains(cand) && self.0.iter().all(|&m| m.conflicts_with(cand, fab))
    }

    /// Whether the two sets share a candidate.
    pub fn overlaps(&self, other: &CandidateSet) -> bool {
        self.0.iter().any(|c| other.contains(*c))
    }
}

impl std::fmt::Display for CandidateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(c) = self.sole() {
            return write!(f, "{c}");
        }
        write!(f, "{{")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "}}")
    }
}

/// Arena handle for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

struct NodeData {
    key: CandidateSet,
    on: bool,
}

/// Arena of closure nodes, interned by (candidate set, truth state).
///
/// Parents and the link pattern that implied a node live in side tables
/// keyed by id; two closure runs over the same graph intern identical
/// (key, state) pairs to identical ids.
pub struct NodeArena {
    nodes: Vec<NodeData>,
    parent: Vec<Option<NodeId>>,
    via: Vec<Option<LinkPattern>>,
    index: HashMap<(CandidateSet, bool), NodeId>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena {
            nodes: Vec::new(),
            parent: Vec::new(),
            via: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Id for (key, state), allocating on first sight.
    pub fn intern(&mut self, key: CandidateSet, on: bool) -> NodeId {
        if let Some(&id) = self.index.get(&(key.clone(), on)) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.index.insert((key.clone(), on), id);
        self.nodes.push(NodeData { key, on });
        self.parent.push(None);
        self.via.push(None);
        id
    }

    /// Intern a node implied by `parent` over a link carrying `via`.
    /// Provenance is recorded only when the node is first created, so
    /// parent chains always walk back to a root without cycling (a later
    /// implication could otherwise hand the seed a parent of its own).
    pub fn intern_child(
        &mut self,
        key: CandidateSet,
        on: bool,
        parent: NodeId,
        via: Option<LinkPattern>,
    ) -> NodeId {
        let fresh = self.lookup(&key, on).is_none();
        let id = self.intern(key, on);
        if fresh {
            self.parent[id.0 as usize] = Some(parent);
            self.via[id.0 as usize] = via;
        }
        id
    }

    /// Id of the negated node, if it was ever interned.
    pub fn lookup(&self, key: &CandidateSet, on: bool) -> Option<NodeId> {
        self.index.get(&(key.clone(), on)).copied()
    }

    #[inline]
    pub fn key(&self, id: NodeId) -> &CandidateSet {
        &self.nodes[id.0 as usize].key
    }

    #[inline]
    pub fn is_on(&self, id: NodeId) -> bool {
        self.nodes[id.0 as usize].on
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent[id.0 as usize]
    }

    #[inline]
    pub fn via(&self, id: NodeId) -> Option<&LinkPattern> {
        self.via[id.0 as usize].as_ref()
    }

    /// Walk parents back to a root, returning root..=id order.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(p) = self.parent[cur.0 as usize] {
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grid;

    const EASY: &str =
        "530070000600195000098000060800060003400803001700020006060000280000419005000080079";

    #[test]
    fn test_candidate_packing() {
        let c = Candidate::new(40, 7);
        assert_eq!(c.cell(), 40);
        assert_eq!(c.digit(), 7);
        assert_eq!(c.to_string(), "r5c5(7)");
    }

    #[test]
    fn test_conflicts() {
        let grid = Grid::from_string(EASY).unwrap();
        let fab = Fabric::from_grid(&grid);
        // Same cell, different digits.
        assert!(Candidate::new(2, 1).conflicts_with(Candidate::new(2, 2), &fab));
        // Same digit, same row.
        assert!(Candidate::new(2, 1).conflicts_with(Candidate::new(5, 1), &fab));
        // Same digit, no shared house.
        assert!(!Candidate::new(0, 1).conflicts_with(Candidate::new(40, 1), &fab));
        // A candidate never conflicts with itself.
        assert!(!Candidate::new(2, 1).conflicts_with(Candidate::new(2, 1), &fab));
    }

    #[test]
    fn test_set_grouping_and_exclusion() {
        let grid = Grid::from_string(EASY).unwrap();
        let fab = Fabric::from_grid(&grid);
        let group =
            CandidateSet::from_candidates([Candidate::new(3, 4), Candidate::new(5, 4)]);
        assert!(group.is_grouped());
        assert!(group.sole().is_none());
        // r1c1..r1c9 digit 4 in the same row sees both members.
        assert!(group.excludes(Candidate::new(8, 4), &fab));
        // Different digit, not excluded.
        assert!(!group.excludes(Candidate::new(8, 5), &fab));
    }

    #[test]
    fn test_arena_interning_ignores_parents() {
        let mut arena = NodeArena::new();
        let key = CandidateSet::single(Candidate::new(0, 1));
        let a = arena.intern(key.clone(), true);
        let b = arena.intern(key.clone(), true);
        assert_eq!(a, b);
        let neg = arena.intern(key.clone(), false);
        assert_ne!(a, neg);

        let other = arena.intern(CandidateSet::single(Candidate::new(1, 1)), false);
        let child = arena.intern_child(key, true, other, None);
        // Re-implying an existing node neither creates a distinct node nor
        // rewrites its provenance.
        assert_eq!(child, a);
        assert!(arena.parent(child).is_none());
    }

    #[test]
    fn test_path_from_root() {
        let mut arena = NodeArena::new();
        let root = arena.intern(CandidateSet::single(Candidate::new(0, 1)), true);
        let mid = arena.intern_child(
            CandidateSet::single(Candidate::new(1, 1)),
            false,
            root,
            None,
        );
        let leaf = arena.intern_child(
            CandidateSet::single(Candidate::new(2, 1)),
            true,
            mid,
            None,
        );
        let path = arena.path_from_root(leaf);
        assert_eq!(path, vec![root, mid, leaf]);
    }
}
