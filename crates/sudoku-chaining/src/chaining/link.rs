//! Implication-graph edges and the per-snapshot link dictionaries.
//!
//! A *strong* link between two nodes means they cannot both be false; a
//! *weak* link means they cannot both be true. Links are undirected, and
//! the pattern tag a rule attaches never participates in edge identity.

use std::collections::HashMap;

use super::node::CandidateSet;
use super::rules::LinkType;
use crate::bitset::BitSet;

/// Pattern evidence attached to an advanced link, carrying whatever the
/// owning rule needs to derive loop conclusions later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkPattern {
    LockedCandidates {
        house: usize,
        digit: u8,
    },
    AlmostLockedSet {
        cells: Vec<usize>,
        digits: BitSet,
        entry_digit: u8,
        exit_digit: u8,
    },
    Fish {
        digit: u8,
        base: Vec<usize>,
        cover: Vec<usize>,
        fins: Vec<usize>,
    },
    UniqueRectangle {
        cells: [usize; 4],
        digits: [u8; 2],
        same_digit: bool,
    },
    AvoidableRectangle {
        cells: [usize; 4],
        digits: [u8; 2],
    },
    XyzWing {
        pivot: usize,
        pincers: [usize; 2],
        z: u8,
    },
}

impl LinkPattern {
    /// The link type whose rule owns this pattern.
    pub fn link_type(&self) -> LinkType {
        match self {
            LinkPattern::LockedCandidates { .. } => LinkType::LockedCandidates,
            LinkPattern::AlmostLockedSet { .. } => LinkType::AlmostLockedSets,
            LinkPattern::Fish { fins, .. } if fins.is_empty() => LinkType::Fish,
            LinkPattern::Fish { .. } => LinkType::KrakenFish,
            LinkPattern::UniqueRectangle {
                same_digit: true, ..
            } => LinkType::UniqueRectangleSameDigit,
            LinkPattern::UniqueRectangle { .. } => LinkType::UniqueRectangleDifferentDigit,
            LinkPattern::AvoidableRectangle { .. } => LinkType::AvoidableRectangle,
            LinkPattern::XyzWing { .. } => LinkType::XyzWing,
        }
    }
}

/// One adjacency entry: the opposite endpoint plus the pattern tag of the
/// link that produced it.
#[derive(Debug, Clone)]
pub struct LinkTarget {
    pub to: CandidateSet,
    pub pattern: Option<LinkPattern>,
}

/// Strong/weak adjacency of one grid snapshot under one rule configuration.
/// Built once by the driver, read-only afterwards.
#[derive(Default)]
pub struct LinkDictionary {
    strong: HashMap<CandidateSet, Vec<LinkTarget>>,
    weak: HashMap<CandidateSet, Vec<LinkTarget>>,
}

impl LinkDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a strong link, both directions. Self-links are ignored.
    pub fn insert_strong(
        &mut self,
        a: CandidateSet,
        b: CandidateSet,
        pattern: Option<LinkPattern>,
    ) {
        if a == b {
            return;
        }
        Self::push(&mut self.strong, a.clone(), b.clone(), pattern.clone());
        Self::push(&mut self.strong, b, a, pattern);
    }

    /// Insert a weak link, both directions. Overlapping endpoints are
    /// rejected: a shared candidate could make both nodes true at once.
    pub fn insert_weak(&mut self, a: CandidateSet, b: CandidateSet, pattern: Option<LinkPattern>) {
        if a == b || a.overlaps(&b) {
            return;
        }
        Self::push(&mut self.weak, a.clone(), b.clone(), pattern.clone());
        Self::push(&mut self.weak, b, a, pattern);
    }

    fn push(
        map: &mut HashMap<CandidateSet, Vec<LinkTarget>>,
        from: CandidateSet,
        to: CandidateSet,
        pattern: Option<LinkPattern>,
    ) {
        let targets = map.entry(from).or_default();
        // Duplicate edges keep the first pattern tag.
        if targets.iter().any(|t| t.to == to) {
            return;
        }
        targets.push(LinkTarget { to, pattern });
    }

    pub fn strong_targets(&self, key: &CandidateSet) -> &[LinkTarget] {
        self.strong.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn weak_targets(&self, key: &CandidateSet) -> &[LinkTarget] {
        self.weak.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys with at least one strong link, sorted for deterministic
    /// enumeration order.
    pub fn strong_keys(&self) -> Vec<&CandidateSet> {
        let mut keys: Vec<&CandidateSet> = self.strong.keys().collect();
        keys.sort();
        keys
    }

    /// Sort every adjacency list; called once after all rules have run so
    /// traversal order never depends on hash-map iteration.
    pub fn seal(&mut self) {
        for targets in self.strong.values_mut().chain(self.weak.values_mut()) {
            targets.sort_by(|x, y| x.to.cmp(&y.to));
        }
    }

    pub fn strong_len(&self) -> usize {
        self.strong.values().map(Vec::len).sum()
    }

    pub fn weak_len(&self) -> usize {
        self.weak.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaining::node::Candidate;

    fn key(cell: usize, digit: u8) -> CandidateSet {
        CandidateSet::single(Candidate::new(cell, digit))
    }

    #[test]
    fn test_dictionary_symmetry() {
        let mut dict = LinkDictionary::new();
        dict.insert_strong(key(0, 3), key(4, 3), None);
        dict.seal();
        // Forward and reverse lookups both present.
        assert_eq!(dict.strong_targets(&key(0, 3)).len(), 1);
        assert_eq!(dict.strong_targets(&key(4, 3))[0].to, key(0, 3));
        assert_eq!(dict.strong_len(), 2);
    }

    #[test]
    fn test_dictionary_dedup_and_overlap() {
        let mut dict = LinkDictionary::new();
        dict.insert_strong(key(0, 3), key(4, 3), None);
        dict.insert_strong(
            key(0, 3),
            key(4, 3),
            Some(LinkPattern::LockedCandidates { house: 0, digit: 3 }),
        );
        assert_eq!(dict.strong_targets(&key(0, 3)).len(), 1);
        // First insertion's (absent) pattern tag is kept.
        assert!(dict.strong_targets(&key(0, 3))[0].pattern.is_none());

        // Overlapping weak endpoints are rejected.
        let g1 = CandidateSet::from_candidates([Candidate::new(0, 1), Candidate::new(1, 1)]);
        let g2 = CandidateSet::from_candidates([Candidate::new(1, 1), Candidate::new(2, 1)]);
        dict.insert_weak(g1.clone(), g2, None);
        assert!(dict.weak_targets(&g1).is_empty());
    }
}
