//! Ordered alternating chains and loops over implication-graph nodes.

use super::link::LinkPattern;
use super::node::CandidateSet;

/// One vertex of a chain: a candidate set plus its truth state in the
/// chain's reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainNode {
    pub key: CandidateSet,
    pub on: bool,
}

impl ChainNode {
    pub fn new(key: CandidateSet, on: bool) -> Self {
        ChainNode { key, on }
    }
}

/// An alternating sequence of nodes. Consecutive nodes are connected by a
/// link whose strength alternates: arriving at an "on" node uses a strong
/// link, arriving at an "off" node a weak one. A loop additionally closes
/// from the last node back to the first.
///
/// `patterns[i]` tags the link from node `i` to node `i+1`; for loops the
/// final entry tags the closing link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    nodes: Vec<ChainNode>,
    patterns: Vec<Option<LinkPattern>>,
    is_loop: bool,
}

impl Chain {
    pub fn new(nodes: Vec<ChainNode>, patterns: Vec<Option<LinkPattern>>, is_loop: bool) -> Self {
        debug_assert!(nodes.len() >= 2);
        debug_assert_eq!(
            patterns.len(),
            if is_loop { nodes.len() } else { nodes.len() - 1 }
        );
        debug_assert!(nodes.windows(2).all(|w| w[0].on != w[1].on));
        if is_loop {
            debug_assert!(nodes.first().map(|n| n.on) != nodes.last().map(|n| n.on));
        }
        Chain {
            nodes,
            patterns,
            is_loop,
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn is_loop(&self) -> bool {
        self.is_loop
    }

    pub fn first(&self) -> &ChainNode {
        &self.nodes[0]
    }

    pub fn last(&self) -> &ChainNode {
        self.nodes.last().expect("chain is non-empty")
    }

    /// Number of links, counting the closing link of a loop.
    pub fn link_count(&self) -> usize {
        if self.is_loop {
            self.nodes.len()
        } else {
            self.nodes.len() - 1
        }
    }

    /// Whether link `i` (from node `i` to node `i+1`, wrapping for the
    /// closing link) is strong. A link into an "on" node is strong.
    pub fn link_is_strong(&self, i: usize) -> bool {
        let to = (i + 1) % self.nodes.len();
        self.nodes[to].on
    }

    pub fn pattern(&self, i: usize) -> Option<&LinkPattern> {
        self.patterns[i].as_ref()
    }

    /// All pattern tags used by the chain's links.
    pub fn patterns(&self) -> impl Iterator<Item = &LinkPattern> {
        self.patterns.iter().filter_map(|p| p.as_ref())
    }

    /// Weak links as (from, to) node pairs, including a weak closing link.
    pub fn weak_links(&self) -> Vec<(&ChainNode, &ChainNode)> {
        (0..self.link_count())
            .filter(|&i| !self.link_is_strong(i))
            .map(|i| (&self.nodes[i], &self.nodes[(i + 1) % self.nodes.len()]))
            .collect()
    }

    /// Grouped node anywhere, or any pattern-tagged link: the chain counts
    /// as "advanced" even when every endpoint is a singleton.
    pub fn strictly_grouped(&self) -> bool {
        self.nodes.iter().any(|n| n.key.is_grouped()) || self.patterns.iter().any(|p| p.is_some())
    }

    /// Every node mentions a single digit.
    pub fn single_digit(&self) -> bool {
        let digits = self.nodes[0].key.digits();
        digits.count() == 1 && self.nodes.iter().all(|n| n.key.digits() == digits)
    }

    /// Canonical key sequence, insensitive to truth state and direction
    /// (and, for loops, to rotation). Used to deduplicate found chains.
    pub fn canonical(&self) -> Vec<CandidateSet> {
        let forward: Vec<CandidateSet> = self.nodes.iter().map(|n| n.key.clone()).collect();
        let mut backward = forward.clone();
        backward.reverse();
        if !self.is_loop {
            return forward.min(backward);
        }
        let n = forward.len();
        let mut best: Option<Vec<CandidateSet>> = None;
        for seq in [&forward, &backward] {
            for start in 0..n {
                let rotated: Vec<CandidateSet> =
                    (0..n).map(|i| seq[(start + i) % n].clone()).collect();
                best = Some(match best {
                    None => rotated,
                    Some(b) => b.min(rotated),
                });
            }
        }
        best.expect("loop has nodes")
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", if self.link_is_strong(i - 1) { "=" } else { "-" })?;
            }
            write!(f, "{}", node.key)?;
        }
        if self.is_loop {
            write!(
                f,
                "{}{}",
                if self.link_is_strong(self.nodes.len() - 1) {
                    "="
                } else {
                    "-"
                },
                self.nodes[0].key
            )?;
        }
        Ok(())
    }
}
