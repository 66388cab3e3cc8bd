//! Deduction steps: conclusions plus the pattern evidence behind them.

use serde::{Deserialize, Serialize};

use super::chain::Chain;
use super::forcing::{
    BinaryForcingChains, BlossomLoop, BugForcingChains, MultipleForcingChains,
    RectangleForcingChains,
};
use super::types::Technique;
use crate::grid::{Grid, Position};

/// A single assignment or elimination.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Conclusion {
    Assign { cell: usize, digit: u8 },
    Eliminate { cell: usize, digit: u8 },
}

impl Conclusion {
    /// Whether the conclusion still does something against the live grid.
    /// A closure node may reference a candidate a prior step already
    /// removed; such conclusions are dead.
    pub fn is_live(&self, grid: &Grid) -> bool {
        match *self {
            Conclusion::Assign { cell, digit } => {
                let pos = Position::from_index(cell);
                grid.get(pos).is_none() && grid.has_candidate(pos, digit)
            }
            Conclusion::Eliminate { cell, digit } => {
                grid.has_candidate(Position::from_index(cell), digit)
            }
        }
    }

    /// Apply the conclusion to a grid.
    pub fn apply(&self, grid: &mut Grid) {
        match *self {
            Conclusion::Assign { cell, digit } => grid.place(Position::from_index(cell), digit),
            Conclusion::Eliminate { cell, digit } => {
                grid.eliminate(Position::from_index(cell), digit)
            }
        }
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Conclusion::Assign { cell, digit } => {
                write!(f, "{} = {}", Position::from_index(cell), digit)
            }
            Conclusion::Eliminate { cell, digit } => {
                write!(f, "{} <> {}", Position::from_index(cell), digit)
            }
        }
    }
}

/// The structure that proved a step.
#[derive(Debug, Clone)]
pub enum StepPattern {
    Chain(Chain),
    Binary(BinaryForcingChains),
    Multiple(MultipleForcingChains),
    Rectangle(RectangleForcingChains),
    Bug(BugForcingChains),
    Blossom(BlossomLoop),
}

/// An accepted deduction step: immutable once built.
#[derive(Debug, Clone)]
pub struct Step {
    technique: Technique,
    conclusions: Vec<Conclusion>,
    pattern: StepPattern,
}

impl Step {
    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn conclusions(&self) -> &[Conclusion] {
        &self.conclusions
    }

    pub fn pattern(&self) -> &StepPattern {
        &self.pattern
    }

    pub fn se_rating(&self) -> f32 {
        self.technique.se_rating()
    }

    /// One-line human-readable description.
    pub fn description(&self) -> String {
        let evidence = match &self.pattern {
            StepPattern::Chain(chain) => chain.to_string(),
            StepPattern::Binary(b) => format!(
                "{} via {} ({} branches)",
                if b.contradiction {
                    "contradiction"
                } else {
                    "convergence"
                },
                b.seed,
                b.branches.len()
            ),
            StepPattern::Multiple(m) => format!("{} branches", m.branches.len()),
            StepPattern::Rectangle(r) => format!(
                "rectangle {}/{} with {} branches",
                r.digits[0],
                r.digits[1],
                r.branches.len()
            ),
            StepPattern::Bug(b) => format!("{} extra candidates", b.extras.len()),
            StepPattern::Blossom(b) => format!("{} petals", b.branches.len()),
        };
        let conclusions: Vec<String> = self.conclusions.iter().map(|c| c.to_string()).collect();
        format!(
            "{}: {} => {}",
            self.technique,
            evidence,
            conclusions.join(", ")
        )
    }

    /// Serializable summary without the pattern payload.
    pub fn summary(&self) -> StepSummary {
        StepSummary {
            technique: self.technique,
            se_rating: self.se_rating(),
            conclusions: self.conclusions.clone(),
            description: self.description(),
        }
    }
}

/// Flat step view for embedding hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    pub technique: Technique,
    pub se_rating: f32,
    pub conclusions: Vec<Conclusion>,
    pub description: String,
}

/// Assembles the full conclusion list before the immutable [`Step`]
/// exists; there is no way to append to a constructed step.
pub struct StepBuilder {
    technique: Technique,
    conclusions: Vec<Conclusion>,
}

impl StepBuilder {
    pub fn new(technique: Technique) -> Self {
        StepBuilder {
            technique,
            conclusions: Vec::new(),
        }
    }

    pub fn conclude(&mut self, c: Conclusion) -> &mut Self {
        self.conclusions.push(c);
        self
    }

    pub fn extend<I: IntoIterator<Item = Conclusion>>(&mut self, iter: I) -> &mut Self {
        self.conclusions.extend(iter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conclusions.is_empty()
    }

    /// Finish with the pattern evidence. Returns `None` when no conclusion
    /// survived (a chain is accepted only once it concludes something).
    pub fn finish(mut self, pattern: StepPattern) -> Option<Step> {
        self.conclusions.sort_unstable();
        self.conclusions.dedup();
        if self.conclusions.is_empty() {
            return None;
        }
        Some(Step {
            technique: self.technique,
            conclusions: self.conclusions,
            pattern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaining::chain::ChainNode;
    use crate::chaining::node::{Candidate, CandidateSet};

    fn chain_pattern() -> StepPattern {
        StepPattern::Chain(Chain::new(
            vec![
                ChainNode::new(CandidateSet::single(Candidate::new(0, 3)), false),
                ChainNode::new(CandidateSet::single(Candidate::new(4, 3)), true),
            ],
            vec![None],
            false,
        ))
    }

    #[test]
    fn test_builder_dedups_and_sorts() {
        let mut b = StepBuilder::new(Technique::XChain);
        b.conclude(Conclusion::Eliminate { cell: 9, digit: 3 });
        b.conclude(Conclusion::Eliminate { cell: 1, digit: 3 });
        b.conclude(Conclusion::Eliminate { cell: 9, digit: 3 });
        let step = b.finish(chain_pattern()).unwrap();
        assert_eq!(
            step.conclusions(),
            &[
                Conclusion::Eliminate { cell: 1, digit: 3 },
                Conclusion::Eliminate { cell: 9, digit: 3 },
            ]
        );
    }

    #[test]
    fn test_builder_rejects_empty() {
        let b = StepBuilder::new(Technique::XChain);
        assert!(b.finish(chain_pattern()).is_none());
    }

    #[test]
    fn test_conclusion_liveness_and_apply() {
        let mut grid = Grid::from_string(
            "530070000600195000098000060800060003400803001700020006060000280000419005000080079",
        )
        .unwrap();
        let pos = Position::new(0, 2);
        let digit = grid.candidates(pos).smallest().unwrap();
        let e = Conclusion::Eliminate {
            cell: pos.index(),
            digit,
        };
        assert!(e.is_live(&grid));
        e.apply(&mut grid);
        assert!(!e.is_live(&grid));
    }

    #[test]
    fn test_summary_serializes() {
        let mut b = StepBuilder::new(Technique::XChain);
        b.conclude(Conclusion::Eliminate { cell: 1, digit: 3 });
        let step = b.finish(chain_pattern()).unwrap();
        let json = serde_json::to_string(&step.summary()).unwrap();
        let back: StepSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.technique, Technique::XChain);
        assert_eq!(back.conclusions, step.conclusions());
    }
}
