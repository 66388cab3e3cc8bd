use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Chain-family technique produced by the search driver, ordered by
/// difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technique {
    XChain,
    GroupedXChain,
    ContinuousNiceLoop,
    GroupedContinuousNiceLoop,
    AlternatingInferenceChain,
    GroupedAlternatingInferenceChain,
    CellForcingChains,
    RegionForcingChains,
    RectangleForcingChains,
    BugForcingChains,
    BlossomLoop,
    BinaryForcingChains,
}

impl Technique {
    /// Sudoku Explainer (SE) numerical rating, the community-standard
    /// difficulty scale.
    pub fn se_rating(&self) -> f32 {
        match self {
            Technique::XChain => 4.5,
            Technique::GroupedXChain => 4.7,
            Technique::ContinuousNiceLoop => 5.8,
            Technique::GroupedContinuousNiceLoop => 6.0,
            Technique::AlternatingInferenceChain => 6.0,
            Technique::GroupedAlternatingInferenceChain => 6.2,
            Technique::CellForcingChains => 8.3,
            Technique::RegionForcingChains => 8.5,
            Technique::RectangleForcingChains => 8.7,
            Technique::BugForcingChains => 8.9,
            Technique::BlossomLoop => 9.0,
            Technique::BinaryForcingChains => 9.3,
        }
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Technique::XChain => write!(f, "X-Chain"),
            Technique::GroupedXChain => write!(f, "Grouped X-Chain"),
            Technique::ContinuousNiceLoop => write!(f, "Continuous Nice Loop"),
            Technique::GroupedContinuousNiceLoop => write!(f, "Grouped Continuous Nice Loop"),
            Technique::AlternatingInferenceChain => write!(f, "AIC"),
            Technique::GroupedAlternatingInferenceChain => write!(f, "Grouped AIC"),
            Technique::CellForcingChains => write!(f, "Cell Forcing Chains"),
            Technique::RegionForcingChains => write!(f, "Region Forcing Chains"),
            Technique::RectangleForcingChains => write!(f, "Rectangle Forcing Chains"),
            Technique::BugForcingChains => write!(f, "BUG Forcing Chains"),
            Technique::BlossomLoop => write!(f, "Blossom Loop"),
            Technique::BinaryForcingChains => write!(f, "Binary Forcing Chains"),
        }
    }
}

/// Cooperative cancellation flag, polled once per major search step.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A search was cancelled; unwinds without partial results.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("chain search interrupted")]
pub struct Interrupted;

/// Per-invocation search parameters shared by every collect entry point.
#[derive(Clone)]
pub struct SearchContext {
    /// Stop at the first accepted step instead of accumulating all.
    pub find_one: bool,
    /// Permit grouped/pattern links; when false, only elementary links are
    /// built and strictly-grouped chains are rejected.
    pub allow_advanced: bool,
    /// Upper bound on the number of nodes in a simple chain.
    pub max_chain_nodes: usize,
    /// Cooperative cancellation signal.
    pub cancel: CancelFlag,
}

impl Default for SearchContext {
    fn default() -> Self {
        SearchContext {
            find_one: true,
            allow_advanced: false,
            max_chain_nodes: 12,
            cancel: CancelFlag::new(),
        }
    }
}

impl SearchContext {
    pub fn find_all() -> Self {
        SearchContext {
            find_one: false,
            ..Default::default()
        }
    }

    pub fn with_advanced(mut self, allow: bool) -> Self {
        self.allow_advanced = allow;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Poll the cancellation flag, unwinding when it is set.
    pub fn checkpoint(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technique_ordering_matches_ratings() {
        let all = [
            Technique::XChain,
            Technique::GroupedXChain,
            Technique::ContinuousNiceLoop,
            Technique::GroupedContinuousNiceLoop,
            Technique::AlternatingInferenceChain,
            Technique::GroupedAlternatingInferenceChain,
            Technique::CellForcingChains,
            Technique::RegionForcingChains,
            Technique::RectangleForcingChains,
            Technique::BugForcingChains,
            Technique::BlossomLoop,
            Technique::BinaryForcingChains,
        ];
        for pair in all.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].se_rating() <= pair[1].se_rating());
        }
    }

    #[test]
    fn test_cancel_flag() {
        let ctx = SearchContext::default();
        assert_eq!(ctx.checkpoint(), Ok(()));
        ctx.cancel.cancel();
        assert_eq!(ctx.checkpoint(), Err(Interrupted));
    }

    #[test]
    fn test_technique_serde() {
        let json = serde_json::to_string(&Technique::BlossomLoop).unwrap();
        let back: Technique = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Technique::BlossomLoop);
    }
}
