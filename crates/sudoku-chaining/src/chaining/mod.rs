//! Chaining and forcing-chain deduction engine.
//!
//! An implication graph over candidate nodes drives every technique in
//! this module: simple chains and loops walk alternating strong/weak
//! links breadth-first, while the forcing-chain family propagates
//! assumed node states to fixpoint and combines the resulting closures.
//! Links come from pluggable [`rules::ChainingRule`] implementations
//! behind a per-type configuration.

pub mod chain;
pub mod fabric;
pub mod forcing;
pub mod link;
pub mod node;
pub mod rules;
pub mod search;
pub mod step;
pub mod types;

use log::debug;

use crate::Grid;
use rules::RuleRegistry;
use search::Searcher;
use types::Interrupted;

pub use rules::{ChainingOptions, LinkDensity, LinkOption, LinkType};
pub use step::{Conclusion, Step, StepSummary};
pub use types::{CancelFlag, SearchContext, Technique};


/// Reusable front door to the chain searches: owns the resolved rule
/// registry, borrows a grid per call.
pub struct ChainingEngine {
    registry: RuleRegistry,
}

impl Default for ChainingEngine {
    fn default() -> Self {
        Self::new(ChainingOptions::default())
    }
}

impl ChainingEngine {
    pub fn new(options: ChainingOptions) -> Self {
        ChainingEngine {
            registry: RuleRegistry::resolve(options),
        }
    }

    pub fn options(&self) -> &ChainingOptions {
        self.registry.options()
    }

    /// Simple chains and continuous loops (X-Chains, AICs and their
    /// grouped variants, depending on `ctx.allow_advanced`).
    pub fn find_chains(&self, grid: &Grid, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        Searcher::new(grid, &self.registry).collect_chains(ctx)
    }

    /// Cell and region forcing chains.
    pub fn find_multiple_forcing_chains(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<Vec<Step>, Interrupted> {
        Searcher::new(grid, &self.registry).collect_multiple(ctx)
    }

    /// Forcing chains rooted at unique-rectangle roof extras.
    pub fn find_rectangle_forcing_chains(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<Vec<Step>, Interrupted> {
        Searcher::new(grid, &self.registry).collect_rectangle(ctx)
    }

    /// Forcing chains rooted at the extra candidates of a BUG+n state.
    pub fn find_bug_forcing_chains(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<Vec<Step>, Interrupted> {
        Searcher::new(grid, &self.registry).collect_bug(ctx)
    }

    /// Blossom loops.
    pub fn find_blossom_loops(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<Vec<Step>, Interrupted> {
        Searcher::new(grid, &self.registry).collect_blossom(ctx)
    }

    /// Binary forcing chains (contradiction and convergence).
    pub fn find_binary_forcing_chains(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<Vec<Step>, Interrupted> {
        Searcher::new(grid, &self.registry).collect_binary(ctx)
    }

    /// Run every technique family against one grid snapshot, easiest
    /// first. With `ctx.find_one` the first family that yields a step
    /// ends the search; otherwise all steps are gathered and sorted by
    /// SE rating.
    pub fn find_forcing_chains(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<Vec<Step>, Interrupted> {
        let searcher = Searcher::new(grid, &self.registry);
        let mut steps = Vec::new();

        let basic = ctx.clone().with_advanced(false);
        let advanced = ctx.clone().with_advanced(true);
        let passes: [(&str, &dyn Fn() -> Result<Vec<Step>, Interrupted>); 7] = [
            ("chains", &|| searcher.collect_chains(&basic)),
            ("grouped chains", &|| searcher.collect_chains(&advanced)),
            ("multiple forcing chains", &|| {
                searcher.collect_multiple(&advanced)
            }),
            ("rectangle forcing chains", &|| {
                searcher.collect_rectangle(&advanced)
            }),
            ("bug forcing chains", &|| searcher.collect_bug(&advanced)),
            ("blossom loops", &|| searcher.collect_blossom(&advanced)),
            ("binary forcing chains", &|| {
                searcher.collect_binary(&advanced)
            }),
        ];

        for (family, pass) in passes {
            let found = pass()?;
            if !found.is_empty() {
                debug!("{}: {} step(s)", family, found.len());
            }
            steps.extend(found);
            if ctx.find_one && !steps.is_empty() {
                break;
            }
        }

        steps.sort_by(|a, b| {
            a.se_rating()
                .total_cmp(&b.se_rating())
                .then_with(|| a.conclusions().cmp(b.conclusions()))
        });
        Ok(steps)
    }

    /// Apply the easiest available step repeatedly, recording the order
    /// in which the grid was advanced. Stops when no chain-family step
    /// applies; the grid may or may not be complete at that point.
    pub fn run_trace(
        &self,
        grid: &Grid,
        ctx: &SearchContext,
    ) -> Result<(Grid, Vec<StepSummary>), Interrupted> {
        let mut working = grid.clone();
        let mut trace = Vec::new();
        loop {
            let one = SearchContext {
                find_one: true,
                ..ctx.clone()
            };
            let steps = self.find_forcing_chains(&working, &one)?;
            let Some(step) = steps.into_iter().next() else {
                break;
            };
            for conclusion in step.conclusions() {
                conclusion.apply(&mut working);
            }
            trace.push(step.summary());
        }
        Ok((working, trace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn empty_grid() -> Grid {
        let mut grid = Grid::from_string(
            "000000000000000000000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        grid.recalculate_candidates();
        grid
    }

    fn x_chain_grid() -> Grid {
        let mut grid = empty_grid();
        for col in 0..9 {
            if col != 0 && col != 4 {
                grid.eliminate(Position::new(0, col), 3);
                grid.eliminate(Position::new(4, col), 3);
            }
        }
        grid
    }

    #[test]
    fn test_engine_finds_easiest_step_first() {
        let engine = ChainingEngine::default();
        let grid = x_chain_grid();
        let steps = engine
            .find_forcing_chains(&grid, &SearchContext::find_all())
            .unwrap();
        assert!(!steps.is_empty());
        for pair in steps.windows(2) {
            assert!(pair[0].se_rating() <= pair[1].se_rating());
        }
        assert_eq!(steps[0].technique(), Technique::XChain);
    }

    #[test]
    fn test_find_one_stops_at_first_family() {
        let engine = ChainingEngine::default();
        let grid = x_chain_grid();
        let steps = engine
            .find_forcing_chains(&grid, &SearchContext::default())
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert!(matches!(
            steps[0].technique(),
            Technique::XChain | Technique::ContinuousNiceLoop
        ));
    }

    #[test]
    fn test_trace_applies_steps_to_the_grid() {
        let engine = ChainingEngine::default();
        let grid = x_chain_grid();
        let (after, trace) = engine
            .run_trace(&grid, &SearchContext::default())
            .unwrap();
        assert!(!trace.is_empty());
        let mut expected = grid.clone();
        for summary in &trace {
            for conclusion in &summary.conclusions {
                conclusion.apply(&mut expected);
            }
        }
        for idx in 0..81 {
            let pos = Position::from_index(idx);
            assert_eq!(after.candidates(pos), expected.candidates(pos));
        }
    }

    #[test]
    fn test_step_summary_serde_round_trip() {
        let engine = ChainingEngine::default();
        let grid = x_chain_grid();
        let steps = engine
            .find_forcing_chains(&grid, &SearchContext::default())
            .unwrap();
        let summary = steps[0].summary();
        let json = serde_json::to_string(&summary).unwrap();
        let back: StepSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.technique, summary.technique);
        assert_eq!(back.conclusions, summary.conclusions);

        let _: Conclusion = serde_json::from_str("{\"Eliminate\":{\"cell\":4,\"digit\":3}}")
            .unwrap();
    }
}
