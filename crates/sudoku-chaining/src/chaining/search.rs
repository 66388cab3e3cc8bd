//! Chain and forcing-chain search driver.
//!
//! One [`Searcher`] wraps a grid snapshot and a rule registry. Simple
//! chains and loops come from an alternating breadth-first walk over the
//! link dictionaries; forcing variants propagate assumed node states to
//! fixpoint and combine the resulting closures.

use std::collections::{HashSet, VecDeque};

use log::{debug, trace};

use super::chain::{Chain, ChainNode};
use super::fabric::Fabric;
use super::forcing::{
    BinaryForcingChains, BlossomLoop, BugForcingChains, Closure, ForcingAnchor, ForcingBranch,
    MultipleForcingChains, RectangleForcingChains,
};
use super::link::{LinkDictionary, LinkPattern};
use super::node::{Candidate, CandidateSet, NodeArena, NodeId};
use super::rules::rectangle::floored_rectangles;
use super::rules::RuleRegistry;
use super::step::{Conclusion, Step, StepBuilder, StepPattern};
use super::types::{Interrupted, SearchContext, Technique};
use crate::Grid;

/// Collects accepted steps, deduplicating by technique and conclusions
/// (and, for simple chains, by canonical node sequence).
struct StepAccumulator {
    find_one: bool,
    steps: Vec<Step>,
    seen: HashSet<(Technique, Vec<Conclusion>)>,
    seen_chains: HashSet<Vec<CandidateSet>>,
}

impl StepAccumulator {
    fn new(find_one: bool) -> Self {
        StepAccumulator {
            find_one,
            steps: Vec::new(),
            seen: HashSet::new(),
            seen_chains: HashSet::new(),
        }
    }

    /// Returns true when the search should stop.
    fn push(&mut self, step: Step) -> bool {
        let sig = (step.technique(), step.conclusions().to_vec());
        if self.seen.insert(sig) {
            debug!("accepted step: {}", step.description());
            self.steps.push(step);
        }
        self.find_one && !self.steps.is_empty()
    }

    fn seen_chain(&mut self, canonical: Vec<CandidateSet>) -> bool {
        !self.seen_chains.insert(canonical)
    }

    fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

/// One vertex of an in-progress breadth-first path.
#[derive(Clone)]
struct PathNode {
    key: CandidateSet,
    on: bool,
    /// Pattern of the link that led here (none for the start node).
    via: Option<LinkPattern>,
}

/// Per-snapshot search façade over the rule registry.
pub struct Searcher<'a> {
    grid: &'a Grid,
    fab: Fabric,
    registry: &'a RuleRegistry,
}

impl<'a> Searcher<'a> {
    pub fn new(grid: &'a Grid, registry: &'a RuleRegistry) -> Self {
        Searcher {
            grid,
            fab: Fabric::from_grid(grid),
            registry,
        }
    }

    pub fn fabric(&self) -> &Fabric {
        &self.fab
    }

    /// Candidates excluded by both endpoint sets: whichever endpoint is
    /// true kills them.
    fn excluded_by_both(&self, a: &CandidateSet, b: &CandidateSet) -> Vec<Conclusion> {
        let mut out = Vec::new();
        for cell in 0..81 {
            for digit in self.fab.cell_cands[cell].iter() {
                let cand = Candidate::new(cell, digit);
                if a.excludes(cand, &self.fab) && b.excludes(cand, &self.fab) {
                    out.push(Conclusion::Eliminate { cell, digit });
                }
            }
        }
        out
    }

    // ---- simple chains and loops ------------------------------------

    /// X-Chains, AICs and continuous nice loops.
    ///
    /// When `ctx.allow_advanced` is false only elementary links exist and
    /// any strictly-grouped chain is rejected; when true, only the chains
    /// that actually use an advanced link are kept, so the two passes
    /// never report the same chain twice.
    pub fn collect_chains(&self, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        let dict = self.registry.build_dictionary(&self.fab, ctx.allow_advanced);
        let mut acc = StepAccumulator::new(ctx.find_one);

        'keys: for start in dict.strong_keys() {
            ctx.checkpoint()?;
            let mut queue: VecDeque<Vec<PathNode>> = VecDeque::new();
            queue.push_back(vec![PathNode {
                key: start.clone(),
                on: false,
                via: None,
            }]);

            while let Some(path) = queue.pop_front() {
                let last = path.last().expect("path is non-empty");
                let targets = if last.on {
                    dict.weak_targets(&last.key)
                } else {
                    dict.strong_targets(&last.key)
                };
                for target in targets {
                    // Closing a loop: a weak link back to the start.
                    if last.on && path.len() >= 4 && target.to == *start {
                        if self.accept_loop(ctx, &mut acc, &path, target.pattern.clone()) {
                            break 'keys;
                        }
                        continue;
                    }
                    if path.iter().any(|n| n.key == target.to) {
                        continue;
                    }
                    let mut next = path.clone();
                    next.push(PathNode {
                        key: target.to.clone(),
                        on: !last.on,
                        via: target.pattern.clone(),
                    });
                    // An open chain ends on a strong link.
                    if !last.on && next.len() >= 4 {
                        if self.accept_open(ctx, &mut acc, &next) {
                            break 'keys;
                        }
                    }
                    if next.len() < ctx.max_chain_nodes {
                        queue.push_back(next);
                    }
                }
            }
        }
        Ok(acc.into_steps())
    }

    /// `closing`: `Some(pattern)` closes the path into a loop; the inner
    /// option is the closing link's pattern tag.
    fn path_to_chain(&self, path: &[PathNode], closing: Option<Option<LinkPattern>>) -> Chain {
        let nodes: Vec<ChainNode> = path
            .iter()
            .map(|n| ChainNode::new(n.key.clone(), n.on))
            .collect();
        let mut patterns: Vec<Option<LinkPattern>> =
            path.iter().skip(1).map(|n| n.via.clone()).collect();
        let is_loop = closing.is_some();
        if let Some(pattern) = closing {
            patterns.push(pattern);
        }
        Chain::new(nodes, patterns, is_loop)
    }

    /// Chain classification by shape and grouping.
    fn classify(chain: &Chain) -> Technique {
        match (chain.is_loop(), chain.single_digit(), chain.strictly_grouped()) {
            (true, _, false) => Technique::ContinuousNiceLoop,
            (true, _, true) => Technique::GroupedContinuousNiceLoop,
            (false, true, false) => Technique::XChain,
            (false, true, true) => Technique::GroupedXChain,
            (false, false, false) => Technique::AlternatingInferenceChain,
            (false, false, true) => Technique::GroupedAlternatingInferenceChain,
        }
    }

    fn accept_open(
        &self,
        ctx: &SearchContext,
        acc: &mut StepAccumulator,
        path: &[PathNode],
    ) -> bool {
        let chain = self.path_to_chain(path, None);
        if chain.strictly_grouped() != ctx.allow_advanced {
            return false;
        }
        let canonical = chain.canonical();
        if acc.seen_chain(canonical) {
            return false;
        }
        // One of the two endpoints is true.
        let conclusions: Vec<Conclusion> = self
            .excluded_by_both(&chain.first().key, &chain.last().key)
            .into_iter()
            .filter(|c| c.is_live(self.grid))
            .collect();
        let mut builder = StepBuilder::new(Self::classify(&chain));
        builder.extend(conclusions);
        match builder.finish(StepPattern::Chain(chain)) {
            Some(step) => acc.push(step),
            None => false,
        }
    }

    fn accept_loop(
        &self,
        ctx: &SearchContext,
        acc: &mut StepAccumulator,
        path: &[PathNode],
        closing: Option<LinkPattern>,
    ) -> bool {
        let chain = self.path_to_chain(path, Some(closing));
        if chain.strictly_grouped() != ctx.allow_advanced {
            return false;
        }
        let canonical = chain.canonical();
        if acc.seen_chain(canonical) {
            return false;
        }
        let mut builder = StepBuilder::new(Self::classify(&chain));
        // Exactly one endpoint of every weak link is true.
        for (a, b) in chain.weak_links() {
            builder.extend(
                self.excluded_by_both(&a.key, &b.key)
                    .into_iter()
                    .filter(|c| c.is_live(self.grid)),
            );
        }
        let patterns: Vec<&LinkPattern> = chain.patterns().collect();
        builder.extend(
            self.registry
                .loop_conclusions(&self.fab, &patterns)
                .into_iter()
                .filter(|c| c.is_live(self.grid)),
        );
        trace!("loop candidate: {chain}");
        match builder.finish(StepPattern::Chain(chain)) {
            Some(step) => acc.push(step),
            None => false,
        }
    }

    // ---- closures ----------------------------------------------------

    /// Propagate one assumed node state to fixpoint over the dictionary.
    ///
    /// An on-node turns its weak neighbours off; an off-node turns its
    /// strong neighbours on. The first key about to enter both closures
    /// stops propagation with a contradiction.
    fn propagate(
        &self,
        dict: &LinkDictionary,
        arena: &mut NodeArena,
        seed_key: CandidateSet,
        seed_on: bool,
    ) -> Closure {
        let seed = arena.intern(seed_key.clone(), seed_on);
        let mut closure = Closure::new(seed);
        let mut on_pending: VecDeque<NodeId> = VecDeque::new();
        let mut off_pending: VecDeque<NodeId> = VecDeque::new();
        if seed_on {
            closure.push_on(seed_key, seed);
            on_pending.push_back(seed);
        } else {
            closure.push_off(seed_key, seed);
            off_pending.push_back(seed);
        }

        loop {
            if let Some(id) = on_pending.pop_front() {
                let key = arena.key(id).clone();
                for target in dict.weak_targets(&key) {
                    if let Some(as_on) = closure.forced_on(&target.to) {
                        let as_off =
                            arena.intern_child(target.to.clone(), false, id, target.pattern.clone());
                        closure.contradiction = Some(super::forcing::Contradiction {
                            key: target.to.clone(),
                            as_on,
                            as_off,
                        });
                        return closure;
                    }
                    let child =
                        arena.intern_child(target.to.clone(), false, id, target.pattern.clone());
                    if closure.push_off(target.to.clone(), child) {
                        off_pending.push_back(child);
                    }
                }
            } else if let Some(id) = off_pending.pop_front() {
                let key = arena.key(id).clone();
                for target in dict.strong_targets(&key) {
                    if let Some(as_off) = closure.forced_off(&target.to) {
                        let as_on =
                            arena.intern_child(target.to.clone(), true, id, target.pattern.clone());
                        closure.contradiction = Some(super::forcing::Contradiction {
                            key: target.to.clone(),
                            as_on,
                            as_off,
                        });
                        return closure;
                    }
                    let child =
                        arena.intern_child(target.to.clone(), true, id, target.pattern.clone());
                    if closure.push_on(target.to.clone(), child) {
                        on_pending.push_back(child);
                    }
                }
            } else {
                return closure;
            }
        }
    }

    /// Evidence chain from the closure seed to `target`, if it spans at
    /// least one link.
    fn branch_chain(&self, arena: &NodeArena, target: NodeId) -> Option<ForcingBranch> {
        let path = arena.path_from_root(target);
        if path.len() < 2 {
            return None;
        }
        let nodes: Vec<ChainNode> = path
            .iter()
            .map(|&id| ChainNode::new(arena.key(id).clone(), arena.is_on(id)))
            .collect();
        let patterns: Vec<Option<LinkPattern>> = path
            .iter()
            .skip(1)
            .map(|&id| arena.via(id).cloned())
            .collect();
        Some(ForcingBranch {
            chain: Chain::new(nodes, patterns, false),
        })
    }

    // ---- exhaustive seed combination ---------------------------------

    /// Closures for a seed set of which at least one must be true. `None`
    /// when any branch collapses in a contradiction (that reading belongs
    /// to the binary search, not here).
    fn propagate_all(
        &self,
        dict: &LinkDictionary,
        seeds: &[Candidate],
    ) -> Option<(Vec<NodeArena>, Vec<Closure>)> {
        let mut arenas = Vec::with_capacity(seeds.len());
        let mut closures = Vec::with_capacity(seeds.len());
        for &seed in seeds {
            let mut arena = NodeArena::new();
            let closure =
                self.propagate(dict, &mut arena, CandidateSet::single(seed), true);
            if closure.contradiction.is_some() {
                return None;
            }
            arenas.push(arena);
            closures.push(closure);
        }
        Some((arenas, closures))
    }

    /// Singleton keys forced to the same state by every closure, with the
    /// per-branch nodes that prove them.
    fn common_conclusions(
        &self,
        arenas: &[NodeArena],
        closures: &[Closure],
    ) -> Vec<(Conclusion, Vec<NodeId>)> {
        let mut out = Vec::new();
        let first = &closures[0];
        for &id in &first.on {
            let key = arenas[0].key(id).clone();
            let Some(cand) = key.sole() else { continue };
            let ids: Option<Vec<NodeId>> = closures
                .iter()
                .map(|c| c.forced_on(&key))
                .collect();
            if let Some(ids) = ids {
                let conclusion = Conclusion::Assign {
                    cell: cand.cell(),
                    digit: cand.digit(),
                };
                if conclusion.is_live(self.grid) {
                    out.push((conclusion, ids));
                }
            }
        }
        for &id in &first.off {
            let key = arenas[0].key(id).clone();
            let Some(cand) = key.sole() else { continue };
            let ids: Option<Vec<NodeId>> = closures
                .iter()
                .map(|c| c.forced_off(&key))
                .collect();
            if let Some(ids) = ids {
                let conclusion = Conclusion::Eliminate {
                    cell: cand.cell(),
                    digit: cand.digit(),
                };
                if conclusion.is_live(self.grid) {
                    out.push((conclusion, ids));
                }
            }
        }
        out
    }

    fn branches_for(
        &self,
        arenas: &[NodeArena],
        ids: &[NodeId],
    ) -> Vec<ForcingBranch> {
        arenas
            .iter()
            .zip(ids)
            .filter_map(|(arena, &id)| self.branch_chain(arena, id))
            .collect()
    }

    // ---- multiple forcing chains -------------------------------------

    /// Cell and region forcing chains: every candidate of a cell, or every
    /// position of a digit in a house, forces the same conclusion.
    pub fn collect_multiple(&self, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        let dict = self.registry.build_dictionary(&self.fab, ctx.allow_advanced);
        let mut acc = StepAccumulator::new(ctx.find_one);

        // Bivalue cells and conjugate pairs are binary-chain territory;
        // branching starts at three.
        for cell in self.fab.empty_cells() {
            ctx.checkpoint()?;
            if self.fab.cell_cands[cell].count() < 3 {
                continue;
            }
            let seeds: Vec<Candidate> = self.fab.cell_cands[cell]
                .iter()
                .map(|d| Candidate::new(cell, d))
                .collect();
            if self.combine(
                &dict,
                &seeds,
                ForcingAnchor::Cell(cell),
                Technique::CellForcingChains,
                &mut acc,
            ) {
                return Ok(acc.into_steps());
            }
        }

        for house in 0..27 {
            ctx.checkpoint()?;
            for digit in 1..=9u8 {
                if self.fab.house_digit_count(house, digit) < 3 {
                    continue;
                }
                let seeds: Vec<Candidate> = self
                    .fab
                    .candidate_positions(house, digit)
                    .into_iter()
                    .map(|c| Candidate::new(c, digit))
                    .collect();
                if self.combine(
                    &dict,
                    &seeds,
                    ForcingAnchor::House { house, digit },
                    Technique::RegionForcingChains,
                    &mut acc,
                ) {
                    return Ok(acc.into_steps());
                }
            }
        }
        Ok(acc.into_steps())
    }

    /// Shared all-true-exhaustive combination. Returns true when the
    /// accumulator says to stop.
    fn combine(
        &self,
        dict: &LinkDictionary,
        seeds: &[Candidate],
        anchor: ForcingAnchor,
        technique: Technique,
        acc: &mut StepAccumulator,
    ) -> bool {
        let Some((arenas, closures)) = self.propagate_all(dict, seeds) else {
            return false;
        };
        let common = self.common_conclusions(&arenas, &closures);
        if common.is_empty() {
            return false;
        }
        let mut builder = StepBuilder::new(technique);
        for (conclusion, _) in &common {
            builder.conclude(*conclusion);
        }
        let branches = self.branches_for(&arenas, &common[0].1);
        let pattern = StepPattern::Multiple(MultipleForcingChains { anchor, branches });
        match builder.finish(pattern) {
            Some(step) => acc.push(step),
            None => false,
        }
    }

    // ---- rectangle forcing chains ------------------------------------

    /// Forcing chains rooted at the extra candidates of a unique
    /// rectangle: the extras cannot all be false.
    pub fn collect_rectangle(&self, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        let dict = self.registry.build_dictionary(&self.fab, ctx.allow_advanced);
        let mut acc = StepAccumulator::new(ctx.find_one);

        for (cells, digits, extras) in self.rectangle_roots() {
            ctx.checkpoint()?;
            if extras.len() < 2 {
                continue;
            }
            let Some((arenas, closures)) = self.propagate_all(&dict, &extras) else {
                continue;
            };
            let common = self.common_conclusions(&arenas, &closures);
            if common.is_empty() {
                continue;
            }
            let mut builder = StepBuilder::new(Technique::RectangleForcingChains);
            for (conclusion, _) in &common {
                builder.conclude(*conclusion);
            }
            let branches = self.branches_for(&arenas, &common[0].1);
            let step = builder.finish(StepPattern::Rectangle(RectangleForcingChains {
                cells,
                digits,
                branches,
            }));
            if let Some(step) = step {
                if acc.push(step) {
                    break;
                }
            }
        }
        Ok(acc.into_steps())
    }

    /// Rectangles whose floors are a bare pair: the roofs' extra
    /// candidates, which cannot all be false.
    fn rectangle_roots(&self) -> Vec<([usize; 4], [u8; 2], Vec<Candidate>)> {
        let mut out = Vec::new();
        for rect in floored_rectangles(&self.fab) {
            let extras: Vec<Candidate> = rect
                .roof
                .iter()
                .zip(rect.extras.iter())
                .flat_map(|(&cell, ex)| ex.iter().map(move |d| Candidate::new(cell, d)))
                .collect();
            if extras.is_empty() {
                continue;
            }
            out.push((rect.cells, rect.digits, extras));
        }
        out
    }

    // ---- BUG forcing chains ------------------------------------------

    /// BUG+n extras: if every unsolved cell kept two candidates and every
    /// house held each digit an even number of times, the grid would be a
    /// binary universal grave. The odd candidates cannot all be false.
    fn bug_extras(&self) -> Option<Vec<Candidate>> {
        if self.fab.empty_count == 0 {
            return None;
        }
        let mut extras = Vec::new();
        for cell in self.fab.empty_cells() {
            let n = self.fab.cell_cands[cell].count();
            if n < 2 {
                return None;
            }
            if n == 2 {
                continue;
            }
            let before = extras.len();
            for digit in self.fab.cell_cands[cell].iter() {
                let odd = self.fab.cell_houses[cell]
                    .iter()
                    .any(|&h| self.fab.house_digit_count(h, digit) % 2 == 1);
                if odd {
                    extras.push(Candidate::new(cell, digit));
                }
            }
            // A wide cell without any odd digit is not a BUG+n deviation.
            if extras.len() == before {
                return None;
            }
        }
        if extras.is_empty() || extras.len() > 6 {
            return None;
        }
        Some(extras)
    }

    pub fn collect_bug(&self, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        let mut acc = StepAccumulator::new(ctx.find_one);
        let Some(extras) = self.bug_extras() else {
            return Ok(acc.into_steps());
        };
        ctx.checkpoint()?;
        let dict = self.registry.build_dictionary(&self.fab, ctx.allow_advanced);
        let Some((arenas, closures)) = self.propagate_all(&dict, &extras) else {
            return Ok(acc.into_steps());
        };
        let common = self.common_conclusions(&arenas, &closures);
        if !common.is_empty() {
            let mut builder = StepBuilder::new(Technique::BugForcingChains);
            for (conclusion, _) in &common {
                builder.conclude(*conclusion);
            }
            let branches = self.branches_for(&arenas, &common[0].1);
            if let Some(step) = builder.finish(StepPattern::Bug(BugForcingChains {
                extras,
                branches,
            })) {
                acc.push(step);
            }
        }
        Ok(acc.into_steps())
    }

    // ---- binary forcing chains ---------------------------------------

    /// Assume each candidate on and off; a contradiction decides it, and
    /// nodes forced the same way by both assumptions hold regardless.
    pub fn collect_binary(&self, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        let dict = self.registry.build_dictionary(&self.fab, ctx.allow_advanced);
        let mut acc = StepAccumulator::new(ctx.find_one);

        for cell in self.fab.empty_cells() {
            ctx.checkpoint()?;
            for digit in self.fab.cell_cands[cell].iter() {
                let seed = Candidate::new(cell, digit);
                let key = CandidateSet::single(seed);
                let mut arena_on = NodeArena::new();
                let on = self.propagate(&dict, &mut arena_on, key.clone(), true);
                let mut arena_off = NodeArena::new();
                let off = self.propagate(&dict, &mut arena_off, key.clone(), false);

                let step = if let Some(contra) = &on.contradiction {
                    self.binary_contradiction_step(
                        seed,
                        Conclusion::Eliminate { cell, digit },
                        &arena_on,
                        contra,
                    )
                } else if let Some(contra) = &off.contradiction {
                    self.binary_contradiction_step(
                        seed,
                        Conclusion::Assign { cell, digit },
                        &arena_off,
                        contra,
                    )
                } else {
                    self.binary_convergence_step(seed, &arena_on, &on, &arena_off, &off)
                };
                if let Some(step) = step {
                    if acc.push(step) {
                        return Ok(acc.into_steps());
                    }
                }
            }
        }
        Ok(acc.into_steps())
    }

    fn binary_contradiction_step(
        &self,
        seed: Candidate,
        conclusion: Conclusion,
        arena: &NodeArena,
        contra: &super::forcing::Contradiction,
    ) -> Option<Step> {
        if !conclusion.is_live(self.grid) {
            return None;
        }
        let mut branches = Vec::new();
        for id in [contra.as_on, contra.as_off] {
            if let Some(branch) = self.branch_chain(arena, id) {
                branches.push(branch);
            }
        }
        let mut builder = StepBuilder::new(Technique::BinaryForcingChains);
        builder.conclude(conclusion);
        builder.finish(StepPattern::Binary(BinaryForcingChains {
            seed,
            branches,
            contradiction: true,
        }))
    }

    fn binary_convergence_step(
        &self,
        seed: Candidate,
        arena_on: &NodeArena,
        on: &Closure,
        arena_off: &NodeArena,
        off: &Closure,
    ) -> Option<Step> {
        let mut builder = StepBuilder::new(Technique::BinaryForcingChains);
        let mut branches = Vec::new();
        for &id in &on.on {
            let key = arena_on.key(id).clone();
            let Some(other) = off.forced_on(&key) else { continue };
            let Some(cand) = key.sole() else { continue };
            let conclusion = Conclusion::Assign {
                cell: cand.cell(),
                digit: cand.digit(),
            };
            if conclusion.is_live(self.grid) {
                builder.conclude(conclusion);
                if branches.is_empty() {
                    branches.extend(self.branch_chain(arena_on, id));
                    branches.extend(self.branch_chain(arena_off, other));
                }
            }
        }
        for &id in &on.off {
            let key = arena_on.key(id).clone();
            let Some(other) = off.forced_off(&key) else { continue };
            let Some(cand) = key.sole() else { continue };
            let conclusion = Conclusion::Eliminate {
                cell: cand.cell(),
                digit: cand.digit(),
            };
            if conclusion.is_live(self.grid) {
                builder.conclude(conclusion);
                if branches.is_empty() {
                    branches.extend(self.branch_chain(arena_on, id));
                    branches.extend(self.branch_chain(arena_off, other));
                }
            }
        }
        builder.finish(StepPattern::Binary(BinaryForcingChains {
            seed,
            branches,
            contradiction: false,
        }))
    }

    // ---- blossom loops -----------------------------------------------

    /// Blossom loops: branches from every candidate of an entry anchor,
    /// matched one-to-one onto every candidate of an exit anchor.
    pub fn collect_blossom(&self, ctx: &SearchContext) -> Result<Vec<Step>, Interrupted> {
        let dict = self.registry.build_dictionary(&self.fab, ctx.allow_advanced);
        let mut acc = StepAccumulator::new(ctx.find_one);
        let entries = self.anchors(2);

        for entry in &entries {
            ctx.checkpoint()?;
            let seeds = self.anchor_candidates(entry);
            let Some((arenas, closures)) = self.propagate_all(&dict, &seeds) else {
                continue;
            };
            for exit in &entries {
                if exit == entry {
                    continue;
                }
                let exits = self.anchor_candidates(exit);
                if exits.len() != seeds.len() {
                    continue;
                }
                let Some(matching) = match_exits(&closures, &exits) else {
                    continue;
                };
                if self.accept_blossom(
                    &mut acc, entry, exit, &seeds, &exits, &arenas, &closures, &matching,
                ) {
                    return Ok(acc.into_steps());
                }
            }
        }
        Ok(acc.into_steps())
    }

    fn anchors(&self, min: u32) -> Vec<ForcingAnchor> {
        let mut out = Vec::new();
        for cell in self.fab.empty_cells() {
            if self.fab.cell_cands[cell].count() >= min {
                out.push(ForcingAnchor::Cell(cell));
            }
        }
        for house in 0..27 {
            for digit in 1..=9u8 {
                if self.fab.house_digit_count(house, digit) >= min {
                    out.push(ForcingAnchor::House { house, digit });
                }
            }
        }
        out
    }

    fn anchor_candidates(&self, anchor: &ForcingAnchor) -> Vec<Candidate> {
        match *anchor {
            ForcingAnchor::Cell(cell) => self.fab.cell_cands[cell]
                .iter()
                .map(|d| Candidate::new(cell, d))
                .collect(),
            ForcingAnchor::House { house, digit } => self
                .fab
                .candidate_positions(house, digit)
                .into_iter()
                .map(|c| Candidate::new(c, digit))
                .collect(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn accept_blossom(
        &self,
        acc: &mut StepAccumulator,
        entry: &ForcingAnchor,
        exit: &ForcingAnchor,
        seeds: &[Candidate],
        exits: &[Candidate],
        arenas: &[NodeArena],
        closures: &[Closure],
        matching: &[usize],
    ) -> bool {
        let mut branches = Vec::new();
        for (i, &seed) in seeds.iter().enumerate() {
            let key = CandidateSet::single(exits[matching[i]]);
            let Some(id) = closures[i].forced_on(&key) else {
                return false;
            };
            let Some(branch) = self.branch_chain(&arenas[i], id) else {
                return false;
            };
            branches.push((seed, branch));
        }

        let mut builder = StepBuilder::new(Technique::BlossomLoop);
        // Exactly one branch is active, and the matching closes the loop:
        // every weak link in every branch fires.
        for (_, branch) in &branches {
            for (a, b) in branch.chain.weak_links() {
                builder.extend(
                    self.excluded_by_both(&a.key, &b.key)
                        .into_iter()
                        .filter(|c| c.is_live(self.grid)),
                );
            }
        }
        let patterns: Vec<&LinkPattern> = branches
            .iter()
            .flat_map(|(_, b)| b.chain.patterns())
            .collect();
        builder.extend(
            self.registry
                .loop_conclusions(&self.fab, &patterns)
                .into_iter()
                .filter(|c| c.is_live(self.grid)),
        );
        // A house exit confines the digit to its positions: common peers
        // of the exit cells lose it.
        if let ForcingAnchor::House { digit, .. } = *exit {
            let cells: Vec<usize> = exits.iter().map(|c| c.cell()).collect();
            builder.extend(
                self.fab
                    .common_peers(&cells)
                    .into_iter()
                    .filter(|&p| self.fab.has_cand(p, digit))
                    .map(|p| Conclusion::Eliminate {
                        cell: p,
                        digit,
                    })
                    .filter(|c| c.is_live(self.grid)),
            );
        }

        match builder.finish(StepPattern::Blossom(BlossomLoop {
            entry: entry.clone(),
            exit: exit.clone(),
            branches,
        })) {
            Some(step) => acc.push(step),
            None => false,
        }
    }
}

/// First lexicographic perfect matching of branches onto exit candidates:
/// branch `i` must force exit `matching[i]` on.
fn match_exits(closures: &[Closure], exits: &[Candidate]) -> Option<Vec<usize>> {
    fn assign(
        closures: &[Closure],
        exits: &[Candidate],
        i: usize,
        used: &mut Vec<bool>,
        matching: &mut Vec<usize>,
    ) -> bool {
        if i == closures.len() {
            return true;
        }
        for (j, &exit) in exits.iter().enumerate() {
            if used[j] {
                continue;
            }
            let key = CandidateSet::single(exit);
            if closures[i].forced_on(&key).is_none() {
                continue;
            }
            used[j] = true;
            matching.push(j);
            if assign(closures, exits, i + 1, used, matching) {
                return true;
            }
            matching.pop();
            used[j] = false;
        }
        false
    }

    let mut used = vec![false; exits.len()];
    let mut matching = Vec::with_capacity(closures.len());
    if assign(closures, exits, 0, &mut used, &mut matching) {
        Some(matching)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaining::rules::ChainingOptions;
    use crate::chaining::types::CancelFlag;
    use crate::Position;

    fn empty_grid() -> Grid {
        let mut grid = Grid::from_string(
            "000000000000000000000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        grid.recalculate_candidates();
        grid
    }

    fn registry() -> RuleRegistry {
        RuleRegistry::resolve(ChainingOptions::default())
    }

    fn prune_to(grid: &mut Grid, row: usize, col: usize, keep: &[u8]) {
        for digit in 1..=9 {
            if !keep.contains(&digit) {
                grid.eliminate(Position::new(row, col), digit);
            }
        }
    }

    fn has_elimination(steps: &[Step], cell: usize, digit: u8) -> bool {
        steps.iter().any(|s| {
            s.conclusions()
                .contains(&Conclusion::Eliminate { cell, digit })
        })
    }

    // Digit 3 confined to columns 1 and 5 in rows 1 and 5: conjugate
    // pairs in both rows chain into an X-chain across column 5.
    fn skyscraper_grid() -> Grid {
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
    fn test_x_chain_clears_column_between_endpoints() {
        let grid = skyscraper_grid();
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher.collect_chains(&SearchContext::find_all()).unwrap();

        // r1c1 and r5c1 cannot both be false, so the rest of column 1
        // loses digit 3.
        assert!(has_elimination(&steps, cell_at(2, 0), 3));
        assert!(steps
            .iter()
            .filter(|s| has_elimination(std::slice::from_ref(*s), cell_at(2, 0), 3))
            .all(|s| matches!(
                s.technique(),
                Technique::XChain | Technique::ContinuousNiceLoop
            )));
    }

    #[test]
    fn test_no_steps_when_targets_already_gone() {
        let mut grid = skyscraper_grid();
        for row in 0..9 {
            if row != 0 && row != 4 {
                grid.eliminate(Position::new(row, 0), 3);
                grid.eliminate(Position::new(row, 4), 3);
            }
        }
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher.collect_chains(&SearchContext::find_all()).unwrap();
        assert!(steps.is_empty());
    }

    fn cell_at(row: usize, col: usize) -> usize {
        row * 9 + col
    }

    // r1c1 holds {1,2,3}; each digit forces a bivalue cell in column 1
    // to take 4, so r9c1 never does.
    fn cell_forcing_grid() -> Grid {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2, 3]);
        prune_to(&mut grid, 3, 0, &[1, 4]);
        prune_to(&mut grid, 4, 0, &[2, 4]);
        prune_to(&mut grid, 5, 0, &[3, 4]);
        grid
    }

    #[test]
    fn test_cell_forcing_chains_converge() {
        let grid = cell_forcing_grid();
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher
            .collect_multiple(&SearchContext::find_all())
            .unwrap();

        let step = steps
            .iter()
            .find(|s| has_elimination(std::slice::from_ref(*s), cell_at(8, 0), 4))
            .unwrap();
        assert_eq!(step.technique(), Technique::CellForcingChains);
        match step.pattern() {
            StepPattern::Multiple(m) => {
                assert_eq!(m.anchor, ForcingAnchor::Cell(cell_at(0, 0)));
                assert_eq!(m.branches.len(), 3);
            }
            other => panic!("unexpected pattern: {:?}", other),
        }
    }

    #[test]
    fn test_cell_forcing_needs_every_branch() {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2, 3]);
        prune_to(&mut grid, 3, 0, &[1, 4]);
        prune_to(&mut grid, 4, 0, &[2, 4]);
        // Digit 3 in r1c1 no longer reaches a 4-placement.
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher
            .collect_multiple(&SearchContext::find_all())
            .unwrap();
        assert!(!has_elimination(&steps, cell_at(8, 0), 4));
    }

    #[test]
    fn test_binary_contradiction_kills_seed() {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2, 3]);
        prune_to(&mut grid, 0, 4, &[1, 2]);
        prune_to(&mut grid, 0, 8, &[1, 2]);
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher.collect_binary(&SearchContext::find_all()).unwrap();

        // 1 in r1c1 strips digit 1 from both bivalue cells, forcing two
        // 2s into row 1.
        let step = steps
            .iter()
            .find(|s| has_elimination(std::slice::from_ref(*s), cell_at(0, 0), 1))
            .unwrap();
        assert_eq!(step.technique(), Technique::BinaryForcingChains);
        match step.pattern() {
            StepPattern::Binary(b) => {
                assert_eq!(b.seed, Candidate::new(cell_at(0, 0), 1));
                assert!(b.contradiction);
            }
            other => panic!("unexpected pattern: {:?}", other),
        }
    }

    #[test]
    fn test_rectangle_forcing_clears_common_sights() {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2]);
        prune_to(&mut grid, 1, 0, &[1, 2]);
        prune_to(&mut grid, 0, 4, &[1, 2, 3]);
        prune_to(&mut grid, 1, 4, &[1, 2, 3]);
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher
            .collect_rectangle(&SearchContext::find_all())
            .unwrap();

        // One roof extra must hold, and both extras are 3s seeing r3c4.
        let step = steps
            .iter()
            .find(|s| has_elimination(std::slice::from_ref(*s), cell_at(2, 3), 3))
            .unwrap();
        assert_eq!(step.technique(), Technique::RectangleForcingChains);
        assert!(has_elimination(std::slice::from_ref(step), cell_at(3, 4), 3));
    }

    #[test]
    fn test_blossom_loop_between_remote_pairs() {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2]);
        prune_to(&mut grid, 0, 8, &[1, 2]);
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher
            .collect_blossom(&SearchContext::find_all())
            .unwrap();

        // Whichever digit r1c1 takes, r1c9 takes the other, so neither
        // digit survives in between.
        let step = steps
            .iter()
            .find(|s| has_elimination(std::slice::from_ref(*s), cell_at(0, 4), 1))
            .unwrap();
        assert_eq!(step.technique(), Technique::BlossomLoop);
        assert!(has_elimination(std::slice::from_ref(step), cell_at(0, 4), 2));
        match step.pattern() {
            StepPattern::Blossom(b) => assert_eq!(b.branches.len(), 2),
            other => panic!("unexpected pattern: {:?}", other),
        }
    }

    #[test]
    fn test_bug_search_needs_bug_state() {
        let grid = empty_grid();
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher.collect_bug(&SearchContext::find_all()).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_closure_is_closed_under_implication() {
        let grid = skyscraper_grid();
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let dict = registry.build_dictionary(searcher.fabric(), false);
        let seed = CandidateSet::single(Candidate::new(cell_at(0, 0), 3));

        let mut arena = NodeArena::new();
        let closure = searcher.propagate(&dict, &mut arena, seed.clone(), true);
        assert!(closure.contradiction.is_none());
        assert!(closure.forced_on(&seed).is_some());
        // Fixpoint: every implication out of the closure lands back in it.
        for &id in &closure.on {
            for target in dict.weak_targets(arena.key(id)) {
                assert!(closure.forced_off(&target.to).is_some());
            }
        }
        for &id in &closure.off {
            for target in dict.strong_targets(arena.key(id)) {
                assert!(closure.forced_on(&target.to).is_some());
            }
        }
    }

    #[test]
    fn test_contradiction_reports_same_key_every_run() {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2, 3]);
        prune_to(&mut grid, 0, 4, &[1, 2]);
        prune_to(&mut grid, 0, 8, &[1, 2]);
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let dict = registry.build_dictionary(searcher.fabric(), false);
        let seed = CandidateSet::single(Candidate::new(cell_at(0, 0), 1));

        let mut keys = Vec::new();
        for _ in 0..2 {
            let mut arena = NodeArena::new();
            let closure = searcher.propagate(&dict, &mut arena, seed.clone(), true);
            let contradiction = closure.contradiction.expect("seed collapses");
            keys.push(contradiction.key);
        }
        assert_eq!(keys[0], keys[1]);
    }

    #[test]
    fn test_blossom_branches_cover_every_entry_candidate() {
        let mut grid = empty_grid();
        prune_to(&mut grid, 0, 0, &[1, 2]);
        prune_to(&mut grid, 0, 8, &[1, 2]);
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let steps = searcher
            .collect_blossom(&SearchContext::find_all())
            .unwrap();

        assert!(!steps.is_empty());
        for step in &steps {
            let StepPattern::Blossom(b) = step.pattern() else {
                panic!("unexpected pattern: {:?}", step.pattern());
            };
            match b.entry {
                ForcingAnchor::Cell(cell) => {
                    assert_eq!(
                        b.entry_digits(),
                        grid.candidates(Position::new(cell / 9, cell % 9))
                    );
                    assert_eq!(b.entry_cells(), vec![cell]);
                }
                ForcingAnchor::House { house, digit } => {
                    assert_eq!(b.entry_digits(), crate::BitSet::single(digit));
                    assert_eq!(
                        b.entry_cells(),
                        searcher.fabric().candidate_positions(house, digit)
                    );
                }
            }
        }
    }

    #[test]
    fn test_closure_propagation_is_deterministic() {
        let grid = skyscraper_grid();
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let dict = registry.build_dictionary(searcher.fabric(), false);
        let seed = CandidateSet::single(Candidate::new(cell_at(0, 0), 3));

        let mut keys = Vec::new();
        for _ in 0..2 {
            let mut arena = NodeArena::new();
            let closure = searcher.propagate(&dict, &mut arena, seed.clone(), true);
            let on: Vec<CandidateSet> =
                closure.on.iter().map(|&id| arena.key(id).clone()).collect();
            let off: Vec<CandidateSet> =
                closure.off.iter().map(|&id| arena.key(id).clone()).collect();
            keys.push((on, off));
        }
        assert_eq!(keys[0], keys[1]);
    }

    #[test]
    fn test_cancellation_interrupts_search() {
        let grid = skyscraper_grid();
        let registry = registry();
        let searcher = Searcher::new(&grid, &registry);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let ctx = SearchContext::find_all().with_cancel(cancel);
        assert!(searcher.collect_chains(&ctx).is_err());
    }
}
