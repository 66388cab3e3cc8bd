//! Almost-locked-set links.
//!
//! An ALS is a set of N unsolved cells in one house spanning N+1 digits.
//! Removing any two of its digits would leave N cells with N-1 digits, so
//! the digit groups of an ALS are pairwise strongly linked.

use super::{ChainingOptions, ChainingRule, LinkDensity, LinkType};
use crate::chaining::fabric::{house_cells, Fabric};
use crate::chaining::link::{LinkDictionary, LinkPattern};
use crate::chaining::node::{Candidate, CandidateSet};
use crate::chaining::step::Conclusion;
use crate::BitSet;

pub struct AlmostLockedSetsRule;

struct Als {
    cells: Vec<usize>,
    digits: BitSet,
}

/// Enumerate every ALS of a house up to `max_cells` cells, using Gosper's
/// hack to walk fixed-size subsets of the house's unsolved cells.
fn enumerate_als(fab: &Fabric, house: usize, max_cells: usize) -> Vec<Als> {
    let unsolved: Vec<usize> = house_cells(house)
        .into_iter()
        .filter(|&c| fab.values[c].is_none())
        .collect();
    let m = unsolved.len();
    let mut out = Vec::new();

    for n in 2..=max_cells.min(m) {
        let limit: u32 = 1 << m;
        let mut mask: u32 = (1 << n) - 1;
        while mask < limit {
            let mut digits = BitSet::empty();
            let mut cells = Vec::with_capacity(n);
            for (i, &cell) in unsolved.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    cells.push(cell);
                    digits = digits.union(fab.cell_cands[cell]);
                }
            }
            if digits.count() as usize == n + 1 {
                out.push(Als { cells, digits });
            }
            // Gosper's hack: next subset of the same size.
            let c = mask & mask.wrapping_neg();
            let r = mask + c;
            mask = ((r ^ mask) >> 2) / c | r;
        }
    }
    out
}

fn digit_group(fab: &Fabric, als: &Als, digit: u8) -> Vec<usize> {
    als.cells
        .iter()
        .copied()
        .filter(|&c| fab.has_cand(c, digit))
        .collect()
}

impl ChainingRule for AlmostLockedSetsRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::AlmostLockedSets]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        let opt = options.get(LinkType::AlmostLockedSets);
        if !opt.enabled || opt.max_pattern_size < 2 {
            return;
        }
        for house in 0..27 {
            for als in enumerate_als(fab, house, opt.max_pattern_size) {
                let digits: Vec<u8> = als.digits.iter().collect();
                for i in 0..digits.len() {
                    for j in i + 1..digits.len() {
                        let (d1, d2) = (digits[i], digits[j]);
                        let cells1 = digit_group(fab, &als, d1);
                        let cells2 = digit_group(fab, &als, d2);
                        let a = CandidateSet::from_candidates(
                            cells1.iter().map(|&c| Candidate::new(c, d1)),
                        );
                        let b = CandidateSet::from_candidates(
                            cells2.iter().map(|&c| Candidate::new(c, d2)),
                        );
                        dict.insert_strong(
                            a,
                            b,
                            Some(LinkPattern::AlmostLockedSet {
                                cells: als.cells.clone(),
                                digits: als.digits,
                                entry_digit: d1,
                                exit_digit: d2,
                            }),
                        );
                    }
                }

                if opt.density == LinkDensity::Intersection {
                    continue;
                }

                // Weak links from each multi-cell digit group to outside
                // candidates that see the whole group.
                for &d in &digits {
                    let cells = digit_group(fab, &als, d);
                    if cells.len() < 2 {
                        continue;
                    }
                    let node =
                        CandidateSet::from_candidates(cells.iter().map(|&c| Candidate::new(c, d)));
                    for peer in fab.common_peers(&cells) {
                        if !fab.has_cand(peer, d) {
                            continue;
                        }
                        let in_house = fab.cell_houses[peer].contains(&house);
                        if opt.density == LinkDensity::House && !in_house {
                            continue;
                        }
                        // No pattern tag: this edge alone does not lock the
                        // other ALS digits, and the grouped endpoint already
                        // marks the link as advanced.
                        dict.insert_weak(
                            CandidateSet::single(Candidate::new(peer, d)),
                            node.clone(),
                            None,
                        );
                    }
                }
            }
        }
    }

    /// When a loop runs through an ALS on digits `entry`/`exit`, the other
    /// digits stay locked inside it: eliminate them from common peers of
    /// their in-set positions.
    fn loop_conclusions(
        &self,
        fab: &Fabric,
        patterns: &[&LinkPattern],
        out: &mut Vec<Conclusion>,
    ) {
        for pattern in patterns {
            let LinkPattern::AlmostLockedSet {
                cells,
                digits,
                entry_digit,
                exit_digit,
            } = pattern
            else {
                continue;
            };
            for z in digits.iter() {
                if z == *entry_digit || z == *exit_digit {
                    continue;
                }
                let z_cells: Vec<usize> = cells
                    .iter()
                    .copied()
                    .filter(|&c| fab.has_cand(c, z))
                    .collect();
                for peer in fab.common_peers(&z_cells) {
                    if fab.has_cand(peer, z) {
                        out.push(Conclusion::Eliminate {
                            cell: peer,
                            digit: z,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grid, Position};

    // Row 1: r1c1={1,2}, r1c2={2,3} is an ALS of 2 cells on 3 digits.
    fn als_grid() -> Grid {
        let mut grid = Grid::from_string(
            "000456789000000000000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        grid.recalculate_candidates();
        for d in 3..=9u8 {
            grid.eliminate(Position::new(0, 0), d);
        }
        grid.eliminate(Position::new(0, 1), 1);
        for d in 4..=9u8 {
            grid.eliminate(Position::new(0, 1), d);
        }
        grid
    }

    #[test]
    fn test_enumerate_finds_pair_als() {
        let grid = als_grid();
        let fab = Fabric::from_grid(&grid);
        let sets = enumerate_als(&fab, 0, 2);
        assert!(sets
            .iter()
            .any(|als| als.cells == vec![0, 1] && als.digits == BitSet::from_digits([1, 2, 3])));
    }

    #[test]
    fn test_als_digit_groups_strongly_linked() {
        let grid = als_grid();
        let fab = Fabric::from_grid(&grid);
        let mut dict = LinkDictionary::new();
        AlmostLockedSetsRule.get_links(&fab, &mut dict, &ChainingOptions::default());
        dict.seal();

        // Digit 1 lives only in r1c1, digit 3 only in r1c2: if both were
        // absent the two cells would share the single digit 2.
        let one = CandidateSet::single(Candidate::new(0, 1));
        let three = CandidateSet::single(Candidate::new(1, 3));
        assert!(dict.strong_targets(&one).iter().any(|t| t.to == three));
    }

    #[test]
    fn test_loop_conclusions_lock_remaining_digit() {
        let grid = als_grid();
        let fab = Fabric::from_grid(&grid);
        let pattern = LinkPattern::AlmostLockedSet {
            cells: vec![0, 1],
            digits: BitSet::from_digits([1, 2, 3]),
            entry_digit: 1,
            exit_digit: 3,
        };
        let mut out = Vec::new();
        AlmostLockedSetsRule.loop_conclusions(&fab, &[&pattern], &mut out);
        // Digit 2 is locked into r1c1/r1c2: gone from the rest of the row
        // and box wherever it remains.
        assert!(out.contains(&Conclusion::Eliminate { cell: 2, digit: 2 }));
        assert!(!out.contains(&Conclusion::Eliminate { cell: 0, digit: 2 }));
    }
}
