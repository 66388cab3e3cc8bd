//! Uniqueness-based links from rectangles spanning exactly two boxes.
//!
//! In a puzzle with a unique solution, four cells of a two-box rectangle
//! can never all end up as the same candidate pair. A rectangle whose two
//! floor cells are already that bare pair strongly links the extra
//! candidates of its two roof cells. A rectangle partially filled with
//! non-given values weakly links the candidates that would complete the
//! deadly pattern.

use super::{ChainingOptions, ChainingRule, LinkType};
use crate::chaining::fabric::{cell_index, Fabric};
use crate::chaining::link::{LinkDictionary, LinkPattern};
use crate::chaining::node::{Candidate, CandidateSet};
use crate::BitSet;

/// Rectangles lying in exactly two boxes, as (r1, r2, c1, c2).
fn two_box_rectangles() -> Vec<(usize, usize, usize, usize)> {
    let mut out = Vec::new();
    for r1 in 0..9 {
        for r2 in r1 + 1..9 {
            for c1 in 0..9 {
                for c2 in c1 + 1..9 {
                    let same_band = r1 / 3 == r2 / 3;
                    let same_stack = c1 / 3 == c2 / 3;
                    // Exactly two boxes: aligned in one direction only.
                    if same_band != same_stack {
                        out.push((r1, r2, c1, c2));
                    }
                }
            }
        }
    }
    out
}

/// A rectangle whose two floor corners hold the same bare pair and whose
/// roof corners both contain it. `extras` are the roof candidates beyond
/// the pair; either may be empty.
pub(crate) struct FlooredRectangle {
    pub cells: [usize; 4],
    pub digits: [u8; 2],
    pub roof: [usize; 2],
    pub extras: [BitSet; 2],
}

/// Scan for floored rectangles. Shared by the link rule and the
/// rectangle forcing-chain search so the corner logic cannot drift.
pub(crate) fn floored_rectangles(fab: &Fabric) -> Vec<FlooredRectangle> {
    let mut out = Vec::new();
    for (r1, r2, c1, c2) in two_box_rectangles() {
        let cells = [
            cell_index(r1, c1),
            cell_index(r1, c2),
            cell_index(r2, c1),
            cell_index(r2, c2),
        ];
        if cells.iter().any(|&c| fab.values[c].is_some()) {
            continue;
        }

        // Any two corners sharing a bare pair floor the rectangle; the
        // other two are the roof.
        for f1 in 0..4 {
            for f2 in f1 + 1..4 {
                let pair = fab.cell_cands[cells[f1]];
                if pair.count() != 2 || fab.cell_cands[cells[f2]] != pair {
                    continue;
                }
                let roof: Vec<usize> = (0..4)
                    .filter(|i| *i != f1 && *i != f2)
                    .map(|i| cells[i])
                    .collect();
                if !roof
                    .iter()
                    .all(|&c| pair.is_subset_of(fab.cell_cands[c]))
                {
                    continue;
                }
                let digits: Vec<u8> = pair.iter().collect();
                out.push(FlooredRectangle {
                    cells,
                    digits: [digits[0], digits[1]],
                    roof: [roof[0], roof[1]],
                    extras: [
                        fab.cell_cands[roof[0]].difference(pair),
                        fab.cell_cands[roof[1]].difference(pair),
                    ],
                });
            }
        }
    }
    out
}

pub struct UniqueRectangleRule;

impl ChainingRule for UniqueRectangleRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[
            LinkType::UniqueRectangleSameDigit,
            LinkType::UniqueRectangleDifferentDigit,
        ]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        let same_on = options.is_enabled(LinkType::UniqueRectangleSameDigit);
        let diff_on = options.is_enabled(LinkType::UniqueRectangleDifferentDigit);
        if !same_on && !diff_on {
            return;
        }
        for rect in floored_rectangles(fab) {
            if rect.extras.iter().any(|ex| ex.is_empty()) {
                continue;
            }
            let same_digit = rect.extras[0].union(rect.extras[1]).count() == 1;
            if (same_digit && !same_on) || (!same_digit && !diff_on) {
                continue;
            }

            let node = |roof_cell: usize, ex: BitSet| {
                CandidateSet::from_candidates(ex.iter().map(|d| Candidate::new(roof_cell, d)))
            };
            // Both roofs bare would complete the deadly pattern, so at
            // least one extra candidate is true.
            dict.insert_strong(
                node(rect.roof[0], rect.extras[0]),
                node(rect.roof[1], rect.extras[1]),
                Some(LinkPattern::UniqueRectangle {
                    cells: rect.cells,
                    digits: rect.digits,
                    same_digit,
                }),
            );
        }
    }
}

pub struct AvoidableRectangleRule;

impl ChainingRule for AvoidableRectangleRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::AvoidableRectangle]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        if !options.is_enabled(LinkType::AvoidableRectangle) {
            return;
        }
        for (r1, r2, c1, c2) in two_box_rectangles() {
            let cells = [
                cell_index(r1, c1),
                cell_index(r1, c2),
                cell_index(r2, c1),
                cell_index(r2, c2),
            ];
            // Solved corners must be solver placements, not givens.
            if cells.iter().any(|&c| fab.is_given[c]) {
                continue;
            }
            let solved: Vec<usize> = cells
                .iter()
                .copied()
                .filter(|&c| fab.values[c].is_some())
                .collect();
            if solved.len() != 2 {
                continue;
            }
            let open: Vec<usize> = cells
                .iter()
                .copied()
                .filter(|&c| fab.values[c].is_none())
                .collect();
            let (s1, s2) = (solved[0], solved[1]);
            let (a, b) = match (fab.values[s1], fab.values[s2]) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };

            let aligned = s1 / 9 == s2 / 9 || s1 % 9 == s2 % 9;
            if aligned {
                if a == b {
                    continue;
                }
                // Completing the opposite side as (b, a) would make the
                // rectangle avoidable.
                let sees_line = s1 / 9 == s2 / 9;
                let o1 = open
                    .iter()
                    .copied()
                    .find(|&o| if sees_line { o % 9 == s1 % 9 } else { o / 9 == s1 / 9 });
                let o2 = open
                    .iter()
                    .copied()
                    .find(|&o| if sees_line { o % 9 == s2 % 9 } else { o / 9 == s2 / 9 });
                if let (Some(o1), Some(o2)) = (o1, o2) {
                    if fab.has_cand(o1, b) && fab.has_cand(o2, a) {
                        dict.insert_weak(
                            CandidateSet::single(Candidate::new(o1, b)),
                            CandidateSet::single(Candidate::new(o2, a)),
                            Some(LinkPattern::AvoidableRectangle {
                                cells,
                                digits: [a, b],
                            }),
                        );
                    }
                }
            } else {
                // Diagonal placements of one value: the open diagonal
                // completing any shared digit is avoidable.
                if a != b {
                    continue;
                }
                for d in fab.cell_cands[open[0]].intersection(fab.cell_cands[open[1]]).iter() {
                    if d == a {
                        continue;
                    }
                    dict.insert_weak(
                        CandidateSet::single(Candidate::new(open[0], d)),
                        CandidateSet::single(Candidate::new(open[1], d)),
                        Some(LinkPattern::AvoidableRectangle {
                            cells,
                            digits: [a, d],
                        }),
                    );
                }
            }
        }
    }
}
