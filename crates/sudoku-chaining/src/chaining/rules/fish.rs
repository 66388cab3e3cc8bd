//! Fish links on a single digit.
//!
//! An exact X-wing strongly links its two cover-line groups: if both were
//! empty a base line would lose the digit entirely. A finned base line
//! instead links its fin group against its in-cover group, which is the
//! kraken reading of the same pattern.

use super::{ChainingOptions, ChainingRule, LinkDensity, LinkType};
use crate::chaining::fabric::{house_cells, Fabric, HOUSE_COL_BASE, HOUSE_ROW_BASE};
use crate::chaining::link::{LinkDictionary, LinkPattern};
use crate::chaining::node::{Candidate, CandidateSet};
use crate::chaining::step::Conclusion;

pub struct FishRule;

/// Cover house of a cell for the given base orientation.
fn crossing(base_is_row: bool, cell: usize) -> usize {
    if base_is_row {
        HOUSE_COL_BASE + cell % 9
    } else {
        HOUSE_ROW_BASE + cell / 9
    }
}

fn group_node(cells: &[usize], digit: u8) -> CandidateSet {
    CandidateSet::from_candidates(cells.iter().map(|&c| Candidate::new(c, digit)))
}

impl ChainingRule for FishRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::Fish, LinkType::KrakenFish]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        let exact = options.get(LinkType::Fish);
        let kraken = options.get(LinkType::KrakenFish);
        // An X-wing spans two base lines, so each cap gates its own scan.
        let exact_on = exact.enabled && exact.max_pattern_size >= 2;
        let kraken_on = kraken.enabled && kraken.max_pattern_size >= 2;
        if !exact_on && !kraken_on {
            return;
        }

        for digit in 1..=9u8 {
            for base_is_row in [true, false] {
                let lines: Vec<usize> = if base_is_row {
                    (HOUSE_ROW_BASE..HOUSE_ROW_BASE + 9).collect()
                } else {
                    (HOUSE_COL_BASE..HOUSE_COL_BASE + 9).collect()
                };

                for i in 0..9 {
                    for j in 0..9 {
                        if i == j {
                            continue;
                        }
                        // `def` pins the two cover lines; `other` may carry
                        // fins.
                        let (def, other) = (lines[i], lines[j]);
                        let pd = fab.candidate_positions(def, digit);
                        if pd.len() != 2 {
                            continue;
                        }
                        let covers = [
                            crossing(base_is_row, pd[0]),
                            crossing(base_is_row, pd[1]),
                        ];
                        let po = fab.candidate_positions(other, digit);
                        if po.len() < 2 {
                            continue;
                        }
                        let (in_cover, fins): (Vec<usize>, Vec<usize>) = po
                            .iter()
                            .partition(|&&c| covers.contains(&crossing(base_is_row, c)));
                        if in_cover.is_empty() {
                            continue;
                        }

                        if fins.is_empty() {
                            if !exact_on || i > j {
                                continue;
                            }
                            let pattern = LinkPattern::Fish {
                                digit,
                                base: vec![def, other],
                                cover: covers.to_vec(),
                                fins: vec![],
                            };
                            let all: Vec<usize> =
                                pd.iter().chain(po.iter()).copied().collect();
                            let groups: Vec<Vec<usize>> = covers
                                .iter()
                                .map(|&cv| {
                                    all.iter()
                                        .copied()
                                        .filter(|&c| crossing(base_is_row, c) == cv)
                                        .collect()
                                })
                                .collect();
                            dict.insert_strong(
                                group_node(&groups[0], digit),
                                group_node(&groups[1], digit),
                                Some(pattern.clone()),
                            );

                            if exact.density == LinkDensity::Intersection {
                                continue;
                            }
                            // Cover group true places the digit in its
                            // cover line: weak against the line's other
                            // candidates.
                            for group in &groups {
                                let cover = crossing(base_is_row, group[0]);
                                let node = group_node(group, digit);
                                for cell in fab.candidate_positions(cover, digit) {
                                    if !group.contains(&cell) {
                                        dict.insert_weak(
                                            CandidateSet::single(Candidate::new(cell, digit)),
                                            node.clone(),
                                            Some(pattern.clone()),
                                        );
                                    }
                                }
                            }
                        } else if kraken_on {
                            // Finned: the base line holds the digit either
                            // in a fin or inside the covers.
                            dict.insert_strong(
                                group_node(&fins, digit),
                                group_node(&in_cover, digit),
                                Some(LinkPattern::Fish {
                                    digit,
                                    base: vec![def, other],
                                    cover: covers.to_vec(),
                                    fins: fins.clone(),
                                }),
                            );
                        }
                    }
                }
            }
        }
    }

    /// Fish eliminations: cover cells outside the base lines, restricted to
    /// cells seeing every fin when fins are present.
    fn loop_conclusions(
        &self,
        fab: &Fabric,
        patterns: &[&LinkPattern],
        out: &mut Vec<Conclusion>,
    ) {
        for pattern in patterns {
            let LinkPattern::Fish {
                digit,
                base,
                cover,
                fins,
            } = pattern
            else {
                continue;
            };
            for &cv in cover {
                for cell in house_cells(cv) {
                    if !fab.has_cand(cell, *digit) {
                        continue;
                    }
                    if fab.cell_houses[cell].iter().any(|h| base.contains(h)) {
                        continue;
                    }
                    if !fins.iter().all(|&f| fab.sees(cell, f)) {
                        continue;
                    }
                    out.push(Conclusion::Eliminate {
                        cell,
                        digit: *digit,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grid, Position};

    // Digit 4 forms an X-wing on rows 1 and 5, columns 1 and 5.
    fn xwing_grid() -> Grid {
        let mut grid = Grid::from_string(
            "000000000000000000000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        grid.recalculate_candidates();
        for col in 0..9 {
            if col != 0 && col != 4 {
                grid.eliminate(Position::new(0, col), 4);
                grid.eliminate(Position::new(4, col), 4);
            }
        }
        grid
    }

    #[test]
    fn test_exact_xwing_strong_link() {
        let grid = xwing_grid();
        let fab = Fabric::from_grid(&grid);
        let mut dict = LinkDictionary::new();
        FishRule.get_links(&fab, &mut dict, &ChainingOptions::default());
        dict.seal();

        let col1 = group_node(&[0, 36], 4);
        let col5 = group_node(&[4, 40], 4);
        assert!(dict.strong_targets(&col1).iter().any(|t| t.to == col5));
        // Pattern tag names the base rows and cover columns.
        let target = dict
            .strong_targets(&col1)
            .iter()
            .find(|t| t.to == col5)
            .unwrap();
        assert!(matches!(
            &target.pattern,
            Some(LinkPattern::Fish { digit: 4, fins, .. }) if fins.is_empty()
        ));
    }

    #[test]
    fn test_loop_conclusions_clear_cover_lines() {
        let grid = xwing_grid();
        let fab = Fabric::from_grid(&grid);
        let pattern = LinkPattern::Fish {
            digit: 4,
            base: vec![0, 4],
            cover: vec![HOUSE_COL_BASE, HOUSE_COL_BASE + 4],
            fins: vec![],
        };
        let mut out = Vec::new();
        FishRule.loop_conclusions(&fab, &[&pattern], &mut out);
        // Column 1 outside rows 1 and 5 loses digit 4.
        assert!(out.contains(&Conclusion::Eliminate { cell: 18, digit: 4 }));
        // Base cells are untouched.
        assert!(!out.contains(&Conclusion::Eliminate { cell: 0, digit: 4 }));
    }

    #[test]
    fn test_size_cap_suppresses_exact_fish() {
        let grid = xwing_grid();
        let fab = Fabric::from_grid(&grid);
        let mut options = ChainingOptions::default();
        options.set_max_pattern_size(LinkType::Fish, 0);
        let mut dict = LinkDictionary::new();
        FishRule.get_links(&fab, &mut dict, &options);
        dict.seal();

        // The finned scan may still run, but the exact X-wing must not.
        let col1 = group_node(&[0, 36], 4);
        assert!(dict.strong_targets(&col1).is_empty());
        assert_eq!(dict.strong_len(), 0);
    }

    #[test]
    fn test_finned_base_links_fin_to_cover_group() {
        let mut grid = xwing_grid();
        // Reintroduce a fin in row 5 at column 2.
        grid.recalculate_candidates();
        for col in 0..9 {
            if col != 0 && col != 4 {
                grid.eliminate(Position::new(0, col), 4);
                if col != 1 {
                    grid.eliminate(Position::new(4, col), 4);
                }
            }
        }
        let fab = Fabric::from_grid(&grid);
        let mut dict = LinkDictionary::new();
        FishRule.get_links(&fab, &mut dict, &ChainingOptions::default());
        dict.seal();

        let fin = CandidateSet::single(Candidate::new(37, 4));
        let in_cover = group_node(&[36, 40], 4);
        assert!(dict.strong_targets(&fin).iter().any(|t| t.to == in_cover));
    }
}
