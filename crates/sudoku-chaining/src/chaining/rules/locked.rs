//! Grouped links from box/line intersections.
//!
//! A house whose remaining positions for a digit split into exactly two
//! intersection groups carries a grouped strong link: the digit must land
//! in one group or the other. Any two disjoint groups in one house are
//! weakly linked regardless of how many groups the partition has.

use super::{ChainingOptions, ChainingRule, LinkDensity, LinkType};
use crate::chaining::fabric::{Fabric, HOUSE_BOX_BASE, HOUSE_COL_BASE};
use crate::chaining::link::{LinkDictionary, LinkPattern};
use crate::chaining::node::{Candidate, CandidateSet};

pub struct LockedCandidatesRule;

/// Partition the house's candidate cells for a digit by the crossing house
/// (box for lines, row then column for boxes). Each group is confined to a
/// single box/line intersection by construction.
fn intersection_partitions(house: usize, cells: &[usize]) -> Vec<Vec<Vec<usize>>> {
    let crossings: &[fn(usize) -> usize] = if house < HOUSE_BOX_BASE {
        &[|c| HOUSE_BOX_BASE + (c / 9 / 3) * 3 + (c % 9) / 3]
    } else {
        &[|c| c / 9, |c| HOUSE_COL_BASE + c % 9]
    };
    crossings
        .iter()
        .map(|cross| {
            let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
            for &cell in cells {
                let key = cross(cell);
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, g)) => g.push(cell),
                    None => groups.push((key, vec![cell])),
                }
            }
            groups.into_iter().map(|(_, g)| g).collect()
        })
        .collect()
}

fn group_node(cells: &[usize], digit: u8) -> CandidateSet {
    CandidateSet::from_candidates(cells.iter().map(|&c| Candidate::new(c, digit)))
}

impl ChainingRule for LockedCandidatesRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::LockedCandidates]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        let opt = options.get(LinkType::LockedCandidates);
        if !opt.enabled {
            return;
        }
        for house in 0..27 {
            for digit in 1..=9u8 {
                let cells = fab.candidate_positions(house, digit);
                // Two positions are an elementary conjugate pair.
                if cells.len() < 3 {
                    continue;
                }
                for groups in intersection_partitions(house, &cells) {
                    let pattern = LinkPattern::LockedCandidates { house, digit };

                    // Exactly two groups: the digit lands in one or the
                    // other, a grouped strong link.
                    if groups.len() == 2 {
                        dict.insert_strong(
                            group_node(&groups[0], digit),
                            group_node(&groups[1], digit),
                            Some(pattern.clone()),
                        );
                    }

                    if opt.density == LinkDensity::Intersection {
                        continue;
                    }

                    // Disjoint groups of one house cannot both hold the
                    // digit.
                    for i in 0..groups.len() {
                        for j in i + 1..groups.len() {
                            if groups[i].len() == 1 && groups[j].len() == 1 {
                                continue;
                            }
                            dict.insert_weak(
                                group_node(&groups[i], digit),
                                group_node(&groups[j], digit),
                                Some(pattern.clone()),
                            );
                        }
                    }

                    if opt.density != LinkDensity::Unrestricted {
                        continue;
                    }

                    // Outside singletons that see a whole group: the
                    // crossing house's remaining cells.
                    for group in groups.iter().filter(|g| g.len() > 1) {
                        let node = group_node(group, digit);
                        for peer in fab.common_peers(group) {
                            if fab.has_cand(peer, digit)
                                && !fab.cell_houses[peer].contains(&house)
                            {
                                dict.insert_weak(
                                    CandidateSet::single(Candidate::new(peer, digit)),
                                    node.clone(),
                                    Some(pattern.clone()),
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Grid;

    #[test]
    fn test_intersection_partition_of_row() {
        // Row cells 0,1,5 split into box 1 {0,1} and box 2 {5}.
        let parts = intersection_partitions(0, &[0, 1, 5]);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], vec![vec![0, 1], vec![5]]);
    }

    #[test]
    fn test_box_partitions_both_ways() {
        // Box 1 cells 0,1,9 split by row {0,1},{9} and by column {0,9},{1}.
        let parts = intersection_partitions(HOUSE_BOX_BASE, &[0, 1, 9]);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], vec![vec![0, 1], vec![9]]);
        assert_eq!(parts[1], vec![vec![0, 9], vec![1]]);
    }

    fn two_group_grid() -> Grid {
        // Digit 1 in row 1 confined to cells r1c1,r1c2 (box 1) and r1c5
        // (box 2): a grouped strong link. Row 2 rules digit 1 out of
        // box 3; the extra eliminations narrow the rest of the row.
        let mut grid = Grid::from_string(
            "000000000456789123000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        grid.recalculate_candidates();
        for col in [2, 3, 5] {
            grid.eliminate(crate::Position::new(0, col), 1);
        }
        grid
    }

    #[test]
    fn test_two_group_row_gives_grouped_strong_link() {
        let grid = two_group_grid();
        let fab = Fabric::from_grid(&grid);
        assert_eq!(fab.candidate_positions(0, 1), vec![0, 1, 4]);

        let mut dict = LinkDictionary::new();
        LockedCandidatesRule.get_links(&fab, &mut dict, &ChainingOptions::default());
        dict.seal();

        let group = group_node(&[0, 1], 1);
        let single = CandidateSet::single(Candidate::new(4, 1));
        assert!(dict.strong_targets(&group).iter().any(|t| t.to == single));
        assert!(dict
            .strong_targets(&group)
            .iter()
            .any(|t| matches!(t.pattern, Some(LinkPattern::LockedCandidates { house: 0, digit: 1 }))));
        // Disjoint groups are also weakly linked.
        assert!(dict.weak_targets(&group).iter().any(|t| t.to == single));
    }

    #[test]
    fn test_intersection_density_skips_weak_links() {
        let grid = two_group_grid();
        let fab = Fabric::from_grid(&grid);

        let mut options = ChainingOptions::default();
        options.set_density(LinkType::LockedCandidates, LinkDensity::Intersection);
        let mut dict = LinkDictionary::new();
        LockedCandidatesRule.get_links(&fab, &mut dict, &options);
        dict.seal();

        let group = group_node(&[0, 1], 1);
        assert!(!dict.strong_targets(&group).is_empty());
        assert!(dict.weak_targets(&group).is_empty());
    }
}
