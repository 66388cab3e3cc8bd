//! XYZ-wing links.
//!
//! A trivalue pivot {x,y,z} with bivalue pincers {x,z} and {y,z} in its
//! sight cannot drop z from all three cells at once: the pivot would be
//! squeezed out entirely. The two pivot-pincer z groups are therefore
//! strongly linked.

use super::{ChainingOptions, ChainingRule, LinkDensity, LinkType};
use crate::chaining::fabric::Fabric;
use crate::chaining::link::{LinkDictionary, LinkPattern};
use crate::chaining::node::{Candidate, CandidateSet};
use crate::chaining::step::Conclusion;

pub struct XyzWingRule;

impl ChainingRule for XyzWingRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::XyzWing]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        let opt = options.get(LinkType::XyzWing);
        if !opt.enabled {
            return;
        }
        for pivot in fab.empty_cells() {
            if fab.cell_cands[pivot].count() != 3 {
                continue;
            }
            let pincers: Vec<usize> = fab
                .empty_cells()
                .into_iter()
                .filter(|&c| {
                    c != pivot
                        && fab.sees(pivot, c)
                        && fab.cell_cands[c].count() == 2
                        && fab.cell_cands[c].is_subset_of(fab.cell_cands[pivot])
                })
                .collect();
            for i in 0..pincers.len() {
                for j in i + 1..pincers.len() {
                    let (p1, p2) = (pincers[i], pincers[j]);
                    let shared = fab.cell_cands[p1].intersection(fab.cell_cands[p2]);
                    // Distinct x/y legs sharing exactly the digit z.
                    if fab.cell_cands[p1] == fab.cell_cands[p2] || shared.count() != 1 {
                        continue;
                    }
                    let z = match shared.smallest() {
                        Some(z) => z,
                        None => continue,
                    };
                    let pattern = LinkPattern::XyzWing {
                        pivot,
                        pincers: [p1, p2],
                        z,
                    };
                    let a = CandidateSet::from_candidates([
                        Candidate::new(pivot, z),
                        Candidate::new(p1, z),
                    ]);
                    let b = CandidateSet::from_candidates([
                        Candidate::new(pivot, z),
                        Candidate::new(p2, z),
                    ]);
                    dict.insert_strong(a.clone(), b.clone(), Some(pattern.clone()));

                    if opt.density == LinkDensity::Intersection {
                        continue;
                    }
                    // External z candidates seeing a whole leg are weakly
                    // linked to it.
                    for (node, pincer) in [(&a, p1), (&b, p2)] {
                        for peer in fab.common_peers(&[pivot, pincer]) {
                            if peer != p1 && peer != p2 && fab.has_cand(peer, z) {
                                dict.insert_weak(
                                    CandidateSet::single(Candidate::new(peer, z)),
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

    /// The wing's z is true in the pivot or a pincer: z leaves every cell
    /// seeing all three.
    fn loop_conclusions(
        &self,
        fab: &Fabric,
        patterns: &[&LinkPattern],
        out: &mut Vec<Conclusion>,
    ) {
        for pattern in patterns {
            let LinkPattern::XyzWing { pivot, pincers, z } = pattern else {
                continue;
            };
            for peer in fab.common_peers(&[*pivot, pincers[0], pincers[1]]) {
                if fab.has_cand(peer, *z) {
                    out.push(Conclusion::Eliminate {
                        cell: peer,
                        digit: *z,
                    });
                }
            }
        }
    }
}
