//! Elementary links: conjugate pairs on one digit and bivalue cells.
//!
//! These are the only links an X-Chain or plain AIC needs, and they are
//! always built regardless of the rule configuration's advanced flags.

use super::{ChainingOptions, ChainingRule, LinkType};
use crate::chaining::fabric::Fabric;
use crate::chaining::link::LinkDictionary;
use crate::chaining::node::{Candidate, CandidateSet};

/// Same-digit links within a single house.
///
/// Exactly two positions for a digit form a conjugate pair (strong and
/// weak); more than two positions yield weak links between every pair.
pub struct SameDigitRule;

impl ChainingRule for SameDigitRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::SameDigit]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        if !options.is_enabled(LinkType::SameDigit) {
            return;
        }
        for house in 0..27 {
            for digit in 1..=9u8 {
                let cells = fab.candidate_positions(house, digit);
                if cells.len() < 2 {
                    continue;
                }
                let conjugate = cells.len() == 2;
                for i in 0..cells.len() {
                    for j in i + 1..cells.len() {
                        let a = CandidateSet::single(Candidate::new(cells[i], digit));
                        let b = CandidateSet::single(Candidate::new(cells[j], digit));
                        if conjugate {
                            dict.insert_strong(a.clone(), b.clone(), None);
                        }
                        dict.insert_weak(a, b, None);
                    }
                }
            }
        }
    }
}

/// Same-cell links: the candidates of a bivalue cell are strongly linked,
/// and every candidate pair within one cell is weakly linked.
pub struct SameCellRule;

impl ChainingRule for SameCellRule {
    fn link_types(&self) -> &'static [LinkType] {
        &[LinkType::SameCell]
    }

    fn get_links(&self, fab: &Fabric, dict: &mut LinkDictionary, options: &ChainingOptions) {
        if !options.is_enabled(LinkType::SameCell) {
            return;
        }
        for cell in fab.empty_cells() {
            let digits: Vec<u8> = fab.cell_cands[cell].iter().collect();
            if digits.len() < 2 {
                continue;
            }
            let bivalue = digits.len() == 2;
            for i in 0..digits.len() {
                for j in i + 1..digits.len() {
                    let a = CandidateSet::single(Candidate::new(cell, digits[i]));
                    let b = CandidateSet::single(Candidate::new(cell, digits[j]));
                    if bivalue {
                        dict.insert_strong(a.clone(), b.clone(), None);
                    }
                    dict.insert_weak(a, b, None);
                }
            }
        }
    }
}
