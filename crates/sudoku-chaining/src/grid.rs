//! Grid state: 81 cells with placed values, given flags, and candidate sets.
//!
//! The deduction engine never mutates a grid during a search; it reads one
//! snapshot and proposes steps. Applying a step goes back through
//! [`Grid::place`] / [`Grid::eliminate`].

use crate::bitset::BitSet;

/// Error for [`Grid::from_string`].
#[derive(Debug, thiserror::Error)]
pub enum GridParseError {
    /// Input is not 81 characters long.
    #[error("puzzle string should have length 81, found {0}")]
    WrongLength(usize),
    /// Input contains a character other than 1-9, 0 or '.'.
    #[error("invalid character {found:?} at index {index}")]
    InvalidChar { index: usize, found: char },
}

/// A (row, col) coordinate, both 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Linear cell index 0..81.
    #[inline]
    pub fn index(self) -> usize {
        self.row * 9 + self.col
    }

    /// Which of the 9 boxes this position falls in.
    #[inline]
    pub fn box_index(self) -> usize {
        (self.row / 3) * 3 + self.col / 3
    }

    /// Inverse of [`Position::index`].
    #[inline]
    pub fn from_index(idx: usize) -> Self {
        Position::new(idx / 9, idx % 9)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}c{}", self.row + 1, self.col + 1)
    }
}

/// A 9x9 grid snapshot: values, given flags, and per-cell candidate sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    values: [Option<u8>; 81],
    givens: [bool; 81],
    candidates: [BitSet; 81],
}

impl Grid {
    /// Parse an 81-character puzzle string ('0' or '.' for empty cells) and
    /// compute the initial candidates.
    pub fn from_string(s: &str) -> Result<Grid, GridParseError> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 81 {
            return Err(GridParseError::WrongLength(chars.len()));
        }
        let mut grid = Grid {
            values: [None; 81],
            givens: [false; 81],
            candidates: [BitSet::empty(); 81],
        };
        for (index, &ch) in chars.iter().enumerate() {
            match ch {
                '0' | '.' => {}
                '1'..='9' => {
                    grid.values[index] = Some(ch as u8 - b'0');
                    grid.givens[index] = true;
                }
                found => return Err(GridParseError::InvalidChar { index, found }),
            }
        }
        grid.recalculate_candidates();
        Ok(grid)
    }

    /// Placed value at a position, if any.
    #[inline]
    pub fn get(&self, pos: Position) -> Option<u8> {
        self.values[pos.index()]
    }

    #[inline]
    pub fn is_given(&self, pos: Position) -> bool {
        self.givens[pos.index()]
    }

    /// Candidate set of a cell. Empty for solved cells.
    #[inline]
    pub fn candidates(&self, pos: Position) -> BitSet {
        self.candidates[pos.index()]
    }

    /// Place a value and prune the peers' candidates.
    pub fn place(&mut self, pos: Position, digit: u8) {
        let idx = pos.index();
        self.values[idx] = Some(digit);
        self.candidates[idx] = BitSet::empty();
        for peer in 0..81 {
            if peer != idx && sees(idx, peer) {
                self.candidates[peer].remove(digit);
            }
        }
    }

    /// Remove a single candidate from a cell.
    #[inline]
    pub fn eliminate(&mut self, pos: Position, digit: u8) {
        self.candidates[pos.index()].remove(digit);
    }

    /// Whether a candidate is currently present (cell unsolved and digit open).
    #[inline]
    pub fn has_candidate(&self, pos: Position, digit: u8) -> bool {
        self.candidates[pos.index()].contains(digit)
    }

    /// Rebuild every cell's candidate set from the placed values alone.
    /// Discards eliminations made by earlier steps.
    pub fn recalculate_candidates(&mut self) {
        for idx in 0..81 {
            if self.values[idx].is_some() {
                self.candidates[idx] = BitSet::empty();
                continue;
            }
            let mut cands = BitSet::full();
            for peer in 0..81 {
                if peer != idx && sees(idx, peer) {
                    if let Some(v) = self.values[peer] {
                        cands.remove(v);
                    }
                }
            }
            self.candidates[idx] = cands;
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }

    /// All unsolved positions, row-major.
    pub fn empty_positions(&self) -> Vec<Position> {
        (0..81)
            .filter(|&i| self.values[i].is_none())
            .map(Position::from_index)
            .collect()
    }
}

/// Whether two linear cell indices share a row, column, or box.
#[inline]
pub(crate) fn sees(a: usize, b: usize) -> bool {
    let (ar, ac) = (a / 9, a % 9);
    let (br, bc) = (b / 9, b % 9);
    ar == br || ac == bc || (ar / 3 == br / 3 && ac / 3 == bc / 3)
}
