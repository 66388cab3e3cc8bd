//! Dual-indexed candidate snapshot built once per search from a [`Grid`].
//!
//! Answers in O(1): "which cells in house H still admit digit d?" and
//! "which houses does cell C belong to?". All chaining rules and the search
//! driver read `&Fabric`; nothing mutates it after construction.

use crate::{BitSet, Grid, Position};

/// House index convention: 0..8 = rows, 9..17 = columns, 18..26 = boxes.
pub const HOUSE_ROW_BASE: usize = 0;
pub const HOUSE_COL_BASE: usize = 9;
pub const HOUSE_BOX_BASE: usize = 18;

/// Read-only candidate state for one grid snapshot.
pub struct Fabric {
    /// Per-cell candidates, linear cell index 0..80.
    pub cell_cands: [BitSet; 81],
    /// Placed values (None if empty).
    pub values: [Option<u8>; 81],
    /// house_digit_cells[house][digit-1] = bitmask over the 9 in-house slots
    /// holding cells that still admit `digit`.
    pub house_digit_cells: [[u16; 9]; 27],
    /// The 3 houses each cell belongs to: [row, col, box].
    pub cell_houses: [[usize; 3]; 81],
    /// The 20 peers of each cell.
    pub peers: [[u8; 20]; 81],
    /// Number of unsolved cells.
    pub empty_count: usize,
    /// Whether the cell is a given clue.
    pub is_given: [bool; 81],
}

#[inline]
pub fn cell_index(row: usize, col: usize) -> usize {
    row * 9 + col
}

/// The 9 cell indices of a house, in slot order.
pub fn house_cells(house: usize) -> [usize; 9] {
    if house < HOUSE_COL_BASE {
        let row = house;
        std::array::from_fn(|col| cell_index(row, col))
    } else if house < HOUSE_BOX_BASE {
        let col = house - HOUSE_COL_BASE;
        std::array::from_fn(|row| cell_index(row, col))
    } else {
        let box_idx = house - HOUSE_BOX_BASE;
        let base_row = (box_idx / 3) * 3;
        let base_col = (box_idx % 3) * 3;
        std::array::from_fn(|i| cell_index(base_row + i / 3, base_col + i % 3))
    }
}

/// Human-readable house name ("row 3", "column 7", "box 1").
pub fn house_name(house: usize) -> String {
    if house < HOUSE_COL_BASE {
        format!("row {}", house + 1)
    } else if house < HOUSE_BOX_BASE {
        format!("column {}", house - HOUSE_COL_BASE + 1)
    } else {
        format!("box {}", house - HOUSE_BOX_BASE + 1)
    }
}

fn compute_peers(idx: usize) -> [u8; 20] {
    let (row, col) = (idx / 9, idx % 9);
    let base_row = (row / 3) * 3;
    let base_col = (col / 3) * 3;
    let mut peers = [0u8; 20];
    let mut count = 0;

    for c in 0..9 {
        if c != col {
            peers[count] = cell_index(row, c) as u8;
            count += 1;
        }
    }
    for r in 0..9 {
        if r != row {
            peers[count] = cell_index(r, col) as u8;
            count += 1;
        }
    }
    for dr in 0..3 {
        for dc in 0..3 {
            let (r, c) = (base_row + dr, base_col + dc);
            if r != row && c != col {
                peers[count] = cell_index(r, c) as u8;
                count += 1;
            }
        }
    }
    debug_assert_eq!(count, 20);
    peers
}

fn compute_cell_houses(idx: usize) -> [usize; 3] {
    let (row, col) = (idx / 9, idx % 9);
    let box_idx = (row / 3) * 3 + col / 3;
    [
        HOUSE_ROW_BASE + row,
        HOUSE_COL_BASE + col,
        HOUSE_BOX_BASE + box_idx,
    ]
}

/// Slot (0..8) of cell `idx` inside a house it belongs to.
pub fn house_slot(house: usize, idx: usize) -> usize {
    house_cells(house)
        .iter()
        .position(|&c| c == idx)
        .expect("cell not in house")
}

impl Fabric {
    /// Build the snapshot. Called once per top-level search invocation.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut fab = Fabric {
            cell_cands: [BitSet::empty(); 81],
            values: [None; 81],
            house_digit_cells: [[0u16; 9]; 27],
            cell_houses: [[0; 3]; 81],
            peers: [[0; 20]; 81],
            empty_count: 0,
            is_given: [false; 81],
        };

        for idx in 0..81 {
            fab.cell_houses[idx] = compute_cell_houses(idx);
            fab.peers[idx] = compute_peers(idx);
        }

        for idx in 0..81 {
            let pos = Position::from_index(idx);
            fab.is_given[idx] = grid.is_given(pos);
            if let Some(v) = grid.get(pos) {
                fab.values[idx] = Some(v);
            } else {
                fab.empty_count += 1;
                let cands = grid.candidates(pos);
                fab.cell_cands[idx] = cands;
                for d in cands.iter() {
                    let di = (d - 1) as usize;
                    for &house in &fab.cell_houses[idx] {
                        fab.house_digit_cells[house][di] |= 1u16 << house_slot(house, idx);
                    }
                }
            }
        }

        fab
    }

    /// Whether two cells share a row, column, or box.
    #[inline]
    pub fn sees(&self, a: usize, b: usize) -> bool {
        self.cell_houses[a][0] == self.cell_houses[b][0]
            || self.cell_houses[a][1] == self.cell_houses[b][1]
            || self.cell_houses[a][2] == self.cell_houses[b][2]
    }

    #[inline]
    pub fn has_cand(&self, idx: usize, digit: u8) -> bool {
        self.cell_cands[idx].contains(digit)
    }

    /// Cells in a house that still admit `digit`, in slot order.
    pub fn candidate_positions(&self, house: usize, digit: u8) -> Vec<usize> {
        let mask = self.house_digit_cells[house][(digit - 1) as usize];
        let cells = house_cells(house);
        (0..9)
            .filter(|&i| mask & (1u16 << i) != 0)
            .map(|i| cells[i])
            .collect()
    }

    /// How many cells in a house still admit `digit`.
    #[inline]
    pub fn house_digit_count(&self, house: usize, digit: u8) -> u32 {
        self.house_digit_cells[house][(digit - 1) as usize].count_ones()
    }

    /// Cells outside `cells` that see every cell in `cells`.
    pub fn common_peers(&self, cells: &[usize]) -> Vec<usize> {
        if cells.is_empty() {
            return Vec::new();
        }
        let first = cells[0];
        self.peers[first]
            .iter()
            .map(|&p| p as usize)
            .filter(|&p| !cells.contains(&p))
            .filter(|&p| cells[1..].iter().all(|&c| self.sees(p, c)))
            .collect()
    }

    /// Unsolved cell indices, row-major.
    pub fn empty_cells(&self) -> Vec<usize> {
        (0..81).filter(|&i| self.values[i].is_none()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASY: &str =
        "530070000600195000098000060800060003400803001700020006060000280000419005000080079";

    #[test]
    fn test_house_cells() {
        assert_eq!(house_cells(0), [0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(house_cells(9), [0, 9, 18, 27, 36, 45, 54, 63, 72]);
        assert_eq!(house_cells(18), [0, 1, 2, 9, 10, 11, 18, 19, 20]);
    }

    #[test]
    fn test_from_grid_indexes() {
        let grid = Grid::from_string(EASY).unwrap();
        let fab = Fabric::from_grid(&grid);

        assert_eq!(fab.values[0], Some(5));
        assert!(fab.is_given[0]);

        let idx = cell_index(0, 2);
        assert!(fab.values[idx].is_none());
        assert!(!fab.cell_cands[idx].is_empty());
        assert!(!fab.cell_cands[idx].contains(5));

        // The house index agrees with the per-cell candidate sets.
        for house in 0..27 {
            for digit in 1..=9u8 {
                for &cell in &fab.candidate_positions(house, digit) {
                    assert!(fab.has_cand(cell, digit));
                }
            }
        }
    }

    #[test]
    fn test_common_peers() {
        let grid = Grid::from_string(EASY).unwrap();
        let fab = Fabric::from_grid(&grid);
        // Two cells in the same row: common peers include the rest of the row.
        let peers = fab.common_peers(&[cell_index(4, 0), cell_index(4, 8)]);
        assert!(peers.contains(&cell_index(4, 4)));
        assert!(!peers.contains(&cell_index(3, 3)));
    }

    #[test]
    fn test_house_names() {
        assert_eq!(house_name(0), "row 1");
        assert_eq!(house_name(9), "column 1");
        assert_eq!(house_name(26), "box 9");
    }
}
