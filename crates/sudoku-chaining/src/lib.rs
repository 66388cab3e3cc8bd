//! Human-style chaining and forcing-chain techniques for Sudoku.
//!
//! The crate models deductions as walks over an implication graph of
//! candidate nodes: strong links (not both false) and weak links (not
//! both true) produced by pluggable rules, consumed by a breadth-first
//! chain search and a family of closure-based forcing-chain searches.
//!
//! ## Example
//!
//! ```
//! use sudoku_chaining::chaining::{ChainingEngine, SearchContext};
//! use sudoku_chaining::{Grid, Position};
//!
//! let mut grid = Grid::from_string(
//!     "000000000000000000000000000000000000000000000000000000000000000000000000000000000",
//! )
//! .unwrap();
//! grid.recalculate_candidates();
//! // Confine digit 3 in rows 1 and 5 to columns 1 and 5.
//! for col in 0..9 {
//!     if col != 0 && col != 4 {
//!         grid.eliminate(Position::new(0, col), 3);
//!         grid.eliminate(Position::new(4, col), 3);
//!     }
//! }
//!
//! let engine = ChainingEngine::default();
//! let steps = engine
//!     .find_forcing_chains(&grid, &SearchContext::find_all())
//!     .unwrap();
//! assert!(!steps.is_empty());
//! ```

mod bitset;
pub mod chaining;
mod grid;

pub use bitset::BitSet;
pub use grid::{Grid, GridParseError, Position};
