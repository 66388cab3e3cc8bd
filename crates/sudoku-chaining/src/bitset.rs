//! Fixed-width digit set over a raw `u16` mask.
//!
//! The solving engine deals with sets of digits constantly; a bit mask with
//! named operations keeps that cheap without leaking raw integer twiddling
//! into the deduction code.

/// Set of candidate digits 1..=9, stored as bits 0..8 of a `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BitSet(u16);

const ALL_MASK: u16 = 0x1FF;

impl BitSet {
    /// The empty set.
    #[inline]
    pub const fn empty() -> Self {
        BitSet(0)
    }

    /// The set holding every digit 1..=9.
    #[inline]
    pub const fn full() -> Self {
        BitSet(ALL_MASK)
    }

    /// Set holding exactly one digit.
    #[inline]
    pub fn single(digit: u8) -> Self {
        debug_assert!((1..=9).contains(&digit));
        BitSet(1 << (digit - 1))
    }

    /// Build a set from an iterator of digits.
    pub fn from_digits<I: IntoIterator<Item = u8>>(digits: I) -> Self {
        let mut set = BitSet::empty();
        for d in digits {
            set.insert(d);
        }
        set
    }

    #[inline]
    pub fn contains(self, digit: u8) -> bool {
        debug_assert!((1..=9).contains(&digit));
        self.0 & (1 << (digit - 1)) != 0
    }

    #[inline]
    pub fn insert(&mut self, digit: u8) {
        debug_assert!((1..=9).contains(&digit));
        self.0 |= 1 << (digit - 1);
    }

    #[inline]
    pub fn remove(&mut self, digit: u8) {
        debug_assert!((1..=9).contains(&digit));
        self.0 &= !(1 << (digit - 1));
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn union(self, other: BitSet) -> BitSet {
        BitSet(self.0 | other.0)
    }

    #[inline]
    pub fn intersection(self, other: BitSet) -> BitSet {
        BitSet(self.0 & other.0)
    }

    #[inline]
    pub fn difference(self, other: BitSet) -> BitSet {
        BitSet(self.0 & !other.0)
    }

    #[inline]
    pub fn is_subset_of(self, other: BitSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Lowest digit in the set, if any.
    pub fn smallest(self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.0.trailing_zeros() as u8 + 1)
        }
    }

    /// Iterate digits in ascending order.
    #[inline]
    pub fn iter(self) -> DigitIter {
        DigitIter(self.0)
    }

    /// Raw mask, for callers that index by digit bits.
    #[inline]
    pub fn mask(self) -> u16 {
        self.0
    }
}

impl FromIterator<u8> for BitSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        BitSet::from_digits(iter)
    }
}

/// Iterator over the digits of a [`BitSet`], ascending.
#[derive(Debug, Clone, Copy)]
pub struct DigitIter(u16);

impl Iterator for DigitIter {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let digit = self.0.trailing_zeros() as u8 + 1;
        self.0 &= self.0 - 1;
        Some(digit)
    }
}

impl IntoIterator for BitSet {
    type Item = u8;
    type IntoIter = DigitIter;

    fn into_iter(self) -> DigitIter {
        self.iter()
    }
}
