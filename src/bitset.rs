/*!
A dense, word-packed bit array.

This is the leaf component everything else is built on: the uncompressed
levels of a [`crate::tree::K2TreeBuilder`], the compressed `internal`/`leaves`
sequences of a [`crate::tree::K2Tree`], and a partition's `srcIndex`/
`dstIndex`/active-set bitsets are all plain `Bitset`s.
*/

use bitvec::prelude::*;
use serde::{Serialize, Deserialize};

use crate::error::{TreeError, TreeResult};

/// A fixed-length, word-packed array of bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bitset {
  bits: BitVec,
}
impl Bitset {
  /// Create a new `Bitset` of logical length `n`, all bits unset.
  pub fn new(n: usize) -> Self {
    Bitset { bits: bitvec![0; n] }
  }
  /// Build a `Bitset` directly from a sequence of bit values.
  pub(crate) fn from_bits(bits: Vec<bool>) -> Self {
    Bitset { bits: bits.into_iter().collect() }
  }
  /// Number of bits in the set.
  pub fn len(&self) -> usize {
    self.bits.len()
  }
  /// `true` if the set has no bits.
  pub fn is_empty(&self) -> bool {
    self.bits.is_empty()
  }
  /// Read the bit at `i`.
  pub fn get(&self, i: usize) -> TreeResult<bool> {
    self.bounds_check(i)?;
    Ok(self.bits[i])
  }
  /// Set the bit at `i` to `1`.
  pub fn set(&mut self, i: usize) -> TreeResult<()> {
    self.bounds_check(i)?;
    self.bits.set(i, true);
    Ok(())
  }
  /// Set the bit at `i` to `0`.
  pub fn unset(&mut self, i: usize) -> TreeResult<()> {
    self.bounds_check(i)?;
    self.bits.set(i, false);
    Ok(())
  }
  /// Inclusive-inclusive popcount over `[lo, hi]`.
  ///
  /// Delegates to `bitvec`'s slice `count_ones`, which counts per machine
  /// word rather than bit-by-bit.
  pub fn count(&self, lo: usize, hi: usize) -> TreeResult<usize> {
    if lo > hi || hi >= self.bits.len() {
      return Err(TreeError::InvalidRange { lo, hi, len: self.bits.len() });
    }
    Ok(self.bits[lo..=hi].count_ones())
  }
  /// Total number of set bits.
  pub fn cardinality(&self) -> usize {
    self.bits.count_ones()
  }
  /// Iterate the positions of set bits, ascending.
  pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
    self.bits.iter().enumerate().filter_map(|(i, bit)| if *bit { Some(i) } else { None })
  }

  fn bounds_check(&self, i: usize) -> TreeResult<()> {
    if i >= self.bits.len() {
      Err(TreeError::IndexOutOfRange { index: i, bound: self.bits.len() })
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_is_all_unset() {
    let b = Bitset::new(10);
    assert_eq!(b.len(), 10);
    assert_eq!(b.cardinality(), 0);
    for i in 0..10 { assert_eq!(b.get(i).unwrap(), false); }
  }

  #[test]
  fn set_unset_roundtrip() {
    let mut b = Bitset::new(8);
    b.set(3).unwrap();
    b.set(7).unwrap();
    assert!(b.get(3).unwrap());
    assert!(b.get(7).unwrap());
    assert_eq!(b.cardinality(), 2);
    b.unset(3).unwrap();
    assert!(!b.get(3).unwrap());
    assert_eq!(b.cardinality(), 1);
  }

  #[test]
  fn out_of_range_is_index_error() {
    let b = Bitset::new(4);
    assert_eq!(b.get(4), Err(TreeError::IndexOutOfRange{index: 4, bound: 4}));
    let mut b = b;
    assert_eq!(b.set(10), Err(TreeError::IndexOutOfRange{index: 10, bound: 4}));
  }

  #[test]
  fn count_is_inclusive_popcount() {
    let mut b = Bitset::new(16);
    for i in [0, 1, 5, 15] { b.set(i).unwrap(); }
    assert_eq!(b.count(0, 15).unwrap(), 4);
    assert_eq!(b.count(0, 0).unwrap(), 1);
    assert_eq!(b.count(2, 4).unwrap(), 0);
    assert_eq!(b.count(5, 15).unwrap(), 2);
  }

  #[test]
  fn count_rejects_bad_range() {
    let b = Bitset::new(4);
    assert!(b.count(3, 1).is_err());
    assert!(b.count(0, 4).is_err());
  }

  #[test]
  fn iter_yields_ascending_set_positions() {
    let mut b = Bitset::new(20);
    for i in [19, 0, 10, 3] { b.set(i).unwrap(); }
    let positions: Vec<usize> = b.iter().collect();
    assert_eq!(positions, vec![0, 3, 10, 19]);
  }
}
