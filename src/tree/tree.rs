//! The immutable, compressed K²-tree.

use serde::{Serialize, Deserialize};

use crate::bitset::Bitset;
use crate::error::{TreeError, TreeResult};
use super::{level_digit, log_exact, TreeIter, K2TreeBuilder};

/// An immutable compressed quadtree over an `N×N` boolean matrix, `N = k^height`.
///
/// The first `internal.len()` bits describe internal nodes level-by-level in
/// Morton order; the remaining `leaves.len()` bits describe leaf cells,
/// `leaves.len()` bits per set leaf-level node. An empty tree has
/// `leaves.len() == 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct K2Tree {
  k: usize,
  height: usize,
  internal: Bitset,
  leaves: Bitset,
}
impl K2Tree {
  /// Build from already-compressed parts. Only called by
  /// [`K2TreeBuilder::build`] and the tree's own transformations, which
  /// are responsible for upholding the compression invariant.
  pub(crate) fn from_parts(k: usize, height: usize, internal: Bitset, leaves: Bitset) -> Self {
    K2Tree { k, height, internal, leaves }
  }

  /// An empty tree of the given `k` and `height`.
  pub fn empty(k: usize, height: usize) -> TreeResult<Self> {
    if k < 2 {
      return Err(TreeError::SmallKValue { k });
    }
    Ok(K2Tree { k, height, internal: Bitset::new(0), leaves: Bitset::new(0) })
  }

  /// `k`, the tree's branching parameter.
  pub fn k(&self) -> usize { self.k }
  /// Number of subdivision levels; `size = k^height`.
  pub fn height(&self) -> usize { self.height }
  /// Matrix side length.
  pub fn size(&self) -> usize { self.k.pow(self.height as u32) }
  /// Number of bits in the internal (non-leaf) section.
  pub fn internal_count(&self) -> usize { self.internal.len() }
  /// Number of bits in the leaf section.
  pub fn leaves_count(&self) -> usize { self.leaves.len() }
  /// `true` iff the tree has no set leaves.
  pub fn is_empty(&self) -> bool { self.leaves.is_empty() }

  /// `count(0, end)` over the internal section — popcount of tree bits in
  /// `[0, end]`.
  pub fn rank(&self, end: usize) -> TreeResult<usize> {
    self.internal.count(0, end)
  }

  /// Read the bit at `(line, col)`.
  pub fn get(&self, line: usize, col: usize) -> TreeResult<bool> {
    let size = self.size();
    if line >= size || col >= size {
      return Err(TreeError::IndexOutOfRange { index: line.max(col), bound: size });
    }
    let mut p: isize = -1;
    for level in 0..self.height {
      let child_base = self.first_child_offset(p);
      let d = level_digit(self.k, self.height, level, line, col);
      let child = child_base + d;
      if child < self.internal.len() {
        if !self.internal_bit(child) {
          return Ok(false);
        }
        p = child as isize;
      } else {
        let leaf_idx = child - self.internal.len();
        return Ok(self.leaf_bit(leaf_idx));
      }
    }
    unreachable!("descended `height` levels without reaching a leaf bit")
  }

  /// Iterate the tree's edges in Morton (tree) order.
  pub fn iter(&self) -> TreeIter<'_> {
    TreeIter::new(self)
  }

  /// Iterate the tree's edges transposed, `(col, line)` instead of
  /// `(line, col)`, with no structural change to the tree itself.
  pub fn reversed_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
    self.iter().map(|(line, col)| (col, line))
  }

  /// Grow the tree so its `size` becomes `new_size`, a power of `k` no
  /// smaller than the current size. The existing tree is placed in the
  /// top-left subquadrant of the grown matrix.
  pub fn grow(&self, new_size: usize) -> TreeResult<K2Tree> {
    let bad = || TreeError::BadGrowSize { current_size: self.size(), requested_size: new_size, k: self.k };
    let new_height = log_exact(self.k, new_size).ok_or_else(bad)?;
    let new_height = new_height as usize;
    if new_height < self.height {
      return Err(bad());
    }
    let delta_levels = new_height - self.height;
    if delta_levels == 0 {
      return Ok(self.clone());
    }
    if self.is_empty() {
      return Ok(K2Tree { k: self.k, height: new_height, internal: Bitset::new(0), leaves: Bitset::new(0) });
    }
    let kk = self.k * self.k;
    let mut bits = Vec::with_capacity(delta_levels * kk + self.internal.len());
    for _ in 0..delta_levels {
      bits.push(true);
      for _ in 1..kk {
        bits.push(false);
      }
    }
    for i in 0..self.internal.len() {
      bits.push(self.internal_bit(i));
    }
    Ok(K2Tree { k: self.k, height: new_height, internal: Bitset::from_bits(bits), leaves: self.leaves.clone() })
  }

  /// Repeatedly drop an empty top level while `size > k` and it is safe to
  /// do so (every root child but the top-left one is empty).
  pub fn trim(&self) -> K2Tree {
    let mut cur = self.clone();
    while cur.height > 1 && cur.can_drop_top_level() {
      cur = cur.drop_top_level();
    }
    cur
  }

  /// Rehydrate into a mutable builder, for further edits.
  pub fn to_builder(&self) -> K2TreeBuilder {
    let mut b = K2TreeBuilder::new(self.k, self.height).expect("tree's own k/height are valid");
    for (line, col) in self.iter() {
      b.add_edge(line, col).expect("tree's own edges are within its own bounds");
    }
    b
  }

  fn first_child_offset(&self, p: isize) -> usize {
    let rank = if p < 0 { 0 } else { self.internal.count(0, p as usize).expect("rank index in bounds") };
    rank * self.k * self.k
  }
  fn internal_bit(&self, i: usize) -> bool {
    self.internal.get(i).expect("internal index in bounds")
  }
  fn leaf_bit(&self, i: usize) -> bool {
    self.leaves.get(i).expect("leaf index in bounds")
  }

  /// `first_child_offset`, exposed to [`super::TreeIter`]'s traversal.
  pub(super) fn first_child_offset_pub(&self, p: isize) -> usize {
    self.first_child_offset(p)
  }
  /// `internal_bit`, exposed to [`super::TreeIter`]'s traversal.
  pub(super) fn internal_bit_pub(&self, i: usize) -> bool {
    self.internal_bit(i)
  }
  /// `leaf_bit`, exposed to [`super::TreeIter`]'s traversal.
  pub(super) fn leaf_bit_pub(&self, i: usize) -> bool {
    self.leaf_bit(i)
  }

  fn can_drop_top_level(&self) -> bool {
    if self.is_empty() {
      return false;
    }
    let kk = self.k * self.k;
    (1..kk).all(|i| !self.internal_bit(i))
  }
  fn drop_top_level(&self) -> K2Tree {
    let kk = self.k * self.k;
    let remaining: Vec<bool> = (kk..self.internal.len()).map(|i| self.internal_bit(i)).collect();
    K2Tree { k: self.k, height: self.height - 1, internal: Bitset::from_bits(remaining), leaves: self.leaves.clone() }
  }
}
impl std::fmt::Display for K2Tree {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "K2Tree {{ k: {}, height: {}, size: {}, internalCount: {}, leavesCount: {} }}",
      self.k, self.height, self.size(), self.internal_count(), self.leaves_count()
    )
  }
}
impl<'a> IntoIterator for &'a K2Tree {
  type Item = (usize, usize);
  type IntoIter = TreeIter<'a>;
  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::K2TreeBuilder;

  fn build(k: usize, height: usize, edges: &[(usize, usize)]) -> K2Tree {
    let mut b = K2TreeBuilder::new(k, height).unwrap();
    for &(l, c) in edges {
      b.add_edge(l, c).unwrap();
    }
    b.build()
  }

  #[test]
  fn empty_tree_has_no_leaves() {
    let t = build(2, 3, &[]);
    assert!(t.is_empty());
    assert_eq!(t.iter().count(), 0);
  }

  #[test]
  fn round_trips_get_and_iter() {
    let edges = [(0, 0), (1, 2), (3, 3), (2, 1)];
    let t = build(2, 2, &edges);
    for &(l, c) in &edges {
      assert!(t.get(l, c).unwrap());
    }
    assert!(!t.get(0, 1).unwrap());
    let mut got: Vec<_> = t.iter().collect();
    got.sort();
    let mut want: Vec<_> = edges.to_vec();
    want.sort();
    assert_eq!(got, want);
  }

  #[test]
  fn iter_is_morton_ordered() {
    let t = build(2, 2, &[(3, 3), (0, 0), (1, 0)]);
    let order: Vec<_> = t.iter().collect();
    assert_eq!(order, vec![(0, 0), (1, 0), (3, 3)]);
  }

  #[test]
  fn grow_preserves_edges_and_adjusts_counts() {
    let t = build(2, 2, &[(0, 0), (3, 3)]);
    let internal_before = t.internal_count();
    let grown = t.grow(16).unwrap();
    assert_eq!(grown.size(), 16);
    assert_eq!(grown.leaves_count(), t.leaves_count());
    assert_eq!(grown.internal_count(), internal_before + 2 * t.k() * t.k());
    let mut got: Vec<_> = grown.iter().collect();
    got.sort();
    assert_eq!(got, vec![(0, 0), (3, 3)]);
  }

  #[test]
  fn grow_rejects_non_power_and_smaller_size() {
    let t = build(2, 2, &[(0, 0)]);
    assert!(t.grow(3).is_err());
    assert!(t.grow(2).is_err());
  }

  #[test]
  fn trim_is_idempotent_and_preserves_edges() {
    let t = build(2, 3, &[(0, 0), (1, 1)]);
    let trimmed = t.trim();
    let twice = trimmed.trim();
    assert_eq!(trimmed, twice);
    let mut got: Vec<_> = trimmed.iter().collect();
    got.sort();
    assert_eq!(got, vec![(0, 0), (1, 1)]);
  }

  #[test]
  fn grow_then_trim_round_trips() {
    let t = build(2, 2, &[(0, 0), (2, 3)]);
    let grown = t.grow(16).unwrap();
    let trimmed = grown.trim();
    let mut got: Vec<_> = trimmed.iter().collect();
    got.sort();
    assert_eq!(got, vec![(0, 0), (2, 3)]);
  }

  #[test]
  fn reversed_edges_swaps_coordinates() {
    let t = build(2, 2, &[(0, 1), (2, 3)]);
    let mut got: Vec<_> = t.reversed_edges().collect();
    got.sort();
    assert_eq!(got, vec![(1, 0), (3, 2)]);
  }

  #[test]
  fn to_builder_round_trips() {
    let edges = [(0, 0), (1, 2), (3, 1)];
    let t = build(2, 2, &edges);
    let rebuilt = t.to_builder().build();
    assert_eq!(t, rebuilt);
  }
}
