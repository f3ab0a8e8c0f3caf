//! The mutable, uncompressed intermediate form of a [`super::K2Tree`].

use serde::{Serialize, Deserialize};

use crate::bitset::Bitset;
use crate::error::{TreeError, TreeResult};
use super::{ancestor_grid_index, region_side, tree_index, K2Tree};

/// Dense, uncompressed builder for a K²-tree of fixed `k` and `height`.
///
/// Every ancestor of a set leaf is always set (the invariant a compressed
/// [`K2Tree`] relies on); `add_edge`/`remove_edge` maintain it directly
/// rather than recomputing it at `build()` time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct K2TreeBuilder {
  k: usize,
  height: usize,
  size: usize,
  /// `ancestors[level]` holds one bit per node at that level (levels
  /// `0..height-1`, empty when `height == 1`).
  ancestors: Vec<Bitset>,
  /// Dense `size * size` matrix of actual cell values, row-major.
  cells: Bitset,
}
impl K2TreeBuilder {
  /// Create a builder for a tree with the given `k` and `height` (so
  /// `size = k^height`).
  pub fn new(k: usize, height: usize) -> TreeResult<Self> {
    if k < 2 {
      return Err(TreeError::SmallKValue { k });
    }
    let size = k.pow(height as u32);
    let ancestors = (0..height.saturating_sub(1))
      .map(|level| Bitset::new(k.pow(2 * (level as u32 + 1))))
      .collect();
    Ok(K2TreeBuilder { k, height, size, ancestors, cells: Bitset::new(size * size) })
  }

  /// `k`, the tree's branching parameter.
  pub fn k(&self) -> usize { self.k }
  /// Number of levels of subdivision (`size = k^height`).
  pub fn height(&self) -> usize { self.height }
  /// Matrix side length.
  pub fn size(&self) -> usize { self.size }

  /// Set the bit at `(line, col)`, walking ancestors up from the leaf
  /// level. Returns the edge's stable tree index, idempotently.
  pub fn add_edge(&mut self, line: usize, col: usize) -> TreeResult<usize> {
    self.bounds_check(line, col)?;
    let index = tree_index(self.k, self.height, line, col);
    let cell_idx = line * self.size + col;
    if self.cells.get(cell_idx)? {
      return Ok(index);
    }
    self.cells.set(cell_idx)?;
    if self.height >= 2 {
      for level in (0..=self.height - 2).rev() {
        let gi = ancestor_grid_index(self.k, self.height, level, line, col);
        if self.ancestors[level].get(gi)? {
          break;
        }
        self.ancestors[level].set(gi)?;
      }
    }
    Ok(index)
  }

  /// Unset the bit at `(line, col)`, then ascend unsetting any ancestor
  /// whose `k²` block has become entirely zero.
  pub fn remove_edge(&mut self, line: usize, col: usize) -> TreeResult<()> {
    self.bounds_check(line, col)?;
    let cell_idx = line * self.size + col;
    self.cells.unset(cell_idx)?;
    if self.height >= 2 {
      for level in (0..=self.height - 2).rev() {
        if self.children_all_zero(level, line, col)? {
          let gi = ancestor_grid_index(self.k, self.height, level, line, col);
          self.ancestors[level].unset(gi)?;
        } else {
          break;
        }
      }
    }
    Ok(())
  }

  /// Compress the dense bitmap by dropping all-zero `k²` blocks, producing
  /// the immutable tree.
  pub fn build(self) -> K2Tree {
    if self.cells.cardinality() == 0 {
      return K2Tree::from_parts(self.k, self.height, Bitset::new(0), Bitset::new(0));
    }
    if self.height == 1 {
      return K2Tree::from_parts(self.k, self.height, Bitset::new(0), self.cells);
    }
    let mut internal_bits: Vec<bool> = Vec::new();
    let mut frontier: Vec<(usize, usize)> = vec![(0, 0)];
    for level in 0..self.height - 1 {
      let child_side = region_side(self.k, self.height, level);
      let mut next_frontier = Vec::new();
      for &(origin_line, origin_col) in &frontier {
        for dr in 0..self.k {
          for dc in 0..self.k {
            let line = origin_line + dr * child_side;
            let col = origin_col + dc * child_side;
            let gi = ancestor_grid_index(self.k, self.height, level, line, col);
            let set = self.ancestors[level].get(gi).expect("builder ancestor index in bounds");
            internal_bits.push(set);
            if set {
              next_frontier.push((line, col));
            }
          }
        }
      }
      frontier = next_frontier;
    }
    let mut leaf_bits: Vec<bool> = Vec::new();
    for &(origin_line, origin_col) in &frontier {
      for dr in 0..self.k {
        for dc in 0..self.k {
          let idx = (origin_line + dr) * self.size + (origin_col + dc);
          leaf_bits.push(self.cells.get(idx).expect("builder cell index in bounds"));
        }
      }
    }
    K2Tree::from_parts(
      self.k,
      self.height,
      Bitset::from_bits(internal_bits),
      Bitset::from_bits(leaf_bits),
    )
  }

  /// Whether every one of the `k²` children of the node covering
  /// `(line, col)` at `level` is zero (used by `remove_edge`'s ascent).
  fn children_all_zero(&self, level: usize, line: usize, col: usize) -> TreeResult<bool> {
    let rs = region_side(self.k, self.height, level);
    let origin_line = (line / rs) * rs;
    let origin_col = (col / rs) * rs;
    if level == self.height - 2 {
      for dr in 0..self.k {
        for dc in 0..self.k {
          let idx = (origin_line + dr) * self.size + (origin_col + dc);
          if self.cells.get(idx)? {
            return Ok(false);
          }
        }
      }
    } else {
      let child_side = rs / self.k;
      for dr in 0..self.k {
        for dc in 0..self.k {
          let cl = origin_line + dr * child_side;
          let cc = origin_col + dc * child_side;
          let gi = ancestor_grid_index(self.k, self.height, level + 1, cl, cc);
          if self.ancestors[level + 1].get(gi)? {
            return Ok(false);
          }
        }
      }
    }
    Ok(true)
  }

  fn bounds_check(&self, line: usize, col: usize) -> TreeResult<()> {
    if line >= self.size {
      Err(TreeError::IndexOutOfRange { index: line, bound: self.size })
    } else if col >= self.size {
      Err(TreeError::IndexOutOfRange { index: col, bound: self.size })
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_edge_is_idempotent() {
    let mut b = K2TreeBuilder::new(2, 3).unwrap();
    let i1 = b.add_edge(2, 5).unwrap();
    let i2 = b.add_edge(2, 5).unwrap();
    assert_eq!(i1, i2);
  }

  #[test]
  fn remove_then_readd_leaves_builder_empty_then_set() {
    let mut b = K2TreeBuilder::new(2, 2).unwrap();
    b.add_edge(1, 2).unwrap();
    b.remove_edge(1, 2).unwrap();
    let t = b.clone().build();
    assert!(t.is_empty());
    b.add_edge(1, 2).unwrap();
    let t = b.build();
    assert!(!t.is_empty());
  }

  #[test]
  fn single_level_tree_builds_one_leaf_block() {
    let mut b = K2TreeBuilder::new(2, 1).unwrap();
    b.add_edge(0, 1).unwrap();
    let t = b.build();
    let edges: Vec<_> = t.iter().collect();
    assert_eq!(edges, vec![(0, 1)]);
  }

  #[test]
  fn out_of_range_edge_is_index_error() {
    let mut b = K2TreeBuilder::new(2, 2).unwrap();
    assert!(b.add_edge(4, 0).is_err());
  }

  #[test]
  fn small_k_is_rejected() {
    assert!(K2TreeBuilder::new(1, 2).is_err());
  }
}
