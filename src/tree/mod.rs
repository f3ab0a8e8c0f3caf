//! The K²-tree: an immutable compressed quadtree ([`K2Tree`]) and the
//! mutable uncompressed form used to build and mutate it ([`K2TreeBuilder`]).

mod builder;
mod iter;
mod tree;

pub use builder::K2TreeBuilder;
pub use iter::TreeIter;
pub use tree::K2Tree;

/// The stable tree index of an edge: the path of per-level Morton digits,
/// root digit most significant, read as a base-`k²` integer.
///
/// `height` digits are used, one per level of the tree (the last digit
/// addresses a single cell within its `k×k` leaf block).
pub(crate) fn tree_index(k: usize, height: usize, line: usize, col: usize) -> usize {
  let mut index = 0usize;
  let mut line = line;
  let mut col = col;
  let mut place = 1usize;
  for _ in 0..height {
    let d = (line % k) * k + col % k;
    index += d * place;
    line /= k;
    col /= k;
    place *= k * k;
  }
  index
}

/// Side length of the square region a single node at `level` (0 = the level
/// directly below the virtual root) addresses, for a tree of `height`
/// levels and matrix side `k^height`.
fn region_side(k: usize, height: usize, level: usize) -> usize {
  k.pow((height - 1 - level) as u32)
}

/// Side length, in nodes, of the full grid of regions at `level`.
fn grid_side(k: usize, level: usize) -> usize {
  k.pow((level + 1) as u32)
}

/// Flat row-major index, within level `level`'s dense grid, of the node
/// whose region contains `(line, col)`.
fn ancestor_grid_index(k: usize, height: usize, level: usize, line: usize, col: usize) -> usize {
  let rs = region_side(k, height, level);
  let gs = grid_side(k, level);
  let r = line / rs;
  let c = col / rs;
  r * gs + c
}

/// Which of a node's `k²` children, at `level`, contains `(line, col)` —
/// the local Morton digit, independent of compression.
fn level_digit(k: usize, height: usize, level: usize, line: usize, col: usize) -> usize {
  let rs = region_side(k, height, level);
  (line / rs % k) * k + col / rs % k
}

/// `Some(exponent)` if `n == base^exponent` exactly, else `None`.
fn log_exact(base: usize, n: usize) -> Option<u32> {
  if n == 0 {
    return None;
  }
  let mut v = 1usize;
  let mut e = 0u32;
  while v < n {
    v *= base;
    e += 1;
  }
  if v == n { Some(e) } else { None }
}

/// Smallest `h` with `k^h >= n` (`n >= 1`).
pub(crate) fn smallest_height(k: usize, n: usize) -> usize {
  let mut h = 0u32;
  let mut size = 1usize;
  while size < n {
    size *= k;
    h += 1;
  }
  h.max(1) as usize
}

#[cfg(test)]
mod mod_tests {
  use super::*;

  #[test]
  fn tree_index_matches_root_major_reading() {
    // k=2, height=2: size=4. Edge at (3,3): both digits are (1,1).
    // digit at depth 0 (block=2, most significant): (3/2%2)*2+(3/2%2) = 1*2+1 = 3
    // digit at depth 1 (block=1, least significant): (3%2)*2+(3%2) = 1*2+1 = 3
    // index = 3*1 + 3*4 = 15
    assert_eq!(tree_index(2, 2, 3, 3), 15);
    assert_eq!(tree_index(2, 2, 0, 0), 0);
  }

  #[test]
  fn smallest_height_is_at_least_one() {
    assert_eq!(smallest_height(2, 1), 1);
    assert_eq!(smallest_height(2, 2), 1);
    assert_eq!(smallest_height(2, 3), 2);
    assert_eq!(smallest_height(2, 4), 2);
    assert_eq!(smallest_height(2, 5), 3);
    assert_eq!(smallest_height(4, 16), 2);
    assert_eq!(smallest_height(4, 17), 3);
  }
}
