/*!
These are all the custom errors that this library could return.

Following the nesting convention used throughout this crate:
- `Tree` errors originate from [`crate::bitset::Bitset`] or [`crate::tree`]
  and are wrapped with the higher-level operation that triggered them when
  they cross into the partition layer.
- `ShapeMismatch` and `BadK` are partition-level input-validation errors
  with no lower-level source.

Internal inconsistencies (a leaf count that isn't a multiple of k², a rank
computed past the end of a bitset) are **not** represented here: they are
bugs, and are raised as panics via `debug_assert!`/`unreachable!` at the
point they're detected, per the invariant-violation policy.
*/

/// Errors produced by [`crate::bitset::Bitset`] and [`crate::tree::K2Tree`]/
/// [`crate::tree::K2TreeBuilder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
  /// Produced when a bit index, or a local `(line, col)` coordinate, falls
  /// outside `[0, size)`.
  IndexOutOfRange {
    /// The index that was requested.
    index: usize,
    /// The exclusive upper bound the index was checked against.
    bound: usize,
  },
  /// Produced when `count(lo, hi)` receives an invalid range.
  InvalidRange {
    /// Inclusive lower bound requested.
    lo: usize,
    /// Inclusive upper bound requested.
    hi: usize,
    /// Logical length of the bitset the range was checked against.
    len: usize,
  },
  /// Produced when a user attempts to create a tree with a `k` value below 2.
  SmallKValue {
    ///
    k: usize,
  },
  /// Produced when `grow(new_size)` is called with a `new_size` that isn't
  /// a power of `k`, or is smaller than the tree's current size.
  BadGrowSize {
    /// The tree's current size.
    current_size: usize,
    /// The rejected target size.
    requested_size: usize,
    /// `k` of the tree being grown.
    k: usize,
  },
}
impl std::error::Error for TreeError {}
impl std::fmt::Display for TreeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    use TreeError::*;
    match self {
      IndexOutOfRange{index, bound} => write!(f, "Index {} is out of range: expected < {}.", index, bound),
      InvalidRange{lo, hi, len} => write!(f, "Invalid range [{}, {}] requested on a bitset of length {}.", lo, hi, len),
      SmallKValue{k} => write!(f, "Attempt to create a tree with a k value of {}, which is less than the minimum of 2.", k),
      BadGrowSize{current_size, requested_size, k} => write!(f, "Cannot grow a tree of size {} (k={}) to {}: the target must be a power of k and >= the current size.", current_size, k, requested_size),
    }
  }
}

/// Errors produced as a result of interactions with an
/// [`crate::partition::EdgePartition`].
#[derive(Debug)]
pub enum PartitionError {
  /// Indicates that the source error was produced by the underlying tree
  /// or bitset during the named partition-level operation.
  Tree {
    /// The partition-level operation being performed when the error occurred.
    during: &'static str,
    ///
    source: TreeError,
  },
  /// Produced when `map(iter)` (or any other length-checked bulk update)
  /// receives a sequence whose length doesn't equal the partition's `size`.
  ShapeMismatch {
    /// Number of edges in the partition.
    expected: usize,
    /// Number of items actually supplied.
    actual: usize,
  },
  /// Produced when a user attempts to build a partition with a `k` value
  /// below 2.
  BadK {
    ///
    k: usize,
  },
}
impl std::error::Error for PartitionError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PartitionError::Tree{source, ..} => Some(source),
      _ => None,
    }
  }
}
impl std::fmt::Display for PartitionError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    use PartitionError::*;
    match self {
      Tree{during, source} => write!(f, "Tree operation failed during {}: {}", during, source),
      ShapeMismatch{expected, actual} => write!(f, "Expected {} items but received {}.", expected, actual),
      BadK{k} => write!(f, "Attempt to build a partition with a k value of {}, which is less than the minimum of 2.", k),
    }
  }
}
impl From<TreeError> for PartitionError {
  fn from(source: TreeError) -> Self {
    PartitionError::Tree{during: "tree operation", source}
  }
}

/// Result alias used throughout the bitset/tree layer.
pub type TreeResult<T> = std::result::Result<T, TreeError>;
/// Result alias used throughout the partition layer.
pub type PartitionResult<T> = std::result::Result<T, PartitionError>;
