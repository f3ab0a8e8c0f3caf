//! Property-based tests over the K²-tree, for `k ∈ {2, 4, 8}`.

use std::collections::BTreeSet;

use proptest::prelude::*;
use k2_partition::tree::K2TreeBuilder;

fn ks() -> impl Strategy<Value = usize> {
  prop_oneof![Just(2usize), Just(4usize), Just(8usize)]
}

fn build_from(k: usize, height: usize, edges: &BTreeSet<(usize, usize)>) -> k2_partition::K2Tree {
  let mut b = K2TreeBuilder::new(k, height).unwrap();
  for &(line, col) in edges {
    b.add_edge(line, col).unwrap();
  }
  b.build()
}

proptest! {
  #[test]
  fn round_trip_matches_input_set(
    k in ks(),
    height in 1usize..=2,
    raw_edges in prop::collection::vec((0usize..64, 0usize..64), 0..40),
  ) {
    let size = k.pow(height as u32);
    let edges: BTreeSet<(usize, usize)> = raw_edges.into_iter()
      .map(|(l, c)| (l % size, c % size))
      .collect();
    let tree = build_from(k, height, &edges);
    let got: BTreeSet<(usize, usize)> = tree.iter().collect();
    prop_assert_eq!(got, edges);
  }

  #[test]
  fn two_builds_of_same_edges_agree(
    k in ks(),
    height in 1usize..=2,
    raw_edges in prop::collection::vec((0usize..64, 0usize..64), 0..40),
  ) {
    let size = k.pow(height as u32);
    let edges: BTreeSet<(usize, usize)> = raw_edges.into_iter()
      .map(|(l, c)| (l % size, c % size))
      .collect();
    let t1 = build_from(k, height, &edges);
    let t2 = build_from(k, height, &edges);
    let o1: Vec<_> = t1.iter().collect();
    let o2: Vec<_> = t2.iter().collect();
    prop_assert_eq!(o1, o2);
  }

  #[test]
  fn grow_preserves_edge_set_and_leaf_count(
    k in ks(),
    height in 1usize..=2,
    extra_levels in 0usize..=2,
    raw_edges in prop::collection::vec((0usize..64, 0usize..64), 0..30),
  ) {
    let size = k.pow(height as u32);
    let edges: BTreeSet<(usize, usize)> = raw_edges.into_iter()
      .map(|(l, c)| (l % size, c % size))
      .collect();
    let tree = build_from(k, height, &edges);
    let new_size = k.pow((height + extra_levels) as u32);
    let grown = tree.grow(new_size).unwrap();
    let got: BTreeSet<(usize, usize)> = grown.iter().collect();
    prop_assert_eq!(got, edges);
    prop_assert_eq!(grown.leaves_count(), tree.leaves_count());
    let expected_internal = if tree.is_empty() { 0 } else { tree.internal_count() + extra_levels * k * k };
    prop_assert_eq!(grown.internal_count(), expected_internal);
  }

  #[test]
  fn trim_is_idempotent_and_preserves_edges(
    k in ks(),
    height in 1usize..=3,
    raw_edges in prop::collection::vec((0usize..512, 0usize..512), 0..30),
  ) {
    let size = k.pow(height as u32);
    let edges: BTreeSet<(usize, usize)> = raw_edges.into_iter()
      .map(|(l, c)| (l % size, c % size))
      .collect();
    let tree = build_from(k, height, &edges);
    let trimmed = tree.trim();
    let twice = trimmed.trim();
    prop_assert_eq!(&trimmed, &twice);
    let got: BTreeSet<(usize, usize)> = trimmed.iter().collect();
    prop_assert_eq!(got, edges);
  }
}
