//! End-to-end scenarios over `EdgePartition`, independent of internal layout.

use k2_partition::aggregate::{Activeness, Fields};
use k2_partition::partition::EdgePartition;

#[test]
fn s1_tiny_identity() {
  let edges = (0..10).map(|i| (i, i, i));
  let p = EdgePartition::build(2, edges).unwrap();
  assert_eq!(p.size(), 10);
  let mut got: Vec<_> = p.iterator().map(|e| (e.src_id, e.dst_id, *e.attr)).collect();
  got.sort();
  assert_eq!(got, (0..10).map(|i| (i, i, i)).collect::<Vec<_>>());
}

#[test]
fn s2_add_behind_origin() {
  let existing = vec![(4, 4, 16), (4, 5, 20), (5, 4, 20), (6, 6, 36)];
  let p = EdgePartition::build(2, existing).unwrap();
  let p = p.add_edges(vec![(1, 1, 1), (1, 2, 2), (2, 1, 2)]).unwrap();
  assert_eq!(p.size(), 7);
  for e in p.iterator() {
    assert_eq!(*e.attr, e.src_id * e.dst_id);
  }
}

#[test]
fn s3_remove() {
  let edges = (0..10).map(|i| (i, i, i));
  let p = EdgePartition::build(2, edges).unwrap();
  let p = p.remove_edges(vec![(0, 0), (1, 1), (2, 2)]).unwrap();
  assert_eq!(p.size(), 7);
  let mut got: Vec<_> = p.iterator().map(|e| (e.src_id, e.dst_id, *e.attr)).collect();
  got.sort();
  for (src, dst, attr) in got {
    assert_eq!(src, dst);
    assert_eq!(attr, src);
    assert!((3..10).contains(&src));
  }
}

#[test]
fn s4_reverse() {
  let edges: Vec<_> = (0..10).map(|i| (i, i + 1, i)).collect();
  let p = EdgePartition::build(2, edges).unwrap();
  let r = p.reverse();
  let mut got: Vec<_> = r.iterator().map(|e| (e.src_id, e.dst_id, *e.attr)).collect();
  got.sort();
  assert_eq!(got, (0..10).map(|i| (i + 1, i, i)).collect::<Vec<_>>());
}

#[test]
fn s5_aggregate_with_active_set() {
  let edges = (0..10).map(|i| (i, i, i));
  let p = EdgePartition::build(2, edges).unwrap().with_active_set(0..6);
  let out = p.aggregate_messages_edge_scan(
    |ctx| ctx.send_to_dst(1),
    |a, b| a + b,
    Fields::NONE,
    Activeness::Both,
  );
  assert_eq!(out.len(), 6);
  for (_, v) in out {
    assert_eq!(v, 1);
  }
}

#[test]
fn s6_inner_join() {
  let edges = (0..10).map(|i| (i, i, i));
  let p1 = EdgePartition::build(2, edges).unwrap();
  let p2 = p1.map(|_, _, attr| -*attr);
  let joined = p1.inner_join(&p2, |_, _, a, b| a + b).unwrap();
  assert_eq!(joined.size(), 10);
  for e in joined.iterator() {
    assert_eq!(*e.attr, 0);
  }
}
