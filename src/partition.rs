/*!
The edge-partition wrapper: a [`crate::tree::K2Tree`] bound to a parallel
edge-attribute array, a vertex-attribute map, and the bookkeeping a
bulk-synchronous graph engine needs (occupied-row/column bitsets, an optional
active-vertex set, and the local-to-global coordinate offsets).
*/

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::aggregate::{AggregatingEdgeContext, Activeness, Fields, VertexId};
use crate::bitset::Bitset;
use crate::error::{PartitionError, PartitionResult};
use crate::tree::{smallest_height, K2Tree};

/// One edge and its attribute, at global coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge<A> {
  /// Global source vertex id.
  pub src_id: VertexId,
  /// Global destination vertex id.
  pub dst_id: VertexId,
  /// The edge's attribute.
  pub attr: A,
}

/// An edge joined with its endpoints' vertex attributes.
#[derive(Clone, Copy, Debug)]
pub struct Triplet<'a, V, E> {
  /// Global source vertex id.
  pub src_id: VertexId,
  /// The source vertex's attribute, present iff requested by the scan's [`Fields`].
  pub src_attr: Option<&'a V>,
  /// Global destination vertex id.
  pub dst_id: VertexId,
  /// The destination vertex's attribute, present iff requested by the scan's [`Fields`].
  pub dst_attr: Option<&'a V>,
  /// The edge's attribute.
  pub attr: &'a E,
}

/// One shard of a graph: a compressed edge set plus per-edge and per-vertex
/// attributes.
///
/// Immutable. Every transformation below returns a new `EdgePartition`; the
/// tree and attribute array of the receiver are held behind `Rc` and shared
/// by reference count with derivatives that don't touch them, rather than
/// deep-copied.
#[derive(Clone, Debug)]
pub struct EdgePartition<V, E> {
  k: usize,
  tree: Rc<K2Tree>,
  attrs: Rc<Vec<E>>,
  vertex_attrs: HashMap<VertexId, V>,
  src_offset: VertexId,
  dst_offset: VertexId,
  src_index: Bitset,
  dst_index: Bitset,
  active_set: Option<Bitset>,
}
impl<V, E> EdgePartition<V, E> {
  /// Build a partition from an unordered stream of `(srcId, dstId, attr)`
  /// edges. Duplicate `(srcId, dstId)` pairs keep the last attribute seen.
  #[instrument(skip_all, fields(k))]
  pub fn build(k: usize, edges: impl IntoIterator<Item = (VertexId, VertexId, E)>) -> PartitionResult<Self> {
    if k < 2 {
      return Err(PartitionError::BadK { k });
    }
    let edges: Vec<(VertexId, VertexId, E)> = edges.into_iter().collect();
    if edges.is_empty() {
      debug!("building empty partition");
      let size = k;
      return Ok(EdgePartition {
        k,
        tree: Rc::new(K2Tree::empty(k, 1)?),
        attrs: Rc::new(Vec::new()),
        vertex_attrs: HashMap::new(),
        src_offset: 0,
        dst_offset: 0,
        src_index: Bitset::new(size),
        dst_index: Bitset::new(size),
        active_set: None,
      });
    }
    let src_offset = edges.iter().map(|e| e.0).min().unwrap();
    let dst_offset = edges.iter().map(|e| e.1).min().unwrap();
    let end_x = edges.iter().map(|e| e.0).max().unwrap();
    let end_y = edges.iter().map(|e| e.1).max().unwrap();
    let span = ((end_x - src_offset).max(end_y - dst_offset)) as usize + 1;
    let raw_count = edges.len();
    let (tree, attrs, src_index, dst_index) = build_tree(k, span, src_offset, dst_offset, edges)?;
    debug!(raw_count, unique = attrs.len(), size = tree.size(), "partition built");
    Ok(EdgePartition {
      k,
      tree: Rc::new(tree),
      attrs: Rc::new(attrs),
      vertex_attrs: HashMap::new(),
      src_offset,
      dst_offset,
      src_index,
      dst_index,
      active_set: None,
    })
  }

  /// Number of edges in the partition.
  pub fn size(&self) -> usize { self.attrs.len() }
  /// Number of active vertices, or `0` if no active set has been set.
  pub fn num_actives(&self) -> usize { self.active_set.as_ref().map_or(0, Bitset::cardinality) }
  /// Number of distinct occupied local source rows.
  pub fn src_index_size(&self) -> usize { self.src_index.cardinality() }
  /// Number of distinct occupied local destination columns.
  pub fn dst_index_size(&self) -> usize { self.dst_index.cardinality() }
  /// The tree's branching parameter.
  pub fn k(&self) -> usize { self.k }

  /// Iterate edges in tree order, at global coordinates.
  pub fn iterator(&self) -> impl Iterator<Item = Edge<&E>> + '_ {
    self.tree.iter().zip(self.attrs.iter()).map(move |((line, col), attr)| Edge {
      src_id: line as VertexId + self.src_offset,
      dst_id: col as VertexId + self.dst_offset,
      attr,
    })
  }

  /// Iterate edges joined with their endpoints' vertex attributes, at
  /// tree order. `fields` controls which side(s) are looked up.
  pub fn triplet_iterator(&self, fields: Fields) -> impl Iterator<Item = Triplet<'_, V, E>> + '_ {
    self.iterator().map(move |e| Triplet {
      src_id: e.src_id,
      src_attr: if fields.src { self.vertex_attrs.get(&e.src_id) } else { None },
      dst_id: e.dst_id,
      dst_attr: if fields.dst { self.vertex_attrs.get(&e.dst_id) } else { None },
      attr: e.attr,
    })
  }

  /// Install an active-vertex set, replacing any previous one.
  pub fn with_active_set(&self, actives: impl IntoIterator<Item = VertexId>) -> Self
  where
    V: Clone,
    E: Clone,
  {
    let size = self.tree.size();
    let base = self.src_offset.min(self.dst_offset);
    let mut bits = Bitset::new(size);
    for vid in actives {
      let local = vid - base;
      if local >= 0 && (local as usize) < size {
        bits.set(local as usize).expect("bounds already checked");
      }
    }
    EdgePartition { active_set: Some(bits), ..self.clone() }
  }

  /// Drop all vertex attributes, keeping the edge set unchanged.
  pub fn without_vertex_attributes(&self) -> EdgePartition<(), E> {
    EdgePartition {
      k: self.k,
      tree: self.tree.clone(),
      attrs: self.attrs.clone(),
      vertex_attrs: HashMap::new(),
      src_offset: self.src_offset,
      dst_offset: self.dst_offset,
      src_index: self.src_index.clone(),
      dst_index: self.dst_index.clone(),
      active_set: self.active_set.clone(),
    }
  }

  /// Overlay new vertex attributes onto the existing mapping. The edge set
  /// and edge attributes are unchanged.
  pub fn update_vertices(&self, updates: impl IntoIterator<Item = (VertexId, V)>) -> Self
  where
    V: Clone,
    E: Clone,
  {
    let mut vertex_attrs = self.vertex_attrs.clone();
    for (vid, v) in updates {
      vertex_attrs.insert(vid, v);
    }
    EdgePartition { vertex_attrs, ..self.clone() }
  }

  /// Add edges, rebuilding the tree over the union of existing and new
  /// edges. Handles growth in any direction, including edges that fall
  /// before the current origin.
  #[instrument(skip_all)]
  pub fn add_edges(&self, new_edges: impl IntoIterator<Item = (VertexId, VertexId, E)>) -> PartitionResult<Self>
  where
    V: Clone,
    E: Clone,
  {
    let old_size = self.tree.size();
    let mut all: Vec<(VertexId, VertexId, E)> = self.global_edges().collect();
    all.extend(new_edges);
    if all.is_empty() {
      return Self::build(self.k, all);
    }
    let src_offset = all.iter().map(|e| e.0).min().unwrap();
    let dst_offset = all.iter().map(|e| e.1).min().unwrap();
    let end_x = all.iter().map(|e| e.0).max().unwrap();
    let end_y = all.iter().map(|e| e.1).max().unwrap();
    let span = ((end_x - src_offset).max(end_y - dst_offset)) as usize + 1;
    let (tree, attrs, src_index, dst_index) = build_tree(self.k, span, src_offset, dst_offset, all)?;
    debug!(old_size, new_size = tree.size(), unique = attrs.len(), "partition rebuilt after addEdges");
    Ok(EdgePartition {
      k: self.k,
      tree: Rc::new(tree),
      attrs: Rc::new(attrs),
      vertex_attrs: self.vertex_attrs.clone(),
      src_offset,
      dst_offset,
      src_index,
      dst_index,
      active_set: None,
    })
  }

  /// Remove edges by `(srcId, dstId)`. Pairs not present in the partition
  /// are ignored.
  #[instrument(skip_all)]
  pub fn remove_edges(&self, pairs: impl IntoIterator<Item = (VertexId, VertexId)>) -> PartitionResult<Self>
  where
    V: Clone,
    E: Clone,
  {
    let size = self.tree.size();
    let mut remaining: BTreeMap<usize, E> = self
      .tree
      .iter()
      .zip(self.attrs.iter().cloned())
      .map(|((line, col), attr)| (line * size + col, attr))
      .collect();
    let mut builder = self.tree.to_builder();
    for (src_id, dst_id) in pairs {
      let (line, col) = match self.to_local(src_id, dst_id) {
        Some(lc) => lc,
        None => continue,
      };
      builder.remove_edge(line, col)?;
      remaining.remove(&(line * size + col));
    }
    let tree = builder.build();
    let mut src_index = Bitset::new(size);
    let mut dst_index = Bitset::new(size);
    for &key in remaining.keys() {
      src_index.set(key / size).expect("derived from a valid local coordinate");
      dst_index.set(key % size).expect("derived from a valid local coordinate");
    }
    let attrs = tree
      .iter()
      .map(|(line, col)| remaining.get(&(line * size + col)).cloned().expect("rebuilt tree only contains surviving edges"))
      .collect();
    debug!(remaining = attrs.len(), "edges removed");
    Ok(EdgePartition {
      k: self.k,
      tree: Rc::new(tree),
      attrs: Rc::new(attrs),
      vertex_attrs: self.vertex_attrs.clone(),
      src_offset: self.src_offset,
      dst_offset: self.dst_offset,
      src_index,
      dst_index,
      active_set: self.active_set.clone(),
    })
  }

  /// Map each edge's attribute by a function of its endpoints and current
  /// attribute. The tree is shared.
  pub fn map<E2>(&self, mut f: impl FnMut(VertexId, VertexId, &E) -> E2) -> EdgePartition<V, E2>
  where
    V: Clone,
  {
    let attrs = self.iterator().map(|e| f(e.src_id, e.dst_id, e.attr)).collect();
    EdgePartition {
      k: self.k,
      tree: self.tree.clone(),
      attrs: Rc::new(attrs),
      vertex_attrs: self.vertex_attrs.clone(),
      src_offset: self.src_offset,
      dst_offset: self.dst_offset,
      src_index: self.src_index.clone(),
      dst_index: self.dst_index.clone(),
      active_set: self.active_set.clone(),
    }
  }

  /// Replace attributes with the exactly `size()` items from `iter`, in
  /// tree order. Fails with [`PartitionError::ShapeMismatch`] if the
  /// iterator's length doesn't match.
  pub fn map_iter<E2>(&self, iter: impl IntoIterator<Item = E2>) -> PartitionResult<EdgePartition<V, E2>>
  where
    V: Clone,
  {
    let attrs: Vec<E2> = iter.into_iter().collect();
    if attrs.len() != self.size() {
      return Err(PartitionError::ShapeMismatch { expected: self.size(), actual: attrs.len() });
    }
    Ok(EdgePartition {
      k: self.k,
      tree: self.tree.clone(),
      attrs: Rc::new(attrs),
      vertex_attrs: self.vertex_attrs.clone(),
      src_offset: self.src_offset,
      dst_offset: self.dst_offset,
      src_index: self.src_index.clone(),
      dst_index: self.dst_index.clone(),
      active_set: self.active_set.clone(),
    })
  }

  /// Keep only triplets passing both `vpred` (applied to each endpoint) and
  /// `epred` (applied to the full triplet, vertex attrs included).
  #[instrument(skip_all)]
  pub fn filter(
    &self,
    vpred: impl Fn(VertexId, Option<&V>) -> bool,
    epred: impl Fn(&Triplet<'_, V, E>) -> bool,
  ) -> PartitionResult<Self>
  where
    V: Clone,
    E: Clone,
  {
    let height = self.tree.height();
    let size = self.tree.size();
    let mut builder = crate::tree::K2TreeBuilder::new(self.k, height)?;
    let mut kept: BTreeMap<usize, E> = BTreeMap::new();
    for t in self.triplet_iterator(Fields::ALL) {
      if vpred(t.src_id, t.src_attr) && vpred(t.dst_id, t.dst_attr) && epred(&t) {
        let line = (t.src_id - self.src_offset) as usize;
        let col = (t.dst_id - self.dst_offset) as usize;
        builder.add_edge(line, col)?;
        kept.insert(line * size + col, t.attr.clone());
      }
    }
    let tree = builder.build();
    let mut src_index = Bitset::new(size);
    let mut dst_index = Bitset::new(size);
    for &key in kept.keys() {
      src_index.set(key / size)?;
      dst_index.set(key % size)?;
    }
    let attrs: Vec<E> = tree
      .iter()
      .map(|(line, col)| kept.get(&(line * size + col)).cloned().expect("rebuilt tree only contains kept edges"))
      .collect();
    debug!(kept = attrs.len(), "partition filtered");
    Ok(EdgePartition {
      k: self.k,
      tree: Rc::new(tree),
      attrs: Rc::new(attrs),
      vertex_attrs: self.vertex_attrs.clone(),
      src_offset: self.src_offset,
      dst_offset: self.dst_offset,
      src_index,
      dst_index,
      active_set: self.active_set.clone(),
    })
  }

  /// Return a partition whose edges are transposed `(dstId, srcId)`, with
  /// attributes re-paired to the transposed tree's own traversal order.
  #[instrument(skip_all)]
  pub fn reverse(&self) -> Self
  where
    E: Clone,
    V: Clone,
  {
    let size = self.tree.size();
    let by_swapped: HashMap<usize, E> = self
      .tree
      .iter()
      .zip(self.attrs.iter().cloned())
      .map(|((line, col), attr)| (col * size + line, attr))
      .collect();
    let mut builder = crate::tree::K2TreeBuilder::new(self.k, self.tree.height()).expect("same k/height as an existing tree");
    for (line, col) in self.tree.reversed_edges() {
      builder.add_edge(line, col).expect("transposed coordinates stay within the same size");
    }
    let tree = builder.build();
    let attrs = tree
      .iter()
      .map(|(line, col)| by_swapped.get(&(line * size + col)).cloned().expect("transposed tree only contains transposed edges"))
      .collect();
    EdgePartition {
      k: self.k,
      tree: Rc::new(tree),
      attrs: Rc::new(attrs),
      vertex_attrs: self.vertex_attrs.clone(),
      src_offset: self.dst_offset,
      dst_offset: self.src_offset,
      src_index: self.dst_index.clone(),
      dst_index: self.src_index.clone(),
      active_set: self.active_set.clone(),
    }
  }

  /// Set-intersect this partition's edges (by global coordinates) with
  /// `other`'s, combining attributes with `f`.
  ///
  /// Tree order is Morton order, not lexicographic `(src, dst)` order, so
  /// both sides are sorted by global coordinate before the merge walk.
  #[instrument(skip_all)]
  pub fn inner_join<V2, E2, E3>(
    &self,
    other: &EdgePartition<V2, E2>,
    f: impl Fn(VertexId, VertexId, &E, &E2) -> E3,
  ) -> PartitionResult<EdgePartition<V, E3>>
  where
    V: Clone,
  {
    let mut a: Vec<(VertexId, VertexId, &E)> = self.iterator().map(|e| (e.src_id, e.dst_id, e.attr)).collect();
    let mut b: Vec<(VertexId, VertexId, &E2)> = other.iterator().map(|e| (e.src_id, e.dst_id, e.attr)).collect();
    a.sort_by_key(|e| (e.0, e.1));
    b.sort_by_key(|e| (e.0, e.1));
    let mut joined = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
      let (as_, ad, aa) = a[i];
      let (bs, bd, ba) = b[j];
      match (as_, ad).cmp(&(bs, bd)) {
        std::cmp::Ordering::Less => i += 1,
        std::cmp::Ordering::Greater => j += 1,
        std::cmp::Ordering::Equal => {
          joined.push((as_, ad, f(as_, ad, aa, ba)));
          i += 1;
          j += 1;
        }
      }
    }
    debug!(left = a.len(), right = b.len(), matched = joined.len(), "inner join");
    EdgePartition::build(self.k, joined).map(|mut p| {
      p.vertex_attrs = self.vertex_attrs.clone();
      p
    })
  }

  /// Scan every edge, testing `activeness` against the active set, invoking
  /// `send_msg` on each active edge's context. Returns the accumulated
  /// `VertexId → A` mapping, in unspecified order.
  #[instrument(skip_all)]
  pub fn aggregate_messages_edge_scan<A>(
    &self,
    mut send_msg: impl FnMut(&mut AggregatingEdgeContext<'_, V, A>),
    merge_msg: impl Fn(A, A) -> A,
    fields: Fields,
    activeness: Activeness,
  ) -> Vec<(VertexId, A)> {
    let mut messages: HashMap<VertexId, A> = HashMap::new();
    for t in self.triplet_iterator(fields) {
      if !activeness.is_active(self.is_active(t.src_id), self.is_active(t.dst_id)) {
        continue;
      }
      let mut ctx = AggregatingEdgeContext::new(t.src_id, t.dst_id, t.src_attr, t.dst_attr, &mut messages, &merge_msg);
      send_msg(&mut ctx);
    }
    let out: Vec<(VertexId, A)> = messages.into_iter().collect();
    debug!(recipients = out.len(), "edge scan aggregated");
    out
  }

  /// As [`Self::aggregate_messages_edge_scan`], but enumerated by occupied
  /// source row rather than by raw tree order.
  #[instrument(skip_all)]
  pub fn aggregate_messages_src_index_scan<A>(
    &self,
    send_msg: impl FnMut(&mut AggregatingEdgeContext<'_, V, A>),
    merge_msg: impl Fn(A, A) -> A,
    fields: Fields,
    activeness: Activeness,
  ) -> Vec<(VertexId, A)> {
    let out = self.aggregate_messages_grouped(self.src_index.iter(), true, send_msg, merge_msg, fields, activeness);
    debug!(recipients = out.len(), "src-index scan aggregated");
    out
  }

  /// As [`Self::aggregate_messages_edge_scan`], but enumerated by occupied
  /// destination column rather than by raw tree order.
  #[instrument(skip_all)]
  pub fn aggregate_messages_dst_index_scan<A>(
    &self,
    send_msg: impl FnMut(&mut AggregatingEdgeContext<'_, V, A>),
    merge_msg: impl Fn(A, A) -> A,
    fields: Fields,
    activeness: Activeness,
  ) -> Vec<(VertexId, A)> {
    let out = self.aggregate_messages_grouped(self.dst_index.iter(), false, send_msg, merge_msg, fields, activeness);
    debug!(recipients = out.len(), "dst-index scan aggregated");
    out
  }

  fn aggregate_messages_grouped<A>(
    &self,
    positions: impl Iterator<Item = usize>,
    by_src: bool,
    mut send_msg: impl FnMut(&mut AggregatingEdgeContext<'_, V, A>),
    merge_msg: impl Fn(A, A) -> A,
    fields: Fields,
    activeness: Activeness,
  ) -> Vec<(VertexId, A)> {
    let size = self.tree.size();
    let mut grouped: HashMap<usize, Vec<usize>> = HashMap::new();
    for (line, col) in self.tree.iter() {
      let (key, other) = if by_src { (line, col) } else { (col, line) };
      grouped.entry(key).or_insert_with(Vec::new).push(other);
    }
    let mut messages: HashMap<VertexId, A> = HashMap::new();
    for pos in positions {
      let others = match grouped.get(&pos) {
        Some(v) => v,
        None => continue,
      };
      for &other in others {
        let (line, col) = if by_src { (pos, other) } else { (other, pos) };
        if col >= size {
          continue;
        }
        let src_id = line as VertexId + self.src_offset;
        let dst_id = col as VertexId + self.dst_offset;
        if !activeness.is_active(self.is_active(src_id), self.is_active(dst_id)) {
          continue;
        }
        let src_attr = if fields.src { self.vertex_attrs.get(&src_id) } else { None };
        let dst_attr = if fields.dst { self.vertex_attrs.get(&dst_id) } else { None };
        let mut ctx = AggregatingEdgeContext::new(src_id, dst_id, src_attr, dst_attr, &mut messages, &merge_msg);
        send_msg(&mut ctx);
      }
    }
    messages.into_iter().collect()
  }

  fn is_active(&self, vid: VertexId) -> bool {
    match &self.active_set {
      None => false,
      Some(bits) => {
        let base = self.src_offset.min(self.dst_offset);
        let local = vid - base;
        local >= 0 && (local as usize) < bits.len() && bits.get(local as usize).unwrap_or(false)
      }
    }
  }

  fn to_local(&self, src_id: VertexId, dst_id: VertexId) -> Option<(usize, usize)> {
    let size = self.tree.size();
    let line = src_id - self.src_offset;
    let col = dst_id - self.dst_offset;
    if line >= 0 && col >= 0 && (line as usize) < size && (col as usize) < size {
      Some((line as usize, col as usize))
    } else {
      None
    }
  }

  fn global_edges(&self) -> impl Iterator<Item = (VertexId, VertexId, E)> + '_
  where
    E: Clone,
  {
    self.iterator().map(|e| (e.src_id, e.dst_id, e.attr.clone()))
  }
}

fn build_tree<E>(
  k: usize,
  span: usize,
  src_offset: VertexId,
  dst_offset: VertexId,
  edges: Vec<(VertexId, VertexId, E)>,
) -> PartitionResult<(K2Tree, Vec<E>, Bitset, Bitset)> {
  let height = smallest_height(k, span);
  let size = k.pow(height as u32);
  let mut builder = crate::tree::K2TreeBuilder::new(k, height)?;
  let mut src_index = Bitset::new(size);
  let mut dst_index = Bitset::new(size);
  let mut by_index: BTreeMap<usize, E> = BTreeMap::new();
  for (src_id, dst_id, attr) in edges {
    let line = (src_id - src_offset) as usize;
    let col = (dst_id - dst_offset) as usize;
    src_index.set(line)?;
    dst_index.set(col)?;
    let index = builder.add_edge(line, col)?;
    by_index.insert(index, attr);
  }
  let tree = builder.build();
  let attrs = by_index.into_values().collect();
  Ok((tree, attrs, src_index, dst_index))
}
