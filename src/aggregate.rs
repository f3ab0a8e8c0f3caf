/*!
The per-scan message-aggregation helper handed to a caller's `sendMsg`
closure during [`crate::partition::EdgePartition`]'s aggregate-message scans.
*/

use std::collections::HashMap;

/// A global vertex identifier.
pub type VertexId = i64;

/// Which side(s) of an edge must be active for it to take part in an
/// aggregation scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activeness {
  /// Every edge takes part, regardless of the active set.
  Neither,
  /// Only edges whose source vertex is active.
  SrcOnly,
  /// Only edges whose destination vertex is active.
  DstOnly,
  /// Only edges where both endpoints are active.
  Both,
  /// Edges where at least one endpoint is active.
  Either,
}
impl Activeness {
  /// Whether an edge with the given endpoint activeness takes part.
  pub fn is_active(&self, src_active: bool, dst_active: bool) -> bool {
    match self {
      Activeness::Neither => true,
      Activeness::SrcOnly => src_active,
      Activeness::DstOnly => dst_active,
      Activeness::Both => src_active && dst_active,
      Activeness::Either => src_active || dst_active,
    }
  }
}

/// Which vertex attributes a triplet/scan should carry.
///
/// Omitting a side that a `sendMsg`/`epred` closure never reads avoids the
/// vertex-attribute lookup for every edge in the scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fields {
  /// Whether the source vertex's attribute is populated.
  pub src: bool,
  /// Whether the destination vertex's attribute is populated.
  pub dst: bool,
}
impl Fields {
  /// Neither endpoint's attribute is needed.
  pub const NONE: Fields = Fields { src: false, dst: false };
  /// Only the source vertex's attribute is needed.
  pub const SRC: Fields = Fields { src: true, dst: false };
  /// Only the destination vertex's attribute is needed.
  pub const DST: Fields = Fields { src: false, dst: true };
  /// Both endpoints' attributes are needed.
  pub const ALL: Fields = Fields { src: true, dst: true };
}

/// Handed to a `sendMsg` closure for one edge of a scan. Carries the edge's
/// endpoints and (per [`Fields`]) attributes, and accumulates outgoing
/// messages into the scan's shared `VertexId → A` mapping.
pub struct AggregatingEdgeContext<'a, V, A> {
  src_id: VertexId,
  dst_id: VertexId,
  src_attr: Option<&'a V>,
  dst_attr: Option<&'a V>,
  messages: &'a mut HashMap<VertexId, A>,
  merge: &'a dyn Fn(A, A) -> A,
}
impl<'a, V, A> AggregatingEdgeContext<'a, V, A> {
  pub(crate) fn new(
    src_id: VertexId,
    dst_id: VertexId,
    src_attr: Option<&'a V>,
    dst_attr: Option<&'a V>,
    messages: &'a mut HashMap<VertexId, A>,
    merge: &'a dyn Fn(A, A) -> A,
  ) -> Self {
    AggregatingEdgeContext { src_id, dst_id, src_attr, dst_attr, messages, merge }
  }

  /// The edge's source vertex id.
  pub fn src_id(&self) -> VertexId { self.src_id }
  /// The edge's destination vertex id.
  pub fn dst_id(&self) -> VertexId { self.dst_id }
  /// The source vertex's attribute, if requested by the scan's `fields`.
  pub fn src_attr(&self) -> Option<&V> { self.src_attr }
  /// The destination vertex's attribute, if requested by the scan's `fields`.
  pub fn dst_attr(&self) -> Option<&V> { self.dst_attr }

  /// Send a message to the edge's source, merging with any message already
  /// accumulated for that vertex this scan.
  pub fn send_to_src(&mut self, msg: A) {
    upsert(self.messages, self.src_id, msg, self.merge);
  }
  /// Send a message to the edge's destination, merging with any message
  /// already accumulated for that vertex this scan.
  pub fn send_to_dst(&mut self, msg: A) {
    upsert(self.messages, self.dst_id, msg, self.merge);
  }
}

fn upsert<A>(messages: &mut HashMap<VertexId, A>, vid: VertexId, msg: A, merge: &dyn Fn(A, A) -> A) {
  match messages.remove(&vid) {
    Some(existing) => { messages.insert(vid, merge(existing, msg)); }
    None => { messages.insert(vid, msg); }
  }
}
