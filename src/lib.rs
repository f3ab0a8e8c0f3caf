#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

/*!
A compressed edge-partition core for bulk-synchronous graph processing.

A partition stores the edges of one shard of a graph as a **K²-tree** — a
recursive quadtree-like compression of the shard's adjacency matrix — paired
with a parallel array of per-edge attributes and a map of per-vertex
attributes. On top of that it offers the small set of operations a
Pregel-style engine drives a partition with: building from an edge stream,
iterating edges and `(src, dst)`-joined triplets, adding/removing edges,
mapping/filtering/reversing, joining two partitions, and scanning edges to
accumulate messages per vertex.

**Note:** this crate leans on [bitvec](https://docs.rs/bitvec/0.17.4/bitvec/)
for all of its bit storage. Compile with optimisations enabled; `bitvec` is
slow without them.
*/

/*!
# How the tree works

Take an 8x8 adjacency matrix, parameter `k = 2`:

```ignore
00|00||10|10
00|00||00|11
------------
00|00||00|00
00|00||00|10
============
10|10||00|11
10|00||00|00
------------
00|00||00|00
00|00||00|00
```

Every all-zero `k×k` block collapses to a single `0`:

```ignore
0    ||10|10
     ||00|11
     ||-----
     ||0 |00
     ||  |10
============
10|10||0 |11
10|00||  |00
------------
0 |0 ||0 |0
  |  ||  |
```

Reading the surviving blocks level by level, root first, gives the
`internal`/`leaves` bit sequences a [`tree::K2Tree`] actually stores. A `1` at
an internal position means "at least one edge lives under this subquadrant";
walking down from the virtual root, each set internal bit's first child is
located by `rank(p) · k²` — the popcount of the whole internal sequence up to
and including `p`, rather than any per-level bookkeeping. That single
rank-based offset is what lets traversal, growing, and trimming all operate
on the flat compressed sequence directly, with no decompression step.

# Assembling a partition

[`partition::EdgePartition`] binds a tree to:
- an edge-attribute array kept in the tree's own traversal order, addressed
  by each edge's [`tree::K2TreeBuilder`]-assigned tree index,
- a vertex-attribute map, keyed by global vertex id,
- `srcIndex`/`dstIndex` bitsets recording which local rows/columns are
  occupied, and an optional active-vertex bitset,
- `srcOffset`/`dstOffset`, the translation between local matrix coordinates
  and global vertex ids.

Every transformation (`map`, `filter`, `reverse`, `addEdges`, `innerJoin`, ...)
returns a new, independent [`partition::EdgePartition`]; none of them mutate
an existing one in place.

-- groels
*/

pub use tree::K2Tree;
pub use partition::EdgePartition;

/// `K2Tree`/`K2TreeBuilder` and their supporting traversal/addressing logic.
pub mod tree;

/// Library error types.
pub mod error;

/// Word-packed bit array used by both the tree and the partition's indexes.
pub mod bitset;

/// The edge-partition wrapper and its public operation set.
pub mod partition;

/// Per-scan message-aggregation helper.
pub mod aggregate;
