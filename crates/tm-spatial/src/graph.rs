//! Map graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_length_m`) are sorted by
//! source node and indexed by `EdgeId`.  Iteration over a node's outgoing
//! edges is therefore a contiguous memory scan, which suits Dijkstra's inner
//! loop.
//!
//! # Node types
//!
//! Every node carries a bitmask of the map layers it was read from (roads,
//! footpaths, rail, …).  Type `t` (1-based) is bit `1 << (t - 1)`.  A
//! [`NodeTypeFilter`] restricts which nodes a path search may pass through.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps planar coordinates to the nearest `NodeId`.
//! Stops are resolved to nodes through it at setup time, and travellers that
//! start off-graph are snapped to their nearest node.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use tm_core::{Coord, EdgeId, NodeId};

/// Type bit given to nodes added without an explicit type.
pub const DEFAULT_NODE_TYPE: u32 = 1;

/// Two coordinates closer than this (metres) identify the same node.
pub const NODE_MATCH_EPS_M: f64 = 1e-6;

// ── Node type filter ──────────────────────────────────────────────────────────

/// Which node types a path search may traverse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeTypeFilter {
    /// `None` lets every node through.
    mask: Option<u32>,
}

impl NodeTypeFilter {
    /// Allow every node type.
    pub const fn any() -> Self {
        Self { mask: None }
    }

    /// Allow only nodes belonging to at least one of `types` (1-based, ≤ 32).
    /// Out-of-range type numbers are ignored.
    pub fn only(types: &[u8]) -> Self {
        let mask = types
            .iter()
            .filter(|&&t| (1..=32).contains(&t))
            .fold(0u32, |m, &t| m | (1u32 << (t - 1)));
        Self { mask: Some(mask) }
    }

    /// `true` if a node with type bits `node_types` may be traversed.
    #[inline]
    pub fn allows(self, node_types: u32) -> bool {
        match self.mask {
            None    => true,
            Some(m) => node_types & m != 0,
        }
    }
}

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2],
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── MapGraph ──────────────────────────────────────────────────────────────────

/// Directed map graph in CSR format plus a spatial index for node snapping.
///
/// Built by [`MapGraphBuilder`] and shared read-only behind an `Arc`: by
/// every path finder of a run and by travellers placing themselves.
pub struct MapGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Planar position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<Coord>,

    /// Type bitmask of each node.  Indexed by `NodeId`.
    pub node_types: Vec<u32>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Outgoing edges of node `n` are at EdgeIds
    /// `node_out_start[n] .. node_out_start[n+1]`.
    /// Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    /// Source node of each edge.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Length of each edge in metres.  Used as Dijkstra edge cost.
    pub edge_length_m: Vec<f64>,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<NodeEntry>,
}

impl MapGraph {
    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    /// `true` if `node` indexes a node of this graph.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    /// Position of `node`, or `None` if it is out of range.
    #[inline]
    pub fn position(&self, node: NodeId) -> Option<Coord> {
        self.node_pos.get(node.index()).copied()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    ///
    /// This is a contiguous index range; no heap allocation.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// `true` if `node` may be traversed under `filter`.
    #[inline]
    pub fn allows(&self, node: NodeId, filter: NodeTypeFilter) -> bool {
        filter.allows(self.node_types[node.index()])
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest node to `pos`.
    ///
    /// Returns `None` only if the graph has no nodes.
    pub fn snap_to_node(&self, pos: Coord) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&pos.to_array())
            .map(|e| e.id)
    }

    /// Return the node located exactly at `pos` (within
    /// [`NODE_MATCH_EPS_M`]), or `None` if no node sits there.
    pub fn node_at(&self, pos: Coord) -> Option<NodeId> {
        let nearest = self.snap_to_node(pos)?;
        let at = self.node_pos[nearest.index()];
        (at.distance(pos) <= NODE_MATCH_EPS_M).then_some(nearest)
    }
}

// ── MapGraphBuilder ───────────────────────────────────────────────────────────

/// Construct a [`MapGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use tm_core::Coord;
/// use tm_spatial::MapGraphBuilder;
///
/// let mut b = MapGraphBuilder::new();
/// let a = b.add_node(Coord::new(0.0, 0.0));
/// let c = b.add_node(Coord::new(30.0, 40.0));
/// b.add_road(a, c); // length taken from the coordinates: 50 m
/// let graph = b.build();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 2); // bidirectional
/// assert_eq!(graph.edge_length_m[0], 50.0);
/// ```
pub struct MapGraphBuilder {
    nodes:     Vec<Coord>,
    types:     Vec<u32>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from:     NodeId,
    to:       NodeId,
    length_m: f64,
}

impl MapGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), types: Vec::new(), raw_edges: Vec::new() }
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            types:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node of the default type and return its `NodeId` (sequential
    /// from 0).
    pub fn add_node(&mut self, pos: Coord) -> NodeId {
        self.add_typed_node(pos, DEFAULT_NODE_TYPE)
    }

    /// Add a node carrying the type bitmask `types`.
    pub fn add_typed_node(&mut self, pos: Coord, types: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        self.types.push(types);
        id
    }

    /// Add a directed edge whose length is the straight-line distance
    /// between its endpoints.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId) {
        let length_m = self.nodes[from.index()].distance(self.nodes[to.index()]);
        self.raw_edges.push(RawEdge { from, to, length_m });
    }

    /// Add edges in both directions.
    pub fn add_road(&mut self, a: NodeId, b: NodeId) {
        self.add_directed_edge(a, b);
        self.add_directed_edge(b, a);
    }

    /// Sort the edges into CSR order and bulk-load the R-tree.
    pub fn build(self) -> MapGraph {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        // Stable sort keeps insertion order among a node's edges, which is
        // the exploration order Dijkstra sees.
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_from:     Vec<NodeId> = raw.iter().map(|e| e.from).collect();
        let edge_to:       Vec<NodeId> = raw.iter().map(|e| e.to).collect();
        let edge_length_m: Vec<f64>    = raw.iter().map(|e| e.length_m).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry { point: pos.to_array(), id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        MapGraph {
            node_pos: self.nodes,
            node_types: self.types,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            spatial_idx,
        }
    }
}

impl Default for MapGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
