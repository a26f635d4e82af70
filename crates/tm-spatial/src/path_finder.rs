//! Path-finder trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! Movement agents call routing through the [`PathFinder`] trait, so
//! applications can swap in another search (A*, contraction hierarchies)
//! without touching the agents.  [`ShortestPathFinder`] is the default.
//!
//! # Determinism
//!
//! Costs are accumulated in integer **millimetres** and the heap is keyed by
//! `(cost, NodeId)`, so equal-cost alternatives are always resolved the same
//! way for a fixed graph, filter, and edge insertion order.  Results are
//! reproducible run to run.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

use tm_core::{Coord, EdgeId, NodeId};

use crate::graph::{MapGraph, NodeTypeFilter};
use crate::{SpatialError, SpatialResult};

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a path query: the node sequence from source to destination,
/// both endpoints included, and its length.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Nodes to visit in order.  A single node when source == destination.
    pub nodes: Vec<NodeId>,
    /// Sum of the traversed edge lengths, in metres.
    pub length_m: f64,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Destination node.
    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Positions of the route's nodes, in order.
    pub fn waypoints(&self, graph: &MapGraph) -> Vec<Coord> {
        self.nodes.iter().map(|n| graph.node_pos[n.index()]).collect()
    }
}

// ── PathFinder trait ──────────────────────────────────────────────────────────

/// Pluggable shortest-path search over a shared [`MapGraph`].
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: one finder is shared by every agent
/// of a run, and independent runs may execute on different threads.
pub trait PathFinder: Send + Sync {
    /// Compute a path from `from` to `to`.
    ///
    /// `from == to` yields a single-node route rather than an error.
    fn shortest_path(&self, from: NodeId, to: NodeId) -> SpatialResult<Route>;

    /// The graph this finder searches.
    fn graph(&self) -> &MapGraph;

    /// Node types a search may enter.
    fn filter(&self) -> NodeTypeFilter;
}

// ── ShortestPathFinder ────────────────────────────────────────────────────────

/// Dijkstra's algorithm over the CSR map graph, restricted to the node types
/// admitted by its [`NodeTypeFilter`].
///
/// The filter applies to every node entered during the search; the source
/// itself is always allowed, so an agent standing on a node of another type
/// can still leave it.
pub struct ShortestPathFinder {
    graph:  Arc<MapGraph>,
    filter: NodeTypeFilter,
}

impl ShortestPathFinder {
    pub fn new(graph: Arc<MapGraph>, filter: NodeTypeFilter) -> Self {
        Self { graph, filter }
    }

    /// Breadth-first reachability from `from` under this finder's filter.
    ///
    /// Returns a `Vec<bool>` indexed by `NodeId`.  Used at setup time to
    /// reject stop sets that are not connected before any agent moves.
    pub fn reachable_from(&self, from: NodeId) -> SpatialResult<Vec<bool>> {
        let graph = &*self.graph;
        if !graph.contains(from) {
            return Err(SpatialError::NodeNotFound(from));
        }
        let mut seen  = vec![false; graph.node_count()];
        let mut queue = VecDeque::new();
        seen[from.index()] = true;
        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            for edge in graph.out_edges(node) {
                let next = graph.edge_to[edge.index()];
                if !seen[next.index()] && graph.allows(next, self.filter) {
                    seen[next.index()] = true;
                    queue.push_back(next);
                }
            }
        }
        Ok(seen)
    }
}

impl PathFinder for ShortestPathFinder {
    fn shortest_path(&self, from: NodeId, to: NodeId) -> SpatialResult<Route> {
        dijkstra(&self.graph, self.filter, from, to)
    }

    fn graph(&self) -> &MapGraph {
        &self.graph
    }

    fn filter(&self) -> NodeTypeFilter {
        self.filter
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Edge cost in millimetres.
#[inline]
fn edge_cost_mm(graph: &MapGraph, edge: EdgeId) -> u64 {
    (graph.edge_length_m[edge.index()].max(0.0) * 1000.0).round() as u64
}

fn dijkstra(
    graph:  &MapGraph,
    filter: NodeTypeFilter,
    from:   NodeId,
    to:     NodeId,
) -> SpatialResult<Route> {
    for node in [from, to] {
        if !graph.contains(node) {
            return Err(SpatialError::NodeNotFound(node));
        }
    }
    if from == to {
        return Ok(Route { nodes: vec![from], length_m: 0.0 });
    }

    let n = graph.node_count();
    // dist[v] = best known cost (mm) to reach v.
    let mut dist      = vec![u64::MAX; n];
    // prev_edge[v] = EdgeId that reached v; EdgeId::INVALID for unreached nodes.
    let mut prev_edge = vec![EdgeId::INVALID; n];

    dist[from.index()] = 0;

    // Min-heap: (cost, node). Reverse makes BinaryHeap (max) behave as min-heap.
    // Secondary key NodeId ensures deterministic tie-breaking.
    let mut heap: BinaryHeap<Reverse<(u64, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(graph, &prev_edge, from, to));
        }

        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }

        for edge in graph.out_edges(node) {
            let neighbor = graph.edge_to[edge.index()];
            if !graph.allows(neighbor, filter) {
                continue;
            }
            let new_cost = cost.saturating_add(edge_cost_mm(graph, edge));

            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = edge;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    Err(SpatialError::NoRoute { from, to })
}

fn reconstruct(graph: &MapGraph, prev_edge: &[EdgeId], from: NodeId, to: NodeId) -> Route {
    let mut nodes    = vec![to];
    let mut length_m = 0.0;
    let mut cur      = to;
    while cur != from {
        let e = prev_edge[cur.index()];
        length_m += graph.edge_length_m[e.index()];
        cur = graph.edge_from[e.index()];
        nodes.push(cur);
    }
    nodes.reverse();
    Route { nodes, length_m }
}
