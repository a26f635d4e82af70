//! Unit tests for tm-spatial.
//!
//! All tests use hand-crafted graphs so they run without any map file.

#[cfg(test)]
mod helpers {
    use tm_core::{Coord, NodeId};
    use crate::{MapGraph, MapGraphBuilder};

    /// The eight-node grid used throughout the transit tests.
    ///
    /// ```text
    /// n0 -10- n1 ---10--- n2
    /// 10      10        /  \
    /// n3 -10- n4 -5- n5 -5- n6 -5- n7
    /// ```
    ///
    /// Coordinates: n0 (0,0), n1 (10,0), n2 (20,0), n3 (0,10), n4 (10,10),
    /// n5 (15,10), n6 (20,10), n7 (25,10).
    pub fn grid() -> (MapGraph, [NodeId; 8]) {
        let mut b = MapGraphBuilder::new();
        let coords = [
            (0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (0.0, 10.0),
            (10.0, 10.0), (15.0, 10.0), (20.0, 10.0), (25.0, 10.0),
        ];
        let n: Vec<NodeId> = coords.iter().map(|&(x, y)| b.add_node(Coord::new(x, y))).collect();
        for (a, c) in [(0, 1), (0, 3), (1, 4), (1, 2), (2, 5), (2, 6), (3, 4), (4, 5), (5, 6), (6, 7)] {
            b.add_road(n[a], n[c]);
        }
        (b.build(), [n[0], n[1], n[2], n[3], n[4], n[5], n[6], n[7]])
    }
}

// ── Builder & graph structure ─────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use tm_core::{Coord, NodeId};
    use crate::MapGraphBuilder;
    use super::helpers::grid;

    #[test]
    fn empty_build() {
        let g = MapGraphBuilder::new().build();
        assert!(g.is_empty());
        assert_eq!(g.edge_count(), 0);
        assert!(g.snap_to_node(Coord::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn csr_degrees() {
        let (g, n) = grid();
        assert_eq!(g.node_count(), 8);
        assert_eq!(g.edge_count(), 20);
        assert_eq!(g.out_edges(n[1]).count(), 3);
        assert_eq!(g.out_edges(n[7]).count(), 1);
        for e in g.out_edges(n[4]) {
            assert_eq!(g.edge_from[e.index()], n[4]);
        }
    }

    #[test]
    fn edge_lengths_come_from_coordinates() {
        let (g, n) = grid();
        let e = g.out_edges(n[2]).find(|e| g.edge_to[e.index()] == n[5]).unwrap();
        assert!((g.edge_length_m[e.index()] - 125f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn exact_and_nearest_lookup() {
        let (g, n) = grid();
        assert_eq!(g.node_at(Coord::new(15.0, 10.0)), Some(n[5]));
        assert_eq!(g.node_at(Coord::new(15.5, 10.0)), None);
        assert_eq!(g.snap_to_node(Coord::new(15.5, 10.2)), Some(n[5]));
        assert_eq!(g.snap_to_node(Coord::new(1.0, 0.0)), Some(n[0]));
        assert_eq!(g.position(NodeId(99)), None);
    }
}

// ── Node type filter ──────────────────────────────────────────────────────────

#[cfg(test)]
mod filter {
    use crate::NodeTypeFilter;

    #[test]
    fn any_allows_everything() {
        assert!(NodeTypeFilter::any().allows(0));
        assert!(NodeTypeFilter::any().allows(0b100));
    }

    #[test]
    fn only_checks_type_bits() {
        let f = NodeTypeFilter::only(&[1, 3]);
        assert!(f.allows(0b001));
        assert!(f.allows(0b100));
        assert!(!f.allows(0b010));
        // Out-of-range type numbers are dropped, leaving an empty mask.
        assert!(!NodeTypeFilter::only(&[0, 40]).allows(u32::MAX));
    }
}

// ── Shortest paths ────────────────────────────────────────────────────────────

#[cfg(test)]
mod shortest_path {
    use std::sync::Arc;

    use tm_core::{Coord, NodeId};
    use crate::{MapGraphBuilder, NodeTypeFilter, PathFinder, ShortestPathFinder, SpatialError};
    use super::helpers::grid;

    fn finder() -> (ShortestPathFinder, [NodeId; 8]) {
        let (g, n) = grid();
        (ShortestPathFinder::new(Arc::new(g), NodeTypeFilter::any()), n)
    }

    #[test]
    fn same_node_is_single_node_route() {
        let (f, n) = finder();
        let r = f.shortest_path(n[3], n[3]).unwrap();
        assert_eq!(r.nodes, vec![n[3]]);
        assert!(r.is_trivial());
        assert_eq!(r.length_m, 0.0);
    }

    #[test]
    fn includes_both_endpoints() {
        let (f, n) = finder();
        let r = f.shortest_path(n[0], n[1]).unwrap();
        assert_eq!(r.nodes, vec![n[0], n[1]]);
        assert_eq!(r.length_m, 10.0);
        assert_eq!(r.waypoints(f.graph()), vec![Coord::new(0.0, 0.0), Coord::new(10.0, 0.0)]);
    }

    #[test]
    fn picks_shortest_alternative() {
        let (f, n) = finder();
        // 1→2→6 and 1→4→5→6 are both 20 m; the tie must resolve the same way.
        let r = f.shortest_path(n[1], n[6]).unwrap();
        assert_eq!(r.length_m, 20.0);
        let again = f.shortest_path(n[1], n[6]).unwrap();
        assert_eq!(r, again, "equal-cost searches must be reproducible");
        assert_eq!(r.last(), Some(n[6]));
    }

    #[test]
    fn walks_stop_sequence() {
        let (f, n) = finder();
        assert_eq!(f.shortest_path(n[4], n[5]).unwrap().nodes, vec![n[4], n[5]]);
        assert_eq!(f.shortest_path(n[0], n[7]).unwrap().length_m, 35.0);
    }

    #[test]
    fn filter_blocks_nodes() {
        let mut b = MapGraphBuilder::new();
        let a = b.add_typed_node(Coord::new(0.0, 0.0), 0b01);
        let rail = b.add_typed_node(Coord::new(5.0, 0.0), 0b10);
        let c = b.add_typed_node(Coord::new(10.0, 0.0), 0b01);
        b.add_road(a, rail);
        b.add_road(rail, c);
        let g = Arc::new(b.build());

        let walk = ShortestPathFinder::new(Arc::clone(&g), NodeTypeFilter::only(&[1]));
        assert!(matches!(walk.shortest_path(a, c), Err(SpatialError::NoRoute { .. })));

        let all = ShortestPathFinder::new(g, NodeTypeFilter::any());
        assert_eq!(all.shortest_path(a, c).unwrap().nodes, vec![a, rail, c]);
    }

    #[test]
    fn unknown_node_errors() {
        let (f, n) = finder();
        assert!(matches!(
            f.shortest_path(n[0], NodeId(42)),
            Err(SpatialError::NodeNotFound(NodeId(42)))
        ));
    }

    #[test]
    fn reachability() {
        let mut b = MapGraphBuilder::new();
        let a = b.add_node(Coord::new(0.0, 0.0));
        let c = b.add_node(Coord::new(1.0, 0.0));
        let island = b.add_node(Coord::new(50.0, 50.0));
        b.add_road(a, c);
        let f = ShortestPathFinder::new(Arc::new(b.build()), NodeTypeFilter::any());

        let seen = f.reachable_from(a).unwrap();
        assert!(seen[a.index()] && seen[c.index()]);
        assert!(!seen[island.index()]);
        assert!(matches!(f.shortest_path(a, island), Err(SpatialError::NoRoute { .. })));
    }
}
