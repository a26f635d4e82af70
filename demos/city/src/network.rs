//! Synthetic grid city: street grid, stop map, and generated timetables.
//!
//! ```text
//!            m0
//!            │
//!            m1
//!            │
//!  b0 ─ b1 ─ b2/m2 ─ b3 ─ b4      bus (surface), row 2
//!            │
//!            m3                    metro (underground), column 2
//!            │
//!            m4
//! ```
//!
//! Every grid intersection is a map node; streets join 4-neighbours.

use std::sync::Arc;

use tm_core::{Coord, Layer, RouteId, SimTime};
use tm_schedule::{RouteDescriptor, StopMap, StopRecord, Trip, VehicleSchedule};
use tm_spatial::{MapGraph, MapGraphBuilder};

/// Intersections per side.
pub const GRID: usize = 5;
/// Block length in metres.
pub const BLOCK_M: f64 = 200.0;

const BUS_ROUTE: RouteId = RouteId(1);
const METRO_ROUTE: RouteId = RouteId(2);

fn intersection(col: usize, row: usize) -> Coord {
    Coord::new(col as f64 * BLOCK_M, row as f64 * BLOCK_M)
}

/// The street grid.
pub fn build_grid() -> Arc<MapGraph> {
    let mut b = MapGraphBuilder::with_capacity(GRID * GRID, 4 * GRID * (GRID - 1));
    let mut nodes = Vec::with_capacity(GRID * GRID);
    for row in 0..GRID {
        for col in 0..GRID {
            nodes.push(b.add_node(intersection(col, row)));
        }
    }
    for row in 0..GRID {
        for col in 0..GRID {
            let here = nodes[row * GRID + col];
            if col + 1 < GRID {
                b.add_road(here, nodes[row * GRID + col + 1]);
            }
            if row + 1 < GRID {
                b.add_road(here, nodes[(row + 1) * GRID + col]);
            }
        }
    }
    Arc::new(b.build())
}

fn bus_calls() -> Vec<(String, Coord)> {
    (0..GRID).map(|col| (format!("b{col}"), intersection(col, GRID / 2))).collect()
}

fn metro_calls() -> Vec<(String, Coord)> {
    (0..GRID).map(|row| (format!("m{row}"), intersection(GRID / 2, row))).collect()
}

/// Stop id → coordinate for both lines.
pub fn stop_map() -> StopMap {
    bus_calls().into_iter().chain(metro_calls()).collect()
}

/// The bus and metro routes, two vehicles each, running out-and-back.
pub fn routes() -> Vec<RouteDescriptor> {
    let bus = Timetabler { speed: 8.0, dwell: 20.0, turnaround: 60.0 };
    let metro = Timetabler { speed: 15.0, dwell: 30.0, turnaround: 90.0 };
    vec![
        bus.route(BUS_ROUTE, Layer::Surface, &bus_calls(), &[60.0, 360.0], 4),
        metro.route(METRO_ROUTE, Layer::Underground, &metro_calls(), &[0.0, 240.0], 6),
    ]
}

// ── Timetable generation ──────────────────────────────────────────────────────

struct Timetabler {
    /// m/s between stops.
    speed:      f64,
    /// Seconds at each intermediate stop.
    dwell:      f64,
    /// Seconds at a terminus before the return trip.
    turnaround: f64,
}

impl Timetabler {
    fn route(
        &self,
        route_id:    RouteId,
        layer:       Layer,
        calls:       &[(String, Coord)],
        departures:  &[f64],
        round_trips: usize,
    ) -> RouteDescriptor {
        RouteDescriptor {
            route_id,
            layer,
            stops: calls.iter().map(|(id, _)| id.clone()).collect(),
            vehicles: departures
                .iter()
                .enumerate()
                .map(|(i, &first)| self.vehicle(i as u32, calls, first, round_trips))
                .collect(),
        }
    }

    fn vehicle(
        &self,
        vehicle_id:  u32,
        calls:       &[(String, Coord)],
        first:       f64,
        round_trips: usize,
    ) -> VehicleSchedule {
        let back: Vec<_> = calls.iter().rev().cloned().collect();
        let mut trips = Vec::with_capacity(2 * round_trips);
        let mut t = first;
        for _ in 0..round_trips {
            for leg in [calls, back.as_slice()] {
                let (trip, end) = self.trip(leg, t);
                trips.push(trip);
                t = end + self.turnaround;
            }
        }
        VehicleSchedule::new(vehicle_id, trips)
    }

    /// One trip departing at `start`; returns it with its arrival time at
    /// the last stop.
    fn trip(&self, calls: &[(String, Coord)], start: f64) -> (Trip, f64) {
        let mut records = Vec::with_capacity(calls.len());
        let mut t = start;
        let mut prev: Option<Coord> = None;
        for (i, (id, at)) in calls.iter().enumerate() {
            let arrival = prev.map_or(t, |p| t + p.distance(*at) / self.speed);
            let departure = if prev.is_none() || i + 1 == calls.len() {
                arrival
            } else {
                arrival + self.dwell
            };
            records.push(StopRecord::new(
                id.clone(),
                SimTime::from_secs_f64(arrival),
                SimTime::from_secs_f64(departure),
            ));
            t = departure;
            prev = Some(*at);
        }
        (Trip::new(records), t)
    }
}
