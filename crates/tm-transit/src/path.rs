//! `Path` — the unit of movement handed to the driver.

use tm_core::{Coord, SimDuration};
use tm_spatial::{MapGraph, Route};

/// A polyline to traverse at constant speed.
///
/// Riders receive a clone of the vehicle's path, so both follow identical
/// waypoints at identical speed and arrive in the same millisecond.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub waypoints: Vec<Coord>,
    /// Metres per second.
    pub speed:     f64,
}

impl Path {
    pub fn new(waypoints: Vec<Coord>, speed: f64) -> Self {
        Self { waypoints, speed }
    }

    /// Waypoints of a graph route.
    pub fn from_route(route: &Route, graph: &MapGraph, speed: f64) -> Self {
        Self { waypoints: route.waypoints(graph), speed }
    }

    pub fn first(&self) -> Option<Coord> {
        self.waypoints.first().copied()
    }

    /// The point where an agent following this path ends up.
    pub fn last(&self) -> Option<Coord> {
        self.waypoints.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Polyline length in metres.
    pub fn length(&self) -> f64 {
        self.waypoints.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Time to traverse the path.  Zero for a zero-length path or a
    /// non-positive speed.
    pub fn travel_time(&self) -> SimDuration {
        let len = self.length();
        if len <= 0.0 || self.speed.is_nan() || self.speed <= 0.0 {
            return SimDuration::ZERO;
        }
        SimDuration::from_secs_f64(len / self.speed)
    }
}
