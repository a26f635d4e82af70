//! Planar coordinate type.
//!
//! Map data is projected to a flat plane in metres before it reaches the
//! simulation, so all distances are plain Euclidean distances.  `Coord` uses
//! `f64` because agent locations are compared for exact equality against
//! stop coordinates; both sides are always copied from the same graph node,
//! never recomputed.

/// A point on the simulation plane, in metres.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance in metres.
    #[inline]
    pub fn distance(self, other: Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Squared distance; cheaper when only ordering matters.
    #[inline]
    pub fn distance_sq(self, other: Coord) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// `[x, y]` array form used by the spatial index.
    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
