//! `StopMap` — stop id to planar coordinate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tm_core::Coord;

/// Coordinates of every stop, keyed by stop id.
///
/// Backed by a `BTreeMap` so iteration order is stable across runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopMap {
    inner: BTreeMap<String, Coord>,
}

impl StopMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a stop.  Returns the previous coordinate, if any.
    pub fn insert(&mut self, stop_id: impl Into<String>, at: Coord) -> Option<Coord> {
        self.inner.insert(stop_id.into(), at)
    }

    #[inline]
    pub fn get(&self, stop_id: &str) -> Option<Coord> {
        self.inner.get(stop_id).copied()
    }

    pub fn contains(&self, stop_id: &str) -> bool {
        self.inner.contains_key(stop_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Coord)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Align the stop coordinates with a map that was mirrored on the y axis
    /// and/or shifted during projection.  Mirroring is applied first.
    pub fn aligned(&self, mirror_y: bool, offset: Coord) -> StopMap {
        let inner = self
            .inner
            .iter()
            .map(|(id, c)| {
                let y = if mirror_y { -c.y } else { c.y };
                (id.clone(), Coord::new(c.x + offset.x, y + offset.y))
            })
            .collect();
        StopMap { inner }
    }
}

impl FromIterator<(String, Coord)> for StopMap {
    fn from_iter<I: IntoIterator<Item = (String, Coord)>>(iter: I) -> Self {
        StopMap { inner: iter.into_iter().collect() }
    }
}
