//! Timetable and stop-map loaders.
//!
//! # Timetable JSON
//!
//! A top-level array of route objects (see [`RouteDescriptor`]).  Times are
//! seconds from the simulation epoch and may be fractional.
//!
//! # Stop map
//!
//! Either a JSON object keyed by stop id:
//!
//! ```json
//! { "central": { "x": 10.0, "y": 0.0 }, "harbour": { "x": 20.0, "y": 10.0 } }
//! ```
//!
//! or a CSV file with a header row:
//!
//! ```csv
//! stop_id,x,y
//! central,10.0,0.0
//! harbour,20.0,10.0
//! ```
//!
//! A stop id listed twice in the CSV is rejected; in JSON the last
//! occurrence wins, as for any JSON object.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use tm_core::Coord;

use crate::{RouteDescriptor, ScheduleError, ScheduleResult, StopMap};

// ── Timetables ────────────────────────────────────────────────────────────────

/// Load every route from a timetable JSON file.
pub fn load_routes_json(path: &Path) -> ScheduleResult<Vec<RouteDescriptor>> {
    let file = std::fs::File::open(path)?;
    load_routes_reader(std::io::BufReader::new(file))
}

/// Like [`load_routes_json`] but accepts any `Read` source.
pub fn load_routes_reader<R: Read>(reader: R) -> ScheduleResult<Vec<RouteDescriptor>> {
    let routes: Vec<RouteDescriptor> = serde_json::from_reader(reader)?;
    Ok(routes)
}

// ── Stop maps ─────────────────────────────────────────────────────────────────

pub fn load_stop_map_json(path: &Path) -> ScheduleResult<StopMap> {
    let file = std::fs::File::open(path)?;
    load_stop_map_json_reader(std::io::BufReader::new(file))
}

pub fn load_stop_map_json_reader<R: Read>(reader: R) -> ScheduleResult<StopMap> {
    Ok(serde_json::from_reader(reader)?)
}

#[derive(Deserialize)]
struct StopRow {
    stop_id: String,
    x:       f64,
    y:       f64,
}

pub fn load_stop_map_csv(path: &Path) -> ScheduleResult<StopMap> {
    let file = std::fs::File::open(path)?;
    load_stop_map_csv_reader(file)
}

/// Like [`load_stop_map_csv`] but accepts any `Read` source.
pub fn load_stop_map_csv_reader<R: Read>(reader: R) -> ScheduleResult<StopMap> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut stops = StopMap::new();

    for result in csv_reader.deserialize::<StopRow>() {
        let row = result.map_err(|e| ScheduleError::Parse(e.to_string()))?;
        let id = row.stop_id.trim().to_owned();
        if id.is_empty() {
            return Err(ScheduleError::Parse("empty stop_id".into()));
        }
        if stops.insert(id.clone(), Coord::new(row.x, row.y)).is_some() {
            return Err(ScheduleError::Parse(format!("duplicate stop_id {id:?}")));
        }
    }

    Ok(stops)
}
