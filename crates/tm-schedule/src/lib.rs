//! `tm-schedule` — timetable data model, stop maps, loaders, and wake queue.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                   |
//! |----------------|------------------------------------------------------------|
//! | [`model`]      | `StopRecord`, `Trip`, `VehicleSchedule`, `RouteDescriptor` |
//! | [`stop_map`]   | `StopMap` (`stop_id → Coord`)                              |
//! | [`wake_queue`] | `WakeQueue` (`BTreeMap<SimTime, Vec<AgentId>>`)            |
//! | [`loader`]     | `load_routes_json`, `load_stop_map_json`, `load_stop_map_csv` |
//! | [`error`]      | `ScheduleError`, `ScheduleResult<T>`                       |
//!
//! # Timetable model (summary)
//!
//! A route runs a fleet of vehicles.  Each vehicle chains one or more trips,
//! and each trip is an ordered list of stops with arrival and departure
//! times.  Positions in a schedule are addressed by a `(trip, stop)` cursor:
//!
//! ```text
//! (0,0) ── (0,1) ── … ── (0,n₀-1)   trip 0
//! (1,0) ── (1,1) ── … ── (1,n₁-1)   trip 1   ← next trip starts here
//!                          ▲
//!                   final stop of the schedule
//! ```
//!
//! Times arrive as fractional seconds in the input files and are stored as
//! whole-millisecond `SimTime`s.

pub mod error;
pub mod loader;
pub mod model;
pub mod stop_map;
pub mod wake_queue;


pub use error::{ScheduleError, ScheduleResult};
pub use loader::{
    load_routes_json, load_routes_reader, load_stop_map_csv, load_stop_map_csv_reader,
    load_stop_map_json, load_stop_map_json_reader,
};
pub use model::{RouteDescriptor, StopRecord, Trip, VehicleSchedule};
pub use stop_map::StopMap;
pub use wake_queue::WakeQueue;
