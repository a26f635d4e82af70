//! `tm-core` — foundational types for the transit movement framework.
//!
//! This crate is a dependency of every other `tm-*` crate.  It intentionally
//! has no `tm-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `NodeId`, `EdgeId`, `RouteId`              |
//! | [`geo`]         | `Coord` (planar metres), Euclidean distance           |
//! | [`time`]        | `SimTime`, `SimDuration`, `SimClock`, `SimConfig`     |
//! | [`rng`]         | `AgentRng` (per-agent), `SimRng` (global)             |
//! | [`layer`]       | `Layer` presentation tag (surface / underground)      |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod layer;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::Coord;
pub use ids::{AgentId, EdgeId, NodeId, RouteId};
pub use layer::Layer;
pub use rng::{AgentRng, SimRng};
pub use time::{SimClock, SimConfig, SimDuration, SimTime};
