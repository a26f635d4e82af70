//! `tm-spatial` — map graph, spatial indexing, and shortest-path search.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                 |
//! |-----------------|----------------------------------------------------------|
//! | [`graph`]       | `MapGraph` (CSR + R-tree), `MapGraphBuilder`, `NodeTypeFilter` |
//! | [`path_finder`] | `PathFinder` trait, `Route`, `ShortestPathFinder`        |
//! | [`error`]       | `SpatialError`, `SpatialResult<T>`                       |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `NodeTypeFilter`.       |

pub mod error;
pub mod graph;
pub mod path_finder;

#[cfg(test)]
mod tests;

pub use error::{SpatialError, SpatialResult};
pub use graph::{MapGraph, MapGraphBuilder, NodeTypeFilter};
pub use path_finder::{PathFinder, Route, ShortestPathFinder};
