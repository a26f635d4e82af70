//! Spatial-subsystem error type.

use thiserror::Error;

use tm_core::NodeId;

/// Errors produced by `tm-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("no path from {from} to {to}: the map is not connected over the traversable node types")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in map graph")]
    NodeNotFound(NodeId),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
