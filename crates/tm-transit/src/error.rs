use thiserror::Error;

use tm_core::{AgentId, Coord, CoreError, RouteId};
use tm_schedule::ScheduleError;
use tm_spatial::SpatialError;

#[derive(Debug, Error)]
pub enum TransitError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("stop {0:?} is not in the stop map")]
    UnknownStop(String),

    #[error("stop {stop:?} at {at} does not lie on a map node")]
    StopWithoutNode { stop: String, at: Coord },

    #[error("stop {from:?} cannot reach stop {to:?} over the traversable node types")]
    Disconnected { from: String, to: String },

    #[error("agent {agent} is already registered with control system {route}")]
    AlreadyRegistered { agent: AgentId, route: RouteId },

    #[error("routing failed: {0}")]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type TransitResult<T> = Result<T, TransitError>;
