use thiserror::Error;

use tm_core::{AgentId, CoreError};
use tm_transit::TransitError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error("agent id {0} was added twice")]
    DuplicateAgent(AgentId),

    #[error("agent {agent} failed to produce a path: {source}")]
    Agent {
        agent:  AgentId,
        #[source]
        source: TransitError,
    },
}

pub type SimResult<T> = Result<T, SimError>;
