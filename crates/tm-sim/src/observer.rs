//! Simulation observer trait for progress reporting and data collection.

use tm_core::{AgentId, Coord, Layer, SimTime};
use tm_transit::Path;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] as agents are stepped.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example — movement trace
///
/// ```rust,ignore
/// struct Trace;
///
/// impl SimObserver for Trace {
///     fn on_path(&mut self, agent: AgentId, now: SimTime, path: &Path) {
///         println!("{now} {agent}: {} waypoints at {:.1} m/s", path.waypoints.len(), path.speed);
///     }
/// }
/// ```
pub trait SimObserver {
    /// An agent starts travelling `path` at `now`.
    fn on_path(&mut self, _agent: AgentId, _now: SimTime, _path: &Path) {}

    /// An agent moved to another presentation layer.
    fn on_layer_change(&mut self, _agent: AgentId, _now: SimTime, _layer: Layer) {}

    /// An agent finished its trip at `at` and was retired.
    fn on_agent_ready(&mut self, _agent: AgentId, _now: SimTime, _at: Option<Coord>) {}

    /// An agent will never move again and was retired.
    fn on_agent_done(&mut self, _agent: AgentId, _now: SimTime) {}

    /// Called after each batch of agents due at `now`.
    ///
    /// `stepped` counts the agents that had a wait or path request this
    /// batch.
    fn on_step_end(&mut self, _now: SimTime, _stepped: usize) {}

    /// Called once when the run stops.
    fn on_sim_end(&mut self, _now: SimTime) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
