//! The `MovementModel` trait — the per-agent step contract.

use tm_core::{AgentId, Coord, Layer, SimDuration, SimTime};

use crate::{Path, TransitResult};

/// Result of a wait-time request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NextWait {
    /// Ask for the next path after this much simulated time.
    After(SimDuration),
    /// The agent will never move again.
    Never,
}

/// What kind of agent a model drives.
///
/// Ordered: when several agents are due at the same instant the driver steps
/// travellers before vehicles, so a rider that arrives at a stop in the same
/// millisecond as a vehicle is already waiting when the vehicle calls.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AgentKind {
    Traveller,
    Vehicle,
}

/// Movement behaviour stepped by a discrete-event driver.
///
/// The driver alternates the two stepping calls: after
/// [`next_wait_time`][Self::next_wait_time] returns `After(d)` it waits `d`
/// and then calls [`next_path`][Self::next_path]; once the returned path has
/// been travelled it asks for a wait time again.  `Ok(None)` from
/// `next_path` means "no movement now, ask again later".
///
/// # Thread safety
///
/// Models must be `Send` so that independent runs can execute on different
/// threads.  Agents of the same route share their control system behind a
/// mutex.
pub trait MovementModel: Send {
    fn id(&self) -> AgentId;

    fn kind(&self) -> AgentKind;

    fn next_wait_time(&mut self, now: SimTime) -> NextWait;

    fn next_path(&mut self, now: SimTime) -> TransitResult<Option<Path>>;

    /// The agent finished its current trip; the driver may retire it or hand
    /// it to another sub-model.
    fn is_ready(&self) -> bool {
        false
    }

    /// The agent will never produce another path.
    fn is_done(&self) -> bool {
        false
    }

    /// Where the agent will be once its last returned path is travelled.
    fn location(&self) -> Option<Coord>;

    /// Presentation layer the agent is currently shown on.
    fn layer(&self) -> Layer;
}
