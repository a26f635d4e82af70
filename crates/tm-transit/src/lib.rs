//! `tm-transit` — timetabled vehicles, passengers, and their control systems.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                        |
//! |------------------|-----------------------------------------------------------------|
//! | [`model`]        | `MovementModel` step contract, `NextWait`, `AgentKind`          |
//! | [`path`]         | `Path` — waypoints + speed handed to the driver                 |
//! | [`control`]      | `TransitControlSystem`, `SharedControl`                         |
//! | [`vehicle`]      | `ScheduledTransitMovement`, `VehiclePlan` (timetable / loop)    |
//! | [`traveller`]    | `TransitTravellerMovement`, `TravellerState`                    |
//! | [`continuation`] | `ContinuationModel` — ride-on decisions for open-ended riders   |
//! | [`context`]      | `RunContext`, `initialize`, `TransitRoute`, `TravellerFactory`  |
//! | [`config`]       | `TransitConfig`                                                 |
//! | [`error`]        | `TransitError`, `TransitResult<T>`                              |
//!
//! # How boarding works
//!
//! 1. A traveller walks to its start stop and waits there.
//! 2. When a vehicle asks for its next path, it first reports the stop it is
//!    leaving and that path to the route's control system.
//! 3. The control system offers a copy of the path to every traveller
//!    waiting at that stop.  A traveller that accepts returns the same path
//!    on its next path request, so it travels exactly with the vehicle.
//! 4. On arriving at the next stop the traveller waits again and repeats the
//!    decision when the vehicle leaves.  In fixed-route mode it alights at
//!    its end stop; in open-ended mode a [`ContinuationModel`] decides.

pub mod config;
pub mod context;
pub mod continuation;
pub mod control;
pub mod error;
pub mod model;
pub mod path;
pub mod traveller;
pub mod vehicle;


pub use config::TransitConfig;
pub use context::{
    initialize, initialize_loop, resolve_stop_nodes, LoopRoute, RunContext, TransitRoute,
    TravellerFactory,
};
pub use continuation::ContinuationModel;
pub use control::{SharedControl, TransitControlSystem};
pub use error::{TransitError, TransitResult};
pub use model::{AgentKind, MovementModel, NextWait};
pub use path::Path;
pub use traveller::{TransitTravellerMovement, TravellerState};
pub use vehicle::{LoopKind, ScheduledTransitMovement, StopNodeMap, VehiclePlan};
