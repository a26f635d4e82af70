//! `TransitControlSystem` — the per-route broker between vehicles and riders.
//!
//! # Ownership
//!
//! The control system owns the state of every rider registered with it.
//! [`TransitTravellerMovement`][crate::TransitTravellerMovement] is only a
//! handle (agent id + shared control system), so a stopped vehicle can move
//! waiting riders on board without any back-references between agents.
//!
//! # Sharing
//!
//! One instance is shared by a route's vehicles and riders as
//! [`SharedControl`] (`Arc<Mutex<_>>`).  Within a run the driver steps one
//! agent at a time, so the lock is never contended; it serialises access
//! when routes are stepped on different threads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tm_core::{AgentId, Coord, Layer, RouteId};
use tm_spatial::PathFinder;

use crate::traveller::{Rider, TravellerState};
use crate::{Path, TransitError, TransitResult};

pub type SharedControl = Arc<Mutex<TransitControlSystem>>;

/// Lock a shared control system.  Every mutation behind the lock is a single
/// insert or state assignment, so a poisoned lock is recovered.
pub fn lock(control: &SharedControl) -> MutexGuard<'_, TransitControlSystem> {
    control.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-only view of the route handed to a rider while it is mutated.
pub(crate) struct RiderEnv<'a> {
    pub stops:  &'a [Coord],
    pub finder: Option<&'a dyn PathFinder>,
    pub layer:  Layer,
}

/// Broker for one route: which vehicles serve it, which riders wait on it,
/// and where its stops are.  Created by
/// [`RunContext::control_system`][crate::RunContext::control_system].
pub struct TransitControlSystem {
    id:       RouteId,
    layer:    Layer,
    stops:    Vec<Coord>,
    finder:   Option<Arc<dyn PathFinder>>,
    vehicles: BTreeSet<AgentId>,
    riders:   BTreeMap<AgentId, Rider>,
}

impl TransitControlSystem {
    pub fn new(id: RouteId) -> Self {
        Self {
            id,
            layer:    Layer::Surface,
            stops:    Vec::new(),
            finder:   None,
            vehicles: BTreeSet::new(),
            riders:   BTreeMap::new(),
        }
    }

    pub fn shared(id: RouteId) -> SharedControl {
        Arc::new(Mutex::new(Self::new(id)))
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    // ── Route data ────────────────────────────────────────────────────────

    /// Replace the stop-coordinate snapshot.
    pub fn set_stops(&mut self, stops: Vec<Coord>) {
        self.stops = stops;
    }

    pub fn stops(&self) -> &[Coord] {
        &self.stops
    }

    pub fn set_layer(&mut self, layer: Layer) {
        self.layer = layer;
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Path finder riders use to walk to their first stop.
    pub fn set_path_finder(&mut self, finder: Arc<dyn PathFinder>) {
        self.finder = Some(finder);
    }

    pub fn path_finder(&self) -> Option<&Arc<dyn PathFinder>> {
        self.finder.as_ref()
    }

    // ── Registration ──────────────────────────────────────────────────────

    pub fn register_vehicle(&mut self, id: AgentId) -> TransitResult<()> {
        self.ensure_unregistered(id)?;
        self.vehicles.insert(id);
        Ok(())
    }

    pub(crate) fn register_rider(&mut self, id: AgentId, rider: Rider) -> TransitResult<()> {
        self.ensure_unregistered(id)?;
        self.riders.insert(id, rider);
        Ok(())
    }

    fn ensure_unregistered(&self, id: AgentId) -> TransitResult<()> {
        if self.vehicles.contains(&id) || self.riders.contains_key(&id) {
            return Err(TransitError::AlreadyRegistered { agent: id, route: self.id });
        }
        Ok(())
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn passenger_count(&self) -> usize {
        self.riders.len()
    }

    pub fn has_vehicle(&self, id: AgentId) -> bool {
        self.vehicles.contains(&id)
    }

    // ── Notifications ─────────────────────────────────────────────────────

    /// A vehicle is at `stop` and about to travel `path`.  Every rider
    /// WAITING at `stop` gets a boarding decision with its own copy of the
    /// path.  Returns how many riders boarded.
    pub fn on_vehicle_stopped(&mut self, vehicle: AgentId, stop: Coord, path: &Path) -> usize {
        if !self.accepts_notification(vehicle) {
            return 0;
        }
        let mut boarded = 0;
        for rider in self.waiting_at(stop) {
            rider.enter_vehicle(path.clone());
            if rider.state() == TravellerState::Boarding {
                boarded += 1;
            }
        }
        log::trace!("route {}: vehicle {} at {stop}, {boarded} boarded", self.id.0, vehicle.0);
        boarded
    }

    /// A vehicle will not call at `stop` again: it ended its service there,
    /// or its next trip starts elsewhere.  Riders WAITING there are told to
    /// get off.
    pub fn on_service_ended(&mut self, vehicle: AgentId, stop: Coord) {
        if !self.accepts_notification(vehicle) {
            return;
        }
        log::debug!("route {}: vehicle {} ended service at {stop}", self.id.0, vehicle.0);
        for rider in self.waiting_at(stop) {
            rider.off_board_now();
        }
    }

    fn accepts_notification(&self, vehicle: AgentId) -> bool {
        if self.stops.is_empty() {
            log::debug!("route {}: no stops seeded, ignoring vehicle {}", self.id.0, vehicle.0);
            return false;
        }
        if !self.vehicles.contains(&vehicle) {
            log::debug!("route {}: vehicle {} is not registered, ignoring", self.id.0, vehicle.0);
            return false;
        }
        true
    }

    fn waiting_at(&mut self, stop: Coord) -> impl Iterator<Item = &mut Rider> {
        self.riders
            .values_mut()
            .filter(move |r| r.state() == TravellerState::Waiting && r.location() == Some(stop))
    }

    // ── Rider access ──────────────────────────────────────────────────────

    pub(crate) fn rider(&self, id: AgentId) -> Option<&Rider> {
        self.riders.get(&id)
    }

    /// Run `f` on a rider together with the route data it may consult.
    pub(crate) fn with_rider<R>(
        &mut self,
        id: AgentId,
        f:  impl FnOnce(&mut Rider, RiderEnv<'_>) -> R,
    ) -> Option<R> {
        let env = RiderEnv {
            stops:  &self.stops,
            finder: self.finder.as_deref(),
            layer:  self.layer,
        };
        let rider = self.riders.get_mut(&id)?;
        Some(f(rider, env))
    }
}
