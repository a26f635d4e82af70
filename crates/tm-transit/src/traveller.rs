//! Passenger state machine.
//!
//! # States
//!
//! ```text
//!            set_route (walk is shorter)
//!   INITIAL ─────────────────────────────────────────────► READY
//!      │ next_path: walk to the start stop
//!      ▼
//!   WALKING ── wait ──► WAITING ◄── wait ── ONVEHICLE
//!                         │  ▲                  ▲
//!        vehicle calls    │  │ continuation     │ next_path:
//!        (enter_vehicle)  ▼  │ says stop        │ the vehicle's leg
//!                       BOARDING ───────────────┘
//!                         │
//!   at the end stop, or off_board_now away from the start stop ──► READY
//! ```
//!
//! A rider with a start/end stop pair (set by [`TransitTravellerMovement::set_route`])
//! rides in *fixed-route* mode and alights at its end stop.  A rider without
//! one (placed by [`TransitTravellerMovement::place_randomly`]) rides in
//! *open-ended* mode: at every stop the [`ContinuationModel`] decides whether
//! it stays on.
//!
//! A traveller that cannot walk to its first stop over the walkable node
//! types abandons the trip where it stands and becomes READY.

use tm_core::{AgentId, AgentRng, Coord, Layer, NodeId, SimDuration, SimTime};
use tm_spatial::{PathFinder, SpatialError};

use crate::control::{lock, RiderEnv, SharedControl};
use crate::model::{AgentKind, MovementModel, NextWait};
use crate::{ContinuationModel, Path, TransitResult};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TravellerState {
    Initial,
    Walking,
    Waiting,
    Boarding,
    OnVehicle,
    Ready,
}

// ── Rider ─────────────────────────────────────────────────────────────────────

/// The state of one traveller, owned by its route's control system.
pub(crate) struct Rider {
    state:        TravellerState,
    location:     Option<Coord>,
    latest_stop:  Option<Coord>,
    /// `(start stop, end stop)` in fixed-route mode.
    route:        Option<(Coord, Coord)>,
    next_path:    Option<Path>,
    continuation: ContinuationModel,
    rng:          AgentRng,
    walk_speed:   [f64; 2],
    layer:        Layer,
}

impl Rider {
    pub(crate) fn new(continuation: ContinuationModel, rng: AgentRng, walk_speed: [f64; 2]) -> Self {
        Self {
            state: TravellerState::Initial,
            location: None,
            latest_stop: None,
            route: None,
            next_path: None,
            continuation,
            rng,
            walk_speed,
            layer: Layer::Surface,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> TravellerState {
        self.state
    }

    #[inline]
    pub(crate) fn location(&self) -> Option<Coord> {
        self.location
    }

    fn set_route(&mut self, stops: &[Coord], origin: Coord, destination: Coord) {
        self.location = Some(origin);
        self.next_path = None;

        let (Some(start), Some(end)) = (nearest(stops, origin), nearest(stops, destination)) else {
            log::warn!("no stops known for this route; traveller walks from {origin} to {destination}");
            self.route = None;
            self.state = TravellerState::Ready;
            return;
        };

        let direct = origin.distance(destination);
        let via_transit = origin.distance(start) + destination.distance(end);

        self.route = Some((start, end));
        self.latest_stop = Some(start);
        self.state = if direct <= via_transit {
            TravellerState::Ready
        } else {
            TravellerState::Initial
        };
    }

    fn place_randomly(&mut self, env: &RiderEnv<'_>) -> Option<Coord> {
        let finder = env.finder?;
        let (graph, filter) = (finder.graph(), finder.filter());
        let walkable: Vec<NodeId> = (0..graph.node_count() as u32)
            .map(NodeId)
            .filter(|&n| graph.allows(n, filter))
            .collect();
        if walkable.is_empty() {
            return None;
        }
        let node = walkable[self.rng.gen_range(0..walkable.len())];
        let at = graph.node_pos[node.index()];
        self.location = Some(at);
        self.latest_stop = nearest(env.stops, at);
        self.route = None;
        self.next_path = None;
        self.state = TravellerState::Initial;
        Some(at)
    }

    /// INITIAL: walk to the latest stop.
    fn walk_to_stop(&mut self, finder: Option<&dyn PathFinder>) -> TransitResult<Option<Path>> {
        let (Some(from), Some(to), Some(finder)) = (self.location, self.latest_stop, finder) else {
            log::debug!("traveller has no location, stop, or map yet; no walking path");
            return Ok(None);
        };
        let graph = finder.graph();
        let (Some(from_node), Some(to_node)) =
            (graph.node_at(from).or_else(|| graph.snap_to_node(from)), graph.node_at(to))
        else {
            log::warn!("stop {to} is not on the walking map; no walking path");
            return Ok(None);
        };

        let route = match finder.shortest_path(from_node, to_node) {
            Ok(route) => route,
            Err(e @ SpatialError::NoRoute { .. }) => {
                log::warn!("traveller cannot walk from {from} to stop {to} ({e}); trip abandoned");
                self.state = TravellerState::Ready;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let speed = self.rng.uniform(self.walk_speed[0], self.walk_speed[1]);
        let mut path = Path::from_route(&route, graph, speed);
        if path.first() != Some(from) {
            path.waypoints.insert(0, from);
        }

        self.location = Some(to);
        self.state = TravellerState::Walking;
        Ok(Some(path))
    }

    fn next_path(&mut self, finder: Option<&dyn PathFinder>) -> TransitResult<Option<Path>> {
        match self.state {
            TravellerState::Initial => self.walk_to_stop(finder),
            TravellerState::Boarding => {
                let Some(path) = self.next_path.take() else {
                    self.state = TravellerState::Waiting;
                    return Ok(None);
                };
                if let Some(end) = path.last() {
                    self.location = Some(end);
                }
                self.state = TravellerState::OnVehicle;
                Ok(Some(path))
            }
            _ => Ok(None),
        }
    }

    fn next_wait(&mut self, route_layer: Layer) -> NextWait {
        match self.state {
            TravellerState::Walking => {
                self.state = TravellerState::Waiting;
                self.layer = route_layer;
            }
            TravellerState::OnVehicle => self.state = TravellerState::Waiting,
            _ => {}
        }
        NextWait::After(SimDuration::ZERO)
    }

    /// A vehicle stopped at this rider's location and offers `path`.
    pub(crate) fn enter_vehicle(&mut self, path: Path) {
        if self.state != TravellerState::Waiting {
            return;
        }
        match self.route {
            Some((_, end)) => {
                if self.location == Some(end) {
                    self.alight();
                } else {
                    self.board(path);
                }
            }
            None => {
                if self.continuation.decide(&mut self.rng) {
                    self.board(path);
                }
            }
        }
    }

    /// The vehicle serving this stop has ended its service.
    pub(crate) fn off_board_now(&mut self) {
        if self.state != TravellerState::Waiting {
            return;
        }
        if let Some((start, _)) = self.route {
            if self.location != Some(start) {
                self.alight();
            }
        }
    }

    fn board(&mut self, path: Path) {
        self.state = TravellerState::Boarding;
        self.next_path = Some(path);
    }

    fn alight(&mut self) {
        self.state = TravellerState::Ready;
        self.latest_stop = self.location;
        self.layer = Layer::Surface;
    }
}

/// Nearest coordinate to `to`; the first one wins on ties.
fn nearest(candidates: &[Coord], to: Coord) -> Option<Coord> {
    let mut best: Option<(f64, Coord)> = None;
    for &c in candidates {
        let d = c.distance(to);
        if best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, c));
        }
    }
    best.map(|(_, c)| c)
}

// ── TransitTravellerMovement ──────────────────────────────────────────────────

/// Handle to a traveller registered with a route's control system.
///
/// Every method locks the control system and operates on the rider it owns.
/// Created by [`TravellerFactory::spawn`][crate::TravellerFactory::spawn].
pub struct TransitTravellerMovement {
    id:      AgentId,
    control: SharedControl,
}

impl TransitTravellerMovement {
    pub(crate) fn new(id: AgentId, control: SharedControl) -> Self {
        Self { id, control }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn control(&self) -> &SharedControl {
        &self.control
    }

    /// Decide between walking and transit for a trip from `origin` to
    /// `destination`, using the nearest stop to each.
    ///
    /// If walking directly is no longer than walking to and from the
    /// nearest stops, the traveller becomes READY and never produces a path.
    pub fn set_route(&self, origin: Coord, destination: Coord) {
        self.with(|r, env| r.set_route(env.stops, origin, destination));
    }

    /// Put the traveller on a random map node in open-ended mode.  Returns
    /// the chosen location, or `None` if the route has no map yet.
    pub fn place_randomly(&self) -> Option<Coord> {
        self.with(|r, env| r.place_randomly(&env)).flatten()
    }

    /// Boarding decision for a vehicle stopped at the traveller's location.
    /// Ignored unless the traveller is WAITING.
    pub fn enter_bus(&self, path: Path) {
        self.with(|r, _| r.enter_vehicle(path));
    }

    /// Forced alight when service terminates.  Ignored unless WAITING.
    pub fn off_board_now(&self) {
        self.with(|r, _| r.off_board_now());
    }

    pub fn set_location(&self, at: Coord) {
        self.with(|r, _| r.location = Some(at));
    }

    pub fn state(&self) -> TravellerState {
        self.read(|r| r.state).unwrap_or(TravellerState::Ready)
    }

    pub fn latest_stop(&self) -> Option<Coord> {
        self.read(|r| r.latest_stop).flatten()
    }

    pub fn start_stop(&self) -> Option<Coord> {
        self.read(|r| r.route.map(|(s, _)| s)).flatten()
    }

    pub fn end_stop(&self) -> Option<Coord> {
        self.read(|r| r.route.map(|(_, e)| e)).flatten()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Rider, RiderEnv<'_>) -> R) -> Option<R> {
        let out = lock(&self.control).with_rider(self.id, f);
        if out.is_none() {
            log::debug!("traveller {} is not registered with its control system", self.id.0);
        }
        out
    }

    fn read<R>(&self, f: impl FnOnce(&Rider) -> R) -> Option<R> {
        lock(&self.control).rider(self.id).map(f)
    }
}

impl MovementModel for TransitTravellerMovement {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Traveller
    }

    fn next_wait_time(&mut self, _now: SimTime) -> NextWait {
        self.with(|r, env| r.next_wait(env.layer))
            .unwrap_or(NextWait::Never)
    }

    fn next_path(&mut self, _now: SimTime) -> TransitResult<Option<Path>> {
        self.with(|r, env| r.next_path(env.finder))
            .unwrap_or(Ok(None))
    }

    fn is_ready(&self) -> bool {
        self.state() == TravellerState::Ready
    }

    fn location(&self) -> Option<Coord> {
        self.read(|r| r.location).flatten()
    }

    fn layer(&self) -> Layer {
        self.read(|r| r.layer).unwrap_or_default()
    }
}
