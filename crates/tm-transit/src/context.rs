//! Per-run context and agent factories.
//!
//! # Run context
//!
//! A [`RunContext`] holds everything that is shared by all agents of one
//! simulation run: the run seed, the agent-id counter, and the control
//! systems keyed by route id.  Nothing here is global, so independent runs
//! can execute side by side.
//!
//! # Setup flow
//!
//! ```text
//! RouteDescriptor ─┐
//! StopMap ─────────┼─ initialize() ─► TransitRoute ── spawn_vehicles() ─► Vec<ScheduledTransitMovement>
//! MapGraph ────────┘        │
//!                           └─ seeds the route's TransitControlSystem
//!                               (stops, layer, walking path finder)
//!
//! TravellerFactory::spawn() ─► TransitTravellerMovement (registered as a rider)
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tm_core::{AgentId, AgentRng, Coord, Layer, NodeId, RouteId};
use tm_schedule::{RouteDescriptor, StopMap, VehicleSchedule};
use tm_spatial::{MapGraph, PathFinder, ShortestPathFinder};

use crate::control::{lock, SharedControl, TransitControlSystem};
use crate::traveller::{Rider, TransitTravellerMovement};
use crate::vehicle::{LoopKind, LoopPlan, StopNodeMap, TimetablePlan, VehiclePlan};
use crate::{
    ContinuationModel, ScheduledTransitMovement, TransitConfig, TransitError, TransitResult,
};

// ── RunContext ────────────────────────────────────────────────────────────────

/// Shared state of one simulation run.
///
/// Factories draw agent ids from it and look up control systems by route.
/// [`reset`](Self::reset) makes the context reusable for the next run.
pub struct RunContext {
    seed:       u64,
    next_agent: AtomicU32,
    systems:    Mutex<BTreeMap<RouteId, SharedControl>>,
}

impl RunContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            next_agent: AtomicU32::new(0),
            systems:    Mutex::new(BTreeMap::new()),
        }
    }

    /// Draw a fresh agent id.  Ids increase monotonically and are never
    /// handed out twice within a run.
    pub fn next_agent_id(&self) -> AgentId {
        AgentId(self.next_agent.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far.
    pub fn agents_created(&self) -> u32 {
        self.next_agent.load(Ordering::Relaxed)
    }

    /// The control system for route `id`, created empty on first use.
    pub fn control_system(&self, id: RouteId) -> SharedControl {
        let mut systems = self.systems.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(systems.entry(id).or_insert_with(|| TransitControlSystem::shared(id)))
    }

    /// Route ids with a control system, in ascending order.
    pub fn route_ids(&self) -> Vec<RouteId> {
        let systems = self.systems.lock().unwrap_or_else(PoisonError::into_inner);
        systems.keys().copied().collect()
    }

    /// Drop every control system and restart agent ids at zero, ready for
    /// the next run.  Handles to the old control systems stay valid but are
    /// no longer reachable through this context.
    pub fn reset(&self) {
        self.systems.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.next_agent.store(0, Ordering::Relaxed);
    }

    pub(crate) fn agent_rng(&self, id: AgentId) -> AgentRng {
        AgentRng::new(self.seed, id)
    }
}

// ── Timetabled routes ─────────────────────────────────────────────────────────

/// A validated, timetabled route ready to spawn its fleet.
///
/// Holds the vehicle path finder, the resolved stop nodes, and one shared
/// schedule per vehicle; every spawned vehicle reuses them.
pub struct TransitRoute {
    id:         RouteId,
    layer:      Layer,
    control:    SharedControl,
    finder:     Arc<dyn PathFinder>,
    stop_nodes: Arc<StopNodeMap>,
    schedules:  Vec<Arc<VehicleSchedule>>,
    config:     TransitConfig,
}

/// Validate `route` against the map and seed its control system.
///
/// Fails when the configuration is invalid, the timetable is malformed (empty
/// fleet, trips shorter than two stops, a trip stop outside the route's stop
/// set), a stop is missing from `stop_map` or does not lie exactly on a
/// graph node, or some stop cannot reach another over the vehicle node
/// types.
pub fn initialize(
    ctx:      &RunContext,
    route:    &RouteDescriptor,
    stop_map: &StopMap,
    graph:    Arc<MapGraph>,
    config:   &TransitConfig,
) -> TransitResult<TransitRoute> {
    config.validate()?;
    route.validate()?;

    let stop_nodes = resolve_stop_nodes(route.stops.iter().map(String::as_str), stop_map, &graph)?;

    let vehicle_finder = ShortestPathFinder::new(Arc::clone(&graph), config.vehicle_filter());
    check_connected(&vehicle_finder, &stop_nodes)?;

    let stops: Vec<Coord> = route
        .stops
        .iter()
        .filter_map(|id| stop_nodes.get(id).and_then(|&n| graph.position(n)))
        .collect();

    let walk_finder = ShortestPathFinder::new(graph, config.walk_filter());
    let control = ctx.control_system(route.route_id);
    {
        let mut cs = lock(&control);
        cs.set_stops(stops);
        cs.set_layer(route.layer);
        cs.set_path_finder(Arc::new(walk_finder));
    }

    log::info!(
        "route {}: {} stops, {} vehicles, layer {}",
        route.route_id.0,
        stop_nodes.len(),
        route.vehicles.len(),
        route.layer
    );

    Ok(TransitRoute {
        id: route.route_id,
        layer: route.layer,
        control,
        finder: Arc::new(vehicle_finder),
        stop_nodes: Arc::new(stop_nodes),
        schedules: route.vehicles.iter().cloned().map(Arc::new).collect(),
        config: config.clone(),
    })
}

impl TransitRoute {
    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn control(&self) -> &SharedControl {
        &self.control
    }

    pub fn stop_nodes(&self) -> &StopNodeMap {
        &self.stop_nodes
    }

    /// One registered vehicle agent per schedule, in schedule order.
    pub fn spawn_vehicles(&self, ctx: &RunContext) -> TransitResult<Vec<ScheduledTransitMovement>> {
        self.schedules
            .iter()
            .map(|schedule| {
                let id = ctx.next_agent_id();
                let plan = TimetablePlan::new(
                    Arc::clone(schedule),
                    Arc::clone(&self.stop_nodes),
                    &self.config,
                );
                let vehicle = ScheduledTransitMovement::new(
                    id,
                    self.layer,
                    Arc::clone(&self.control),
                    Arc::clone(&self.finder),
                    VehiclePlan::Timetable(plan),
                )?;
                lock(&self.control).register_vehicle(id)?;
                Ok(vehicle)
            })
            .collect()
    }
}

// ── Loop routes ───────────────────────────────────────────────────────────────

/// A route without timetable: vehicles circulate over `stops`.
pub struct LoopRoute {
    layer:   Layer,
    kind:    LoopKind,
    control: SharedControl,
    finder:  Arc<dyn PathFinder>,
    stops:   Arc<Vec<NodeId>>,
    config:  TransitConfig,
}

/// Validate a loop route and seed its control system.  `stops` are map
/// nodes in driving order; at least two are required and each must reach
/// the next.
pub fn initialize_loop(
    ctx:    &RunContext,
    id:     RouteId,
    layer:  Layer,
    kind:   LoopKind,
    stops:  Vec<NodeId>,
    graph:  Arc<MapGraph>,
    config: &TransitConfig,
) -> TransitResult<LoopRoute> {
    config.validate()?;
    if stops.len() < 2 {
        return Err(TransitError::Config(format!(
            "loop route {} needs at least 2 stops, got {}",
            id.0,
            stops.len()
        )));
    }
    let mut coords = Vec::with_capacity(stops.len());
    for &node in &stops {
        let at = graph.position(node).ok_or(tm_spatial::SpatialError::NodeNotFound(node))?;
        coords.push(at);
    }

    let named: StopNodeMap = stops.iter().map(|n| (n.0.to_string(), *n)).collect();
    let vehicle_finder = ShortestPathFinder::new(Arc::clone(&graph), config.vehicle_filter());
    check_connected(&vehicle_finder, &named)?;

    let control = ctx.control_system(id);
    {
        let mut cs = lock(&control);
        cs.set_stops(coords);
        cs.set_layer(layer);
        cs.set_path_finder(Arc::new(ShortestPathFinder::new(graph, config.walk_filter())));
    }

    Ok(LoopRoute {
        layer,
        kind,
        control,
        finder: Arc::new(vehicle_finder),
        stops: Arc::new(stops),
        config: config.clone(),
    })
}

impl LoopRoute {
    pub fn control(&self) -> &SharedControl {
        &self.control
    }

    /// Spawn one registered vehicle.  `first_stop` selects the starting
    /// stop; `None` picks one at random.
    pub fn spawn_vehicle(
        &self,
        ctx:        &RunContext,
        first_stop: Option<usize>,
    ) -> TransitResult<ScheduledTransitMovement> {
        let id = ctx.next_agent_id();
        let mut rng = ctx.agent_rng(id);
        let first = match first_stop {
            Some(i) if i < self.stops.len() => i,
            Some(i) => {
                return Err(TransitError::Config(format!(
                    "first stop index {i} is out of range for a route with {} stops",
                    self.stops.len()
                )));
            }
            None => rng.gen_range(0..self.stops.len()),
        };
        let plan = LoopPlan::new(Arc::clone(&self.stops), self.kind, first, rng, &self.config);
        let vehicle = ScheduledTransitMovement::new(
            id,
            self.layer,
            Arc::clone(&self.control),
            Arc::clone(&self.finder),
            VehiclePlan::Loop(plan),
        )?;
        lock(&self.control).register_vehicle(id)?;
        Ok(vehicle)
    }
}

// ── Travellers ────────────────────────────────────────────────────────────────

/// Creates travellers riding one route.
pub struct TravellerFactory {
    route:        RouteId,
    continuation: ContinuationModel,
    walk_speed:   [f64; 2],
}

impl TravellerFactory {
    /// Fails when `config` is invalid, including an empty continuation
    /// table.
    pub fn new(route: RouteId, config: &TransitConfig) -> TransitResult<Self> {
        config.validate()?;
        Ok(Self {
            route,
            continuation: ContinuationModel::new(config.continuation_probs.clone())?,
            walk_speed:   config.walk_speed,
        })
    }

    /// A new traveller in state INITIAL, registered with the route's control
    /// system.
    pub fn spawn(&self, ctx: &RunContext) -> TransitResult<TransitTravellerMovement> {
        let id = ctx.next_agent_id();
        let control = ctx.control_system(self.route);
        let rider = Rider::new(self.continuation.clone(), ctx.agent_rng(id), self.walk_speed);
        lock(&control).register_rider(id, rider)?;
        Ok(TransitTravellerMovement::new(id, control))
    }
}

// ── Setup helpers ─────────────────────────────────────────────────────────────

/// Map every stop id to the graph node it lies on.
pub fn resolve_stop_nodes<'a>(
    ids:      impl IntoIterator<Item = &'a str>,
    stop_map: &StopMap,
    graph:    &MapGraph,
) -> TransitResult<StopNodeMap> {
    let mut out = StopNodeMap::new();
    for id in ids {
        let at = stop_map.get(id).ok_or_else(|| TransitError::UnknownStop(id.to_owned()))?;
        let node = graph
            .node_at(at)
            .ok_or_else(|| TransitError::StopWithoutNode { stop: id.to_owned(), at })?;
        out.insert(id.to_owned(), node);
    }
    Ok(out)
}

/// Every stop must reach every other stop over the finder's node types.
fn check_connected(finder: &ShortestPathFinder, stops: &StopNodeMap) -> TransitResult<()> {
    for (from_id, &from) in stops {
        let seen = finder.reachable_from(from)?;
        if let Some((to_id, _)) = stops.iter().find(|&(_, &to)| !seen[to.index()]) {
            return Err(TransitError::Disconnected { from: from_id.clone(), to: to_id.clone() });
        }
    }
    Ok(())
}
