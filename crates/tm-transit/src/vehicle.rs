//! Transit vehicle agent.
//!
//! One agent type serves every mode; buses and metros differ only in the
//! [`Layer`] they are shown on.  What drives the vehicle is its
//! [`VehiclePlan`]:
//!
//! * [`VehiclePlan::Timetable`] follows a [`VehicleSchedule`] and derives
//!   each leg's speed from the scheduled arrival time.
//! * [`VehiclePlan::Loop`] circulates over a fixed stop list with random
//!   dwell times and speeds, with no timetable.
//!
//! # Timetable cursor
//!
//! The plan keeps two schedule positions: `current`, the stop the vehicle
//! is at, and `cursor`, the stop the next path leads to.  The driver
//! alternates `next_wait_time` and `next_path`:
//!
//! ```text
//! next_wait_time                         next_path
//! ───────────────────────────────────    ──────────────────────────────────
//! (0,0): wait for dep(0,0), cursor→(0,1)  path current → cursor,
//! end of trip t: wait for dep(t+1,0),       speed = length / (arr(cursor) − now),
//!   current→(t+1,0), cursor→(t+1,1)         notify riders at current,
//! final stop: Never                          current ← cursor
//! otherwise: wait for dep(current),
//!   cursor + 1
//! ```
//!
//! When the next trip starts at a different node, or the final stop is
//! reached, riders still waiting at the stop the vehicle leaves behind are
//! sent `on_service_ended`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tm_core::{AgentId, AgentRng, Coord, Layer, NodeId, SimDuration, SimTime};
use tm_schedule::{StopRecord, VehicleSchedule};
use tm_spatial::{PathFinder, SpatialError};

use crate::control::{lock, SharedControl};
use crate::model::{AgentKind, MovementModel, NextWait};
use crate::{Path, TransitConfig, TransitError, TransitResult};

/// Stop id → map node, resolved once per route.
pub type StopNodeMap = BTreeMap<String, NodeId>;

// ── Plans ─────────────────────────────────────────────────────────────────────

/// How a vehicle picks its next stop and the time it takes to get there.
pub enum VehiclePlan {
    /// Follow a timetable: waits and speeds come from scheduled times.
    Timetable(TimetablePlan),
    /// Circulate over a stop list with random dwells and speeds.
    Loop(LoopPlan),
}

/// Timetable state of one vehicle.
///
/// `cursor` is the `(trip, stop)` the vehicle drives to next; `current` is
/// the stop it is at (or last left).
pub struct TimetablePlan {
    schedule:   Arc<VehicleSchedule>,
    stop_nodes: Arc<StopNodeMap>,
    cursor:     (usize, usize),
    current:    (usize, usize),
    slack_ms:   i64,
    min_leg_s:  f64,
}

impl TimetablePlan {
    /// The schedule must be valid (see [`VehicleSchedule::validate`]) and
    /// every stop id must be present in `stop_nodes`.
    pub fn new(
        schedule:   Arc<VehicleSchedule>,
        stop_nodes: Arc<StopNodeMap>,
        config:     &TransitConfig,
    ) -> Self {
        Self {
            schedule,
            stop_nodes,
            cursor:    (0, 0),
            current:   (0, 0),
            slack_ms:  config.schedule_slack().0 as i64,
            min_leg_s: config.min_leg_s,
        }
    }

    pub fn schedule(&self) -> &VehicleSchedule {
        &self.schedule
    }

    /// `(trip, stop)` the next path leads to.
    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    fn record(&self, (trip, stop): (usize, usize)) -> TransitResult<&StopRecord> {
        self.schedule.stop(trip, stop).ok_or_else(|| {
            TransitError::Config(format!(
                "vehicle {} has no stop ({trip},{stop})",
                self.schedule.vehicle_id
            ))
        })
    }

    fn node(&self, at: (usize, usize)) -> TransitResult<NodeId> {
        let record = self.record(at)?;
        self.stop_nodes
            .get(&record.stop_id)
            .copied()
            .ok_or_else(|| TransitError::UnknownStop(record.stop_id.clone()))
    }

    /// Wait until `departure` of `at`, warning when the vehicle is already
    /// further behind than the slack allows.
    fn wait_for_departure(&self, at: (usize, usize), now: SimTime) -> NextWait {
        let Some(record) = self.schedule.stop(at.0, at.1) else {
            return NextWait::Never;
        };
        let delta = record.departure.delta_ms(now);
        if delta < -self.slack_ms {
            log::warn!(
                "vehicle {}: {} is {:.3}s past the scheduled departure from {:?}; check the timetable",
                self.schedule.vehicle_id,
                now,
                -delta as f64 / 1000.0,
                record.stop_id
            );
        }
        NextWait::After(SimDuration::from_delta_ms(delta))
    }
}

/// How a loop route continues past its last stop.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LoopKind {
    /// Back to the first stop.
    Circular,
    /// Reverse direction at either end.
    PingPong,
}

/// Loop state of one vehicle: the stop list, the index of the next stop,
/// the travel direction, and the vehicle's own RNG.
pub struct LoopPlan {
    stops:      Arc<Vec<NodeId>>,
    kind:       LoopKind,
    next:       usize,
    reversing:  bool,
    first_leg:  bool,
    rng:        AgentRng,
    speed:      [f64; 2],
    dwell_s:    [f64; 2],
}

impl LoopPlan {
    /// `stops` must hold at least two nodes and `first` must index into it.
    pub fn new(
        stops:  Arc<Vec<NodeId>>,
        kind:   LoopKind,
        first:  usize,
        rng:    AgentRng,
        config: &TransitConfig,
    ) -> Self {
        Self {
            stops,
            kind,
            next: first,
            reversing: false,
            first_leg: true,
            rng,
            speed: config.loop_speed,
            dwell_s: config.loop_dwell_s,
        }
    }

    /// Return the stop at the index and move the index one stop along the
    /// route.
    fn advance(&mut self) -> NodeId {
        let n = self.stops.len();
        let stop = self.stops[self.next];
        if self.reversing {
            if self.next == 0 {
                self.reversing = false;
                self.next = 1.min(n - 1);
            } else {
                self.next -= 1;
            }
        } else {
            self.next += 1;
        }
        if self.next >= n {
            match self.kind {
                LoopKind::Circular => self.next = 0,
                LoopKind::PingPong => {
                    self.next = n.saturating_sub(2);
                    self.reversing = true;
                }
            }
        }
        stop
    }
}

fn position(finder: &dyn PathFinder, node: NodeId) -> TransitResult<Coord> {
    finder
        .graph()
        .position(node)
        .ok_or(TransitError::Spatial(SpatialError::NodeNotFound(node)))
}

// ── ScheduledTransitMovement ──────────────────────────────────────────────────

/// A transit vehicle registered with its route's control system.
pub struct ScheduledTransitMovement {
    id:        AgentId,
    layer:     Layer,
    control:   SharedControl,
    finder:    Arc<dyn PathFinder>,
    plan:      VehiclePlan,
    last_node: NodeId,
    done:      bool,
}

impl ScheduledTransitMovement {
    /// Build a vehicle positioned at the first stop of its plan.  The caller
    /// registers it with `control`.
    pub fn new(
        id:      AgentId,
        layer:   Layer,
        control: SharedControl,
        finder:  Arc<dyn PathFinder>,
        mut plan: VehiclePlan,
    ) -> TransitResult<Self> {
        let last_node = match &mut plan {
            VehiclePlan::Timetable(t) => t.node((0, 0))?,
            VehiclePlan::Loop(l) => l.advance(),
        };
        Ok(Self { id, layer, control, finder, plan, last_node, done: false })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn plan(&self) -> &VehiclePlan {
        &self.plan
    }

    /// Graph node of the stop the vehicle is at (or heading to).
    pub fn last_node(&self) -> NodeId {
        self.last_node
    }

    fn timetable_wait(&mut self, now: SimTime) -> NextWait {
        let VehiclePlan::Timetable(plan) = &mut self.plan else {
            return NextWait::Never;
        };
        let (trip, stop) = plan.cursor;

        if plan.schedule.is_last_stop(trip, stop) {
            if !self.done {
                self.done = true;
                if let Some(at) = self.finder.graph().position(self.last_node) {
                    lock(&self.control).on_service_ended(self.id, at);
                }
            }
            return NextWait::Never;
        }

        if (trip, stop) == (0, 0) {
            plan.current = (0, 0);
            plan.cursor = (0, 1);
            return plan.wait_for_departure((0, 0), now);
        }

        if plan.schedule.should_start_next_trip(trip, stop) {
            let next = (trip + 1, 0);
            let wait = plan.wait_for_departure(next, now);
            plan.current = next;
            plan.cursor = (trip + 1, 1);
            match plan.node(next) {
                Ok(node) => {
                    if node != self.last_node {
                        // Nothing will call at the stop this trip ended on.
                        if let Some(at) = self.finder.graph().position(self.last_node) {
                            lock(&self.control).on_service_ended(self.id, at);
                        }
                        log::debug!(
                            "vehicle {}: repositioning from node {} to node {} for trip {}",
                            self.id.0, self.last_node.0, node.0, trip + 1
                        );
                    }
                    self.last_node = node;
                }
                Err(e) => log::warn!("vehicle {}: {e}", self.id.0),
            }
            return wait;
        }

        let wait = plan.wait_for_departure(plan.current, now);
        plan.cursor = (trip, stop + 1);
        wait
    }

    fn timetable_path(&mut self, now: SimTime) -> TransitResult<Option<Path>> {
        let VehiclePlan::Timetable(plan) = &mut self.plan else {
            return Ok(None);
        };
        let target = plan.record(plan.cursor)?;
        let departed_from = plan.record(plan.current)?;
        let to = plan.node(plan.cursor)?;

        let route = self.finder.shortest_path(self.last_node, to)?;
        let mut path = Path::from_route(&route, self.finder.graph(), 0.0);

        if now > departed_from.departure {
            log::info!(
                "vehicle {}: departing {:?} {:.3}s late",
                self.id.0,
                departed_from.stop_id,
                now.delta_secs(departed_from.departure)
            );
        }
        let mut remaining = target.arrival.delta_secs(now);
        if remaining <= 0.0 {
            log::warn!(
                "vehicle {}: scheduled arrival at {:?} is already due; using a {:.1}s leg",
                self.id.0, target.stop_id, plan.min_leg_s
            );
            remaining = plan.min_leg_s;
        }
        path.speed = path.length() / remaining;

        let at = position(&*self.finder, self.last_node)?;
        lock(&self.control).on_vehicle_stopped(self.id, at, &path);

        plan.current = plan.cursor;
        self.last_node = to;
        Ok(Some(path))
    }

    fn loop_wait(&mut self) -> NextWait {
        let VehiclePlan::Loop(plan) = &mut self.plan else {
            return NextWait::Never;
        };
        let secs = plan.rng.uniform(plan.dwell_s[0], plan.dwell_s[1]);
        NextWait::After(SimDuration::from_secs_f64(secs))
    }

    fn loop_path(&mut self) -> TransitResult<Option<Path>> {
        let VehiclePlan::Loop(plan) = &mut self.plan else {
            return Ok(None);
        };
        let to = plan.advance();
        let speed = plan.rng.uniform(plan.speed[0], plan.speed[1]);
        let route = self.finder.shortest_path(self.last_node, to)?;
        let path = Path::from_route(&route, self.finder.graph(), speed);

        if plan.first_leg {
            plan.first_leg = false;
        } else {
            let at = position(&*self.finder, self.last_node)?;
            lock(&self.control).on_vehicle_stopped(self.id, at, &path);
        }

        self.last_node = to;
        Ok(Some(path))
    }
}

impl MovementModel for ScheduledTransitMovement {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Vehicle
    }

    fn next_wait_time(&mut self, now: SimTime) -> NextWait {
        match self.plan {
            VehiclePlan::Timetable(_) => self.timetable_wait(now),
            VehiclePlan::Loop(_) => self.loop_wait(),
        }
    }

    fn next_path(&mut self, now: SimTime) -> TransitResult<Option<Path>> {
        if self.done {
            return Ok(None);
        }
        match self.plan {
            VehiclePlan::Timetable(_) => self.timetable_path(now),
            VehiclePlan::Loop(_) => self.loop_path(),
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn location(&self) -> Option<Coord> {
        self.finder.graph().position(self.last_node)
    }

    fn layer(&self) -> Layer {
        self.layer
    }
}
