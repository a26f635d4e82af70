//! Integration tests for tm-sim.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tm_core::{AgentId, Coord, Layer, SimConfig, SimDuration, SimTime};
use tm_transit::{AgentKind, MovementModel, NextWait, Path, TransitError, TransitResult};

use crate::{NoopObserver, SimBuilder, SimError, SimObserver};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn test_config(end_secs: i64) -> SimConfig {
    SimConfig {
        start:          SimTime::ZERO,
        end:            SimTime::from_secs(end_secs),
        seed:           42,
        retry_interval: SimDuration::from_secs(1),
    }
}

type Log = Arc<Mutex<Vec<(AgentId, &'static str, SimTime)>>>;

/// A model that replays scripted answers and logs every request.
struct Scripted {
    id:    AgentId,
    kind:  AgentKind,
    waits: VecDeque<NextWait>,
    paths: VecDeque<Option<Path>>,
    fail:  bool,
    log:   Log,
}

impl Scripted {
    fn new(id: u32, kind: AgentKind, log: &Log) -> Self {
        Self {
            id: AgentId(id),
            kind,
            waits: VecDeque::new(),
            paths: VecDeque::new(),
            fail: false,
            log: Arc::clone(log),
        }
    }

    fn waits(mut self, waits: &[NextWait]) -> Self {
        self.waits = waits.iter().copied().collect();
        self
    }

    fn paths(mut self, paths: Vec<Option<Path>>) -> Self {
        self.paths = paths.into();
        self
    }
}

impl MovementModel for Scripted {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn next_wait_time(&mut self, now: SimTime) -> NextWait {
        self.log.lock().unwrap().push((self.id, "wait", now));
        self.waits.pop_front().unwrap_or(NextWait::Never)
    }

    fn next_path(&mut self, now: SimTime) -> TransitResult<Option<Path>> {
        self.log.lock().unwrap().push((self.id, "path", now));
        if self.fail {
            return Err(TransitError::Config("scripted failure".into()));
        }
        Ok(self.paths.pop_front().flatten())
    }

    fn location(&self) -> Option<Coord> {
        None
    }

    fn layer(&self) -> Layer {
        Layer::Surface
    }
}

fn after(secs: u64) -> NextWait {
    NextWait::After(SimDuration::from_secs(secs))
}

/// 10 m at 10 m/s: one second of travel.
fn one_second_path() -> Path {
    Path::new(vec![Coord::new(0.0, 0.0), Coord::new(10.0, 0.0)], 10.0)
}

fn ms(t: i64) -> SimTime {
    SimTime(t)
}

#[derive(Default)]
struct Recorder {
    paths:  Vec<(AgentId, SimTime, Path)>,
    layers: Vec<(AgentId, Layer)>,
    ready:  Vec<(AgentId, SimTime, Option<Coord>)>,
    done:   Vec<AgentId>,
    ended:  Option<SimTime>,
}

impl SimObserver for Recorder {
    fn on_path(&mut self, agent: AgentId, now: SimTime, path: &Path) {
        self.paths.push((agent, now, path.clone()));
    }

    fn on_layer_change(&mut self, agent: AgentId, _now: SimTime, layer: Layer) {
        self.layers.push((agent, layer));
    }

    fn on_agent_ready(&mut self, agent: AgentId, now: SimTime, at: Option<Coord>) {
        self.ready.push((agent, now, at));
    }

    fn on_agent_done(&mut self, agent: AgentId, _now: SimTime) {
        self.done.push(agent);
    }

    fn on_sim_end(&mut self, now: SimTime) {
        self.ended = Some(now);
    }
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_and_queues_every_agent_at_start() {
        let log = Log::default();
        let sim = SimBuilder::new(test_config(10))
            .agent(Scripted::new(0, AgentKind::Vehicle, &log))
            .agents([Scripted::new(1, AgentKind::Traveller, &log), Scripted::new(2, AgentKind::Traveller, &log)])
            .boxed(Box::new(Scripted::new(3, AgentKind::Traveller, &log)))
            .build()
            .unwrap();
        assert_eq!(sim.agent_count(), 4);
        assert_eq!(sim.wake_queue.len(), 4);
        assert_eq!(sim.wake_queue.next_time(), Some(SimTime::ZERO));
        assert_eq!(sim.agent(AgentId(2)).map(|a| a.kind()), Some(AgentKind::Traveller));
    }

    #[test]
    fn duplicate_agent_ids_rejected() {
        let log = Log::default();
        let result = SimBuilder::new(test_config(10))
            .agent(Scripted::new(5, AgentKind::Vehicle, &log))
            .agent(Scripted::new(5, AgentKind::Traveller, &log))
            .build();
        assert!(matches!(result, Err(SimError::DuplicateAgent(AgentId(5)))));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut cfg = test_config(10);
        cfg.retry_interval = SimDuration::ZERO;
        assert!(matches!(SimBuilder::new(cfg).build(), Err(SimError::Config(_))));

        let backwards = SimConfig { start: SimTime::from_secs(5), ..test_config(1) };
        assert!(SimBuilder::new(backwards).build().is_err());
    }
}

// ── Event loop ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod event_loop {
    use super::*;

    #[test]
    fn wait_and_path_alternate() {
        let log = Log::default();
        let agent = Scripted::new(0, AgentKind::Vehicle, &log)
            .waits(&[after(2), after(3)])
            .paths(vec![Some(one_second_path()), Some(one_second_path())]);
        let mut sim = SimBuilder::new(test_config(100)).agent(agent).build().unwrap();
        let mut rec = Recorder::default();
        let stats = sim.run(&mut rec).unwrap();

        let got = log.lock().unwrap().clone();
        let want = vec![
            (AgentId(0), "wait", ms(0)),
            (AgentId(0), "path", ms(2_000)),
            (AgentId(0), "wait", ms(3_000)),
            (AgentId(0), "path", ms(6_000)),
            (AgentId(0), "wait", ms(7_000)),
        ];
        assert_eq!(got, want);
        assert_eq!(stats.paths, 2);
        assert_eq!(stats.done, 1);
        assert_eq!(rec.done, vec![AgentId(0)]);
        assert_eq!(rec.ended, Some(SimTime::from_secs(100)));
        assert_eq!(sim.active_count(), 0);
    }

    #[test]
    fn no_path_retries_after_interval() {
        let log = Log::default();
        let agent = Scripted::new(0, AgentKind::Traveller, &log)
            .waits(&[after(0), after(0)])
            .paths(vec![None, Some(one_second_path())]);
        let mut sim = SimBuilder::new(test_config(100)).agent(agent).build().unwrap();
        sim.run(&mut NoopObserver).unwrap();

        let times: Vec<_> = log.lock().unwrap().iter().map(|&(_, what, t)| (what, t.0)).collect();
        assert_eq!(
            times,
            vec![("wait", 0), ("path", 0), ("wait", 1_000), ("path", 1_000), ("wait", 2_000)]
        );
    }

    #[test]
    fn travellers_step_before_vehicles() {
        let log = Log::default();
        let mut sim = SimBuilder::new(test_config(10))
            .agent(Scripted::new(0, AgentKind::Vehicle, &log))
            .agent(Scripted::new(1, AgentKind::Traveller, &log))
            .agent(Scripted::new(2, AgentKind::Vehicle, &log))
            .agent(Scripted::new(3, AgentKind::Traveller, &log))
            .build()
            .unwrap();
        sim.run(&mut NoopObserver).unwrap();

        let order: Vec<u32> = log.lock().unwrap().iter().map(|&(id, _, _)| id.0).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn vehicle_path_wakes_idle_agents() {
        let log = Log::default();
        let cfg = SimConfig { retry_interval: SimDuration::from_secs(10), ..test_config(100) };
        let vehicle = Scripted::new(0, AgentKind::Vehicle, &log)
            .waits(&[after(5)])
            .paths(vec![Some(one_second_path())]);
        let rider = Scripted::new(1, AgentKind::Traveller, &log)
            .waits(&[after(0), after(0)])
            .paths(vec![None, Some(one_second_path())]);
        let mut sim = SimBuilder::new(cfg).agent(vehicle).agent(rider).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let rider_log: Vec<_> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|&&(id, _, _)| id == AgentId(1))
            .map(|&(_, what, t)| (what, t.0))
            .collect();
        // Woken at 5 s by the vehicle instead of at the 10 s retry.
        assert_eq!(
            rider_log,
            vec![("wait", 0), ("path", 0), ("wait", 5_000), ("path", 5_000), ("wait", 6_000)]
        );
        let departures: Vec<_> = rec.paths.iter().map(|(id, t, _)| (id.0, t.0)).collect();
        assert_eq!(departures, vec![(0, 5_000), (1, 5_000)]);
    }

    #[test]
    fn nothing_runs_past_the_end() {
        let log = Log::default();
        let agent = Scripted::new(0, AgentKind::Vehicle, &log)
            .waits(&[after(5)])
            .paths(vec![Some(one_second_path())]);
        let mut sim = SimBuilder::new(test_config(3)).agent(agent).build().unwrap();
        let stats = sim.run(&mut NoopObserver).unwrap();

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(stats.paths, 0);
        assert_eq!(stats.end, SimTime::from_secs(3));
        assert_eq!(sim.active_count(), 1);
        assert_eq!(sim.wake_queue.next_time(), Some(SimTime::from_secs(5)));
    }

    #[test]
    fn run_until_steps_incrementally() {
        let log = Log::default();
        let agent = Scripted::new(0, AgentKind::Vehicle, &log)
            .waits(&[after(5)])
            .paths(vec![Some(one_second_path())]);
        let mut sim = SimBuilder::new(test_config(100)).agent(agent).build().unwrap();
        sim.run_until(SimTime::from_secs(4), &mut NoopObserver).unwrap();
        assert_eq!(sim.now(), SimTime::from_secs(4));
        assert_eq!(sim.stats().paths, 0);
        sim.run_until(SimTime::from_secs(5), &mut NoopObserver).unwrap();
        assert_eq!(sim.stats().paths, 1);
    }

    #[test]
    fn path_errors_stop_the_run() {
        let log = Log::default();
        let mut agent = Scripted::new(7, AgentKind::Vehicle, &log).waits(&[after(0)]);
        agent.fail = true;
        let mut sim = SimBuilder::new(test_config(10)).agent(agent).build().unwrap();
        let err = sim.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, SimError::Agent { agent: AgentId(7), .. }));
    }
}

// ── Transit end to end ────────────────────────────────────────────────────────

#[cfg(test)]
mod transit {
    use std::sync::Arc;

    use tm_schedule::{RouteDescriptor, StopMap, StopRecord, Trip, VehicleSchedule};
    use tm_spatial::{MapGraph, MapGraphBuilder};
    use tm_transit::{initialize, RunContext, TransitConfig, TransitRoute, TravellerFactory};

    use super::*;
    use crate::{run_batch, Sim, SimResult};

    const COORDS: [(f64, f64); 8] = [
        (0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (0.0, 10.0),
        (10.0, 10.0), (15.0, 10.0), (20.0, 10.0), (25.0, 10.0),
    ];

    fn at(node: usize) -> Coord {
        Coord::new(COORDS[node].0, COORDS[node].1)
    }

    fn graph() -> Arc<MapGraph> {
        let mut b = MapGraphBuilder::new();
        let n: Vec<_> = (0..COORDS.len()).map(|i| b.add_node(at(i))).collect();
        for (a, c) in [(0, 1), (0, 3), (1, 4), (1, 2), (2, 5), (2, 6), (3, 4), (4, 5), (5, 6), (6, 7)] {
            b.add_road(n[a], n[c]);
        }
        Arc::new(b.build())
    }

    /// One vehicle: n1 (dep 100) → n4 → n5 → n6 → n2 with 10 s dwells.
    fn descriptor(layer: Layer) -> RouteDescriptor {
        let calls = [(1, 0, 100), (4, 200, 210), (5, 300, 310), (6, 400, 410), (2, 500, 500)];
        let trip = Trip::new(
            calls
                .iter()
                .map(|&(n, arr, dep)| {
                    StopRecord::new(format!("n{n}"), SimTime::from_secs(arr), SimTime::from_secs(dep))
                })
                .collect(),
        );
        RouteDescriptor {
            route_id: tm_core::RouteId(1),
            layer,
            stops:    [1, 4, 5, 6, 2].iter().map(|n| format!("n{n}")).collect(),
            vehicles: vec![VehicleSchedule::new(0, vec![trip])],
        }
    }

    fn setup(ctx: &RunContext, layer: Layer) -> TransitRoute {
        let stops: StopMap = (0..COORDS.len()).map(|i| (format!("n{i}"), at(i))).collect();
        initialize(ctx, &descriptor(layer), &stops, graph(), &TransitConfig::default()).unwrap()
    }

    #[test]
    fn passenger_rides_from_stop_1_to_stop_6() {
        let ctx = RunContext::new(42);
        let route = setup(&ctx, Layer::Underground);
        let vehicles = route.spawn_vehicles(&ctx).unwrap();
        let traveller = TravellerFactory::new(route.id(), &TransitConfig::default())
            .unwrap()
            .spawn(&ctx)
            .unwrap();
        traveller.set_route(at(0), at(7));
        let (vehicle_id, rider_id) = (AgentId(0), traveller.id());

        let mut sim = SimBuilder::new(test_config(3_600))
            .agents(vehicles)
            .agent(traveller)
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        let stats = sim.run(&mut rec).unwrap();

        let rider_paths: Vec<_> = rec.paths.iter().filter(|(id, _, _)| *id == rider_id).collect();
        let vehicle_paths: Vec<_> = rec.paths.iter().filter(|(id, _, _)| *id == vehicle_id).collect();

        // Walk n0 → n1, then three legs with the vehicle.
        assert_eq!(rider_paths.len(), 4);
        assert_eq!(rider_paths[0].2.waypoints, vec![at(0), at(1)]);
        for (ride, leg) in rider_paths[1..].iter().zip(&vehicle_paths) {
            assert_eq!(ride.1, leg.1, "rider departs with the vehicle");
            assert_eq!(ride.2, leg.2, "rider follows the vehicle's path");
        }
        assert_eq!(rider_paths[1].1, SimTime::from_secs(100));
        assert_eq!(vehicle_paths.len(), 4);

        assert_eq!(rec.ready.len(), 1);
        let (id, when, where_) = rec.ready[0];
        assert_eq!(id, rider_id);
        assert_eq!(when, SimTime::from_secs(410));
        assert_eq!(where_, Some(at(6)));

        assert_eq!(rec.done, vec![vehicle_id]);
        assert_eq!(rec.layers, vec![(rider_id, Layer::Underground), (rider_id, Layer::Surface)]);
        assert_eq!(stats.ready, 1);
        assert_eq!(sim.active_count(), 0);

        let rider = sim.agent(rider_id).unwrap();
        assert!(rider.is_ready());
        assert_eq!(rider.location(), Some(at(6)));
    }

    #[test]
    fn short_trip_is_retired_without_moving() {
        let ctx = RunContext::new(42);
        let route = setup(&ctx, Layer::Surface);
        let traveller = TravellerFactory::new(route.id(), &TransitConfig::default())
            .unwrap()
            .spawn(&ctx)
            .unwrap();
        traveller.set_route(at(0), at(3));
        let id = traveller.id();

        let mut sim = SimBuilder::new(test_config(60)).agent(traveller).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert!(rec.paths.is_empty());
        assert_eq!(rec.ready, vec![(id, SimTime::ZERO, Some(at(0)))]);
    }

    #[test]
    fn batch_runs_are_reproducible() {
        let build = |seed: u64| -> SimResult<Sim> {
            let ctx = RunContext::new(seed);
            let route = setup(&ctx, Layer::Surface);
            let factory = TravellerFactory::new(route.id(), &TransitConfig::default())?;
            let mut builder = SimBuilder::new(SimConfig { seed, ..test_config(3_600) })
                .agents(route.spawn_vehicles(&ctx)?);
            for _ in 0..5 {
                let t = factory.spawn(&ctx)?;
                t.place_randomly();
                builder = builder.agent(t);
            }
            builder.build()
        };

        let first = run_batch(&[1, 2, 3], &build);
        let again = run_batch(&[1, 2, 3], &build);
        assert_eq!(first.len(), 3);
        for (a, b) in first.iter().zip(&again) {
            let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
            assert_eq!(a, b);
            assert_eq!(a.done, 1, "the vehicle finishes its timetable");
        }
    }
}
