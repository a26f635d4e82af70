//! The `Sim` struct and its event loop.

use std::collections::{BTreeMap, BTreeSet};

use tm_core::{AgentId, Layer, SimClock, SimConfig, SimTime};
use tm_schedule::WakeQueue;
use tm_transit::{AgentKind, MovementModel, NextWait};

use crate::{SimError, SimObserver, SimResult};

// ── Per-agent driver state ────────────────────────────────────────────────────

/// Which request the agent receives at its next wake.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Phase {
    Wait,
    Path,
}

struct Slot {
    model: Box<dyn MovementModel>,
    phase: Phase,
    /// `None` once the agent is retired.  Queue entries whose time differs
    /// from `due` are stale and skipped.
    due:   Option<SimTime>,
    /// The last path request produced nothing.
    idle:  bool,
    layer: Layer,
}

/// Counters for one run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Wait and path requests issued.
    pub steps: u64,
    /// Paths returned by agents.
    pub paths: u64,
    /// Agents retired because they finished their trip.
    pub ready: u32,
    /// Agents retired because they will never move again.
    pub done:  u32,
    /// Clock value when the run stopped.
    pub end:   SimTime,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// Discrete-event driver for [`MovementModel`] agents.
///
/// Every agent alternates two requests.  At its first wake (the configured
/// start time) it is asked for a wait time; after that wait it is asked for a
/// path, and once the path has been travelled for a wait time again:
///
/// ```text
///  Wait ── After(d) ──► Path at now + d ── Some(path) ──► Wait at now + travel time
///    │                    │
///    Never ► retired      None ──► Wait at now + retry_interval   (agent is idle)
/// ```
///
/// * Agents due at the same instant are stepped travellers first, then
///   vehicles, each group in queue order.
/// * When a vehicle returns a path, every idle agent is woken at once, so
///   a traveller the vehicle just picked up leaves in the same millisecond.
/// * Agents reporting `is_ready()` or `is_done()` are retired.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    /// Start, end, seed, and retry interval of this run.
    pub config: SimConfig,

    /// Simulation clock; follows the time of the batch being stepped.
    pub clock: SimClock,

    /// Pending wakes (`BTreeMap<SimTime, Vec<AgentId>>`).
    pub wake_queue: WakeQueue,

    slots: Vec<Slot>,
    index: BTreeMap<AgentId, usize>,
    stats: SimStats,
}

impl Sim {
    pub(crate) fn new(config: SimConfig, models: Vec<Box<dyn MovementModel>>) -> SimResult<Self> {
        config.validate()?;

        let mut slots = Vec::with_capacity(models.len());
        let mut index = BTreeMap::new();
        let mut wake_queue = WakeQueue::new();
        for model in models {
            let id = model.id();
            if index.insert(id, slots.len()).is_some() {
                return Err(SimError::DuplicateAgent(id));
            }
            wake_queue.push(config.start, id);
            slots.push(Slot {
                layer: model.layer(),
                model,
                phase: Phase::Wait,
                due:   Some(config.start),
                idle:  false,
            });
        }

        Ok(Self {
            clock: config.make_clock(),
            config,
            wake_queue,
            slots,
            index,
            stats: SimStats::default(),
        })
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run until no agent is due at or before `config.end`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<SimStats> {
        let end = self.config.end;
        self.run_until(end, observer)?;
        observer.on_sim_end(self.clock.now);
        log::info!(
            "run finished at {}: {} steps, {} paths, {} ready, {} done, {} still active",
            self.clock,
            self.stats.steps,
            self.stats.paths,
            self.stats.ready,
            self.stats.done,
            self.active_count()
        );
        Ok(self.stats)
    }

    /// Step every batch due at or before `until`, then move the clock to
    /// `until`.  Useful for tests and incremental stepping.
    pub fn run_until<O: SimObserver>(&mut self, until: SimTime, observer: &mut O) -> SimResult<()> {
        while let Some(next) = self.wake_queue.next_time() {
            if next > until {
                break;
            }
            let Some((now, batch)) = self.wake_queue.pop_earliest() else {
                break;
            };
            self.clock.advance_to(now);
            let stepped = self.step_batch(now, batch, observer)?;
            observer.on_step_end(now, stepped);
        }
        self.clock.advance_to(until);
        self.stats.end = self.clock.now;
        Ok(())
    }

    pub fn now(&self) -> SimTime {
        self.clock.now
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn agent_count(&self) -> usize {
        self.slots.len()
    }

    /// Agents not yet retired.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.due.is_some()).count()
    }

    /// Read access to an agent's model, retired or not.
    pub fn agent(&self, id: AgentId) -> Option<&dyn MovementModel> {
        self.index.get(&id).map(|&i| &*self.slots[i].model)
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    fn step_batch<O: SimObserver>(
        &mut self,
        now:      SimTime,
        batch:    Vec<AgentId>,
        observer: &mut O,
    ) -> SimResult<usize> {
        let mut seen = BTreeSet::new();
        let mut due: Vec<usize> = batch
            .into_iter()
            .filter_map(|id| self.index.get(&id).copied())
            .filter(|&i| self.slots[i].due == Some(now) && seen.insert(i))
            .collect();
        // Stable: queue order is kept within each kind.
        due.sort_by_key(|&i| self.slots[i].model.kind());

        let mut stepped = 0;
        for i in due {
            if self.slots[i].due != Some(now) || self.retire_if_finished(i, now, observer) {
                continue;
            }
            stepped += 1;
            let vehicle_moved = self.step(i, now, observer)?;
            self.retire_if_finished(i, now, observer);
            if vehicle_moved {
                self.wake_idle(now);
            }
        }
        Ok(stepped)
    }

    /// Issue the agent's pending request.  Returns `true` when a vehicle
    /// produced a path.
    fn step<O: SimObserver>(&mut self, i: usize, now: SimTime, observer: &mut O) -> SimResult<bool> {
        self.stats.steps += 1;
        let retry = self.config.retry_interval;
        let slot = &mut self.slots[i];
        let id = slot.model.id();
        let mut vehicle_moved = false;

        let next = match slot.phase {
            Phase::Wait => match slot.model.next_wait_time(now) {
                NextWait::Never => None,
                NextWait::After(d) => {
                    slot.phase = Phase::Path;
                    Some(now + d)
                }
            },
            Phase::Path => {
                let path = slot
                    .model
                    .next_path(now)
                    .map_err(|source| SimError::Agent { agent: id, source })?;
                slot.phase = Phase::Wait;
                match path {
                    Some(path) => {
                        slot.idle = false;
                        self.stats.paths += 1;
                        vehicle_moved = slot.model.kind() == AgentKind::Vehicle;
                        observer.on_path(id, now, &path);
                        Some(now + path.travel_time())
                    }
                    None => {
                        slot.idle = true;
                        Some(now + retry)
                    }
                }
            }
        };

        note_layer(slot, now, observer);
        match next {
            Some(at) => {
                slot.due = Some(at);
                self.wake_queue.push(at, id);
            }
            None => {
                slot.due = None;
                self.stats.done += 1;
                log::debug!("{id} will not move again ({now})");
                observer.on_agent_done(id, now);
            }
        }
        Ok(vehicle_moved)
    }

    /// Retire the agent if it is finished.  Returns `true` if it is (or
    /// already was) retired.
    fn retire_if_finished<O: SimObserver>(&mut self, i: usize, now: SimTime, observer: &mut O) -> bool {
        let slot = &mut self.slots[i];
        if slot.due.is_none() {
            return true;
        }
        let id = slot.model.id();
        if slot.model.is_done() {
            slot.due = None;
            self.stats.done += 1;
            observer.on_agent_done(id, now);
            return true;
        }
        if slot.model.is_ready() {
            note_layer(slot, now, observer);
            slot.due = None;
            self.stats.ready += 1;
            let at = slot.model.location();
            log::debug!("{id} finished its trip at {at:?} ({now})");
            observer.on_agent_ready(id, now, at);
            return true;
        }
        false
    }

    /// Wake every idle agent at `now`, starting over with a wait request.
    fn wake_idle(&mut self, now: SimTime) {
        for slot in self.slots.iter_mut().filter(|s| s.idle && s.due.is_some()) {
            slot.idle = false;
            slot.phase = Phase::Wait;
            slot.due = Some(now);
            self.wake_queue.push(now, slot.model.id());
        }
    }
}

fn note_layer<O: SimObserver>(slot: &mut Slot, now: SimTime, observer: &mut O) {
    let layer = slot.model.layer();
    if layer != slot.layer {
        slot.layer = layer;
        observer.on_layer_change(slot.model.id(), now, layer);
    }
}
