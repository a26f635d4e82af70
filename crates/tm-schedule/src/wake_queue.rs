//! `WakeQueue` — sparse activation queue keyed by simulation time.
//!
//! Agents spend most of their time waiting (dwelling at a stop, travelling a
//! leg).  Rather than polling every agent, the driver registers the time at
//! which each agent next needs attention and drains only those entries.
//!
//! Agents queued for the same time are returned in insertion order, which
//! the driver relies on for reproducible stepping.

use std::collections::BTreeMap;

use tm_core::{AgentId, SimTime};

/// A priority queue mapping wake times → agents that must be stepped then.
#[derive(Default, Debug)]
pub struct WakeQueue {
    inner: BTreeMap<SimTime, Vec<AgentId>>,
    /// Cached total agent count for O(1) `len()`.
    total: usize,
}

impl WakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `agent` to wake at `at`.
    pub fn push(&mut self, at: SimTime, agent: AgentId) {
        self.inner.entry(at).or_default().push(agent);
        self.total += 1;
    }

    /// Remove and return all agents scheduled for exactly `at`.
    pub fn drain_at(&mut self, at: SimTime) -> Option<Vec<AgentId>> {
        let agents = self.inner.remove(&at)?;
        self.total -= agents.len();
        Some(agents)
    }

    /// Remove and return the earliest batch together with its time.
    pub fn pop_earliest(&mut self) -> Option<(SimTime, Vec<AgentId>)> {
        let (at, agents) = self.inner.pop_first()?;
        self.total -= agents.len();
        Some((at, agents))
    }

    /// The earliest time with at least one queued agent, or `None` if empty.
    pub fn next_time(&self) -> Option<SimTime> {
        self.inner.keys().next().copied()
    }

    /// Total number of (time, agent) entries.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct future times that have at least one queued agent.
    pub fn time_count(&self) -> usize {
        self.inner.len()
    }
}
