//! Deterministic per-agent and run-level RNG wrappers.
//!
//! Every agent owns a `SmallRng` seeded from the run seed and its id:
//!
//!   seed = run_seed XOR (agent_id * GOLDEN)
//!
//! `GOLDEN` is the 64-bit fractional part of the golden ratio, which spreads
//! consecutive ids across the seed space.  Agents never share RNG state, so
//! the order in which the driver steps agents within one instant does not
//! change any agent's draws, and spawning one more agent leaves the draws of
//! the others untouched.

use rand::rngs::SmallRng;
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::{Rng, SeedableRng};

use crate::AgentId;

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-agent RNG, created by the agent factories and owned by the agent.
pub struct AgentRng(SmallRng);

impl AgentRng {
    pub fn new(run_seed: u64, agent: AgentId) -> Self {
        let seed = run_seed ^ u64::from(agent.0).wrapping_mul(GOLDEN);
        AgentRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn gen_range<T: SampleUniform, R: SampleRange<T>>(&mut self, range: R) -> T {
        self.0.gen_range(range)
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// Uniform draw in `[lo, hi]`.  A degenerate or inverted range yields
    /// `lo`, so a configured `[1.0, 1.0]` means "always 1.0".
    #[inline]
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo { self.0.gen_range(lo..=hi) } else { lo }
    }
}

/// Run-level RNG for choices that belong to no agent, such as the
/// origin/destination draws of a scenario.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn gen_range<T: SampleUniform, R: SampleRange<T>>(&mut self, range: R) -> T {
        self.0.gen_range(range)
    }
}
