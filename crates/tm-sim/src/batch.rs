//! Independent runs side by side.
//!
//! Each run owns its [`RunContext`][tm_transit::RunContext], agents, and
//! control systems, so runs share nothing.  With the `parallel` feature the
//! batch is spread over Rayon's thread pool; results keep the input order
//! either way.

use crate::{NoopObserver, Sim, SimResult, SimStats};

/// Build and run one simulation per seed.
///
/// `build` receives the seed and returns a ready-to-run [`Sim`]; a failure
/// to build or run is reported in that seed's slot without stopping the
/// other runs.
pub fn run_batch<F>(seeds: &[u64], build: F) -> Vec<SimResult<SimStats>>
where
    F: Fn(u64) -> SimResult<Sim> + Sync,
{
    let run_one = |&seed: &u64| -> SimResult<SimStats> {
        let mut sim = build(seed)?;
        sim.run(&mut NoopObserver)
    };

    #[cfg(not(feature = "parallel"))]
    {
        seeds.iter().map(run_one).collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        seeds.par_iter().map(run_one).collect()
    }
}
