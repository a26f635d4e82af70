//! Fluent builder for constructing a [`Sim`].

use tm_core::SimConfig;
use tm_transit::MovementModel;

use crate::{Sim, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - [`SimConfig`] — start, end, seed, retry interval
///
/// # Optional inputs
///
/// | Method           | Adds                                     |
/// |------------------|------------------------------------------|
/// | `.agent(m)`      | one model                                |
/// | `.agents(iter)`  | every model of an iterator               |
/// | `.boxed(b)`      | an already boxed `dyn MovementModel`     |
///
/// Agents are stepped in the order they were added whenever several of the
/// same kind are due together.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = RunContext::new(config.seed);
/// let route = initialize(&ctx, &descriptor, &stop_map, graph, &TransitConfig::default())?;
/// let mut sim = SimBuilder::new(config)
///     .agents(route.spawn_vehicles(&ctx)?)
///     .agent(traveller)
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config: SimConfig,
    models: Vec<Box<dyn MovementModel>>,
}

impl SimBuilder {
    pub fn new(config: SimConfig) -> Self {
        Self { config, models: Vec::new() }
    }

    pub fn agent(mut self, model: impl MovementModel + 'static) -> Self {
        self.models.push(Box::new(model));
        self
    }

    pub fn agents<I>(mut self, models: I) -> Self
    where
        I: IntoIterator,
        I::Item: MovementModel + 'static,
    {
        self.models
            .extend(models.into_iter().map(|m| Box::new(m) as Box<dyn MovementModel>));
        self
    }

    pub fn boxed(mut self, model: Box<dyn MovementModel>) -> Self {
        self.models.push(model);
        self
    }

    /// Validate the configuration, reject duplicate agent ids, and queue
    /// every agent at the start time.
    pub fn build(self) -> SimResult<Sim> {
        Sim::new(self.config, self.models)
    }
}
