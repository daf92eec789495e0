//! Simulation construction.

use crate::config::SimConfig;
use crate::models::{MessageTransmissionModel, ModelRegistry};
use crate::runtime::{Runtime, RuntimeLimit, Scenario};
use crate::time::SimTime;
use crate::world::World;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt::{self, Debug};

///
/// A builder for a [`Runtime`].
///
/// # Example
///
/// ```
/// use algosim::prelude::*;
///
/// let rt = Builder::seeded(42)
///     .max_rounds(50)
///     .config(SimConfig {
///         nack_generation: true,
///         ..SimConfig::default()
///     })
///     .build(());
/// assert_eq!(rt.world().round(), 0);
/// ```
///
pub struct Builder {
    config: SimConfig,
    limit: RuntimeLimit,
    rng: Box<dyn RngCore>,
    registry: ModelRegistry,
    transmission: Option<Box<dyn MessageTransmissionModel>>,
}

impl Builder {
    /// Creates a builder with an entropy-seeded rng.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(Box::new(StdRng::from_entropy()))
    }

    /// Creates a builder with a deterministically seeded rng, for
    /// reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(Box::new(StdRng::seed_from_u64(seed)))
    }

    fn with_rng(rng: Box<dyn RngCore>) -> Self {
        Self {
            config: SimConfig::default(),
            limit: RuntimeLimit::None,
            rng,
            registry: ModelRegistry::with_defaults(),
            transmission: None,
        }
    }

    /// Replaces the rng.
    #[must_use]
    pub fn rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Sets the simulation configuration.
    #[must_use]
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the model registry.
    #[must_use]
    pub fn registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the global transmission-delay model.
    #[must_use]
    pub fn transmission_model(mut self, model: Box<dyn MessageTransmissionModel>) -> Self {
        self.transmission = Some(model);
        self
    }

    /// Sets the run limit, replacing any previously set limit.
    #[must_use]
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Adds a round-count limit on top of the current limit.
    #[must_use]
    pub fn max_rounds(mut self, rounds: u64) -> Self {
        self.limit = self.limit.or(RuntimeLimit::Rounds(rounds));
        self
    }

    /// Adds an event-count limit on top of the current limit.
    #[must_use]
    pub fn max_events(mut self, events: usize) -> Self {
        self.limit = self.limit.or(RuntimeLimit::EventCount(events));
        self
    }

    /// Adds a simulation-time limit on top of the current limit.
    #[must_use]
    pub fn max_time(mut self, time: impl Into<SimTime>) -> Self {
        self.limit = self.limit.or(RuntimeLimit::SimTime(time.into()));
        self
    }

    /// Builds the runtime around the given scenario.
    #[must_use]
    pub fn build<S: Scenario>(self, scenario: S) -> Runtime<S> {
        let mut world = World::new(self.config, self.rng, self.registry);
        if let Some(model) = self.transmission {
            world.set_transmission_model(model);
        }
        Runtime::new(world, scenario, self.limit)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
