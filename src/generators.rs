//! Random value generators for sources.
//!
//! Every generator owns its PRNG, seeded explicitly, so two sources never
//! share random state and a fixed seed reproduces a run exactly.
//!
//! # Main Types
//!
//! - [`Distribution`] - Which distribution to draw from
//! - [`RandomValues`] - Independent draws from a [`Distribution`]
//! - [`RandomWalk`] - Gaussian random walk, optionally throttled
//! - [`UniformInts`] - Integers uniform in `[0, max)`
//! - [`SeedPolicy`] - Fixed seed or one taken from the clock

use crate::pipeline::{PipelineError, PipelineResult};
use crate::types::Value;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Exp1, StandardNormal};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Where a generator's seed comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    Fixed(u64),
    /// Nanoseconds since the Unix epoch at resolution time.
    #[default]
    FromTime,
}

impl SeedPolicy {
    pub fn resolve(self) -> u64 {
        let seed = match self {
            SeedPolicy::Fixed(seed) => seed,
            SeedPolicy::FromTime => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
        };
        tracing::info!("Random seed: {}", seed);
        seed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Uniform in `[low, high)`.
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
    /// Exponential with the given rate (mean `1 / rate`).
    Exponential { rate: f64 },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Uniform {
            low: 0.0,
            high: 1.0,
        }
    }
}

impl Distribution {
    pub fn validate(&self) -> PipelineResult<()> {
        let ok = match *self {
            Distribution::Uniform { low, high } => low.is_finite() && high.is_finite() && low < high,
            Distribution::Normal { mean, std_dev } => {
                mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0
            }
            Distribution::Exponential { rate } => rate.is_finite() && rate > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(PipelineError::Config(format!(
                "invalid distribution parameters: {:?}",
                self
            )))
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match *self {
            Distribution::Uniform { low, high } => rng.gen_range(low..high),
            Distribution::Normal { mean, std_dev } => {
                let z: f64 = rng.sample(StandardNormal);
                mean + std_dev * z
            }
            Distribution::Exponential { rate } => {
                let e: f64 = rng.sample(Exp1);
                e / rate
            }
        }
    }
}

/// Independent draws from one distribution.
#[derive(Debug, Clone)]
pub struct RandomValues {
    dist: Distribution,
    rng: ChaCha8Rng,
}

impl RandomValues {
    pub fn new(dist: Distribution, seed: u64) -> PipelineResult<Self> {
        dist.validate()?;
        Ok(Self {
            dist,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn next_value(&mut self) -> Value {
        self.dist.sample(&mut self.rng)
    }

    /// Move into a closure suitable for a source stage.
    pub fn into_generator(mut self) -> impl FnMut() -> Value + Send {
        move || self.next_value()
    }
}

/// `x += variance * N(0, 1) + mean` per step, starting from 0.
///
/// With a delay set, every step sleeps first, which throttles whatever
/// pipeline the walk feeds.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    position: Value,
    mean: f64,
    variance: f64,
    delay: Option<Duration>,
    rng: ChaCha8Rng,
}

impl RandomWalk {
    pub fn new(mean: f64, variance: f64, seed: u64) -> Self {
        Self {
            position: 0.0,
            mean,
            variance,
            delay: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn position(&self) -> Value {
        self.position
    }

    pub fn step(&mut self) -> Value {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let z: f64 = self.rng.sample(StandardNormal);
        self.position += self.variance * z + self.mean;
        self.position
    }

    pub fn into_generator(mut self) -> impl FnMut() -> Value + Send {
        move || self.step()
    }
}

/// Integers uniform in `[0, max)`, emitted as values.
#[derive(Debug, Clone)]
pub struct UniformInts {
    max: u64,
    rng: ChaCha8Rng,
}

impl UniformInts {
    pub fn new(max: u64, seed: u64) -> PipelineResult<Self> {
        if max == 0 {
            return Err(PipelineError::Config(
                "integer range [0, 0) is empty".to_string(),
            ));
        }
        Ok(Self {
            max,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn next_value(&mut self) -> Value {
        self.rng.gen_range(0..self.max) as Value
    }

    pub fn into_generator(mut self) -> impl FnMut() -> Value + Send {
        move || self.next_value()
    }
}
