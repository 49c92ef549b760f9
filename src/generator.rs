//! Synthetic metric generation for demos and seeding.
//!
//! Produces recognizable value shapes (noise, sine, trend, spikes) and can
//! backfill a store with a generated history so the rollup and query paths
//! have something to chew on without a live producer.

use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;

use crate::error::PipelineResult;
use crate::labels::Labels;
use crate::store::{MetricStore, RawSample};

/// Value shape produced by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Uniform noise around a base value.
    Noise,
    /// Sine wave plus light noise.
    SineWave,
    /// Linear trend plus light noise.
    LinearTrend,
    /// Flat base with occasional spikes.
    Spikes,
}

impl Pattern {
    /// Canonical pattern name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::SineWave => "sine_wave",
            Self::LinearTrend => "linear_trend",
            Self::Spikes => "spikes",
        }
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noise" => Ok(Self::Noise),
            "sine_wave" => Ok(Self::SineWave),
            "linear_trend" => Ok(Self::LinearTrend),
            "spikes" => Ok(Self::Spikes),
            other => Err(format!("unknown pattern: {other}")),
        }
    }
}

/// Synthetic sample generator.
pub struct DataGenerator {
    base: f64,
    rng: rand::rngs::ThreadRng,
}

impl Default for DataGenerator {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl DataGenerator {
    /// Create a generator around the given base level.
    pub fn new(base: f64) -> Self {
        Self { base, rng: rand::thread_rng() }
    }

    /// Uniform noise in `[base - variance, base + variance]`.
    pub fn noise(&mut self, variance: f64) -> f64 {
        self.base + self.rng.gen_range(-variance..=variance)
    }

    /// Sine wave value at elapsed time `t` seconds.
    pub fn sine_wave(&self, t: f64, amplitude: f64, period: f64) -> f64 {
        self.base + amplitude * (2.0 * std::f64::consts::PI * t / period).sin()
    }

    /// Linear trend value at elapsed time `t` seconds.
    pub fn linear_trend(&self, t: f64, slope: f64) -> f64 {
        self.base + slope * t
    }

    /// A spike of `magnitude` with the given probability, 0 otherwise.
    pub fn spike(&mut self, probability: f64, magnitude: f64) -> f64 {
        if self.rng.gen::<f64>() < probability {
            magnitude
        } else {
            0.0
        }
    }

    /// Value at elapsed time `t` for a pattern.
    pub fn value_at(&mut self, t: f64, pattern: Pattern) -> f64 {
        match pattern {
            Pattern::Noise => self.noise(10.0),
            Pattern::SineWave => self.sine_wave(t, 20.0, 600.0) + self.noise(2.0) - self.base,
            Pattern::LinearTrend => self.linear_trend(t, 0.05) + self.noise(2.0) - self.base,
            Pattern::Spikes => self.noise(2.0) + self.spike(0.05, 100.0),
        }
    }
}

/// Backfill a store with a generated history.
///
/// Writes `count` samples ending at `now`, spaced `interval_secs` apart,
/// labeled with the pattern name.
///
/// # Parameters
///
/// - `store` - Store to write into
/// - `metric_name` - Metric to generate
/// - `pattern` - Value shape
/// - `count` - Number of samples
/// - `interval_secs` - Spacing between samples
/// - `now` - Timestamp of the newest sample, unix seconds
///
/// # Returns
///
/// Returns the number of samples written.
pub fn seed_history(
    store: &Arc<dyn MetricStore>,
    metric_name: &str,
    pattern: Pattern,
    count: usize,
    interval_secs: i64,
    now: i64,
) -> PipelineResult<usize> {
    let mut generator = DataGenerator::default();
    let labels = Labels::normalize([("pattern", pattern.as_str()), ("generator", "seed")]);

    let samples: Vec<RawSample> = (0..count)
        .map(|i| {
            let age = (count - 1 - i) as i64 * interval_secs;
            let t = (i as i64 * interval_secs) as f64;
            RawSample::new(metric_name, generator.value_at(t, pattern), now - age, labels.clone())
        })
        .collect();

    store.insert_raw_bulk(samples)
}
