#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Score ledger with discrete deltas and continuous decay.
//!
//! The engine is constructed explicitly and owned by the session; there is no
//! process-wide instance. Decay sources (hostile customers) are counted rather
//! than tracked individually. While any are present each tick folds
//! `sources * rate * dt` into an accumulator, and whole steps are drained from
//! it as a single negative delta so the remainder carries over between ticks.
//! The accumulator counts micro-points times nanoseconds in an integer, so the
//! total penalty for a period does not depend on how it was split into ticks.

use std::{fmt, time::Duration};

use sushi_rush_core::{ConfigError, Rank, RankThresholds};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Accumulator units in one point: micro-points per second times nanoseconds.
const UNITS_PER_POINT: u128 = 1_000_000 * 1_000_000_000;

/// Failure reported by a high-score store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing medium could not be read or written.
    #[error("high score storage unavailable: {0}")]
    Io(#[from] std::io::Error),
    /// The stored value could not be decoded.
    #[error("stored high score is malformed: {0}")]
    Malformed(String),
}

/// Host callback pair used to persist the best score across sessions.
pub trait HighScoreStore: fmt::Debug {
    /// Returns the stored high score.
    fn load(&mut self) -> Result<i64, PersistenceError>;

    /// Persists a new high score.
    fn save(&mut self, high_score: i64) -> Result<(), PersistenceError>;
}

/// Store that keeps the high score in memory only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InMemoryHighScore {
    value: i64,
}

impl InMemoryHighScore {
    /// Creates a store seeded with `value`.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self { value }
    }

    /// Last saved value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }
}

impl HighScoreStore for InMemoryHighScore {
    fn load(&mut self) -> Result<i64, PersistenceError> {
        Ok(self.value)
    }

    fn save(&mut self, high_score: i64) -> Result<(), PersistenceError> {
        self.value = high_score;
        Ok(())
    }
}

/// Decay and ranking parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    decay_rate: f64,
    decay_step: u32,
    thresholds: RankThresholds,
}

impl Config {
    /// Creates a configuration. `decay_rate` is points per second per source and
    /// `decay_step` is the smallest penalty the accumulator releases at once.
    #[must_use]
    pub const fn new(decay_rate: f64, decay_step: u32, thresholds: RankThresholds) -> Self {
        Self {
            decay_rate,
            decay_step,
            thresholds,
        }
    }

    /// Rejects negative or non-finite rates, a zero step, and unordered thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return Err(ConfigError::InvalidDecay(
                "rate must be finite and non-negative",
            ));
        }
        if self.decay_step == 0 {
            return Err(ConfigError::InvalidDecay("step must be greater than zero"));
        }
        self.thresholds.validate()
    }

    /// Points drained per second per decay source.
    #[must_use]
    pub const fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    /// Granularity of decay penalties.
    #[must_use]
    pub const fn decay_step(&self) -> u32 {
        self.decay_step
    }

    /// Rank boundaries.
    #[must_use]
    pub const fn thresholds(&self) -> RankThresholds {
        self.thresholds
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(10.0, 10, RankThresholds::default())
    }
}

/// Accepted score delta reported back for feedback selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreChange {
    /// Delta applied to the score; its sign selects colour and sound.
    pub delta: i64,
    /// Score after applying the delta.
    pub total: i64,
    /// Indicates whether the delta produced a new high score.
    pub new_high_score: bool,
}

/// Score ledger shared by every order controller and decay source in a session.
#[derive(Debug)]
pub struct ScoringEngine {
    config: Config,
    score: i64,
    high_score: i64,
    rate_micros: u64,
    accumulator: u128,
    sources: u32,
    store: Box<dyn HighScoreStore>,
}

impl ScoringEngine {
    /// Creates an engine and loads the persisted high score.
    ///
    /// A store that fails to load is treated as holding zero.
    pub fn new(config: Config, mut store: Box<dyn HighScoreStore>) -> Result<Self, ConfigError> {
        config.validate()?;

        let high_score = store.load().unwrap_or_else(|error| {
            warn!(%error, "falling back to a zero high score");
            0
        });

        // Validated finite and non-negative; the cast saturates on huge rates.
        let rate_micros = (config.decay_rate * 1_000_000.0).round() as u64;

        Ok(Self {
            config,
            score: 0,
            high_score,
            rate_micros,
            accumulator: 0,
            sources: 0,
            store,
        })
    }

    /// Applies `delta`, persisting the high score immediately when it is beaten.
    pub fn add_score(&mut self, delta: i64) -> ScoreChange {
        self.score = self.score.saturating_add(delta);

        let new_high_score = self.score > self.high_score;
        if new_high_score {
            self.high_score = self.score;
            if let Err(error) = self.store.save(self.high_score) {
                warn!(%error, high_score = self.high_score, "failed to persist high score");
            }
            info!(high_score = self.high_score, "new high score");
        }

        ScoreChange {
            delta,
            total: self.score,
            new_high_score,
        }
    }

    /// Counts a new decay source.
    pub fn register_decay_source(&mut self) {
        self.sources = self.sources.saturating_add(1);
    }

    /// Removes a decay source. Returns `false` when none were registered.
    pub fn unregister_decay_source(&mut self) -> bool {
        if self.sources == 0 {
            debug!("decay source unregistered without a matching registration");
            return false;
        }
        self.sources -= 1;
        true
    }

    /// Number of decay sources currently present.
    #[must_use]
    pub const fn decay_sources(&self) -> u32 {
        self.sources
    }

    /// Integrates decay over `dt` and releases whole steps as one negative delta.
    pub fn tick(&mut self, dt: Duration) -> Option<ScoreChange> {
        if self.sources == 0 {
            return None;
        }

        let gained = u128::from(self.sources)
            .saturating_mul(u128::from(self.rate_micros))
            .saturating_mul(dt.as_nanos());
        self.accumulator = self.accumulator.saturating_add(gained);

        let step = u128::from(self.config.decay_step) * UNITS_PER_POINT;
        if self.accumulator < step {
            return None;
        }

        let steps = self.accumulator / step;
        self.accumulator %= step;
        let penalty = steps.saturating_mul(u128::from(self.config.decay_step));
        Some(self.add_score(-i64::try_from(penalty).unwrap_or(i64::MAX)))
    }

    /// Decay points carried over to the next tick, always below one step.
    #[must_use]
    pub fn accumulator(&self) -> f64 {
        self.accumulator as f64 / UNITS_PER_POINT as f64
    }

    /// Current session score. May be negative.
    #[must_use]
    pub const fn current_score(&self) -> i64 {
        self.score
    }

    /// Best score seen across sessions.
    #[must_use]
    pub const fn high_score(&self) -> i64 {
        self.high_score
    }

    /// Rank for an arbitrary score.
    #[must_use]
    pub fn rank(&self, score: i64) -> Rank {
        self.config.thresholds.classify(score)
    }

    /// Clears the score, the accumulator and the decay sources; keeps the high score.
    pub fn reset(&mut self) {
        self.score = 0;
        self.accumulator = 0;
        self.sources = 0;
    }
}
