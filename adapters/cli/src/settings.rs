//! TOML session settings.
//!
//! Every field is optional; anything left out keeps the built-in default.
//! Durations are written in seconds.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use sushi_rush_core::{Catalog, RankThresholds, ServePoint};
use sushi_rush_session::SessionConfig;
use sushi_rush_system_orders::Config as OrderConfig;
use sushi_rush_system_replay::{Config as ReplayConfig, HighlightCadence};
use sushi_rush_system_scoring::Config as ScoringConfig;
use sushi_rush_system_spawning::{Config as SpawnConfig, HostileCadence};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    seed: Option<u64>,
    duration_secs: Option<f64>,
    seats: Option<u32>,
    catalog: Option<Catalog>,
    orders: OrderSettings,
    scoring: ScoringSettings,
    replay: ReplaySettings,
    spawning: SpawnSettings,
    hostiles: HostileSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OrderSettings {
    limit_secs: Option<f64>,
    cooldown_secs: Option<f64>,
    penalty: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScoringSettings {
    decay_rate: Option<f64>,
    decay_step: Option<u32>,
    ranks: Option<RankThresholds>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReplaySettings {
    capacity: Option<usize>,
    interval_secs: Option<f64>,
    highlights: Option<bool>,
    clip_secs: Option<f64>,
    gap_secs: Option<f64>,
    max_clips: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SpawnSettings {
    first_interval_secs: Option<f64>,
    interval_secs: Option<f64>,
    min_interval_secs: Option<f64>,
    ramp_period_secs: Option<f64>,
    ramp_step_secs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HostileSettings {
    enabled: Option<bool>,
    first_delay_secs: Option<f64>,
    interval_secs: Option<f64>,
    max_present: Option<usize>,
}

impl Settings {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid settings toml")
    }

    /// Overlays the file onto the defaults. Validation happens when the session starts.
    pub(crate) fn into_config(self) -> Result<SessionConfig> {
        let defaults = SessionConfig::default();

        let orders = OrderConfig::new(
            seconds(self.orders.limit_secs, defaults.orders.limit(), "orders.limit_secs")?,
            seconds(
                self.orders.cooldown_secs,
                defaults.orders.cooldown(),
                "orders.cooldown_secs",
            )?,
            self.orders.penalty.unwrap_or(defaults.orders.penalty()),
        );

        let scoring = ScoringConfig::new(
            self.scoring
                .decay_rate
                .unwrap_or(defaults.scoring.decay_rate()),
            self.scoring
                .decay_step
                .unwrap_or(defaults.scoring.decay_step()),
            self.scoring
                .ranks
                .unwrap_or(defaults.scoring.thresholds()),
        );

        let mut replay = ReplayConfig::new(
            self.replay.capacity.unwrap_or(defaults.replay.capacity()),
            seconds(
                self.replay.interval_secs,
                defaults.replay.interval(),
                "replay.interval_secs",
            )?,
        );
        if self.replay.highlights.unwrap_or(true) {
            let cadence = defaults.replay.highlights().unwrap_or_default();
            replay = replay.with_highlights(HighlightCadence::new(
                seconds(
                    self.replay.clip_secs,
                    cadence.clip_length(),
                    "replay.clip_secs",
                )?,
                seconds(self.replay.gap_secs, cadence.gap(), "replay.gap_secs")?,
                self.replay.max_clips.unwrap_or(cadence.max_clips()),
            ));
        }

        let spawn_defaults = defaults.spawning;
        let mut spawning = SpawnConfig::new(
            seconds(
                self.spawning.first_interval_secs,
                spawn_defaults.first_interval(),
                "spawning.first_interval_secs",
            )?,
            seconds(
                self.spawning.interval_secs,
                spawn_defaults.interval(),
                "spawning.interval_secs",
            )?,
        )
        .with_ramp(
            seconds(
                self.spawning.min_interval_secs,
                spawn_defaults.min_interval(),
                "spawning.min_interval_secs",
            )?,
            seconds(
                self.spawning.ramp_period_secs,
                spawn_defaults.ramp_period(),
                "spawning.ramp_period_secs",
            )?,
            seconds(
                self.spawning.ramp_step_secs,
                spawn_defaults.ramp_step(),
                "spawning.ramp_step_secs",
            )?,
        );

        if self.hostiles.enabled.unwrap_or(true) {
            let cadence = spawn_defaults.hostiles().unwrap_or_default();
            spawning = spawning.with_hostiles(HostileCadence::new(
                seconds(
                    self.hostiles.first_delay_secs,
                    cadence.first_delay(),
                    "hostiles.first_delay_secs",
                )?,
                seconds(
                    self.hostiles.interval_secs,
                    cadence.interval(),
                    "hostiles.interval_secs",
                )?,
                self.hostiles.max_present.unwrap_or(cadence.max_present()),
            ));
        }

        let seats = match self.seats {
            Some(count) => (0..u64::from(count)).map(ServePoint::new).collect(),
            None => defaults.seats,
        };

        Ok(SessionConfig {
            catalog: self.catalog.unwrap_or(defaults.catalog),
            seats,
            orders,
            scoring,
            replay,
            spawning,
            duration: seconds(self.duration_secs, defaults.duration, "duration_secs")?,
            seed: self.seed.unwrap_or(defaults.seed),
        })
    }
}

/// Converts an optional seconds value, falling back to `default`.
pub(crate) fn seconds(value: Option<f64>, default: Duration, field: &str) -> Result<Duration> {
    match value {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("`{field}` must be a non-negative number of seconds")),
        None => Ok(default),
    }
}
