use std::time::Duration;

use sushi_rush_core::{Catalog, ConfigError, ServePoint};
use sushi_rush_system_orders::Config as OrderConfig;
use sushi_rush_system_replay::Config as ReplayConfig;
use sushi_rush_system_scoring::Config as ScoringConfig;
use sushi_rush_system_spawning::Config as SpawnConfig;

const DEFAULT_SEAT_COUNT: u64 = 6;
const DEFAULT_DURATION: Duration = Duration::from_secs(120);
const DEFAULT_SEED: u64 = 0x5eed_c0de_2a11_0001;

/// Every tunable needed to start a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Items customers may order.
    pub catalog: Catalog,
    /// One serve point per seat, in seat id order.
    pub seats: Vec<ServePoint>,
    /// Order timing and penalty.
    pub orders: OrderConfig,
    /// Decay and rank thresholds.
    pub scoring: ScoringConfig,
    /// Digest capture cadence and retention.
    pub replay: ReplayConfig,
    /// Customer and hostile cadences.
    pub spawning: SpawnConfig,
    /// Length of a round.
    pub duration: Duration,
    /// Seed mixed into every customer's order draws.
    pub seed: u64,
}

impl SessionConfig {
    /// Checks every section; the first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seats.is_empty() {
            return Err(ConfigError::NoSeats);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration("session duration"));
        }
        self.orders.validate()?;
        self.scoring.validate()?;
        self.replay.validate()?;
        self.spawning.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            catalog: Catalog::default(),
            seats: (0..DEFAULT_SEAT_COUNT).map(ServePoint::new).collect(),
            orders: OrderConfig::default(),
            scoring: ScoringConfig::default(),
            replay: ReplayConfig::default(),
            spawning: SpawnConfig::default(),
            duration: DEFAULT_DURATION,
            seed: DEFAULT_SEED,
        }
    }
}
