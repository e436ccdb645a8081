#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system that admits customers and hostiles.
//!
//! Regular customers arrive on an accelerating cadence and need a free seat;
//! when the counter is full the due spawn is dropped rather than queued.
//! Hostile customers follow an independent timer and are capped by the
//! number already present.

use std::time::Duration;

use sushi_rush_core::{ConfigError, CustomerId, HostileId};
use sushi_rush_system_seating::{Seat, SeatRegistry};
use tracing::{debug, info};

/// Cadence for hostile customers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostileCadence {
    first_delay: Duration,
    interval: Duration,
    max_present: usize,
}

impl HostileCadence {
    /// Creates a cadence whose first hostile appears after `first_delay`, then every
    /// `interval`, while fewer than `max_present` are around.
    #[must_use]
    pub const fn new(first_delay: Duration, interval: Duration, max_present: usize) -> Self {
        Self {
            first_delay,
            interval,
            max_present,
        }
    }

    /// Delay before the first hostile.
    #[must_use]
    pub const fn first_delay(&self) -> Duration {
        self.first_delay
    }

    /// Steady-state delay between hostiles.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum number of hostiles present at once.
    #[must_use]
    pub const fn max_present(&self) -> usize {
        self.max_present
    }
}

impl Default for HostileCadence {
    fn default() -> Self {
        Self::new(Duration::from_secs(25), Duration::from_secs(25), 3)
    }
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    first_interval: Duration,
    interval: Duration,
    min_interval: Duration,
    ramp_period: Duration,
    ramp_step: Duration,
    hostiles: Option<HostileCadence>,
}

impl Config {
    /// Creates a fixed-cadence configuration without hostiles.
    ///
    /// The first customer arrives after `first_interval`, later ones every `interval`.
    #[must_use]
    pub const fn new(first_interval: Duration, interval: Duration) -> Self {
        Self {
            first_interval,
            interval,
            min_interval: interval,
            ramp_period: interval,
            ramp_step: Duration::ZERO,
            hostiles: None,
        }
    }

    /// Shortens the interval by `step` every `period` until it reaches `min_interval`.
    #[must_use]
    pub const fn with_ramp(
        mut self,
        min_interval: Duration,
        period: Duration,
        step: Duration,
    ) -> Self {
        self.min_interval = min_interval;
        self.ramp_period = period;
        self.ramp_step = step;
        self
    }

    /// Enables hostile spawns.
    #[must_use]
    pub const fn with_hostiles(mut self, cadence: HostileCadence) -> Self {
        self.hostiles = Some(cadence);
        self
    }

    /// Rejects cadences that would fire every tick forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroDuration("customer spawn interval"));
        }
        if self.min_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("minimum customer spawn interval"));
        }
        if self.ramp_period.is_zero() {
            return Err(ConfigError::ZeroDuration("difficulty ramp period"));
        }
        if let Some(hostiles) = self.hostiles {
            if hostiles.interval.is_zero() {
                return Err(ConfigError::ZeroDuration("hostile spawn interval"));
            }
        }
        Ok(())
    }

    /// Delay before the first customer.
    #[must_use]
    pub const fn first_interval(&self) -> Duration {
        self.first_interval
    }

    /// Starting steady-state interval between customers.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Floor of the difficulty ramp.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time between two interval reductions.
    #[must_use]
    pub const fn ramp_period(&self) -> Duration {
        self.ramp_period
    }

    /// Amount removed from the interval at each reduction.
    #[must_use]
    pub const fn ramp_step(&self) -> Duration {
        self.ramp_step
    }

    /// Hostile cadence, when enabled.
    #[must_use]
    pub const fn hostiles(&self) -> Option<HostileCadence> {
        self.hostiles
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::from_secs(20))
            .with_ramp(
                Duration::from_secs(5),
                Duration::from_secs(20),
                Duration::from_secs(1),
            )
            .with_hostiles(HostileCadence::default())
    }
}

/// Admission decided during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spawn {
    /// A customer was admitted and its seat reserved.
    Customer {
        /// Identifier minted for the customer.
        customer: CustomerId,
        /// Seat reserved for the customer.
        seat: Seat,
    },
    /// A customer spawn came due while every seat was taken.
    Skipped,
    /// A hostile customer arrived.
    Hostile {
        /// Identifier minted for the hostile.
        hostile: HostileId,
    },
    /// The customer cadence accelerated.
    IntervalChanged {
        /// New interval between customers.
        interval: Duration,
    },
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    elapsed: Duration,
    fired: bool,
}

impl Timer {
    const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            fired: false,
        }
    }

    /// Fires at most once per call; surplus time wraps modulo `interval`.
    fn advance(&mut self, dt: Duration, first: Duration, interval: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        let threshold = if self.fired { interval } else { first };
        if self.elapsed < threshold {
            return false;
        }

        let surplus = (self.elapsed - threshold).as_nanos() % interval.as_nanos().max(1);
        self.elapsed = Duration::from_nanos(u64::try_from(surplus).unwrap_or(0));
        self.fired = true;
        true
    }
}

/// Pure system that decides when customers and hostiles arrive.
#[derive(Debug)]
pub struct SpawnCoordinator {
    config: Config,
    interval: Duration,
    customers: Timer,
    ramp: Duration,
    hostiles: Timer,
    next_customer: u32,
    next_hostile: u32,
}

impl SpawnCoordinator {
    /// Creates a new spawning system using the supplied configuration.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            interval: config.interval,
            customers: Timer::new(),
            ramp: Duration::ZERO,
            hostiles: Timer::new(),
            next_customer: 0,
            next_hostile: 0,
        })
    }

    /// Current interval between customers.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Advances the spawn timers and reserves seats for admitted customers.
    pub fn tick(
        &mut self,
        dt: Duration,
        seats: &mut SeatRegistry,
        hostiles_present: usize,
        out: &mut Vec<Spawn>,
    ) {
        if self
            .customers
            .advance(dt, self.config.first_interval, self.interval)
        {
            self.admit_customer(seats, out);
        }

        self.advance_ramp(dt, out);

        if let Some(cadence) = self.config.hostiles {
            if self
                .hostiles
                .advance(dt, cadence.first_delay, cadence.interval)
            {
                if hostiles_present < cadence.max_present {
                    let hostile = HostileId::new(self.next_hostile);
                    self.next_hostile = self.next_hostile.wrapping_add(1);
                    out.push(Spawn::Hostile { hostile });
                } else {
                    debug!(hostiles_present, "hostile spawn skipped at cap");
                }
            }
        }
    }

    /// Restores the initial cadence and timers. Identifiers keep counting so
    /// they never repeat within a process.
    pub fn reset(&mut self) {
        self.interval = self.config.interval;
        self.customers = Timer::new();
        self.hostiles = Timer::new();
        self.ramp = Duration::ZERO;
    }

    fn admit_customer(&mut self, seats: &mut SeatRegistry, out: &mut Vec<Spawn>) {
        let customer = CustomerId::new(self.next_customer);
        match seats.allocate(customer) {
            Some(seat) => {
                self.next_customer = self.next_customer.wrapping_add(1);
                out.push(Spawn::Customer { customer, seat });
            }
            None => {
                debug!("customer spawn skipped without a free seat");
                out.push(Spawn::Skipped);
            }
        }
    }

    fn advance_ramp(&mut self, dt: Duration, out: &mut Vec<Spawn>) {
        if self.config.ramp_step.is_zero() || self.interval <= self.config.min_interval {
            return;
        }

        self.ramp = self.ramp.saturating_add(dt);
        while self.ramp >= self.config.ramp_period {
            self.ramp -= self.config.ramp_period;
            let next = self
                .interval
                .saturating_sub(self.config.ramp_step)
                .max(self.config.min_interval);
            if next != self.interval {
                self.interval = next;
                info!(
                    interval_secs = next.as_secs_f32(),
                    "customer spawn interval shortened"
                );
                out.push(Spawn::IntervalChanged { interval: next });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_once_for_large_dt() {
        let mut timer = Timer::new();
        let interval = Duration::from_secs(2);
        assert!(timer.advance(Duration::from_secs(7), Duration::from_secs(1), interval));
        assert_eq!(timer.elapsed, Duration::ZERO);
        assert!(!timer.advance(Duration::from_millis(1_500), Duration::ZERO, interval));
    }

    #[test]
    fn zero_first_interval_fires_on_first_tick() {
        let mut timer = Timer::new();
        assert!(timer.advance(Duration::ZERO, Duration::ZERO, Duration::from_secs(20)));
        assert!(!timer.advance(Duration::ZERO, Duration::ZERO, Duration::from_secs(20)));
    }

    #[test]
    fn zero_ramp_period_is_rejected() {
        let config = Config::new(Duration::ZERO, Duration::from_secs(3)).with_ramp(
            Duration::from_secs(1),
            Duration::ZERO,
            Duration::from_secs(1),
        );
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("difficulty ramp period"))
        );
    }
}
