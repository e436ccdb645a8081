#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-customer order state machine.
//!
//! A controller starts `Idle` once its customer sits down, shows an order
//! (`Active`) drawn uniformly from the catalog, counts it down each tick, and
//! resolves it on a serve or on expiry. Resolution is instantaneous: the
//! controller hands back a [`Resolution`] carrying the score delta and moves
//! straight into `Cooldown`, after which the next order is drawn. Waiting is
//! expressed as accumulated tick time, never as a suspended task.

use std::{mem, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sushi_rush_core::{Catalog, ConfigError, MenuItem, OrderPhase, Outcome, ServeRejection};
use tracing::debug;

/// Configuration parameters shared by every order controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    limit: Duration,
    cooldown: Duration,
    penalty: i64,
}

impl Config {
    /// Creates a configuration from the per-order time limit, the delay before the next
    /// order, and the points deducted for a wrong serve or a timeout.
    #[must_use]
    pub const fn new(limit: Duration, cooldown: Duration, penalty: i64) -> Self {
        Self {
            limit,
            cooldown,
            penalty,
        }
    }

    /// Rejects a zero time limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit.is_zero() {
            return Err(ConfigError::ZeroDuration("order time limit"));
        }
        Ok(())
    }

    /// Time allotted to each order.
    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// Delay between a resolution and the next order.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Points deducted for a wrong serve or a timeout.
    #[must_use]
    pub const fn penalty(&self) -> i64 {
        self.penalty
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(1), 1)
    }
}

/// Order currently shown above a customer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    item: MenuItem,
    limit: Duration,
    remaining: Duration,
    started_at: Duration,
}

impl Order {
    /// Requested catalog item.
    #[must_use]
    pub fn item(&self) -> &MenuItem {
        &self.item
    }

    /// Time allotted to the order.
    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// Time left before the order expires.
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Seat-local time at which the order was placed.
    #[must_use]
    pub const fn started_at(&self) -> Duration {
        self.started_at
    }

    /// Remaining time rounded up to whole seconds, as shown on the HUD.
    #[must_use]
    pub fn remaining_whole_seconds(&self) -> u64 {
        let seconds = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            seconds + 1
        } else {
            seconds
        }
    }
}

/// Result of resolving an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    item: String,
    outcome: Outcome,
    delta: i64,
    service_time: Duration,
}

impl Resolution {
    /// Item the customer had requested.
    #[must_use]
    pub fn item(&self) -> &str {
        &self.item
    }

    /// How the order ended.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Score delta to dispatch for the outcome.
    #[must_use]
    pub const fn delta(&self) -> i64 {
        self.delta
    }

    /// Time between placement and resolution.
    #[must_use]
    pub const fn service_time(&self) -> Duration {
        self.service_time
    }
}

/// Observable change produced by a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// A new order was drawn after the cooldown.
    Placed(Order),
    /// The active order expired.
    Resolved(Resolution),
}

#[derive(Clone, Debug)]
enum State {
    Idle,
    Active(Order),
    Cooldown { elapsed: Duration },
}

/// Order state machine owned by a single seated customer.
#[derive(Clone, Debug)]
pub struct OrderController {
    config: Config,
    state: State,
    rng: ChaCha8Rng,
    clock: Duration,
}

impl OrderController {
    /// Creates an idle controller whose item draws are seeded by `seed`.
    #[must_use]
    pub fn new(config: Config, seed: u64) -> Self {
        Self {
            config,
            state: State::Idle,
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: Duration::ZERO,
        }
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> OrderPhase {
        match self.state {
            State::Idle => OrderPhase::Idle,
            State::Active(_) => OrderPhase::Active,
            State::Cooldown { .. } => OrderPhase::Cooldown,
        }
    }

    /// Active order, if one is displayed.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        match &self.state {
            State::Active(order) => Some(order),
            State::Idle | State::Cooldown { .. } => None,
        }
    }

    /// Draws the first order. Only valid while idle; otherwise returns `None`.
    pub fn activate(&mut self, catalog: &Catalog) -> Option<Order> {
        if !matches!(self.state, State::Idle) {
            debug!(phase = ?self.phase(), "activate ignored outside idle phase");
            return None;
        }
        self.place(catalog)
    }

    /// Advances the countdown or the cooldown by `dt`.
    pub fn tick(&mut self, dt: Duration, catalog: &Catalog) -> Option<Transition> {
        self.clock = self.clock.saturating_add(dt);

        match mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            State::Active(mut order) => {
                order.remaining = order.remaining.saturating_sub(dt);
                if order.remaining.is_zero() {
                    Some(Transition::Resolved(self.resolve(order, Outcome::Timeout)))
                } else {
                    self.state = State::Active(order);
                    None
                }
            }
            State::Cooldown { elapsed } => {
                let elapsed = elapsed.saturating_add(dt);
                if elapsed >= self.config.cooldown {
                    self.place(catalog).map(Transition::Placed)
                } else {
                    self.state = State::Cooldown { elapsed };
                    None
                }
            }
        }
    }

    /// Resolves the active order against `item` using an exact, case-sensitive match.
    ///
    /// Serves outside the active phase are ignored and reported as rejections.
    pub fn serve(&mut self, item: &str) -> Result<Resolution, ServeRejection> {
        if item.is_empty() {
            debug!("serve ignored without an item");
            return Err(ServeRejection::EmptyItem);
        }

        match mem::replace(&mut self.state, State::Idle) {
            State::Active(order) => {
                let outcome = if order.item.name() == item {
                    Outcome::Correct
                } else {
                    Outcome::Wrong
                };
                Ok(self.resolve(order, outcome))
            }
            other => {
                self.state = other;
                debug!(phase = ?self.phase(), item, "serve ignored without an active order");
                Err(ServeRejection::NoActiveOrder)
            }
        }
    }

    fn place(&mut self, catalog: &Catalog) -> Option<Order> {
        let index = self.rng.gen_range(0..catalog.len());
        let item = catalog.get(index)?.clone();
        let order = Order {
            item,
            limit: self.config.limit,
            remaining: self.config.limit,
            started_at: self.clock,
        };
        self.state = State::Active(order.clone());
        Some(order)
    }

    fn resolve(&mut self, order: Order, outcome: Outcome) -> Resolution {
        self.state = State::Cooldown {
            elapsed: Duration::ZERO,
        };

        let delta = match outcome {
            Outcome::Correct => order.item.points(),
            Outcome::Wrong | Outcome::Timeout => -self.config.penalty,
        };

        Resolution {
            item: order.item.name().to_owned(),
            outcome,
            delta,
            service_time: order.limit.saturating_sub(order.remaining),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_item_catalog() -> Catalog {
        Catalog::new(vec![MenuItem::new("Tamago", 80)]).expect("catalog")
    }

    #[test]
    fn zero_limit_is_rejected() {
        let config = Config::new(Duration::ZERO, Duration::from_secs(1), 1);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("order time limit"))
        );
    }

    #[test]
    fn tick_is_inert_while_idle() {
        let catalog = single_item_catalog();
        let mut controller = OrderController::new(Config::default(), 7);
        assert!(controller.tick(Duration::from_secs(30), &catalog).is_none());
        assert_eq!(controller.phase(), OrderPhase::Idle);
    }

    #[test]
    fn activate_only_fires_once() {
        let catalog = single_item_catalog();
        let mut controller = OrderController::new(Config::default(), 7);
        assert!(controller.activate(&catalog).is_some());
        assert!(controller.activate(&catalog).is_none());
        assert_eq!(controller.phase(), OrderPhase::Active);
    }

    #[test]
    fn correct_serve_awards_item_points_and_service_time() {
        let catalog = single_item_catalog();
        let mut controller = OrderController::new(Config::default(), 1);
        let _ = controller.activate(&catalog);
        let _ = controller.tick(Duration::from_secs(4), &catalog);

        let resolution = controller.serve("Tamago").expect("active order");
        assert_eq!(resolution.outcome(), Outcome::Correct);
        assert_eq!(resolution.delta(), 80);
        assert_eq!(resolution.service_time(), Duration::from_secs(4));
    }

    #[test]
    fn remaining_whole_seconds_rounds_up() {
        let catalog = single_item_catalog();
        let mut controller = OrderController::new(Config::default(), 1);
        let _ = controller.activate(&catalog);
        let _ = controller.tick(Duration::from_millis(14_100), &catalog);
        let order = controller.order().expect("active");
        assert_eq!(order.remaining_whole_seconds(), 1);
    }

    #[test]
    fn empty_serve_is_rejected_without_resolving() {
        let catalog = single_item_catalog();
        let mut controller = OrderController::new(Config::default(), 1);
        let _ = controller.activate(&catalog);
        assert_eq!(controller.serve(""), Err(ServeRejection::EmptyItem));
        assert_eq!(controller.phase(), OrderPhase::Active);
    }
}
