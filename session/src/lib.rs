#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for Sushi Rush.
//!
//! A [`Session`] owns every system for one round and advances them in a fixed
//! order on each tick: spawning, order controllers, score decay, replay
//! capture, and finally the deadline check. Hosts mutate it only through
//! [`apply`] and read it through [`query`].

mod clock;
mod config;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    time::Duration,
};

use sushi_rush_core::{
    Command, ConfigError, CustomerId, CustomerState, DepartureReason, Event, HostileId, Outcome,
    SeatId, ServePoint, ServeRejection, SessionStats, WELCOME_BANNER,
};
use sushi_rush_system_orders::{OrderController, Resolution, Transition};
use sushi_rush_system_replay::{FrameSource, ReplayBuffer};
use sushi_rush_system_scoring::{HighScoreStore, ScoreChange, ScoringEngine};
use sushi_rush_system_seating::SeatRegistry;
use sushi_rush_system_spawning::{Spawn, SpawnCoordinator};
use tracing::{debug, error, info};

pub use clock::SessionClock;
pub use config::SessionConfig;

const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug)]
struct Customer {
    id: CustomerId,
    seat: SeatId,
    serve_point: ServePoint,
    state: CustomerState,
    controller: Option<OrderController>,
}

/// One round of service: seats, customers, hostiles, score and digest.
pub struct Session<C: FrameSource> {
    banner: &'static str,
    config: SessionConfig,
    clock: SessionClock,
    seats: SeatRegistry,
    spawning: SpawnCoordinator,
    scoring: ScoringEngine,
    replay: ReplayBuffer<C::Frame>,
    capture: C,
    customers: BTreeMap<CustomerId, Customer>,
    hostiles: BTreeSet<HostileId>,
    stats: SessionStats,
}

impl<C: FrameSource> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("clock", &self.clock)
            .field("seats", &self.seats)
            .field("customers", &self.customers)
            .field("hostiles", &self.hostiles)
            .field("score", &self.scoring.current_score())
            .field("stats", &self.stats)
            .field("replay_frames", &self.replay.len())
            .finish_non_exhaustive()
    }
}

impl<C: FrameSource> Session<C> {
    /// Validates `config` and builds every system. Replay capture starts immediately.
    pub fn new(
        config: SessionConfig,
        capture: C,
        store: Box<dyn HighScoreStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let seats = SeatRegistry::new(config.seats.iter().copied())?;
        let spawning = SpawnCoordinator::new(config.spawning)?;
        let scoring = ScoringEngine::new(config.scoring, store)?;
        let mut replay = ReplayBuffer::new(config.replay)?;
        replay.start();

        info!(
            seats = seats.len(),
            duration_secs = config.duration.as_secs(),
            high_score = scoring.high_score(),
            banner = WELCOME_BANNER,
            "session created"
        );

        Ok(Self {
            banner: WELCOME_BANNER,
            clock: SessionClock::new(config.duration),
            config,
            seats,
            spawning,
            scoring,
            replay,
            capture,
            customers: BTreeMap::new(),
            hostiles: BTreeSet::new(),
            stats: SessionStats::default(),
        })
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.clock.is_finished() {
            debug!("tick ignored after session end");
            return;
        }

        let dt = self.clock.advance(dt);
        out_events.push(Event::TimeAdvanced { dt });

        self.customers
            .retain(|_, customer| customer.state != CustomerState::Leaving);

        self.spawn(dt, out_events);
        self.tick_orders(dt, out_events);
        self.decay(dt, out_events);
        let _ = self.replay.tick(dt, &mut self.capture);

        if self.clock.is_finished() {
            self.end(out_events);
        }

        let audit = query::audit(self);
        if let Err(violation) = &audit {
            error!(%violation, "session invariant violated");
            out_events.push(Event::InvariantViolated {
                violation: violation.clone(),
            });
        }
        debug_assert!(audit.is_ok(), "session invariant violated: {audit:?}");
    }

    fn spawn(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut spawns = Vec::new();
        self.spawning
            .tick(dt, &mut self.seats, self.hostiles.len(), &mut spawns);

        for spawn in spawns {
            match spawn {
                Spawn::Customer { customer, seat } => {
                    let _ = self.customers.insert(
                        customer,
                        Customer {
                            id: customer,
                            seat: seat.id(),
                            serve_point: seat.serve_point(),
                            state: CustomerState::Approaching,
                            controller: None,
                        },
                    );
                    debug!(%customer, seat = %seat.id(), "customer admitted");
                    out_events.push(Event::CustomerAdmitted {
                        customer,
                        seat: seat.id(),
                        serve_point: seat.serve_point(),
                    });
                }
                Spawn::Skipped => out_events.push(Event::SpawnSkipped),
                Spawn::Hostile { hostile } => {
                    if self.hostiles.insert(hostile) {
                        self.scoring.register_decay_source();
                        info!(%hostile, "hostile customer arrived");
                        out_events.push(Event::HostileArrived { hostile });
                    }
                }
                Spawn::IntervalChanged { interval } => {
                    out_events.push(Event::SpawnIntervalChanged { interval });
                }
            }
        }
    }

    fn tick_orders(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut resolutions = Vec::new();

        for customer in self.customers.values_mut() {
            let Some(controller) = customer.controller.as_mut() else {
                continue;
            };
            match controller.tick(dt, &self.config.catalog) {
                Some(Transition::Placed(order)) => out_events.push(Event::OrderPlaced {
                    customer: customer.id,
                    seat: customer.seat,
                    item: order.item().name().to_owned(),
                    limit: order.limit(),
                }),
                Some(Transition::Resolved(resolution)) => {
                    resolutions.push((customer.id, customer.seat, resolution));
                }
                None => {}
            }
        }

        for (customer, seat, resolution) in resolutions {
            self.settle(customer, seat, resolution, out_events);
        }
    }

    fn decay(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.scoring.decay_sources() > 0 {
            self.stats.decay_active_time = self.stats.decay_active_time.saturating_add(dt);
        }
        if let Some(change) = self.scoring.tick(dt) {
            push_score(change, out_events);
        }
    }

    fn settle(
        &mut self,
        customer: CustomerId,
        seat: SeatId,
        resolution: Resolution,
        out_events: &mut Vec<Event>,
    ) {
        self.stats
            .record(resolution.outcome(), resolution.service_time());
        if resolution.outcome() != Outcome::Correct {
            debug!(%customer, outcome = ?resolution.outcome(), "order failed");
        }

        out_events.push(Event::OrderResolved {
            customer,
            seat,
            item: resolution.item().to_owned(),
            outcome: resolution.outcome(),
            delta: resolution.delta(),
        });
        push_score(self.scoring.add_score(resolution.delta()), out_events);
    }

    fn seat_customer(&mut self, id: CustomerId, out_events: &mut Vec<Event>) {
        if self.clock.is_finished() {
            debug!(customer = %id, "seating ignored after session end");
            return;
        }

        let seed = self.config.seed ^ u64::from(id.get()).wrapping_mul(SEED_MIX);
        let Some(customer) = self.customers.get_mut(&id) else {
            debug!(customer = %id, "seating ignored for unknown customer");
            return;
        };
        if customer.state != CustomerState::Approaching {
            debug!(customer = %id, state = ?customer.state, "seating ignored");
            return;
        }

        customer.state = CustomerState::Seated;
        out_events.push(Event::CustomerSeated {
            customer: id,
            seat: customer.seat,
        });

        let mut controller = OrderController::new(self.config.orders, seed);
        if let Some(order) = controller.activate(&self.config.catalog) {
            out_events.push(Event::OrderPlaced {
                customer: id,
                seat: customer.seat,
                item: order.item().name().to_owned(),
                limit: order.limit(),
            });
        }
        customer.controller = Some(controller);
    }

    fn serve(&mut self, seat: SeatId, item: &str, out_events: &mut Vec<Event>) {
        match self.route_serve(seat, item) {
            Ok((customer, resolution)) => self.settle(customer, seat, resolution, out_events),
            Err(reason) => {
                debug!(%seat, item, ?reason, "serve ignored");
                out_events.push(Event::ServeIgnored { seat, reason });
            }
        }
    }

    fn route_serve(
        &mut self,
        seat: SeatId,
        item: &str,
    ) -> Result<(CustomerId, Resolution), ServeRejection> {
        if self.clock.is_finished() {
            return Err(ServeRejection::SessionOver);
        }

        let record = self.seats.seat(seat).ok_or(ServeRejection::UnknownSeat)?;
        let occupant = record.occupant().ok_or(ServeRejection::VacantSeat)?;
        let customer = self
            .customers
            .get_mut(&occupant)
            .ok_or(ServeRejection::VacantSeat)?;

        match customer.controller.as_mut() {
            Some(controller) => Ok((occupant, controller.serve(item)?)),
            None => Err(ServeRejection::CustomerApproaching),
        }
    }

    fn dismiss(&mut self, id: CustomerId, reason: DepartureReason, out_events: &mut Vec<Event>) {
        let Some(customer) = self.customers.get_mut(&id) else {
            debug!(customer = %id, "dismiss ignored for unknown customer");
            return;
        };
        if customer.state == CustomerState::Leaving {
            debug!(customer = %id, "dismiss ignored for leaving customer");
            return;
        }

        customer.state = CustomerState::Leaving;
        customer.controller = None;
        let _ = self.seats.release(customer.seat);
        debug!(customer = %id, seat = %customer.seat, ?reason, "customer left");
        out_events.push(Event::CustomerLeft {
            customer: id,
            seat: customer.seat,
            reason,
        });
    }

    fn remove_hostile(
        &mut self,
        hostile: HostileId,
        reason: DepartureReason,
        out_events: &mut Vec<Event>,
    ) {
        if !self.hostiles.remove(&hostile) {
            debug!(%hostile, "removal ignored for unknown hostile");
            return;
        }

        let _ = self.scoring.unregister_decay_source();
        info!(%hostile, ?reason, "hostile customer left");
        out_events.push(Event::HostileLeft { hostile, reason });
    }

    fn end(&mut self, out_events: &mut Vec<Event>) {
        self.replay.stop();

        let customers: Vec<CustomerId> = self.customers.keys().copied().collect();
        for customer in customers {
            self.dismiss(customer, DepartureReason::SessionEnded, out_events);
        }
        let hostiles: Vec<HostileId> = self.hostiles.iter().copied().collect();
        for hostile in hostiles {
            self.remove_hostile(hostile, DepartureReason::SessionEnded, out_events);
        }

        let summary = query::summary(self);
        info!(
            score = summary.score,
            high_score = summary.high_score,
            rank = %summary.rank,
            served = summary.served,
            "session ended"
        );
        out_events.push(Event::SessionEnded { summary });
    }

    fn restart(&mut self, out_events: &mut Vec<Event>) {
        self.scoring.reset();
        self.replay.clear();
        self.replay.start();
        self.seats.release_all();
        self.customers.clear();
        self.hostiles.clear();
        self.stats = SessionStats::default();
        self.clock.reset();
        self.spawning.reset();

        info!(high_score = self.scoring.high_score(), "session restarted");
        out_events.push(Event::SessionRestarted);
    }
}

fn push_score(change: ScoreChange, out_events: &mut Vec<Event>) {
    out_events.push(Event::ScoreChanged {
        delta: change.delta,
        total: change.total,
        new_high_score: change.new_high_score,
    });
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply<C: FrameSource>(
    session: &mut Session<C>,
    command: Command,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::Tick { dt } => session.tick(dt, out_events),
        Command::SeatCustomer { customer } => session.seat_customer(customer, out_events),
        Command::Serve { seat, item } => session.serve(seat, &item, out_events),
        Command::DismissCustomer { customer } => {
            session.dismiss(customer, DepartureReason::Dismissed, out_events);
        }
        Command::RepelHostile { hostile } => {
            session.remove_hostile(hostile, DepartureReason::Repelled, out_events);
        }
        Command::HostileDeparted { hostile } => {
            session.remove_hostile(hostile, DepartureReason::Departed, out_events);
        }
        Command::Restart => session.restart(out_events),
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use std::time::Duration;

    use sushi_rush_core::{
        CustomerId, CustomerState, HostileId, InvariantViolation, OrderPhase, Rank, SeatId,
        ServePoint, SessionStats, SessionSummary,
    };
    use sushi_rush_system_orders::Order;
    use sushi_rush_system_replay::{FrameSource, ReplayBuffer};
    use sushi_rush_system_seating::Seat;

    use super::{Session, SessionClock};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner<C: FrameSource>(session: &Session<C>) -> &'static str {
        session.banner
    }

    /// Current score.
    #[must_use]
    pub fn score<C: FrameSource>(session: &Session<C>) -> i64 {
        session.scoring.current_score()
    }

    /// Best score across sessions.
    #[must_use]
    pub fn high_score<C: FrameSource>(session: &Session<C>) -> i64 {
        session.scoring.high_score()
    }

    /// Rank of an arbitrary score under the configured thresholds.
    #[must_use]
    pub fn rank<C: FrameSource>(session: &Session<C>, score: i64) -> Rank {
        session.scoring.rank(score)
    }

    /// Running counters for the end-of-session summary.
    #[must_use]
    pub fn stats<C: FrameSource>(session: &Session<C>) -> SessionStats {
        session.stats
    }

    /// Read-only access to the session clock.
    #[must_use]
    pub fn clock<C: FrameSource>(session: &Session<C>) -> &SessionClock {
        &session.clock
    }

    /// Time left in the round.
    #[must_use]
    pub fn remaining<C: FrameSource>(session: &Session<C>) -> Duration {
        session.clock.remaining()
    }

    /// Reports whether the deadline passed.
    #[must_use]
    pub fn is_finished<C: FrameSource>(session: &Session<C>) -> bool {
        session.clock.is_finished()
    }

    /// Current interval between customer arrivals.
    #[must_use]
    pub fn spawn_interval<C: FrameSource>(session: &Session<C>) -> Duration {
        session.spawning.interval()
    }

    /// Snapshots of every seat in id order.
    #[must_use]
    pub fn seats<C: FrameSource>(session: &Session<C>) -> Vec<Seat> {
        session.seats.iter().copied().collect()
    }

    /// Hostile customers currently draining the score.
    #[must_use]
    pub fn hostiles<C: FrameSource>(session: &Session<C>) -> Vec<HostileId> {
        session.hostiles.iter().copied().collect()
    }

    /// Captured digest frames.
    #[must_use]
    pub fn replay<C: FrameSource>(session: &Session<C>) -> &ReplayBuffer<C::Frame> {
        &session.replay
    }

    /// Snapshot of a customer.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct CustomerSnapshot {
        /// Identifier of the customer.
        pub id: CustomerId,
        /// Seat reserved or occupied by the customer.
        pub seat: SeatId,
        /// Serve point of that seat.
        pub serve_point: ServePoint,
        /// Lifecycle state.
        pub state: CustomerState,
        /// Phase of the order controller once seated.
        pub phase: Option<OrderPhase>,
        /// Active order, if any.
        pub order: Option<Order>,
    }

    /// Snapshots of every customer in id order, including those leaving this tick.
    #[must_use]
    pub fn customers<C: FrameSource>(session: &Session<C>) -> Vec<CustomerSnapshot> {
        session
            .customers
            .values()
            .map(|customer| CustomerSnapshot {
                id: customer.id,
                seat: customer.seat,
                serve_point: customer.serve_point,
                state: customer.state,
                phase: customer.controller.as_ref().map(|controller| controller.phase()),
                order: customer
                    .controller
                    .as_ref()
                    .and_then(|controller| controller.order().cloned()),
            })
            .collect()
    }

    /// Digest of the round so far.
    #[must_use]
    pub fn summary<C: FrameSource>(session: &Session<C>) -> SessionSummary {
        let stats = session.stats;
        let score = session.scoring.current_score();
        SessionSummary {
            score,
            high_score: session.scoring.high_score(),
            rank: session.scoring.rank(score),
            served: stats.served,
            wrong: stats.wrong,
            missed: stats.missed,
            total_service_time: stats.total_service_time,
            average_service_time: stats.average_service_time(),
            decay_active_time: stats.decay_active_time,
            replay_frames: session.replay.len(),
        }
    }

    /// Cross-checks seats, customers, orders, replay and decay sources.
    pub fn audit<C: FrameSource>(session: &Session<C>) -> Result<(), InvariantViolation> {
        session.seats.audit()?;

        for customer in session.customers.values() {
            if customer.state == CustomerState::Leaving {
                continue;
            }
            if session.seats.occupant(customer.seat) != Some(customer.id) {
                return Err(InvariantViolation::SeatMismatch {
                    seat: customer.seat,
                    customer: customer.id,
                });
            }
            if let Some(order) = customer.controller.as_ref().and_then(|c| c.order()) {
                if order.remaining() > order.limit() {
                    return Err(InvariantViolation::RemainingExceedsLimit {
                        customer: customer.id,
                        remaining: order.remaining(),
                        limit: order.limit(),
                    });
                }
                if order.remaining().is_zero() {
                    return Err(InvariantViolation::ExpiredOrderActive {
                        customer: customer.id,
                    });
                }
            }
        }

        for seat in session.seats.iter() {
            let Some(occupant) = seat.occupant() else {
                continue;
            };
            let holds = session
                .customers
                .get(&occupant)
                .is_some_and(|customer| {
                    customer.state != CustomerState::Leaving && customer.seat == seat.id()
                });
            if !holds {
                return Err(InvariantViolation::SeatMismatch {
                    seat: seat.id(),
                    customer: occupant,
                });
            }
        }

        session.replay.audit()?;

        let registered = session.scoring.decay_sources();
        if usize::try_from(registered).ok() != Some(session.hostiles.len()) {
            return Err(InvariantViolation::DecaySourceMismatch {
                registered,
                present: session.hostiles.len(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sushi_rush_system_scoring::InMemoryHighScore;
    use sushi_rush_system_spawning::Config as SpawnConfig;

    type Frames = fn() -> Option<u8>;

    fn quiet_session() -> Session<Frames> {
        let config = SessionConfig {
            spawning: SpawnConfig::new(Duration::from_secs(1_000), Duration::from_secs(1_000)),
            ..SessionConfig::default()
        };
        Session::new(config, (|| None) as Frames, Box::new(InMemoryHighScore::default()))
            .expect("valid config")
    }

    #[test]
    fn invalid_config_prevents_start() {
        let config = SessionConfig {
            seats: Vec::new(),
            ..SessionConfig::default()
        };
        let result = Session::new(
            config,
            (|| None) as Frames,
            Box::new(InMemoryHighScore::default()),
        );
        assert!(matches!(result, Err(ConfigError::NoSeats)));
    }

    #[test]
    fn unknown_hostile_removal_is_ignored() {
        let mut session = quiet_session();
        let mut events = Vec::new();
        apply(
            &mut session,
            Command::RepelHostile {
                hostile: HostileId::new(9),
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert!(query::audit(&session).is_ok());
    }

    #[test]
    fn serve_on_vacant_seat_is_reported() {
        let mut session = quiet_session();
        let mut events = Vec::new();
        apply(
            &mut session,
            Command::Serve {
                seat: SeatId::new(0),
                item: "Maguro".to_owned(),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::ServeIgnored {
                seat: SeatId::new(0),
                reason: ServeRejection::VacantSeat,
            }]
        );
    }

    #[test]
    fn leaving_customers_are_pruned_on_next_tick() {
        let config = SessionConfig {
            spawning: SpawnConfig::new(Duration::ZERO, Duration::from_secs(1_000)),
            ..SessionConfig::default()
        };
        let mut session =
            Session::new(config, (|| None) as Frames, Box::new(InMemoryHighScore::default()))
                .expect("valid config");
        let mut events = Vec::new();
        apply(&mut session, Command::Tick { dt: Duration::ZERO }, &mut events);
        apply(
            &mut session,
            Command::DismissCustomer {
                customer: CustomerId::new(0),
            },
            &mut events,
        );
        assert_eq!(
            query::customers(&session)
                .first()
                .map(|customer| customer.state),
            Some(CustomerState::Leaving)
        );

        apply(&mut session, Command::Tick { dt: Duration::ZERO }, &mut events);
        assert!(query::customers(&session).is_empty());
        assert!(query::audit(&session).is_ok());
    }
}
