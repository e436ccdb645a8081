//! Scripted stand-in for the interactive host.
//!
//! It plays the roles the session expects from a renderer and a player:
//! customers walk to their seat, a simulated player serves orders after a
//! reaction delay and sometimes picks the wrong item, and hostile customers
//! are knocked away or wander off on their own.

use std::{collections::BTreeMap, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sushi_rush_core::{Catalog, Command, CustomerId, Event, SeatId, SessionSummary};
use sushi_rush_session::{self as session, Session};
use sushi_rush_system_replay::FrameSource;
use tracing::{debug, info, trace};

/// Tunables for the simulated player.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Behaviour {
    /// Time a customer needs to reach its seat.
    pub(crate) walk: Duration,
    /// Shortest delay before serving an order.
    pub(crate) min_reaction: Duration,
    /// Longest delay before serving an order.
    pub(crate) max_reaction: Duration,
    /// Probability of serving the requested item.
    pub(crate) accuracy: f64,
    /// Orders a customer places before leaving.
    pub(crate) orders_per_customer: u32,
    /// Probability that a hostile is hit rather than left to walk away.
    pub(crate) repel_chance: f64,
    /// Time before a hostile is dealt with.
    pub(crate) hostile_dwell: Duration,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            walk: Duration::from_secs(3),
            min_reaction: Duration::from_secs(2),
            max_reaction: Duration::from_secs(17),
            accuracy: 0.8,
            orders_per_customer: 3,
            repel_chance: 0.7,
            hostile_dwell: Duration::from_secs(6),
        }
    }
}

#[derive(Debug)]
struct Scheduled {
    due: Duration,
    command: Command,
}

/// Simulated host that turns session events into delayed commands.
#[derive(Debug)]
pub(crate) struct Host {
    behaviour: Behaviour,
    catalog: Catalog,
    rng: ChaCha8Rng,
    clock: Duration,
    queue: Vec<Scheduled>,
    resolved: BTreeMap<CustomerId, u32>,
}

impl Host {
    pub(crate) fn new(behaviour: Behaviour, catalog: Catalog, seed: u64) -> Self {
        Self {
            behaviour,
            catalog,
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock: Duration::ZERO,
            queue: Vec::new(),
            resolved: BTreeMap::new(),
        }
    }

    /// Advances the host clock and returns every command that came due, in scheduling order.
    pub(crate) fn advance(&mut self, dt: Duration) -> Vec<Command> {
        self.clock = self.clock.saturating_add(dt);
        let (due, pending): (Vec<_>, Vec<_>) = self
            .queue
            .drain(..)
            .partition(|scheduled| scheduled.due <= self.clock);
        self.queue = pending;
        due.into_iter().map(|scheduled| scheduled.command).collect()
    }

    /// Reacts to the events of one frame.
    pub(crate) fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CustomerAdmitted { customer, .. } => {
                    self.schedule(
                        self.behaviour.walk,
                        Command::SeatCustomer {
                            customer: *customer,
                        },
                    );
                }
                Event::OrderPlaced { seat, item, .. } => {
                    let served = self.choose_item(item);
                    let delay = self.reaction();
                    self.schedule(
                        delay,
                        Command::Serve {
                            seat: *seat,
                            item: served,
                        },
                    );
                }
                Event::OrderResolved { customer, seat, .. } => {
                    self.cancel_serves(*seat);
                    let count = self.resolved.entry(*customer).or_insert(0);
                    *count += 1;
                    if *count >= self.behaviour.orders_per_customer {
                        self.schedule(
                            Duration::ZERO,
                            Command::DismissCustomer {
                                customer: *customer,
                            },
                        );
                    }
                }
                Event::CustomerLeft { customer, seat, .. } => {
                    self.cancel_serves(*seat);
                    let _ = self.resolved.remove(customer);
                }
                Event::HostileArrived { hostile } => {
                    let command = if self.rng.gen_bool(self.behaviour.repel_chance) {
                        Command::RepelHostile { hostile: *hostile }
                    } else {
                        Command::HostileDeparted { hostile: *hostile }
                    };
                    self.schedule(self.behaviour.hostile_dwell, command);
                }
                Event::SessionRestarted => {
                    self.queue.clear();
                    self.resolved.clear();
                }
                _ => {}
            }
        }
    }

    fn schedule(&mut self, delay: Duration, command: Command) {
        trace!(?command, delay_ms = delay.as_millis(), "host scheduled command");
        self.queue.push(Scheduled {
            due: self.clock.saturating_add(delay),
            command,
        });
    }

    /// Drops serves still queued for `seat`; the order they answered is gone.
    fn cancel_serves(&mut self, seat: SeatId) {
        self.queue.retain(|scheduled| {
            !matches!(&scheduled.command, Command::Serve { seat: target, .. } if *target == seat)
        });
    }

    fn reaction(&mut self) -> Duration {
        let min = self.behaviour.min_reaction.as_secs_f64();
        let max = self.behaviour.max_reaction.as_secs_f64();
        if max <= min {
            return self.behaviour.min_reaction;
        }
        Duration::from_secs_f64(self.rng.gen_range(min..max))
    }

    fn choose_item(&mut self, requested: &str) -> String {
        if self.rng.gen_bool(self.behaviour.accuracy) {
            return requested.to_owned();
        }
        let index = self.rng.gen_range(0..self.catalog.len());
        self.catalog
            .get(index)
            .map_or_else(|| requested.to_owned(), |item| item.name().to_owned())
    }
}

/// Drives `session` with fixed ticks until the deadline passes.
pub(crate) fn run<C: FrameSource>(
    session: &mut Session<C>,
    host: &mut Host,
    tick: Duration,
) -> SessionSummary {
    loop {
        let mut events = Vec::new();
        session::apply(session, Command::Tick { dt: tick }, &mut events);
        for command in host.advance(tick) {
            session::apply(session, command, &mut events);
        }

        for event in &events {
            log_event(event);
        }
        host.observe(&events);

        if let Some(summary) = events.into_iter().find_map(|event| match event {
            Event::SessionEnded { summary } => Some(summary),
            _ => None,
        }) {
            return summary;
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::ScoreChanged {
            delta,
            total,
            new_high_score,
        } => debug!(delta, total, new_high_score, "score changed"),
        Event::OrderResolved {
            customer,
            item,
            outcome,
            ..
        } => debug!(%customer, item = item.as_str(), ?outcome, "order resolved"),
        Event::SpawnIntervalChanged { interval } => {
            info!(interval_secs = interval.as_secs(), "customers arrive faster");
        }
        other => trace!(?other, "session event"),
    }
}
