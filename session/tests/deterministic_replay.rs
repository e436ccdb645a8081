use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use sushi_rush_core::{Command, Event, Outcome, SeatId};
use sushi_rush_session::{self as session, query, Session, SessionConfig};
use sushi_rush_system_scoring::InMemoryHighScore;

type Frames = fn() -> Option<u8>;

fn frame() -> Option<u8> {
    Some(1)
}

#[test]
fn deterministic_replay_produces_identical_logs() {
    let first = replay(0x00c0_ffee);
    let second = replay(0x00c0_ffee);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(
        first.events.iter().any(|record| matches!(record, EventRecord::Ended { .. })),
        "scripted session reaches its deadline"
    );
}

#[test]
fn score_equals_sum_of_reported_deltas() {
    let outcome = replay(0x5eed);
    let reported: i64 = outcome
        .events
        .iter()
        .filter_map(|record| match record {
            EventRecord::Score { delta, .. } => Some(*delta),
            _ => None,
        })
        .sum();
    assert_eq!(outcome.score, reported);
}

fn replay(seed: u64) -> ReplayOutcome {
    let config = SessionConfig {
        duration: Duration::from_secs(90),
        seed,
        ..SessionConfig::default()
    };
    let mut session = Session::new(config, frame as Frames, Box::new(InMemoryHighScore::default()))
        .expect("valid config");
    let mut log = Vec::new();
    let mut pending = Vec::new();
    let mut serve_correct = true;

    for tick in 0..1_000u32 {
        let dt = Duration::from_millis(80 + u64::from(tick % 5) * 10);
        let mut events = Vec::new();
        session::apply(&mut session, Command::Tick { dt }, &mut events);
        for command in pending.drain(..) {
            session::apply(&mut session, command, &mut events);
        }

        for event in &events {
            match event {
                Event::CustomerAdmitted { customer, .. } => {
                    pending.push(Command::SeatCustomer {
                        customer: *customer,
                    });
                }
                Event::OrderPlaced { seat, item, .. } if tick % 3 != 0 => {
                    let served = if serve_correct {
                        item.clone()
                    } else {
                        "Salmon".to_owned()
                    };
                    serve_correct = !serve_correct;
                    pending.push(Command::Serve {
                        seat: *seat,
                        item: served,
                    });
                }
                Event::OrderResolved {
                    customer,
                    outcome: Outcome::Timeout,
                    ..
                } => pending.push(Command::DismissCustomer {
                    customer: *customer,
                }),
                Event::HostileArrived { hostile } => {
                    pending.push(Command::RepelHostile { hostile: *hostile });
                }
                _ => {}
            }
        }

        log.extend(events.iter().filter_map(EventRecord::from_event));
    }

    ReplayOutcome {
        score: query::score(&session),
        events: log,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    score: i64,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    Admitted { customer: u32, seat: SeatId },
    Placed { customer: u32, item: String },
    Resolved { customer: u32, outcome: Outcome },
    Score { delta: i64, total: i64 },
    Hostile { hostile: u32 },
    Ended { score: i64, served: u32 },
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        let record = match event {
            Event::CustomerAdmitted { customer, seat, .. } => Self::Admitted {
                customer: customer.get(),
                seat: *seat,
            },
            Event::OrderPlaced { customer, item, .. } => Self::Placed {
                customer: customer.get(),
                item: item.clone(),
            },
            Event::OrderResolved {
                customer, outcome, ..
            } => Self::Resolved {
                customer: customer.get(),
                outcome: *outcome,
            },
            Event::ScoreChanged { delta, total, .. } => Self::Score {
                delta: *delta,
                total: *total,
            },
            Event::HostileArrived { hostile } => Self::Hostile {
                hostile: hostile.get(),
            },
            Event::SessionEnded { summary } => Self::Ended {
                score: summary.score,
                served: summary.served,
            },
            _ => return None,
        };
        Some(record)
    }
}
