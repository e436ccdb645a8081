use std::time::Duration;

use sushi_rush_core::{
    Command, CustomerId, CustomerState, DepartureReason, Event, HostileId, OrderPhase, Outcome,
    Rank, SeatId, ServePoint, ServeRejection,
};
use sushi_rush_session::{self as session, query, Session, SessionConfig};
use sushi_rush_system_orders::Config as OrderConfig;
use sushi_rush_system_replay::Config as ReplayConfig;
use sushi_rush_system_scoring::InMemoryHighScore;
use sushi_rush_system_spawning::{Config as SpawnConfig, HostileCadence};

type Frames = fn() -> Option<u32>;

fn frame() -> Option<u32> {
    Some(7)
}

fn config() -> SessionConfig {
    SessionConfig {
        spawning: SpawnConfig::new(Duration::ZERO, Duration::from_secs(1_000)),
        replay: ReplayConfig::new(300, Duration::from_millis(100)),
        seed: 7,
        ..SessionConfig::default()
    }
}

fn start(config: SessionConfig) -> Session<Frames> {
    Session::new(config, frame as Frames, Box::new(InMemoryHighScore::new(150)))
        .expect("valid config")
}

fn step(session: &mut Session<Frames>, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    session::apply(session, command, &mut events);
    events
}

fn tick(session: &mut Session<Frames>, millis: u64) -> Vec<Event> {
    step(
        session,
        Command::Tick {
            dt: Duration::from_millis(millis),
        },
    )
}

fn seat_first_customer(session: &mut Session<Frames>) -> String {
    let _ = tick(session, 0);
    let events = step(
        session,
        Command::SeatCustomer {
            customer: CustomerId::new(0),
        },
    );
    requested_item(&events).expect("seating places an order")
}

fn requested_item(events: &[Event]) -> Option<String> {
    events.iter().find_map(|event| match event {
        Event::OrderPlaced { item, .. } => Some(item.clone()),
        _ => None,
    })
}

fn serve(session: &mut Session<Frames>, item: &str) -> Vec<Event> {
    step(
        session,
        Command::Serve {
            seat: SeatId::new(0),
            item: item.to_owned(),
        },
    )
}

#[test]
fn customer_is_admitted_seated_and_served() {
    let mut session = start(config());

    let events = tick(&mut session, 0);
    assert_eq!(
        events,
        vec![
            Event::TimeAdvanced { dt: Duration::ZERO },
            Event::CustomerAdmitted {
                customer: CustomerId::new(0),
                seat: SeatId::new(0),
                serve_point: ServePoint::new(0),
            },
        ]
    );

    let events = serve(&mut session, "Maguro");
    assert_eq!(
        events,
        vec![Event::ServeIgnored {
            seat: SeatId::new(0),
            reason: ServeRejection::CustomerApproaching,
        }]
    );

    let events = step(
        &mut session,
        Command::SeatCustomer {
            customer: CustomerId::new(0),
        },
    );
    assert!(matches!(
        events.first(),
        Some(Event::CustomerSeated { customer, seat })
            if *customer == CustomerId::new(0) && *seat == SeatId::new(0)
    ));
    let item = requested_item(&events).expect("order placed on seating");

    let events = serve(&mut session, &item);
    assert_eq!(
        events,
        vec![
            Event::OrderResolved {
                customer: CustomerId::new(0),
                seat: SeatId::new(0),
                item: item.clone(),
                outcome: Outcome::Correct,
                delta: 100,
            },
            Event::ScoreChanged {
                delta: 100,
                total: 100,
                new_high_score: false,
            },
        ]
    );

    let events = serve(&mut session, &item);
    assert_eq!(
        events,
        vec![Event::ServeIgnored {
            seat: SeatId::new(0),
            reason: ServeRejection::NoActiveOrder,
        }]
    );

    let events = tick(&mut session, 1_000);
    assert!(requested_item(&events).is_some(), "next order after cooldown");

    let snapshot = query::customers(&session);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].state, CustomerState::Seated);
    assert_eq!(snapshot[0].phase, Some(OrderPhase::Active));
    assert_eq!(query::stats(&session).served, 1);
}

#[test]
fn wrong_serves_and_timeouts_are_counted_separately() {
    let mut session = start(SessionConfig {
        orders: OrderConfig::new(Duration::from_secs(2), Duration::from_secs(1), 1),
        ..config()
    });
    let item = seat_first_customer(&mut session);
    let wrong = if item == "Maguro" { "Tamago" } else { "Maguro" };

    let events = serve(&mut session, wrong);
    assert!(events.contains(&Event::ScoreChanged {
        delta: -1,
        total: -1,
        new_high_score: false,
    }));

    let _ = tick(&mut session, 1_000);
    let events = tick(&mut session, 2_000);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::OrderResolved {
            outcome: Outcome::Timeout,
            delta: -1,
            ..
        }
    )));

    let stats = query::stats(&session);
    assert_eq!((stats.served, stats.wrong, stats.missed), (0, 1, 1));
    assert_eq!(query::score(&session), -2);
    assert_eq!(query::rank(&session, query::score(&session)), Rank::E);
}

#[test]
fn dismissal_releases_seat_before_next_tick() {
    let mut session = start(config());
    let _ = seat_first_customer(&mut session);

    let events = step(
        &mut session,
        Command::DismissCustomer {
            customer: CustomerId::new(0),
        },
    );
    assert_eq!(
        events,
        vec![Event::CustomerLeft {
            customer: CustomerId::new(0),
            seat: SeatId::new(0),
            reason: DepartureReason::Dismissed,
        }]
    );
    assert!(query::seats(&session)[0].is_free());

    let events = serve(&mut session, "Maguro");
    assert_eq!(
        events,
        vec![Event::ServeIgnored {
            seat: SeatId::new(0),
            reason: ServeRejection::VacantSeat,
        }]
    );
    assert!(step(
        &mut session,
        Command::DismissCustomer {
            customer: CustomerId::new(0),
        },
    )
    .is_empty());
}

#[test]
fn full_counter_skips_spawn() {
    let mut session = start(SessionConfig {
        seats: vec![ServePoint::new(10)],
        spawning: SpawnConfig::new(Duration::ZERO, Duration::from_secs(1)),
        ..config()
    });

    let _ = tick(&mut session, 0);
    let events = tick(&mut session, 1_000);
    assert!(events.contains(&Event::SpawnSkipped));
    assert_eq!(query::customers(&session).len(), 1);
}

#[test]
fn hostile_drains_score_until_repelled() {
    let cadence = HostileCadence::new(Duration::from_secs(1), Duration::from_secs(1_000), 3);
    let mut session = start(SessionConfig {
        spawning: SpawnConfig::new(Duration::from_secs(1_000), Duration::from_secs(1_000))
            .with_hostiles(cadence),
        ..config()
    });

    let events = tick(&mut session, 1_000);
    assert!(events.contains(&Event::HostileArrived {
        hostile: HostileId::new(0)
    }));
    assert!(events.contains(&Event::ScoreChanged {
        delta: -10,
        total: -10,
        new_high_score: false,
    }));

    let events = tick(&mut session, 300);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::ScoreChanged { .. })));

    let events = step(
        &mut session,
        Command::RepelHostile {
            hostile: HostileId::new(0),
        },
    );
    assert_eq!(
        events,
        vec![Event::HostileLeft {
            hostile: HostileId::new(0),
            reason: DepartureReason::Repelled,
        }]
    );

    let events = tick(&mut session, 10_000);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::ScoreChanged { .. })));
    assert_eq!(query::score(&session), -10);
    assert_eq!(
        query::stats(&session).decay_active_time,
        Duration::from_millis(1_300)
    );
    assert!(query::hostiles(&session).is_empty());
}

#[test]
fn deadline_clamps_tick_and_ends_session() {
    let mut session = start(SessionConfig {
        duration: Duration::from_secs(2),
        ..config()
    });

    let _ = tick(&mut session, 1_500);
    assert_eq!(query::clock(&session).remaining_display(), (0, 0));

    let events = tick(&mut session, 1_000);
    assert_eq!(
        events.first(),
        Some(&Event::TimeAdvanced {
            dt: Duration::from_millis(500)
        })
    );
    assert!(events.contains(&Event::CustomerLeft {
        customer: CustomerId::new(0),
        seat: SeatId::new(0),
        reason: DepartureReason::SessionEnded,
    }));
    let summary = match events.last() {
        Some(Event::SessionEnded { summary }) => summary.clone(),
        other => panic!("expected session end, got {other:?}"),
    };
    assert_eq!(summary.score, 0);
    assert_eq!(summary.high_score, 150);
    assert_eq!(summary.average_service_time, Duration::ZERO);
    assert_eq!(summary.replay_frames, 2);

    assert!(query::is_finished(&session));
    assert!(!query::replay(&session).is_capturing());
    assert!(tick(&mut session, 1_000).is_empty());
    assert_eq!(
        serve(&mut session, "Maguro"),
        vec![Event::ServeIgnored {
            seat: SeatId::new(0),
            reason: ServeRejection::SessionOver,
        }]
    );
}

#[test]
fn restart_keeps_high_score_and_clears_round() {
    let mut session = start(config());
    let item = seat_first_customer(&mut session);
    let _ = serve(&mut session, &item);
    let _ = tick(&mut session, 500);
    assert!(!query::replay(&session).is_empty());

    let events = step(&mut session, Command::Restart);
    assert_eq!(events, vec![Event::SessionRestarted]);
    assert_eq!(query::score(&session), 0);
    assert_eq!(query::high_score(&session), 150);
    assert!(query::replay(&session).is_empty());
    assert!(query::replay(&session).is_capturing());
    assert!(query::customers(&session).is_empty());
    assert!(query::seats(&session).iter().all(|seat| seat.is_free()));
    assert_eq!(query::stats(&session).served, 0);
    assert_eq!(query::remaining(&session), Duration::from_secs(120));

    let events = tick(&mut session, 0);
    assert!(events.contains(&Event::CustomerAdmitted {
        customer: CustomerId::new(1),
        seat: SeatId::new(0),
        serve_point: ServePoint::new(0),
    }));
}

#[test]
fn replay_captures_at_ten_frames_per_second() {
    let mut session = start(config());
    for _ in 0..60 {
        let _ = tick(&mut session, 50);
    }
    assert_eq!(query::replay(&session).len(), 30);
    assert!(query::replay(&session).frames().all(|frame| *frame == 7));
}

#[test]
fn default_digest_records_highlight_clips() {
    let mut session = start(SessionConfig {
        replay: ReplayConfig::default(),
        ..config()
    });

    for _ in 0..29 {
        let _ = tick(&mut session, 100);
    }
    assert!(query::replay(&session).is_empty());

    let _ = tick(&mut session, 100);
    assert_eq!(query::replay(&session).len(), 30);
    assert_eq!(query::replay(&session).clip_count(), 1);

    for _ in 0..100 {
        let _ = tick(&mut session, 100);
    }
    assert_eq!(query::replay(&session).len(), 30);
    assert_eq!(query::summary(&session).replay_frames, 30);
}

#[test]
fn new_high_score_is_flagged() {
    let mut session = start(config());
    let first = seat_first_customer(&mut session);
    let _ = serve(&mut session, &first);
    let _ = tick(&mut session, 1_000);

    let customers = query::customers(&session);
    let second = customers[0]
        .order
        .as_ref()
        .map(|order| order.item().name().to_owned())
        .expect("second order");
    let events = serve(&mut session, &second);
    assert!(events.contains(&Event::ScoreChanged {
        delta: 100,
        total: 200,
        new_high_score: true,
    }));
    assert_eq!(query::high_score(&session), 200);
}
