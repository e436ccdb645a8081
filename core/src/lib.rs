#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sushi Rush session engine.
//!
//! This crate defines the message surface that connects hosts, the
//! authoritative session, and the pure systems it drives. Hosts submit
//! [`Command`] values describing desired mutations, the session executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! that hosts render, play sounds for, or log. Systems never talk to each
//! other directly; the session routes their results in a fixed per-tick order.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when a session boots.
pub const WELCOME_BANNER: &str = "Welcome to Sushi Rush.";

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the session clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports that an approaching customer reached its reserved seat.
    SeatCustomer {
        /// Customer that finished walking to its seat.
        customer: CustomerId,
    },
    /// Routes a served item to the customer sitting at the provided seat.
    Serve {
        /// Seat whose occupant receives the item.
        seat: SeatId,
        /// Catalog name of the served item.
        item: String,
    },
    /// Removes a customer from the counter, releasing its seat.
    DismissCustomer {
        /// Customer that leaves.
        customer: CustomerId,
    },
    /// Removes a hostile customer because it was hit.
    RepelHostile {
        /// Hostile customer that was hit.
        hostile: HostileId,
    },
    /// Removes a hostile customer that walked away on its own.
    HostileDeparted {
        /// Hostile customer that left.
        hostile: HostileId,
    },
    /// Resets the session for another round, keeping the high score.
    Restart,
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the session clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick after clamping to the deadline.
        dt: Duration,
    },
    /// Confirms that a customer was admitted and is walking towards its seat.
    CustomerAdmitted {
        /// Identifier assigned to the customer.
        customer: CustomerId,
        /// Seat reserved for the customer.
        seat: SeatId,
        /// Serve point of the reserved seat, forwarded to the movement controller.
        serve_point: ServePoint,
    },
    /// Reports that a spawn came due while every seat was occupied.
    SpawnSkipped,
    /// Announces that the customer spawn cadence accelerated.
    SpawnIntervalChanged {
        /// Interval now separating customer spawns.
        interval: Duration,
    },
    /// Confirms that a customer sat down.
    CustomerSeated {
        /// Customer that sat down.
        customer: CustomerId,
        /// Seat the customer occupies.
        seat: SeatId,
    },
    /// Announces a freshly generated order.
    OrderPlaced {
        /// Customer that placed the order.
        customer: CustomerId,
        /// Seat where the order must be served.
        seat: SeatId,
        /// Catalog name of the requested item.
        item: String,
        /// Time allotted to serve the order.
        limit: Duration,
    },
    /// Reports how an order was resolved.
    OrderResolved {
        /// Customer whose order resolved.
        customer: CustomerId,
        /// Seat of the customer.
        seat: SeatId,
        /// Item the customer requested.
        item: String,
        /// Outcome of the order.
        outcome: Outcome,
        /// Score delta applied for the outcome.
        delta: i64,
    },
    /// Reports that a serve could not be routed to an active order.
    ServeIgnored {
        /// Seat targeted by the serve.
        seat: SeatId,
        /// Specific reason the serve was ignored.
        reason: ServeRejection,
    },
    /// Confirms that a customer left and its seat is free again.
    CustomerLeft {
        /// Customer that left.
        customer: CustomerId,
        /// Seat released by the departure.
        seat: SeatId,
        /// Why the customer left.
        reason: DepartureReason,
    },
    /// Announces that a hostile customer arrived and started draining score.
    HostileArrived {
        /// Identifier assigned to the hostile customer.
        hostile: HostileId,
    },
    /// Confirms that a hostile customer is gone and no longer drains score.
    HostileLeft {
        /// Hostile customer that left.
        hostile: HostileId,
        /// Why the hostile customer left.
        reason: DepartureReason,
    },
    /// Reports an accepted score delta.
    ScoreChanged {
        /// Delta applied to the score.
        delta: i64,
        /// Score after applying the delta.
        total: i64,
        /// Indicates whether the delta produced a new high score.
        new_high_score: bool,
    },
    /// Announces that the session deadline passed.
    SessionEnded {
        /// End-of-session digest.
        summary: SessionSummary,
    },
    /// Confirms that the session was reset for another round.
    SessionRestarted,
    /// Reports a broken internal invariant detected after a tick.
    InvariantViolated {
        /// Description of the violation.
        violation: InvariantViolation,
    },
}

/// Unique identifier assigned to a seat.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SeatId(u32);

impl SeatId {
    /// Creates a new seat identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat#{}", self.0)
    }
}

/// Unique identifier assigned to a customer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CustomerId(u32);

impl CustomerId {
    /// Creates a new customer identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "customer#{}", self.0)
    }
}

/// Unique identifier assigned to a hostile customer.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HostileId(u32);

impl HostileId {
    /// Creates a new hostile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hostile#{}", self.0)
    }
}

/// Opaque host-side location reference attached to a seat.
///
/// The core never interprets the value; hosts map it back to a position in
/// their own scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServePoint(u64);

impl ServePoint {
    /// Wraps a host-provided location handle.
    #[must_use]
    pub const fn new(handle: u64) -> Self {
        Self(handle)
    }

    /// Host handle carried by the serve point.
    #[must_use]
    pub const fn handle(&self) -> u64 {
        self.0
    }
}

/// Item that customers may order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuItem {
    name: String,
    points: i64,
}

impl MenuItem {
    /// Creates a catalog entry worth `points` when served correctly.
    #[must_use]
    pub fn new(name: impl Into<String>, points: i64) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Name customers request and serves are matched against.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Points awarded for a correct serve.
    #[must_use]
    pub const fn points(&self) -> i64 {
        self.points
    }
}

/// Finite, non-empty set of orderable items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Catalog {
    items: Vec<MenuItem>,
}

impl Catalog {
    /// Builds a catalog, rejecting empty, blank or duplicate entries.
    pub fn new(items: Vec<MenuItem>) -> Result<Self, ConfigError> {
        if items.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        for (index, item) in items.iter().enumerate() {
            if item.name().trim().is_empty() {
                return Err(ConfigError::BlankItemName { index });
            }
            if items[..index].iter().any(|other| other.name() == item.name()) {
                return Err(ConfigError::DuplicateItem(item.name().to_owned()));
            }
        }

        Ok(Self { items })
    }

    /// Number of items in the catalog. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`; present for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item stored at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MenuItem> {
        self.items.get(index)
    }

    /// Looks up an item by exact, case-sensitive name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.name() == name)
    }

    /// Iterator over the items in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &MenuItem> {
        self.items.iter()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            items: vec![
                MenuItem::new("Maguro", 100),
                MenuItem::new("Tamago", 100),
                MenuItem::new("Salmon", 100),
            ],
        }
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let items = Vec::<MenuItem>::deserialize(deserializer)?;
        Self::new(items).map_err(serde::de::Error::custom)
    }
}

/// Final result of a single order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The requested item was served.
    Correct,
    /// A different item was served.
    Wrong,
    /// The countdown expired before a serve arrived.
    Timeout,
}

/// Phase of a seated customer's order controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderPhase {
    /// Seated, no order generated yet.
    Idle,
    /// Order displayed and counting down.
    Active,
    /// Previous order resolved; waiting before the next one.
    Cooldown,
}

/// Lifecycle of a regular customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerState {
    /// Walking towards the reserved seat.
    Approaching,
    /// Sitting at the seat and ordering.
    Seated,
    /// On the way out; the seat is already free.
    Leaving,
}

/// Reasons a serve could not be applied to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServeRejection {
    /// The seat id does not exist.
    UnknownSeat,
    /// Nobody occupies the seat.
    VacantSeat,
    /// The occupant has not reached the seat yet.
    CustomerApproaching,
    /// The occupant has no active order, e.g. during cooldown.
    NoActiveOrder,
    /// The serve carried no item name.
    EmptyItem,
    /// The session already ended.
    SessionOver,
}

/// Why a customer or hostile left the counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepartureReason {
    /// Host requested the departure (leave event or hit).
    Dismissed,
    /// A hostile customer was hit and driven off.
    Repelled,
    /// A hostile customer walked away on its own.
    Departed,
    /// The session deadline passed.
    SessionEnded,
}

/// Coarse classification of a score.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Rank {
    /// Highest rank.
    S,
    /// Second rank.
    A,
    /// Third rank.
    B,
    /// Fourth rank.
    C,
    /// Fifth rank.
    D,
    /// Lowest rank and the fallback for scores below every threshold.
    E,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        };
        f.write_str(label)
    }
}

/// Inclusive lower score bounds for each rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankThresholds {
    /// Minimum score for rank S.
    pub s: i64,
    /// Minimum score for rank A.
    pub a: i64,
    /// Minimum score for rank B.
    pub b: i64,
    /// Minimum score for rank C.
    pub c: i64,
    /// Minimum score for rank D.
    pub d: i64,
    /// Minimum score for rank E. Scores below it still rank E.
    pub e: i64,
}

impl RankThresholds {
    /// Rejects thresholds that are not strictly descending from S to E.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = [self.s, self.a, self.b, self.c, self.d, self.e];
        if ordered.windows(2).all(|pair| pair[0] > pair[1]) {
            Ok(())
        } else {
            Err(ConfigError::UnorderedRanks)
        }
    }

    /// Returns the rank whose threshold is the highest one not above `score`.
    #[must_use]
    pub fn classify(&self, score: i64) -> Rank {
        let table = [
            (self.s, Rank::S),
            (self.a, Rank::A),
            (self.b, Rank::B),
            (self.c, Rank::C),
            (self.d, Rank::D),
        ];
        table
            .iter()
            .find(|(threshold, _)| score >= *threshold)
            .map_or(Rank::E, |(_, rank)| *rank)
    }
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self {
            s: 5_000,
            a: 3_000,
            b: 1_000,
            c: 500,
            d: 100,
            e: 0,
        }
    }
}

/// Running per-session counters used by the end-of-session summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Orders resolved with the correct item.
    pub served: u32,
    /// Orders resolved with a wrong item.
    pub wrong: u32,
    /// Orders that timed out.
    pub missed: u32,
    /// Sum of limit minus remaining time over correct serves.
    pub total_service_time: Duration,
    /// Time during which at least one decay source was present.
    pub decay_active_time: Duration,
}

impl SessionStats {
    /// Increments the counter matching `outcome`; correct serves also add their service time.
    pub fn record(&mut self, outcome: Outcome, service_time: Duration) {
        match outcome {
            Outcome::Correct => {
                self.served = self.served.saturating_add(1);
                self.total_service_time = self.total_service_time.saturating_add(service_time);
            }
            Outcome::Wrong => self.wrong = self.wrong.saturating_add(1),
            Outcome::Timeout => self.missed = self.missed.saturating_add(1),
        }
    }

    /// Mean service time over correct serves, zero when nothing was served.
    #[must_use]
    pub fn average_service_time(&self) -> Duration {
        if self.served == 0 {
            Duration::ZERO
        } else {
            self.total_service_time / self.served
        }
    }
}

/// End-of-session digest shown on the result screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Final score.
    pub score: i64,
    /// Best score across sessions, including this one.
    pub high_score: i64,
    /// Rank of the final score.
    pub rank: Rank,
    /// Orders resolved with the correct item.
    pub served: u32,
    /// Orders resolved with a wrong item.
    pub wrong: u32,
    /// Orders that timed out.
    pub missed: u32,
    /// Sum of service times over correct serves.
    pub total_service_time: Duration,
    /// Mean service time over correct serves.
    pub average_service_time: Duration,
    /// Time during which hostile customers drained the score.
    pub decay_active_time: Duration,
    /// Frames available for digest playback.
    pub replay_frames: usize,
}

/// Configuration problems that prevent a session from starting.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The catalog has no items.
    #[error("catalog must contain at least one item")]
    EmptyCatalog,
    /// A catalog item has an empty name.
    #[error("catalog item {index} has a blank name")]
    BlankItemName {
        /// Position of the offending item.
        index: usize,
    },
    /// Two catalog items share a name.
    #[error("catalog item `{0}` is listed twice")]
    DuplicateItem(String),
    /// The seat pool is empty.
    #[error("seat pool must contain at least one seat")]
    NoSeats,
    /// The replay buffer cannot hold any frame.
    #[error("replay capacity must be greater than zero")]
    ZeroReplayCapacity,
    /// A duration that drives a cadence is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    /// The decay configuration is unusable.
    #[error("decay {0}")]
    InvalidDecay(&'static str),
    /// Rank thresholds are not strictly descending.
    #[error("rank thresholds must strictly descend from S to E")]
    UnorderedRanks,
}

/// Broken internal invariants. These never occur under correct ordering.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A customer holds more than one seat.
    #[error("{customer} occupies both {first} and {second}")]
    CustomerInTwoSeats {
        /// Customer found twice.
        customer: CustomerId,
        /// First seat holding the customer.
        first: SeatId,
        /// Second seat holding the customer.
        second: SeatId,
    },
    /// A seat and its customer disagree about the assignment.
    #[error("{seat} and {customer} disagree about their assignment")]
    SeatMismatch {
        /// Seat involved.
        seat: SeatId,
        /// Customer involved.
        customer: CustomerId,
    },
    /// An active order reports more remaining time than its limit.
    #[error("{customer} has {remaining:?} remaining on a {limit:?} order")]
    RemainingExceedsLimit {
        /// Customer owning the order.
        customer: CustomerId,
        /// Reported remaining time.
        remaining: Duration,
        /// Order limit.
        limit: Duration,
    },
    /// An active order survived a tick with no time left.
    #[error("{customer} kept an expired order active")]
    ExpiredOrderActive {
        /// Customer owning the order.
        customer: CustomerId,
    },
    /// The replay buffer holds more frames than allowed.
    #[error("replay buffer holds {len} frames with capacity {capacity}")]
    ReplayOverflow {
        /// Frames held.
        len: usize,
        /// Configured capacity.
        capacity: usize,
    },
    /// The decay source count disagrees with the hostiles present.
    #[error("{registered} decay sources registered for {present} hostiles")]
    DecaySourceMismatch {
        /// Count tracked by the scoring engine.
        registered: u32,
        /// Hostiles present in the session.
        present: usize,
    },
}
