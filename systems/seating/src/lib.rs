#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed seat pool with lowest-index allocation.

use sushi_rush_core::{ConfigError, CustomerId, InvariantViolation, SeatId, ServePoint};
use tracing::debug;

/// Snapshot of a single seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seat {
    id: SeatId,
    serve_point: ServePoint,
    occupant: Option<CustomerId>,
}

impl Seat {
    /// Identifier of the seat.
    #[must_use]
    pub const fn id(&self) -> SeatId {
        self.id
    }

    /// Host location handle where served items are delivered.
    #[must_use]
    pub const fn serve_point(&self) -> ServePoint {
        self.serve_point
    }

    /// Customer currently holding the seat, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<CustomerId> {
        self.occupant
    }

    /// Reports whether the seat can be allocated.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Owns every seat record and enforces single occupancy.
#[derive(Clone, Debug)]
pub struct SeatRegistry {
    seats: Vec<Seat>,
}

impl SeatRegistry {
    /// Creates a registry with one seat per serve point, numbered from zero.
    pub fn new<I>(serve_points: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = ServePoint>,
    {
        let seats: Vec<Seat> = serve_points
            .into_iter()
            .enumerate()
            .map(|(index, serve_point)| Seat {
                id: SeatId::new(u32::try_from(index).unwrap_or(u32::MAX)),
                serve_point,
                occupant: None,
            })
            .collect();

        if seats.is_empty() {
            return Err(ConfigError::NoSeats);
        }

        Ok(Self { seats })
    }

    /// Creates `count` seats whose serve points mirror their index.
    pub fn with_seat_count(count: u32) -> Result<Self, ConfigError> {
        Self::new((0..count).map(|index| ServePoint::new(u64::from(index))))
    }

    /// Hands the lowest-index free seat to `customer`, or `None` when all are taken.
    ///
    /// Exhaustion is not an error: callers retry on a later tick.
    pub fn allocate(&mut self, customer: CustomerId) -> Option<Seat> {
        debug_assert!(
            self.seat_of(customer).is_none(),
            "{customer} already holds a seat"
        );

        let seat = self.seats.iter_mut().find(|seat| seat.is_free())?;
        seat.occupant = Some(customer);
        Some(*seat)
    }

    /// Frees the seat. Releasing a free or unknown seat is a no-op.
    ///
    /// Returns the customer that held the seat.
    pub fn release(&mut self, seat_id: SeatId) -> Option<CustomerId> {
        let Some(seat) = self.slot_mut(seat_id) else {
            debug!(%seat_id, "release ignored for unknown seat");
            return None;
        };

        let previous = seat.occupant.take();
        if previous.is_none() {
            debug!(%seat_id, "release ignored for free seat");
        }
        previous
    }

    /// Frees every seat.
    pub fn release_all(&mut self) {
        for seat in &mut self.seats {
            seat.occupant = None;
        }
    }

    /// Snapshot of the seat with the provided id.
    #[must_use]
    pub fn seat(&self, seat_id: SeatId) -> Option<Seat> {
        self.slot(seat_id).copied()
    }

    /// Customer holding the seat, if the seat exists and is occupied.
    #[must_use]
    pub fn occupant(&self, seat_id: SeatId) -> Option<CustomerId> {
        self.slot(seat_id).and_then(Seat::occupant)
    }

    /// Seat currently held by `customer`.
    #[must_use]
    pub fn seat_of(&self, customer: CustomerId) -> Option<SeatId> {
        self.seats
            .iter()
            .find(|seat| seat.occupant == Some(customer))
            .map(Seat::id)
    }

    /// Iterator over every seat in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter()
    }

    /// Total number of seats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Always `false`; registries are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Number of seats available for allocation.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.iter().filter(|seat| seat.is_free()).count()
    }

    /// Verifies that no customer holds two seats.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let seats = &self.seats;
        for (index, seat) in seats.iter().enumerate() {
            let Some(customer) = seat.occupant else {
                continue;
            };
            if let Some(other) = seats[index + 1..]
                .iter()
                .find(|other| other.occupant == Some(customer))
            {
                return Err(InvariantViolation::CustomerInTwoSeats {
                    customer,
                    first: seat.id,
                    second: other.id,
                });
            }
        }
        Ok(())
    }

    fn slot(&self, seat_id: SeatId) -> Option<&Seat> {
        let index = usize::try_from(seat_id.get()).ok()?;
        self.seats.get(index)
    }

    fn slot_mut(&mut self, seat_id: SeatId) -> Option<&mut Seat> {
        let index = usize::try_from(seat_id.get()).ok()?;
        self.seats.get_mut(index)
    }
}
