use crate::models::DbId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Everything a seat booking can fail with. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    /// Zero or several of the mutually exclusive seat specifications were given.
    #[error("{0}")]
    InputShape(String),

    #[error("Row {row} does not exist: the airplane has {rows} rows")]
    RowOutOfBounds { row: u32, rows: u32 },

    #[error("Seat {seat} does not exist: the airplane has {seats_in_row} seats per row")]
    SeatOutOfBounds { seat: u32, seats_in_row: u32 },

    #[error("Seat already booked: row {row}, seat {seat}")]
    AlreadyBooked { row: u32, seat: u32 },

    /// The ticket uniqueness constraint rejected the insert at commit time.
    #[error("Seat already booked")]
    CommitConflict,

    #[error("Not enough available seats: requested {requested}, available {available}")]
    Capacity { requested: usize, available: usize },

    #[error("Source and destination airports cannot be the same")]
    SameAirports,

    #[error("No flight found for this route ({source_id} -> {destination_id})")]
    NoFlightForRoute { source_id: DbId, destination_id: DbId },

    #[error("Flight with id {0} not found")]
    FlightNotFound(DbId),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BookingError {
    /// Failures a fresh occupancy snapshot could resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::CommitConflict)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::InputShape(_) => "INPUT_SHAPE",
            BookingError::RowOutOfBounds { .. } | BookingError::SeatOutOfBounds { .. } => "OUT_OF_BOUNDS",
            BookingError::AlreadyBooked { .. } | BookingError::CommitConflict => "SEAT_CONFLICT",
            BookingError::Capacity { .. } => "CAPACITY",
            BookingError::SameAirports => "INVALID_ROUTE",
            BookingError::NoFlightForRoute { .. } | BookingError::FlightNotFound(_) => "NOT_FOUND",
            BookingError::Core(_) => "INTERNAL",
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
