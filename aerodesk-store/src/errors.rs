//! Translation of `sqlx` failures into the domain error types.

use aerodesk_core::models::DbId;
use aerodesk_core::{BookingError, CoreError};

/// Postgres SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign_key_violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
/// Postgres SQLSTATE for check_violation.
pub const CHECK_VIOLATION: &str = "23514";

pub const TICKET_SEAT_CONSTRAINT: &str = "uq_tickets_flight_row_seat";

/// Constraint violations the domain distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    TicketSeat,
    Unique,
    ForeignKey,
    Check,
}

/// Classifies a SQLSTATE and constraint name. `None` for anything that is not a constraint violation.
pub fn classify_violation(code: Option<&str>, constraint: Option<&str>) -> Option<Violation> {
    match code? {
        UNIQUE_VIOLATION if constraint == Some(TICKET_SEAT_CONSTRAINT) => Some(Violation::TicketSeat),
        UNIQUE_VIOLATION => Some(Violation::Unique),
        FOREIGN_KEY_VIOLATION => Some(Violation::ForeignKey),
        CHECK_VIOLATION => Some(Violation::Check),
        _ => None,
    }
}

fn violation_of(err: &sqlx::Error) -> Option<Violation> {
    match err {
        sqlx::Error::Database(database_error) => {
            classify_violation(database_error.code().as_deref(), database_error.constraint())
        }
        _ => None,
    }
}

fn constraint_of(err: &sqlx::Error) -> &str {
    match err {
        sqlx::Error::Database(database_error) => database_error.constraint().unwrap_or("unknown"),
        _ => "unknown",
    }
}

pub fn db_err(err: sqlx::Error) -> CoreError {
    match violation_of(&err) {
        Some(Violation::TicketSeat | Violation::Unique) => {
            CoreError::Conflict(format!("Duplicate value violates unique constraint: {}", constraint_of(&err)))
        }
        Some(Violation::ForeignKey) => {
            CoreError::Validation(format!("Referenced record does not exist ({})", constraint_of(&err)))
        }
        Some(Violation::Check) => {
            CoreError::Validation(format!("Value violates check constraint: {}", constraint_of(&err)))
        }
        None => {
            tracing::error!(error = %err, "Database error");
            CoreError::Internal(err.to_string())
        }
    }
}

/// Like [`db_err`], but the ticket seat constraint becomes a booking conflict.
pub fn booking_db_err(err: sqlx::Error) -> BookingError {
    if violation_of(&err) == Some(Violation::TicketSeat) {
        return BookingError::CommitConflict;
    }
    BookingError::Core(db_err(err))
}

pub fn ticket_outside_grid(row: u32, seat: u32) -> CoreError {
    CoreError::Validation(format!(
        "Grid change would leave the ticket at row {row}, seat {seat} outside the airplane"
    ))
}

pub fn ticketed_flight_airplane(flight_id: DbId) -> CoreError {
    CoreError::Validation(format!("Flight {flight_id} has tickets; its airplane cannot be changed"))
}

/// Grid dimensions and seat numbers are stored as INTEGER.
pub fn to_u32(value: i32, column: &str) -> Result<u32, CoreError> {
    u32::try_from(value).map_err(|_| CoreError::Internal(format!("negative value in column {column}: {value}")))
}

pub fn to_i32(value: u32, field: &str) -> Result<i32, CoreError> {
    i32::try_from(value).map_err(|_| CoreError::Validation(format!("{field} is too large: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_ticket_seat_unique_violation_is_its_own_class() {
        assert_eq!(
            classify_violation(Some("23505"), Some("uq_tickets_flight_row_seat")),
            Some(Violation::TicketSeat)
        );
    }

    #[test]
    fn test_other_unique_violations_stay_generic() {
        assert_eq!(classify_violation(Some("23505"), Some("uq_airports_name_city_country")), Some(Violation::Unique));
        assert_eq!(classify_violation(Some("23505"), None), Some(Violation::Unique));
    }

    #[test]
    fn test_seat_constraint_name_alone_is_not_a_conflict() {
        assert_eq!(
            classify_violation(Some("23514"), Some("uq_tickets_flight_row_seat")),
            Some(Violation::Check)
        );
        assert_eq!(classify_violation(Some("23503"), Some("tickets_order_id_fkey")), Some(Violation::ForeignKey));
    }

    #[test]
    fn test_non_constraint_codes_unclassified() {
        assert_eq!(classify_violation(Some("40001"), None), None);
        assert_eq!(classify_violation(None, Some("uq_tickets_flight_row_seat")), None);
    }

    #[test]
    fn test_row_not_found_is_internal() {
        assert_matches!(booking_db_err(sqlx::Error::RowNotFound), BookingError::Core(CoreError::Internal(_)));
    }
}
