use aerodesk_core::{BookingError, CoreError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Booking(BookingError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            AppError::NotFoundError(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::ConflictError(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::InternalServerError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            AppError::Booking(err) => match err {
                BookingError::FlightNotFound(_) | BookingError::NoFlightForRoute { .. } => {
                    (StatusCode::NOT_FOUND, err.kind())
                }
                _ => (StatusCode::BAD_REQUEST, err.kind()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_message = match self {
            AppError::AuthenticationError(msg)
            | AppError::AuthorizationError(msg)
            | AppError::ValidationError(msg)
            | AppError::NotFoundError(msg)
            | AppError::ConflictError(msg) => msg,
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::Booking(err) => err.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => AppError::ValidationError(msg),
            CoreError::NotFound { .. } => AppError::NotFoundError(err.to_string()),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            CoreError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Core(core) => core.into(),
            other => AppError::Booking(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerodesk_core::models::DbId;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_booking_errors_map_to_client_errors() {
        assert_eq!(status_of(BookingError::CommitConflict), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BookingError::SameAirports), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BookingError::Capacity { requested: 3, available: 1 }), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BookingError::FlightNotFound(9)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(BookingError::NoFlightForRoute { source_id: 1, destination_id: 2 }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_core_errors_keep_their_meaning_inside_booking_errors() {
        let id: DbId = 5;
        assert_eq!(
            status_of(BookingError::Core(CoreError::NotFound { entity: "Flight", id })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(CoreError::Conflict("dup".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(CoreError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
