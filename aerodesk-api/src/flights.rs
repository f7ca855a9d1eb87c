use std::convert::Infallible;

use aerodesk_core::models::{Crew, CrewInput, DbId, Flight, FlightInput};
use aerodesk_core::seating::RowAvailability;
use aerodesk_core::CoreError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    error::AppResult,
    middleware::{AdminUser, CurrentUser},
    state::AppState,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FlightSeatsResponse {
    pub id: DbId,
    pub source: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub available_seats: u32,
    pub available_rows: Vec<RowAvailability>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/crew", get(list_crew).post(create_crew))
        .route("/crew/{id}", get(get_crew).put(update_crew).delete(delete_crew))
        .route("/flights", get(list_flights).post(create_flight))
        .route("/flights/{id}", get(get_flight).put(update_flight).delete(delete_flight))
        .route("/flights/{id}/flight_seats", get(flight_seats))
        .route("/flights/{id}/stream", get(stream_bookings))
}

// ============================================================================
// Seat availability
// ============================================================================

/// Availability is computed from a fresh occupancy read on every call.
pub async fn flight_seats(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<FlightSeatsResponse>> {
    let flight = state
        .flights
        .flight_summary(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Flight", id })?;
    let occupied = state.flights.occupied_seats(id).await?;
    let availability = flight.grid()?.availability(&occupied);

    Ok(Json(FlightSeatsResponse {
        id: flight.id,
        source: flight.source,
        destination: flight.destination,
        departure_time: flight.departure_time,
        arrival_time: flight.arrival_time,
        available_seats: availability.available_seats,
        available_rows: availability.available_rows,
    }))
}

async fn stream_bookings(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if state.flights.get_flight(id).await?.is_none() {
        return Err(CoreError::NotFound { entity: "Flight", id }.into());
    }

    let rx = state.sse_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.flight_id == id => {
                Event::default().event(event.event_name()).json_data(&event).ok().map(Ok::<_, Infallible>)
            }
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(flight_id = id, error = %err, "Booking stream subscriber lagged");
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ============================================================================
// Crew
// ============================================================================

async fn list_crew(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Crew>>> {
    Ok(Json(state.flights.list_crew().await?))
}

async fn get_crew(State(state): State<AppState>, _user: CurrentUser, Path(id): Path<DbId>) -> AppResult<Json<Crew>> {
    let crew = state.flights.get_crew(id).await?.ok_or(CoreError::NotFound { entity: "Crew", id })?;
    Ok(Json(crew))
}

async fn create_crew(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<CrewInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Crew>)> {
    let Json(input) = payload?;
    input.validate()?;
    Ok((StatusCode::CREATED, Json(state.flights.create_crew(&input).await?)))
}

async fn update_crew(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
    payload: Result<Json<CrewInput>, JsonRejection>,
) -> AppResult<Json<Crew>> {
    let Json(input) = payload?;
    input.validate()?;
    let crew = state.flights.update_crew(id, &input).await?.ok_or(CoreError::NotFound { entity: "Crew", id })?;
    Ok(Json(crew))
}

async fn delete_crew(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if !state.flights.delete_crew(id).await? {
        return Err(CoreError::NotFound { entity: "Crew", id }.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Flights
// ============================================================================

async fn list_flights(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Flight>>> {
    Ok(Json(state.flights.list_flights().await?))
}

async fn get_flight(State(state): State<AppState>, _user: CurrentUser, Path(id): Path<DbId>) -> AppResult<Json<Flight>> {
    let flight = state.flights.get_flight(id).await?.ok_or(CoreError::NotFound { entity: "Flight", id })?;
    Ok(Json(flight))
}

async fn create_flight(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<FlightInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Flight>)> {
    let Json(input) = payload?;
    let schedule = input.into_schedule(Utc::now())?;
    let flight = state.flights.create_flight(&schedule).await?;
    tracing::info!(flight_id = flight.id, route_id = flight.route_id, "Flight scheduled");
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn update_flight(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
    payload: Result<Json<FlightInput>, JsonRejection>,
) -> AppResult<Json<Flight>> {
    let Json(input) = payload?;
    let schedule = input.into_schedule(Utc::now())?;
    let flight = state
        .flights
        .update_flight(id, &schedule)
        .await?
        .ok_or(CoreError::NotFound { entity: "Flight", id })?;
    Ok(Json(flight))
}

async fn delete_flight(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if !state.flights.delete_flight(id).await? {
        return Err(CoreError::NotFound { entity: "Flight", id }.into());
    }
    Ok(StatusCode::NO_CONTENT)
}
