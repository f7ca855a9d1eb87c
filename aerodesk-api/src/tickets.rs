use aerodesk_core::models::{DbId, FlightSummary, Order, ServedRoute, Ticket};
use aerodesk_core::{BookingError, BookingResult, BookingTarget, CoreError, SeatSpec};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, flights::flight_seats, middleware::CurrentUser, state::AppState};

const UPCOMING_FLIGHTS_LIMIT: usize = 10;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Booking against a known flight. The seat fields follow [`SeatSpec`].
#[derive(Debug, Deserialize)]
pub struct FlightBookingRequest {
    pub flight_id: DbId,
    #[serde(flatten)]
    pub seats: SeatSpec,
}

/// Booking against the earliest flight between two airports, or against `flight` directly.
#[derive(Debug, Deserialize)]
pub struct RouteBookingRequest {
    #[serde(default, alias = "flight_id")]
    pub flight: Option<DbId>,
    #[serde(default)]
    pub source: Option<DbId>,
    #[serde(default)]
    pub destination: Option<DbId>,
    #[serde(flatten)]
    pub seats: SeatSpec,
}

impl RouteBookingRequest {
    pub fn target(&self) -> BookingResult<BookingTarget> {
        match (self.flight, self.source, self.destination) {
            (Some(id), None, None) => Ok(BookingTarget::Flight(id)),
            (None, Some(source), Some(destination)) => Ok(BookingTarget::Route { source, destination }),
            _ => Err(BookingError::InputShape(
                "Specify either `flight` or both `source` and `destination`".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookedTicketsResponse {
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize)]
pub struct TicketDetailResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub flight: Option<FlightSummary>,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct AirportOption {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UpcomingFlight {
    pub id: DbId,
    pub source: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub available_seats: u32,
}

#[derive(Debug, Serialize)]
pub struct BookingInfoResponse {
    #[serde(rename = "airports_list")]
    pub airports: Vec<AirportOption>,
    #[serde(rename = "routes_list")]
    pub routes: Vec<ServedRoute>,
    #[serde(rename = "upcoming_flights")]
    pub flights: Vec<UpcomingFlight>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list_tickets).post(create_tickets))
        .route("/tickets/book_seats", post(book_seats))
        .route("/tickets/book_by_route", post(book_by_route))
        .route("/tickets/booking_info", get(booking_info))
        .route("/tickets/{id}", get(get_ticket))
        .route("/tickets/{id}/flight_seats", get(flight_seats))
}

// ============================================================================
// Booking
// ============================================================================

/// Simple create: `{flight_id, seat}` or `{flight_id, seats: [n, ...]}`.
async fn create_tickets(
    state: State<AppState>,
    user: CurrentUser,
    payload: Result<Json<FlightBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Vec<Ticket>>)> {
    book_seats(state, user, payload).await
}

async fn book_seats(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    payload: Result<Json<FlightBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Vec<Ticket>>)> {
    let Json(body) = payload?;
    let request = body.seats.into_request()?;
    let booked = state.booking.book(&requester, BookingTarget::Flight(body.flight_id), request).await?;
    Ok((StatusCode::CREATED, Json(booked.tickets)))
}

async fn book_by_route(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    payload: Result<Json<RouteBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<BookedTicketsResponse>)> {
    let Json(body) = payload?;
    let target = body.target()?;
    let request = body.seats.into_request()?;
    let booked = state.booking.book(&requester, target, request).await?;
    Ok((StatusCode::CREATED, Json(BookedTicketsResponse { tickets: booked.tickets })))
}

// ============================================================================
// Reads
// ============================================================================

async fn list_tickets(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
) -> AppResult<Json<Vec<Ticket>>> {
    Ok(Json(state.orders.list_tickets(requester.owner_scope()).await?))
}

async fn get_ticket(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<TicketDetailResponse>> {
    let (ticket, order) = state
        .orders
        .get_ticket(id)
        .await?
        .filter(|(_, order)| requester.owner_scope().map_or(true, |owner| order.owner == owner))
        .ok_or(CoreError::NotFound { entity: "Ticket", id })?;

    let flight = state.flights.flight_summary(ticket.flight_id).await?;
    Ok(Json(TicketDetailResponse { ticket, flight, order }))
}

async fn booking_info(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<BookingInfoResponse>> {
    let airports = state
        .airports
        .list_airports()
        .await?
        .into_iter()
        .map(|airport| AirportOption { id: airport.id, name: airport.name })
        .collect();
    let routes = state.flights.served_routes().await?;

    let mut flights = Vec::new();
    for summary in state.flights.upcoming_flights(Utc::now(), UPCOMING_FLIGHTS_LIMIT).await? {
        let occupied = state.flights.occupied_seats(summary.id).await?;
        flights.push(UpcomingFlight {
            available_seats: summary.grid()?.available_count(&occupied),
            id: summary.id,
            source: summary.source,
            destination: summary.destination,
            departure_time: summary.departure_time,
            arrival_time: summary.arrival_time,
        });
    }

    Ok(Json(BookingInfoResponse { airports, routes, flights }))
}
