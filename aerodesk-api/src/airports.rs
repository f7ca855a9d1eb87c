use aerodesk_core::models::{Airport, AirportInput, DbId, Route, RouteInput};
use aerodesk_core::CoreError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    error::AppResult,
    middleware::{AdminUser, CurrentUser},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/airports", get(list_airports).post(create_airport))
        .route("/airports/{id}", get(get_airport).put(update_airport).delete(delete_airport))
        .route("/routes", get(list_routes).post(create_route))
        .route("/routes/{id}", get(get_route).put(update_route).delete(delete_route))
}

fn not_found(entity: &'static str, id: DbId) -> CoreError {
    CoreError::NotFound { entity, id }
}

// ============================================================================
// Airports
// ============================================================================

async fn list_airports(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Airport>>> {
    Ok(Json(state.airports.list_airports().await?))
}

async fn get_airport(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Airport>> {
    let airport = state.airports.get_airport(id).await?.ok_or(not_found("Airport", id))?;
    Ok(Json(airport))
}

async fn create_airport(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<AirportInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Airport>)> {
    let Json(input) = payload?;
    input.validate()?;
    let airport = state.airports.create_airport(&input).await?;
    tracing::info!(airport_id = airport.id, "Airport created");
    Ok((StatusCode::CREATED, Json(airport)))
}

async fn update_airport(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
    payload: Result<Json<AirportInput>, JsonRejection>,
) -> AppResult<Json<Airport>> {
    let Json(input) = payload?;
    input.validate()?;
    let airport = state.airports.update_airport(id, &input).await?.ok_or(not_found("Airport", id))?;
    Ok(Json(airport))
}

async fn delete_airport(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.airports.delete_airport(id).await? {
        return Err(not_found("Airport", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Routes
// ============================================================================

async fn list_routes(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Route>>> {
    Ok(Json(state.airports.list_routes().await?))
}

async fn get_route(State(state): State<AppState>, _user: CurrentUser, Path(id): Path<DbId>) -> AppResult<Json<Route>> {
    let route = state.airports.get_route(id).await?.ok_or(not_found("Route", id))?;
    Ok(Json(route))
}

async fn create_route(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<RouteInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Route>)> {
    let Json(input) = payload?;
    input.validate()?;
    let route = state.airports.create_route(&input).await?;
    tracing::info!(route_id = route.id, flight_number = %route.flight_number, "Route created");
    Ok((StatusCode::CREATED, Json(route)))
}

async fn update_route(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
    payload: Result<Json<RouteInput>, JsonRejection>,
) -> AppResult<Json<Route>> {
    let Json(input) = payload?;
    input.validate()?;
    let route = state.airports.update_route(id, &input).await?.ok_or(not_found("Route", id))?;
    Ok(Json(route))
}

async fn delete_route(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if !state.airports.delete_route(id).await? {
        return Err(not_found("Route", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
