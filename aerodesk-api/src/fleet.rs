use aerodesk_core::models::{Airplane, AirplaneInput, AirplaneType, AirplaneTypeInput, DbId};
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
        .route("/airplane_types", get(list_airplane_types).post(create_airplane_type))
        .route(
            "/airplane_types/{id}",
            get(get_airplane_type).put(update_airplane_type).delete(delete_airplane_type),
        )
        .route("/airplanes", get(list_airplanes).post(create_airplane))
        .route("/airplanes/{id}", get(get_airplane).put(update_airplane).delete(delete_airplane))
}

async fn list_airplane_types(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<AirplaneType>>> {
    Ok(Json(state.fleet.list_airplane_types().await?))
}

async fn get_airplane_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<AirplaneType>> {
    let airplane_type = state
        .fleet
        .get_airplane_type(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "AirplaneType", id })?;
    Ok(Json(airplane_type))
}

async fn create_airplane_type(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<AirplaneTypeInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AirplaneType>)> {
    let Json(input) = payload?;
    input.validate()?;
    Ok((StatusCode::CREATED, Json(state.fleet.create_airplane_type(&input).await?)))
}

async fn update_airplane_type(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
    payload: Result<Json<AirplaneTypeInput>, JsonRejection>,
) -> AppResult<Json<AirplaneType>> {
    let Json(input) = payload?;
    input.validate()?;
    let airplane_type = state
        .fleet
        .update_airplane_type(id, &input)
        .await?
        .ok_or(CoreError::NotFound { entity: "AirplaneType", id })?;
    Ok(Json(airplane_type))
}

async fn delete_airplane_type(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.fleet.delete_airplane_type(id).await? {
        return Err(CoreError::NotFound { entity: "AirplaneType", id }.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_airplanes(State(state): State<AppState>, _user: CurrentUser) -> AppResult<Json<Vec<Airplane>>> {
    Ok(Json(state.fleet.list_airplanes().await?))
}

async fn get_airplane(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<Airplane>> {
    let airplane = state.fleet.get_airplane(id).await?.ok_or(CoreError::NotFound { entity: "Airplane", id })?;
    Ok(Json(airplane))
}

async fn create_airplane(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<AirplaneInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Airplane>)> {
    let Json(input) = payload?;
    input.validate()?;
    let airplane = state.fleet.create_airplane(&input).await?;
    tracing::info!(airplane_id = airplane.id, total_seats = airplane.total_seats(), "Airplane created");
    Ok((StatusCode::CREATED, Json(airplane)))
}

async fn update_airplane(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<DbId>,
    payload: Result<Json<AirplaneInput>, JsonRejection>,
) -> AppResult<Json<Airplane>> {
    let Json(input) = payload?;
    input.validate()?;
    let airplane = state
        .fleet
        .update_airplane(id, &input)
        .await?
        .ok_or(CoreError::NotFound { entity: "Airplane", id })?;
    Ok(Json(airplane))
}

async fn delete_airplane(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if !state.fleet.delete_airplane(id).await? {
        return Err(CoreError::NotFound { entity: "Airplane", id }.into());
    }
    Ok(StatusCode::NO_CONTENT)
}
