use aerodesk_core::models::{BookedOrder, DbId, Requester};
use aerodesk_core::CoreError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{error::AppResult, middleware::CurrentUser, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
}

/// Orders of other owners look exactly like missing ones.
async fn visible_order(state: &AppState, requester: &Requester, id: DbId) -> AppResult<BookedOrder> {
    state
        .orders
        .get_order(id)
        .await?
        .filter(|booked| requester.owner_scope().map_or(true, |owner| booked.order.owner == owner))
        .ok_or_else(|| CoreError::NotFound { entity: "Order", id }.into())
}

async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
) -> AppResult<Json<Vec<BookedOrder>>> {
    Ok(Json(state.orders.list_orders(requester.owner_scope()).await?))
}

async fn get_order(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<BookedOrder>> {
    Ok(Json(visible_order(&state, &requester, id).await?))
}

/// Cancels the order; its tickets go with it.
async fn delete_order(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    visible_order(&state, &requester, id).await?;
    if !state.orders.delete_order(id).await? {
        return Err(CoreError::NotFound { entity: "Order", id }.into());
    }
    tracing::info!(order_id = id, subject = %requester.subject, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
