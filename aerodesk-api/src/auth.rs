use aerodesk_core::models::Role;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::{issue_token, Claims},
    state::AppState,
};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/guest", post(login_guest))
}

async fn login_guest(State(state): State<AppState>) -> AppResult<Json<AuthResponse>> {
    let claims = Claims::new(format!("guest-{}", Uuid::new_v4()), None, Role::Customer, &state.auth);
    let token = issue_token(&claims, &state.auth)?;
    tracing::debug!(subject = %claims.sub, "Issued guest token");
    Ok(Json(AuthResponse { token }))
}
