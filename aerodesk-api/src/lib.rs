use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod airports;
pub mod auth;
pub mod error;
pub mod fleet;
pub mod flights;
pub mod middleware;
pub mod ops;
pub mod orders;
pub mod state;
pub mod tickets;

pub use state::{AppState, AuthConfig, Repositories};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(auth::routes())
        .merge(airports::routes())
        .merge(fleet::routes())
        .merge(flights::routes())
        .merge(tickets::routes())
        .merge(orders::routes())
        .merge(ops::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
