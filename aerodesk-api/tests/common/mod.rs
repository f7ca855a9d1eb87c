#![allow(dead_code)]

use aerodesk_api::middleware::auth::{issue_token, Claims};
use aerodesk_api::{app, AppState, AuthConfig, Repositories};
use aerodesk_core::models::*;
use aerodesk_core::repository::{AirportRepository, FleetRepository, FlightRepository};
use aerodesk_store::app_config::BookingConfig;
use aerodesk_store::InMemoryStore;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: InMemoryStore,
    pub state: AppState,
}

pub fn auth_config() -> AuthConfig {
    AuthConfig { secret: "integration-secret".into(), expiration: 3600 }
}

pub fn build_test_app() -> TestApp {
    let store = InMemoryStore::new();
    let state = AppState::new(Repositories::in_memory(store.clone()), auth_config(), &BookingConfig::default())
        .expect("metrics registry");
    TestApp { router: app(state.clone()), store, state }
}

pub fn token(subject: &str, role: Role) -> String {
    let auth = auth_config();
    issue_token(&Claims::new(subject.into(), None, role, &auth), &auth).unwrap()
}

pub fn customer_token(subject: &str) -> String {
    token(subject, Role::Customer)
}

pub fn admin_token() -> String {
    token("ops", Role::Admin)
}

pub async fn send(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder.header(CONTENT_TYPE, "application/json").body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn call(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let response = send(router, method, uri, token, body).await;
    let status = response.status();
    (status, body_json(response).await)
}

pub struct SeededFlight {
    pub flight_id: DbId,
    pub route_id: DbId,
    pub airplane_id: DbId,
    pub airplane_type_id: DbId,
    pub source: DbId,
    pub destination: DbId,
}

/// One route with one flight departing in two hours on a `rows` x `seats_in_row` airplane.
pub async fn seed_flight(store: &InMemoryStore, rows: u32, seats_in_row: u32) -> SeededFlight {
    let source = store
        .create_airport(&AirportInput {
            name: "Boryspil".into(),
            city: "Kyiv".into(),
            country: "Ukraine".into(),
            closest_big_city: None,
        })
        .await
        .unwrap();
    let destination = store
        .create_airport(&AirportInput {
            name: "Frankfurt".into(),
            city: "Frankfurt".into(),
            country: "Germany".into(),
            closest_big_city: None,
        })
        .await
        .unwrap();
    let route = store
        .create_route(&RouteInput {
            source_id: source.id,
            destination_id: destination.id,
            distance: 1650,
            flight_number: "AD201".into(),
        })
        .await
        .unwrap();
    let kind = store.create_airplane_type(&AirplaneTypeInput { name: "Narrowbody".into() }).await.unwrap();
    let airplane = store
        .create_airplane(&AirplaneInput { name: "A321".into(), rows, seats_in_row, airplane_type_id: kind.id })
        .await
        .unwrap();
    let now = Utc::now();
    let flight = store
        .create_flight(&FlightSchedule {
            route_id: route.id,
            airplane_id: airplane.id,
            departure_time: now + Duration::hours(2),
            arrival_time: now + Duration::hours(5),
            crew_ids: vec![],
        })
        .await
        .unwrap();

    SeededFlight {
        flight_id: flight.id,
        route_id: route.id,
        airplane_id: airplane.id,
        airplane_type_id: kind.id,
        source: source.id,
        destination: destination.id,
    }
}
