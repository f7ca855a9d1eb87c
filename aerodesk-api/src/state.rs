use std::sync::Arc;

use aerodesk_core::repository::{AirportRepository, FleetRepository, FlightRepository, OrderRepository};
use aerodesk_order::{BookingMetrics, BookingService, MetricsError};
use aerodesk_shared::models::TicketsBookedEvent;
use aerodesk_store::app_config::BookingConfig;
use aerodesk_store::{DbClient, InMemoryStore, PgAirportRepository, PgFleetRepository, PgFlightRepository, PgOrderRepository};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

/// One handle per repository trait.
#[derive(Clone)]
pub struct Repositories {
    pub airports: Arc<dyn AirportRepository>,
    pub fleet: Arc<dyn FleetRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    pub fn postgres(db: &DbClient) -> Self {
        Self {
            airports: Arc::new(PgAirportRepository::new(db.pool.clone())),
            fleet: Arc::new(PgFleetRepository::new(db.pool.clone())),
            flights: Arc::new(PgFlightRepository::new(db.pool.clone())),
            orders: Arc::new(PgOrderRepository::new(db.pool.clone())),
        }
    }

    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self { airports: store.clone(), fleet: store.clone(), flights: store.clone(), orders: store }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub airports: Arc<dyn AirportRepository>,
    pub fleet: Arc<dyn FleetRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub booking: BookingService,
    pub metrics: Arc<BookingMetrics>,
    pub sse_tx: broadcast::Sender<TicketsBookedEvent>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(repos: Repositories, auth: AuthConfig, booking: &BookingConfig) -> Result<Self, MetricsError> {
        let metrics = Arc::new(BookingMetrics::new()?);
        let (sse_tx, _) = broadcast::channel(booking.event_buffer.max(1));
        let service = BookingService::new(repos.flights.clone(), repos.orders.clone(), metrics.clone(), booking.max_attempts)
            .with_events(sse_tx.clone());

        Ok(Self {
            airports: repos.airports,
            fleet: repos.fleet,
            flights: repos.flights,
            orders: repos.orders,
            booking: service,
            metrics,
            sse_tx,
            auth,
        })
    }
}
