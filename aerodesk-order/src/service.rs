//! Booking orchestration: resolve the flight, run the transactional booking, retry lost
//! races and announce the result.

use std::sync::Arc;

use aerodesk_core::models::{BookedOrder, FlightSummary, Requester};
use aerodesk_core::repository::{FlightRepository, OrderRepository};
use aerodesk_core::{BookingError, BookingResult, BookingTarget, SeatRequest};
use aerodesk_shared::models::{BookedSeat, TicketsBookedEvent};
use tokio::sync::broadcast;

use crate::metrics::BookingMetrics;
use crate::resolver::FlightResolver;

#[derive(Clone)]
pub struct BookingService {
    resolver: FlightResolver,
    flights: Arc<dyn FlightRepository>,
    orders: Arc<dyn OrderRepository>,
    metrics: Arc<BookingMetrics>,
    max_attempts: u32,
    events: Option<broadcast::Sender<TicketsBookedEvent>>,
}

impl BookingService {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        orders: Arc<dyn OrderRepository>,
        metrics: Arc<BookingMetrics>,
        max_attempts: u32,
    ) -> Self {
        Self {
            resolver: FlightResolver::new(flights.clone()),
            flights,
            orders,
            metrics,
            max_attempts: max_attempts.max(1),
            events: None,
        }
    }

    /// Publish a [`TicketsBookedEvent`] on `sender` after every committed booking.
    pub fn with_events(mut self, sender: broadcast::Sender<TicketsBookedEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Books `request` on the flight `target` resolves to, for `requester`.
    ///
    /// Either every requested ticket is persisted under one new order, or nothing is.
    pub async fn book(
        &self,
        requester: &Requester,
        target: BookingTarget,
        request: SeatRequest,
    ) -> BookingResult<BookedOrder> {
        match self.try_book(requester, target, &request).await {
            Ok((flight, booked)) => {
                self.metrics.record_booked(booked.tickets.len());
                tracing::info!(
                    order_id = booked.order.id,
                    flight_id = flight.id,
                    tickets = booked.tickets.len(),
                    "Booking committed"
                );
                self.publish(&flight, &booked).await;
                Ok(booked)
            }
            Err(err) => {
                self.metrics.record_rejected(err.kind());
                match &err {
                    BookingError::Core(core) => tracing::error!(error = %core, "Booking failed"),
                    _ => tracing::info!(kind = err.kind(), error = %err, "Booking rejected"),
                }
                Err(err)
            }
        }
    }

    async fn try_book(
        &self,
        requester: &Requester,
        target: BookingTarget,
        request: &SeatRequest,
    ) -> BookingResult<(FlightSummary, BookedOrder)> {
        let flight = self.resolver.resolve(target).await?;

        let mut attempt = 1;
        loop {
            match self.orders.book_seats(requester, flight.id, request).await {
                Ok(booked) => return Ok((flight, booked)),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(flight_id = flight.id, attempt, "Seat taken at commit, retrying");
                    self.metrics.record_conflict_retry();
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn publish(&self, flight: &FlightSummary, booked: &BookedOrder) {
        let Some(sender) = &self.events else {
            return;
        };

        let remaining_seats = match (flight.grid(), self.flights.occupied_seats(flight.id).await) {
            (Ok(grid), Ok(occupied)) => grid.available_count(&occupied),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(flight_id = flight.id, error = %err, "Skipping booking event");
                return;
            }
        };

        let event = TicketsBookedEvent {
            order_id: booked.order.id,
            flight_id: flight.id,
            seats: booked
                .tickets
                .iter()
                .map(|t| BookedSeat { ticket_id: t.id, row: t.row, seat: t.seat })
                .collect(),
            remaining_seats,
            booked_at: booked.order.created_at,
        };

        if sender.send(event).is_err() {
            tracing::debug!(flight_id = flight.id, "No booking event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerodesk_core::models::*;
    use aerodesk_core::repository::{AirportRepository, FleetRepository};
    use aerodesk_core::SeatPair;
    use aerodesk_store::InMemoryStore;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    struct Fixture {
        store: InMemoryStore,
        service: BookingService,
        metrics: Arc<BookingMetrics>,
        flight_id: DbId,
        source: DbId,
        destination: DbId,
    }

    async fn fixture(rows: u32, seats_in_row: u32) -> Fixture {
        let store = InMemoryStore::new();
        let mut airports = Vec::new();
        for name in ["Boryspil", "Schiphol"] {
            let airport = store
                .create_airport(&AirportInput {
                    name: name.into(),
                    city: name.into(),
                    country: "EU".into(),
                    closest_big_city: None,
                })
                .await
                .unwrap();
            airports.push(airport.id);
        }
        let route = store
            .create_route(&RouteInput {
                source_id: airports[0],
                destination_id: airports[1],
                distance: 1800,
                flight_number: "AD42".into(),
            })
            .await
            .unwrap();
        let kind = store.create_airplane_type(&AirplaneTypeInput { name: "Narrowbody".into() }).await.unwrap();
        let plane = store
            .create_airplane(&AirplaneInput { name: "B737".into(), rows, seats_in_row, airplane_type_id: kind.id })
            .await
            .unwrap();
        let now = Utc::now();
        let flight = store
            .create_flight(&FlightSchedule {
                route_id: route.id,
                airplane_id: plane.id,
                departure_time: now + Duration::hours(3),
                arrival_time: now + Duration::hours(6),
                crew_ids: vec![],
            })
            .await
            .unwrap();

        let metrics = Arc::new(BookingMetrics::new().unwrap());
        let shared = Arc::new(store.clone());
        let service = BookingService::new(shared.clone(), shared, metrics.clone(), 3);
        Fixture { store, service, metrics, flight_id: flight.id, source: airports[0], destination: airports[1] }
    }

    fn guest() -> Requester {
        Requester { subject: "guest-1".into(), email: None, role: Role::Customer }
    }

    async fn available(fx: &Fixture) -> u32 {
        let summary = fx.store.flight_summary(fx.flight_id).await.unwrap().unwrap();
        let occupied = fx.store.occupied_seats(fx.flight_id).await.unwrap();
        summary.grid().unwrap().available_count(&occupied)
    }

    #[tokio::test]
    async fn test_booking_reduces_availability_by_ticket_count() {
        let fx = fixture(3, 4).await;
        let before = available(&fx).await;

        let booked = fx
            .service
            .book(&guest(), BookingTarget::Flight(fx.flight_id), SeatRequest::SeatNumbers(vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(booked.tickets.len(), 3);
        assert_eq!(available(&fx).await, before - 3);
        assert_eq!(booked.order.owner, "guest-1");
        assert_eq!(fx.metrics.booked_count(), 1);
    }

    #[tokio::test]
    async fn test_conflict_leaves_no_order() {
        let fx = fixture(2, 2).await;
        let target = BookingTarget::Flight(fx.flight_id);
        fx.service
            .book(&guest(), target, SeatRequest::Explicit(vec![SeatPair::new(2, 2)]))
            .await
            .unwrap();

        let result = fx
            .service
            .book(&guest(), target, SeatRequest::Explicit(vec![SeatPair::new(1, 1), SeatPair::new(2, 2)]))
            .await;

        assert_matches!(result, Err(BookingError::AlreadyBooked { row: 2, seat: 2 }));
        assert_eq!(fx.store.order_count().await, 1);
        assert_eq!(fx.store.ticket_count().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_bounds_has_no_side_effects() {
        let fx = fixture(2, 2).await;
        let target = BookingTarget::Flight(fx.flight_id);

        let row = fx.service.book(&guest(), target, SeatRequest::Explicit(vec![SeatPair::new(3, 1)])).await;
        assert_matches!(row, Err(BookingError::RowOutOfBounds { row: 3, rows: 2 }));

        let seat = fx.service.book(&guest(), target, SeatRequest::SeatNumbers(vec![1, 5])).await;
        assert_matches!(seat, Err(BookingError::SeatOutOfBounds { seat: 5, seats_in_row: 2 }));

        assert_eq!(fx.store.order_count().await, 0);
        assert_eq!(available(&fx).await, 4);
    }

    #[tokio::test]
    async fn test_capacity_exceeded() {
        let fx = fixture(1, 2).await;
        let result = fx
            .service
            .book(&guest(), BookingTarget::Flight(fx.flight_id), SeatRequest::SeatNumbers(vec![1, 2, 1]))
            .await;
        assert_matches!(result, Err(BookingError::Capacity { requested: 3, available: 2 }));
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_route_booking_uses_scheduled_flight() {
        let fx = fixture(2, 3).await;
        let booked = fx
            .service
            .book(
                &guest(),
                BookingTarget::Route { source: fx.source, destination: fx.destination },
                SeatRequest::SeatNumber(2),
            )
            .await
            .unwrap();
        assert_eq!(booked.tickets[0].flight_id, fx.flight_id);
        assert_eq!(booked.tickets[0].pair(), SeatPair::new(1, 2));

        let missing = fx
            .service
            .book(
                &guest(),
                BookingTarget::Route { source: fx.destination, destination: fx.source },
                SeatRequest::SeatNumber(2),
            )
            .await;
        assert_matches!(missing, Err(BookingError::NoFlightForRoute { .. }));
    }

    #[tokio::test]
    async fn test_commit_conflict_is_retried() {
        let fx = fixture(2, 2).await;
        fx.store.inject_commit_conflicts(2).await;

        let booked = fx
            .service
            .book(&guest(), BookingTarget::Flight(fx.flight_id), SeatRequest::SeatNumber(1))
            .await
            .unwrap();

        assert_eq!(booked.tickets.len(), 1);
        assert_eq!(fx.metrics.conflict_retry_count(), 2);
        assert_eq!(fx.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_commit_conflict_surfaces_after_max_attempts() {
        let fx = fixture(2, 2).await;
        fx.store.inject_commit_conflicts(5).await;

        let result = fx
            .service
            .book(&guest(), BookingTarget::Flight(fx.flight_id), SeatRequest::SeatNumber(1))
            .await;

        assert_matches!(result, Err(BookingError::CommitConflict));
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_event_published_with_remaining_seats() {
        let fx = fixture(2, 2).await;
        let (tx, mut rx) = broadcast::channel(8);
        let service = fx.service.clone().with_events(tx);

        let booked = service
            .book(&guest(), BookingTarget::Flight(fx.flight_id), SeatRequest::SeatNumbers(vec![1, 2]))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.order_id, booked.order.id);
        assert_eq!(event.flight_id, fx.flight_id);
        assert_eq!(event.seats.len(), 2);
        assert_eq!(event.remaining_seats, 2);
    }
}
