use std::sync::Arc;

use aerodesk_core::models::{DbId, FlightSummary};
use aerodesk_core::repository::FlightRepository;
use aerodesk_core::{BookingError, BookingResult, BookingTarget};

/// Maps a [`BookingTarget`] to the concrete flight a booking goes against.
#[derive(Clone)]
pub struct FlightResolver {
    flights: Arc<dyn FlightRepository>,
}

impl FlightResolver {
    pub fn new(flights: Arc<dyn FlightRepository>) -> Self {
        Self { flights }
    }

    pub async fn resolve(&self, target: BookingTarget) -> BookingResult<FlightSummary> {
        match target {
            BookingTarget::Flight(id) => self
                .flights
                .flight_summary(id)
                .await?
                .ok_or(BookingError::FlightNotFound(id)),
            BookingTarget::Route { source, destination } => self.first_on_route(source, destination).await,
        }
    }

    /// Earliest-departing flight on the route. Full flights are not skipped: the
    /// allocator reports them as out of capacity.
    async fn first_on_route(&self, source: DbId, destination: DbId) -> BookingResult<FlightSummary> {
        if source == destination {
            return Err(BookingError::SameAirports);
        }
        self.flights
            .flights_for_route(source, destination)
            .await?
            .into_iter()
            .next()
            .ok_or(BookingError::NoFlightForRoute { source_id: source, destination_id: destination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerodesk_core::models::*;
    use aerodesk_core::repository::{AirportRepository, FleetRepository};
    use aerodesk_store::InMemoryStore;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    async fn airport(store: &InMemoryStore, name: &str) -> DbId {
        store
            .create_airport(&AirportInput {
                name: name.into(),
                city: name.into(),
                country: "Ukraine".into(),
                closest_big_city: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_route_picks_earliest_departure() {
        let store = InMemoryStore::new();
        let kyiv = airport(&store, "Kyiv").await;
        let lviv = airport(&store, "Lviv").await;
        let route = store
            .create_route(&RouteInput { source_id: kyiv, destination_id: lviv, distance: 470, flight_number: "AD7".into() })
            .await
            .unwrap();
        let kind = store.create_airplane_type(&AirplaneTypeInput { name: "Regional".into() }).await.unwrap();
        let plane = store
            .create_airplane(&AirplaneInput { name: "E190".into(), rows: 1, seats_in_row: 1, airplane_type_id: kind.id })
            .await
            .unwrap();

        let now = Utc::now();
        let mut ids = Vec::new();
        for hours in [5, 2] {
            let flight = store
                .create_flight(&FlightSchedule {
                    route_id: route.id,
                    airplane_id: plane.id,
                    departure_time: now + Duration::hours(hours),
                    arrival_time: now + Duration::hours(hours + 1),
                    crew_ids: vec![],
                })
                .await
                .unwrap();
            ids.push(flight.id);
        }

        let resolver = FlightResolver::new(Arc::new(store));
        let resolved = resolver.resolve(BookingTarget::Route { source: kyiv, destination: lviv }).await.unwrap();
        assert_eq!(resolved.id, ids[1]);

        let reverse = resolver.resolve(BookingTarget::Route { source: lviv, destination: kyiv }).await;
        assert_matches!(reverse, Err(BookingError::NoFlightForRoute { .. }));
    }

    #[tokio::test]
    async fn test_same_airports_rejected() {
        let resolver = FlightResolver::new(Arc::new(InMemoryStore::new()));
        let result = resolver.resolve(BookingTarget::Route { source: 4, destination: 4 }).await;
        assert_matches!(result, Err(BookingError::SameAirports));
    }

    #[tokio::test]
    async fn test_unknown_flight_id() {
        let resolver = FlightResolver::new(Arc::new(InMemoryStore::new()));
        let result = resolver.resolve(BookingTarget::Flight(42)).await;
        assert_matches!(result, Err(BookingError::FlightNotFound(42)));
    }
}
