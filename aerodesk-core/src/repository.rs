use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{BookingResult, CoreResult};
use crate::models::*;
use crate::request::SeatRequest;
use crate::seating::OccupancySet;

/// Repository trait for airports and the routes between them
#[async_trait]
pub trait AirportRepository: Send + Sync {
    async fn list_airports(&self) -> CoreResult<Vec<Airport>>;
    async fn get_airport(&self, id: DbId) -> CoreResult<Option<Airport>>;
    async fn create_airport(&self, input: &AirportInput) -> CoreResult<Airport>;
    async fn update_airport(&self, id: DbId, input: &AirportInput) -> CoreResult<Option<Airport>>;
    async fn delete_airport(&self, id: DbId) -> CoreResult<bool>;

    async fn list_routes(&self) -> CoreResult<Vec<Route>>;
    async fn get_route(&self, id: DbId) -> CoreResult<Option<Route>>;
    async fn create_route(&self, input: &RouteInput) -> CoreResult<Route>;
    async fn update_route(&self, id: DbId, input: &RouteInput) -> CoreResult<Option<Route>>;
    async fn delete_route(&self, id: DbId) -> CoreResult<bool>;
}

/// Repository trait for airplanes and airplane types
#[async_trait]
pub trait FleetRepository: Send + Sync {
    async fn list_airplane_types(&self) -> CoreResult<Vec<AirplaneType>>;
    async fn get_airplane_type(&self, id: DbId) -> CoreResult<Option<AirplaneType>>;
    async fn create_airplane_type(&self, input: &AirplaneTypeInput) -> CoreResult<AirplaneType>;
    async fn update_airplane_type(&self, id: DbId, input: &AirplaneTypeInput) -> CoreResult<Option<AirplaneType>>;
    async fn delete_airplane_type(&self, id: DbId) -> CoreResult<bool>;

    async fn list_airplanes(&self) -> CoreResult<Vec<Airplane>>;
    async fn get_airplane(&self, id: DbId) -> CoreResult<Option<Airplane>>;
    async fn create_airplane(&self, input: &AirplaneInput) -> CoreResult<Airplane>;
    async fn update_airplane(&self, id: DbId, input: &AirplaneInput) -> CoreResult<Option<Airplane>>;
    async fn delete_airplane(&self, id: DbId) -> CoreResult<bool>;
}

/// Repository trait for flights, their crew, and seat occupancy
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn list_crew(&self) -> CoreResult<Vec<Crew>>;
    async fn get_crew(&self, id: DbId) -> CoreResult<Option<Crew>>;
    async fn create_crew(&self, input: &CrewInput) -> CoreResult<Crew>;
    async fn update_crew(&self, id: DbId, input: &CrewInput) -> CoreResult<Option<Crew>>;
    async fn delete_crew(&self, id: DbId) -> CoreResult<bool>;

    async fn list_flights(&self) -> CoreResult<Vec<Flight>>;
    async fn get_flight(&self, id: DbId) -> CoreResult<Option<Flight>>;
    async fn create_flight(&self, schedule: &FlightSchedule) -> CoreResult<Flight>;
    async fn update_flight(&self, id: DbId, schedule: &FlightSchedule) -> CoreResult<Option<Flight>>;
    async fn delete_flight(&self, id: DbId) -> CoreResult<bool>;

    async fn flight_summary(&self, id: DbId) -> CoreResult<Option<FlightSummary>>;

    /// Flights flying exactly `source -> destination`, earliest departure first.
    async fn flights_for_route(&self, source: DbId, destination: DbId) -> CoreResult<Vec<FlightSummary>>;

    async fn upcoming_flights(&self, after: DateTime<Utc>, limit: usize) -> CoreResult<Vec<FlightSummary>>;

    async fn served_routes(&self) -> CoreResult<Vec<ServedRoute>>;

    /// Fresh read of the ticketed pairs; never cached.
    async fn occupied_seats(&self, flight_id: DbId) -> CoreResult<OccupancySet>;
}

/// Repository trait for orders and their tickets
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Allocates and persists one order with its tickets atomically.
    ///
    /// Implementations read occupancy, run [`crate::allocate`] and insert inside a single
    /// transaction; on any error nothing is persisted.
    async fn book_seats(
        &self,
        owner: &Requester,
        flight_id: DbId,
        request: &SeatRequest,
    ) -> BookingResult<BookedOrder>;

    /// Orders newest first, restricted to `owner` when given.
    async fn list_orders(&self, owner: Option<&str>) -> CoreResult<Vec<BookedOrder>>;
    async fn get_order(&self, id: DbId) -> CoreResult<Option<BookedOrder>>;
    /// Deletes the order and, with it, its tickets.
    async fn delete_order(&self, id: DbId) -> CoreResult<bool>;

    /// Tickets by id, restricted to orders of `owner` when given.
    async fn list_tickets(&self, owner: Option<&str>) -> CoreResult<Vec<Ticket>>;
    async fn get_ticket(&self, id: DbId) -> CoreResult<Option<(Ticket, Order)>>;
}
