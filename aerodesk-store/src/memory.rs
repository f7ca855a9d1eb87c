//! In-memory implementation of every repository trait.
//!
//! Mirrors the Postgres schema's rules (foreign keys, unique constraints and cascades) so
//! services and handlers can be exercised without a database.

use std::collections::BTreeMap;
use std::sync::Arc;

use aerodesk_core::models::*;
use aerodesk_core::repository::{AirportRepository, FleetRepository, FlightRepository, OrderRepository};
use aerodesk_core::{allocate, BookingError, BookingResult, CoreError, CoreResult, OccupancySet, SeatRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::errors::{ticket_outside_grid, ticketed_flight_airplane};

#[derive(Debug, Default)]
struct State {
    next_id: DbId,
    airports: BTreeMap<DbId, Airport>,
    routes: BTreeMap<DbId, Route>,
    airplane_types: BTreeMap<DbId, AirplaneType>,
    airplanes: BTreeMap<DbId, Airplane>,
    crew: BTreeMap<DbId, Crew>,
    flights: BTreeMap<DbId, Flight>,
    orders: BTreeMap<DbId, Order>,
    tickets: BTreeMap<DbId, Ticket>,
    injected_conflicts: u32,
}

fn missing_reference(what: &str) -> CoreError {
    CoreError::Validation(format!("Referenced record does not exist ({what})"))
}

impl State {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn check_airport_unique(&self, name: &str, except: Option<DbId>) -> CoreResult<()> {
        let taken = self.airports.values().any(|a| a.name == name && Some(a.id) != except);
        if taken {
            return Err(CoreError::Conflict(
                "Duplicate value violates unique constraint: airports_name_key".to_string(),
            ));
        }
        Ok(())
    }

    fn check_route(&self, input: &RouteInput, except: Option<DbId>) -> CoreResult<()> {
        if !self.airports.contains_key(&input.source_id) || !self.airports.contains_key(&input.destination_id) {
            return Err(missing_reference("routes_airport_fkey"));
        }
        let taken = self.routes.values().any(|r| {
            r.source_id == input.source_id
                && r.destination_id == input.destination_id
                && r.flight_number == input.flight_number
                && Some(r.id) != except
        });
        if taken {
            return Err(CoreError::Conflict(
                "Duplicate value violates unique constraint: uq_routes_source_destination_number".to_string(),
            ));
        }
        Ok(())
    }

    fn check_flight(&self, schedule: &FlightSchedule) -> CoreResult<()> {
        if !self.routes.contains_key(&schedule.route_id) {
            return Err(missing_reference("flights_route_id_fkey"));
        }
        if !self.airplanes.contains_key(&schedule.airplane_id) {
            return Err(missing_reference("flights_airplane_id_fkey"));
        }
        if schedule.crew_ids.iter().any(|id| !self.crew.contains_key(id)) {
            return Err(missing_reference("flight_crew_crew_id_fkey"));
        }
        Ok(())
    }

    fn check_grid_fits(&self, airplane_id: DbId, rows: u32, seats_in_row: u32) -> CoreResult<()> {
        let outside = self
            .tickets
            .values()
            .filter(|t| self.flights.get(&t.flight_id).is_some_and(|f| f.airplane_id == airplane_id))
            .filter(|t| t.row > rows || t.seat > seats_in_row)
            .min_by_key(|t| (t.row, t.seat));
        match outside {
            Some(ticket) => Err(ticket_outside_grid(ticket.row, ticket.seat)),
            None => Ok(()),
        }
    }

    fn remove_airport(&mut self, id: DbId) -> bool {
        let removed = self.airports.remove(&id).is_some();
        let routes: Vec<DbId> = self
            .routes
            .values()
            .filter(|r| r.source_id == id || r.destination_id == id)
            .map(|r| r.id)
            .collect();
        for route_id in routes {
            self.remove_route(route_id);
        }
        removed
    }

    fn remove_route(&mut self, id: DbId) -> bool {
        let removed = self.routes.remove(&id).is_some();
        let flights: Vec<DbId> = self.flights.values().filter(|f| f.route_id == id).map(|f| f.id).collect();
        for flight_id in flights {
            self.remove_flight(flight_id);
        }
        removed
    }

    fn remove_airplane(&mut self, id: DbId) -> bool {
        let removed = self.airplanes.remove(&id).is_some();
        let flights: Vec<DbId> = self.flights.values().filter(|f| f.airplane_id == id).map(|f| f.id).collect();
        for flight_id in flights {
            self.remove_flight(flight_id);
        }
        removed
    }

    fn remove_flight(&mut self, id: DbId) -> bool {
        let removed = self.flights.remove(&id).is_some();
        self.tickets.retain(|_, t| t.flight_id != id);
        removed
    }

    fn summary(&self, flight: &Flight) -> Option<FlightSummary> {
        let route = self.routes.get(&flight.route_id)?;
        let source = self.airports.get(&route.source_id)?;
        let destination = self.airports.get(&route.destination_id)?;
        let airplane = self.airplanes.get(&flight.airplane_id)?;
        Some(FlightSummary {
            id: flight.id,
            route_id: route.id,
            flight_number: route.flight_number.clone(),
            source_id: source.id,
            source: source.name.clone(),
            destination_id: destination.id,
            destination: destination.name.clone(),
            airplane_id: airplane.id,
            airplane_name: airplane.name.clone(),
            rows: airplane.rows,
            seats_in_row: airplane.seats_in_row,
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
        })
    }

    fn summaries<'a>(&'a self, flights: impl Iterator<Item = &'a Flight>) -> Vec<FlightSummary> {
        let mut summaries: Vec<FlightSummary> = flights.filter_map(|f| self.summary(f)).collect();
        summaries.sort_by(|a, b| a.departure_time.cmp(&b.departure_time).then(a.id.cmp(&b.id)));
        summaries
    }

    fn occupancy(&self, flight_id: DbId) -> OccupancySet {
        self.tickets.values().filter(|t| t.flight_id == flight_id).map(Ticket::pair).collect()
    }

    fn booked_order(&self, order: &Order) -> BookedOrder {
        let tickets = self.tickets.values().filter(|t| t.order_id == order.id).copied().collect();
        BookedOrder { order: order.clone(), tickets }
    }

    fn owned_by(order: &Order, owner: Option<&str>) -> bool {
        owner.map_or(true, |owner| order.owner == owner)
    }
}

/// Shared, cloneable store. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` bookings fail the way a lost race on the ticket
    /// constraint does at commit time. Nothing is written for those attempts.
    pub async fn inject_commit_conflicts(&self, count: u32) {
        self.state.lock().await.injected_conflicts = count;
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }
}

#[async_trait]
impl AirportRepository for InMemoryStore {
    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let state = self.state.lock().await;
        let mut airports: Vec<Airport> = state.airports.values().cloned().collect();
        airports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(airports)
    }

    async fn get_airport(&self, id: DbId) -> CoreResult<Option<Airport>> {
        Ok(self.state.lock().await.airports.get(&id).cloned())
    }

    async fn create_airport(&self, input: &AirportInput) -> CoreResult<Airport> {
        let mut state = self.state.lock().await;
        state.check_airport_unique(&input.name, None)?;
        let airport = Airport {
            id: state.allocate_id(),
            name: input.name.clone(),
            city: input.city.clone(),
            country: input.country.clone(),
            closest_big_city: input.closest_big_city.clone(),
        };
        state.airports.insert(airport.id, airport.clone());
        Ok(airport)
    }

    async fn update_airport(&self, id: DbId, input: &AirportInput) -> CoreResult<Option<Airport>> {
        let mut state = self.state.lock().await;
        if !state.airports.contains_key(&id) {
            return Ok(None);
        }
        state.check_airport_unique(&input.name, Some(id))?;
        let airport = Airport {
            id,
            name: input.name.clone(),
            city: input.city.clone(),
            country: input.country.clone(),
            closest_big_city: input.closest_big_city.clone(),
        };
        state.airports.insert(id, airport.clone());
        Ok(Some(airport))
    }

    async fn delete_airport(&self, id: DbId) -> CoreResult<bool> {
        Ok(self.state.lock().await.remove_airport(id))
    }

    async fn list_routes(&self) -> CoreResult<Vec<Route>> {
        let state = self.state.lock().await;
        let mut routes: Vec<Route> = state.routes.values().cloned().collect();
        routes.sort_by(|a, b| a.flight_number.cmp(&b.flight_number).then(a.id.cmp(&b.id)));
        Ok(routes)
    }

    async fn get_route(&self, id: DbId) -> CoreResult<Option<Route>> {
        Ok(self.state.lock().await.routes.get(&id).cloned())
    }

    async fn create_route(&self, input: &RouteInput) -> CoreResult<Route> {
        let mut state = self.state.lock().await;
        state.check_route(input, None)?;
        let route = Route {
            id: state.allocate_id(),
            source_id: input.source_id,
            destination_id: input.destination_id,
            distance: input.distance,
            flight_number: input.flight_number.clone(),
        };
        state.routes.insert(route.id, route.clone());
        Ok(route)
    }

    async fn update_route(&self, id: DbId, input: &RouteInput) -> CoreResult<Option<Route>> {
        let mut state = self.state.lock().await;
        if !state.routes.contains_key(&id) {
            return Ok(None);
        }
        state.check_route(input, Some(id))?;
        let route = Route {
            id,
            source_id: input.source_id,
            destination_id: input.destination_id,
            distance: input.distance,
            flight_number: input.flight_number.clone(),
        };
        state.routes.insert(id, route.clone());
        Ok(Some(route))
    }

    async fn delete_route(&self, id: DbId) -> CoreResult<bool> {
        Ok(self.state.lock().await.remove_route(id))
    }
}

#[async_trait]
impl FleetRepository for InMemoryStore {
    async fn list_airplane_types(&self) -> CoreResult<Vec<AirplaneType>> {
        Ok(self.state.lock().await.airplane_types.values().cloned().collect())
    }

    async fn get_airplane_type(&self, id: DbId) -> CoreResult<Option<AirplaneType>> {
        Ok(self.state.lock().await.airplane_types.get(&id).cloned())
    }

    async fn create_airplane_type(&self, input: &AirplaneTypeInput) -> CoreResult<AirplaneType> {
        let mut state = self.state.lock().await;
        let airplane_type = AirplaneType { id: state.allocate_id(), name: input.name.clone() };
        state.airplane_types.insert(airplane_type.id, airplane_type.clone());
        Ok(airplane_type)
    }

    async fn update_airplane_type(&self, id: DbId, input: &AirplaneTypeInput) -> CoreResult<Option<AirplaneType>> {
        let mut state = self.state.lock().await;
        let Some(airplane_type) = state.airplane_types.get_mut(&id) else {
            return Ok(None);
        };
        airplane_type.name = input.name.clone();
        Ok(Some(airplane_type.clone()))
    }

    async fn delete_airplane_type(&self, id: DbId) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.airplane_types.remove(&id).is_some();
        let airplanes: Vec<DbId> =
            state.airplanes.values().filter(|a| a.airplane_type_id == id).map(|a| a.id).collect();
        for airplane_id in airplanes {
            state.remove_airplane(airplane_id);
        }
        Ok(removed)
    }

    async fn list_airplanes(&self) -> CoreResult<Vec<Airplane>> {
        Ok(self.state.lock().await.airplanes.values().cloned().collect())
    }

    async fn get_airplane(&self, id: DbId) -> CoreResult<Option<Airplane>> {
        Ok(self.state.lock().await.airplanes.get(&id).cloned())
    }

    async fn create_airplane(&self, input: &AirplaneInput) -> CoreResult<Airplane> {
        let mut state = self.state.lock().await;
        if !state.airplane_types.contains_key(&input.airplane_type_id) {
            return Err(missing_reference("airplanes_airplane_type_id_fkey"));
        }
        let airplane = Airplane {
            id: state.allocate_id(),
            name: input.name.clone(),
            rows: input.rows,
            seats_in_row: input.seats_in_row,
            airplane_type_id: input.airplane_type_id,
        };
        state.airplanes.insert(airplane.id, airplane.clone());
        Ok(airplane)
    }

    async fn update_airplane(&self, id: DbId, input: &AirplaneInput) -> CoreResult<Option<Airplane>> {
        let mut state = self.state.lock().await;
        if !state.airplanes.contains_key(&id) {
            return Ok(None);
        }
        if !state.airplane_types.contains_key(&input.airplane_type_id) {
            return Err(missing_reference("airplanes_airplane_type_id_fkey"));
        }
        state.check_grid_fits(id, input.rows, input.seats_in_row)?;
        let airplane = Airplane {
            id,
            name: input.name.clone(),
            rows: input.rows,
            seats_in_row: input.seats_in_row,
            airplane_type_id: input.airplane_type_id,
        };
        state.airplanes.insert(id, airplane.clone());
        Ok(Some(airplane))
    }

    async fn delete_airplane(&self, id: DbId) -> CoreResult<bool> {
        Ok(self.state.lock().await.remove_airplane(id))
    }
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn list_crew(&self) -> CoreResult<Vec<Crew>> {
        Ok(self.state.lock().await.crew.values().cloned().collect())
    }

    async fn get_crew(&self, id: DbId) -> CoreResult<Option<Crew>> {
        Ok(self.state.lock().await.crew.get(&id).cloned())
    }

    async fn create_crew(&self, input: &CrewInput) -> CoreResult<Crew> {
        let mut state = self.state.lock().await;
        let crew = Crew {
            id: state.allocate_id(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            rank: input.rank.clone(),
        };
        state.crew.insert(crew.id, crew.clone());
        Ok(crew)
    }

    async fn update_crew(&self, id: DbId, input: &CrewInput) -> CoreResult<Option<Crew>> {
        let mut state = self.state.lock().await;
        let Some(crew) = state.crew.get_mut(&id) else {
            return Ok(None);
        };
        crew.first_name = input.first_name.clone();
        crew.last_name = input.last_name.clone();
        crew.rank = input.rank.clone();
        Ok(Some(crew.clone()))
    }

    async fn delete_crew(&self, id: DbId) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.crew.remove(&id).is_some();
        for flight in state.flights.values_mut() {
            flight.crew_ids.retain(|&crew_id| crew_id != id);
        }
        Ok(removed)
    }

    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        let state = self.state.lock().await;
        let mut flights: Vec<Flight> = state.flights.values().cloned().collect();
        flights.sort_by(|a, b| a.departure_time.cmp(&b.departure_time).then(a.id.cmp(&b.id)));
        Ok(flights)
    }

    async fn get_flight(&self, id: DbId) -> CoreResult<Option<Flight>> {
        Ok(self.state.lock().await.flights.get(&id).cloned())
    }

    async fn create_flight(&self, schedule: &FlightSchedule) -> CoreResult<Flight> {
        let mut state = self.state.lock().await;
        state.check_flight(schedule)?;
        let flight = Flight {
            id: state.allocate_id(),
            route_id: schedule.route_id,
            airplane_id: schedule.airplane_id,
            departure_time: schedule.departure_time,
            arrival_time: schedule.arrival_time,
            crew_ids: schedule.crew_ids.clone(),
        };
        state.flights.insert(flight.id, flight.clone());
        Ok(flight)
    }

    async fn update_flight(&self, id: DbId, schedule: &FlightSchedule) -> CoreResult<Option<Flight>> {
        let mut state = self.state.lock().await;
        let Some(current_airplane) = state.flights.get(&id).map(|f| f.airplane_id) else {
            return Ok(None);
        };
        state.check_flight(schedule)?;
        if current_airplane != schedule.airplane_id && state.tickets.values().any(|t| t.flight_id == id) {
            return Err(ticketed_flight_airplane(id));
        }
        let flight = Flight {
            id,
            route_id: schedule.route_id,
            airplane_id: schedule.airplane_id,
            departure_time: schedule.departure_time,
            arrival_time: schedule.arrival_time,
            crew_ids: schedule.crew_ids.clone(),
        };
        state.flights.insert(id, flight.clone());
        Ok(Some(flight))
    }

    async fn delete_flight(&self, id: DbId) -> CoreResult<bool> {
        Ok(self.state.lock().await.remove_flight(id))
    }

    async fn flight_summary(&self, id: DbId) -> CoreResult<Option<FlightSummary>> {
        let state = self.state.lock().await;
        Ok(state.flights.get(&id).and_then(|f| state.summary(f)))
    }

    async fn flights_for_route(&self, source: DbId, destination: DbId) -> CoreResult<Vec<FlightSummary>> {
        let state = self.state.lock().await;
        let mut summaries = state.summaries(state.flights.values());
        summaries.retain(|s| s.source_id == source && s.destination_id == destination);
        Ok(summaries)
    }

    async fn upcoming_flights(&self, after: DateTime<Utc>, limit: usize) -> CoreResult<Vec<FlightSummary>> {
        let state = self.state.lock().await;
        let mut summaries = state.summaries(state.flights.values().filter(|f| f.departure_time >= after));
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn served_routes(&self) -> CoreResult<Vec<ServedRoute>> {
        let state = self.state.lock().await;
        let mut served: Vec<ServedRoute> = state
            .summaries(state.flights.values())
            .into_iter()
            .map(|s| ServedRoute {
                source_id: s.source_id,
                destination_id: s.destination_id,
                source_name: s.source,
                destination_name: s.destination,
            })
            .collect();
        served.sort_by(|a, b| {
            (&a.source_name, &a.destination_name, a.source_id, a.destination_id)
                .cmp(&(&b.source_name, &b.destination_name, b.source_id, b.destination_id))
        });
        served.dedup();
        Ok(served)
    }

    async fn occupied_seats(&self, flight_id: DbId) -> CoreResult<OccupancySet> {
        Ok(self.state.lock().await.occupancy(flight_id))
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn book_seats(
        &self,
        owner: &Requester,
        flight_id: DbId,
        request: &SeatRequest,
    ) -> BookingResult<BookedOrder> {
        let mut state = self.state.lock().await;

        let flight = state.flights.get(&flight_id).ok_or(BookingError::FlightNotFound(flight_id))?;
        let airplane = state
            .airplanes
            .get(&flight.airplane_id)
            .ok_or(BookingError::FlightNotFound(flight_id))?;
        let grid = airplane.grid()?;
        let occupied = state.occupancy(flight_id);

        let pairs = allocate(&grid, &occupied, request)?;

        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(BookingError::CommitConflict);
        }

        let order = Order {
            id: state.allocate_id(),
            owner: owner.subject.clone(),
            owner_email: owner.email.clone(),
            created_at: Utc::now(),
        };
        state.orders.insert(order.id, order.clone());

        let mut tickets = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let ticket = Ticket { id: state.allocate_id(), order_id: order.id, flight_id, row: pair.row, seat: pair.seat };
            state.tickets.insert(ticket.id, ticket);
            tickets.push(ticket);
        }

        Ok(BookedOrder { order, tickets })
    }

    async fn list_orders(&self, owner: Option<&str>) -> CoreResult<Vec<BookedOrder>> {
        let state = self.state.lock().await;
        let mut orders: Vec<&Order> = state.orders.values().filter(|o| State::owned_by(o, owner)).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders.into_iter().map(|o| state.booked_order(o)).collect())
    }

    async fn get_order(&self, id: DbId) -> CoreResult<Option<BookedOrder>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|o| state.booked_order(o)))
    }

    async fn delete_order(&self, id: DbId) -> CoreResult<bool> {
        let mut state = self.state.lock().await;
        let removed = state.orders.remove(&id).is_some();
        state.tickets.retain(|_, t| t.order_id != id);
        Ok(removed)
    }

    async fn list_tickets(&self, owner: Option<&str>) -> CoreResult<Vec<Ticket>> {
        let state = self.state.lock().await;
        Ok(state
            .tickets
            .values()
            .filter(|t| state.orders.get(&t.order_id).is_some_and(|o| State::owned_by(o, owner)))
            .copied()
            .collect())
    }

    async fn get_ticket(&self, id: DbId) -> CoreResult<Option<(Ticket, Order)>> {
        let state = self.state.lock().await;
        Ok(state
            .tickets
            .get(&id)
            .and_then(|t| state.orders.get(&t.order_id).map(|o| (*t, o.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerodesk_core::SeatPair;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn customer(subject: &str) -> Requester {
        Requester { subject: subject.to_string(), email: None, role: Role::Customer }
    }

    async fn seed(store: &InMemoryStore) -> (DbId, DbId) {
        let a = store
            .create_airport(&AirportInput {
                name: "Boryspil".into(),
                city: "Kyiv".into(),
                country: "Ukraine".into(),
                closest_big_city: None,
            })
            .await
            .unwrap();
        let b = store
            .create_airport(&AirportInput {
                name: "Heathrow".into(),
                city: "London".into(),
                country: "UK".into(),
                closest_big_city: None,
            })
            .await
            .unwrap();
        let route = store
            .create_route(&RouteInput {
                source_id: a.id,
                destination_id: b.id,
                distance: 2100,
                flight_number: "AD100".into(),
            })
            .await
            .unwrap();
        let kind = store.create_airplane_type(&AirplaneTypeInput { name: "Narrowbody".into() }).await.unwrap();
        let plane = store
            .create_airplane(&AirplaneInput { name: "A320".into(), rows: 2, seats_in_row: 3, airplane_type_id: kind.id })
            .await
            .unwrap();
        let now = Utc::now();
        let flight = store
            .create_flight(&FlightSchedule {
                route_id: route.id,
                airplane_id: plane.id,
                departure_time: now + Duration::hours(1),
                arrival_time: now + Duration::hours(4),
                crew_ids: vec![],
            })
            .await
            .unwrap();
        (route.id, flight.id)
    }

    #[tokio::test]
    async fn test_book_seats_persists_order_and_tickets() {
        let store = InMemoryStore::new();
        let (_, flight_id) = seed(&store).await;

        let booked = store
            .book_seats(&customer("guest-1"), flight_id, &SeatRequest::SeatNumbers(vec![2, 3]))
            .await
            .unwrap();

        assert_eq!(booked.tickets.len(), 2);
        assert!(booked.tickets.iter().all(|t| t.order_id == booked.order.id));
        let occupied = store.occupied_seats(flight_id).await.unwrap();
        assert!(occupied.contains(&SeatPair::new(1, 2)));
        assert!(occupied.contains(&SeatPair::new(1, 3)));
    }

    #[tokio::test]
    async fn test_grid_cannot_shrink_under_tickets() {
        let store = InMemoryStore::new();
        let (_, flight_id) = seed(&store).await;
        store
            .book_seats(&customer("guest-1"), flight_id, &SeatRequest::Explicit(vec![SeatPair::new(2, 3)]))
            .await
            .unwrap();
        let airplane_id = store.get_flight(flight_id).await.unwrap().unwrap().airplane_id;
        let plane = store.get_airplane(airplane_id).await.unwrap().unwrap();
        let resize = |rows, seats_in_row| AirplaneInput {
            name: plane.name.clone(),
            rows,
            seats_in_row,
            airplane_type_id: plane.airplane_type_id,
        };

        assert_matches!(store.update_airplane(airplane_id, &resize(1, 3)).await, Err(CoreError::Validation(_)));
        assert_matches!(store.update_airplane(airplane_id, &resize(2, 2)).await, Err(CoreError::Validation(_)));
        assert_eq!(store.get_airplane(airplane_id).await.unwrap().unwrap().rows, 2);

        let grown = store.update_airplane(airplane_id, &resize(4, 3)).await.unwrap().unwrap();
        assert_eq!((grown.rows, grown.seats_in_row), (4, 3));
    }

    #[tokio::test]
    async fn test_ticketed_flight_keeps_its_airplane() {
        let store = InMemoryStore::new();
        let (route_id, flight_id) = seed(&store).await;
        let flight = store.get_flight(flight_id).await.unwrap().unwrap();
        let plane = store.get_airplane(flight.airplane_id).await.unwrap().unwrap();
        let spare = store
            .create_airplane(&AirplaneInput {
                name: "A321".into(),
                rows: 30,
                seats_in_row: 6,
                airplane_type_id: plane.airplane_type_id,
            })
            .await
            .unwrap();
        let schedule = FlightSchedule {
            route_id,
            airplane_id: spare.id,
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            crew_ids: vec![],
        };

        store.book_seats(&customer("guest-1"), flight_id, &SeatRequest::SeatNumber(1)).await.unwrap();
        assert_matches!(store.update_flight(flight_id, &schedule).await, Err(CoreError::Validation(_)));

        let retimed = FlightSchedule {
            airplane_id: plane.id,
            arrival_time: flight.arrival_time + Duration::hours(1),
            ..schedule
        };
        let updated = store.update_flight(flight_id, &retimed).await.unwrap().unwrap();
        assert_eq!(updated.airplane_id, plane.id);
    }

    #[tokio::test]
    async fn test_failed_booking_leaves_no_order() {
        let store = InMemoryStore::new();
        let (_, flight_id) = seed(&store).await;
        store
            .book_seats(&customer("guest-1"), flight_id, &SeatRequest::Explicit(vec![SeatPair::new(1, 1)]))
            .await
            .unwrap();

        let result = store
            .book_seats(
                &customer("guest-2"),
                flight_id,
                &SeatRequest::Explicit(vec![SeatPair::new(2, 1), SeatPair::new(1, 1)]),
            )
            .await;

        assert_matches!(result, Err(BookingError::AlreadyBooked { row: 1, seat: 1 }));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.ticket_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_conflict_writes_nothing() {
        let store = InMemoryStore::new();
        let (_, flight_id) = seed(&store).await;
        store.inject_commit_conflicts(1).await;

        let result = store.book_seats(&customer("guest-1"), flight_id, &SeatRequest::SeatNumber(1)).await;
        assert_matches!(result, Err(BookingError::CommitConflict));
        assert_eq!(store.order_count().await, 0);

        assert!(store.book_seats(&customer("guest-1"), flight_id, &SeatRequest::SeatNumber(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_flight() {
        let store = InMemoryStore::new();
        let result = store.book_seats(&customer("guest-1"), 999, &SeatRequest::SeatNumber(1)).await;
        assert_matches!(result, Err(BookingError::FlightNotFound(999)));
    }

    #[tokio::test]
    async fn test_route_uniqueness_and_foreign_keys() {
        let store = InMemoryStore::new();
        let (route_id, _) = seed(&store).await;
        let route = store.get_route(route_id).await.unwrap().unwrap();

        let duplicate = RouteInput {
            source_id: route.source_id,
            destination_id: route.destination_id,
            distance: 1,
            flight_number: route.flight_number.clone(),
        };
        assert_matches!(store.create_route(&duplicate).await, Err(CoreError::Conflict(_)));

        let dangling = RouteInput { source_id: 404, destination_id: route.destination_id, distance: 1, flight_number: "X".into() };
        assert_matches!(store.create_route(&dangling).await, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deleting_airport_cascades_to_tickets() {
        let store = InMemoryStore::new();
        let (route_id, flight_id) = seed(&store).await;
        store.book_seats(&customer("guest-1"), flight_id, &SeatRequest::SeatNumber(1)).await.unwrap();
        let route = store.get_route(route_id).await.unwrap().unwrap();

        assert!(store.delete_airport(route.source_id).await.unwrap());

        assert!(store.get_route(route_id).await.unwrap().is_none());
        assert!(store.get_flight(flight_id).await.unwrap().is_none());
        assert_eq!(store.ticket_count().await, 0);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_owner() {
        let store = InMemoryStore::new();
        let (_, flight_id) = seed(&store).await;
        store.book_seats(&customer("guest-1"), flight_id, &SeatRequest::SeatNumber(1)).await.unwrap();
        store.book_seats(&customer("guest-2"), flight_id, &SeatRequest::SeatNumber(1)).await.unwrap();

        assert_eq!(store.list_orders(Some("guest-1")).await.unwrap().len(), 1);
        assert_eq!(store.list_orders(None).await.unwrap().len(), 2);
        assert_eq!(store.list_tickets(Some("guest-2")).await.unwrap().len(), 1);

        let newest = &store.list_orders(None).await.unwrap()[0];
        assert_eq!(newest.order.owner, "guest-2");

        assert!(store.delete_order(newest.order.id).await.unwrap());
        assert_eq!(store.ticket_count().await, 1);
    }
}
