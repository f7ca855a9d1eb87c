use aerodesk_shared::Masked;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::seating::{SeatGrid, SeatPair};

pub type DbId = i64;

const NAME_MAX_LEN: usize = 100;
/// Largest accepted airplane grid.
pub const MAX_ROWS: u32 = 200;
pub const MAX_SEATS_IN_ROW: u32 = 20;
const FLIGHT_NUMBER_MAX_LEN: usize = 50;

fn require_text(field: &str, value: &str, max_len: usize) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(CoreError::Validation(format!("{field} must be at most {max_len} characters")));
    }
    Ok(())
}

// ============================================================================
// Airports & Routes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub id: DbId,
    pub name: String,
    pub city: String,
    pub country: String,
    pub closest_big_city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirportInput {
    pub name: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub closest_big_city: Option<String>,
}

impl AirportInput {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name, NAME_MAX_LEN)?;
        require_text("city", &self.city, NAME_MAX_LEN)?;
        require_text("country", &self.country, NAME_MAX_LEN)?;
        if let Some(city) = &self.closest_big_city {
            require_text("closest_big_city", city, NAME_MAX_LEN)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: DbId,
    pub source_id: DbId,
    pub destination_id: DbId,
    pub distance: u32,
    pub flight_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteInput {
    pub source_id: DbId,
    pub destination_id: DbId,
    pub distance: u32,
    pub flight_number: String,
}

impl RouteInput {
    pub fn validate(&self) -> CoreResult<()> {
        if self.source_id == self.destination_id {
            return Err(CoreError::Validation(
                "Source and destination airports cannot be the same".to_string(),
            ));
        }
        require_text("flight_number", &self.flight_number, FLIGHT_NUMBER_MAX_LEN)
    }
}

/// A source/destination pair that has at least one flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedRoute {
    pub source_id: DbId,
    pub destination_id: DbId,
    pub source_name: String,
    pub destination_name: String,
}

// ============================================================================
// Fleet
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirplaneType {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirplaneTypeInput {
    pub name: String,
}

impl AirplaneTypeInput {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name, NAME_MAX_LEN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airplane {
    pub id: DbId,
    pub name: String,
    pub rows: u32,
    pub seats_in_row: u32,
    pub airplane_type_id: DbId,
}

impl Airplane {
    pub fn grid(&self) -> CoreResult<SeatGrid> {
        SeatGrid::new(self.rows, self.seats_in_row)
    }

    pub fn total_seats(&self) -> u32 {
        self.rows.saturating_mul(self.seats_in_row)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirplaneInput {
    pub name: String,
    pub rows: u32,
    pub seats_in_row: u32,
    pub airplane_type_id: DbId,
}

impl AirplaneInput {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("name", &self.name, NAME_MAX_LEN)?;
        if self.rows > MAX_ROWS {
            return Err(CoreError::Validation(format!("rows must be at most {MAX_ROWS}")));
        }
        if self.seats_in_row > MAX_SEATS_IN_ROW {
            return Err(CoreError::Validation(format!("seats_in_row must be at most {MAX_SEATS_IN_ROW}")));
        }
        SeatGrid::new(self.rows, self.seats_in_row).map(|_| ())
    }
}

// ============================================================================
// Crew & Flights
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crew {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub rank: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub rank: Option<String>,
}

impl CrewInput {
    pub fn validate(&self) -> CoreResult<()> {
        require_text("first_name", &self.first_name, NAME_MAX_LEN)?;
        require_text("last_name", &self.last_name, NAME_MAX_LEN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: DbId,
    pub route_id: DbId,
    pub airplane_id: DbId,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub crew_ids: Vec<DbId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightInput {
    pub route_id: DbId,
    pub airplane_id: DbId,
    /// Defaults to the time of the write.
    #[serde(default)]
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: DateTime<Utc>,
    #[serde(default)]
    pub crew_ids: Vec<DbId>,
}

/// A validated [`FlightInput`] with its departure time resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSchedule {
    pub route_id: DbId,
    pub airplane_id: DbId,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub crew_ids: Vec<DbId>,
}

impl FlightInput {
    pub fn into_schedule(self, now: DateTime<Utc>) -> CoreResult<FlightSchedule> {
        let departure_time = self.departure_time.unwrap_or(now);
        if self.arrival_time <= departure_time {
            return Err(CoreError::Validation(
                "arrival_time must be later than departure_time".to_string(),
            ));
        }
        let mut crew_ids = self.crew_ids;
        crew_ids.sort_unstable();
        crew_ids.dedup();
        Ok(FlightSchedule {
            route_id: self.route_id,
            airplane_id: self.airplane_id,
            departure_time,
            arrival_time: self.arrival_time,
            crew_ids,
        })
    }
}

/// A flight joined with its route endpoints and airplane grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSummary {
    pub id: DbId,
    pub route_id: DbId,
    pub flight_number: String,
    pub source_id: DbId,
    pub source: String,
    pub destination_id: DbId,
    pub destination: String,
    pub airplane_id: DbId,
    pub airplane_name: String,
    pub rows: u32,
    pub seats_in_row: u32,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

impl FlightSummary {
    pub fn grid(&self) -> CoreResult<SeatGrid> {
        SeatGrid::new(self.rows, self.seats_in_row)
    }
}

// ============================================================================
// Orders & Tickets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated caller. Owns the orders it books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub subject: String,
    pub email: Option<Masked<String>>,
    pub role: Role,
}

impl Requester {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner filter for listings: admins see everything.
    pub fn owner_scope(&self) -> Option<&str> {
        (!self.is_admin()).then_some(self.subject.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: DbId,
    pub owner: String,
    pub owner_email: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: DbId,
    pub order_id: DbId,
    pub flight_id: DbId,
    pub row: u32,
    pub seat: u32,
}

impl Ticket {
    pub fn pair(&self) -> SeatPair {
        SeatPair { row: self.row, seat: self.seat }
    }
}

/// An order with every ticket it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedOrder {
    pub order: Order,
    pub tickets: Vec<Ticket>,
}
