use aerodesk_core::models::{Crew, CrewInput, DbId, Flight, FlightSchedule, FlightSummary, ServedRoute};
use aerodesk_core::repository::FlightRepository;
use aerodesk_core::{CoreError, CoreResult, OccupancySet, SeatPair};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::errors::{db_err, ticketed_flight_airplane, to_u32};

const CREW_COLUMNS: &str = "id, first_name, last_name, rank";

const FLIGHT_SELECT: &str = "SELECT f.id, f.route_id, f.airplane_id, f.departure_time, f.arrival_time,
        COALESCE(array_agg(fc.crew_id ORDER BY fc.crew_id) FILTER (WHERE fc.crew_id IS NOT NULL), '{}') AS crew_ids
    FROM flights f
    LEFT JOIN flight_crew fc ON fc.flight_id = f.id";

pub(crate) const FLIGHT_SUMMARY_SELECT: &str = "SELECT f.id, f.route_id, r.flight_number,
        r.source_id, s.name AS source, r.destination_id, d.name AS destination,
        f.airplane_id, a.name AS airplane_name, a.rows, a.seats_in_row,
        f.departure_time, f.arrival_time
    FROM flights f
    JOIN routes r ON r.id = f.route_id
    JOIN airports s ON s.id = r.source_id
    JOIN airports d ON d.id = r.destination_id
    JOIN airplanes a ON a.id = f.airplane_id";

pub struct PgFlightRepository {
    pool: PgPool,
}

impl PgFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_flight(&self, id: DbId) -> CoreResult<Option<Flight>> {
        let query = format!("{FLIGHT_SELECT} WHERE f.id = $1 GROUP BY f.id");
        let row = sqlx::query_as::<_, FlightRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Flight::from))
    }
}

#[derive(sqlx::FromRow)]
struct CrewRow {
    id: i64,
    first_name: String,
    last_name: String,
    rank: Option<String>,
}

impl From<CrewRow> for Crew {
    fn from(row: CrewRow) -> Self {
        Self { id: row.id, first_name: row.first_name, last_name: row.last_name, rank: row.rank }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    route_id: i64,
    airplane_id: i64,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    crew_ids: Vec<i64>,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Self {
            id: row.id,
            route_id: row.route_id,
            airplane_id: row.airplane_id,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            crew_ids: row.crew_ids,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightSummaryRow {
    id: i64,
    route_id: i64,
    flight_number: String,
    source_id: i64,
    source: String,
    destination_id: i64,
    destination: String,
    airplane_id: i64,
    airplane_name: String,
    rows: i32,
    seats_in_row: i32,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
}

impl TryFrom<FlightSummaryRow> for FlightSummary {
    type Error = CoreError;

    fn try_from(row: FlightSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            route_id: row.route_id,
            flight_number: row.flight_number,
            source_id: row.source_id,
            source: row.source,
            destination_id: row.destination_id,
            destination: row.destination,
            airplane_id: row.airplane_id,
            airplane_name: row.airplane_name,
            rows: to_u32(row.rows, "airplanes.rows")?,
            seats_in_row: to_u32(row.seats_in_row, "airplanes.seats_in_row")?,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    row: i32,
    seat: i32,
}

#[derive(sqlx::FromRow)]
struct ServedRouteRow {
    source_id: i64,
    destination_id: i64,
    source_name: String,
    destination_name: String,
}

pub(crate) async fn fetch_occupancy<'e, E>(executor: E, flight_id: DbId) -> CoreResult<OccupancySet>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, SeatRow>(r#"SELECT "row", seat FROM tickets WHERE flight_id = $1"#)
        .bind(flight_id)
        .fetch_all(executor)
        .await
        .map_err(db_err)?;

    rows.into_iter()
        .map(|r| Ok(SeatPair { row: to_u32(r.row, "tickets.row")?, seat: to_u32(r.seat, "tickets.seat")? }))
        .collect()
}

async fn replace_crew(tx: &mut Transaction<'_, Postgres>, flight_id: DbId, crew_ids: &[DbId]) -> CoreResult<()> {
    sqlx::query("DELETE FROM flight_crew WHERE flight_id = $1")
        .bind(flight_id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    if !crew_ids.is_empty() {
        sqlx::query("INSERT INTO flight_crew (flight_id, crew_id) SELECT $1, UNNEST($2::BIGINT[])")
            .bind(flight_id)
            .bind(crew_ids)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

#[async_trait]
impl FlightRepository for PgFlightRepository {
    async fn list_crew(&self) -> CoreResult<Vec<Crew>> {
        let query = format!("SELECT {CREW_COLUMNS} FROM crew ORDER BY id ASC");
        let rows = sqlx::query_as::<_, CrewRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Crew::from).collect())
    }

    async fn get_crew(&self, id: DbId) -> CoreResult<Option<Crew>> {
        let query = format!("SELECT {CREW_COLUMNS} FROM crew WHERE id = $1");
        let row = sqlx::query_as::<_, CrewRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Crew::from))
    }

    async fn create_crew(&self, input: &CrewInput) -> CoreResult<Crew> {
        let query = format!(
            "INSERT INTO crew (first_name, last_name, rank) VALUES ($1, $2, $3) RETURNING {CREW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CrewRow>(&query)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.rank)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update_crew(&self, id: DbId, input: &CrewInput) -> CoreResult<Option<Crew>> {
        let query = format!(
            "UPDATE crew SET first_name = $2, last_name = $3, rank = $4 WHERE id = $1 RETURNING {CREW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CrewRow>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.rank)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Crew::from))
    }

    async fn delete_crew(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM crew WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        let query = format!("{FLIGHT_SELECT} GROUP BY f.id ORDER BY f.departure_time ASC, f.id ASC");
        let rows = sqlx::query_as::<_, FlightRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn get_flight(&self, id: DbId) -> CoreResult<Option<Flight>> {
        self.fetch_flight(id).await
    }

    async fn create_flight(&self, schedule: &FlightSchedule) -> CoreResult<Flight> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO flights (route_id, airplane_id, departure_time, arrival_time)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(schedule.route_id)
        .bind(schedule.airplane_id)
        .bind(schedule.departure_time)
        .bind(schedule.arrival_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        replace_crew(&mut tx, id, &schedule.crew_ids).await?;
        tx.commit().await.map_err(db_err)?;

        self.fetch_flight(id)
            .await?
            .ok_or(CoreError::Internal(format!("flight {id} vanished after insert")))
    }

    async fn update_flight(&self, id: DbId, schedule: &FlightSchedule) -> CoreResult<Option<Flight>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Same lock as a booking takes, so tickets cannot appear between the check and the update.
        let current = sqlx::query_scalar::<_, i64>("SELECT airplane_id FROM flights WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let Some(current_airplane) = current else {
            return Ok(None);
        };
        if current_airplane != schedule.airplane_id {
            let ticketed = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tickets WHERE flight_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
            if ticketed {
                return Err(ticketed_flight_airplane(id));
            }
        }

        sqlx::query(
            "UPDATE flights SET route_id = $2, airplane_id = $3, departure_time = $4, arrival_time = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(schedule.route_id)
        .bind(schedule.airplane_id)
        .bind(schedule.departure_time)
        .bind(schedule.arrival_time)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        replace_crew(&mut tx, id, &schedule.crew_ids).await?;
        tx.commit().await.map_err(db_err)?;

        self.fetch_flight(id).await
    }

    async fn delete_flight(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn flight_summary(&self, id: DbId) -> CoreResult<Option<FlightSummary>> {
        let query = format!("{FLIGHT_SUMMARY_SELECT} WHERE f.id = $1");
        let row = sqlx::query_as::<_, FlightSummaryRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(FlightSummary::try_from).transpose()
    }

    async fn flights_for_route(&self, source: DbId, destination: DbId) -> CoreResult<Vec<FlightSummary>> {
        let query = format!(
            "{FLIGHT_SUMMARY_SELECT}
             WHERE r.source_id = $1 AND r.destination_id = $2
             ORDER BY f.departure_time ASC, f.id ASC"
        );
        let rows = sqlx::query_as::<_, FlightSummaryRow>(&query)
            .bind(source)
            .bind(destination)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(FlightSummary::try_from).collect()
    }

    async fn upcoming_flights(&self, after: DateTime<Utc>, limit: usize) -> CoreResult<Vec<FlightSummary>> {
        let query = format!(
            "{FLIGHT_SUMMARY_SELECT}
             WHERE f.departure_time >= $1
             ORDER BY f.departure_time ASC, f.id ASC
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, FlightSummaryRow>(&query)
            .bind(after)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(FlightSummary::try_from).collect()
    }

    async fn served_routes(&self) -> CoreResult<Vec<ServedRoute>> {
        let rows = sqlx::query_as::<_, ServedRouteRow>(
            "SELECT DISTINCT r.source_id, r.destination_id, s.name AS source_name, d.name AS destination_name
             FROM flights f
             JOIN routes r ON r.id = f.route_id
             JOIN airports s ON s.id = r.source_id
             JOIN airports d ON d.id = r.destination_id
             ORDER BY source_name ASC, destination_name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| ServedRoute {
                source_id: row.source_id,
                destination_id: row.destination_id,
                source_name: row.source_name,
                destination_name: row.destination_name,
            })
            .collect())
    }

    async fn occupied_seats(&self, flight_id: DbId) -> CoreResult<OccupancySet> {
        fetch_occupancy(&self.pool, flight_id).await
    }
}
