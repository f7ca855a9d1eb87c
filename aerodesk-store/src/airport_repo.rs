use aerodesk_core::models::{Airport, AirportInput, DbId, Route, RouteInput};
use aerodesk_core::repository::AirportRepository;
use aerodesk_core::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::{db_err, to_i32, to_u32};

const AIRPORT_COLUMNS: &str = "id, name, city, country, closest_big_city";
const ROUTE_COLUMNS: &str = "id, source_id, destination_id, distance, flight_number";

pub struct PgAirportRepository {
    pool: PgPool,
}

impl PgAirportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    id: i64,
    name: String,
    city: String,
    country: String,
    closest_big_city: Option<String>,
}

impl From<AirportRow> for Airport {
    fn from(row: AirportRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            city: row.city,
            country: row.country,
            closest_big_city: row.closest_big_city,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: i64,
    source_id: i64,
    destination_id: i64,
    distance: i32,
    flight_number: String,
}

impl TryFrom<RouteRow> for Route {
    type Error = CoreError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            source_id: row.source_id,
            destination_id: row.destination_id,
            distance: to_u32(row.distance, "routes.distance")?,
            flight_number: row.flight_number,
        })
    }
}

#[async_trait]
impl AirportRepository for PgAirportRepository {
    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let query = format!("SELECT {AIRPORT_COLUMNS} FROM airports ORDER BY name ASC");
        let rows = sqlx::query_as::<_, AirportRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Airport::from).collect())
    }

    async fn get_airport(&self, id: DbId) -> CoreResult<Option<Airport>> {
        let query = format!("SELECT {AIRPORT_COLUMNS} FROM airports WHERE id = $1");
        let row = sqlx::query_as::<_, AirportRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Airport::from))
    }

    async fn create_airport(&self, input: &AirportInput) -> CoreResult<Airport> {
        let query = format!(
            "INSERT INTO airports (name, city, country, closest_big_city)
             VALUES ($1, $2, $3, $4)
             RETURNING {AIRPORT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AirportRow>(&query)
            .bind(&input.name)
            .bind(&input.city)
            .bind(&input.country)
            .bind(&input.closest_big_city)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update_airport(&self, id: DbId, input: &AirportInput) -> CoreResult<Option<Airport>> {
        let query = format!(
            "UPDATE airports SET name = $2, city = $3, country = $4, closest_big_city = $5
             WHERE id = $1
             RETURNING {AIRPORT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AirportRow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.city)
            .bind(&input.country)
            .bind(&input.closest_big_city)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Airport::from))
    }

    async fn delete_airport(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM airports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_routes(&self) -> CoreResult<Vec<Route>> {
        let query = format!("SELECT {ROUTE_COLUMNS} FROM routes ORDER BY flight_number ASC, id ASC");
        let rows = sqlx::query_as::<_, RouteRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Route::try_from).collect()
    }

    async fn get_route(&self, id: DbId) -> CoreResult<Option<Route>> {
        let query = format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1");
        let row = sqlx::query_as::<_, RouteRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Route::try_from).transpose()
    }

    async fn create_route(&self, input: &RouteInput) -> CoreResult<Route> {
        let query = format!(
            "INSERT INTO routes (source_id, destination_id, distance, flight_number)
             VALUES ($1, $2, $3, $4)
             RETURNING {ROUTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RouteRow>(&query)
            .bind(input.source_id)
            .bind(input.destination_id)
            .bind(to_i32(input.distance, "distance")?)
            .bind(&input.flight_number)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn update_route(&self, id: DbId, input: &RouteInput) -> CoreResult<Option<Route>> {
        let query = format!(
            "UPDATE routes SET source_id = $2, destination_id = $3, distance = $4, flight_number = $5
             WHERE id = $1
             RETURNING {ROUTE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RouteRow>(&query)
            .bind(id)
            .bind(input.source_id)
            .bind(input.destination_id)
            .bind(to_i32(input.distance, "distance")?)
            .bind(&input.flight_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Route::try_from).transpose()
    }

    async fn delete_route(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
