use aerodesk_core::models::{Airplane, AirplaneInput, AirplaneType, AirplaneTypeInput, DbId};
use aerodesk_core::repository::FleetRepository;
use aerodesk_core::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::{db_err, ticket_outside_grid, to_i32, to_u32};

const AIRPLANE_COLUMNS: &str = "id, name, rows, seats_in_row, airplane_type_id";

pub struct PgFleetRepository {
    pool: PgPool,
}

impl PgFleetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirplaneTypeRow {
    id: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct AirplaneRow {
    id: i64,
    name: String,
    rows: i32,
    seats_in_row: i32,
    airplane_type_id: i64,
}

impl TryFrom<AirplaneRow> for Airplane {
    type Error = CoreError;

    fn try_from(row: AirplaneRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            rows: to_u32(row.rows, "airplanes.rows")?,
            seats_in_row: to_u32(row.seats_in_row, "airplanes.seats_in_row")?,
            airplane_type_id: row.airplane_type_id,
        })
    }
}

#[async_trait]
impl FleetRepository for PgFleetRepository {
    async fn list_airplane_types(&self) -> CoreResult<Vec<AirplaneType>> {
        let rows = sqlx::query_as::<_, AirplaneTypeRow>("SELECT id, name FROM airplane_types ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(|row| AirplaneType { id: row.id, name: row.name }).collect())
    }

    async fn get_airplane_type(&self, id: DbId) -> CoreResult<Option<AirplaneType>> {
        let row = sqlx::query_as::<_, AirplaneTypeRow>("SELECT id, name FROM airplane_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|row| AirplaneType { id: row.id, name: row.name }))
    }

    async fn create_airplane_type(&self, input: &AirplaneTypeInput) -> CoreResult<AirplaneType> {
        let row = sqlx::query_as::<_, AirplaneTypeRow>(
            "INSERT INTO airplane_types (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(AirplaneType { id: row.id, name: row.name })
    }

    async fn update_airplane_type(&self, id: DbId, input: &AirplaneTypeInput) -> CoreResult<Option<AirplaneType>> {
        let row = sqlx::query_as::<_, AirplaneTypeRow>(
            "UPDATE airplane_types SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&input.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(|row| AirplaneType { id: row.id, name: row.name }))
    }

    async fn delete_airplane_type(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM airplane_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_airplanes(&self) -> CoreResult<Vec<Airplane>> {
        let query = format!("SELECT {AIRPLANE_COLUMNS} FROM airplanes ORDER BY id ASC");
        let rows = sqlx::query_as::<_, AirplaneRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(Airplane::try_from).collect()
    }

    async fn get_airplane(&self, id: DbId) -> CoreResult<Option<Airplane>> {
        let query = format!("SELECT {AIRPLANE_COLUMNS} FROM airplanes WHERE id = $1");
        let row = sqlx::query_as::<_, AirplaneRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(Airplane::try_from).transpose()
    }

    async fn create_airplane(&self, input: &AirplaneInput) -> CoreResult<Airplane> {
        let query = format!(
            "INSERT INTO airplanes (name, rows, seats_in_row, airplane_type_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {AIRPLANE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AirplaneRow>(&query)
            .bind(&input.name)
            .bind(to_i32(input.rows, "rows")?)
            .bind(to_i32(input.seats_in_row, "seats_in_row")?)
            .bind(input.airplane_type_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn update_airplane(&self, id: DbId, input: &AirplaneInput) -> CoreResult<Option<Airplane>> {
        let rows = to_i32(input.rows, "rows")?;
        let seats_in_row = to_i32(input.seats_in_row, "seats_in_row")?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Bookings hold a share lock on the airplane row while they allocate.
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM airplanes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if locked.is_none() {
            return Ok(None);
        }

        let outside = sqlx::query_as::<_, (i32, i32)>(
            r#"SELECT t."row", t.seat
               FROM tickets t
               JOIN flights f ON f.id = t.flight_id
               WHERE f.airplane_id = $1 AND (t."row" > $2 OR t.seat > $3)
               ORDER BY t."row", t.seat
               LIMIT 1"#,
        )
        .bind(id)
        .bind(rows)
        .bind(seats_in_row)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        if let Some((row, seat)) = outside {
            return Err(ticket_outside_grid(to_u32(row, "tickets.row")?, to_u32(seat, "tickets.seat")?));
        }

        let query = format!(
            "UPDATE airplanes SET name = $2, rows = $3, seats_in_row = $4, airplane_type_id = $5
             WHERE id = $1
             RETURNING {AIRPLANE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AirplaneRow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(rows)
            .bind(seats_in_row)
            .bind(input.airplane_type_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        row.map(Airplane::try_from).transpose()
    }

    async fn delete_airplane(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM airplanes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
