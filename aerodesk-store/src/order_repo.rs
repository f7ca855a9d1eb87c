use std::collections::HashMap;

use aerodesk_core::models::{BookedOrder, DbId, Order, Requester, Ticket};
use aerodesk_core::repository::OrderRepository;
use aerodesk_core::{allocate, BookingError, BookingResult, CoreResult, SeatGrid, SeatRequest};
use aerodesk_shared::Masked;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::{booking_db_err, db_err, to_i32, to_u32};
use crate::flight_repo::fetch_occupancy;

const ORDER_COLUMNS: &str = "id, owner, owner_email, created_at";
const TICKET_COLUMNS: &str = r#"id, order_id, flight_id, "row", seat"#;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tickets_for_orders(&self, order_ids: &[DbId]) -> CoreResult<HashMap<DbId, Vec<Ticket>>> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = ANY($1) ORDER BY id ASC");
        let rows = sqlx::query_as::<_, TicketRow>(&query)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut grouped: HashMap<DbId, Vec<Ticket>> = HashMap::new();
        for row in rows {
            let ticket = Ticket::try_from(row)?;
            grouped.entry(ticket.order_id).or_default().push(ticket);
        }
        Ok(grouped)
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    owner: String,
    owner_email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self { id: row.id, owner: row.owner, owner_email: row.owner_email.map(Masked), created_at: row.created_at }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: i64,
    order_id: i64,
    flight_id: i64,
    row: i32,
    seat: i32,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = aerodesk_core::CoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            flight_id: row.flight_id,
            row: to_u32(row.row, "tickets.row")?,
            seat: to_u32(row.seat, "tickets.seat")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GridRow {
    rows: i32,
    seats_in_row: i32,
}

#[derive(sqlx::FromRow)]
struct TicketWithOrderRow {
    id: i64,
    order_id: i64,
    flight_id: i64,
    row: i32,
    seat: i32,
    owner: String,
    owner_email: Option<String>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn book_seats(
        &self,
        owner: &Requester,
        flight_id: DbId,
        request: &SeatRequest,
    ) -> BookingResult<BookedOrder> {
        let mut tx = self.pool.begin().await.map_err(booking_db_err)?;

        // Serializes bookings per flight: concurrent requests wait here and then
        // see each other's tickets in the occupancy read below.
        let grid_row = sqlx::query_as::<_, GridRow>(
            "SELECT a.rows, a.seats_in_row
             FROM flights f
             JOIN airplanes a ON a.id = f.airplane_id
             WHERE f.id = $1
             FOR UPDATE OF f FOR SHARE OF a",
        )
        .bind(flight_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(booking_db_err)?
        .ok_or(BookingError::FlightNotFound(flight_id))?;

        let grid = SeatGrid::new(
            to_u32(grid_row.rows, "airplanes.rows")?,
            to_u32(grid_row.seats_in_row, "airplanes.seats_in_row")?,
        )?;
        let occupied = fetch_occupancy(&mut *tx, flight_id).await?;

        // Dropping `tx` on error rolls everything back.
        let pairs = allocate(&grid, &occupied, request)?;

        let query = format!("INSERT INTO orders (owner, owner_email) VALUES ($1, $2) RETURNING {ORDER_COLUMNS}");
        let order: Order = sqlx::query_as::<_, OrderRow>(&query)
            .bind(&owner.subject)
            .bind(owner.email.as_ref().map(|email| email.expose().as_str()))
            .fetch_one(&mut *tx)
            .await
            .map_err(booking_db_err)?
            .into();

        let query = format!(
            r#"INSERT INTO tickets (order_id, flight_id, "row", seat) VALUES ($1, $2, $3, $4) RETURNING {TICKET_COLUMNS}"#
        );
        let mut tickets = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let row = sqlx::query_as::<_, TicketRow>(&query)
                .bind(order.id)
                .bind(flight_id)
                .bind(to_i32(pair.row, "row")?)
                .bind(to_i32(pair.seat, "seat")?)
                .fetch_one(&mut *tx)
                .await
                .map_err(booking_db_err)?;
            tickets.push(Ticket::try_from(row)?);
        }

        tx.commit().await.map_err(booking_db_err)?;

        tracing::debug!(order_id = order.id, flight_id, tickets = tickets.len(), "Order committed");
        Ok(BookedOrder { order, tickets })
    }

    async fn list_orders(&self, owner: Option<&str>) -> CoreResult<Vec<BookedOrder>> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::VARCHAR IS NULL OR owner = $1)
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let ids: Vec<DbId> = rows.iter().map(|row| row.id).collect();
        let mut tickets = self.tickets_for_orders(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let tickets = tickets.remove(&row.id).unwrap_or_default();
                BookedOrder { order: row.into(), tickets }
            })
            .collect())
    }

    async fn get_order(&self, id: DbId) -> CoreResult<Option<BookedOrder>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let tickets = self.tickets_for_orders(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(Some(BookedOrder { order: row.into(), tickets }))
    }

    async fn delete_order(&self, id: DbId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tickets(&self, owner: Option<&str>) -> CoreResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"SELECT t.id, t.order_id, t.flight_id, t."row", t.seat
               FROM tickets t
               JOIN orders o ON o.id = t.order_id
               WHERE ($1::VARCHAR IS NULL OR o.owner = $1)
               ORDER BY t.id ASC"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    async fn get_ticket(&self, id: DbId) -> CoreResult<Option<(Ticket, Order)>> {
        let row = sqlx::query_as::<_, TicketWithOrderRow>(
            r#"SELECT t.id, t.order_id, t.flight_id, t."row", t.seat, o.owner, o.owner_email, o.created_at
               FROM tickets t
               JOIN orders o ON o.id = t.order_id
               WHERE t.id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|row| {
            let ticket = Ticket {
                id: row.id,
                order_id: row.order_id,
                flight_id: row.flight_id,
                row: to_u32(row.row, "tickets.row")?,
                seat: to_u32(row.seat, "tickets.seat")?,
            };
            let order = Order {
                id: row.order_id,
                owner: row.owner,
                owner_email: row.owner_email.map(Masked),
                created_at: row.created_at,
            };
            Ok((ticket, order))
        })
        .transpose()
    }
}
