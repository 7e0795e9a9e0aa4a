//! `PostgreSQL` implementation of [`TicketBackend`].

use crate::backend_error;
use crate::entities::{
    JoinedTicketEntity, TICKET_COLUMNS, TicketEntity, TicketTypeEntity, TransferEntity,
    ValidationEntity,
};
use afritix_core::backend::{
    JoinedTicketRow, NewTransfer, ORDER_STATUS_COMPLETED, PAYMENT_METHOD_CARD, PurchaseOutcome,
    PurchaseReceipt, PurchaseRequest, TicketBackend, TicketRow, TicketTypeRow, ValidationRow,
};
use afritix_core::error::{BackendError, BackendResult};
use afritix_core::types::{OrderId, TicketId, TicketStatus, TicketTransfer, TicketTypeId, UserId};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Event columns aliased for [`crate::entities::JoinedEventEntity`].
const EVENT_JOIN_COLUMNS: &str = "e.id AS e_id, e.title AS e_title, e.date AS e_date, \
     e.time AS e_time, e.location AS e_location, e.currency AS e_currency, \
     e.image_url AS e_image_url";

/// `PostgreSQL` ticket backend.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresTicketBackend {
    pool: PgPool,
}

impl PostgresTicketBackend {
    /// Connect with default pool options.
    ///
    /// # Errors
    ///
    /// Returns error if the database is unreachable.
    pub async fn connect(database_url: &str) -> BackendResult<Self> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns error if a migration fails.
    pub async fn migrate(&self) -> BackendResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BackendError::message(format!("Migration failed: {e}")))?;
        Ok(())
    }

    fn joined_ticket_query(filter: &str) -> String {
        format!(
            "SELECT {TICKET_COLUMNS}, {EVENT_JOIN_COLUMNS}, tt.name AS tt_name, tt.price AS tt_price \
             FROM tickets t \
             LEFT JOIN events e ON e.id = t.event_id \
             LEFT JOIN ticket_types tt ON tt.id = t.ticket_type_id \
             {filter}"
        )
    }
}

impl TicketBackend for PostgresTicketBackend {
    async fn list_tickets_for_user(&self, user_id: UserId) -> BackendResult<Vec<JoinedTicketRow>> {
        let sql = Self::joined_ticket_query("WHERE t.user_id = $1 ORDER BY t.created_at DESC");
        let rows = sqlx::query_as::<_, JoinedTicketEntity>(&sql)
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;

        tracing::debug!(user_id = %user_id, count = rows.len(), "Fetched tickets");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_joined_ticket(&self, ticket_id: TicketId) -> BackendResult<Option<JoinedTicketRow>> {
        let sql = Self::joined_ticket_query("WHERE t.id = $1");
        let row = sqlx::query_as::<_, JoinedTicketEntity>(&sql)
            .bind(ticket_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(row.map(Into::into))
    }

    async fn fetch_ticket_row(&self, ticket_id: TicketId) -> BackendResult<Option<TicketRow>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = $1");
        let row = sqlx::query_as::<_, TicketEntity>(&sql)
            .bind(ticket_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(row.map(Into::into))
    }

    async fn fetch_owned_ticket(
        &self,
        ticket_id: TicketId,
        user_id: UserId,
    ) -> BackendResult<Option<TicketRow>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = $1 AND t.user_id = $2");
        let row = sqlx::query_as::<_, TicketEntity>(&sql)
            .bind(ticket_id.0)
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(row.map(Into::into))
    }

    async fn fetch_validation_log(&self, ticket_id: TicketId) -> BackendResult<Vec<ValidationRow>> {
        // A deployment without the scanner log reports SQLSTATE 42P01 here
        let rows = sqlx::query_as::<_, ValidationEntity>(
            r"
            SELECT id, ticket_id, status, created_at, success,
                   location, operator_id, operator_name, device_id
            FROM ticket_validations
            WHERE ticket_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(ticket_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| backend_error(&e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_ticket_type(&self, ticket_type_id: TicketTypeId) -> BackendResult<Option<TicketTypeRow>> {
        let sql = format!(
            "SELECT tt.id, tt.event_id, tt.name, tt.price, tt.available, {EVENT_JOIN_COLUMNS} \
             FROM ticket_types tt \
             LEFT JOIN events e ON e.id = tt.event_id \
             WHERE tt.id = $1"
        );
        let row = sqlx::query_as::<_, TicketTypeEntity>(&sql)
            .bind(ticket_type_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(row.map(Into::into))
    }

    async fn purchase(&self, request: PurchaseRequest) -> BackendResult<PurchaseOutcome> {
        // Transaction flow:
        // 1. SELECT ... FOR UPDATE on the ticket type (serializes buyers of one tier)
        // 2. Sold out: roll back, nothing written
        // 3. INSERT order, INSERT ticket, decrement availability
        // 4. COMMIT
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| backend_error(&e))?;

        let available: Option<(i32,)> =
            sqlx::query_as("SELECT available FROM ticket_types WHERE id = $1 FOR UPDATE")
                .bind(request.ticket_type_id.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| backend_error(&e))?;

        let Some((available,)) = available else {
            let _ = tx.rollback().await; // Ignore rollback errors
            return Err(BackendError::new(Some("PGRST116"), "ticket type not found"));
        };

        if available <= 0 {
            let _ = tx.rollback().await; // Ignore rollback errors
            tracing::debug!(ticket_type_id = %request.ticket_type_id, "Ticket type sold out");
            return Ok(PurchaseOutcome::SoldOut);
        }

        let (order_id,): (Uuid,) = sqlx::query_as(
            r"
            INSERT INTO orders (user_id, event_id, total, status, payment_method, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(request.user_id.0)
        .bind(request.event_id.0)
        .bind(request.total)
        .bind(ORDER_STATUS_COMPLETED)
        .bind(PAYMENT_METHOD_CARD)
        .bind(request.issued_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| backend_error(&e))?;

        let ticket = sqlx::query_as::<_, TicketEntity>(
            r"
            INSERT INTO tickets (user_id, event_id, ticket_type_id, order_id, qr_code, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, event_id, ticket_type_id, order_id, qr_code, status,
                      created_at, scanned_at, scanned_by, scan_location
            ",
        )
        .bind(request.user_id.0)
        .bind(request.event_id.0)
        .bind(request.ticket_type_id.0)
        .bind(order_id)
        .bind(&request.qr_code)
        .bind(TicketStatus::Valid.as_str())
        .bind(request.issued_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| backend_error(&e))?;

        let (remaining,): (i32,) = sqlx::query_as(
            "UPDATE ticket_types SET available = available - 1, updated_at = $2 WHERE id = $1 RETURNING available",
        )
        .bind(request.ticket_type_id.0)
        .bind(request.issued_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| backend_error(&e))?;

        tx.commit().await.map_err(|e| backend_error(&e))?;

        Ok(PurchaseOutcome::Issued(PurchaseReceipt {
            order_id: OrderId(order_id),
            ticket: ticket.into(),
            remaining,
        }))
    }

    async fn find_profile_by_email(&self, email: &str) -> BackendResult<Option<UserId>> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(row.map(|(id,)| UserId(id)))
    }

    async fn initiate_transfer(&self, transfer: NewTransfer) -> BackendResult<TicketTransfer> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| backend_error(&e))?;

        // The partial unique index rejects a second PENDING transfer (23505)
        let row = sqlx::query_as::<_, TransferEntity>(
            r"
            INSERT INTO ticket_transfers
                (ticket_id, sender_id, recipient_email, recipient_id, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, 'PENDING', $5, $6)
            RETURNING id, ticket_id, sender_id, recipient_email, recipient_id, status,
                      created_at, updated_at, expires_at, accepted_at, rejected_at
            ",
        )
        .bind(transfer.ticket_id.0)
        .bind(transfer.sender_id.0)
        .bind(&transfer.recipient_email)
        .bind(transfer.recipient_id.map(|id| id.0))
        .bind(transfer.created_at)
        .bind(transfer.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| backend_error(&e))?;

        let result = sqlx::query("UPDATE tickets SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(transfer.ticket_id.0)
            .bind(TicketStatus::TransferPending.as_str())
            .bind(transfer.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| backend_error(&e))?;

        if result.rows_affected() == 0 {
            let _ = tx.rollback().await; // Ignore rollback errors
            tracing::warn!(ticket_id = %transfer.ticket_id, "Transfer matched no ticket");
            return Err(BackendError::message("ticket not found"));
        }

        tx.commit().await.map_err(|e| backend_error(&e))?;
        row.try_into()
    }
}
