//! In-memory ticket backend for testing.
//!
//! Holds the same tables the managed backend does and answers the
//! [`TicketBackend`] contract from them. On top of that it can:
//!
//! - count calls per operation ([`InMemoryTicketBackend::calls`])
//! - fail a given operation with a chosen [`BackendError`]
//! - hold a given operation until released, to exercise concurrent callers
//! - pretend the `ticket_validations` table is not deployed

use afritix_core::backend::{
    EventRow, JoinedTicketRow, NewTransfer, ORDER_STATUS_COMPLETED, PAYMENT_METHOD_CARD,
    PurchaseOutcome, PurchaseReceipt, PurchaseRequest, TicketBackend, TicketRow,
    TicketTypeRow, TicketTypeSummary, ValidationRow,
};
use afritix_core::error::{BackendError, BackendResult};
use afritix_core::types::{
    EventId, OrderId, TicketId, TicketStatus, TicketTransfer, TicketTypeId, TransferId,
    TransferStatus, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

/// Operations of the [`TicketBackend`] contract, for counting and injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    /// `list_tickets_for_user`
    ListTickets,
    /// `fetch_joined_ticket`
    FetchJoinedTicket,
    /// `fetch_ticket_row`
    FetchTicketRow,
    /// `fetch_owned_ticket`
    FetchOwnedTicket,
    /// `fetch_validation_log`
    FetchValidationLog,
    /// `fetch_ticket_type`
    FetchTicketType,
    /// `purchase`
    Purchase,
    /// `find_profile_by_email`
    FindProfile,
    /// `initiate_transfer`
    InitiateTransfer,
}

/// An `orders` row written by a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// Order ID
    pub id: OrderId,
    /// Buyer
    pub user_id: UserId,
    /// Event
    pub event_id: EventId,
    /// Total charged
    pub total: f64,
    /// Order status
    pub status: String,
    /// Payment method
    pub payment_method: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Tables {
    events: HashMap<EventId, EventRow>,
    ticket_types: HashMap<TicketTypeId, TicketTypeRow>,
    tickets: Vec<TicketRow>,
    orders: Vec<OrderRecord>,
    transfers: Vec<TicketTransfer>,
    profiles: HashMap<String, UserId>,
    ticket_updates: HashMap<TicketId, DateTime<Utc>>,
    // `None` when the table is not deployed
    validations: Option<Vec<ValidationRow>>,
    calls: Vec<BackendCall>,
    failures: HashMap<BackendCall, BackendError>,
    gates: HashMap<BackendCall, Arc<Semaphore>>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            events: HashMap::new(),
            ticket_types: HashMap::new(),
            tickets: Vec::new(),
            orders: Vec::new(),
            transfers: Vec::new(),
            profiles: HashMap::new(),
            ticket_updates: HashMap::new(),
            validations: Some(Vec::new()),
            calls: Vec::new(),
            failures: HashMap::new(),
            gates: HashMap::new(),
        }
    }
}

impl Tables {
    fn join(&self, ticket: &TicketRow) -> JoinedTicketRow {
        JoinedTicketRow {
            ticket: ticket.clone(),
            event: self.events.get(&ticket.event_id).cloned(),
            ticket_type: self
                .ticket_types
                .get(&ticket.ticket_type_id)
                .map(|tier| TicketTypeSummary {
                    name: tier.name.clone(),
                    price: tier.price,
                }),
        }
    }
}

/// In-memory [`TicketBackend`].
///
/// Clones share the same tables, so a test can keep one handle for seeding
/// and inspection while the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketBackend {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryTicketBackend {
    /// Create an empty backend with an empty validation log table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend whose `ticket_validations` table is missing.
    #[must_use]
    pub fn without_validation_table() -> Self {
        let backend = Self::new();
        backend.write().validations = None;
        backend
    }

    #[allow(clippy::unwrap_used)] // Test infrastructure
    fn write(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Insert or replace an event.
    pub fn seed_event(&self, event: EventRow) {
        self.write().events.insert(event.id, event);
    }

    /// Remove an event, leaving tickets that reference it dangling.
    pub fn remove_event(&self, event_id: EventId) {
        self.write().events.remove(&event_id);
    }

    /// Insert or replace a ticket type. The `event` join is ignored; it is
    /// resolved from the events table on read.
    pub fn seed_ticket_type(&self, ticket_type: TicketTypeRow) {
        let mut tables = self.write();
        tables.ticket_types.insert(
            ticket_type.id,
            TicketTypeRow {
                event: None,
                ..ticket_type
            },
        );
    }

    /// Insert a ticket row.
    pub fn seed_ticket(&self, ticket: TicketRow) {
        self.write().tickets.push(ticket);
    }

    /// Register an account email.
    pub fn seed_profile(&self, email: impl Into<String>, user_id: UserId) {
        self.write().profiles.insert(email.into(), user_id);
    }

    /// Append a validation log row, deploying the table if needed.
    pub fn seed_validation(&self, row: ValidationRow) {
        self.write().validations.get_or_insert_with(Vec::new).push(row);
    }

    /// Insert an existing transfer.
    pub fn seed_transfer(&self, transfer: TicketTransfer) {
        self.write().transfers.push(transfer);
    }

    // ------------------------------------------------------------------
    // Injection
    // ------------------------------------------------------------------

    /// Make every subsequent `call` fail with `error` until [`Self::recover`].
    pub fn fail(&self, call: BackendCall, error: BackendError) {
        self.write().failures.insert(call, error);
    }

    /// Stop failing `call`.
    pub fn recover(&self, call: BackendCall) {
        self.write().failures.remove(&call);
    }

    /// Hold every subsequent `call` until [`Self::release`] grants it a pass.
    pub fn hold(&self, call: BackendCall) {
        self.write()
            .gates
            .entry(call)
            .or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Let one held `call` through.
    pub fn release(&self, call: BackendCall) {
        if let Some(gate) = self.write().gates.get(&call) {
            gate.add_permits(1);
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Number of times `call` was issued, including failed ones.
    #[must_use]
    pub fn calls(&self, call: BackendCall) -> usize {
        self.write().calls.iter().filter(|made| **made == call).count()
    }

    /// Every call issued, in order.
    #[must_use]
    pub fn call_log(&self) -> Vec<BackendCall> {
        self.write().calls.clone()
    }

    /// All ticket rows, in insertion order.
    #[must_use]
    pub fn tickets(&self) -> Vec<TicketRow> {
        self.write().tickets.clone()
    }

    /// A single ticket row.
    #[must_use]
    pub fn ticket(&self, ticket_id: TicketId) -> Option<TicketRow> {
        self.write()
            .tickets
            .iter()
            .find(|ticket| ticket.id == ticket_id)
            .cloned()
    }

    /// When `ticket_id` was last updated by a transfer.
    #[must_use]
    pub fn ticket_updated_at(&self, ticket_id: TicketId) -> Option<DateTime<Utc>> {
        self.write().ticket_updates.get(&ticket_id).copied()
    }

    /// All orders, in insertion order.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.write().orders.clone()
    }

    /// All transfers, in insertion order.
    #[must_use]
    pub fn transfers(&self) -> Vec<TicketTransfer> {
        self.write().transfers.clone()
    }

    /// Remaining inventory of a ticket type.
    #[must_use]
    pub fn available(&self, ticket_type_id: TicketTypeId) -> Option<i32> {
        self.write()
            .ticket_types
            .get(&ticket_type_id)
            .map(|tier| tier.available)
    }

    /// Record the call, apply injected failures, then wait on any hold.
    fn enter(&self, call: BackendCall) -> impl Future<Output = BackendResult<()>> + Send {
        let tables = Arc::clone(&self.tables);

        async move {
            let gate = {
                let mut guard = tables.lock().map_err(|_| poisoned())?;
                guard.calls.push(call);
                if let Some(error) = guard.failures.get(&call) {
                    return Err(error.clone());
                }
                guard.gates.get(&call).cloned()
            };

            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            Ok(())
        }
    }
}

fn poisoned() -> BackendError {
    BackendError::message("in-memory backend lock poisoned")
}

impl TicketBackend for InMemoryTicketBackend {
    fn list_tickets_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Vec<JoinedTicketRow>>> + Send {
        let entered = self.enter(BackendCall::ListTickets);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            let mut owned: Vec<&TicketRow> = guard
                .tickets
                .iter()
                .filter(|ticket| ticket.user_id == user_id)
                .collect();
            owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(owned.into_iter().map(|ticket| guard.join(ticket)).collect())
        }
    }

    fn fetch_joined_ticket(
        &self,
        ticket_id: TicketId,
    ) -> impl Future<Output = BackendResult<Option<JoinedTicketRow>>> + Send {
        let entered = self.enter(BackendCall::FetchJoinedTicket);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            Ok(guard
                .tickets
                .iter()
                .find(|ticket| ticket.id == ticket_id)
                .map(|ticket| guard.join(ticket)))
        }
    }

    fn fetch_ticket_row(
        &self,
        ticket_id: TicketId,
    ) -> impl Future<Output = BackendResult<Option<TicketRow>>> + Send {
        let entered = self.enter(BackendCall::FetchTicketRow);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            Ok(guard
                .tickets
                .iter()
                .find(|ticket| ticket.id == ticket_id)
                .cloned())
        }
    }

    fn fetch_owned_ticket(
        &self,
        ticket_id: TicketId,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Option<TicketRow>>> + Send {
        let entered = self.enter(BackendCall::FetchOwnedTicket);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            Ok(guard
                .tickets
                .iter()
                .find(|ticket| ticket.id == ticket_id && ticket.user_id == user_id)
                .cloned())
        }
    }

    fn fetch_validation_log(
        &self,
        ticket_id: TicketId,
    ) -> impl Future<Output = BackendResult<Vec<ValidationRow>>> + Send {
        let entered = self.enter(BackendCall::FetchValidationLog);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            let Some(log) = guard.validations.as_ref() else {
                return Err(BackendError::new(
                    Some("42P01"),
                    "relation \"public.ticket_validations\" does not exist",
                ));
            };
            let mut rows: Vec<ValidationRow> = log
                .iter()
                .filter(|row| row.ticket_id == ticket_id)
                .cloned()
                .collect();
            rows.sort_by_key(|row| row.created_at);
            Ok(rows)
        }
    }

    fn fetch_ticket_type(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> impl Future<Output = BackendResult<Option<TicketTypeRow>>> + Send {
        let entered = self.enter(BackendCall::FetchTicketType);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            Ok(guard.ticket_types.get(&ticket_type_id).map(|tier| TicketTypeRow {
                event: guard.events.get(&tier.event_id).cloned(),
                ..tier.clone()
            }))
        }
    }

    fn purchase(
        &self,
        request: PurchaseRequest,
    ) -> impl Future<Output = BackendResult<PurchaseOutcome>> + Send {
        let entered = self.enter(BackendCall::Purchase);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            // One guard for the whole purchase: check, insert and decrement
            // cannot interleave with another buyer.
            let mut guard = tables.lock().map_err(|_| poisoned())?;

            let Some(tier) = guard.ticket_types.get_mut(&request.ticket_type_id) else {
                return Err(BackendError::new(Some("PGRST116"), "ticket type not found"));
            };
            if tier.available <= 0 {
                return Ok(PurchaseOutcome::SoldOut);
            }
            tier.available -= 1;
            let remaining = tier.available;

            let order_id = OrderId::new();
            guard.orders.push(OrderRecord {
                id: order_id,
                user_id: request.user_id,
                event_id: request.event_id,
                total: request.total,
                status: ORDER_STATUS_COMPLETED.to_string(),
                payment_method: PAYMENT_METHOD_CARD.to_string(),
                created_at: request.issued_at,
            });

            let ticket = TicketRow {
                id: TicketId::new(),
                user_id: request.user_id,
                event_id: request.event_id,
                ticket_type_id: request.ticket_type_id,
                order_id: Some(order_id),
                qr_code: request.qr_code,
                status: Some(TicketStatus::Valid.as_str().to_string()),
                created_at: request.issued_at,
                scanned_at: None,
                scanned_by: None,
                scan_location: None,
            };
            guard.tickets.push(ticket.clone());

            Ok(PurchaseOutcome::Issued(PurchaseReceipt {
                order_id,
                ticket,
                remaining,
            }))
        }
    }

    fn find_profile_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = BackendResult<Option<UserId>>> + Send {
        let entered = self.enter(BackendCall::FindProfile);
        let tables = Arc::clone(&self.tables);
        let email = email.to_string();

        async move {
            entered.await?;
            let guard = tables.lock().map_err(|_| poisoned())?;
            Ok(guard.profiles.get(&email).copied())
        }
    }

    fn initiate_transfer(
        &self,
        transfer: NewTransfer,
    ) -> impl Future<Output = BackendResult<TicketTransfer>> + Send {
        let entered = self.enter(BackendCall::InitiateTransfer);
        let tables = Arc::clone(&self.tables);

        async move {
            entered.await?;
            let mut guard = tables.lock().map_err(|_| poisoned())?;
            let tables = &mut *guard;

            // Mirrors the partial unique index on active transfers
            if tables
                .transfers
                .iter()
                .any(|existing| existing.ticket_id == transfer.ticket_id && existing.is_active())
            {
                return Err(BackendError::new(
                    Some("23505"),
                    "duplicate key value violates unique constraint \"ticket_transfers_active_ticket\"",
                ));
            }

            let Some(ticket) = tables
                .tickets
                .iter_mut()
                .find(|ticket| ticket.id == transfer.ticket_id)
            else {
                return Err(BackendError::message("ticket not found"));
            };
            ticket.status = Some(TicketStatus::TransferPending.as_str().to_string());
            tables.ticket_updates.insert(transfer.ticket_id, transfer.created_at);

            let record = TicketTransfer {
                id: TransferId::new(),
                ticket_id: transfer.ticket_id,
                sender_id: transfer.sender_id,
                recipient_email: transfer.recipient_email,
                recipient_id: transfer.recipient_id,
                status: TransferStatus::Pending,
                created_at: transfer.created_at,
                updated_at: None,
                expires_at: transfer.expires_at,
                accepted_at: None,
                rejected_at: None,
            };
            tables.transfers.push(record.clone());
            Ok(record)
        }
    }
}
