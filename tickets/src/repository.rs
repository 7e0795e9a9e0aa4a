//! Ticket repository.
//!
//! Every operation takes the acting user explicitly and fails closed with
//! [`TicketError::Unauthenticated`] without one. Backend errors are logged
//! here and surface as [`TicketError::DataSource`]; nothing is retried.

use crate::config::TicketSettings;
use crate::history::{self, ValidationHistory};
use crate::messages::{
    self, INCOMPLETE_TICKET_DATA, TICKET_ISSUED, TICKET_NOT_FOUND, TICKET_TYPE_NOT_FOUND,
};
use crate::metrics::{PURCHASES_REJECTED, TICKETS_LISTED, TICKETS_PURCHASED, TRANSFERS_INITIATED};
use afritix_core::backend::{
    EventRow, JoinedTicketRow, NewTransfer, PurchaseOutcome, PurchaseRequest, TicketBackend,
    TicketRow,
};
use afritix_core::environment::Clock;
use afritix_core::error::{BackendError, Result};
use afritix_core::types::{
    EventId, Ticket, TicketId, TicketStatus, TicketTransfer, TicketTypeId, UserId,
    ValidationEvent,
};
use afritix_core::{RecipientError, TicketError};
use rand::Rng;
use std::sync::Arc;

/// Why a joined row cannot be shown.
#[derive(Debug, thiserror::Error)]
enum RowDefect {
    #[error("event join missing")]
    MissingEvent,
    #[error("ticket type join missing")]
    MissingTicketType,
    #[error("unknown status {0:?}")]
    UnknownStatus(String),
}

/// A transfer written by [`TicketRepository::transfer_ticket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// The PENDING transfer record
    pub transfer: TicketTransfer,
    /// Local history entry for the selected ticket; never persisted
    pub history_entry: ValidationEvent,
}

/// Ticket operations over a [`TicketBackend`].
pub struct TicketRepository<B> {
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    settings: TicketSettings,
}

impl<B> std::fmt::Debug for TicketRepository<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketRepository")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<B: TicketBackend> TicketRepository<B> {
    /// Create a repository.
    #[must_use]
    pub fn new(backend: Arc<B>, clock: Arc<dyn Clock>, settings: TicketSettings) -> Self {
        Self {
            backend,
            clock,
            settings,
        }
    }

    /// The backend this repository talks to.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Tickets owned by `user`, newest first.
    ///
    /// Rows missing their event or ticket type are dropped.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a user, `DataSource` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_tickets(&self, user: Option<UserId>) -> Result<Vec<Ticket>> {
        let user_id = user.ok_or(TicketError::Unauthenticated)?;

        let rows = self
            .backend
            .list_tickets_for_user(user_id)
            .await
            .map_err(|e| data_source("list tickets", e))?;

        let fetched = rows.len();
        let tickets: Vec<Ticket> = rows
            .into_iter()
            .filter_map(|row| {
                let ticket_id = row.ticket.id;
                match self.ticket_from_row(row) {
                    Ok(ticket) => Some(ticket),
                    Err(defect) => {
                        tracing::warn!(ticket_id = %ticket_id, reason = %defect, "Dropping ticket row");
                        None
                    },
                }
            })
            .collect();

        tracing::debug!(fetched, kept = tickets.len(), "Tickets fetched");
        ::metrics::counter!(TICKETS_LISTED).increment(tickets.len() as u64);
        Ok(tickets)
    }

    /// A single ticket with its validation history.
    ///
    /// When `cached` is the in-memory copy, it is reused and only its history
    /// is refreshed.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a user, `DataSource` if the row is
    /// missing, incomplete or unreadable.
    #[tracing::instrument(skip(self, cached), fields(cached = cached.is_some()))]
    pub async fn fetch_ticket(
        &self,
        user: Option<UserId>,
        ticket_id: TicketId,
        cached: Option<Ticket>,
    ) -> Result<Ticket> {
        user.ok_or(TicketError::Unauthenticated)?;

        if let Some(mut ticket) = cached.filter(|ticket| ticket.id == ticket_id) {
            let history = self.validation_history(ticket_id, Some(&ticket)).await;
            ticket.validation_history = history.events;
            return Ok(ticket);
        }

        let row = self
            .backend
            .fetch_joined_ticket(ticket_id)
            .await
            .map_err(|e| data_source("fetch ticket", e))?
            .ok_or_else(|| TicketError::DataSource(BackendError::message(TICKET_NOT_FOUND)))?;

        let mut ticket = self.ticket_from_row(row).map_err(|defect| {
            tracing::warn!(ticket_id = %ticket_id, reason = %defect, "Ticket row incomplete");
            TicketError::DataSource(BackendError::message(INCOMPLETE_TICKET_DATA))
        })?;

        let history = self.validation_history(ticket_id, None).await;
        ticket.validation_history = history.events;
        Ok(ticket)
    }

    /// Assemble the audit trail of `ticket_id`. Never fails.
    pub async fn validation_history(
        &self,
        ticket_id: TicketId,
        known: Option<&Ticket>,
    ) -> ValidationHistory {
        history::assemble(self.backend.as_ref(), self.clock.as_ref(), ticket_id, known).await
    }

    /// Buy one ticket of `ticket_type_id`.
    ///
    /// The order, the ticket and the inventory decrement are committed by a
    /// single backend call.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a user, `Unavailable` when the tier
    /// is sold out (including a sell-out between the check and the write),
    /// `DataSource` on backend failure.
    #[tracing::instrument(skip(self))]
    pub async fn purchase_ticket(
        &self,
        user: Option<UserId>,
        event_id: EventId,
        ticket_type_id: TicketTypeId,
    ) -> Result<Ticket> {
        let user_id = user.ok_or(TicketError::Unauthenticated)?;

        let tier = self
            .backend
            .fetch_ticket_type(ticket_type_id)
            .await
            .map_err(|e| data_source("fetch ticket type", e))?
            .ok_or_else(|| TicketError::DataSource(BackendError::message(TICKET_TYPE_NOT_FOUND)))?;

        if tier.available <= 0 {
            ::metrics::counter!(PURCHASES_REJECTED, "reason" => "sold_out").increment(1);
            return Err(TicketError::Unavailable);
        }

        let event = tier
            .event
            .ok_or_else(|| TicketError::DataSource(BackendError::message(INCOMPLETE_TICKET_DATA)))?;

        let suffix = rand::thread_rng().gen_range(0..100_000);
        let issued_at = self.clock.now();
        let request = PurchaseRequest {
            user_id,
            event_id,
            ticket_type_id,
            qr_code: issuance_code(&event.title, &tier.name, suffix),
            total: tier.price,
            issued_at,
        };

        let receipt = match self
            .backend
            .purchase(request)
            .await
            .map_err(|e| data_source("purchase", e))?
        {
            PurchaseOutcome::Issued(receipt) => receipt,
            PurchaseOutcome::SoldOut => {
                ::metrics::counter!(PURCHASES_REJECTED, "reason" => "concurrent_sell_out")
                    .increment(1);
                return Err(TicketError::Unavailable);
            },
        };

        let row = receipt.ticket;
        let ticket = Ticket {
            id: row.id,
            event_id,
            event_title: event.title,
            event_date: event.date,
            event_time: event.time,
            event_venue: event.location.clone(),
            event_location: event.location,
            ticket_type: tier.name,
            price: tier.price,
            currency: event
                .currency
                .unwrap_or_else(|| self.settings.default_currency.clone()),
            purchase_date: issued_at.date_naive(),
            qr_code: row.qr_code,
            used: false,
            status: TicketStatus::Valid,
            scanned_at: None,
            scanned_by: None,
            scan_location: None,
            validation_history: vec![ValidationEvent::succeeded(
                "1",
                row.id,
                TICKET_ISSUED,
                issued_at,
            )],
        };

        tracing::info!(
            ticket_id = %ticket.id,
            order_id = %receipt.order_id,
            remaining = receipt.remaining,
            "Ticket purchased"
        );
        ::metrics::counter!(TICKETS_PURCHASED).increment(1);
        Ok(ticket)
    }

    /// Hand `ticket_id` to `recipient_email`.
    ///
    /// Only VALID tickets owned by `user` can be transferred. The recipient
    /// account is looked up on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a user, `InvalidRecipient` for a
    /// blank or malformed address, `UnauthorizedOrMissing` when the ticket is
    /// not the user's, `InvalidState` unless it is VALID, `DataSource` when a
    /// write fails.
    #[tracing::instrument(skip(self))]
    pub async fn transfer_ticket(
        &self,
        user: Option<UserId>,
        ticket_id: TicketId,
        recipient_email: &str,
    ) -> Result<TransferReceipt> {
        let user_id = user.ok_or(TicketError::Unauthenticated)?;
        let recipient_email = validate_recipient(recipient_email)?;

        let row = match self.backend.fetch_owned_ticket(ticket_id, user_id).await {
            Ok(Some(row)) => row,
            Ok(None) => return Err(TicketError::UnauthorizedOrMissing),
            Err(error) => {
                tracing::warn!(error = %error, "Owned ticket lookup failed");
                return Err(TicketError::UnauthorizedOrMissing);
            },
        };

        let status = row_status(&row).map_err(|defect| {
            tracing::warn!(reason = %defect, "Ticket status unreadable");
            TicketError::DataSource(BackendError::message(INCOMPLETE_TICKET_DATA))
        })?;
        if status != TicketStatus::Valid {
            return Err(TicketError::InvalidState { status });
        }

        let recipient_id = match self.backend.find_profile_by_email(&recipient_email).await {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(error = %error, "Recipient lookup failed, continuing without account");
                None
            },
        };

        let now = self.clock.now();
        let transfer = self
            .backend
            .initiate_transfer(NewTransfer {
                ticket_id,
                sender_id: user_id,
                recipient_email: recipient_email.clone(),
                recipient_id,
                created_at: now,
                expires_at: now + self.settings.transfer_expiry(),
            })
            .await
            .map_err(|e| data_source("initiate transfer", e))?;

        tracing::info!(
            transfer_id = %transfer.id,
            known_recipient = recipient_id.is_some(),
            "Transfer initiated"
        );
        ::metrics::counter!(TRANSFERS_INITIATED).increment(1);

        Ok(TransferReceipt {
            transfer,
            history_entry: ValidationEvent::succeeded(
                now.timestamp_millis().to_string(),
                ticket_id,
                messages::transfer_initiated(&recipient_email),
                now,
            ),
        })
    }

    fn ticket_from_row(&self, row: JoinedTicketRow) -> std::result::Result<Ticket, RowDefect> {
        let status = row_status(&row.ticket)?;
        let EventRow {
            title,
            date,
            time,
            location,
            currency,
            ..
        } = row.event.ok_or(RowDefect::MissingEvent)?;
        let ticket_type = row.ticket_type.ok_or(RowDefect::MissingTicketType)?;
        let ticket = row.ticket;

        Ok(Ticket {
            id: ticket.id,
            event_id: ticket.event_id,
            event_title: title,
            event_date: date,
            event_time: time,
            event_venue: location.clone(),
            event_location: location,
            ticket_type: ticket_type.name,
            price: ticket_type.price,
            currency: currency.unwrap_or_else(|| self.settings.default_currency.clone()),
            purchase_date: ticket.created_at.date_naive(),
            qr_code: ticket.qr_code,
            used: status == TicketStatus::Used,
            status,
            scanned_at: ticket.scanned_at,
            scanned_by: ticket.scanned_by,
            scan_location: ticket.scan_location,
            validation_history: Vec::new(),
        })
    }
}

/// Missing status reads as VALID.
fn row_status(row: &TicketRow) -> std::result::Result<TicketStatus, RowDefect> {
    match row.status.as_deref() {
        None => Ok(TicketStatus::Valid),
        Some(raw) => raw
            .parse()
            .map_err(|_| RowDefect::UnknownStatus(raw.to_string())),
    }
}

fn data_source(operation: &str, error: BackendError) -> TicketError {
    tracing::error!(
        operation,
        code = error.code.as_deref().unwrap_or(""),
        error = %error,
        "Backend call failed"
    );
    TicketError::DataSource(error)
}

/// Issuance code: first four title characters, first three type characters,
/// both uppercased, then the numeric suffix.
#[must_use]
pub fn issuance_code(event_title: &str, ticket_type: &str, suffix: u32) -> String {
    let title: String = event_title.chars().take(4).collect();
    let tier: String = ticket_type.chars().take(3).collect();
    format!("{}-{}-{suffix}", title.to_uppercase(), tier.to_uppercase())
}

/// Trim and check a transfer recipient address.
///
/// # Errors
///
/// Returns `InvalidRecipient` when blank or not shaped like an address.
pub fn validate_recipient(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(TicketError::InvalidRecipient(RecipientError::Missing));
    }
    if !is_valid_email(email) {
        return Err(TicketError::InvalidRecipient(RecipientError::Malformed));
    }
    Ok(email.to_string())
}

/// Basic address validation: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local)
        && domain.chars().all(valid_domain)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use afritix_core::types::TransferStatus;
    use afritix_testing::{BackendCall, FixedClock, InMemoryTicketBackend, fixtures, test_clock};
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        backend: InMemoryTicketBackend,
        clock: FixedClock,
        repository: TicketRepository<InMemoryTicketBackend>,
        catalog: fixtures::Catalog,
        user: UserId,
    }

    fn fixture(available: i32) -> Fixture {
        let backend = InMemoryTicketBackend::new();
        let catalog = fixtures::seed_catalog(&backend, available);
        let clock = test_clock();
        let repository = TicketRepository::new(
            Arc::new(backend.clone()),
            Arc::new(clock.clone()),
            TicketSettings::default(),
        );
        Fixture {
            backend,
            clock,
            repository,
            catalog,
            user: UserId::new(),
        }
    }

    // ========================================================================
    // List
    // ========================================================================

    #[tokio::test]
    async fn list_requires_a_user() {
        let f = fixture(5);
        let result = f.repository.list_tickets(None).await;
        assert_eq!(result, Err(TicketError::Unauthenticated));
        assert_eq!(f.backend.calls(BackendCall::ListTickets), 0);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_drops_incomplete_rows() {
        let f = fixture(5);
        let older = fixtures::seed_owned_ticket(
            &f.backend,
            &f.catalog,
            f.user,
            Utc.with_ymd_and_hms(2024, 11, 2, 8, 0, 0).unwrap(),
            TicketStatus::Used,
        );
        let newer = fixtures::seed_owned_ticket(
            &f.backend,
            &f.catalog,
            f.user,
            Utc.with_ymd_and_hms(2024, 12, 20, 8, 0, 0).unwrap(),
            TicketStatus::Valid,
        );

        // Ticket whose event was deleted
        let orphan_event = fixtures::event("Concert annulé");
        let orphan_tier = fixtures::ticket_type(&orphan_event, "Standard", 5_000.0, 10);
        f.backend.seed_ticket_type(orphan_tier.clone());
        f.backend.seed_ticket(fixtures::ticket_row(
            f.user,
            &orphan_tier,
            Utc.with_ymd_and_hms(2024, 12, 25, 8, 0, 0).unwrap(),
            None,
        ));

        // Someone else's ticket
        fixtures::seed_owned_ticket(
            &f.backend,
            &f.catalog,
            UserId::new(),
            Utc.with_ymd_and_hms(2024, 12, 21, 8, 0, 0).unwrap(),
            TicketStatus::Valid,
        );

        let tickets = f.repository.list_tickets(Some(f.user)).await.unwrap();

        let ids: Vec<TicketId> = tickets.iter().map(|t| t.id).collect();
        assert_eq!(ids, [newer.id, older.id]);
        assert!(tickets.iter().all(|t| t.event_venue == t.event_location));
        assert!(tickets[1].used);
        assert!(!tickets[0].used);
        assert_eq!(tickets[0].purchase_date, chrono::NaiveDate::from_ymd_opt(2024, 12, 20).unwrap());
    }

    #[tokio::test]
    async fn list_defaults_missing_status_and_currency() {
        let f = fixture(5);
        let mut event = fixtures::event("Nuit du Jazz");
        event.currency = None;
        let tier = fixtures::ticket_type(&event, "Standard", 5_000.0, 10);
        f.backend.seed_event(event);
        f.backend.seed_ticket_type(tier.clone());
        f.backend.seed_ticket(fixtures::ticket_row(f.user, &tier, f.clock.now(), None));

        let tickets = f.repository.list_tickets(Some(f.user)).await.unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].status, TicketStatus::Valid);
        assert_eq!(tickets[0].currency, "XOF");
    }

    #[tokio::test]
    async fn list_failure_is_a_localized_data_source_error() {
        let f = fixture(5);
        f.backend.fail(BackendCall::ListTickets, BackendError::code("42501"));

        let error = f.repository.list_tickets(Some(f.user)).await.unwrap_err();

        assert!(matches!(error, TicketError::DataSource(_)));
        assert_eq!(
            error.user_message(),
            "Erreur de permission. Veuillez vous connecter à nouveau."
        );
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    #[tokio::test]
    async fn fetch_reuses_cached_ticket() {
        let f = fixture(5);
        fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Valid);
        let cached = f.repository.list_tickets(Some(f.user)).await.unwrap().remove(0);

        for _ in 0..2 {
            let ticket = f
                .repository
                .fetch_ticket(Some(f.user), cached.id, Some(cached.clone()))
                .await
                .unwrap();
            assert_eq!(ticket.id, cached.id);
            assert_eq!(ticket.validation_history[0].status, TICKET_ISSUED);
        }

        assert_eq!(f.backend.calls(BackendCall::FetchJoinedTicket), 0);
        assert_eq!(f.backend.calls(BackendCall::FetchValidationLog), 2);
    }

    #[tokio::test]
    async fn fetch_uncached_queries_the_joined_row() {
        let f = fixture(5);
        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Valid);

        let ticket = f.repository.fetch_ticket(Some(f.user), row.id, None).await.unwrap();

        assert_eq!(ticket.event_title, "Festival Sabar");
        assert_eq!(ticket.validation_history.len(), 1);
        assert_eq!(f.backend.calls(BackendCall::FetchJoinedTicket), 1);
    }

    #[tokio::test]
    async fn fetch_missing_or_incomplete_row_fails() {
        let f = fixture(5);
        let missing = f.repository.fetch_ticket(Some(f.user), TicketId::new(), None).await;
        assert_eq!(missing.unwrap_err().user_message(), TICKET_NOT_FOUND);

        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Valid);
        f.backend.remove_event(f.catalog.event.id);
        let incomplete = f.repository.fetch_ticket(Some(f.user), row.id, None).await;
        assert_eq!(incomplete.unwrap_err().user_message(), INCOMPLETE_TICKET_DATA);
    }

    // ========================================================================
    // Purchase
    // ========================================================================

    #[tokio::test]
    async fn purchase_issues_one_valid_ticket() {
        let f = fixture(1);

        let ticket = f
            .repository
            .purchase_ticket(Some(f.user), f.catalog.event.id, f.catalog.ticket_type.id)
            .await
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Valid);
        assert!(!ticket.used);
        assert_eq!(ticket.validation_history.len(), 1);
        assert_eq!(ticket.validation_history[0].status, TICKET_ISSUED);
        assert_eq!(ticket.qr_payload(), ticket.id.to_string());
        assert!(ticket.qr_code.starts_with("FEST-VIP-"));
        assert_eq!(f.backend.available(f.catalog.ticket_type.id), Some(0));

        let orders = f.backend.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "COMPLETED");
        assert_eq!(orders[0].payment_method, "CARD");
        assert!((orders[0].total - 15_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn purchase_sold_out_is_unavailable() {
        let f = fixture(0);

        let result = f
            .repository
            .purchase_ticket(Some(f.user), f.catalog.event.id, f.catalog.ticket_type.id)
            .await;

        assert_eq!(result, Err(TicketError::Unavailable));
        assert_eq!(f.backend.calls(BackendCall::Purchase), 0);
        assert!(f.backend.tickets().is_empty());
    }

    #[tokio::test]
    async fn purchase_of_unknown_tier_is_not_found() {
        let f = fixture(5);

        let result = f
            .repository
            .purchase_ticket(Some(f.user), f.catalog.event.id, TicketTypeId::new())
            .await;

        assert_eq!(result.unwrap_err().user_message(), TICKET_TYPE_NOT_FOUND);
        assert_eq!(f.backend.calls(BackendCall::Purchase), 0);
    }

    #[tokio::test]
    async fn purchase_losing_the_race_is_unavailable() {
        let f = fixture(1);
        // Another buyer reaches the write at the same time for the last seat
        f.backend.hold(BackendCall::Purchase);
        let rival = f.backend.purchase(f.catalog.purchase_request(UserId::new()));
        let ours = f
            .repository
            .purchase_ticket(Some(f.user), f.catalog.event.id, f.catalog.ticket_type.id);
        let release = async {
            tokio::task::yield_now().await;
            f.backend.release(BackendCall::Purchase);
            f.backend.release(BackendCall::Purchase);
        };

        let (rival, ours, ()) = tokio::join!(rival, ours, release);

        let issued = usize::from(matches!(rival.unwrap(), PurchaseOutcome::Issued(_)))
            + usize::from(ours.is_ok());
        assert_eq!(issued, 1);
        if let Err(error) = ours {
            assert_eq!(error, TicketError::Unavailable);
        }
        assert_eq!(f.backend.tickets().len(), 1);
        assert_eq!(f.backend.available(f.catalog.ticket_type.id), Some(0));
    }

    #[test]
    fn issuance_code_uppercases_prefixes() {
        assert_eq!(issuance_code("Festival Sabar", "vip", 7), "FEST-VIP-7");
        assert_eq!(issuance_code("Été", "Or", 42), "ÉTÉ-OR-42");
    }

    // ========================================================================
    // Transfer
    // ========================================================================

    #[tokio::test]
    async fn transfer_valid_ticket_marks_it_pending() {
        let f = fixture(5);
        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Valid);
        let recipient = UserId::new();
        f.backend.seed_profile("ami@example.com", recipient);

        let receipt = f
            .repository
            .transfer_ticket(Some(f.user), row.id, "  ami@example.com ")
            .await
            .unwrap();

        assert_eq!(receipt.transfer.status, TransferStatus::Pending);
        assert_eq!(receipt.transfer.recipient_id, Some(recipient));
        assert_eq!(receipt.transfer.recipient_email, "ami@example.com");
        assert_eq!(
            receipt.transfer.expires_at,
            receipt.transfer.created_at + Duration::days(7)
        );
        assert_eq!(receipt.history_entry.status, "Transfert initié vers ami@example.com");
        assert_eq!(
            f.backend.ticket(row.id).unwrap().status.as_deref(),
            Some("TRANSFER_PENDING")
        );
        assert_eq!(f.backend.ticket_updated_at(row.id), Some(f.clock.now()));
    }

    #[tokio::test]
    async fn transfer_of_used_ticket_is_invalid_state() {
        let f = fixture(5);
        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Used);

        let result = f
            .repository
            .transfer_ticket(Some(f.user), row.id, "ami@example.com")
            .await;

        assert_eq!(result, Err(TicketError::InvalidState { status: TicketStatus::Used }));
        assert_eq!(f.backend.ticket(row.id).unwrap().status.as_deref(), Some("USED"));
        assert!(f.backend.transfers().is_empty());
    }

    #[tokio::test]
    async fn transfer_of_someone_elses_ticket_is_refused() {
        let f = fixture(5);
        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, UserId::new(), f.clock.now(), TicketStatus::Valid);

        let result = f
            .repository
            .transfer_ticket(Some(f.user), row.id, "ami@example.com")
            .await;

        assert_eq!(result, Err(TicketError::UnauthorizedOrMissing));
    }

    #[tokio::test]
    async fn transfer_survives_recipient_lookup_failure() {
        let f = fixture(5);
        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Valid);
        f.backend.fail(BackendCall::FindProfile, BackendError::message("timeout"));

        let receipt = f
            .repository
            .transfer_ticket(Some(f.user), row.id, "inconnu@example.com")
            .await
            .unwrap();

        assert_eq!(receipt.transfer.recipient_id, None);
    }

    #[tokio::test]
    async fn transfer_rejects_bad_addresses_before_any_call() {
        let f = fixture(5);
        let ticket_id = TicketId::new();

        let blank = f.repository.transfer_ticket(Some(f.user), ticket_id, "   ").await;
        assert_eq!(blank, Err(TicketError::InvalidRecipient(RecipientError::Missing)));

        let malformed = f.repository.transfer_ticket(Some(f.user), ticket_id, "ami@localhost").await;
        assert_eq!(malformed, Err(TicketError::InvalidRecipient(RecipientError::Malformed)));

        assert!(f.backend.call_log().is_empty());
    }

    #[tokio::test]
    async fn transfer_write_failure_leaves_ticket_transferable() {
        let f = fixture(5);
        let row = fixtures::seed_owned_ticket(&f.backend, &f.catalog, f.user, f.clock.now(), TicketStatus::Valid);
        f.backend.fail(BackendCall::InitiateTransfer, BackendError::message("connection reset"));

        let result = f
            .repository
            .transfer_ticket(Some(f.user), row.id, "ami@example.com")
            .await;

        assert_eq!(
            result.unwrap_err().user_message(),
            "connection reset"
        );
        assert_eq!(f.backend.ticket(row.id).unwrap().status.as_deref(), Some("VALID"));
        assert!(f.backend.transfers().is_empty());

        f.backend.recover(BackendCall::InitiateTransfer);
        let retried = f
            .repository
            .transfer_ticket(Some(f.user), row.id, "ami@example.com")
            .await
            .unwrap();

        assert_eq!(retried.transfer.status, TransferStatus::Pending);
        assert_eq!(f.backend.transfers().len(), 1);
        assert_eq!(
            f.backend.ticket(row.id).unwrap().status.as_deref(),
            Some("TRANSFER_PENDING")
        );
    }

    #[test]
    fn email_validation_matches_common_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user+tag@sub.example.sn"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example."));
    }
}
