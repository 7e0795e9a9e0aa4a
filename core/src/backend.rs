//! Backend contract.
//!
//! The managed backend owns the tables (`tickets`, `events`, `ticket_types`,
//! `orders`, `ticket_transfers`, `profiles`, optional `ticket_validations`)
//! and their access policy. This module describes the rows the wallet reads
//! and the mutations it issues; implementations translate them to whatever
//! client the backend speaks.

use crate::error::BackendResult;
use crate::types::{
    EventId, OrderId, TicketId, TicketTransfer, TicketTypeId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;

/// `orders.status` written for a completed purchase.
pub const ORDER_STATUS_COMPLETED: &str = "COMPLETED";

/// `orders.payment_method` written for a purchase.
pub const PAYMENT_METHOD_CARD: &str = "CARD";

/// Row from `events`, as joined onto tickets and ticket types.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Date
    pub date: NaiveDate,
    /// Start time as entered by the organiser
    pub time: String,
    /// Location (also used as venue)
    pub location: String,
    /// Currency; `None` means the storefront default
    pub currency: Option<String>,
    /// Cover image
    pub image_url: Option<String>,
}

/// Name and price of a ticket type, as joined onto tickets.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketTypeSummary {
    /// Tier name
    pub name: String,
    /// Price
    pub price: f64,
}

/// Row from `ticket_types` with its event joined.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketTypeRow {
    /// Ticket type ID
    pub id: TicketTypeId,
    /// Event the tier belongs to
    pub event_id: EventId,
    /// Tier name
    pub name: String,
    /// Price
    pub price: f64,
    /// Remaining inventory
    pub available: i32,
    /// Joined event; `None` when the foreign key dangles
    pub event: Option<EventRow>,
}

/// Row from `tickets`.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    /// Ticket ID
    pub id: TicketId,
    /// Owner
    pub user_id: UserId,
    /// Event
    pub event_id: EventId,
    /// Ticket type
    pub ticket_type_id: TicketTypeId,
    /// Order the ticket was bought in
    pub order_id: Option<OrderId>,
    /// Issuance code
    pub qr_code: String,
    /// Raw status column; `None` is read as VALID
    pub status: Option<String>,
    /// Issuance time
    pub created_at: DateTime<Utc>,
    /// Scan time
    pub scanned_at: Option<DateTime<Utc>>,
    /// Scanning operator
    pub scanned_by: Option<String>,
    /// Scan location
    pub scan_location: Option<String>,
}

/// A ticket row with its `events` and `ticket_types` joins.
///
/// Either join may be absent if the referenced row is gone or hidden by
/// access policy; such rows are not displayable.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTicketRow {
    /// The ticket itself
    pub ticket: TicketRow,
    /// Joined event
    pub event: Option<EventRow>,
    /// Joined ticket type
    pub ticket_type: Option<TicketTypeSummary>,
}

/// Row from `ticket_validations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRow {
    /// Row ID
    pub id: String,
    /// Ticket
    pub ticket_id: TicketId,
    /// Status label recorded by the scanner
    pub status: String,
    /// When recorded
    pub created_at: DateTime<Utc>,
    /// Whether the scan succeeded
    pub success: bool,
    /// Scan location
    pub location: Option<String>,
    /// Operator account
    pub operator_id: Option<String>,
    /// Operator name
    pub operator_name: Option<String>,
    /// Device
    pub device_id: Option<String>,
}

/// Everything needed to issue one ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRequest {
    /// Buyer
    pub user_id: UserId,
    /// Event
    pub event_id: EventId,
    /// Ticket type
    pub ticket_type_id: TicketTypeId,
    /// Issuance code for the new ticket
    pub qr_code: String,
    /// Order total
    pub total: f64,
    /// Issuance time
    pub issued_at: DateTime<Utc>,
}

/// Successful purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    /// Order created for the purchase
    pub order_id: OrderId,
    /// Ticket created for the order
    pub ticket: TicketRow,
    /// Inventory left on the ticket type after the decrement
    pub remaining: i32,
}

/// Result of an atomic purchase.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    /// Order, ticket and decrement were all committed
    Issued(PurchaseReceipt),
    /// Inventory ran out before the decrement; nothing was written
    SoldOut,
}

/// A transfer to be written with status PENDING.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    /// Ticket
    pub ticket_id: TicketId,
    /// Current owner
    pub sender_id: UserId,
    /// Invitation address
    pub recipient_email: String,
    /// Recipient account when the address belongs to a member
    pub recipient_id: Option<UserId>,
    /// Request time
    pub created_at: DateTime<Utc>,
    /// Expiry stamp
    pub expires_at: DateTime<Utc>,
}

/// Query/mutation client for the managed backend.
///
/// All methods are single round-trips except [`TicketBackend::purchase`] and
/// [`TicketBackend::initiate_transfer`], which commit their writes atomically.
pub trait TicketBackend: Send + Sync {
    /// Tickets owned by `user_id`, joined, newest first by `created_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_tickets_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Vec<JoinedTicketRow>>> + Send;

    /// A single joined ticket.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn fetch_joined_ticket(
        &self,
        ticket_id: TicketId,
    ) -> impl Future<Output = BackendResult<Option<JoinedTicketRow>>> + Send;

    /// A single ticket row without joins.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn fetch_ticket_row(
        &self,
        ticket_id: TicketId,
    ) -> impl Future<Output = BackendResult<Option<TicketRow>>> + Send;

    /// A ticket row only if it is owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn fetch_owned_ticket(
        &self,
        ticket_id: TicketId,
        user_id: UserId,
    ) -> impl Future<Output = BackendResult<Option<TicketRow>>> + Send;

    /// Validation log for a ticket, ascending by `created_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or the log table is not deployed.
    fn fetch_validation_log(
        &self,
        ticket_id: TicketId,
    ) -> impl Future<Output = BackendResult<Vec<ValidationRow>>> + Send;

    /// A ticket type with its event.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn fetch_ticket_type(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> impl Future<Output = BackendResult<Option<TicketTypeRow>>> + Send;

    /// Create the order, create the ticket, decrement availability.
    ///
    /// All three writes commit together or not at all.
    ///
    /// # Errors
    ///
    /// Returns error if any write fails; nothing is persisted in that case.
    fn purchase(
        &self,
        request: PurchaseRequest,
    ) -> impl Future<Output = BackendResult<PurchaseOutcome>> + Send;

    /// Account id registered for `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_profile_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = BackendResult<Option<UserId>>> + Send;

    /// Insert a PENDING transfer and mark its ticket TRANSFER_PENDING.
    ///
    /// Both writes commit together or not at all. The ticket's `updated_at`
    /// is set to the transfer's `created_at`.
    ///
    /// # Errors
    ///
    /// Returns error if either write fails, including when an active transfer
    /// already exists for the ticket; nothing is persisted in that case.
    fn initiate_transfer(
        &self,
        transfer: NewTransfer,
    ) -> impl Future<Output = BackendResult<TicketTransfer>> + Send;
}
