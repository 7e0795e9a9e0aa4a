//! Ready-made rows for tests.
//!
//! Dates are fixed relative to [`test_clock`](crate::test_clock) so that
//! history cut-offs behave the same on every run.

use crate::backend::InMemoryTicketBackend;
use crate::mocks::test_clock;
use afritix_core::backend::{EventRow, PurchaseRequest, TicketRow, TicketTypeRow, ValidationRow};
use afritix_core::environment::Clock;
use afritix_core::types::{EventId, TicketId, TicketStatus, TicketTypeId, UserId};
use chrono::{DateTime, NaiveDate, Utc};

/// An event on 2025-06-14 at 20:00 in Dakar, priced in XOF.
#[must_use]
pub fn event(title: &str) -> EventRow {
    EventRow {
        id: EventId::new(),
        title: title.to_string(),
        date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap_or_default(),
        time: "20:00".to_string(),
        location: "Place de l'Obélisque, Dakar".to_string(),
        currency: Some("XOF".to_string()),
        image_url: None,
    }
}

/// A tier of `event`.
#[must_use]
pub fn ticket_type(event: &EventRow, name: &str, price: f64, available: i32) -> TicketTypeRow {
    TicketTypeRow {
        id: TicketTypeId::new(),
        event_id: event.id,
        name: name.to_string(),
        price,
        available,
        event: Some(event.clone()),
    }
}

/// A ticket for `tier` owned by `user_id`, issued at `created_at`.
#[must_use]
pub fn ticket_row(
    user_id: UserId,
    tier: &TicketTypeRow,
    created_at: DateTime<Utc>,
    status: Option<TicketStatus>,
) -> TicketRow {
    TicketRow {
        id: TicketId::new(),
        user_id,
        event_id: tier.event_id,
        ticket_type_id: tier.id,
        order_id: None,
        qr_code: format!("FEST-{}-4242", tier.name.to_uppercase()),
        status: status.map(|status| status.as_str().to_string()),
        created_at,
        scanned_at: None,
        scanned_by: None,
        scan_location: None,
    }
}

/// A successful scanner log entry.
#[must_use]
pub fn validation_row(ticket_id: TicketId, status: &str, at: DateTime<Utc>) -> ValidationRow {
    ValidationRow {
        id: TicketId::new().to_string(),
        ticket_id,
        status: status.to_string(),
        created_at: at,
        success: true,
        location: Some("Entrée principale".to_string()),
        operator_id: Some("op-17".to_string()),
        operator_name: Some("Awa Ndiaye".to_string()),
        device_id: Some("scanner-03".to_string()),
    }
}

/// An event with a single VIP tier, already seeded.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// The event
    pub event: EventRow,
    /// Its VIP tier
    pub ticket_type: TicketTypeRow,
}

impl Catalog {
    /// A purchase of the VIP tier at the fixed test time.
    #[must_use]
    pub fn purchase_request(&self, user_id: UserId) -> PurchaseRequest {
        PurchaseRequest {
            user_id,
            event_id: self.event.id,
            ticket_type_id: self.ticket_type.id,
            qr_code: "FEST-VIP-4242".to_string(),
            total: self.ticket_type.price,
            issued_at: test_clock().now(),
        }
    }
}

/// Seed "Festival Sabar" with a 15 000 XOF VIP tier holding `available` seats.
pub fn seed_catalog(backend: &InMemoryTicketBackend, available: i32) -> Catalog {
    let event = event("Festival Sabar");
    let ticket_type = ticket_type(&event, "VIP", 15_000.0, available);
    backend.seed_event(event.clone());
    backend.seed_ticket_type(ticket_type.clone());
    Catalog { event, ticket_type }
}

/// Seed a ticket of the catalog's tier for `user_id`.
pub fn seed_owned_ticket(
    backend: &InMemoryTicketBackend,
    catalog: &Catalog,
    user_id: UserId,
    created_at: DateTime<Utc>,
    status: TicketStatus,
) -> TicketRow {
    let row = ticket_row(user_id, &catalog.ticket_type, created_at, Some(status));
    backend.seed_ticket(row.clone());
    row
}
