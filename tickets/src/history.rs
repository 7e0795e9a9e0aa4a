//! Validation-history assembler.
//!
//! A ticket's audit trail comes from the first source that answers:
//!
//! 1. **Log**: `ticket_validations` rows, ascending by creation time
//! 2. **Ticket row**: issuance at `created_at`, plus entry at `scanned_at`
//! 3. **Synthetic**: a schedule derived from the in-memory ticket's purchase
//!    date, cut off at the current time
//!
//! Assembly never fails. Synthetic entry is only produced for USED tickets.

use crate::messages::{ENTRY_GRANTED, TICKET_ISSUED, TICKET_VERIFIED};
use afritix_core::backend::{TicketBackend, TicketRow, ValidationRow};
use afritix_core::environment::Clock;
use afritix_core::types::{Ticket, TicketId, TicketStatus, ValidationEvent};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Which tier produced a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    /// Explicit validation log
    Log,
    /// Derived from the ticket's own scan columns
    TicketRow,
    /// Generated from the purchase date
    Synthetic,
}

impl HistorySource {
    /// Metrics label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::TicketRow => "ticket_row",
            Self::Synthetic => "synthetic",
        }
    }
}

/// A display-ready audit trail and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationHistory {
    /// Events, ascending by timestamp
    pub events: Vec<ValidationEvent>,
    /// Tier that produced them
    pub source: HistorySource,
}

/// Assemble the history of `ticket_id`.
///
/// `known` is the in-memory copy of the ticket, used only by the synthetic
/// tier.
pub async fn assemble<B>(
    backend: &B,
    clock: &dyn Clock,
    ticket_id: TicketId,
    known: Option<&Ticket>,
) -> ValidationHistory
where
    B: TicketBackend,
{
    match backend.fetch_validation_log(ticket_id).await {
        Ok(rows) if !rows.is_empty() => {
            return ValidationHistory {
                events: from_log(rows),
                source: HistorySource::Log,
            };
        },
        Ok(_) => {},
        Err(error) => {
            tracing::debug!(ticket_id = %ticket_id, error = %error, "Validation log unavailable");
        },
    }

    let history = match backend.fetch_ticket_row(ticket_id).await {
        Ok(Some(row)) => ValidationHistory {
            events: from_ticket_row(&row),
            source: HistorySource::TicketRow,
        },
        Ok(None) => {
            tracing::warn!(ticket_id = %ticket_id, "Ticket row missing, synthesizing history");
            synthetic_history(ticket_id, known, clock.now())
        },
        Err(error) => {
            tracing::warn!(ticket_id = %ticket_id, error = %error, "Ticket row unreadable, synthesizing history");
            synthetic_history(ticket_id, known, clock.now())
        },
    };

    ::metrics::counter!(crate::metrics::HISTORY_FALLBACK, "tier" => history.source.as_str())
        .increment(1);
    history
}

fn synthetic_history(
    ticket_id: TicketId,
    known: Option<&Ticket>,
    now: DateTime<Utc>,
) -> ValidationHistory {
    ValidationHistory {
        events: synthesize(ticket_id, known, now),
        source: HistorySource::Synthetic,
    }
}

/// Translate log rows in the order the backend returned them.
#[must_use]
pub fn from_log(rows: Vec<ValidationRow>) -> Vec<ValidationEvent> {
    rows
        .into_iter()
        .map(|row| ValidationEvent {
            id: row.id,
            ticket_id: row.ticket_id,
            status: row.status,
            timestamp: row.created_at,
            success: row.success,
            location: row.location,
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            device_id: row.device_id,
        })
        .collect()
}

/// Issuance, plus entry when the row records a scan.
#[must_use]
pub fn from_ticket_row(row: &TicketRow) -> Vec<ValidationEvent> {
    let mut events = vec![ValidationEvent::succeeded("1", row.id, TICKET_ISSUED, row.created_at)];

    if let Some(scanned_at) = row.scanned_at {
        events.push(ValidationEvent {
            location: row.scan_location.clone(),
            operator_id: row.scanned_by.clone(),
            ..ValidationEvent::succeeded("2", row.id, ENTRY_GRANTED, scanned_at)
        });
    }
    events
}

/// The schedule shown when neither the log nor the row can be read.
///
/// Issued at midnight UTC of the purchase date D, verified on D+2 at 09:15,
/// entry on D+4 at 18:45 for USED tickets. Entries after `now` are left out.
/// Without a known ticket the history is a single issuance at `now`.
#[must_use]
pub fn synthesize(
    ticket_id: TicketId,
    known: Option<&Ticket>,
    now: DateTime<Utc>,
) -> Vec<ValidationEvent> {
    let Some(ticket) = known else {
        return vec![ValidationEvent::succeeded("1", ticket_id, TICKET_ISSUED, now)];
    };

    let purchased = ticket.purchase_date;
    let mut events = vec![ValidationEvent::succeeded(
        "1",
        ticket_id,
        TICKET_ISSUED,
        purchased.and_time(NaiveTime::MIN).and_utc(),
    )];

    if let Some(verified_at) = offset_at(purchased, 2, 9, 15).filter(|at| *at <= now) {
        events.push(ValidationEvent::succeeded("2", ticket_id, TICKET_VERIFIED, verified_at));
    }

    if ticket.status == TicketStatus::Used {
        if let Some(entered_at) = offset_at(purchased, 4, 18, 45).filter(|at| *at <= now) {
            events.push(ValidationEvent::succeeded("3", ticket_id, ENTRY_GRANTED, entered_at));
        }
    }

    events
}

fn offset_at(date: NaiveDate, days: u64, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    date.checked_add_days(Days::new(days))?
        .and_hms_opt(hour, minute, 0)
        .map(|at| at.and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use afritix_core::BackendError;
    use afritix_core::types::{EventId, UserId};
    use afritix_testing::{BackendCall, InMemoryTicketBackend, fixtures, test_clock};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ticket_purchased_on(date: NaiveDate, status: TicketStatus) -> Ticket {
        let mut ticket = Ticket {
            id: TicketId::new(),
            event_id: EventId::new(),
            event_title: "Festival Sabar".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            event_time: "20:00".to_string(),
            event_location: "Dakar".to_string(),
            event_venue: "Dakar".to_string(),
            ticket_type: "VIP".to_string(),
            price: 15_000.0,
            currency: "XOF".to_string(),
            purchase_date: date,
            qr_code: "FEST-VIP-1".to_string(),
            used: false,
            status: TicketStatus::Valid,
            scanned_at: None,
            scanned_by: None,
            scan_location: None,
            validation_history: Vec::new(),
        };
        ticket.set_status(status);
        ticket
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[tokio::test]
    async fn log_wins_when_present() {
        let backend = InMemoryTicketBackend::new();
        let catalog = fixtures::seed_catalog(&backend, 5);
        let row = fixtures::seed_owned_ticket(
            &backend,
            &catalog,
            UserId::new(),
            at(2024, 12, 1, 10, 0),
            TicketStatus::Used,
        );
        backend.seed_validation(fixtures::validation_row(row.id, "Entrée accordée", at(2024, 12, 5, 19, 0)));
        backend.seed_validation(fixtures::validation_row(row.id, "Billet émis", at(2024, 12, 1, 10, 0)));

        let history = assemble(&backend, &test_clock(), row.id, None).await;

        assert_eq!(history.source, HistorySource::Log);
        let labels: Vec<&str> = history.events.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(labels, ["Billet émis", "Entrée accordée"]);
        assert_eq!(history.events[1].operator_name.as_deref(), Some("Awa Ndiaye"));
        assert_eq!(backend.calls(BackendCall::FetchTicketRow), 0);
    }

    #[tokio::test]
    async fn missing_log_table_falls_back_to_ticket_row() {
        let backend = InMemoryTicketBackend::without_validation_table();
        let catalog = fixtures::seed_catalog(&backend, 5);
        let mut row = fixtures::ticket_row(
            UserId::new(),
            &catalog.ticket_type,
            at(2024, 12, 1, 10, 0),
            None,
        );
        row.scanned_at = Some(at(2024, 12, 14, 20, 5));
        row.scanned_by = Some("op-17".to_string());
        row.scan_location = Some("Porte B".to_string());
        backend.seed_ticket(row.clone());

        let history = assemble(&backend, &test_clock(), row.id, None).await;

        assert_eq!(history.source, HistorySource::TicketRow);
        assert_eq!(history.events.len(), 2);
        assert_eq!(history.events[0].status, TICKET_ISSUED);
        assert_eq!(history.events[0].timestamp, row.created_at);
        assert_eq!(history.events[1].status, ENTRY_GRANTED);
        assert_eq!(history.events[1].operator_id.as_deref(), Some("op-17"));
        assert_eq!(history.events[1].location.as_deref(), Some("Porte B"));
    }

    #[tokio::test]
    async fn unscanned_row_yields_issuance_only() {
        let backend = InMemoryTicketBackend::new();
        let catalog = fixtures::seed_catalog(&backend, 5);
        let row = fixtures::seed_owned_ticket(
            &backend,
            &catalog,
            UserId::new(),
            at(2024, 12, 1, 10, 0),
            TicketStatus::Valid,
        );

        let history = assemble(&backend, &test_clock(), row.id, None).await;

        assert_eq!(history.source, HistorySource::TicketRow);
        assert_eq!(history.events.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_row_synthesizes_from_known_ticket() {
        let backend = InMemoryTicketBackend::without_validation_table();
        backend.fail(BackendCall::FetchTicketRow, BackendError::message("offline"));
        let known = ticket_purchased_on(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(), TicketStatus::Used);

        let history = assemble(&backend, &test_clock(), known.id, Some(&known)).await;

        assert_eq!(history.source, HistorySource::Synthetic);
        let ids: Vec<&str> = history.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(history.events[1].timestamp, at(2024, 12, 22, 9, 15));
        assert_eq!(history.events[2].timestamp, at(2024, 12, 24, 18, 45));
    }

    #[test]
    fn synthetic_cut_off_hides_future_steps() {
        // Clock is 2025-01-01T00:00Z; D+2 09:15 is in the future
        let known = ticket_purchased_on(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(), TicketStatus::Used);
        let events = synthesize(known.id, Some(&known), at(2025, 1, 1, 0, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, at(2024, 12, 30, 0, 0));
    }

    #[test]
    fn without_known_ticket_issuance_is_now() {
        let now = at(2025, 1, 1, 0, 0);
        let events = synthesize(TicketId::new(), None, now);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, TICKET_ISSUED);
        assert_eq!(events[0].timestamp, now);
    }

    proptest! {
        #[test]
        fn synthetic_never_grants_entry_to_unused_tickets(
            days_ago in 0i64..30,
            status_index in 0usize..5,
        ) {
            let now = at(2025, 1, 1, 12, 0);
            let status = TicketStatus::ALL[status_index];
            let purchased = (now - chrono::Duration::days(days_ago)).date_naive();
            let known = ticket_purchased_on(purchased, status);

            let events = synthesize(known.id, Some(&known), now);

            prop_assert_eq!(events[0].status.as_str(), TICKET_ISSUED);
            prop_assert!(events.iter().all(|e| e.timestamp <= now));
            prop_assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            let grants_entry = events.iter().any(|e| e.status == ENTRY_GRANTED);
            prop_assert_eq!(grants_entry, status == TicketStatus::Used && days_ago >= 5);
            let verified = events.iter().any(|e| e.status == TICKET_VERIFIED);
            prop_assert_eq!(verified, days_ago >= 2);
        }

        #[test]
        fn log_is_returned_in_timestamp_order(offsets in proptest::collection::vec(0i64..10_000, 1..20)) {
            let backend = InMemoryTicketBackend::new();
            let ticket_id = TicketId::new();
            let base = at(2024, 11, 1, 0, 0);
            // Seeded in arbitrary order, plus rows of another ticket
            for minutes in &offsets {
                let created_at = base + chrono::Duration::minutes(*minutes);
                backend.seed_validation(fixtures::validation_row(ticket_id, "Scan", created_at));
                backend.seed_validation(fixtures::validation_row(TicketId::new(), "Scan", created_at));
            }

            let history = tokio_test::block_on(assemble(&backend, &test_clock(), ticket_id, None));

            prop_assert_eq!(history.source, HistorySource::Log);
            prop_assert_eq!(history.events.len(), offsets.len());
            prop_assert!(history.events.iter().all(|e| e.ticket_id == ticket_id));
            prop_assert!(history.events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }

        #[test]
        fn assembled_history_is_never_empty(log_len in 0usize..4, table_deployed in any::<bool>()) {
            let backend = if table_deployed {
                InMemoryTicketBackend::new()
            } else {
                InMemoryTicketBackend::without_validation_table()
            };
            let ticket_id = TicketId::new();
            if table_deployed {
                for minute in 0..log_len {
                    let offset = chrono::Duration::minutes(i64::try_from(minute).unwrap());
                    backend.seed_validation(fixtures::validation_row(ticket_id, "Scan", at(2024, 11, 1, 0, 0) + offset));
                }
            }

            let history = tokio_test::block_on(assemble(&backend, &test_clock(), ticket_id, None));

            prop_assert!(!history.events.is_empty());
            let expected = if table_deployed && log_len > 0 { HistorySource::Log } else { HistorySource::Synthetic };
            prop_assert_eq!(history.source, expected);
        }
    }
}
