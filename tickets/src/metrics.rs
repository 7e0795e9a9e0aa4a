//! Business metrics for the ticket wallet.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `afritix_tickets_listed_total` - Tickets returned by list fetches
//! - `afritix_tickets_purchased_total` - Tickets issued
//! - `afritix_purchases_rejected_total{reason}` - Purchases refused (`sold_out`, `concurrent_sell_out`)
//! - `afritix_transfers_initiated_total` - Transfers written as PENDING
//! - `afritix_validation_history_fallback_total{tier}` - Histories not served from the log (`ticket_row`, `synthetic`)

use metrics::describe_counter;

/// Tickets returned by list fetches
pub const TICKETS_LISTED: &str = "afritix_tickets_listed_total";
/// Tickets issued
pub const TICKETS_PURCHASED: &str = "afritix_tickets_purchased_total";
/// Purchases refused, by reason
pub const PURCHASES_REJECTED: &str = "afritix_purchases_rejected_total";
/// Transfers written
pub const TRANSFERS_INITIATED: &str = "afritix_transfers_initiated_total";
/// History fallbacks, by tier
pub const HISTORY_FALLBACK: &str = "afritix_validation_history_fallback_total";

/// Initialize and register all ticket metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_ticket_metrics() {
    describe_counter!(TICKETS_LISTED, "Total number of tickets returned by list fetches");
    describe_counter!(TICKETS_PURCHASED, "Total number of tickets issued");
    describe_counter!(
        PURCHASES_REJECTED,
        "Total number of purchases refused by reason (sold_out, concurrent_sell_out)"
    );
    describe_counter!(TRANSFERS_INITIATED, "Total number of transfers initiated");
    describe_counter!(
        HISTORY_FALLBACK,
        "Total number of validation histories served from a fallback tier (ticket_row, synthetic)"
    );

    tracing::info!("Ticket metrics registered");
}
