//! `PostgreSQL` ticket backend for Afritix.
//!
//! This crate implements the `TicketBackend` contract from `afritix-core`
//! against a `PostgreSQL` database holding the managed backend's tables. It
//! uses sqlx and provides:
//!
//! - Joined ticket reads (tickets × events × ticket types)
//! - The optional scanner log, reported as `42P01` when not deployed
//! - Atomic purchases (order, ticket and inventory decrement in one transaction)
//! - Transfer writes guarded by a partial unique index
//! - Embedded migrations
//!
//! # Example
//!
//! ```no_run
//! use afritix_postgres::PostgresTicketBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = PostgresTicketBackend::connect("postgres://localhost/afritix").await?;
//! backend.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod entities;
mod tickets;

pub use tickets::PostgresTicketBackend;

use afritix_core::error::BackendError;

/// Translate a sqlx error into the backend error shape.
///
/// Database errors keep their SQLSTATE so callers can localize them; anything
/// else (pool timeouts, I/O) becomes a message-only error.
#[must_use]
pub fn backend_error(error: &sqlx::Error) -> BackendError {
    match error {
        sqlx::Error::Database(db_err) => {
            BackendError::new(db_err.code().as_deref(), db_err.message())
        },
        other => BackendError::message(other.to_string()),
    }
}
