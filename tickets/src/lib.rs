//! # Afritix Tickets
//!
//! Ticket lifecycle for the Afritix wallet: the repository that talks to the
//! managed backend, the validation-history assembler, and the ticket view
//! state the screens render from.
//!
//! ## Architecture
//!
//! ```text
//! caller → TicketViewStore::send(action)
//!            ↓
//!          TicketViewReducer (state transition, in-flight bookkeeping)
//!            ↓ Effect::Future
//!          TicketRepository → TicketBackend (Postgres / in-memory)
//!            ↓                    ↓
//!          history::assemble ← validation log / ticket row / synthetic
//!            ↓
//!          outcome action → TicketViewReducer → state
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use afritix_tickets::{Config, TicketEnvironment, TicketRepository, TicketViewStore};
//!
//! let config = Config::from_env();
//! let repository = TicketRepository::new(Arc::new(backend), Arc::new(SystemClock), config.tickets);
//! let store = TicketViewStore::new(TicketEnvironment::new(Arc::new(repository)));
//! store.start_session(user_id).await;
//! let tickets = store.load_tickets().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod history;
pub mod messages;
pub mod metrics;
pub mod repository;
pub mod view;

pub use config::{Config, TicketSettings};
pub use history::{HistorySource, ValidationHistory};
pub use repository::{TicketRepository, TransferReceipt};
pub use view::{
    OperationKey, TicketEnvironment, TicketViewAction, TicketViewReducer, TicketViewState,
    TicketViewStore, WalletSnapshot,
};
