//! Ticket view state for the wallet screens.
//!
//! The screens never call the repository directly. They send commands to a
//! [`TicketViewStore`], whose reducer records the operation as in flight and
//! describes the repository call as an effect. The effect's outcome is fed
//! back as an action and only then does the state change.
//!
//! # Architecture
//!
//! ```text
//! Screen → TicketViewStore::send(PurchaseTicket)
//!            ↓
//!            TicketViewReducer: mark Purchase(tier) in flight, is_loading = true
//!            ↓
//!            Effect::Future → TicketRepository::purchase_ticket
//!            ↓
//!            TicketPurchased / OperationFailed
//!            ↓
//!            TicketViewReducer: append + select, or fill the error slot
//! ```
//!
//! A command whose key is already in flight is answered with
//! `OperationRejected` and touches nothing. Every outcome carries the session
//! epoch it was started in. Logging out or switching user opens a new epoch,
//! so a late outcome of the old session is dropped even when the new session
//! has the same operation in flight.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod state;
pub mod store;

pub use actions::TicketViewAction;
pub use environment::TicketEnvironment;
pub use reducer::TicketViewReducer;
pub use state::{OperationKey, TicketViewState, WalletSnapshot};
pub use store::TicketViewStore;
