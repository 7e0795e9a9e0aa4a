//! State for the ticket view.

use afritix_core::types::{Ticket, TicketId, TicketTypeId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identity of a running operation: its kind plus its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKey {
    /// List fetch
    LoadTickets,
    /// Detail fetch of one ticket
    FetchTicket(TicketId),
    /// Purchase of one tier
    Purchase(TicketTypeId),
    /// Transfer of one ticket
    Transfer(TicketId),
}

/// What the wallet screens render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketViewState {
    /// The user's tickets, newest first; purchases are appended
    pub tickets: Vec<Ticket>,
    /// Ticket shown on the detail screen
    pub selected_ticket: Option<Ticket>,
    /// `true` while any operation is in flight
    pub is_loading: bool,
    /// Localized message of the last failure
    pub error: Option<String>,
    /// Authenticated account, if any
    pub user_id: Option<UserId>,
    in_flight: HashSet<OperationKey>,
    session: u64,
}

impl TicketViewState {
    /// Empty, signed-out state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty state for `user_id`.
    #[must_use]
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// A ticket from the collection.
    #[must_use]
    pub fn ticket(&self, ticket_id: TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|ticket| ticket.id == ticket_id)
    }

    /// Epoch of the current session. Bumped by every reset.
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Whether `key` is currently running.
    #[must_use]
    pub fn is_in_flight(&self, key: OperationKey) -> bool {
        self.in_flight.contains(&key)
    }

    /// The persistable part of the state.
    #[must_use]
    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            tickets: self.tickets.clone(),
            selected_ticket: self.selected_ticket.clone(),
        }
    }

    /// Drop everything and open a new session for `user_id`.
    pub(crate) fn reset(&mut self, user_id: Option<UserId>) {
        *self = Self {
            user_id,
            session: self.session.wrapping_add(1),
            ..Self::default()
        };
    }

    /// Mark `key` as running. Returns `false` if it already was.
    pub(crate) fn begin(&mut self, key: OperationKey) -> bool {
        let started = self.in_flight.insert(key);
        self.is_loading = !self.in_flight.is_empty();
        started
    }

    /// Mark `key` of `session` as done.
    ///
    /// Returns `false`, leaving the state as it was, if `session` is not the
    /// current one or `key` was not running.
    pub(crate) fn finish(&mut self, session: u64, key: OperationKey) -> bool {
        if session != self.session {
            return false;
        }
        let finished = self.in_flight.remove(&key);
        self.is_loading = !self.in_flight.is_empty();
        finished
    }
}

/// Tickets kept across app restarts.
///
/// Loading flags, the error slot, the session and in-flight operations are
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Ticket collection
    pub tickets: Vec<Ticket>,
    /// Ticket on the detail screen
    pub selected_ticket: Option<Ticket>,
}

impl WalletSnapshot {
    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Read back what [`WalletSnapshot::to_json`] wrote.
    ///
    /// # Errors
    ///
    /// Returns error if `json` is not a snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
