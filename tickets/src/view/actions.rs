//! Actions for the ticket view.

use crate::view::state::{OperationKey, WalletSnapshot};
use afritix_core::TicketError;
use afritix_core::types::{
    EventId, Ticket, TicketId, TicketTransfer, TicketTypeId, UserId, ValidationEvent,
};

/// Commands sent by the screens and outcomes fed back by effects.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketViewAction {
    // ========================================================================
    // Commands
    // ========================================================================
    /// The auth session resolved to `user_id`.
    ///
    /// A different user than the current one starts from an empty wallet.
    SessionStarted {
        /// Authenticated account
        user_id: UserId,
    },

    /// The session ended; everything is cleared.
    LoggedOut,

    /// Fetch the user's tickets.
    LoadTickets,

    /// Open the detail view of a ticket.
    SelectTicket {
        /// Ticket to show
        ticket_id: TicketId,
    },

    /// Buy one ticket.
    PurchaseTicket {
        /// Event the tier belongs to
        event_id: EventId,
        /// Tier to buy
        ticket_type_id: TicketTypeId,
    },

    /// Hand a ticket to someone else.
    TransferTicket {
        /// Ticket to transfer
        ticket_id: TicketId,
        /// Recipient address as typed
        recipient_email: String,
    },

    /// Dismiss the shared error message.
    ClearError,

    /// Put back a persisted wallet.
    Restore {
        /// What was saved
        snapshot: WalletSnapshot,
    },

    // ========================================================================
    // Outcomes
    // ========================================================================
    // Each carries the session it was started in; the reducer ignores
    // outcomes of an earlier session.
    /// The list fetch succeeded.
    TicketsLoaded {
        /// Session the operation started in
        session: u64,
        /// Tickets, newest first
        tickets: Vec<Ticket>,
    },

    /// The detail fetch succeeded.
    TicketSelected {
        /// Session the operation started in
        session: u64,
        /// Ticket with its validation history
        ticket: Ticket,
    },

    /// A purchase committed.
    TicketPurchased {
        /// Session the operation started in
        session: u64,
        /// Tier that was bought
        ticket_type_id: TicketTypeId,
        /// The issued ticket
        ticket: Ticket,
    },

    /// A transfer was written.
    TicketTransferred {
        /// Session the operation started in
        session: u64,
        /// Ticket now pending transfer
        ticket_id: TicketId,
        /// PENDING transfer record
        transfer: TicketTransfer,
        /// Entry appended to the selected ticket's history
        history_entry: ValidationEvent,
    },

    /// A repository call failed.
    OperationFailed {
        /// Session the operation started in
        session: u64,
        /// Operation that failed
        key: OperationKey,
        /// Why
        error: TicketError,
    },

    /// A command was refused without running.
    OperationRejected {
        /// Session the operation started in
        session: u64,
        /// Operation that was already running
        key: OperationKey,
        /// Always [`TicketError::DuplicateRequest`]
        error: TicketError,
    },
}

impl TicketViewAction {
    /// Whether this action is produced by an effect rather than sent by a screen.
    #[must_use]
    pub const fn is_outcome(&self) -> bool {
        matches!(
            self,
            Self::TicketsLoaded { .. }
                | Self::TicketSelected { .. }
                | Self::TicketPurchased { .. }
                | Self::TicketTransferred { .. }
                | Self::OperationFailed { .. }
                | Self::OperationRejected { .. }
        )
    }
}
