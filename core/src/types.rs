//! Domain types for the ticket wallet.
//!
//! Identifiers, ticket and transfer lifecycles, and the validation events that
//! make up a ticket's audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Account identifier, issued by the auth backend
    UserId
);
uuid_id!(
    /// Ticket identifier, assigned at issuance
    TicketId
);
uuid_id!(
    /// Event identifier
    EventId
);
uuid_id!(
    /// Ticket type (admission tier) identifier
    TicketTypeId
);
uuid_id!(
    /// Order identifier
    OrderId
);
uuid_id!(
    /// Transfer identifier
    TransferId
);

// ============================================================================
// Ticket status
// ============================================================================

/// Error returned when a status string is not one the backend defines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Lifecycle status of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Issued and usable
    #[default]
    Valid,
    /// Scanned at the venue
    Used,
    /// Cancelled by the organiser
    Cancelled,
    /// A transfer has been requested and is awaiting the recipient
    TransferPending,
    /// Ownership moved to another account
    Transferred,
}

impl TicketStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Valid,
        Self::Used,
        Self::Cancelled,
        Self::TransferPending,
        Self::Transferred,
    ];

    /// Wire representation stored in `tickets.status`
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Used => "USED",
            Self::Cancelled => "CANCELLED",
            Self::TransferPending => "TRANSFER_PENDING",
            Self::Transferred => "TRANSFERRED",
        }
    }

    /// Label shown on the ticket detail badge
    #[must_use]
    pub const fn display_label(&self) -> &'static str {
        match self {
            Self::Valid => "Valide",
            Self::Used => "Utilisé",
            Self::Cancelled => "Annulé",
            Self::TransferPending => "Transfert en attente",
            Self::Transferred => "Transféré",
        }
    }

    /// Whether the UI offers the transfer action.
    ///
    /// This is the presentation gate; the repository itself only accepts
    /// transfers from [`TicketStatus::Valid`].
    #[must_use]
    pub const fn allows_transfer_action(&self) -> bool {
        !matches!(self, Self::Used | Self::Transferred | Self::Cancelled)
    }

    /// Whether the ticket can still be downloaded
    #[must_use]
    pub const fn allows_download(&self) -> bool {
        !matches!(self, Self::Transferred | Self::Cancelled)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// One purchased admission right, as the wallet displays it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket ID
    pub id: TicketId,
    /// Owning event
    pub event_id: EventId,
    /// Event title snapshot
    pub event_title: String,
    /// Event date snapshot
    pub event_date: NaiveDate,
    /// Event start time, as the organiser wrote it (e.g. `20:00`)
    pub event_time: String,
    /// Event location snapshot
    pub event_location: String,
    /// Venue; the schema has no venue column so this is always the location
    pub event_venue: String,
    /// Ticket type name (e.g. VIP)
    pub ticket_type: String,
    /// Price paid
    pub price: f64,
    /// ISO currency code
    pub currency: String,
    /// UTC date the ticket was issued
    pub purchase_date: NaiveDate,
    /// Issuance code stored with the ticket
    pub qr_code: String,
    /// `true` iff status is [`TicketStatus::Used`]
    pub used: bool,
    /// Lifecycle status
    pub status: TicketStatus,
    /// When the ticket was scanned, if it was
    pub scanned_at: Option<DateTime<Utc>>,
    /// Operator that scanned the ticket
    pub scanned_by: Option<String>,
    /// Where the ticket was scanned
    pub scan_location: Option<String>,
    /// Audit trail, populated on detail views
    #[serde(default)]
    pub validation_history: Vec<ValidationEvent>,
}

impl Ticket {
    /// Payload encoded in the QR code presented at the venue.
    ///
    /// Scanners look tickets up by id, so the payload is the id itself.
    #[must_use]
    pub fn qr_payload(&self) -> String {
        self.id.to_string()
    }

    /// Set a new status, keeping `used` consistent with it
    pub fn set_status(&mut self, status: TicketStatus) {
        self.status = status;
        self.used = status == TicketStatus::Used;
    }
}

// ============================================================================
// Validation events
// ============================================================================

/// One entry in a ticket's audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEvent {
    /// Event ID (backend row id, or a positional id for derived entries)
    pub id: String,
    /// Parent ticket
    pub ticket_id: TicketId,
    /// Human-readable status label
    pub status: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// Whether the step succeeded
    pub success: bool,
    /// Where it happened
    pub location: Option<String>,
    /// Operator account
    pub operator_id: Option<String>,
    /// Operator display name
    pub operator_name: Option<String>,
    /// Scanning device
    pub device_id: Option<String>,
}

impl ValidationEvent {
    /// Successful event with no location or operator metadata
    #[must_use]
    pub fn succeeded(
        id: impl Into<String>,
        ticket_id: TicketId,
        status: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            ticket_id,
            status: status.into(),
            timestamp,
            success: true,
            location: None,
            operator_id: None,
            operator_name: None,
            device_id: None,
        }
    }
}

// ============================================================================
// Transfers
// ============================================================================

/// Status of a ticket transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// Awaiting the recipient
    Pending,
    /// Recipient accepted
    Accepted,
    /// Recipient declined
    Rejected,
    /// Not resolved before `expires_at`
    Expired,
}

impl TransferStatus {
    /// Wire representation stored in `ticket_transfers.status`
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A handoff of a ticket to another account, addressed by email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTransfer {
    /// Transfer ID
    pub id: TransferId,
    /// Ticket being handed off
    pub ticket_id: TicketId,
    /// Current owner
    pub sender_id: UserId,
    /// Invitation address
    pub recipient_email: String,
    /// Recipient account, when the email belongs to a member
    pub recipient_id: Option<UserId>,
    /// Transfer status
    pub status: TransferStatus,
    /// When requested
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: Option<DateTime<Utc>>,
    /// Backend expires the transfer after this instant
    pub expires_at: DateTime<Utc>,
    /// When accepted
    pub accepted_at: Option<DateTime<Utc>>,
    /// When rejected
    pub rejected_at: Option<DateTime<Utc>>,
}

impl TicketTransfer {
    /// Whether the transfer still blocks a new one for the same ticket
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TransferStatus::Pending
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>(), Ok(status));
        }
        assert!("REFUNDED".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&TicketStatus::TransferPending).unwrap();
        assert_eq!(json, "\"TRANSFER_PENDING\"");
    }

    #[test]
    fn transfer_action_hidden_for_final_states() {
        assert!(TicketStatus::Valid.allows_transfer_action());
        assert!(!TicketStatus::Used.allows_transfer_action());
        assert!(!TicketStatus::Transferred.allows_transfer_action());
        assert!(!TicketStatus::Cancelled.allows_transfer_action());
        assert!(TicketStatus::Used.allows_download());
        assert!(!TicketStatus::Cancelled.allows_download());
    }

    #[test]
    fn set_status_keeps_used_flag_in_sync() {
        let mut ticket = Ticket {
            id: TicketId::new(),
            event_id: EventId::new(),
            event_title: "Festival".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            event_time: "20:00".to_string(),
            event_location: "Dakar".to_string(),
            event_venue: "Dakar".to_string(),
            ticket_type: "VIP".to_string(),
            price: 15000.0,
            currency: "XOF".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            qr_code: "FEST-VIP-1".to_string(),
            used: false,
            status: TicketStatus::Valid,
            scanned_at: None,
            scanned_by: None,
            scan_location: None,
            validation_history: Vec::new(),
        };

        ticket.set_status(TicketStatus::Used);
        assert!(ticket.used);
        ticket.set_status(TicketStatus::TransferPending);
        assert!(!ticket.used);
        assert_eq!(ticket.qr_payload(), ticket.id.to_string());
    }
}
