//! Display labels written into validation histories.

/// First entry of every history
pub const TICKET_ISSUED: &str = "Billet émis";

/// Synthetic check-in two days after purchase
pub const TICKET_VERIFIED: &str = "Billet vérifié";

/// Scan at the venue
pub const ENTRY_GRANTED: &str = "Entrée accordée";

/// A ticket row came back without its event or ticket type
pub const INCOMPLETE_TICKET_DATA: &str = "Données de billet incomplètes";

/// A ticket lookup matched no row
pub const TICKET_NOT_FOUND: &str = "Billet introuvable";

/// A ticket type lookup matched no row
pub const TICKET_TYPE_NOT_FOUND: &str = "Type de billet introuvable";

/// Local entry appended when a transfer is requested.
#[must_use]
pub fn transfer_initiated(recipient_email: &str) -> String {
    format!("Transfert initié vers {recipient_email}")
}
