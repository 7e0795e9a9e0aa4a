//! Error types for ticket wallet operations.

use crate::types::TicketStatus;
use thiserror::Error;

/// Result type alias for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Result type alias for raw backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Marker message the backend returns when a single-row query matched zero or many rows.
pub const SINGLE_ROW_MISMATCH: &str = "JSON object requested, multiple (or no) rows returned";

/// An error as reported by the managed backend.
///
/// `code` is the Postgres SQLSTATE or the REST gateway code (`PGRST…`) when
/// the backend provides one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    /// Backend error code, if any
    pub code: Option<String>,
    /// Backend message
    pub message: String,
}

impl BackendError {
    /// Build an error with an optional code.
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Error without a code, e.g. a connectivity failure.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// Error with a code and no usable message.
    #[must_use]
    pub fn code(code: &str) -> Self {
        Self::new(Some(code), String::new())
    }

    /// Translate into a message fit for display.
    ///
    /// Known codes map to localized text first. The single-row mismatch
    /// message maps to the profile error, anything else falls back to the raw
    /// message and finally to a generic retry prompt.
    #[must_use]
    pub fn user_message(&self) -> String {
        if let Some(code) = self.code.as_deref() {
            let known = match code {
                "23505" => Some("Cet email est déjà utilisé."),
                "PGRST116" => Some("Profil non trouvé."),
                "42703" => Some("Colonne non trouvée. Mise à jour de la structure de données en cours."),
                "42501" => Some("Erreur de permission. Veuillez vous connecter à nouveau."),
                "42P01" => Some("Table non trouvée. L'application est en cours de maintenance."),
                _ => None,
            };
            if let Some(text) = known {
                return text.to_string();
            }
            if self.message.is_empty() {
                return format!("Erreur de base de données ({code}).");
            }
        }

        if self.message.contains(SINGLE_ROW_MISMATCH) {
            return "Erreur de profil utilisateur. Veuillez réessayer.".to_string();
        }

        if self.message.is_empty() {
            "Une erreur s'est produite. Veuillez réessayer.".to_string()
        } else {
            self.message.clone()
        }
    }
}

/// Why a transfer recipient address was refused before reaching the backend.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecipientError {
    /// Blank input
    #[error("recipient email is required")]
    Missing,
    /// Not shaped like an address
    #[error("recipient email is malformed")]
    Malformed,
}

/// Error taxonomy for ticket operations.
///
/// Every variant carries enough to render a message through
/// [`TicketError::user_message`]; raw backend errors never reach callers
/// untranslated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TicketError {
    /// No authenticated user in the session.
    #[error("no authenticated user")]
    Unauthenticated,

    /// Query or connectivity failure, or a row missing required joins.
    #[error("data source error: {0}")]
    DataSource(#[from] BackendError),

    /// The ticket type has no remaining inventory.
    #[error("ticket type is no longer available")]
    Unavailable,

    /// The ticket does not exist or belongs to someone else.
    #[error("ticket not found or not owned by the current user")]
    UnauthorizedOrMissing,

    /// The ticket's status forbids the operation.
    #[error("ticket in status {status} cannot be transferred")]
    InvalidState {
        /// Status at the time of the check
        status: TicketStatus,
    },

    /// The recipient address was refused.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(RecipientError),

    /// The same operation is already running for this target.
    #[error("operation already in progress")]
    DuplicateRequest,
}

impl TicketError {
    /// Localized message for the shared error slot.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Utilisateur non connecté".to_string(),
            Self::DataSource(backend) => backend.user_message(),
            Self::Unavailable => "Ce type de billet n'est plus disponible".to_string(),
            Self::UnauthorizedOrMissing => {
                "Billet introuvable ou vous n'êtes pas autorisé à le transférer".to_string()
            },
            Self::InvalidState { .. } => {
                "Ce billet ne peut pas être transféré dans son état actuel".to_string()
            },
            Self::InvalidRecipient(RecipientError::Missing) => {
                "L'adresse e-mail est requise".to_string()
            },
            Self::InvalidRecipient(RecipientError::Malformed) => {
                "Adresse e-mail invalide".to_string()
            },
            Self::DuplicateRequest => {
                "Une opération est déjà en cours. Veuillez patienter.".to_string()
            },
        }
    }

    /// Returns `true` if calling again unchanged might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::DataSource(_) | Self::DuplicateRequest)
    }
}
