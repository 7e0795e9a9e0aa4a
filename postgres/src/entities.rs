//! Row shapes returned by the queries in this crate.

use afritix_core::backend::{
    EventRow, JoinedTicketRow, TicketRow, TicketTypeRow, TicketTypeSummary, ValidationRow,
};
use afritix_core::error::BackendError;
use afritix_core::types::{
    EventId, OrderId, TicketId, TicketTransfer, TicketTypeId, TransferId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Columns selected for a ticket, shared by every ticket query.
pub(crate) const TICKET_COLUMNS: &str = "t.id, t.user_id, t.event_id, t.ticket_type_id, \
     t.order_id, t.qr_code, t.status, t.created_at, t.scanned_at, t.scanned_by, t.scan_location";

#[derive(Debug, FromRow)]
pub(crate) struct TicketEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    pub order_id: Option<Uuid>,
    pub qr_code: String,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
    pub scanned_by: Option<String>,
    pub scan_location: Option<String>,
}

impl From<TicketEntity> for TicketRow {
    fn from(entity: TicketEntity) -> Self {
        Self {
            id: TicketId(entity.id),
            user_id: UserId(entity.user_id),
            event_id: EventId(entity.event_id),
            ticket_type_id: TicketTypeId(entity.ticket_type_id),
            order_id: entity.order_id.map(OrderId),
            qr_code: entity.qr_code,
            status: entity.status,
            created_at: entity.created_at,
            scanned_at: entity.scanned_at,
            scanned_by: entity.scanned_by,
            scan_location: entity.scan_location,
        }
    }
}

/// Event columns from a LEFT JOIN; all `None` when the join missed.
#[derive(Debug, FromRow)]
pub(crate) struct JoinedEventEntity {
    pub e_id: Option<Uuid>,
    pub e_title: Option<String>,
    pub e_date: Option<NaiveDate>,
    pub e_time: Option<String>,
    pub e_location: Option<String>,
    pub e_currency: Option<String>,
    pub e_image_url: Option<String>,
}

impl JoinedEventEntity {
    fn into_row(self) -> Option<EventRow> {
        Some(EventRow {
            id: EventId(self.e_id?),
            title: self.e_title?,
            date: self.e_date?,
            time: self.e_time?,
            location: self.e_location?,
            currency: self.e_currency,
            image_url: self.e_image_url,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct JoinedTicketEntity {
    #[sqlx(flatten)]
    pub ticket: TicketEntity,
    #[sqlx(flatten)]
    pub event: JoinedEventEntity,
    pub tt_name: Option<String>,
    pub tt_price: Option<f64>,
}

impl From<JoinedTicketEntity> for JoinedTicketRow {
    fn from(entity: JoinedTicketEntity) -> Self {
        let ticket_type = match (entity.tt_name, entity.tt_price) {
            (Some(name), Some(price)) => Some(TicketTypeSummary { name, price }),
            _ => None,
        };
        Self {
            ticket: entity.ticket.into(),
            event: entity.event.into_row(),
            ticket_type,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TicketTypeEntity {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: f64,
    pub available: i32,
    #[sqlx(flatten)]
    pub event: JoinedEventEntity,
}

impl From<TicketTypeEntity> for TicketTypeRow {
    fn from(entity: TicketTypeEntity) -> Self {
        Self {
            id: TicketTypeId(entity.id),
            event_id: EventId(entity.event_id),
            name: entity.name,
            price: entity.price,
            available: entity.available,
            event: entity.event.into_row(),
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ValidationEntity {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub success: bool,
    pub location: Option<String>,
    pub operator_id: Option<String>,
    pub operator_name: Option<String>,
    pub device_id: Option<String>,
}

impl From<ValidationEntity> for ValidationRow {
    fn from(entity: ValidationEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            ticket_id: TicketId(entity.ticket_id),
            status: entity.status,
            created_at: entity.created_at,
            success: entity.success,
            location: entity.location,
            operator_id: entity.operator_id,
            operator_name: entity.operator_name,
            device_id: entity.device_id,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TransferEntity {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_email: String,
    pub recipient_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransferEntity> for TicketTransfer {
    type Error = BackendError;

    fn try_from(entity: TransferEntity) -> Result<Self, Self::Error> {
        let status = entity
            .status
            .parse()
            .map_err(|e| BackendError::message(format!("Invalid transfer status: {e}")))?;
        Ok(Self {
            id: TransferId(entity.id),
            ticket_id: TicketId(entity.ticket_id),
            sender_id: UserId(entity.sender_id),
            recipient_email: entity.recipient_email,
            recipient_id: entity.recipient_id.map(UserId),
            status,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            expires_at: entity.expires_at,
            accepted_at: entity.accepted_at,
            rejected_at: entity.rejected_at,
        })
    }
}
