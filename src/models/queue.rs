use crate::entities::{QueueStatus, queue_entity};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PublicUmkm;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TakeTicketRequest {
    #[schema(example = "Budi")]
    pub customer_name: Option<String>,
    #[schema(example = "081234567890")]
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponse {
    pub id: i64,
    pub queue_number: i32,
    pub queue_date: NaiveDate,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub status: QueueStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub called_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl From<queue_entity::Model> for TicketResponse {
    fn from(m: queue_entity::Model) -> Self {
        Self {
            id: m.id,
            queue_number: m.queue_number,
            queue_date: m.queue_date,
            customer_name: m.customer_name,
            customer_phone: m.customer_phone,
            status: m.status,
            created_at: m.created_at,
            called_at: m.called_at,
            finished_at: m.finished_at,
            canceled_at: m.canceled_at,
        }
    }
}

/// Public view of a ticket, without the phone number
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicTicket {
    pub id: i64,
    pub queue_number: i32,
    pub name: String,
    pub status: QueueStatus,
    /// Waiting tickets ahead of this one; None once it left the waiting state
    pub position_ahead: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueEntry {
    pub number: i32,
    pub name: String,
}

impl From<&queue_entity::Model> for QueueEntry {
    fn from(m: &queue_entity::Model) -> Self {
        Self {
            number: m.queue_number,
            name: m.display_name(),
        }
    }
}

/// Broadcast to kiosk displays after every queue mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueSnapshot {
    pub current_called: Option<QueueEntry>,
    pub waiting: Vec<QueueEntry>,
}

impl QueueSnapshot {
    pub fn build(current: Option<&queue_entity::Model>, waiting: &[queue_entity::Model]) -> Self {
        Self {
            current_called: current.map(QueueEntry::from),
            waiting: waiting.iter().map(QueueEntry::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicQueueQuery {
    pub ticket_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicQueueView {
    pub umkm: PublicUmkm,
    pub current_called: Option<QueueEntry>,
    pub waiting: Vec<QueueEntry>,
    pub count_today: u64,
    pub ticket: Option<PublicTicket>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TakeTicketResponse {
    pub ticket: PublicTicket,
    /// Status page link, also sent over WhatsApp
    pub ticket_url: String,
    pub whatsapp_sent: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardView {
    pub credit_balance: i64,
    pub current_called: Option<TicketResponse>,
    pub waiting: Vec<TicketResponse>,
    pub history: Vec<TicketResponse>,
    pub count_today: u64,
}

/// Outcome of call-next / skip
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvanceResponse {
    /// Ticket that left the called state (done or no_show)
    pub closed: Option<TicketResponse>,
    pub called: Option<TicketResponse>,
    pub reminders_sent: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotifyResponse {
    pub sent: bool,
    pub gateway_status: String,
    pub credit_balance: i64,
}
