use crate::entities::{WaLogKind, credit_log_entity, wa_log_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PaginatedResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditLogResponse {
    pub id: i64,
    pub change: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<credit_log_entity::Model> for CreditLogResponse {
    fn from(m: credit_log_entity::Model) -> Self {
        Self {
            id: m.id,
            change: m.change,
            description: m.description,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreditOverview {
    pub credit_balance: i64,
    pub ledger: PaginatedResponse<CreditLogResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminAdjustCreditRequest {
    /// Signed amount; negative values revoke credit
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminAdjustCreditResponse {
    pub umkm_id: i64,
    pub credit_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaLogResponse {
    pub id: i64,
    pub queue_id: Option<i64>,
    pub kind: WaLogKind,
    pub phone_number: String,
    pub message: String,
    pub status: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl From<wa_log_entity::Model> for WaLogResponse {
    fn from(m: wa_log_entity::Model) -> Self {
        Self {
            id: m.id,
            queue_id: m.queue_id,
            kind: m.kind,
            phone_number: m.phone_number,
            message: m.message,
            status: m.status,
            success: m.success,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}
