use crate::entities::{TopupStatus, topup_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartTopupRequest {
    #[schema(example = "Paket Rame")]
    pub package_name: Option<String>,
    #[schema(example = 100)]
    pub credits: i64,
    /// Rupiah
    #[schema(example = 50000)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopupResponse {
    pub id: i64,
    pub umkm_id: i64,
    pub package_name: String,
    pub credits: i64,
    pub amount: Option<i64>,
    pub qris_image: Option<String>,
    pub proof_image: Option<String>,
    pub status: TopupStatus,
    pub sender_name: Option<String>,
    pub note: Option<String>,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl From<topup_entity::Model> for TopupResponse {
    fn from(m: topup_entity::Model) -> Self {
        Self {
            id: m.id,
            umkm_id: m.umkm_id,
            package_name: m.package_name,
            credits: m.credits,
            amount: m.amount,
            qris_image: m.qris_image,
            proof_image: m.proof_image,
            status: m.status,
            sender_name: m.sender_name,
            note: m.note,
            admin_note: m.admin_note,
            created_at: m.created_at.unwrap_or_else(Utc::now),
            confirmed_at: m.confirmed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminTopupQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectTopupRequest {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApproveTopupResponse {
    pub transaction: TopupResponse,
    pub credit_balance: i64,
    /// True when the transaction had been approved before this call
    pub already_processed: bool,
}
