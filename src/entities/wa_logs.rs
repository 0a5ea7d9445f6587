use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum WaLogKind {
    #[sea_orm(string_value = "new_ticket")]
    NewTicket,
    #[sea_orm(string_value = "auto_reminder")]
    AutoReminder,
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "topup_admin")]
    TopupAdmin,
    #[sea_orm(string_value = "topup_owner")]
    TopupOwner,
}

impl WaLogKind {
    /// Customer-facing messages cost one credit when delivered.
    pub fn is_billable(self) -> bool {
        matches!(
            self,
            WaLogKind::NewTicket | WaLogKind::AutoReminder | WaLogKind::Manual
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "wa_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub umkm_id: i64,
    pub queue_id: Option<i64>,
    pub kind: WaLogKind,
    pub phone_number: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    /// Gateway HTTP status, or "error" when the request never completed
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub response_raw: Option<String>,
    pub success: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
