use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum TopupStatus {
    /// Package chosen, no payment proof yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Owner confirmed the transfer, awaiting admin review
    #[sea_orm(string_value = "waiting_admin")]
    WaitingAdmin,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl TopupStatus {
    pub fn can_confirm(self) -> bool {
        matches!(self, TopupStatus::Pending | TopupStatus::WaitingAdmin)
    }

    pub fn can_review(self) -> bool {
        matches!(self, TopupStatus::Pending | TopupStatus::WaitingAdmin)
    }
}

impl std::fmt::Display for TopupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopupStatus::Pending => write!(f, "pending"),
            TopupStatus::WaitingAdmin => write!(f, "waiting_admin"),
            TopupStatus::Success => write!(f, "success"),
            TopupStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for TopupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TopupStatus::Pending),
            "waiting_admin" => Ok(TopupStatus::WaitingAdmin),
            "success" => Ok(TopupStatus::Success),
            "rejected" => Ok(TopupStatus::Rejected),
            other => Err(format!("Unknown top-up status: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "topup_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub umkm_id: i64,
    pub user_id: i64,
    pub package_name: String,
    pub credits: i64,
    /// Rupiah, informational only
    pub amount: Option<i64>,
    pub qris_image: Option<String>,
    pub proof_image: Option<String>,
    pub status: TopupStatus,
    pub sender_name: Option<String>,
    pub note: Option<String>,
    pub admin_note: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_gates() {
        assert!(TopupStatus::Pending.can_confirm());
        assert!(TopupStatus::WaitingAdmin.can_confirm());
        assert!(!TopupStatus::Success.can_confirm());
        assert!(!TopupStatus::Rejected.can_review());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("waiting_admin".parse(), Ok(TopupStatus::WaitingAdmin));
        assert!("paid".parse::<TopupStatus>().is_err());
    }
}
