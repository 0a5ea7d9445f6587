use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ticket lifecycle: waiting -> called -> {done | no_show}, or waiting -> canceled.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    #[sea_orm(string_value = "waiting")]
    Waiting,
    #[sea_orm(string_value = "called")]
    Called,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "no_show")]
    NoShow,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl QueueStatus {
    pub fn can_transition_to(self, next: QueueStatus) -> bool {
        matches!(
            (self, next),
            (QueueStatus::Waiting, QueueStatus::Called)
                | (QueueStatus::Waiting, QueueStatus::Canceled)
                | (QueueStatus::Called, QueueStatus::Done)
                | (QueueStatus::Called, QueueStatus::NoShow)
        )
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Waiting => write!(f, "waiting"),
            QueueStatus::Called => write!(f, "called"),
            QueueStatus::Done => write!(f, "done"),
            QueueStatus::NoShow => write!(f, "no_show"),
            QueueStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "queues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub umkm_id: i64,
    /// Local service day the number belongs to
    pub queue_date: NaiveDate,
    pub queue_number: i32,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub status: QueueStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub called_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn display_name(&self) -> String {
        match self.customer_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "Tanpa nama".to_string(),
        }
    }

    pub fn phone(&self) -> Option<&str> {
        self.customer_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::umkm::Entity",
        from = "Column::UmkmId",
        to = "super::umkm::Column::Id"
    )]
    Umkm,
}

impl Related<super::umkm::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Umkm.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(QueueStatus::Waiting.can_transition_to(QueueStatus::Called));
        assert!(QueueStatus::Waiting.can_transition_to(QueueStatus::Canceled));
        assert!(QueueStatus::Called.can_transition_to(QueueStatus::Done));
        assert!(QueueStatus::Called.can_transition_to(QueueStatus::NoShow));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!QueueStatus::Waiting.can_transition_to(QueueStatus::Done));
        assert!(!QueueStatus::Called.can_transition_to(QueueStatus::Canceled));
        assert!(!QueueStatus::Done.can_transition_to(QueueStatus::Called));
        assert!(!QueueStatus::Canceled.can_transition_to(QueueStatus::Waiting));
        assert!(!QueueStatus::NoShow.can_transition_to(QueueStatus::Done));
    }

    #[test]
    fn test_display_name_defaults() {
        let mut ticket = Model {
            id: 1,
            umkm_id: 1,
            queue_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            queue_number: 1,
            customer_name: None,
            customer_phone: Some("  ".into()),
            status: QueueStatus::Waiting,
            created_at: None,
            called_at: None,
            finished_at: None,
            canceled_at: None,
        };
        assert_eq!(ticket.display_name(), "Tanpa nama");
        assert_eq!(ticket.phone(), None);

        ticket.customer_name = Some("Budi".into());
        assert_eq!(ticket.display_name(), "Budi");
    }
}
