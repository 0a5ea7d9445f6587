pub mod auth_service;
pub mod credit_service;
pub mod notification_service;
pub mod queue_service;
pub mod settings_service;
pub mod stats_service;
pub mod topup_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::*;
pub use credit_service::CreditService;
pub use notification_service::{Delivery, NotificationService};
pub use queue_service::QueueService;
pub use settings_service::{DisplayUpdate, SettingsService};
pub use stats_service::StatsService;
pub use topup_service::{TopupConfirmation, TopupService};

use crate::entities::umkm_entity as umkm;
use crate::error::{AppError, AppResult};
use chrono::{Local, NaiveDate};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

/// Service day for new tickets, in server local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The business owned by the logged-in user.
pub(crate) async fn owner_umkm<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<umkm::Model> {
    umkm::Entity::find()
        .filter(umkm::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("UMKM tidak ditemukan".to_string()))
}

pub(crate) async fn umkm_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> AppResult<umkm::Model> {
    umkm::Entity::find()
        .filter(umkm::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("UMKM tidak ditemukan".to_string()))
}
