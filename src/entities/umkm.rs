use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A registered business. `display_images` / `display_videos` hold
/// comma-joined paths relative to the static root.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "umkm")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub owner_whatsapp: Option<String>,
    pub credit_balance: i64,
    pub qr_path: Option<String>,
    pub display_ticker: Option<String>,
    pub display_images: Option<String>,
    pub display_videos: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn image_list(&self) -> Vec<String> {
        split_media_list(self.display_images.as_deref())
    }

    pub fn video_list(&self) -> Vec<String> {
        split_media_list(self.display_videos.as_deref())
    }

    pub fn has_credit(&self) -> bool {
        self.credit_balance > 0
    }
}

/// Splits a stored comma list, dropping blanks.
pub fn split_media_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`split_media_list`]; an empty list is stored as NULL.
pub fn join_media_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(","))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::queues::Entity")]
    Queues,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::queues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Queues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_media_list_skips_blanks() {
        let list = split_media_list(Some("upload/a/1.png, ,upload/a/2.png,"));
        assert_eq!(list, vec!["upload/a/1.png", "upload/a/2.png"]);
        assert!(split_media_list(None).is_empty());
        assert!(split_media_list(Some("")).is_empty());
    }

    #[test]
    fn test_join_media_list_empty_is_none() {
        assert_eq!(join_media_list(&[]), None);
        assert_eq!(
            join_media_list(&["a.png".to_string(), "b.png".to_string()]),
            Some("a.png,b.png".to_string())
        );
    }
}
