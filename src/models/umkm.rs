use crate::entities::umkm_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::QueueSnapshot;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UmkmResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub owner_whatsapp: Option<String>,
    pub credit_balance: i64,
    /// File name under /static/qr
    pub qr_path: Option<String>,
    pub display_ticker: Option<String>,
    pub display_images: Vec<String>,
    pub display_videos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<umkm_entity::Model> for UmkmResponse {
    fn from(m: umkm_entity::Model) -> Self {
        let display_images = m.image_list();
        let display_videos = m.video_list();
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            owner_whatsapp: m.owner_whatsapp,
            credit_balance: m.credit_balance,
            qr_path: m.qr_path,
            display_ticker: m.display_ticker,
            display_images,
            display_videos,
            created_at: m.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// What the public pages may show about a business
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUmkm {
    pub name: String,
    pub slug: String,
    pub qr_path: Option<String>,
}

impl From<&umkm_entity::Model> for PublicUmkm {
    fn from(m: &umkm_entity::Model) -> Self {
        Self {
            name: m.name.clone(),
            slug: m.slug.clone(),
            qr_path: m.qr_path.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub name: Option<String>,
    /// Empty string clears the number
    pub owner_whatsapp: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaType::Image => &["png", "jpg", "jpeg", "gif", "webp"],
            MediaType::Video => &["mp4", "webm", "ogg"],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteMediaRequest {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Relative path such as upload/{slug}/{file}
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrResponse {
    pub qr_path: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisplayUpdateResponse {
    pub display_ticker: Option<String>,
    pub display_images: Vec<String>,
    pub display_videos: Vec<String>,
    /// Uploaded files dropped for an unsupported extension
    pub skipped_files: Vec<String>,
}

/// Kiosk screen payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DisplayViewResponse {
    pub umkm: PublicUmkm,
    pub ticker: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub queue: QueueSnapshot,
}
