use crate::entities::umkm::{join_media_list, split_media_list};
use crate::entities::umkm_entity as umkm;
use crate::error::{AppError, AppResult};
use crate::models::{
    DeleteMediaRequest, DisplayUpdateResponse, DisplayViewResponse, MediaType, PublicUmkm,
    QrResponse, UmkmResponse, UpdateSettingsRequest,
};
use crate::services::queue_service::QueueService;
use crate::services::{owner_umkm, umkm_by_slug};
use crate::utils::{
    MediaStorage, UploadedFile, has_allowed_extension, non_blank, queue_page_url,
    validate_wa_number, write_umkm_qr,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel, Set};
use std::sync::Arc;

/// New kiosk settings read from a multipart form
#[derive(Debug, Default)]
pub struct DisplayUpdate<'a> {
    /// `None` leaves the ticker untouched; blank text clears it
    pub ticker: Option<String>,
    pub images: Vec<&'a UploadedFile>,
    pub videos: Vec<&'a UploadedFile>,
}

#[derive(Clone)]
pub struct SettingsService {
    pool: Arc<DatabaseConnection>,
    storage: MediaStorage,
    queue_service: QueueService,
}

impl SettingsService {
    pub fn new(pool: Arc<DatabaseConnection>, storage: MediaStorage, queue_service: QueueService) -> Self {
        Self {
            pool,
            storage,
            queue_service,
        }
    }

    pub async fn get(&self, user_id: i64) -> AppResult<UmkmResponse> {
        Ok(owner_umkm(self.pool.as_ref(), user_id).await?.into())
    }

    pub async fn update(&self, user_id: i64, request: UpdateSettingsRequest) -> AppResult<UmkmResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let mut active = owner.into_active_model();

        if let Some(name) = request.name {
            let name = non_blank(Some(name.as_str()))
                .ok_or_else(|| AppError::ValidationError("Nama UMKM tidak boleh kosong".to_string()))?;
            active.name = Set(name);
        }
        if let Some(number) = request.owner_whatsapp {
            let number = match non_blank(Some(number.as_str())) {
                Some(n) => Some(validate_wa_number(&n)?),
                None => None,
            };
            active.owner_whatsapp = Set(number);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(self.pool.as_ref()).await?.into())
    }

    /// Re-renders the QR code for `{base}/{slug}`.
    pub async fn regenerate_qr(&self, user_id: i64, base_url: &str) -> AppResult<QrResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let url = queue_page_url(base_url, &owner.slug);
        let file_name = write_umkm_qr(&self.storage, &owner.slug, &url).await?;

        let mut active = owner.into_active_model();
        active.qr_path = Set(Some(file_name.clone()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(self.pool.as_ref()).await?;

        Ok(QrResponse {
            qr_path: file_name,
            url,
        })
    }

    /// Updates the ticker and appends uploaded media. Files with an
    /// unsupported extension are skipped and reported back.
    pub async fn update_display(
        &self,
        user_id: i64,
        update: DisplayUpdate<'_>,
    ) -> AppResult<DisplayUpdateResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let mut images = owner.image_list();
        let mut videos = owner.video_list();
        let mut skipped_files = Vec::new();

        for (files, kind, list) in [
            (&update.images, MediaType::Image, &mut images),
            (&update.videos, MediaType::Video, &mut videos),
        ] {
            for file in files {
                if !has_allowed_extension(&file.file_name, kind.allowed_extensions()) {
                    skipped_files.push(file.file_name.clone());
                    continue;
                }
                let rel = self
                    .storage
                    .save_display_media(&owner.slug, &file.file_name, &file.bytes)
                    .await?;
                list.push(rel);
            }
        }

        let slug = owner.slug.clone();
        let mut active = owner.into_active_model();
        if let Some(ticker) = update.ticker {
            active.display_ticker = Set(non_blank(Some(ticker.as_str())));
        }
        active.display_images = Set(join_media_list(&images));
        active.display_videos = Set(join_media_list(&videos));
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(self.pool.as_ref()).await?;

        if !skipped_files.is_empty() {
            log::warn!("{} skipped unsupported display files: {:?}", slug, skipped_files);
        }

        Ok(DisplayUpdateResponse {
            display_ticker: updated.display_ticker,
            display_images: images,
            display_videos: videos,
            skipped_files,
        })
    }

    /// Drops one media path from the kiosk list and deletes the file.
    pub async fn delete_display_media(
        &self,
        user_id: i64,
        request: DeleteMediaRequest,
    ) -> AppResult<DisplayUpdateResponse> {
        let path = request.path.trim().to_string();
        if path.is_empty() {
            return Err(AppError::ValidationError("Path media tidak valid".to_string()));
        }

        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let stored = match request.media_type {
            MediaType::Image => owner.display_images.as_deref(),
            MediaType::Video => owner.display_videos.as_deref(),
        };
        let mut list = split_media_list(stored);

        let Some(pos) = list.iter().position(|p| *p == path) else {
            return Err(AppError::NotFound(
                "Media tidak ditemukan dalam pengaturan".to_string(),
            ));
        };
        list.remove(pos);

        let mut active = owner.into_active_model();
        match request.media_type {
            MediaType::Image => active.display_images = Set(join_media_list(&list)),
            MediaType::Video => active.display_videos = Set(join_media_list(&list)),
        }
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(self.pool.as_ref()).await?;

        self.storage.remove(&path).await;

        Ok(DisplayUpdateResponse {
            display_ticker: updated.display_ticker.clone(),
            display_images: updated.image_list(),
            display_videos: updated.video_list(),
            skipped_files: Vec::new(),
        })
    }

    /// Kiosk configuration with the live queue
    pub async fn display_view(&self, slug: &str) -> AppResult<DisplayViewResponse> {
        let business = umkm_by_slug(self.pool.as_ref(), slug).await?;
        let queue = self.queue_service.snapshot(business.id).await?;

        Ok(DisplayViewResponse {
            ticker: display_ticker(&business),
            images: business.image_list(),
            videos: business.video_list(),
            umkm: PublicUmkm::from(&business),
            queue,
        })
    }
}

fn display_ticker(business: &umkm::Model) -> String {
    match business.display_ticker.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => format!("Selamat datang di {}", business.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business(ticker: Option<&str>) -> umkm::Model {
        umkm::Model {
            id: 1,
            user_id: 1,
            name: "Warung Budi".into(),
            slug: "warung-budi".into(),
            owner_whatsapp: None,
            credit_balance: 10,
            qr_path: None,
            display_ticker: ticker.map(Into::into),
            display_images: None,
            display_videos: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_display_ticker_default() {
        assert_eq!(display_ticker(&business(None)), "Selamat datang di Warung Budi");
        assert_eq!(display_ticker(&business(Some("  "))), "Selamat datang di Warung Budi");
        assert_eq!(display_ticker(&business(Some("Promo hari ini"))), "Promo hari ini");
    }
}
