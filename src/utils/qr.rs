use crate::error::{AppError, AppResult};
use crate::utils::MediaStorage;
use qrcode::QrCode;
use qrcode::render::svg;

pub fn render_qr_svg(data: &str) -> AppResult<String> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::InternalError(format!("QR encoding failed: {}", e)))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(320, 320)
        .quiet_zone(true)
        .build())
}

/// Writes `qr/{slug}.svg` pointing at the public queue page and returns the file name.
pub async fn write_umkm_qr(storage: &MediaStorage, slug: &str, url: &str) -> AppResult<String> {
    let svg = render_qr_svg(url)?;
    let file_name = format!("{slug}.svg");
    storage
        .write(&format!("qr/{file_name}"), svg.as_bytes())
        .await?;
    log::info!("QR code generated for {slug}: {url}");
    Ok(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_qr_svg() {
        let svg = render_qr_svg("https://antri.id/warung-budi").unwrap();
        assert!(svg.contains("<svg"));
    }

    #[tokio::test]
    async fn test_write_umkm_qr() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        let name = write_umkm_qr(&storage, "warung-budi", "http://localhost/warung-budi")
            .await
            .unwrap();
        assert_eq!(name, "warung-budi.svg");
        assert!(dir.path().join("qr").join("warung-budi.svg").exists());
    }
}
