//! Files under the static root: kiosk media, payment proofs and QR codes.
//!
//! Every path handed back to callers is relative to the static root and uses
//! forward slashes, so it can be stored as-is and served from `/static/{path}`.

use crate::error::{AppError, AppResult};
use chrono::Local;
use std::path::{Component, Path, PathBuf};

#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn qr_dir(&self) -> PathBuf {
        self.root.join("qr")
    }

    /// Stores a kiosk image or video as `upload/{slug}/{timestamp}_{name}`.
    pub async fn save_display_media(
        &self,
        slug: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        let ts = Local::now().format("%Y%m%d%H%M%S%6f");
        let safe_name = sanitize_filename(original_name);
        let rel = format!("upload/{slug}/{ts}_{safe_name}");
        self.write(&rel, bytes).await?;
        Ok(rel)
    }

    /// Stores a payment proof as `upload/{slug}/topup/topup_{id}_{timestamp}_{name}`.
    pub async fn save_topup_proof(
        &self,
        slug: &str,
        tx_id: i64,
        original_name: &str,
        bytes: &[u8],
    ) -> AppResult<String> {
        let ts = Local::now().format("%Y%m%d%H%M%S");
        let safe_name = sanitize_filename(original_name);
        let rel = format!("upload/{slug}/topup/topup_{tx_id}_{ts}_{safe_name}");
        self.write(&rel, bytes).await?;
        Ok(rel)
    }

    pub async fn write(&self, rel: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        let path = self.resolve(rel)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Deletes a stored file. Missing files and IO failures are only logged.
    pub async fn remove(&self, rel: &str) {
        let path = match self.resolve(rel) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Refusing to delete {rel}: {e}");
                return;
            }
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            log::warn!("Failed to delete media file {}: {}", path.display(), e);
        }
    }

    /// Joins a relative path onto the root, rejecting anything that could escape it.
    fn resolve(&self, rel: &str) -> AppResult<PathBuf> {
        let rel_path = Path::new(rel);
        let safe = rel_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if rel.is_empty() || !safe {
            return Err(AppError::ValidationError(format!("Invalid media path: {rel}")));
        }
        Ok(self.root.join(rel_path))
    }
}

/// Keeps ASCII letters, digits, `.`, `_` and `-`; whitespace becomes `_`.
/// Leading dots are stripped so the result is never hidden or a traversal.
pub fn sanitize_filename(name: &str) -> String {
    // browsers on Windows may send the full client path
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Case-insensitive extension check against an allow-list.
pub fn has_allowed_extension(file_name: &str, allowed: &[&str]) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
