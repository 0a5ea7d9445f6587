use crate::error::{AppError, AppResult};
use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use std::collections::HashMap;

#[derive(Debug)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Buffered multipart form: text fields by name plus uploaded files in order.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn files(&self, field: &str) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter().filter(move |f| f.field == field)
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files(field).next()
    }
}

/// Drains the multipart stream, failing fast once the body exceeds `max_bytes`.
/// File inputs submitted without a file (empty file name) are ignored.
pub async fn read_form(mut payload: Multipart, max_bytes: usize) -> AppResult<FormData> {
    let mut form = FormData::default();
    let mut total = 0usize;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::ValidationError(format!("Failed to parse multipart data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read upload: {e}")))?
        {
            total += chunk.len();
            if total > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "Upload exceeds {} MB",
                    max_bytes / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) if !file_name.is_empty() => form.files.push(UploadedFile {
                field: name,
                file_name,
                bytes,
            }),
            Some(_) => {}
            None => {
                let value = String::from_utf8(bytes).map_err(|_| {
                    AppError::ValidationError(format!("Field {name} is not valid UTF-8"))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
