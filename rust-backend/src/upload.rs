use std::collections::HashMap;

use actix_multipart::Multipart;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    /// Accepts any subtype of `top_level`, e.g. `video/*`.
    pub fn is_kind(&self, top_level: &str) -> bool {
        self.content_type
            .split_once('/')
            .map_or(false, |(kind, _)| kind.eq_ignore_ascii_case(top_level))
    }

    pub fn expect_kind(self, top_level: &str, field: &str) -> Result<Self, AppError> {
        if self.is_kind(top_level) {
            Ok(self)
        } else {
            Err(AppError::bad_request(format!(
                "Invalid file type for {}: expected {}/*, got {}",
                field, top_level, self.content_type
            )))
        }
    }
}

/// A fully buffered multipart form: text fields plus any file parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl UploadForm {
    /// Drains the payload. The combined size of all parts may not exceed `max_bytes`.
    pub async fn read(mut payload: Multipart, max_bytes: usize) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        let mut total = 0usize;

        while let Some(item) = payload.next().await {
            let mut field = item?;
            let disposition = field.content_disposition();
            let name = match disposition.get_name() {
                Some(name) => name.to_string(),
                None => continue,
            };
            let file_name = disposition.get_filename().map(str::to_string);
            let content_type = field
                .content_type()
                .map(|mime| mime.essence_str().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let mut buffer = BytesMut::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                total += chunk.len();
                if total > max_bytes {
                    return Err(AppError::bad_request(format!(
                        "Upload exceeds the {} byte limit",
                        max_bytes
                    )));
                }
                buffer.extend_from_slice(&chunk);
            }

            match file_name {
                Some(file_name) => {
                    if buffer.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: buffer.freeze(),
                        },
                    );
                }
                None => {
                    let text = String::from_utf8(buffer.to_vec())
                        .map_err(|_| AppError::bad_request(format!("Field '{}' is not valid UTF-8", name)))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed text, `None` when absent or blank.
    pub fn trimmed(&self, name: &str) -> Option<&str> {
        self.text(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// `"true"`, `"1"`, `"on"` and `"yes"` are true; anything else present is false.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes"))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub(crate) fn with_fields(fields: &[(&str, &str)]) -> Self {
        UploadForm {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}
