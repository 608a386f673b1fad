use std::collections::HashMap;

use axum::extract::{Multipart, multipart::MultipartError};
use axum::http::StatusCode;

use crate::error::ApiError;
use crate::pipeline::MAX_UPLOAD_BYTES;

/// A multipart form with at most one file part.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<(String, Vec<u8>)>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Reads the whole form. The file is taken from the part named
    /// `file_field`; every other part is read as a text field.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((filename, bytes.to_vec()));
            } else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self) -> Result<(String, Vec<u8>), ApiError> {
        match self.file.take() {
            Some((filename, bytes)) if !filename.trim().is_empty() => Ok((filename, bytes)),
            _ => Err(ApiError::Validation("no file was selected".into())),
        }
    }

    pub fn field(&self, name: &str) -> Result<&str, ApiError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::Validation(format!("missing form field '{name}'")))
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(MAX_UPLOAD_BYTES)
    } else {
        ApiError::Validation(e.body_text())
    }
}
