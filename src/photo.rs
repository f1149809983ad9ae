//! Uploaded photo intake.
//!
//! The only check performed is the file-extension filter. Bytes are
//! passed through untouched; the media type is taken from the leading
//! magic bytes when they are recognizable and from the extension
//! otherwise.

use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::consts::ALLOWED_EXTENSIONS;

/// Raster formats the intake accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            _ => None,
        }
    }

    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MediaType::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(MediaType::Png)
        } else {
            None
        }
    }
}

/// Why an upload was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("no photo was uploaded")]
    Missing,
    #[error("unsupported file type {0:?}: upload a jpg, jpeg or png")]
    UnsupportedType(String),
    #[error("failed to read upload: {0}")]
    Read(String),
}

/// A photo held for the current interaction only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    file_name: String,
    media_type: MediaType,
    bytes: Vec<u8>,
}

impl Photo {
    /// Accept an upload by file name. Empty bodies count as no upload.
    pub fn from_upload(file_name: &str, bytes: Vec<u8>) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Missing);
        }
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(UploadError::UnsupportedType(file_name.to_string()));
        }
        let by_ext = MediaType::from_extension(&ext).ok_or_else(|| {
            UploadError::UnsupportedType(file_name.to_string())
        })?;
        let media_type = MediaType::sniff(&bytes).unwrap_or(by_ext);

        Ok(Self {
            file_name: file_name.to_string(),
            media_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URI for inline previews.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime(), self.to_base64())
    }
}
