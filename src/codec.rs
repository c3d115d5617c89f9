use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to read image {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported image extension: {0}")]
    UnsupportedExtension(String),
    #[error("image file is empty: {0}")]
    Empty(String),
}

/// A transportable encoded image: MIME type plus standard base64 body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn from_bytes(mime: &str, body: &[u8]) -> Self {
        Self {
            mime: mime.to_string(),
            base64: BASE64.encode(body),
        }
    }

    /// Display form, `data:<mime>;base64,<body>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }

    /// Transmission form: the bare base64 body, MIME prefix stripped.
    pub fn body(&self) -> &str {
        &self.base64
    }
}

/// Read an image file and produce its encoded payload.
///
/// Local failures are terminal; the caller never retries an encode.
pub async fn encode_image(path: &Path) -> Result<EncodedImage, EncodeError> {
    let mime = mime_from_path(path)?;
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| EncodeError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
    if raw.is_empty() {
        return Err(EncodeError::Empty(path.display().to_string()));
    }
    let body = Bytes::from(raw);
    Ok(EncodedImage::from_bytes(mime, &body))
}

fn mime_from_path(path: &Path) -> Result<&'static str, EncodeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    mime_from_ext(&ext).ok_or(EncodeError::UnsupportedExtension(ext))
}

fn mime_from_ext(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}
