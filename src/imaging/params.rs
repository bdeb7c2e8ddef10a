//! Value types flowing through the ingestion pipeline.
//!
//! These types describe *what* goes in and *what* comes out. The
//! [`renderer`](super::renderer) decides how to get from one to the other and
//! the [`backend`](super::backend) does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (0.0–1.0). Clamped on construction.
//! - [`ImageInput`]: The caller's photo: immutable bytes plus a declared media type.
//! - [`EncodedImage`]: The result: a `data:` URL embedding a JPEG payload.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media type used when the input's format cannot be derived.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Media type of every [`EncodedImage`].
pub const OUTPUT_MEDIA_TYPE: &str = "image/jpeg";

/// Quality setting for lossy image encoding (0.0-1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality(f32);

impl Quality {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the JPEG encoder's 1-100 scale.
    pub fn jpeg_level(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

/// A user-supplied photo of unknown size and format.
///
/// Cloning is cheap: the bytes are reference counted and never mutated.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Bytes,
    media_type: String,
}

impl ImageInput {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    /// Read a photo from disk, deriving the media type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let media_type = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type())
            .unwrap_or(UNKNOWN_MEDIA_TYPE);
        Ok(Self::new(bytes, media_type))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Size of the input in bytes.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A complete, size-bounded JPEG embedded in a `data:` URL.
///
/// Stored as an opaque string by galleries and snapshot stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wrap encoded JPEG bytes as a `data:image/jpeg;base64,...` URL.
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self(format!(
            "data:{};base64,{}",
            OUTPUT_MEDIA_TYPE,
            STANDARD.encode(bytes)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Length of the whole `data:` URL in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The media type declared in the URL header.
    pub fn media_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("")
    }

    /// Decode the base64 payload back into the encoded image bytes.
    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let payload = self
            .0
            .split_once(";base64,")
            .map(|(_, data)| data)
            .unwrap_or("");
        STANDARD.decode(payload)
    }
}

impl std::fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
