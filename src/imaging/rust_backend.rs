//! Pure Rust decoding backend, no system libraries.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Fast-path resize | `fast_image_resize`, bilinear convolution |
//! | `data:` URLs | `base64` standard engine |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend, Surface};
use super::calculations::resize_to_width;
use super::params::{ImageInput, Quality};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode bytes with the format sniffed from their signature, applying the
/// embedded orientation.
fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(BackendError::Io)?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| BackendError::Decode(format!("Unrecognised image: {e}")))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| BackendError::Decode(format!("Failed to read orientation: {e}")))?;
    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| BackendError::Decode(format!("Failed to decode image: {e}")))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Largest bitmap the fast path will allocate (about 120 MB of RGB).
///
/// Resizing to a fixed width upscales narrow images by the same factor on
/// both axes, so a thin strip can ask for an absurdly tall bitmap.
pub const FAST_PATH_MAX_PIXELS: u64 = 40_000_000;

/// Resize to `width` (aspect preserved) with a cheap bilinear filter.
///
/// Targets above [`FAST_PATH_MAX_PIXELS`] are refused as unsupported so the
/// caller falls back to the safe path, which never upscales.
fn resize_bitmap(img: DynamicImage, width: u32) -> Result<DynamicImage, BackendError> {
    let (target_w, target_h) = resize_to_width((img.width(), img.height()), width);
    if (target_w, target_h) == (img.width(), img.height()) {
        return Ok(img);
    }
    if u64::from(target_w) * u64::from(target_h) > FAST_PATH_MAX_PIXELS {
        return Err(BackendError::DecodeUnsupported(format!(
            "{}x{} would resize to {target_w}x{target_h}, over the fast-path pixel budget",
            img.width(),
            img.height()
        )));
    }

    let src = img.into_rgb8();
    let (src_w, src_h) = src.dimensions();
    let src_image = fr::images::Image::from_vec_u8(src_w, src_h, src.into_raw(), fr::PixelType::U8x3)
        .map_err(|e| BackendError::Decode(format!("Failed to wrap bitmap: {e}")))?;
    let mut dst_image = fr::images::Image::new(target_w, target_h, fr::PixelType::U8x3);

    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
    fr::Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| BackendError::Decode(format!("Bitmap resize failed: {e}")))?;

    RgbImage::from_raw(target_w, target_h, dst_image.into_vec())
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("Resized bitmap has unexpected length".into()))
}

/// Split a `data:` URL into its base64 payload.
fn data_url_payload(data_url: &str) -> Result<&str, BackendError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| BackendError::Decode("Not a data URL".into()))?;
    rest.split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| BackendError::Decode("Data URL is not base64 encoded".into()))
}

impl ImageBackend for RustBackend {
    fn reset_pipeline(&self) -> Result<(), BackendError> {
        let mut vacuum = RgbImage::new(1, 1);
        vacuum.put_pixel(0, 0, image::Rgb([0, 0, 0]));
        drop(vacuum);
        Ok(())
    }

    fn decode_bitmap(
        &self,
        input: &ImageInput,
        resize_width: u32,
    ) -> Result<DynamicImage, BackendError> {
        let img = decode_oriented(input.bytes())?;
        resize_bitmap(img, resize_width)
    }

    fn read_data_url(&self, input: &ImageInput) -> Result<String, BackendError> {
        if input.is_empty() {
            return Err(BackendError::Read("Input is empty".into()));
        }
        Ok(format!(
            "data:{};base64,{}",
            input.media_type(),
            STANDARD.encode(input.bytes())
        ))
    }

    fn decode_data_url(&self, data_url: &str) -> Result<DynamicImage, BackendError> {
        let payload = data_url_payload(data_url)?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| BackendError::Decode(format!("Base64 decode failed: {e}")))?;
        decode_oriented(&bytes)
    }

    fn encode(&self, surface: &Surface, quality: Quality) -> Result<Vec<u8>, BackendError> {
        if surface.is_released() {
            return Err(BackendError::Encode("Surface already released".into()));
        }
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_level());
        surface
            .pixels()
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
        Ok(buffer)
    }
}
