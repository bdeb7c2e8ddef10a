//! Shared test utilities for the evidence-intake test suite.
//!
//! Synthetic photos, padded inputs for exercising the size table, and a
//! helper to look inside an [`EncodedImage`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let input = jpeg_input(2000, 1500);
//! let encoded = queue.process_image(input).await.unwrap();
//! assert_eq!(decoded_dimensions(&encoded), (1280, 960));
//! ```

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

use crate::imaging::{EncodedImage, ImageInput};

// =========================================================================
// Synthetic photos
// =========================================================================

/// Encode a gradient test pattern as JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// Encode a semi-transparent test pattern as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 128])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// A JPEG whose EXIF block carries the given Orientation tag (1-8).
///
/// The APP1 segment is spliced in after the JFIF header, holding a
/// big-endian TIFF with a single IFD0 entry.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
    tiff.extend_from_slice(&1u16.to_be_bytes()); // one entry
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no IFD1

    let mut app1 = vec![0xFF, 0xE1];
    let segment_len = (2 + 6 + tiff.len()) as u16;
    app1.extend_from_slice(&segment_len.to_be_bytes());
    app1.extend_from_slice(b"Exif\x00\x00");
    app1.extend_from_slice(&tiff);

    // After SOI, and after APP0 when the encoder wrote one
    let mut at = 2;
    if jpeg[2..4] == [0xFF, 0xE0] {
        at = 4 + u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
    }
    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..at]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[at..]);
    out
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format)
        .expect("failed to encode test image");
    cursor.into_inner()
}

pub fn jpeg_input(width: u32, height: u32) -> ImageInput {
    ImageInput::new(jpeg_bytes(width, height), "image/jpeg")
}

/// An input of exactly `len` bytes. Content is not a decodable image; only
/// useful with the mock backend.
pub fn sized_input(len: u64) -> ImageInput {
    ImageInput::new(vec![0u8; len as usize], "image/jpeg")
}

// =========================================================================
// Inspecting results
// =========================================================================

/// Decode the JPEG inside an encoded image and return its dimensions.
pub fn decoded_dimensions(encoded: &EncodedImage) -> (u32, u32) {
    let bytes = encoded.decode_payload().expect("payload is not base64");
    let img = image::load_from_memory(&bytes).expect("payload is not an image");
    (img.width(), img.height())
}
