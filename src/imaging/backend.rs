//! Image decoding backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the primitives the renderer composes
//! into its two decode paths: reset, bitmap decode (fast path), data-URL
//! read and decode (safe path), and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked. Tests use the `MockBackend` in this module to inject faults per
//! path.

use super::params::{ImageInput, Quality};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The fast-path decoder does not exist on this platform.
    #[error("Decoder unsupported: {0}")]
    DecodeUnsupported(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Off-screen, opaque drawing surface.
///
/// Holds RGB pixels only: anything drawn onto it loses its alpha channel.
/// Call [`Surface::release`] once encoded to hand the buffer back.
#[derive(Debug)]
pub struct Surface {
    pixels: RgbImage,
}

impl Surface {
    /// Draw `source` onto a new surface of `width`×`height`.
    ///
    /// Sources that already have the target size are copied without
    /// resampling.
    pub fn draw(source: &DynamicImage, width: u32, height: u32, filter: FilterType) -> Self {
        let pixels = if source.width() == width && source.height() == height {
            source.to_rgb8()
        } else {
            image::imageops::resize(&source.to_rgb8(), width, height, filter)
        };
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Shrink the surface to zero size, freeing its buffer.
    pub fn release(&mut self) {
        self.pixels = RgbImage::new(0, 0);
    }

    pub fn is_released(&self) -> bool {
        self.pixels.width() == 0 && self.pixels.height() == 0
    }
}

/// Trait for image decoding backends.
///
/// All calls are blocking; the renderer runs them on the blocking pool.
pub trait ImageBackend: Send + Sync {
    /// Allocate and immediately release a minimal surface, purging state left
    /// by a previous request. Must succeed when nothing was ever drawn.
    fn reset_pipeline(&self) -> Result<(), BackendError>;

    /// Fast path decode: native bitmap decode with built-in resize so the
    /// result is `resize_width` pixels wide, orientation already applied.
    fn decode_bitmap(
        &self,
        input: &ImageInput,
        resize_width: u32,
    ) -> Result<DynamicImage, BackendError>;

    /// Safe path, step one: read the whole input into a `data:` URL.
    fn read_data_url(&self, input: &ImageInput) -> Result<String, BackendError>;

    /// Safe path, step two: decode a `data:` URL at full size.
    fn decode_data_url(&self, data_url: &str) -> Result<DynamicImage, BackendError>;

    /// Encode a surface to JPEG bytes.
    fn encode(&self, surface: &Surface, quality: Quality) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// How a mocked path behaves on each call.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Fault {
        /// Always succeed.
        None,
        /// Always fail.
        Always,
        /// Fail the first `n` calls, then succeed.
        FirstCalls(usize),
        /// Report the primitive as missing on this platform.
        Unsupported,
    }

    /// Mock backend that records operations and fails on demand.
    /// Uses Mutex (not RefCell) so it is Sync and can cross the blocking pool.
    pub struct MockBackend {
        pub bitmap_fault: Fault,
        pub read_fault: Fault,
        pub decode_fault: Fault,
        pub reset_fails: bool,
        /// Dimensions of the image the safe path decodes.
        pub source_dims: (u32, u32),
        /// Time each decode call blocks for.
        pub decode_delay: Duration,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub(crate) bitmap_calls: AtomicUsize,
        pub(crate) read_calls: AtomicUsize,
        pub(crate) decode_calls: AtomicUsize,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Reset,
        DecodeBitmap { input_len: u64, width: u32 },
        ReadDataUrl { input_len: u64 },
        DecodeDataUrl,
        Encode { width: u32, height: u32, quality: u8 },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                bitmap_fault: Fault::None,
                read_fault: Fault::None,
                decode_fault: Fault::None,
                reset_fails: false,
                source_dims: (400, 300),
                decode_delay: Duration::ZERO,
                operations: Mutex::new(Vec::new()),
                bitmap_calls: AtomicUsize::new(0),
                read_calls: AtomicUsize::new(0),
                decode_calls: AtomicUsize::new(0),
            }
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every decode primitive fails.
        pub fn broken() -> Self {
            Self {
                bitmap_fault: Fault::Always,
                decode_fault: Fault::Always,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Widths requested from the fast path, in call order.
        pub fn bitmap_widths(&self) -> Vec<u32> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::DecodeBitmap { width, .. } => Some(width),
                    _ => None,
                })
                .collect()
        }

        /// Surfaces handed to the encoder, in call order.
        pub fn encodes(&self) -> Vec<(u32, u32, u8)> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Encode {
                        width,
                        height,
                        quality,
                    } => Some((width, height, quality)),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, matches: impl Fn(&RecordedOp) -> bool) -> usize {
            self.get_operations().iter().filter(|op| matches(op)).count()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }

        fn check(fault: Fault, calls: &AtomicUsize, what: &str) -> Result<(), BackendError> {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            match fault {
                Fault::None => Ok(()),
                Fault::FirstCalls(n) if call >= n => Ok(()),
                Fault::Unsupported => Err(BackendError::DecodeUnsupported(what.to_string())),
                _ => Err(BackendError::Decode(format!("injected {what} failure"))),
            }
        }
    }

    impl ImageBackend for MockBackend {
        fn reset_pipeline(&self) -> Result<(), BackendError> {
            self.record(RecordedOp::Reset);
            if self.reset_fails {
                return Err(BackendError::Decode("injected reset failure".to_string()));
            }
            Ok(())
        }

        fn decode_bitmap(
            &self,
            input: &ImageInput,
            resize_width: u32,
        ) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::DecodeBitmap {
                input_len: input.len(),
                width: resize_width,
            });
            std::thread::sleep(self.decode_delay);
            Self::check(self.bitmap_fault, &self.bitmap_calls, "bitmap")?;
            let (w, h) = super::super::calculations::resize_to_width(self.source_dims, resize_width);
            Ok(DynamicImage::new_rgb8(w, h))
        }

        fn read_data_url(&self, input: &ImageInput) -> Result<String, BackendError> {
            self.record(RecordedOp::ReadDataUrl {
                input_len: input.len(),
            });
            Self::check(self.read_fault, &self.read_calls, "read").map_err(|e| match e {
                BackendError::Decode(msg) => BackendError::Read(msg),
                other => other,
            })?;
            Ok(format!("data:{};base64,", input.media_type()))
        }

        fn decode_data_url(&self, _data_url: &str) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::DecodeDataUrl);
            std::thread::sleep(self.decode_delay);
            Self::check(self.decode_fault, &self.decode_calls, "data URL")?;
            let (w, h) = self.source_dims;
            Ok(DynamicImage::new_rgba8(w, h))
        }

        fn encode(&self, surface: &Surface, quality: Quality) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::Encode {
                width: surface.width(),
                height: surface.height(),
                quality: quality.jpeg_level(),
            });
            Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
        }
    }

    #[test]
    fn surface_draw_resizes_and_drops_alpha() {
        let source = DynamicImage::new_rgba8(40, 20);
        let surface = Surface::draw(&source, 20, 10, FilterType::Triangle);
        assert_eq!((surface.width(), surface.height()), (20, 10));
        assert_eq!(surface.pixels().as_raw().len(), 20 * 10 * 3);
    }

    #[test]
    fn surface_release_shrinks_to_zero() {
        let source = DynamicImage::new_rgb8(8, 8);
        let mut surface = Surface::draw(&source, 8, 8, FilterType::Nearest);
        assert!(!surface.is_released());
        surface.release();
        assert!(surface.is_released());
        assert!(surface.pixels().as_raw().is_empty());
    }

    #[test]
    fn mock_records_bitmap_decode() {
        let backend = MockBackend::new();
        let input = ImageInput::new(vec![0u8; 10], "image/jpeg");

        let bitmap = backend.decode_bitmap(&input, 200).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (200, 150));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::DecodeBitmap {
                input_len: 10,
                width: 200
            }
        ));
    }

    #[test]
    fn mock_first_calls_fault_recovers() {
        let backend = MockBackend {
            decode_fault: Fault::FirstCalls(1),
            ..MockBackend::default()
        };
        assert!(backend.decode_data_url("data:,").is_err());
        assert!(backend.decode_data_url("data:,").is_ok());
    }

    #[test]
    fn mock_read_fault_is_a_read_error() {
        let backend = MockBackend {
            read_fault: Fault::Always,
            ..MockBackend::default()
        };
        let input = ImageInput::new(vec![1u8], "image/png");
        assert!(matches!(
            backend.read_data_url(&input),
            Err(BackendError::Read(_))
        ));
    }

    #[test]
    fn mock_unsupported_bitmap() {
        let backend = MockBackend {
            bitmap_fault: Fault::Unsupported,
            ..MockBackend::default()
        };
        let input = ImageInput::new(vec![1u8], "image/png");
        assert!(matches!(
            backend.decode_bitmap(&input, 100),
            Err(BackendError::DecodeUnsupported(_))
        ));
    }
}
