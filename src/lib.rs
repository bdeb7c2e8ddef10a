//! # Evidence Intake
//!
//! Client-side ingestion of high-resolution photos for field audits. Every
//! photo an inspector attaches is turned into a bounded JPEG data URL, small
//! enough to store and render on memory-constrained hardware, without the
//! decoder ever being asked to do two things at once.
//!
//! # Architecture
//!
//! ```text
//! photo ─▶ IntakeQueue (FIFO, one at a time)
//!            └─▶ select_config(byte size, degraded?)  → tiers + quality
//!                 └─▶ Renderer
//!                       fast path  ─┐
//!                       safe path  ─┼─▶ JPEG data URL ─▶ EvidenceGallery ─▶ JsonFileStore
//!                       emergency  ─┘
//! ```
//!
//! The first decode failure flips a process-wide [`imaging::DegradationState`].
//! From then on every photo goes straight to the conservative 480px tier on
//! the safe path; the flag is never cleared.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`intake`] | Single-worker FIFO queue in front of the renderer |
//! | [`imaging`] | Strategy table, degradation flag, dual-path renderer, backends |
//! | [`gallery`] | Processed photos grouped by evidence slot |
//! | [`store`] | JSON snapshot persistence keyed by name |
//! | [`config`] | `intake.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Example
//!
//! ```no_run
//! use evidence_intake::imaging::{ImageInput, RenderSettings, RustBackend};
//! use evidence_intake::intake::IntakeQueue;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = IntakeQueue::new(Arc::new(RustBackend::new()), RenderSettings::default());
//! let photo = ImageInput::from_path("site/front-door.jpg".as_ref())?;
//! let encoded = queue.process_image(photo).await?;
//! assert!(encoded.as_str().starts_with("data:image/jpeg;base64,"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gallery;
pub mod imaging;
pub mod intake;
pub mod output;
pub mod store;

pub use intake::{IntakeError, IntakeQueue, OrderedBatch, PendingImage};

#[cfg(test)]
pub(crate) mod test_helpers;
