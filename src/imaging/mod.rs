//! Image ingestion in pure Rust, no system libraries.
//!
//! | Concern | Where |
//! |---|---|
//! | **Strategy** | [`select_config`]: byte size → tiers, quality, label |
//! | **Degradation** | [`DegradationState`]: one-way "hardware unstable" flag |
//! | **Rendering** | [`Renderer`]: fast path, safe path, tier retries, emergency attempt |
//! | **Pixels** | [`ImageBackend`] trait + [`RustBackend`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Inputs, outputs and quality
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Renderer**: The retry loop combining strategy, state and backend

pub mod backend;
pub mod calculations;
pub mod degradation;
mod params;
pub mod renderer;
pub mod rust_backend;
pub mod strategy;

pub use backend::{BackendError, ImageBackend, Surface};
pub use degradation::DegradationState;
pub use params::{EncodedImage, ImageInput, OUTPUT_MEDIA_TYPE, Quality, UNKNOWN_MEDIA_TYPE};
pub use renderer::{RenderError, RenderProbe, RenderSettings, Renderer};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use strategy::{EncodingConfig, StrategyLabel, select_config};
