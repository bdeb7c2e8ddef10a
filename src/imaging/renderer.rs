//! Dual-path renderer: turns one input into one bounded JPEG, or fails.
//!
//! ```text
//! reset ─▶ for each tier (largest first):
//!            fast path  (bitmap decode + resize)   if stable and < 15 MiB
//!            safe path  (data URL → decode → fit)  otherwise, or on fast failure
//!            both failed → mark unstable, reset, cool down, next tier
//!          emergency safe path at 320px / quality 0.2
//!          still failing → ImageProcessingFailed
//! ```
//!
//! Once the [`DegradationState`] is unstable, requests start on the 480px
//! tier and the fast path is skipped. Blocking decoder work runs on tokio's
//! blocking pool; the renderer itself is not reentrant-safe by contract and
//! is driven by a single worker (see [`crate::intake`]).

use super::backend::{BackendError, ImageBackend, Surface};
use super::calculations::fit_within;
use super::degradation::DegradationState;
use super::params::{EncodedImage, ImageInput, Quality};
use super::strategy::{DEGRADED_TIERS, EMERGENCY_DIMENSION, EMERGENCY_QUALITY, EncodingConfig, MIB};
use image::DynamicImage;
use image::imageops::FilterType;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Pause after a tier fails on both paths.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_millis(800);

/// Inputs at or above this size never take the fast path.
pub const DEFAULT_FAST_PATH_LIMIT: u64 = 15 * MIB;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Image processing failed (last attempt at {dimension}px): {source}")]
    ImageProcessingFailed {
        dimension: u32,
        #[source]
        source: BackendError,
    },
}

/// Tunables for the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub cool_down: Duration,
    pub fast_path_limit: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            cool_down: DEFAULT_COOL_DOWN,
            fast_path_limit: DEFAULT_FAST_PATH_LIMIT,
        }
    }
}

/// Counters around the render critical section.
#[derive(Debug, Default)]
pub struct RenderProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl RenderProbe {
    /// Renders currently in flight.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of renders ever in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Renders started since creation.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ActiveRender<'_> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveRender(self)
    }
}

/// RAII marker for one render in flight.
struct ActiveRender<'a>(&'a RenderProbe);

impl Drop for ActiveRender<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Renderer {
    backend: Arc<dyn ImageBackend>,
    state: Arc<DegradationState>,
    settings: RenderSettings,
    probe: Arc<RenderProbe>,
}

impl Renderer {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        state: Arc<DegradationState>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            backend,
            state,
            settings,
            probe: Arc::new(RenderProbe::default()),
        }
    }

    pub fn degradation(&self) -> &Arc<DegradationState> {
        &self.state
    }

    pub fn probe(&self) -> &Arc<RenderProbe> {
        &self.probe
    }

    /// Render `input` under `config`, falling back through tiers and paths.
    ///
    /// Only total exhaustion is reported; per-tier failures are absorbed.
    pub async fn render(
        &self,
        input: &ImageInput,
        config: &EncodingConfig,
    ) -> Result<EncodedImage, RenderError> {
        let _active = self.probe.enter();
        self.reset_pipeline();

        let tiers = if self.state.is_unstable() {
            DEGRADED_TIERS
        } else {
            config.tiers
        };

        for &dim in tiers {
            match self.render_tier(input, dim, config.quality).await {
                Ok(encoded) => {
                    log::info!(
                        "Encoded {} input at {}px ({}, {} bytes)",
                        config.label,
                        dim,
                        encoded.media_type(),
                        encoded.len()
                    );
                    return Ok(encoded);
                }
                Err(err) => {
                    log::warn!("Pressure at {dim}px, both decode paths failed: {err}");
                    if self.state.mark_unstable() {
                        log::warn!(
                            "Hardware marked unstable; fast path disabled for this process"
                        );
                    }
                    self.reset_pipeline();
                    tokio::time::sleep(self.settings.cool_down).await;
                }
            }
        }

        log::warn!("All tiers failed, emergency attempt at {EMERGENCY_DIMENSION}px");
        self.safe_path(input, EMERGENCY_DIMENSION, Quality::new(EMERGENCY_QUALITY))
            .await
            .map_err(|source| {
                log::error!("Emergency attempt failed: {source}");
                RenderError::ImageProcessingFailed {
                    dimension: EMERGENCY_DIMENSION,
                    source,
                }
            })
    }

    async fn render_tier(
        &self,
        input: &ImageInput,
        dim: u32,
        quality: Quality,
    ) -> Result<EncodedImage, BackendError> {
        if !self.state.is_unstable() && input.len() < self.settings.fast_path_limit {
            match self.fast_path(input, dim, quality).await {
                Ok(encoded) => return Ok(encoded),
                Err(BackendError::DecodeUnsupported(reason)) => {
                    log::debug!("Fast path unavailable ({reason}), using safe path");
                }
                Err(err) => {
                    log::warn!("Fast path failed at {dim}px: {err}; retrying on safe path");
                    self.state.mark_unstable();
                }
            }
        }
        self.safe_path(input, dim, quality).await
    }

    /// Native bitmap decode resized by the decoder, drawn at its own size.
    async fn fast_path(
        &self,
        input: &ImageInput,
        dim: u32,
        quality: Quality,
    ) -> Result<EncodedImage, BackendError> {
        let backend = Arc::clone(&self.backend);
        let input = input.clone();
        run_blocking(move || {
            let bitmap = backend.decode_bitmap(&input, dim)?;
            let size = (bitmap.width(), bitmap.height());
            draw_and_encode(backend.as_ref(), bitmap, size, FilterType::Nearest, quality)
        })
        .await
    }

    /// Full read into a data URL, then decode and fit inside `dim`.
    async fn safe_path(
        &self,
        input: &ImageInput,
        dim: u32,
        quality: Quality,
    ) -> Result<EncodedImage, BackendError> {
        let backend = Arc::clone(&self.backend);
        let reader_input = input.clone();
        let data_url = run_blocking(move || backend.read_data_url(&reader_input)).await?;

        let backend = Arc::clone(&self.backend);
        run_blocking(move || {
            let source = backend.decode_data_url(&data_url)?;
            drop(data_url);
            let target = fit_within((source.width(), source.height()), dim);
            draw_and_encode(backend.as_ref(), source, target, FilterType::Triangle, quality)
        })
        .await
    }

    fn reset_pipeline(&self) {
        if let Err(err) = self.backend.reset_pipeline() {
            log::debug!("Pipeline reset failed (ignored): {err}");
        }
    }
}

/// Draw → encode → release, shared by both decode paths.
///
/// The source is dropped as soon as it is drawn and the surface is released
/// whether or not encoding succeeds.
fn draw_and_encode(
    backend: &dyn ImageBackend,
    source: DynamicImage,
    (width, height): (u32, u32),
    filter: FilterType,
    quality: Quality,
) -> Result<EncodedImage, BackendError> {
    let mut surface = Surface::draw(&source, width, height, filter);
    drop(source);
    let encoded = backend.encode(&surface, quality);
    surface.release();
    Ok(EncodedImage::from_jpeg(&encoded?))
}

async fn run_blocking<T, F>(work: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BackendError::Decode(format!("Decoder task aborted: {e}")))?
}
