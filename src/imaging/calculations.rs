//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Uniform scale factor that fits `source` inside a `dim`×`dim` box.
///
/// Never exceeds 1.0: sources already inside the box keep their size.
///
/// # Examples
/// ```
/// # use evidence_intake::imaging::calculations::fit_scale;
/// assert_eq!(fit_scale((2000, 1000), 1000), 0.5);
/// assert_eq!(fit_scale((400, 300), 1280), 1.0);
/// ```
pub fn fit_scale(source: (u32, u32), dim: u32) -> f64 {
    let (width, height) = source;
    if width == 0 || height == 0 {
        return 1.0;
    }
    (dim as f64 / width as f64)
        .min(dim as f64 / height as f64)
        .min(1.0)
}

/// Dimensions of `source` after fitting it inside a `dim`×`dim` box.
///
/// Each edge is floored, then held at one pixel minimum so extreme aspect
/// ratios never produce an empty surface.
pub fn fit_within(source: (u32, u32), dim: u32) -> (u32, u32) {
    let scale = fit_scale(source, dim);
    let (width, height) = source;
    let w = ((width as f64 * scale).floor() as u32).max(1);
    let h = ((height as f64 * scale).floor() as u32).max(1);
    (w, h)
}

/// Dimensions of `source` resized so its width is exactly `target_width`.
///
/// Height follows the aspect ratio, rounded, at least one pixel.
pub fn resize_to_width(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (width, height) = source;
    let target_width = target_width.max(1);
    if width == 0 {
        return (target_width, height.max(1));
    }
    let h = (height as f64 * target_width as f64 / width as f64).round() as u32;
    (target_width, h.max(1))
}
