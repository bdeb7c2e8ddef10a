//! CLI output formatting.
//!
//! Each photo leads with its positional index and file name, with the outcome
//! shown as an indented context line:
//!
//! ```text
//! Slot fire-exit (3 photos)
//! 001 front.jpg (4.2 MB)
//!     Encoded: 182.4 KB
//! 002 broken.jpg (31.0 MB)
//!     Failed to process file: Image processing failed (last attempt at 320px): ...
//! 003 side.png (812.0 KB)
//!     Encoded: 96.1 KB
//! Added 2 of 3 photos to fire-exit (degraded mode)
//! ```
//!
//! Gallery listing:
//!
//! ```text
//! fire-exit (2 photos)
//!     000 image/jpeg, 182.4 KB
//!     001 image/jpeg, 96.1 KB
//! ```
//!
//! `format_*` functions return `Vec<String>` and do no I/O; `print_*`
//! wrappers write to stdout.

use crate::gallery::EvidenceGallery;
use crate::imaging::EncodedImage;
use crate::intake::IntakeError;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count (binary units, one decimal).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// process
// ============================================================================

/// Header printed before a batch is submitted.
pub fn format_batch_header(slot: &str, count: usize) -> String {
    let noun = if count == 1 { "photo" } else { "photos" };
    format!("Slot {slot} ({count} {noun})")
}

/// Lines for one processed file.
pub fn format_process_result(
    index: usize,
    path: &Path,
    source_len: Option<u64>,
    result: &Result<EncodedImage, IntakeError>,
) -> Vec<String> {
    let header = match source_len {
        Some(len) => format!("{} {} ({})", format_index(index), file_label(path), format_size(len)),
        None => format!("{} {}", format_index(index), file_label(path)),
    };
    let detail = match result {
        Ok(encoded) => format!("Encoded: {}", format_size(encoded.len() as u64)),
        Err(err) => format!("Failed to process file: {err}"),
    };
    vec![header, format!("{}{}", indent(1), detail)]
}

/// A file that could not even be read from disk.
pub fn format_unreadable(index: usize, path: &Path, err: &std::io::Error) -> Vec<String> {
    vec![
        format!("{} {}", format_index(index), file_label(path)),
        format!("{}Failed to read file: {err}", indent(1)),
    ]
}

pub fn format_process_summary(slot: &str, added: usize, total: usize, degraded: bool) -> String {
    let mut line = format!("Added {added} of {total} photos to {slot}");
    if degraded {
        line.push_str(" (degraded mode)");
    }
    line
}

// ============================================================================
// list / remove
// ============================================================================

/// Every slot with its photos, indexed from 0 to match `remove --index`.
pub fn format_gallery(gallery: &EvidenceGallery) -> Vec<String> {
    if gallery.is_empty() {
        return vec!["No photos stored".to_string()];
    }
    let mut lines = Vec::new();
    for slot in gallery.slots() {
        let photos = gallery.photos(slot);
        lines.push(format!("{slot} ({} photos)", photos.len()));
        for (i, photo) in photos.iter().enumerate() {
            lines.push(format!(
                "{}{:0>3} {}, {}",
                indent(1),
                i,
                photo.media_type(),
                format_size(photo.len() as u64)
            ));
        }
    }
    lines
}

pub fn print_gallery(gallery: &EvidenceGallery) {
    for line in format_gallery(gallery) {
        println!("{}", line);
    }
}

pub fn format_removed(slot: &str, index: usize, remaining: usize) -> String {
    format!("Removed photo {index} from {slot} ({remaining} left)")
}
