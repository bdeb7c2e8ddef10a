//! Evidence gallery: processed photos grouped by checklist slot.
//!
//! Slots are opaque strings chosen by the caller. Photos within a slot keep
//! insertion order; removing one shifts the rest down.

use crate::imaging::EncodedImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GalleryError {
    #[error("Slot '{slot}' has no photo at index {index} ({len} photos)")]
    IndexOutOfRange {
        slot: String,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceGallery {
    slots: BTreeMap<String, Vec<EncodedImage>>,
}

impl EvidenceGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a photo to `slot`, creating the slot if needed.
    pub fn add(&mut self, slot: &str, photo: EncodedImage) {
        self.slots.entry(slot.to_string()).or_default().push(photo);
    }

    /// Remove and return the photo at `index` in `slot`.
    ///
    /// A slot left empty is dropped.
    pub fn remove(&mut self, slot: &str, index: usize) -> Result<EncodedImage, GalleryError> {
        let out_of_range = |len| GalleryError::IndexOutOfRange {
            slot: slot.to_string(),
            index,
            len,
        };
        let photos = self.slots.get_mut(slot).ok_or_else(|| out_of_range(0))?;
        if index >= photos.len() {
            return Err(out_of_range(photos.len()));
        }
        let removed = photos.remove(index);
        if photos.is_empty() {
            self.slots.remove(slot);
        }
        Ok(removed)
    }

    /// Photos in `slot`, oldest first. Empty for unknown slots.
    pub fn photos(&self, slot: &str) -> &[EncodedImage] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Slot names in sorted order.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn photo_count(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
