//! Process-wide "hardware unstable" circuit breaker.
//!
//! One decoder failure is enough to flip it; nothing flips it back. Owners
//! share it through an `Arc` so tests can build isolated instances.

use std::sync::atomic::{AtomicBool, Ordering};

/// Monotonic degradation flag (false → true, never reset).
#[derive(Debug, Default)]
pub struct DegradationState {
    hardware_unstable: AtomicBool,
}

impl DegradationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unstable(&self) -> bool {
        self.hardware_unstable.load(Ordering::Acquire)
    }

    /// Mark the hardware unstable.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn mark_unstable(&self) -> bool {
        !self.hardware_unstable.swap(true, Ordering::AcqRel)
    }
}
