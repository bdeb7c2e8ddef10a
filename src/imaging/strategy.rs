//! Strategy selection: which resolution tiers and quality a request gets.
//!
//! The table is keyed on the input's byte size, not its pixel dimensions:
//! byte size is known before anything is decoded, and very large files are
//! the ones that knock over constrained decoders.
//!
//! | byte size | tiers | quality | label |
//! |---|---|---|---|
//! | > 25 MiB | 640 | 0.3 | `EMERGENCY` |
//! | > 12 MiB | 1024, 800 | 0.5 | `ULTRA_HIGH` |
//! | otherwise | 1280, 960 | 0.6 | `STANDARD` |
//!
//! A degraded process ignores the table's tiers and gets [`DEGRADED_TIERS`].

use super::params::Quality;
use std::fmt;

/// One binary megabyte.
pub const MIB: u64 = 1024 * 1024;

/// Inputs strictly larger than this use the `EMERGENCY` strategy.
pub const EMERGENCY_THRESHOLD: u64 = 25 * MIB;

/// Inputs strictly larger than this (and not emergency) use `ULTRA_HIGH`.
pub const ULTRA_HIGH_THRESHOLD: u64 = 12 * MIB;

/// The only tier a degraded process may use.
pub const DEGRADED_TIERS: &[u32] = &[480];

/// Dimension of the last-resort attempt after every tier failed.
pub const EMERGENCY_DIMENSION: u32 = 320;

/// Quality of the last-resort attempt after every tier failed.
pub const EMERGENCY_QUALITY: f32 = 0.2;

const EMERGENCY_TIERS: &[u32] = &[640];
const ULTRA_HIGH_TIERS: &[u32] = &[1024, 800];
const STANDARD_TIERS: &[u32] = &[1280, 960];

/// Name of the strategy a request was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyLabel {
    Emergency,
    UltraHigh,
    Standard,
}

impl StrategyLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::UltraHigh => "ULTRA_HIGH",
            Self::Standard => "STANDARD",
        }
    }
}

impl fmt::Display for StrategyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tiers and quality chosen once per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingConfig {
    /// Maximum output dimensions, largest first.
    pub tiers: &'static [u32],
    pub quality: Quality,
    pub label: StrategyLabel,
}

/// Select the encoding strategy for an input of `byte_size` bytes.
///
/// Pure: the only state it sees is the `degraded` flag passed in. When
/// degraded the tier list collapses to [`DEGRADED_TIERS`]; quality and label
/// still come from the size table.
pub fn select_config(byte_size: u64, degraded: bool) -> EncodingConfig {
    let (tiers, quality, label) = if byte_size > EMERGENCY_THRESHOLD {
        (EMERGENCY_TIERS, 0.3, StrategyLabel::Emergency)
    } else if byte_size > ULTRA_HIGH_THRESHOLD {
        (ULTRA_HIGH_TIERS, 0.5, StrategyLabel::UltraHigh)
    } else {
        (STANDARD_TIERS, 0.6, StrategyLabel::Standard)
    };

    EncodingConfig {
        tiers: if degraded { DEGRADED_TIERS } else { tiers },
        quality: Quality::new(quality),
        label,
    }
}
