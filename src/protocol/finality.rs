//! Finality thresholds accepted by `depositForBurn`
//!
//! Reference: <https://developers.circle.com/cctp/technical-guide>

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum finality the attestation service waits for before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum FinalityThreshold {
    /// Attest at the "confirmed" level; may charge a fee
    Fast = 1000,
    /// Attest at the "finalized" level
    #[default]
    Standard = 2000,
}

impl FinalityThreshold {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fast => "Fast Transfer",
            Self::Standard => "Standard Transfer",
        }
    }
}

impl fmt::Display for FinalityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}
