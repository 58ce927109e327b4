//! # Savings Evaluation Module
//!
//! Confronta dimensione originale e compressa e decide se la differenza è
//! rumore (jitter di metadata/container) o un miglioramento reale.

use serde::Serialize;
use std::path::Path;

/// Byte risparmiati sotto i quali la riduzione non viene considerata significativa
pub const NOISE_FLOOR_BYTES: i64 = 10;

/// Classification of a compression result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "classification", rename_all = "snake_case")]
pub enum Savings {
    Improved { saved_bytes: u64, saved_percent: u64 },
    /// Below the noise floor; `saved_bytes` may be zero or negative
    Unchanged { saved_bytes: i64 },
}

impl Savings {
    pub fn is_improved(&self) -> bool {
        matches!(self, Self::Improved { .. })
    }

    /// Signed byte delta between original and compressed output
    pub fn saved_bytes(&self) -> i64 {
        match *self {
            Self::Improved { saved_bytes, .. } => saved_bytes as i64,
            Self::Unchanged { saved_bytes } => saved_bytes,
        }
    }

    /// Percentage reported to the user, zero when unchanged
    pub fn saved_percent(&self) -> u64 {
        match *self {
            Self::Improved { saved_percent, .. } => saved_percent,
            Self::Unchanged { .. } => 0,
        }
    }

    /// Human-readable savings line for a source file
    pub fn report(&self, path: &Path) -> String {
        match self {
            Self::Improved {
                saved_bytes,
                saved_percent,
            } => format!(
                "minify-img minified [[ {} ]] and saved [[ {}% ({} bytes) ]].",
                path.display(),
                saved_percent,
                saved_bytes
            ),
            Self::Unchanged { .. } => format!(
                "minify-img did not change [[ {} ]] as it is already minified, no meaningful change.",
                path.display()
            ),
        }
    }
}

/// Decides whether a size reduction is worth reporting
pub struct SavingsEvaluator;

impl SavingsEvaluator {
    pub fn evaluate(original_size: u64, compressed_size: u64) -> Savings {
        let saved = original_size as i64 - compressed_size as i64;

        if saved < NOISE_FLOOR_BYTES {
            return Savings::Unchanged { saved_bytes: saved };
        }

        // saved >= NOISE_FLOOR_BYTES implica original_size > 0
        let saved_percent = (saved as f64 * 100.0 / original_size as f64).round() as u64;
        Savings::Improved {
            saved_bytes: saved as u64,
            saved_percent,
        }
    }
}
