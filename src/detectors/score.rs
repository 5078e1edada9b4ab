//! # Divergence Scoring
//!
//! Classifies a raw divergence strength into coarse buckets and derives a
//! bounded confidence figure from the raw price and indicator deltas. The two
//! measures are intentionally independent: strength is relative to the series
//! levels, confidence is a clamped magnitude heuristic.

#[cfg(feature = "wasm")]
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "wasm", serde(rename_all = "lowercase"))]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Weak => write!(f, "weak"),
            Strength::Moderate => write!(f, "moderate"),
            Strength::Strong => write!(f, "strong"),
        }
    }
}

/// Buckets a raw strength value: above 0.05 is strong, above 0.02 moderate,
/// everything else weak. Both comparisons are strict, so the boundary values
/// land in the lower bucket.
#[inline(always)]
pub fn classify_strength(strength: f64) -> Strength {
    if strength > 0.05 {
        Strength::Strong
    } else if strength > 0.02 {
        Strength::Moderate
    } else {
        Strength::Weak
    }
}

/// Mean of the two deltas scaled by 100 and clamped to `[0, 100]`.
/// Sign-symmetric in both arguments; finite inputs always land in `[0, 100]`.
#[inline(always)]
pub fn confidence(price_change: f64, indicator_change: f64) -> f64 {
    let price_score = (price_change.abs() * 100.0).clamp(0.0, 100.0);
    let indicator_score = (indicator_change.abs() * 100.0).clamp(0.0, 100.0);
    (price_score + indicator_score) / 2.0
}
