// THEORY:
// The `classifier` turns the two scalar fog signals into a decision. It is the only
// place in the system where thresholds are interpreted, so the server's response and
// anything a client displays always agree.
//
// Key architectural principles:
// 1.  **Both Signals Required**: Fog is reported only when the frame is BOTH soft
//     (Laplacian variance below its threshold) AND flat (histogram spread below its
//     threshold). A value exactly at its threshold does not count as foggy.
// 2.  **Shortfall Tiering**: Severity comes from how far below threshold the *least*
//     foggy signal sits: `shortfall = 1 − max(lv / lt, sd / st)`. Under the AND rule
//     this is positive exactly when fog is detected. Below 0.5 the fog is `Light`;
//     at or above 0.5 it is `Heavy`.
// 3.  **Monotone**: Lowering either threshold raises its ratio, which can only lower
//     the shortfall. Lowering a threshold therefore never turns "clear" into "fog".
// 4.  **Stateless**: `classify` is a pure function of `(metrics, thresholds)`.

use crate::error::DetectError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LAPLACIAN_THRESHOLD: f64 = 250.0;
pub const DEFAULT_STD_DEV_THRESHOLD: f64 = 40.0;
pub const HEAVY_SHORTFALL: f64 = 0.5;

/// The two thresholds a caller analyzes against. Both are positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub laplacian_threshold: f64,
    pub std_dev_threshold: f64,
}

impl ThresholdConfig {
    pub fn new(laplacian_threshold: f64, std_dev_threshold: f64) -> Result<Self, DetectError> {
        validate("laplacian_threshold", laplacian_threshold)?;
        validate("std_dev_threshold", std_dev_threshold)?;
        Ok(Self {
            laplacian_threshold,
            std_dev_threshold,
        })
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            laplacian_threshold: DEFAULT_LAPLACIAN_THRESHOLD,
            std_dev_threshold: DEFAULT_STD_DEV_THRESHOLD,
        }
    }
}

fn validate(name: &'static str, value: f64) -> Result<(), DetectError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DetectError::InvalidThreshold { name, value })
    }
}

/// The two scalar signals measured from one grayscale image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetrics {
    /// Variance of the Laplacian response; low means soft edges.
    pub laplacian_variance: f64,
    /// Spread of the brightness distribution; low means compressed dynamic range.
    pub histogram_std_dev: f64,
}

/// Three-level fog severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Clear,
    Light,
    Heavy,
}

impl Intensity {
    /// Driving advice shown next to the classification.
    pub fn advice(self) -> &'static str {
        match self {
            Intensity::Clear => "Conditions clear. Drive safely.",
            Intensity::Light => "Light fog. Reduce speed and turn on low-beam headlights.",
            Intensity::Heavy => {
                "Heavy fog. Slow down significantly, use fog lights, increase following distance and pull over safely if visibility is critical."
            }
        }
    }

    /// Short status line.
    pub fn message(self) -> &'static str {
        match self {
            Intensity::Clear => "Clear",
            Intensity::Light => "Light Fog Detected",
            Intensity::Heavy => "Heavy Fog Detected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Intensity::Clear => "Clear",
            Intensity::Light => "Light",
            Intensity::Heavy => "Heavy",
        }
    }
}

/// Outcome of applying the policy to one set of metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub fog_detected: bool,
    pub intensity: Intensity,
    /// `1 − max(lv/lt, sd/st)`; positive exactly when fog is detected.
    pub shortfall: f64,
}

pub fn classify(metrics: &DetectionMetrics, thresholds: &ThresholdConfig) -> Classification {
    let lap_ratio = metrics.laplacian_variance / thresholds.laplacian_threshold;
    let std_ratio = metrics.histogram_std_dev / thresholds.std_dev_threshold;
    let shortfall = 1.0 - lap_ratio.max(std_ratio);

    let fog_detected = metrics.laplacian_variance < thresholds.laplacian_threshold
        && metrics.histogram_std_dev < thresholds.std_dev_threshold;

    let intensity = if !fog_detected {
        Intensity::Clear
    } else if shortfall >= HEAVY_SHORTFALL {
        Intensity::Heavy
    } else {
        Intensity::Light
    };

    Classification {
        fog_detected,
        intensity,
        shortfall,
    }
}
