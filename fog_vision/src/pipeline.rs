// THEORY:
// The `pipeline` module is the top-level API of the analysis engine. It wraps the full
// stack (decode, grayscale, Laplacian, histogram, classification) in one stateless
// call, `detect`, which is what the HTTP service exposes and what an in-process
// detector runs directly.
//
// Nothing here remembers anything between calls. Two calls with the same bytes and
// thresholds produce bit-identical metrics and classification; only the timestamp of
// the returned `DetectionResult` differs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_modules::classifier::{Intensity, classify};
use crate::core_modules::gray_image::gray_image::GrayscaleImage;
use crate::core_modules::histogram::histogram::Histogram;
use crate::core_modules::laplacian::laplacian_variance;
use crate::error::DetectError;

// Re-export key data structures for the public API.
pub use crate::core_modules::classifier::{
    Classification, DetectionMetrics, ThresholdConfig, DEFAULT_LAPLACIAN_THRESHOLD,
    DEFAULT_STD_DEV_THRESHOLD,
};

/// The full result of analyzing one frame. This is also the service's JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub fog_detected: bool,
    pub laplacian_variance: f64,
    pub histogram_std_dev: f64,
    pub intensity: Intensity,
    pub advice: String,
    #[serde(default)]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// 256 brightness counts of the analyzed grayscale image.
    pub histogram: Vec<u64>,
    pub laplacian_threshold_used: f64,
    pub std_dev_threshold_used: f64,
}

impl DetectionResult {
    pub fn metrics(&self) -> DetectionMetrics {
        DetectionMetrics {
            laplacian_variance: self.laplacian_variance,
            histogram_std_dev: self.histogram_std_dev,
        }
    }

    pub fn thresholds_used(&self) -> ThresholdConfig {
        ThresholdConfig {
            laplacian_threshold: self.laplacian_threshold_used,
            std_dev_threshold: self.std_dev_threshold_used,
        }
    }
}

/// Both fog signals for one grayscale image, plus the histogram they came from.
pub fn measure(image: &GrayscaleImage) -> (DetectionMetrics, Histogram) {
    let histogram = Histogram::from_image(image);
    let metrics = DetectionMetrics {
        laplacian_variance: laplacian_variance(image),
        histogram_std_dev: histogram.std_dev(),
    };
    (metrics, histogram)
}

/// Decode an encoded image (JPEG, PNG, ...) into grayscale.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayscaleImage, DetectError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectError::EmptyImage);
    }
    GrayscaleImage::from_rgb8(width, height, rgb.as_raw())
        .ok_or_else(|| DetectError::Decode("decoded buffer does not match its dimensions".into()))
}

/// Analyze a grayscale image that is already in memory.
pub fn analyze(image: &GrayscaleImage, thresholds: &ThresholdConfig) -> DetectionResult {
    let (metrics, histogram) = measure(image);
    let Classification {
        fog_detected,
        intensity,
        shortfall,
    } = classify(&metrics, thresholds);

    debug!(
        laplacian_variance = metrics.laplacian_variance,
        histogram_std_dev = metrics.histogram_std_dev,
        laplacian_threshold = thresholds.laplacian_threshold,
        std_dev_threshold = thresholds.std_dev_threshold,
        shortfall,
        intensity = intensity.label(),
        "frame classified"
    );

    DetectionResult {
        fog_detected,
        laplacian_variance: metrics.laplacian_variance,
        histogram_std_dev: metrics.histogram_std_dev,
        intensity,
        advice: intensity.advice().to_string(),
        message: Some(intensity.message().to_string()),
        timestamp: Utc::now(),
        histogram: histogram.to_vec(),
        laplacian_threshold_used: thresholds.laplacian_threshold,
        std_dev_threshold_used: thresholds.std_dev_threshold,
    }
}

/// The detection service: encoded bytes + thresholds → metrics, classification and advice.
pub fn detect(bytes: &[u8], thresholds: &ThresholdConfig) -> Result<DetectionResult, DetectError> {
    let gray = decode_grayscale(bytes)?;
    Ok(analyze(&gray, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(img: &RgbImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .expect("png encoding");
        out.into_inner()
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = detect(b"definitely not an image", &ThresholdConfig::default())
            .expect_err("garbage must not decode");
        assert!(matches!(err, DetectError::Decode(_)));
    }

    #[test]
    fn result_echoes_thresholds() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([90, 90, 90]));
        let t = ThresholdConfig::new(123.0, 7.5).expect("valid thresholds");
        let result = detect(&png(&img), &t).expect("png decodes");
        assert_eq!(result.thresholds_used(), t);
        assert_eq!(result.histogram.len(), 256);
        assert_eq!(result.histogram[90], 256);
    }

    #[test]
    fn serializes_with_the_wire_field_names() {
        let img = RgbImage::from_pixel(8, 8, image::Rgb([10, 10, 10]));
        let result = detect(&png(&img), &ThresholdConfig::default()).expect("png decodes");
        let json = serde_json::to_value(&result).expect("serializable");
        for key in [
            "fog_detected",
            "laplacian_variance",
            "histogram_std_dev",
            "intensity",
            "advice",
            "message",
            "timestamp",
            "histogram",
            "laplacian_threshold_used",
            "std_dev_threshold_used",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["intensity"], "Heavy");
        assert_eq!(json["histogram"].as_array().map(Vec::len), Some(256));
    }
}
