// THEORY:
// Frame rasterization and JPEG transport encoding. The encoder is a pure function of
// the frame: resize to the configured raster, encode at a fixed quality, return the
// bytes. Anything it cannot rasterize (zero dimensions or a short buffer) yields `None`
// so the capture cycle becomes a no-op instead of an error.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::{debug, warn};

use crate::frame::{EncodedFrame, Frame, RGB_CHANNELS};

pub const DEFAULT_RASTER_WIDTH: u32 = 640;
pub const DEFAULT_RASTER_HEIGHT: u32 = 480;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_RASTER_WIDTH,
            height: DEFAULT_RASTER_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameEncoder {
    config: EncoderConfig,
}

impl FrameEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        let jpeg_quality = config.jpeg_quality.clamp(1, 100);
        Self {
            config: EncoderConfig {
                jpeg_quality,
                ..config
            },
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Resize `frame` to the fixed raster. `None` when the frame cannot be rasterized.
    pub fn rasterize(&self, frame: &Frame) -> Option<RgbImage> {
        if frame.is_empty() || self.config.width == 0 || self.config.height == 0 {
            debug!(
                width = frame.width,
                height = frame.height,
                "skipping frame with zero dimensions"
            );
            return None;
        }
        let expected = frame.width as usize * frame.height as usize * RGB_CHANNELS;
        if frame.data.len() != expected {
            warn!(
                expected,
                actual = frame.data.len(),
                "frame buffer does not match its dimensions"
            );
            return None;
        }

        let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())?;
        if image.dimensions() == (self.config.width, self.config.height) {
            return Some(image);
        }
        Some(imageops::resize(
            &image,
            self.config.width,
            self.config.height,
            FilterType::Triangle,
        ))
    }

    /// Rasterize and JPEG-encode `frame`.
    pub fn encode(&self, frame: &Frame) -> Option<EncodedFrame> {
        let raster = self.rasterize(frame)?;
        let mut bytes = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, self.config.jpeg_quality);
            if let Err(err) = encoder.encode_image(&raster) {
                warn!("jpeg encoding failed: {err}");
                return None;
            }
        }
        Some(EncodedFrame {
            bytes,
            width: raster.width(),
            height: raster.height(),
            content_type: "image/jpeg",
            captured_at: frame.captured_at,
        })
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}
