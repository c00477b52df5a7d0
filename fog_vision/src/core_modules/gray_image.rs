// THEORY (Grayscale Intensity):
// The `GrayscaleImage` is the single input every fog metric is computed from. It is a
// "dumb" data container: one intensity byte per pixel, row-major, no stride padding.
// Nothing here knows about edges, histograms or thresholds; those live in the
// `laplacian` and `histogram` modules, which only ever read from this buffer.
//
// Conversion uses the Rec. 601 luma weights (0.299 R + 0.587 G + 0.114 B). The
// weights are applied in fixed-point (per-mille) with round-half-up, so equal R, G and B
// channels map back to exactly the same intensity. That exactness matters: a uniform
// frame must produce a perfectly flat grayscale buffer for the metrics to read zero.
//
// Key principles:
// 1) Fresh per frame: a `GrayscaleImage` is derived, used, and dropped within one
//    analysis call. It is never cached or persisted.
// 2) Decoding is not this module's job: callers hand over packed RGB8 bytes that
//    were already produced by the `image` crate.

pub mod gray_image {
    pub type Intensity = u8;

    const RGB_CHANNELS: usize = 3;
    const LUMA_RED: u32 = 299;
    const LUMA_GREEN: u32 = 587;
    const LUMA_BLUE: u32 = 114;
    const LUMA_SCALE: u32 = 1000;

    /// A single-channel intensity buffer derived from one decoded frame.
    #[derive(Debug, Clone, PartialEq)]
    pub struct GrayscaleImage {
        /// Width in pixels.
        pub width: u32,
        /// Height in pixels.
        pub height: u32,
        /// Row-major intensities, exactly `width * height` entries.
        pub data: Vec<Intensity>,
    }

    impl GrayscaleImage {
        /// Wraps an existing intensity buffer. Returns `None` when the length does not
        /// match the stated dimensions.
        pub fn new(width: u32, height: u32, data: Vec<Intensity>) -> Option<Self> {
            if data.len() != width as usize * height as usize {
                return None;
            }
            Some(Self {
                width,
                height,
                data,
            })
        }

        /// Converts a packed RGB8 buffer using Rec. 601 luma weights.
        pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> Option<Self> {
            let pixel_count = width as usize * height as usize;
            if rgb.len() != pixel_count * RGB_CHANNELS {
                return None;
            }
            let data = rgb
                .chunks_exact(RGB_CHANNELS)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect();
            Some(Self {
                width,
                height,
                data,
            })
        }

        pub fn pixel_count(&self) -> usize {
            self.data.len()
        }

        #[inline]
        pub fn get(&self, x: usize, y: usize) -> Intensity {
            self.data[y * self.width as usize + x]
        }
    }

    /// Rec. 601 luma in fixed point, rounded half up.
    #[inline]
    pub fn luma(red: u8, green: u8, blue: u8) -> Intensity {
        let weighted =
            LUMA_RED * red as u32 + LUMA_GREEN * green as u32 + LUMA_BLUE * blue as u32;
        ((weighted + LUMA_SCALE / 2) / LUMA_SCALE) as Intensity
    }
}
