// THEORY:
// The `Histogram` module summarizes a `GrayscaleImage` as 256 brightness counts. It is the
// second of the two fog signals: fog compresses the dynamic range of a scene, so the
// intensities bunch up around one grey level and their spread collapses.
//
// Key architectural principles:
// 1.  **Distribution, not bins**: The spread we report is the standard deviation of the
//     intensity distribution the histogram describes (how far pixels sit from the mean
//     brightness), not the spread of the 256 bin counts. A perfectly uniform frame
//     therefore reads exactly 0.
// 2.  **Exact Arithmetic**: Moments are accumulated as integers and only converted to
//     floating point at the very end. Identical inputs always give bit-identical
//     outputs, and a flat image cannot pick up rounding noise.
// 3.  **Data Container**: Like `GrayscaleImage`, `Histogram` is a "dumb" container that
//     knows how to summarize itself. It carries no thresholds and makes no decisions.

pub mod histogram {
    use crate::core_modules::gray_image::gray_image::GrayscaleImage;

    pub const BIN_COUNT: usize = 256;

    /// 256 brightness counts. The bins always sum to the source image's pixel count.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Histogram {
        bins: [u64; BIN_COUNT],
    }

    impl Histogram {
        pub fn from_image(image: &GrayscaleImage) -> Self {
            let mut bins = [0u64; BIN_COUNT];
            for &value in &image.data {
                bins[value as usize] += 1;
            }
            Self { bins }
        }

        pub fn bins(&self) -> &[u64; BIN_COUNT] {
            &self.bins
        }

        pub fn total(&self) -> u64 {
            self.bins.iter().sum()
        }

        pub fn to_vec(&self) -> Vec<u64> {
            self.bins.to_vec()
        }

        /// Population standard deviation of the described intensity distribution.
        pub fn std_dev(&self) -> f64 {
            let n = self.total() as u128;
            if n == 0 {
                return 0.0;
            }
            let mut sum: u128 = 0;
            let mut sum_sq: u128 = 0;
            for (level, &count) in self.bins.iter().enumerate() {
                let level = level as u128;
                let count = count as u128;
                sum += level * count;
                sum_sq += level * level * count;
            }
            // n² · variance, exact.
            let scaled = n * sum_sq - sum * sum;
            if scaled == 0 {
                return 0.0;
            }
            (scaled as f64 / (n as f64 * n as f64)).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::histogram::*;
    use crate::core_modules::gray_image::gray_image::GrayscaleImage;

    fn image(width: u32, height: u32, data: Vec<u8>) -> GrayscaleImage {
        GrayscaleImage::new(width, height, data).expect("valid dims")
    }

    #[test]
    fn bins_sum_to_pixel_count() {
        let data: Vec<u8> = (0..35u32).map(|i| (i * 37 % 256) as u8).collect();
        let hist = Histogram::from_image(&image(7, 5, data));
        assert_eq!(hist.total(), 35);
        assert_eq!(hist.bins().len(), BIN_COUNT);
    }

    #[test]
    fn uniform_image_has_zero_spread() {
        let hist = Histogram::from_image(&image(4, 4, vec![128; 16]));
        assert_eq!(hist.bins()[128], 16);
        assert_eq!(hist.std_dev(), 0.0);
    }

    #[test]
    fn two_level_image_spread_is_half_the_gap() {
        // Half black, half white: mean 127.5, every pixel 127.5 away.
        let mut data = vec![0u8; 8];
        data.extend(vec![255u8; 8]);
        let hist = Histogram::from_image(&image(4, 4, data));
        assert!((hist.std_dev() - 127.5).abs() < 1e-9);
    }
}
