use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A flat RGB image where every channel of every pixel is `value`.
pub fn uniform_rgb(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
}

/// Generates a simple high-contrast checkerboard image.
pub fn checkerboard_rgb(width: u32, height: u32, cell: u32) -> RgbImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    RgbImage::from_fn(width, height, |x, y| {
        let v = if ((x / cell) + (y / cell)) % 2 == 0 {
            32u8
        } else {
            220u8
        };
        image::Rgb([v, v, v])
    })
}

/// Uniform random noise on every channel, seeded for reproducibility.
pub fn noise_rgb(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |_, _| {
        image::Rgb([rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>()])
    })
}

/// Lossless PNG bytes, so decoded pixels match the generated ones exactly.
pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("png encoding");
    out.into_inner()
}
