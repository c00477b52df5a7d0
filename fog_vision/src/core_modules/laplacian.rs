// THEORY:
// The `laplacian` module measures how much fine edge detail survives in a frame. Fog
// scatters light and blurs every edge in the scene, so the second-derivative response
// of a foggy image is weak and nearly constant. Its variance is our sharpness proxy.
//
// Key architectural principles:
// 1.  **Fixed Kernel**: We use the 4-neighbour discrete Laplacian
//         [ 0  1  0 ]
//         [ 1 -4  1 ]
//         [ 0  1  0 ]
//     evaluated at every pixel, including the border.
// 2.  **Reflect-101 Borders**: Out-of-range neighbours are mirrored about the edge pixel
//     without repeating it (`-1 -> 1`, `w -> w-2`). Border pixels of a flat image
//     therefore respond with exactly 0, the same as interior pixels.
// 3.  **Exact Variance**: Responses are small integers. We accumulate their sum and sum
//     of squares in wide integers and compute `(n·Σx² − (Σx)²) / n²` once, so the
//     variance is deterministic and a flat image reads exactly 0.

use crate::core_modules::gray_image::gray_image::GrayscaleImage;

/// Mirror an out-of-range coordinate back into `0..len` without repeating the edge.
#[inline]
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    if i < 0 {
        i = -i;
    }
    if i > last {
        i = 2 * last - i;
    }
    i.clamp(0, last) as usize
}

/// Laplacian response at `(x, y)`.
#[inline]
fn response_at(image: &GrayscaleImage, x: usize, y: usize) -> i32 {
    let w = image.width as usize;
    let h = image.height as usize;
    let (xi, yi) = (x as isize, y as isize);

    let up = image.get(x, reflect_101(yi - 1, h)) as i32;
    let down = image.get(x, reflect_101(yi + 1, h)) as i32;
    let left = image.get(reflect_101(xi - 1, w), y) as i32;
    let right = image.get(reflect_101(xi + 1, w), y) as i32;
    let center = image.get(x, y) as i32;

    up + down + left + right - 4 * center
}

/// The full Laplacian response map, row-major, same dimensions as the input.
#[cfg(test)]
fn laplacian_response(image: &GrayscaleImage) -> Vec<i32> {
    let w = image.width as usize;
    let h = image.height as usize;
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            out.push(response_at(image, x, y));
        }
    }
    out
}

/// Population variance of the Laplacian response. Returns 0 for an empty image.
pub fn laplacian_variance(image: &GrayscaleImage) -> f64 {
    let w = image.width as usize;
    let h = image.height as usize;
    let n = (w * h) as i128;
    if n == 0 {
        return 0.0;
    }

    let mut sum: i128 = 0;
    let mut sum_sq: i128 = 0;
    for y in 0..h {
        for x in 0..w {
            let r = response_at(image, x, y) as i128;
            sum += r;
            sum_sq += r * r;
        }
    }

    let scaled = n * sum_sq - sum * sum;
    if scaled <= 0 {
        return 0.0;
    }
    scaled as f64 / (n as f64 * n as f64)
}
