//! Small fixed-size filters used by feature extraction and objectness.
//!
//! All kernels are 3x3. Box blur and the integer Sobel replicate the border;
//! the float Sobel leaves a zero one-pixel frame.

use crate::image::Grid;

/// 3x3 box blur with replicated border and rounding to nearest.
pub fn box_blur3(src: &Grid<u8>) -> Grid<u8> {
    let (width, height) = src.size();
    let mut out = src.clone();
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let sx = clamp_index(x as i64 + dx, width);
                    let sy = clamp_index(y as i64 + dy, height);
                    sum += u32::from(src.at(sx, sy));
                }
            }
            out.set(x, y, ((sum + 4) / 9) as u8);
        }
    }
    out
}

/// Integer Sobel derivatives `(gx, gy)` of an 8-bit image, replicated border.
pub fn sobel3_i32(src: &Grid<u8>) -> (Grid<i32>, Grid<i32>) {
    let (width, height) = src.size();
    let sample = |x: i64, y: i64| -> i32 {
        i32::from(src.at(clamp_index(x, width), clamp_index(y, height)))
    };
    let mut gx = src.map(|_| 0i32);
    let mut gy = gx.clone();
    for y in 0..height {
        for x in 0..width {
            let (xi, yi) = (x as i64, y as i64);
            let dx = sample(xi + 1, yi - 1) + 2 * sample(xi + 1, yi) + sample(xi + 1, yi + 1)
                - sample(xi - 1, yi - 1)
                - 2 * sample(xi - 1, yi)
                - sample(xi - 1, yi + 1);
            let dy = sample(xi - 1, yi + 1) + 2 * sample(xi, yi + 1) + sample(xi + 1, yi + 1)
                - sample(xi - 1, yi - 1)
                - 2 * sample(xi, yi - 1)
                - sample(xi + 1, yi - 1);
            gx.set(x, y, dx);
            gy.set(x, y, dy);
        }
    }
    (gx, gy)
}

/// L2 Sobel magnitude of a float image; the outer one-pixel frame is zero.
pub fn sobel_magnitude(src: &Grid<f32>) -> Grid<f32> {
    let (width, height) = src.size();
    let mut out = src.map(|_| 0.0f32);
    if width < 3 || height < 3 {
        return out;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let p = |dx: usize, dy: usize| src.at(x + dx - 1, y + dy - 1);
            let gx = p(2, 0) + 2.0 * p(2, 1) + p(2, 2) - p(0, 0) - 2.0 * p(0, 1) - p(0, 2);
            let gy = p(0, 2) + 2.0 * p(1, 2) + p(2, 2) - p(0, 0) - 2.0 * p(1, 0) - p(2, 0);
            out.set(x, y, (gx * gx + gy * gy).sqrt());
        }
    }
    out
}

/// Central difference `(dx, dy)` at an interior pixel, `None` on the border.
#[inline]
pub fn central_difference(src: &Grid<f32>, x: usize, y: usize) -> Option<(f32, f32)> {
    if x == 0 || y == 0 || x + 1 >= src.width() || y + 1 >= src.height() {
        return None;
    }
    let dx = (src.at(x + 1, y) - src.at(x - 1, y)) / 2.0;
    let dy = (src.at(x, y + 1) - src.at(x, y - 1)) / 2.0;
    Some((dx, dy))
}

#[inline]
fn clamp_index(v: i64, len: usize) -> usize {
    v.clamp(0, len as i64 - 1) as usize
}
