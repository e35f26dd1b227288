//! Convenience helpers for loading scene and template channels via the
//! `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{Grid, Hsv};
use crate::util::{HashMatchError, HashMatchResult};
use std::path::Path;

/// Color channels decoded from one RGB file.
pub struct ColorChannels {
    /// HSV with hue in [0, 180).
    pub hsv: Grid<Hsv>,
    /// Grayscale in [0, 1].
    pub gray: Grid<f32>,
}

/// Converts an RGB pixel to 8-bit HSV with hue halved into [0, 180).
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round() as u8,
        max as u8,
    ]
}

/// Rec. 601 luma of an RGB pixel, normalized to [0, 1].
pub fn rgb_to_gray(rgb: [u8; 3]) -> f32 {
    let [r, g, b] = rgb.map(f32::from);
    (0.299 * r + 0.587 * g + 0.114 * b) / 255.0
}

/// Loads an RGB image and derives the HSV and grayscale channels.
pub fn load_color<P: AsRef<Path>>(path: P) -> HashMatchResult<ColorChannels> {
    let img = image::open(path)
        .map_err(|err| HashMatchError::ImageIo {
            reason: err.to_string(),
        })?
        .to_rgb8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let pixel = |x: usize, y: usize| img.get_pixel(x as u32, y as u32).0;
    let hsv = Grid::from_fn(width, height, |x, y| rgb_to_hsv(pixel(x, y)))?;
    let gray = Grid::from_fn(width, height, |x, y| rgb_to_gray(pixel(x, y)))?;
    Ok(ColorChannels { hsv, gray })
}

/// Loads a single-channel 16-bit depth image as raw sensor units.
pub fn load_depth<P: AsRef<Path>>(path: P) -> HashMatchResult<Grid<f32>> {
    let img = image::open(path)
        .map_err(|err| HashMatchError::ImageIo {
            reason: err.to_string(),
        })?
        .to_luma16();
    let width = img.width() as usize;
    let height = img.height() as usize;
    Grid::from_fn(width, height, |x, y| {
        f32::from(img.get_pixel(x as u32, y as u32).0[0])
    })
}
