//! HSV normalization for the color test.

use crate::image::Hsv;
use crate::util::math::circular_bin_distance;
use crate::util::{HashMatchError, HashMatchResult};

/// Hue range in the half-degree convention.
pub const HUE_RANGE: u8 = 180;

/// Replacement hues for pixels whose own hue is unreliable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsvNormalization {
    /// Pixels with value below this are treated as dark.
    pub dark_value: u8,
    /// Non-dark pixels with saturation below this are treated as gray.
    pub gray_saturation: u8,
    /// Hue assigned to dark pixels (blue by default).
    pub dark_hue: u8,
    /// Hue assigned to gray pixels (yellow by default).
    pub gray_hue: u8,
}

impl Default for HsvNormalization {
    fn default() -> Self {
        Self {
            dark_value: 30,
            gray_saturation: 30,
            dark_hue: 120,
            gray_hue: 30,
        }
    }
}

impl HsvNormalization {
    /// Checks that the replacement hues lie on the hue circle.
    pub fn validate(&self) -> HashMatchResult<()> {
        if self.dark_hue >= HUE_RANGE {
            return Err(HashMatchError::config("dark_hue", "must be < 180"));
        }
        if self.gray_hue >= HUE_RANGE {
            return Err(HashMatchError::config("gray_hue", "must be < 180"));
        }
        Ok(())
    }
}

/// Replaces unreliable hues so black and white-ish surfaces still compare.
///
/// Saturation and value are left unchanged.
pub fn normalize_hsv(hsv: Hsv, norm: &HsvNormalization) -> Hsv {
    let [h, s, v] = hsv;
    if v < norm.dark_value {
        [norm.dark_hue, s, v]
    } else if s < norm.gray_saturation {
        [norm.gray_hue, s, v]
    } else {
        [h % HUE_RANGE, s, v]
    }
}

/// Per-channel comparison of two normalized colors, hue on the circle.
pub fn colors_agree(a: Hsv, b: Hsv, tolerance: [u8; 3]) -> bool {
    circular_bin_distance(a[0], b[0], HUE_RANGE) <= tolerance[0]
        && a[1].abs_diff(b[1]) <= tolerance[1]
        && a[2].abs_diff(b[2]) <= tolerance[2]
}

#[cfg(test)]
mod tests {
    use super::{colors_agree, normalize_hsv, HsvNormalization};

    #[test]
    fn dark_and_gray_pixels_get_fixed_hues() {
        let norm = HsvNormalization::default();
        assert_eq!(normalize_hsv([77, 200, 10], &norm)[0], 120);
        assert_eq!(normalize_hsv([77, 10, 200], &norm)[0], 30);
        assert_eq!(normalize_hsv([77, 200, 200], &norm), [77, 200, 200]);
    }

    #[test]
    fn thresholds_and_hues_follow_config() {
        let norm = HsvNormalization {
            dark_value: 100,
            gray_saturation: 5,
            dark_hue: 0,
            gray_hue: 90,
        };
        assert_eq!(normalize_hsv([77, 200, 60], &norm), [0, 200, 60]);
        assert_eq!(normalize_hsv([77, 10, 200], &norm), [77, 10, 200]);
        assert_eq!(normalize_hsv([77, 4, 200], &norm), [90, 4, 200]);
    }

    #[test]
    fn hues_off_the_circle_are_rejected() {
        let norm = HsvNormalization {
            gray_hue: 180,
            ..HsvNormalization::default()
        };
        assert!(norm.validate().is_err());
        assert!(HsvNormalization::default().validate().is_ok());
    }

    #[test]
    fn hue_wraps_around() {
        assert!(colors_agree([178, 100, 100], [2, 100, 100], [5, 0, 0]));
        assert!(!colors_agree([170, 100, 100], [2, 100, 100], [5, 40, 40]));
        assert!(!colors_agree([10, 100, 100], [10, 150, 100], [5, 40, 40]));
    }
}
