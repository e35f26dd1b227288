//! Summed-area table for O(1) rectangle sums over binary masks.

use crate::geometry::Rect;
use crate::image::Grid;

/// Prefix sums with one row and column of zero padding.
///
/// Entry `(x, y)` holds the sum of all mask values strictly above and left of
/// pixel `(x, y)`, so the table is `(width + 1) x (height + 1)`.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    sums: Vec<u32>,
    width: usize,
    height: usize,
}

impl IntegralImage {
    /// Builds the table from a mask; values are summed as-is.
    pub fn from_mask(mask: &Grid<u8>) -> Self {
        let (width, height) = mask.size();
        let cols = width + 1;
        let mut sums = vec![0u32; cols * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0u32;
            for x in 0..width {
                row_sum += u32::from(mask.at(x, y));
                sums[(y + 1) * cols + x + 1] = sums[y * cols + x + 1] + row_sum;
            }
        }
        Self {
            sums,
            width,
            height,
        }
    }

    /// Width of the source mask.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the source mask.
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> u32 {
        self.sums[y * (self.width + 1) + x]
    }

    /// Sum over `rect` by inclusion-exclusion, `None` if it does not fit.
    pub fn sum(&self, rect: Rect) -> Option<u32> {
        let x1 = rect.x.checked_add(rect.width)?;
        let y1 = rect.y.checked_add(rect.height)?;
        if x1 > self.width || y1 > self.height {
            return None;
        }
        Some(self.at(x1, y1) + self.at(rect.x, rect.y) - self.at(x1, rect.y) - self.at(rect.x, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::IntegralImage;
    use crate::geometry::Rect;
    use crate::image::Grid;

    #[test]
    fn sum_matches_manual_count() {
        let mask = Grid::new(vec![1u8, 0, 1, 1, 1, 0, 0, 1, 1], 3, 3).unwrap();
        let integral = IntegralImage::from_mask(&mask);
        assert_eq!(integral.sum(Rect::new(0, 0, 3, 3)), Some(6));
        assert_eq!(integral.sum(Rect::new(1, 1, 2, 2)), Some(3));
        assert_eq!(integral.sum(Rect::new(2, 0, 1, 3)), Some(2));
        assert_eq!(integral.sum(Rect::new(2, 2, 2, 1)), None);
    }
}
