//! Integer pixel geometry shared by templates, windows and matches.

/// Pixel coordinate (column `x`, row `y`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with top-left corner `(x, y)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    pub fn tl(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive bottom-right corner.
    pub fn br(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// Overlapping region of two rectangles, `None` when they are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Intersection over union in [0, 1]; zero-area inputs give 0.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection(other).map_or(0, |r| r.area());
        let union = self.area() + other.area() - inter;
        if union == 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }
}

#[cfg(test)]
mod tests {
    use super::{Point, Rect};

    #[test]
    fn iou_of_shifted_squares() {
        let a = Rect::new(20, 10, 20, 20);
        let b = Rect::new(25, 10, 20, 20);
        assert!((a.iou(&b) - 300.0 / 500.0).abs() < 1e-6);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&Rect::new(40, 10, 20, 20)), 0.0);
    }

    #[test]
    fn contains_excludes_far_edge() {
        let r = Rect::new(2, 3, 4, 5);
        assert!(r.contains(Point::new(2, 3)));
        assert!(r.contains(Point::new(5, 7)));
        assert!(!r.contains(Point::new(6, 7)));
        assert_eq!(r.br(), Point::new(6, 8));
    }
}
