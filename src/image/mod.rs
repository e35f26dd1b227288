//! Dense 2D grids and borrowed views.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. ROI slices are
//! zero-copy views into the same backing slice and retain the original
//! stride. `Grid` is the owned, contiguous counterpart used for every scene
//! and template channel (depth, grayscale, HSV, masks).

use crate::geometry::Rect;
use crate::util::{HashMatchError, HashMatchResult};

pub mod filters;
pub mod integral;
#[cfg(feature = "image-io")]
pub mod io;

pub use integral::IntegralImage;

/// HSV pixel with OpenCV conventions: hue in [0, 180), saturation and value
/// in [0, 255].
pub type Hsv = [u8; 3];

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> HashMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> HashMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(HashMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// Returns the element at signed coordinates, `None` outside the view.
    pub fn get_signed(&self, x: i64, y: i64) -> Option<&'a T> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Returns a zero-copy view of `rect`.
    pub fn roi(&self, rect: Rect) -> HashMatchResult<ImageView<'a, T>> {
        let oob = || HashMatchError::RoiOutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            img_width: self.width,
            img_height: self.height,
        };
        if rect.width == 0 || rect.height == 0 {
            return Err(HashMatchError::InvalidDimensions {
                width: rect.width,
                height: rect.height,
            });
        }
        let end_x = rect.x.checked_add(rect.width).ok_or_else(oob)?;
        let end_y = rect.y.checked_add(rect.height).ok_or_else(oob)?;
        if end_x > self.width || end_y > self.height {
            return Err(oob());
        }
        let start = rect.y * self.stride + rect.x;
        let data = self.data.get(start..).ok_or_else(oob)?;
        ImageView::new(data, rect.width, rect.height, self.stride)
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Copies the view into an owned contiguous grid.
    pub fn to_grid(&self) -> Grid<T> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            let start = y * self.stride;
            data.extend_from_slice(&self.data[start..start + self.width]);
        }
        Grid {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Owned row-major grid with `stride == width`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy> Grid<T> {
    /// Wraps a row-major buffer of exactly `width * height` elements.
    pub fn new(data: Vec<T>, width: usize, height: usize) -> HashMatchResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(HashMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(HashMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a grid filled with `value`.
    pub fn filled(width: usize, height: usize, value: T) -> HashMatchResult<Self> {
        let needed = required_len(width, height, width)?;
        Ok(Self {
            data: vec![value; needed],
            width,
            height,
        })
    }

    /// Builds a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> HashMatchResult<Self> {
        let needed = required_len(width, height, width)?;
        let mut data = Vec::with_capacity(needed);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the grid width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the row-major backing buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns the value at `(x, y)` if it is within bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Returns the value at signed coordinates, `None` outside the grid.
    #[inline]
    pub fn get_signed(&self, x: i64, y: i64) -> Option<T> {
        if x < 0 || y < 0 {
            return None;
        }
        self.get(x as usize, y as usize)
    }

    /// Returns the value at `(x, y)`; callers guarantee bounds.
    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    /// Returns a borrowed view of the whole grid.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Applies `f` to every element.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Grid<U> {
        Grid {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Returns true when `other` has the same geometry.
    pub fn same_size<U: Copy>(&self, other: &Grid<U>) -> bool {
        self.size() == other.size()
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> HashMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(HashMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(HashMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(HashMatchError::InvalidDimensions { width, height })
}
