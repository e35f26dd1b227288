//! Scene channels and their per-pixel quantized descriptors.

use crate::features::{gradient_at, normal_bin_at, INVALID_BIN};
use crate::image::{Grid, Hsv};
use crate::util::{HashMatchError, HashMatchResult};

/// One RGB-D frame, fully materialized and aligned to one geometry.
#[derive(Clone, Debug)]
pub struct Scene {
    hsv: Grid<Hsv>,
    gray: Grid<f32>,
    depth: Grid<f32>,
    depth_norm: Grid<f32>,
    depth_scale: Option<f32>,
}

impl Scene {
    /// Bundles the scene channels.
    ///
    /// `depth` is in raw sensor units, `depth_norm` the same map scaled into
    /// [0, 1]. All grids must share one size and `depth_norm` must be finite
    /// and inside [0, 1]. The scale relating the two maps is unknown, so the
    /// caller keeps it consistent with `ObjectnessConfig::depth_scale`.
    pub fn new(
        hsv: Grid<Hsv>,
        gray: Grid<f32>,
        depth: Grid<f32>,
        depth_norm: Grid<f32>,
    ) -> HashMatchResult<Self> {
        let (width, height) = depth.size();
        for (context, size) in [
            ("scene hsv", hsv.size()),
            ("scene gray", gray.size()),
            ("scene normalized depth", depth_norm.size()),
        ] {
            if size != (width, height) {
                return Err(HashMatchError::SizeMismatch {
                    context,
                    expected_width: width,
                    expected_height: height,
                    width: size.0,
                    height: size.1,
                });
            }
        }
        if depth_norm
            .data()
            .iter()
            .any(|v| !v.is_finite() || !(0.0..=1.0).contains(v))
        {
            return Err(HashMatchError::DegenerateScene {
                reason: "normalized depth outside [0, 1]",
            });
        }
        Ok(Self {
            hsv,
            gray,
            depth,
            depth_norm,
            depth_scale: None,
        })
    }

    /// Derives the normalized depth as `depth * scale`, clamped to [0, 1],
    /// and records `scale` so a detector can check it against its own.
    pub fn from_raw_depth(
        hsv: Grid<Hsv>,
        gray: Grid<f32>,
        depth: Grid<f32>,
        scale: f32,
    ) -> HashMatchResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(HashMatchError::config("depth_scale", "must be finite and > 0"));
        }
        let depth_norm = depth.map(|d| {
            if d.is_finite() {
                (d * scale).clamp(0.0, 1.0)
            } else {
                0.0
            }
        });
        let mut scene = Self::new(hsv, gray, depth, depth_norm)?;
        scene.depth_scale = Some(scale);
        Ok(scene)
    }

    pub fn width(&self) -> usize {
        self.depth.width()
    }

    pub fn height(&self) -> usize {
        self.depth.height()
    }

    pub fn hsv(&self) -> &Grid<Hsv> {
        &self.hsv
    }

    pub fn gray(&self) -> &Grid<f32> {
        &self.gray
    }

    /// Raw depth in sensor units.
    pub fn depth(&self) -> &Grid<f32> {
        &self.depth
    }

    /// Depth scaled into [0, 1].
    pub fn depth_norm(&self) -> &Grid<f32> {
        &self.depth_norm
    }

    /// Scale used to derive `depth_norm`, `None` when it was supplied.
    pub fn depth_scale(&self) -> Option<f32> {
        self.depth_scale
    }
}

/// Quantized normal and gradient bins for every scene pixel.
///
/// Pixels without a usable measurement hold `INVALID_BIN`.
#[derive(Clone, Debug)]
pub struct SceneFeatures {
    normals: Grid<u8>,
    gradients: Grid<u8>,
}

impl SceneFeatures {
    /// Quantizes the whole scene once; gradients weaker than
    /// `min_gradient_magnitude` are left invalid.
    pub fn compute(scene: &Scene, min_gradient_magnitude: f32) -> Self {
        let mut normals = scene.depth.map(|_| INVALID_BIN);
        let mut gradients = normals.clone();
        for y in 0..scene.height() {
            for x in 0..scene.width() {
                if let Some(bin) = normal_bin_at(&scene.depth, x, y) {
                    normals.set(x, y, bin);
                }
                if let Some((bin, magnitude)) = gradient_at(&scene.gray, x, y) {
                    if magnitude >= min_gradient_magnitude {
                        gradients.set(x, y, bin);
                    }
                }
            }
        }
        Self { normals, gradients }
    }

    /// Normal bin at signed coordinates, `None` outside or invalid.
    #[inline]
    pub fn normal_bin(&self, x: i64, y: i64) -> Option<u8> {
        self.normals.get_signed(x, y).filter(|&b| b != INVALID_BIN)
    }

    /// Gradient bin at signed coordinates, `None` outside or too weak.
    #[inline]
    pub fn gradient_bin(&self, x: i64, y: i64) -> Option<u8> {
        self.gradients.get_signed(x, y).filter(|&b| b != INVALID_BIN)
    }

    pub fn normals(&self) -> &Grid<u8> {
        &self.normals
    }

    pub fn gradients(&self) -> &Grid<u8> {
        &self.gradients
    }
}
