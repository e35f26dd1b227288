//! Verifier cascade and final non-maximum suppression.
//!
//! Every candidate left on a window by the hash index runs through the
//! configured tests in order. The first failing test removes the candidate;
//! survivors are promoted to `Match`es and reduced by IoU suppression.

pub mod checks;
pub mod color;

pub use checks::Check;
pub use color::{colors_agree, normalize_hsv, HsvNormalization};

use crate::candidate::nms::nms_matches;
use crate::candidate::{Match, TestScores, Window};
use crate::geometry::Rect;
use crate::scene::{Scene, SceneFeatures};
use crate::template::{Template, TemplateLibrary};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{HashMatchError, HashMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One test of the cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TestKind {
    ObjectSize,
    SurfaceNormal,
    Gradient,
    Depth,
    Color,
}

impl TestKind {
    /// Increasing cost order.
    pub const DEFAULT_ORDER: [TestKind; 5] = [
        TestKind::ObjectSize,
        TestKind::SurfaceNormal,
        TestKind::Gradient,
        TestKind::Depth,
        TestKind::Color,
    ];
}

/// Largest accepted `neighbourhood_radius`.
pub const MAX_NEIGHBOURHOOD_RADIUS: usize = 16;

/// Configuration for the verifier.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    /// Minimum fraction of agreeing points for a test to pass.
    pub t_match: f32,
    /// Matches with a larger IoU than this suppress each other.
    pub overlap_threshold: f32,
    /// Chebyshev radius of the neighbourhood searched around each point,
    /// at most `MAX_NEIGHBOURHOOD_RADIUS`.
    pub neighbourhood_radius: usize,
    /// Allowed relative deviation of the depth-implied scale from 1.
    pub object_size_tolerance: f32,
    /// Allowed circular distance between normal bins.
    pub normal_bin_tolerance: u8,
    /// Allowed circular distance between orientation bins.
    pub gradient_bin_tolerance: u8,
    /// Allowed depth deviation from the median offset, as a fraction of the
    /// object diameter.
    pub depth_tolerance: f32,
    /// Hue, saturation and value tolerance of the color test.
    pub color_tolerance: [u8; 3],
    /// Hue replacement applied to both sides before the color test.
    pub color_normalization: HsvNormalization,
    /// Tests in evaluation order.
    pub cascade: Vec<TestKind>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            t_match: 0.6,
            overlap_threshold: 0.1,
            neighbourhood_radius: 2,
            object_size_tolerance: 0.3,
            normal_bin_tolerance: 1,
            gradient_bin_tolerance: 1,
            depth_tolerance: 0.05,
            color_tolerance: [5, 40, 40],
            color_normalization: HsvNormalization::default(),
            cascade: TestKind::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl VerifyConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> HashMatchResult<()> {
        if !(self.t_match > 0.0 && self.t_match <= 1.0) {
            return Err(HashMatchError::config("t_match", "must be in (0, 1]"));
        }
        if !(self.overlap_threshold > 0.0 && self.overlap_threshold <= 1.0) {
            return Err(HashMatchError::config("overlap_threshold", "must be in (0, 1]"));
        }
        if self.neighbourhood_radius > MAX_NEIGHBOURHOOD_RADIUS {
            return Err(HashMatchError::config("neighbourhood_radius", "must be <= 16"));
        }
        if !(self.object_size_tolerance.is_finite() && self.object_size_tolerance > 0.0) {
            return Err(HashMatchError::config(
                "object_size_tolerance",
                "must be finite and > 0",
            ));
        }
        if !(self.depth_tolerance.is_finite() && self.depth_tolerance > 0.0) {
            return Err(HashMatchError::config("depth_tolerance", "must be finite and > 0"));
        }
        self.color_normalization.validate()?;
        if self.cascade.is_empty() {
            return Err(HashMatchError::config("cascade", "must name at least one test"));
        }
        for (i, kind) in self.cascade.iter().enumerate() {
            if self.cascade[..i].contains(kind) {
                return Err(HashMatchError::config("cascade", "tests must be distinct"));
            }
        }
        Ok(())
    }
}

/// Runs the cascade over window candidates.
#[derive(Clone, Debug)]
pub struct Verifier {
    cfg: VerifyConfig,
}

impl Verifier {
    pub fn new(cfg: VerifyConfig) -> HashMatchResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.cfg
    }

    /// Runs one test.
    pub fn check(
        &self,
        kind: TestKind,
        scene: &Scene,
        features: &SceneFeatures,
        template: &Template,
        window: Rect,
    ) -> Check {
        let cfg = &self.cfg;
        match kind {
            TestKind::ObjectSize => checks::object_size(scene, template, window, cfg),
            TestKind::SurfaceNormal => checks::surface_normal(features, template, window, cfg),
            TestKind::Gradient => checks::gradient(features, template, window, cfg),
            TestKind::Depth => checks::depth(scene, template, window, cfg),
            TestKind::Color => checks::color(scene, template, window, cfg),
        }
    }

    /// Runs the cascade for one template placed at `window`.
    ///
    /// Returns `None` at the first failing test; later tests do not run.
    pub fn run_cascade(
        &self,
        scene: &Scene,
        features: &SceneFeatures,
        template: &Template,
        window: Rect,
    ) -> Option<TestScores> {
        let mut scores = TestScores::default();
        for &kind in &self.cfg.cascade {
            let check = self.check(kind, scene, features, template, window);
            if !check.passed {
                trace_debug!("candidate_rejected", template = template.id().0, score = check.score);
                return None;
            }
            let slot = match kind {
                TestKind::ObjectSize => &mut scores.object_size,
                TestKind::SurfaceNormal => &mut scores.surface_normal,
                TestKind::Gradient => &mut scores.gradient,
                TestKind::Depth => &mut scores.depth,
                TestKind::Color => &mut scores.color,
            };
            *slot = Some(check.score);
        }
        Some(scores)
    }

    /// Filters the candidates of one window and returns its matches in
    /// candidate order.
    pub fn verify_window(
        &self,
        library: &TemplateLibrary,
        scene: &Scene,
        features: &SceneFeatures,
        window: &mut Window,
    ) -> Vec<Match> {
        let mut matches = Vec::new();
        let rect = window.rect;
        let origin = Window::new(window.rect, window.edgels);
        window.retain_candidates(|candidate| {
            let Some(template) = library.get(candidate.template()) else {
                return false;
            };
            match self.run_cascade(scene, features, template, rect) {
                Some(scores) => {
                    matches.push(Match::promote(*candidate, template, &origin, scores));
                    true
                }
                None => false,
            }
        });
        matches
    }

    /// Filters every window in place and returns all matches before
    /// suppression, ordered by window then candidate.
    pub fn verify_windows(
        &self,
        library: &TemplateLibrary,
        scene: &Scene,
        features: &SceneFeatures,
        windows: &mut [Window],
        parallel: bool,
    ) -> Vec<Match> {
        let _span = trace_span!("verify", windows = windows.len()).entered();
        let run = |window: &mut Window| self.verify_window(library, scene, features, window);

        #[cfg(feature = "rayon")]
        let per_window: Vec<Vec<Match>> = if parallel {
            windows.par_iter_mut().map(run).collect()
        } else {
            windows.iter_mut().map(run).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let per_window: Vec<Vec<Match>> = {
            let _ = parallel;
            windows.iter_mut().map(run).collect()
        };

        let matches: Vec<Match> = per_window.into_iter().flatten().collect();
        trace_event!("verified", matches = matches.len());
        matches
    }

    /// Verifies every window and suppresses overlapping matches.
    pub fn match_windows(
        &self,
        library: &TemplateLibrary,
        scene: &Scene,
        features: &SceneFeatures,
        windows: &mut [Window],
        parallel: bool,
    ) -> Vec<Match> {
        let matches = self.verify_windows(library, scene, features, windows, parallel);
        self.suppress(&matches)
    }

    /// IoU suppression with the configured overlap threshold.
    pub fn suppress(&self, matches: &[Match]) -> Vec<Match> {
        let _span = trace_span!("nms", matches = matches.len()).entered();
        let kept = nms_matches(matches, self.cfg.overlap_threshold);
        trace_event!("nms_done", kept = kept.len());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::{TestKind, VerifyConfig, MAX_NEIGHBOURHOOD_RADIUS};
    use crate::util::HashMatchError;

    #[test]
    fn default_config_is_valid() {
        assert!(VerifyConfig::default().validate().is_ok());
    }

    #[test]
    fn duplicate_tests_are_rejected() {
        let cfg = VerifyConfig {
            cascade: vec![TestKind::Depth, TestKind::Color, TestKind::Depth],
            ..VerifyConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(HashMatchError::InvalidConfig {
                field: "cascade",
                reason: "tests must be distinct",
            })
        );
    }

    #[test]
    fn zero_overlap_threshold_is_rejected() {
        let cfg = VerifyConfig {
            overlap_threshold: 0.0,
            ..VerifyConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(HashMatchError::InvalidConfig {
                field: "overlap_threshold",
                reason: "must be in (0, 1]",
            })
        );
    }

    #[test]
    fn oversized_neighbourhood_is_rejected() {
        let at_cap = VerifyConfig {
            neighbourhood_radius: MAX_NEIGHBOURHOOD_RADIUS,
            ..VerifyConfig::default()
        };
        assert!(at_cap.validate().is_ok());

        let huge = VerifyConfig {
            neighbourhood_radius: usize::MAX,
            ..VerifyConfig::default()
        };
        assert_eq!(
            huge.validate(),
            Err(HashMatchError::InvalidConfig {
                field: "neighbourhood_radius",
                reason: "must be <= 16",
            })
        );
    }

    #[test]
    fn zero_t_match_is_rejected() {
        let cfg = VerifyConfig {
            t_match: 0.0,
            ..VerifyConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
