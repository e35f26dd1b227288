//! End-to-end detector: training from template groups and detection on a
//! scene.

use crate::candidate::{Match, Window};
use crate::features::FeatureConfig;
use crate::hashing::{HashConfig, HashIndex};
use crate::objectness::{ObjectnessConfig, ObjectnessDetector};
use crate::scene::{Scene, SceneFeatures};
use crate::template::{Group, TemplateLibrary};
use crate::trace::{trace_event, trace_span};
use crate::util::{HashMatchError, HashMatchResult};
use crate::verify::{Verifier, VerifyConfig};

/// Configuration of every stage.
#[derive(Clone, Debug, Default)]
pub struct DetectorConfig {
    pub features: FeatureConfig,
    pub objectness: ObjectnessConfig,
    pub hashing: HashConfig,
    pub verify: VerifyConfig,
    /// Enables rayon-parallel stages when the `rayon` feature is on.
    pub parallel: bool,
}

impl DetectorConfig {
    /// Validates every stage config.
    pub fn validate(&self) -> HashMatchResult<()> {
        self.features.validate()?;
        self.objectness.validate()?;
        self.hashing.validate()?;
        self.verify.validate()
    }
}

/// Output of one detection run.
#[derive(Clone, Debug, Default)]
pub struct Detection {
    /// Windows after verification, holding their surviving candidates.
    pub windows: Vec<Window>,
    /// Matches after non-maximum suppression, best first.
    pub matches: Vec<Match>,
}

/// Trained detector.
#[derive(Clone, Debug)]
pub struct Detector {
    parallel: bool,
    min_gradient_magnitude: f32,
    library: TemplateLibrary,
    objectness: ObjectnessDetector,
    index: HashIndex,
    verifier: Verifier,
}

impl Detector {
    /// Trains every stage from `groups`.
    ///
    /// The whole config is validated before any template is touched.
    pub fn train(groups: Vec<Group>, cfg: DetectorConfig) -> HashMatchResult<Self> {
        cfg.validate()?;
        let _span = trace_span!("train", groups = groups.len()).entered();
        let DetectorConfig {
            features,
            objectness,
            hashing,
            verify,
            parallel,
        } = cfg;

        let min_gradient_magnitude = features.min_gradient_magnitude;
        let library = TemplateLibrary::train(groups, &features, parallel)?;
        let mut objectness = ObjectnessDetector::new(objectness)?;
        objectness.train(&library)?;
        let index = HashIndex::train(&library, hashing, parallel)?;
        let verifier = Verifier::new(verify)?;
        Ok(Self {
            parallel,
            min_gradient_magnitude,
            library,
            objectness,
            index,
            verifier,
        })
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn objectness(&self) -> &ObjectnessDetector {
        &self.objectness
    }

    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Scene descriptors quantized with the same gradient floor as the
    /// templates.
    pub fn scene_features(&self, scene: &Scene) -> SceneFeatures {
        SceneFeatures::compute(scene, self.min_gradient_magnitude)
    }

    /// Objectness windows of `scene`, without candidates.
    ///
    /// A scene normalized with a depth scale other than the objectness one
    /// is rejected.
    pub fn windows(&self, scene: &Scene) -> HashMatchResult<Vec<Window>> {
        let expected = self.objectness.config().depth_scale;
        if let Some(scale) = scene.depth_scale() {
            if (scale - expected).abs() > expected * 1e-6 {
                return Err(HashMatchError::config(
                    "depth_scale",
                    "scene was normalized with a different depth scale",
                ));
            }
        }
        self.objectness.detect(scene.depth_norm(), self.parallel)
    }

    /// Runs objectness, hashing, verification and suppression.
    pub fn detect(&self, scene: &Scene) -> HashMatchResult<Detection> {
        let _span = trace_span!("detect", width = scene.width(), height = scene.height()).entered();
        let mut windows = self.windows(scene)?;
        if windows.is_empty() {
            trace_event!("detected", windows = 0usize, matches = 0usize);
            return Ok(Detection::default());
        }
        let features = self.scene_features(scene);
        self.index
            .verify_windows(scene, &features, &mut windows, self.parallel);
        windows.retain(Window::has_candidates);
        let matches =
            self.verifier
                .match_windows(&self.library, scene, &features, &mut windows, self.parallel);
        windows.retain(Window::has_candidates);
        trace_event!("detected", windows = windows.len(), matches = matches.len());
        Ok(Detection { windows, matches })
    }
}
