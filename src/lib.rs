//! HashMatch detects textureless rigid objects in RGB-D scenes.
//!
//! Templates (rendered views of each object) are reduced to quantized
//! descriptors and hashed by geometric triplets. A scene is scanned with a
//! depth-edge objectness filter, every surviving window votes for templates
//! through the hash tables, and the best candidates run through a cascade of
//! size, normal, gradient, depth and color tests before non-maximum
//! suppression. Parallelism is optional via the `rayon` feature.

mod candidate;
pub mod detector;
pub mod features;
pub mod geometry;
pub mod hashing;
pub mod image;
pub mod lowlevel;
pub mod objectness;
pub mod scene;
pub mod template;
mod trace;
pub mod util;
pub mod verify;

pub use candidate::nms::nms_matches;
pub use candidate::votes::VoteTieBreak;
pub use candidate::{HashTableCandidate, Match, TestScores, Window};
pub use detector::{Detection, Detector, DetectorConfig};
pub use features::{FeatureConfig, TemplateFeatures};
pub use geometry::{Point, Rect};
pub use hashing::{HashConfig, HashIndex, HashIndexStats};
pub use image::{Grid, Hsv, ImageView};
pub use objectness::{ObjectnessConfig, ObjectnessDetector, ObjectnessModel};
pub use scene::{Scene, SceneFeatures};
pub use template::{Camera, Group, Template, TemplateId, TemplateLibrary, TemplateSource};
pub use util::{HashMatchError, HashMatchResult};
pub use verify::{HsvNormalization, TestKind, Verifier, VerifyConfig};
