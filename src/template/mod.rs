//! Template views, trained templates and the template library.
//!
//! A `TemplateSource` is one rendered view of an object as handed over by
//! the dataset collaborator. Training turns it into an immutable `Template`
//! carrying its quantized features; the `TemplateLibrary` owns every trained
//! template for the lifetime of a detection run and indexes them by object.

use crate::features::{extract_features, FeatureConfig, TemplateFeatures};
use crate::geometry::Rect;
use crate::image::{Grid, Hsv};
use crate::trace::{trace_event, trace_span};
use crate::util::{HashMatchError, HashMatchResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Index of a template inside its `TemplateLibrary`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

/// Pinhole camera the template was rendered with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Row-major 3x3 intrinsics.
    pub k: [f32; 9],
    /// Row-major 3x3 model-to-camera rotation.
    pub r: [f32; 9],
    /// Model-to-camera translation.
    pub t: [f32; 3],
}

impl Default for Camera {
    fn default() -> Self {
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        Self {
            k: identity,
            r: identity,
            t: [0.0; 3],
        }
    }
}

/// One rendered view of an object before training.
#[derive(Clone, Debug)]
pub struct TemplateSource {
    /// Object identifier shared by all views of one object.
    pub obj_id: u32,
    /// Object bounding box inside the rendered images.
    pub bbox: Rect,
    /// Physical object diameter, in depth units.
    pub diameter: f32,
    pub camera: Camera,
    /// Grayscale in [0, 1].
    pub gray: Grid<f32>,
    pub hsv: Grid<Hsv>,
    /// Raw depth in sensor units; values `<= 0` are holes.
    pub depth: Grid<f32>,
}

impl TemplateSource {
    /// Bundles the rendered channels of one view, checking their geometry.
    pub fn new(
        obj_id: u32,
        bbox: Rect,
        diameter: f32,
        gray: Grid<f32>,
        hsv: Grid<Hsv>,
        depth: Grid<f32>,
    ) -> HashMatchResult<Self> {
        let (width, height) = gray.size();
        for (context, size) in [("template hsv", hsv.size()), ("template depth", depth.size())] {
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
        if bbox.area() == 0 || bbox.x + bbox.width > width || bbox.y + bbox.height > height {
            return Err(HashMatchError::RoiOutOfBounds {
                x: bbox.x,
                y: bbox.y,
                width: bbox.width,
                height: bbox.height,
                img_width: width,
                img_height: height,
            });
        }
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(HashMatchError::config("diameter", "must be finite and > 0"));
        }
        Ok(Self {
            obj_id,
            bbox,
            diameter,
            camera: Camera::default(),
            gray,
            hsv,
            depth,
        })
    }

    /// Attaches the render camera.
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }
}

/// Trained, immutable template.
#[derive(Clone, Debug)]
pub struct Template {
    id: TemplateId,
    source: TemplateSource,
    features: TemplateFeatures,
}

impl Template {
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn obj_id(&self) -> u32 {
        self.source.obj_id
    }

    pub fn bbox(&self) -> Rect {
        self.source.bbox
    }

    pub fn diameter(&self) -> f32 {
        self.source.diameter
    }

    pub fn camera(&self) -> &Camera {
        &self.source.camera
    }

    /// Rendered channels the template was trained from.
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn features(&self) -> &TemplateFeatures {
        &self.features
    }
}

/// All views of one object, as supplied for training.
#[derive(Clone, Debug)]
pub struct Group {
    pub obj_id: u32,
    pub templates: Vec<TemplateSource>,
}

impl Group {
    pub fn new(obj_id: u32, templates: Vec<TemplateSource>) -> Self {
        Self { obj_id, templates }
    }
}

/// Trained templates, addressable by `TemplateId` and by object.
#[derive(Clone, Debug)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
    groups: BTreeMap<u32, Vec<TemplateId>>,
}

impl TemplateLibrary {
    /// Extracts features for every template of every group.
    ///
    /// Ids follow group order, then template order within a group. Template
    /// `i` samples its points from a `StdRng` seeded with `cfg.seed + i`, so
    /// parallel and sequential training produce identical libraries. Any
    /// template with too few feature points fails the whole call.
    pub fn train(
        groups: Vec<Group>,
        cfg: &FeatureConfig,
        parallel: bool,
    ) -> HashMatchResult<Self> {
        cfg.validate()?;
        let sources: Vec<TemplateSource> = groups
            .into_iter()
            .flat_map(|group| {
                let obj_id = group.obj_id;
                group.templates.into_iter().map(move |mut source| {
                    source.obj_id = obj_id;
                    source
                })
            })
            .collect();
        if sources.is_empty() {
            return Err(HashMatchError::EmptyTemplateSet);
        }

        let _span = trace_span!("extract_features", templates = sources.len()).entered();
        let extract = |(index, source): (usize, TemplateSource)| -> HashMatchResult<Template> {
            let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(index as u64));
            let features = extract_features(&source, index, cfg, &mut rng)?;
            Ok(Template {
                id: TemplateId(index),
                source,
                features,
            })
        };

        #[cfg(feature = "rayon")]
        let templates: Vec<HashMatchResult<Template>> = if parallel {
            sources.into_par_iter().enumerate().map(extract).collect()
        } else {
            sources.into_iter().enumerate().map(extract).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let templates: Vec<HashMatchResult<Template>> = {
            let _ = parallel;
            sources.into_iter().enumerate().map(extract).collect()
        };
        let templates = templates.into_iter().collect::<HashMatchResult<Vec<_>>>()?;

        let mut groups: BTreeMap<u32, Vec<TemplateId>> = BTreeMap::new();
        for template in &templates {
            groups.entry(template.obj_id()).or_default().push(template.id);
        }

        trace_event!("templates_trained", templates = templates.len(), objects = groups.len());
        Ok(Self { templates, groups })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id.0)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Template ids of one object, in training order.
    pub fn group(&self, obj_id: u32) -> Option<&[TemplateId]> {
        self.groups.get(&obj_id).map(Vec::as_slice)
    }

    /// Object identifiers present in the library, ascending.
    pub fn object_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.keys().copied()
    }

    /// Template with the smallest bounding-box area (first on ties).
    pub fn smallest(&self) -> Option<&Template> {
        self.templates.iter().min_by_key(|t| t.bbox().area())
    }
}
