//! Scene windows, vote candidates and verified matches.
//!
//! A `HashTableCandidate` is what voting produces for one window; a `Match`
//! is what survives verification. The two are distinct value types and a
//! match is only ever created by `Match::promote`.

pub(crate) mod nms;
pub(crate) mod votes;

use crate::geometry::{Point, Rect};
use crate::template::{Template, TemplateId};

/// Template paired with the number of votes it collected for one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashTableCandidate {
    template: TemplateId,
    votes: u32,
}

impl HashTableCandidate {
    pub fn new(template: TemplateId, votes: u32) -> Self {
        Self { template, votes }
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn votes(&self) -> u32 {
        self.votes
    }

    /// Counts one more vote; the count never decreases.
    #[inline]
    pub(crate) fn vote(&mut self) {
        self.votes = self.votes.saturating_add(1);
    }
}

/// Scene region that passed objectness detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub rect: Rect,
    /// Edge-mask pixels inside the window.
    pub edgels: u32,
    candidates: Vec<HashTableCandidate>,
}

impl Window {
    pub fn new(rect: Rect, edgels: u32) -> Self {
        Self {
            rect,
            edgels,
            candidates: Vec::new(),
        }
    }

    pub fn tl(&self) -> Point {
        self.rect.tl()
    }

    /// Candidates in descending vote order.
    pub fn candidates(&self) -> &[HashTableCandidate] {
        &self.candidates
    }

    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Appends ranked candidates from a hash query.
    pub(crate) fn extend_candidates(&mut self, ranked: impl IntoIterator<Item = HashTableCandidate>) {
        self.candidates.extend(ranked);
    }

    /// Keeps only the candidates accepted by `keep`, preserving order.
    pub(crate) fn retain_candidates(&mut self, keep: impl FnMut(&HashTableCandidate) -> bool) {
        self.candidates.retain(keep);
    }
}

/// Per-test scores of a candidate that passed the whole cascade.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TestScores {
    pub object_size: Option<f32>,
    pub surface_normal: Option<f32>,
    pub gradient: Option<f32>,
    pub depth: Option<f32>,
    pub color: Option<f32>,
}

impl TestScores {
    /// Mean of the scores of the tests that ran, 0 if none ran.
    pub fn mean(&self) -> f32 {
        let ran: Vec<f32> = [
            self.object_size,
            self.surface_normal,
            self.gradient,
            self.depth,
            self.color,
        ]
        .into_iter()
        .flatten()
        .collect();
        if ran.is_empty() {
            return 0.0;
        }
        ran.iter().sum::<f32>() / ran.len() as f32
    }
}

/// Verified detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    pub obj_id: u32,
    /// Template bounding box placed at the window origin.
    pub bbox: Rect,
    /// Mean verification score in [0, 1].
    pub score: f32,
    /// Votes the template collected during hashing.
    pub votes: u32,
    /// Template whose pose this detection inherits.
    pub template: TemplateId,
    pub scores: TestScores,
}

impl Match {
    /// Turns a candidate that survived the cascade into a detection.
    pub fn promote(
        candidate: HashTableCandidate,
        template: &Template,
        window: &Window,
        scores: TestScores,
    ) -> Self {
        let bbox = template.bbox();
        Self {
            obj_id: template.obj_id(),
            bbox: Rect::new(window.rect.x, window.rect.y, bbox.width, bbox.height),
            score: scores.mean(),
            votes: candidate.votes(),
            template: candidate.template(),
            scores,
        }
    }
}
