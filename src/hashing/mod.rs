//! Geometric-hashing candidate index.
//!
//! Training lays a reference grid over every template box and measures a
//! fixed set of random triplets of grid cells: the normal bin at each cell
//! and the depth differences of the two partner cells relative to the
//! anchor. The quantized measurement selects a table (anchor cell and anchor
//! normal) and a bucket inside it (depth bins and partner normals) that
//! stores the template id. Querying repeats the measurement on a scene window
//! and counts one vote per template found in a matching bucket.

mod bins;
mod grid;
mod table;
mod triplet;

pub use bins::DepthBins;
pub use grid::{GridCell, ReferenceGrid};
pub use table::{HashTable, TableKey, TripletKey};
pub use triplet::{generate_triplets, Triplet};

use crate::candidate::votes::{VoteAccumulator, VoteTieBreak};
use crate::candidate::{HashTableCandidate, Window};
use crate::features::{normal_bin_at, NORMAL_BINS};
use crate::geometry::{Point, Rect};
use crate::image::Grid;
use crate::scene::{Scene, SceneFeatures};
use crate::template::{Template, TemplateId, TemplateLibrary};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::is_valid_depth;
use crate::util::{HashMatchError, HashMatchResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Configuration for training and querying the hash index.
#[derive(Clone, Debug)]
pub struct HashConfig {
    /// Reference grid columns.
    pub grid_width: u16,
    /// Reference grid rows.
    pub grid_height: u16,
    /// Number of triplets, one anchor cell each.
    pub hash_table_count: usize,
    /// Number of depth-difference bins.
    pub histogram_bin_count: usize,
    /// Candidates with fewer votes are dropped.
    pub min_votes_per_template: u32,
    /// Maximum Chebyshev distance in cells between anchor and partners.
    pub max_triplet_distance: u16,
    /// Order among candidates with equal votes.
    pub tie_break: VoteTieBreak,
    /// Seed of the triplet generator.
    pub seed: u64,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            grid_width: 12,
            grid_height: 12,
            hash_table_count: 100,
            histogram_bin_count: 5,
            min_votes_per_template: 3,
            max_triplet_distance: 5,
            tie_break: VoteTieBreak::FirstVote,
            seed: 1,
        }
    }
}

impl HashConfig {
    pub fn grid(&self) -> ReferenceGrid {
        ReferenceGrid::new(self.grid_width, self.grid_height)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> HashMatchResult<()> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(HashMatchError::config("reference_grid", "must be at least 1x1"));
        }
        if self.hash_table_count == 0 {
            return Err(HashMatchError::config("hash_table_count", "must be > 0"));
        }
        if self.hash_table_count > self.grid().len() {
            return Err(HashMatchError::config(
                "hash_table_count",
                "must not exceed the number of grid cells",
            ));
        }
        if self.histogram_bin_count == 0 || self.histogram_bin_count > usize::from(u8::MAX) {
            return Err(HashMatchError::config("histogram_bin_count", "must be in 1..=255"));
        }
        if self.min_votes_per_template == 0 {
            return Err(HashMatchError::config("min_votes_per_template", "must be > 0"));
        }
        if self.max_triplet_distance == 0 {
            return Err(HashMatchError::config("max_triplet_distance", "must be > 0"));
        }
        Ok(())
    }
}

/// Depths and normal bins measured at the three cells of a triplet.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Measurement {
    depths: [f32; 3],
    normals: [u8; 3],
}

impl Measurement {
    fn take(
        triplet: &Triplet,
        grid: ReferenceGrid,
        rect: Rect,
        depth: &Grid<f32>,
        normal: impl Fn(Point) -> Option<u8>,
    ) -> Option<Self> {
        let mut depths = [0.0; 3];
        let mut normals = [0; 3];
        for (k, cell) in triplet.cells().into_iter().enumerate() {
            let p = grid.position(rect, cell);
            depths[k] = depth.get(p.x, p.y).filter(|&d| is_valid_depth(d))?;
            normals[k] = normal(p)?;
        }
        Some(Self { depths, normals })
    }

    fn differences(&self) -> [f32; 2] {
        [self.depths[1] - self.depths[0], self.depths[2] - self.depths[0]]
    }

    fn keys(&self, anchor: GridCell, bins: &DepthBins) -> (TableKey, TripletKey) {
        let [d12, d13] = self.differences();
        (
            TableKey {
                cell: anchor,
                normal_bin: self.normals[0],
            },
            TripletKey {
                d12: bins.quantize(d12),
                d13: bins.quantize(d13),
                normals: self.normals[1] * NORMAL_BINS + self.normals[2],
            },
        )
    }
}

/// Size summary of a trained index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashIndexStats {
    pub tables: usize,
    pub buckets: usize,
    pub entries: usize,
}

/// Trained hash tables plus everything needed to key a scene window.
#[derive(Clone, Debug)]
pub struct HashIndex {
    cfg: HashConfig,
    triplets: Vec<Triplet>,
    bins: DepthBins,
    tables: BTreeMap<TableKey, HashTable>,
}

impl HashIndex {
    /// Builds the index from every template of `library`.
    ///
    /// Identical libraries and configs produce identical tables, with or
    /// without `parallel`. Every template must yield at least one valid
    /// triplet: none at all is `EmptyHashIndex`, a single template without
    /// one is `DegenerateTemplate`.
    pub fn train(library: &TemplateLibrary, cfg: HashConfig, parallel: bool) -> HashMatchResult<Self> {
        cfg.validate()?;
        if library.is_empty() {
            return Err(HashMatchError::EmptyTemplateSet);
        }
        let _span = trace_span!("hash_train", templates = library.len()).entered();

        let grid = cfg.grid();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let triplets =
            generate_triplets(grid, cfg.hash_table_count, cfg.max_triplet_distance, &mut rng)?;

        let measure = |template: &Template| -> (TemplateId, Vec<(usize, Measurement)>) {
            let depth = &template.source().depth;
            let bbox = template.bbox();
            let taken = triplets
                .iter()
                .enumerate()
                .filter_map(|(i, t)| {
                    Measurement::take(t, grid, bbox, depth, |p| normal_bin_at(depth, p.x, p.y))
                        .map(|m| (i, m))
                })
                .collect();
            (template.id(), taken)
        };

        #[cfg(feature = "rayon")]
        let measured: Vec<(TemplateId, Vec<(usize, Measurement)>)> = if parallel {
            library.templates().par_iter().map(measure).collect()
        } else {
            library.templates().iter().map(measure).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let measured: Vec<(TemplateId, Vec<(usize, Measurement)>)> = {
            let _ = parallel;
            library.templates().iter().map(measure).collect()
        };

        if measured.iter().all(|(_, taken)| taken.is_empty()) {
            return Err(HashMatchError::EmptyHashIndex);
        }
        if let Some((id, _)) = measured.iter().find(|(_, taken)| taken.is_empty()) {
            return Err(HashMatchError::DegenerateTemplate {
                template: id.0,
                reason: "no valid triplet inside bounding box",
            });
        }

        let mut differences: Vec<f32> = measured
            .iter()
            .flat_map(|(_, taken)| taken.iter().flat_map(|(_, m)| m.differences()))
            .collect();
        let bins = DepthBins::from_samples(&mut differences, cfg.histogram_bin_count)
            .ok_or(HashMatchError::EmptyHashIndex)?;

        let mut tables: BTreeMap<TableKey, HashTable> = BTreeMap::new();
        for (id, taken) in &measured {
            for (i, m) in taken {
                let (table_key, triplet_key) = m.keys(triplets[*i].anchor, &bins);
                tables.entry(table_key).or_default().insert(triplet_key, *id);
            }
        }

        let index = Self {
            cfg,
            triplets,
            bins,
            tables,
        };
        let stats = index.stats();
        trace_event!(
            "hash_trained",
            tables = stats.tables,
            buckets = stats.buckets,
            entries = stats.entries
        );
        Ok(index)
    }

    pub fn config(&self) -> &HashConfig {
        &self.cfg
    }

    pub fn triplets(&self) -> &[Triplet] {
        &self.triplets
    }

    pub fn bins(&self) -> &DepthBins {
        &self.bins
    }

    pub fn table(&self, key: &TableKey) -> Option<&HashTable> {
        self.tables.get(key)
    }

    /// Tables in key order.
    pub fn tables(&self) -> impl Iterator<Item = (&TableKey, &HashTable)> {
        self.tables.iter()
    }

    pub fn stats(&self) -> HashIndexStats {
        HashIndexStats {
            tables: self.tables.len(),
            buckets: self.tables.values().map(HashTable::len).sum(),
            entries: self.tables.values().map(HashTable::entry_count).sum(),
        }
    }

    /// Votes for templates whose stored keys match the scene inside `rect`.
    ///
    /// Returns candidates with at least `min_votes_per_template` votes,
    /// highest first, ties ordered by the configured tie-break.
    pub fn query(&self, scene: &Scene, features: &SceneFeatures, rect: Rect) -> Vec<HashTableCandidate> {
        let grid = self.cfg.grid();
        let mut votes = VoteAccumulator::new();
        for triplet in &self.triplets {
            let Some(m) = Measurement::take(triplet, grid, rect, scene.depth(), |p| {
                features.normal_bin(p.x as i64, p.y as i64)
            }) else {
                continue;
            };
            let (table_key, triplet_key) = m.keys(triplet.anchor, &self.bins);
            let bucket = self
                .tables
                .get(&table_key)
                .and_then(|table| table.bucket(&triplet_key));
            for &template in bucket.into_iter().flatten() {
                votes.vote(template);
            }
        }
        votes.into_ranked(self.cfg.min_votes_per_template, self.cfg.tie_break)
    }

    /// Appends ranked candidates to every window.
    pub fn verify_windows(
        &self,
        scene: &Scene,
        features: &SceneFeatures,
        windows: &mut [Window],
        parallel: bool,
    ) {
        let _span = trace_span!("hash_query", windows = windows.len()).entered();
        let fill = |window: &mut Window| {
            let ranked = self.query(scene, features, window.rect);
            trace_debug!("window_votes", x = window.rect.x, y = window.rect.y, candidates = ranked.len());
            window.extend_candidates(ranked);
        };

        #[cfg(feature = "rayon")]
        {
            if parallel {
                windows.par_iter_mut().for_each(fill);
            } else {
                windows.iter_mut().for_each(fill);
            }
        }
        #[cfg(not(feature = "rayon"))]
        {
            let _ = parallel;
            windows.iter_mut().for_each(fill);
        }

        let candidates: usize = windows.iter().map(|w| w.candidates().len()).sum();
        trace_event!("hash_queried", windows = windows.len(), candidates = candidates);
    }
}
