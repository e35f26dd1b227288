mod common;

use common::{make_groups, make_scene, make_template, make_template_with_holes, SIDE};
use hashmatch::{
    FeatureConfig, Group, HashConfig, HashIndex, HashMatchError, Rect, SceneFeatures,
    TemplateId, TemplateLibrary, VoteTieBreak, Window,
};

fn make_library(groups: Vec<Group>) -> TemplateLibrary {
    let cfg = FeatureConfig {
        feature_point_count: 20,
        ..FeatureConfig::default()
    };
    TemplateLibrary::train(groups, &cfg, false).unwrap()
}

fn make_twins() -> Vec<Group> {
    vec![
        Group::new(4, vec![make_template(0), make_template(0)]),
        Group::new(9, vec![make_template(0)]),
    ]
}

#[test]
fn candidates_never_fall_below_min_votes() {
    let library = make_library(make_groups());
    let scene = make_scene(20, 10);
    let features = SceneFeatures::compute(&scene, 0.1);
    for min_votes in 1..=8 {
        let cfg = HashConfig {
            min_votes_per_template: min_votes,
            ..HashConfig::default()
        };
        let index = HashIndex::train(&library, cfg, false).unwrap();
        for y in (0..=30).step_by(5) {
            for x in (0..=30).step_by(5) {
                let ranked = index.query(&scene, &features, Rect::new(x, y, SIDE, SIDE));
                assert!(
                    ranked.iter().all(|c| c.votes() >= min_votes),
                    "min_votes {min_votes} at ({x}, {y}): {ranked:?}"
                );
                assert!(ranked.windows(2).all(|w| w[0].votes() >= w[1].votes()));
            }
        }
    }
}

#[test]
fn matching_window_votes_for_template() {
    let library = make_library(make_groups());
    let index = HashIndex::train(&library, HashConfig::default(), false).unwrap();
    let scene = make_scene(20, 10);
    let features = SceneFeatures::compute(&scene, 0.1);

    let ranked = index.query(&scene, &features, Rect::new(20, 10, SIDE, SIDE));
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].template(), TemplateId(0));
    assert!(ranked[0].votes() >= index.config().min_votes_per_template);

    // Background only: no valid depth, no votes.
    let ranked = index.query(&scene, &features, Rect::new(0, 30, SIDE, SIDE));
    assert!(ranked.is_empty());
}

#[test]
fn training_is_deterministic() {
    let library = make_library(make_twins());
    let a = HashIndex::train(&library, HashConfig::default(), false).unwrap();
    let b = HashIndex::train(&library, HashConfig::default(), false).unwrap();
    assert_eq!(a.triplets(), b.triplets());
    assert_eq!(a.bins(), b.bins());
    assert_eq!(
        a.tables().collect::<Vec<_>>(),
        b.tables().collect::<Vec<_>>()
    );
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn buckets_list_templates_in_id_order() {
    let library = make_library(make_twins());
    let index = HashIndex::train(&library, HashConfig::default(), false).unwrap();
    let stats = index.stats();
    assert!(stats.tables > 0);
    assert!(stats.tables <= index.config().hash_table_count * 8);
    assert!(stats.entries >= stats.buckets);
    for (_, table) in index.tables() {
        for (_, bucket) in table.buckets() {
            assert!(bucket.windows(2).all(|w| w[0] < w[1]), "{bucket:?}");
        }
    }
}

#[test]
fn identical_templates_tie_in_id_order_under_both_rules() {
    let library = make_library(make_twins());
    let scene = make_scene(20, 10);
    let features = SceneFeatures::compute(&scene, 0.1);
    let rect = Rect::new(20, 10, SIDE, SIDE);

    for tie_break in [VoteTieBreak::FirstVote, VoteTieBreak::TemplateId] {
        let cfg = HashConfig {
            tie_break,
            ..HashConfig::default()
        };
        let index = HashIndex::train(&library, cfg, false).unwrap();
        let ranked = index.query(&scene, &features, rect);
        let ids: Vec<TemplateId> = ranked.iter().map(|c| c.template()).collect();
        assert_eq!(ids, vec![TemplateId(0), TemplateId(1), TemplateId(2)]);
        assert!(ranked.iter().all(|c| c.votes() == ranked[0].votes()));
    }
}

#[test]
fn verify_windows_fills_candidates() {
    let library = make_library(make_groups());
    let index = HashIndex::train(&library, HashConfig::default(), false).unwrap();
    let scene = make_scene(20, 10);
    let features = SceneFeatures::compute(&scene, 0.1);

    let mut windows = vec![
        Window::new(Rect::new(20, 10, SIDE, SIDE), 0),
        Window::new(Rect::new(0, 30, SIDE, SIDE), 0),
    ];
    index.verify_windows(&scene, &features, &mut windows, false);
    assert!(windows[0].has_candidates());
    assert!(!windows[1].has_candidates());
}

#[test]
fn invalid_hash_config_is_rejected() {
    let library = make_library(make_groups());
    let cfg = HashConfig {
        histogram_bin_count: 0,
        ..HashConfig::default()
    };
    assert!(matches!(
        HashIndex::train(&library, cfg, false).unwrap_err(),
        HashMatchError::InvalidConfig {
            field: "histogram_bin_count",
            ..
        }
    ));
    let cfg = HashConfig {
        grid_width: 3,
        grid_height: 3,
        hash_table_count: 10,
        ..HashConfig::default()
    };
    assert!(HashIndex::train(&library, cfg, false).is_err());
}

/// Sample positions of a 2x2 reference grid over the template box.
const GRID_2X2_CELLS: [(usize, usize); 4] = [(20, 20), (30, 20), (20, 30), (30, 30)];

fn grid_2x2() -> HashConfig {
    HashConfig {
        grid_width: 2,
        grid_height: 2,
        hash_table_count: 4,
        max_triplet_distance: 1,
        ..HashConfig::default()
    }
}

#[test]
fn template_without_valid_triplet_fails_training() {
    let library = make_library(vec![Group::new(
        1,
        vec![
            make_template(1),
            make_template_with_holes(1, &GRID_2X2_CELLS),
        ],
    )]);
    let err = HashIndex::train(&library, grid_2x2(), false).unwrap_err();
    assert_eq!(
        err,
        HashMatchError::DegenerateTemplate {
            template: 1,
            reason: "no valid triplet inside bounding box",
        }
    );

    // The intact template alone trains fine on the same grid.
    let library = make_library(vec![Group::new(1, vec![make_template(1)])]);
    let index = HashIndex::train(&library, grid_2x2(), false).unwrap();
    assert!(index.stats().entries > 0);
}

#[test]
fn library_without_valid_triplet_is_empty_index() {
    let library = make_library(vec![Group::new(
        1,
        vec![make_template_with_holes(1, &GRID_2X2_CELLS)],
    )]);
    assert_eq!(
        HashIndex::train(&library, grid_2x2(), false).unwrap_err(),
        HashMatchError::EmptyHashIndex
    );
}
