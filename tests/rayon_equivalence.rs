#![cfg(feature = "rayon")]

mod common;

use common::{make_config, make_scene, make_template};
use hashmatch::{Detector, DetectorConfig, Group};

fn make_detector(parallel: bool) -> Detector {
    let groups = vec![
        Group::new(1, vec![make_template(1), make_template(1)]),
        Group::new(2, vec![make_template(2)]),
    ];
    let cfg = DetectorConfig {
        parallel,
        ..make_config()
    };
    Detector::train(groups, cfg).unwrap()
}

#[test]
fn parallel_training_matches_sequential() {
    let sequential = make_detector(false);
    let parallel = make_detector(true);

    let seq_templates = sequential.library().templates();
    let par_templates = parallel.library().templates();
    assert_eq!(seq_templates.len(), par_templates.len());
    for (a, b) in seq_templates.iter().zip(par_templates) {
        assert_eq!(a.id(), b.id());
        assert_eq!(a.features(), b.features());
    }
    assert_eq!(
        sequential.index().tables().collect::<Vec<_>>(),
        parallel.index().tables().collect::<Vec<_>>()
    );
    assert_eq!(sequential.objectness().model(), parallel.objectness().model());
}

#[test]
fn parallel_detection_matches_sequential() {
    let sequential = make_detector(false);
    let parallel = make_detector(true);
    for (ox, oy) in [(20, 10), (0, 30), (25, 25)] {
        let scene = make_scene(ox, oy);
        let a = sequential.detect(&scene).unwrap();
        let b = parallel.detect(&scene).unwrap();
        assert_eq!(a.windows, b.windows);
        assert_eq!(a.matches, b.matches);
    }
}
