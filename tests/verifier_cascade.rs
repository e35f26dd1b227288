mod common;

use common::{make_config, make_groups, make_scene, make_scene_with, BASE_DEPTH, OBJECT_COLOR, SIDE};
use hashmatch::{
    nms_matches, Detector, Match, Rect, TemplateId, TestKind, TestScores, Verifier, VerifyConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_detector() -> Detector {
    Detector::train(make_groups(), make_config()).unwrap()
}

fn make_verifier(cascade: Vec<TestKind>) -> Verifier {
    Verifier::new(VerifyConfig {
        cascade,
        ..VerifyConfig::default()
    })
    .unwrap()
}

#[test]
fn cascade_only_removes_candidates() {
    let detector = make_detector();
    for (ox, oy) in [(20, 10), (5, 25), (30, 30), (0, 0)] {
        let scene = make_scene(ox, oy);
        let features = detector.scene_features(&scene);
        let mut windows = detector.windows(&scene).unwrap();
        detector
            .index()
            .verify_windows(&scene, &features, &mut windows, false);
        let before: Vec<Vec<TemplateId>> = windows
            .iter()
            .map(|w| w.candidates().iter().map(|c| c.template()).collect())
            .collect();

        let matches = detector.verifier().verify_windows(
            detector.library(),
            &scene,
            &features,
            &mut windows,
            false,
        );

        let mut survivors = 0;
        for (window, before) in windows.iter().zip(&before) {
            for candidate in window.candidates() {
                assert!(before.contains(&candidate.template()));
            }
            assert!(window.candidates().len() <= before.len());
            survivors += window.candidates().len();
        }
        assert_eq!(matches.len(), survivors);
    }
}

#[test]
fn size_test_rejects_scene_at_other_distance() {
    let detector = make_detector();
    let template = detector.library().get(TemplateId(0)).unwrap();
    let scene = make_scene_with(20, 10, 2.0 * BASE_DEPTH, OBJECT_COLOR);
    let rect = Rect::new(20, 10, SIDE, SIDE);

    let full = make_verifier(TestKind::DEFAULT_ORDER.to_vec());
    let features = detector.scene_features(&scene);
    assert!(full.run_cascade(&scene, &features, template, rect).is_none());
    assert!(!full.check(TestKind::ObjectSize, &scene, &features, template, rect).passed);

    let without_size = make_verifier(vec![
        TestKind::SurfaceNormal,
        TestKind::Gradient,
        TestKind::Depth,
        TestKind::Color,
    ]);
    let scores = without_size
        .run_cascade(&scene, &features, template, rect)
        .unwrap();
    assert_eq!(scores.object_size, None);
    assert_eq!(scores.depth, Some(1.0));
}

#[test]
fn color_test_rejects_other_hue() {
    let detector = make_detector();
    let template = detector.library().get(TemplateId(0)).unwrap();
    let scene = make_scene_with(20, 10, BASE_DEPTH, [120, 200, 200]);
    let rect = Rect::new(20, 10, SIDE, SIDE);

    let full = make_verifier(TestKind::DEFAULT_ORDER.to_vec());
    let features = detector.scene_features(&scene);
    assert!(full.run_cascade(&scene, &features, template, rect).is_none());

    let without_color = make_verifier(TestKind::DEFAULT_ORDER[..4].to_vec());
    assert!(without_color
        .run_cascade(&scene, &features, template, rect)
        .is_some());
}

#[test]
fn cascade_order_does_not_change_survivors() {
    let detector = make_detector();
    let template = detector.library().get(TemplateId(0)).unwrap();
    let scene = make_scene(20, 10);
    let rect = Rect::new(20, 10, SIDE, SIDE);

    let forward = make_verifier(TestKind::DEFAULT_ORDER.to_vec());
    let mut reversed_order = TestKind::DEFAULT_ORDER.to_vec();
    reversed_order.reverse();
    let reversed = make_verifier(reversed_order);
    let features = detector.scene_features(&scene);

    let a = forward.run_cascade(&scene, &features, template, rect).unwrap();
    let b = reversed.run_cascade(&scene, &features, template, rect).unwrap();
    assert_eq!(a, b);

    let depth_only = make_verifier(vec![TestKind::Depth]);
    let scores = depth_only
        .run_cascade(&scene, &features, template, rect)
        .unwrap();
    assert_eq!(
        scores,
        TestScores {
            depth: Some(1.0),
            ..TestScores::default()
        }
    );
}

#[test]
fn nms_is_idempotent_on_random_matches() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..30 {
        let matches: Vec<Match> = (0..rng.random_range(0..25))
            .map(|i| Match {
                obj_id: rng.random_range(0..3),
                bbox: Rect::new(
                    rng.random_range(0..60),
                    rng.random_range(0..60),
                    rng.random_range(5..25),
                    rng.random_range(5..25),
                ),
                score: rng.random_range(0.0..1.0),
                votes: rng.random_range(3..40),
                template: TemplateId(i),
                scores: TestScores::default(),
            })
            .collect();
        let once = nms_matches(&matches, 0.1);
        let twice = nms_matches(&once, 0.1);
        assert_eq!(once, twice);
        for (i, a) in once.iter().enumerate() {
            for b in &once[i + 1..] {
                assert!(a.bbox.iou(&b.bbox) <= 0.1);
            }
        }
    }
}

#[test]
fn suppress_keeps_higher_scoring_of_overlapping_pair() {
    let verifier = make_verifier(TestKind::DEFAULT_ORDER.to_vec());
    let weaker = Match {
        obj_id: 1,
        bbox: Rect::new(20, 10, SIDE, SIDE),
        score: 0.65,
        votes: 30,
        template: TemplateId(0),
        scores: TestScores::default(),
    };
    let stronger = Match {
        bbox: Rect::new(20, 15, SIDE, SIDE),
        score: 0.95,
        ..weaker
    };
    assert_eq!(verifier.suppress(&[weaker, stronger]), vec![stronger]);
}
