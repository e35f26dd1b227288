use hashmatch::features::{
    gradient_orientation_deg, quantize_normal, quantize_orientation, surface_normal, NORMAL_BINS,
    ORIENTATION_BINS,
};

/// Angles on a quarter-degree grid over [0, 360).
fn angle_grid() -> impl Iterator<Item = f32> {
    (0..1440).map(|i| i as f32 * 0.25)
}

#[test]
fn orientation_is_total_on_full_circle() {
    for deg in angle_grid() {
        let bin = quantize_orientation(deg);
        assert!(bin < ORIENTATION_BINS, "angle {deg} -> bin {bin}");
        assert_eq!(bin, quantize_orientation(deg), "not deterministic at {deg}");
    }
}

#[test]
fn orientation_is_axis_unsigned() {
    for deg in angle_grid().filter(|d| *d < 180.0) {
        assert_eq!(
            quantize_orientation(deg),
            quantize_orientation(deg + 180.0),
            "angle {deg}"
        );
    }
}

#[test]
fn orientation_bins_are_contiguous_and_ordered() {
    let mut previous = 0u8;
    let mut starts = vec![0.0f32];
    for deg in angle_grid().filter(|d| *d < 180.0) {
        let bin = quantize_orientation(deg);
        assert!(bin == previous || bin == previous + 1, "jump at {deg}");
        if bin != previous {
            starts.push(deg);
        }
        previous = bin;
    }
    assert_eq!(starts, vec![0.0, 36.0, 72.0, 108.0, 144.0]);
}

#[test]
fn orientation_handles_non_finite_angles() {
    assert_eq!(quantize_orientation(f32::NAN), 0);
    assert_eq!(quantize_orientation(f32::INFINITY), 0);
}

#[test]
fn gradient_direction_covers_circle() {
    assert_eq!(gradient_orientation_deg(1.0, 0.0), 0.0);
    assert!((gradient_orientation_deg(0.0, 1.0) - 90.0).abs() < 1e-4);
    assert!((gradient_orientation_deg(-1.0, 0.0) - 180.0).abs() < 1e-4);
    assert!((gradient_orientation_deg(0.0, -1.0) - 270.0).abs() < 1e-4);
}

#[test]
fn normals_follow_slope_direction() {
    // Depth growing to the right tilts the normal towards -x: azimuth 180.
    assert_eq!(quantize_normal(surface_normal(1.0, 0.0)), 4);
    assert_eq!(quantize_normal(surface_normal(-1.0, 0.0)), 0);
    assert_eq!(quantize_normal(surface_normal(0.0, -1.0)), 2);
    assert_eq!(quantize_normal(surface_normal(0.0, 1.0)), 6);
    assert_eq!(quantize_normal(surface_normal(-1.0, -1.0)), 1);
}

#[test]
fn normal_ties_and_nans_fall_back_to_lowest_bin() {
    assert_eq!(quantize_normal(surface_normal(0.0, 0.0)), 0);
    assert_eq!(quantize_normal([f32::NAN, f32::NAN, f32::NAN]), 0);
    for i in 0..64 {
        let a = i as f32 * 0.1 - 3.2;
        let bin = quantize_normal(surface_normal(a, -a * 0.5));
        assert!(bin < NORMAL_BINS);
    }
}
