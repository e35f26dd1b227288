//! Numeric helpers shared by the quantizers and the verifier.

/// Returns the upper median of `values`, reordering the slice in place.
///
/// Returns `None` for an empty slice. NaNs sort last under `total_cmp`, so
/// callers filter them out beforehand.
pub(crate) fn median_f32(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*median)
}

/// Distance between two bins on a circular scale of `count` bins.
pub(crate) fn circular_bin_distance(a: u8, b: u8, count: u8) -> u8 {
    let diff = a.abs_diff(b) % count;
    diff.min(count - diff)
}

/// Replaces a non-finite value with `fallback`.
#[inline]
pub(crate) fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Depth samples at or below zero, or non-finite, are sensor holes.
#[inline]
pub(crate) fn is_valid_depth(depth: f32) -> bool {
    depth.is_finite() && depth > 0.0
}
