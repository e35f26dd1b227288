//! Non-maximum suppression for verified matches.

use crate::candidate::Match;
use std::cmp::Ordering;

fn match_cmp_desc(a: &Match, b: &Match) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.votes.cmp(&a.votes))
}

/// Greedy IoU-based suppression.
///
/// Matches are ranked by descending score, then descending votes, then input
/// order; a match is kept if its IoU with every previously kept match is at
/// most `overlap_threshold`. The output is sorted, and applying the function
/// to its own output returns it unchanged.
pub fn nms_matches(matches: &[Match], overlap_threshold: f32) -> Vec<Match> {
    let mut sorted = matches.to_vec();
    sorted.sort_by(match_cmp_desc);

    let mut kept: Vec<Match> = Vec::with_capacity(sorted.len());
    'outer: for candidate in sorted {
        for kept_match in kept.iter() {
            if candidate.bbox.iou(&kept_match.bbox) > overlap_threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }
    kept
}
