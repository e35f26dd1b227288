//! Random triplets of reference points.

use crate::hashing::grid::{GridCell, ReferenceGrid};
use crate::util::{HashMatchError, HashMatchResult};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

/// Anchor cell plus two partner cells within the triplet distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triplet {
    pub anchor: GridCell,
    pub first: GridCell,
    pub second: GridCell,
}

impl Triplet {
    pub fn cells(&self) -> [GridCell; 3] {
        [self.anchor, self.first, self.second]
    }
}

/// Draws `count` triplets with distinct anchors.
///
/// Partners differ from the anchor and from each other and lie within
/// Chebyshev distance `max_distance` of the anchor.
pub fn generate_triplets<R: Rng + ?Sized>(
    grid: ReferenceGrid,
    count: usize,
    max_distance: u16,
    rng: &mut R,
) -> HashMatchResult<Vec<Triplet>> {
    if count > grid.len() {
        return Err(HashMatchError::config(
            "hash_table_count",
            "must not exceed the number of grid cells",
        ));
    }
    let mut anchors: Vec<GridCell> = grid.cells().collect();
    anchors.shuffle(rng);
    anchors.truncate(count);

    let mut triplets = Vec::with_capacity(count);
    for anchor in anchors {
        let partners: Vec<GridCell> = grid
            .cells()
            .filter(|c| *c != anchor && c.distance(&anchor) <= max_distance)
            .collect();
        if partners.len() < 2 {
            return Err(HashMatchError::config(
                "max_triplet_distance",
                "leaves fewer than two partner cells",
            ));
        }
        let picked: Vec<GridCell> = partners.choose_multiple(rng, 2).copied().collect();
        triplets.push(Triplet {
            anchor,
            first: picked[0],
            second: picked[1],
        });
    }
    Ok(triplets)
}

#[cfg(test)]
mod tests {
    use super::generate_triplets;
    use crate::hashing::grid::ReferenceGrid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn triplets_respect_distance_and_distinct_anchors() {
        let mut rng = StdRng::seed_from_u64(7);
        let triplets = generate_triplets(ReferenceGrid::new(12, 12), 100, 3, &mut rng).unwrap();
        assert_eq!(triplets.len(), 100);
        let anchors: HashSet<_> = triplets.iter().map(|t| t.anchor).collect();
        assert_eq!(anchors.len(), 100);
        for t in &triplets {
            assert!(t.first != t.anchor && t.second != t.anchor && t.first != t.second);
            assert!(t.anchor.distance(&t.first) <= 3);
            assert!(t.anchor.distance(&t.second) <= 3);
        }
    }

    #[test]
    fn same_seed_same_triplets() {
        let grid = ReferenceGrid::new(6, 6);
        let a = generate_triplets(grid, 10, 2, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = generate_triplets(grid, 10, 2, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_many_tables_is_a_config_error() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_triplets(ReferenceGrid::new(2, 2), 5, 1, &mut rng).is_err());
    }
}
