//! Travel origins from built-up areas.
//!
//! Built cells are grouped into 8-connected clusters; each cluster
//! contributes a number of seeds that shrinks relative to its size, so
//! large cities do not flood the solver with redundant origins.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use log::{debug, info};
use rand::Rng;
use rand::seq::index::sample;

use crate::{Grid, Seed, SeedSet};

/// 8-connected clusters of `true` cells
///
/// Clusters are yielded in row-major order of their first cell; members are
/// listed in breadth-first discovery order.
pub struct Components<'a> {
    mask: &'a Grid<bool>,
    visited: FixedBitSet,
    next_start: usize,
    queue: VecDeque<usize>,
}

impl<'a> Components<'a> {
    pub fn new(mask: &'a Grid<bool>) -> Self {
        Self {
            mask,
            visited: FixedBitSet::with_capacity(mask.spec().len()),
            next_start: 0,
            queue: VecDeque::new(),
        }
    }

    fn flood_from(&mut self, start: usize) -> Vec<usize> {
        let mask = self.mask;
        let spec = mask.spec();
        let (width, height) = (spec.width, spec.height);
        let mut members = vec![start];
        self.visited.insert(start);
        self.queue.push_back(start);

        while let Some(index) = self.queue.pop_front() {
            let (row, col) = spec.row_col(index);
            for (dr, dc) in NEIGHBOURS {
                let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc))
                else {
                    continue;
                };
                if r >= height || c >= width {
                    continue;
                }
                let next = spec.index(r, c);
                if mask.data()[next] && !self.visited.put(next) {
                    members.push(next);
                    self.queue.push_back(next);
                }
            }
        }
        members
    }
}

impl Iterator for Components<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let mask = self.mask;
        let data = mask.data();
        while self.next_start < data.len() {
            let index = self.next_start;
            self.next_start += 1;
            if data[index] && !self.visited.contains(index) {
                return Some(self.flood_from(index));
            }
        }
        None
    }
}

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Number of seeds drawn from a cluster of `size` cells
pub fn seeds_for_cluster(size: usize) -> usize {
    match size {
        0 | 1 => 0,
        2..50 => 1,
        50..500 => size / 50,
        500..5000 => size / 100,
        _ => size / 1000,
    }
}

/// Extracts seeds from a built-up mask
///
/// Isolated cells never seed. Small clusters seed once at the median of
/// their discovery order; larger clusters are sampled uniformly without
/// replacement from `rng`. Seeds are returned as projected cell centres.
pub fn extract_seeds<R: Rng + ?Sized>(built: &Grid<bool>, rng: &mut R) -> SeedSet {
    let transform = built.spec().transform;
    let spec = built.spec();
    let mut seeds = SeedSet::default();
    let mut clusters = 0usize;

    for members in Components::new(built) {
        clusters += 1;
        let count = seeds_for_cluster(members.len());
        if count == 0 {
            continue;
        }

        let picked: Vec<usize> = if members.len() < 50 {
            vec![members[members.len() / 2]]
        } else {
            let mut drawn = sample(rng, members.len(), count).into_vec();
            drawn.sort_unstable();
            drawn.into_iter().map(|i| members[i]).collect()
        };
        debug!(
            "Cluster of {} cells contributes {} seeds",
            members.len(),
            picked.len()
        );

        for index in picked {
            let (row, col) = spec.row_col(index);
            seeds.push(Seed {
                point: transform.cell_center(row, col),
            });
        }
    }

    info!(
        "Extracted {} seeds from {clusters} built-up clusters",
        seeds.len()
    );
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoTransform, GridSpec};
    use geo::Point;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn mask(width: usize, height: usize, cells: &[(usize, usize)]) -> Grid<bool> {
        let spec = GridSpec::new(
            width,
            height,
            GeoTransform::north_up(0.0, 100.0, 10.0, 10.0),
            "EPSG:32717",
        );
        let mut grid = Grid::filled(spec, false, None);
        for &(row, col) in cells {
            grid.set(row, col, true);
        }
        grid
    }

    fn block(width: usize, height: usize) -> Grid<bool> {
        let spec = GridSpec::new(
            width,
            height,
            GeoTransform::north_up(0.0, 0.0, 1.0, 1.0),
            "EPSG:32717",
        );
        Grid::filled(spec, true, None)
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn cardinality_thresholds() {
        assert_eq!(seeds_for_cluster(1), 0);
        assert_eq!(seeds_for_cluster(3), 1);
        assert_eq!(seeds_for_cluster(49), 1);
        assert_eq!(seeds_for_cluster(50), 1);
        assert_eq!(seeds_for_cluster(499), 9);
        assert_eq!(seeds_for_cluster(500), 5);
        assert_eq!(seeds_for_cluster(4999), 49);
        assert_eq!(seeds_for_cluster(5000), 5);
        assert_eq!(seeds_for_cluster(10_000), 10);
    }

    #[test]
    fn isolated_pixel_never_seeds() {
        let grid = mask(5, 5, &[(2, 2)]);
        assert!(extract_seeds(&grid, &mut rng()).is_empty());
    }

    #[test]
    fn diagonal_cells_form_one_cluster() {
        let grid = mask(5, 5, &[(0, 0), (1, 1), (2, 2)]);
        let clusters: Vec<_> = Components::new(&grid).collect();
        assert_eq!(clusters, vec![vec![0, 6, 12]]);

        let seeds = extract_seeds(&grid, &mut rng());
        // median of discovery order is (1, 1): centre (15, 85)
        assert_eq!(seeds.as_slice(), &[Seed::new(15.0, 85.0)]);
    }

    #[test]
    fn separate_clusters_seed_independently() {
        let grid = mask(6, 4, &[(0, 0), (0, 1), (3, 4), (3, 5), (2, 5), (1, 3)]);
        let clusters: Vec<_> = Components::new(&grid).collect();
        assert_eq!(clusters.len(), 3);
        let seeds = extract_seeds(&grid, &mut rng());
        assert_eq!(seeds.len(), 2);
    }

    #[test]
    fn large_cluster_is_sampled() {
        let grid = block(100, 100);
        let seeds = extract_seeds(&grid, &mut rng());
        assert_eq!(seeds.len(), 10);

        let mut cells: Vec<_> = seeds
            .iter()
            .map(|seed| grid.spec().cell_at(seed.point).unwrap())
            .collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), 10);
    }

    #[test]
    fn sampling_is_reproducible_for_a_given_rng() {
        let grid = block(30, 20);
        let first = extract_seeds(&grid, &mut rng());
        let second = extract_seeds(&grid, &mut rng());
        assert_eq!(first.len(), 6);
        assert_eq!(first, second);

        let other = extract_seeds(&grid, &mut ChaCha8Rng::seed_from_u64(8));
        assert_eq!(other.len(), 6);
    }

    #[test]
    fn seeds_are_cell_centres() {
        let grid = mask(3, 3, &[(0, 0), (0, 1)]);
        let seeds = extract_seeds(&grid, &mut rng());
        assert_eq!(seeds.as_slice()[0].point, Point::new(15.0, 95.0));
    }

    #[test]
    fn empty_mask_has_no_seeds() {
        let grid = mask(4, 4, &[]);
        assert!(extract_seeds(&grid, &mut rng()).is_empty());
    }
}
