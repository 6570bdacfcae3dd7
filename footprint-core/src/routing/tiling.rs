//! Memory-bounded fallback: solve polygon tiles independently and merge.
//!
//! Each tile sees only the seeds inside its own polygon, so values near a
//! seam can be higher than a global solve would give. Overlapping tiles
//! reduce that effect; the merge keeps the smallest finite time per cell.

use geo::{BoundingRect, Intersects};
use log::{debug, info, warn};
use rayon::prelude::*;

use super::cost_distance::{SolveOptions, cost_distance, estimated_solve_bytes};
use crate::loading::TileWindow;
use crate::model::SeedIndex;
use crate::{
    CellWindow, CostGrid, Error, Grid, IMPASSABLE, NEVER, NODATA_TIME, SeedSet, Time, TimeGrid,
};

/// Cumulative times of one tile, positioned in the full grid
#[derive(Debug, Clone)]
pub struct TileSolution {
    pub name: String,
    pub window: CellWindow,
    pub times: TimeGrid,
}

/// Crops the cost grid to a tile; cells centred outside the polygon become impassable
pub fn clip_to_tile(cost: &CostGrid, tile: &TileWindow) -> Option<(CellWindow, CostGrid)> {
    let rect = tile.polygon.bounding_rect()?;
    let window = cost.spec().window_for_rect(&rect)?;
    let mut clipped = cost.crop(&window);
    let spec = clipped.spec().clone();

    clipped
        .data_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(index, value)| {
            let (row, col) = spec.row_col(index);
            if !tile.polygon.intersects(&spec.transform.cell_center(row, col)) {
                *value = IMPASSABLE;
            }
        });
    Some((window, clipped))
}

fn solve_tile(
    cost: &CostGrid,
    seeds: &SeedIndex<'_>,
    tile: &TileWindow,
    options: &SolveOptions,
) -> Result<Option<TileSolution>, Error> {
    let Some((window, clipped)) = clip_to_tile(cost, tile) else {
        warn!("Tile `{}` does not overlap the grid, skipping", tile.name);
        return Ok(None);
    };
    let tile_seeds = seeds.within_polygon(&tile.polygon);
    debug!(
        "Tile `{}`: {}x{} cells, {} seeds",
        tile.name,
        window.width,
        window.height,
        tile_seeds.len()
    );

    let times = cost_distance(&clipped, &tile_seeds, options)?;
    Ok(Some(TileSolution {
        name: tile.name.clone(),
        window,
        times,
    }))
}

/// How many tiles may be solved at once
///
/// Every tile is solved under the full `budget`, so at most
/// `budget / largest_tile_bytes` of them run together, never fewer than one.
pub fn concurrent_tiles(
    requested: usize,
    budget: Option<usize>,
    largest_tile_bytes: usize,
) -> usize {
    let requested = requested.max(1);
    match budget {
        Some(budget) if largest_tile_bytes > 0 => (budget / largest_tile_bytes).clamp(1, requested),
        _ => requested,
    }
}

/// Solves every tile on at most `workers` threads and merges the results
///
/// The worker count is lowered further so that the tiles solved at once
/// stay within the memory budget together. Any failing tile aborts the
/// whole run with [`Error::PartialTileFailure`]; tiles are never
/// re-partitioned.
pub fn solve_tiled(
    cost: &CostGrid,
    seeds: &SeedSet,
    tiles: &[TileWindow],
    options: &SolveOptions,
    workers: Option<usize>,
) -> Result<TimeGrid, Error> {
    if tiles.is_empty() {
        return Err(Error::Configuration(
            "tiling fallback needs at least one tile window".into(),
        ));
    }
    let largest_tile_bytes = tiles
        .iter()
        .filter_map(|tile| tile.polygon.bounding_rect())
        .filter_map(|rect| cost.spec().window_for_rect(&rect))
        .map(|window| estimated_solve_bytes(window.len()))
        .max()
        .unwrap_or(0);
    let requested = workers.unwrap_or_else(rayon::current_num_threads);
    let threads = concurrent_tiles(requested, options.memory_budget_bytes, largest_tile_bytes);
    if threads < requested {
        info!("Memory budget allows {threads} of {requested} tile workers");
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Configuration(format!("cannot start tile workers: {e}")))?;

    info!(
        "Solving {} tiles on {} workers",
        tiles.len(),
        pool.current_num_threads()
    );

    let index = seeds.spatial_index();
    let outcomes: Vec<Result<Option<TileSolution>, Error>> = pool.install(|| {
        tiles
            .par_iter()
            .map(|tile| solve_tile(cost, &index, tile, options))
            .collect()
    });

    let mut solutions = Vec::with_capacity(outcomes.len());
    for (tile, outcome) in tiles.iter().zip(outcomes) {
        match outcome {
            Ok(Some(solution)) => solutions.push(solution),
            Ok(None) => {}
            Err(source) => {
                return Err(Error::PartialTileFailure {
                    tile: tile.name.clone(),
                    source: Box::new(source),
                });
            }
        }
    }

    info!("Merging {} tile solutions", solutions.len());
    merge_tiles(cost, &solutions)
}

/// Per-cell minimum of finite tile times over the full grid
///
/// Impassable cells stay nodata; cells covered by no tile, or unreached in
/// every covering tile, are [`NEVER`].
pub fn merge_tiles(cost: &CostGrid, tiles: &[TileSolution]) -> Result<TimeGrid, Error> {
    let spec = cost.spec();
    let mut merged: Vec<Time> = cost
        .data()
        .iter()
        .map(|&value| {
            if value == IMPASSABLE || cost.is_nodata(value) {
                NODATA_TIME
            } else {
                NEVER
            }
        })
        .collect();

    for tile in tiles {
        let window = &tile.window;
        if window.row_off + window.height > spec.height
            || window.col_off + window.width > spec.width
            || tile.times.width() != window.width
            || tile.times.height() != window.height
        {
            return Err(Error::InvalidData(format!(
                "tile `{}` does not fit the {}x{} grid",
                tile.name, spec.width, spec.height
            )));
        }

        for (local, &time) in tile.times.data().iter().enumerate() {
            if time >= NEVER {
                continue;
            }
            let (row, col) = window.to_parent(local / window.width, local % window.width);
            let cell = &mut merged[spec.index(row, col)];
            if *cell != NODATA_TIME {
                *cell = (*cell).min(time);
            }
        }
    }

    Grid::new(spec.clone(), merged, Some(NODATA_TIME))
}

#[cfg(test)]
mod tests {
    use geo::{Polygon, polygon};

    use super::*;
    use crate::{GeoTransform, GridSpec, Seed};

    fn cost(width: usize, height: usize) -> CostGrid {
        let spec = GridSpec::new(
            width,
            height,
            GeoTransform::north_up(0.0, 0.0, 1.0, 1.0),
            "EPSG:32717",
        );
        Grid::filled(spec, 1, Some(IMPASSABLE))
    }

    fn rect(name: &str, x0: f64, x1: f64, y0: f64, y1: f64) -> TileWindow {
        let polygon: Polygon<f64> = polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ];
        TileWindow {
            name: name.into(),
            polygon,
        }
    }

    fn seeds(cost: &CostGrid, cells: &[(usize, usize)]) -> SeedSet {
        cells
            .iter()
            .map(|&(row, col)| Seed {
                point: cost.spec().transform.cell_center(row, col),
            })
            .collect()
    }

    #[test]
    fn clip_masks_cells_outside_polygon() {
        let cost = cost(4, 4);
        let triangle = TileWindow {
            name: "triangle".into(),
            polygon: polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 0.0, y: -4.0)],
        };
        let (window, clipped) = clip_to_tile(&cost, &triangle).unwrap();
        assert_eq!(window.len(), 16);
        // top-left centre is inside, bottom-right centre is outside
        assert_eq!(clipped.get(0, 0), Some(1));
        assert_eq!(clipped.get(3, 3), Some(IMPASSABLE));
    }

    #[test]
    fn merge_takes_the_minimum() {
        let cost = cost(3, 1);
        let tile = |name: &str, col_off, data: Vec<Time>| {
            let window = CellWindow {
                row_off: 0,
                col_off,
                height: 1,
                width: 2,
            };
            TileSolution {
                name: name.into(),
                window,
                times: Grid::new(cost.spec().window(&window), data, Some(NODATA_TIME)).unwrap(),
            }
        };
        let tiles = [tile("a", 0, vec![0, 5]), tile("b", 1, vec![3, NEVER])];
        let merged = merge_tiles(&cost, &tiles).unwrap();
        assert_eq!(merged.data(), &[0, 3, NEVER]);
    }

    #[test]
    fn merge_rejects_misplaced_tiles() {
        let cost = cost(2, 1);
        let window = CellWindow {
            row_off: 0,
            col_off: 1,
            height: 1,
            width: 2,
        };
        let spec = GridSpec::new(2, 1, GeoTransform::north_up(1.0, 0.0, 1.0, 1.0), "EPSG:32717");
        let tiles = [TileSolution {
            name: "wide".into(),
            window,
            times: Grid::filled(spec, 0, None),
        }];
        assert!(matches!(
            merge_tiles(&cost, &tiles),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn overlapping_tiles_match_the_full_solve() {
        let cost = cost(10, 4);
        let seeds = seeds(&cost, &[(1, 1), (2, 8)]);
        let tiles = [
            rect("left", 0.0, 7.0, -4.0, 0.0),
            rect("right", 3.0, 10.0, -4.0, 0.0),
        ];
        let options = SolveOptions::default();

        let full = cost_distance(&cost, &seeds, &options).unwrap();
        let tiled = solve_tiled(&cost, &seeds, &tiles, &options, Some(2)).unwrap();
        assert_eq!(tiled.data(), full.data());
    }

    #[test]
    fn uncovered_cells_are_never_reached() {
        let cost = cost(6, 2);
        let seeds = seeds(&cost, &[(0, 0)]);
        let tiles = [rect("west", 0.0, 3.0, -2.0, 0.0)];
        let tiled = solve_tiled(&cost, &seeds, &tiles, &SolveOptions::default(), None).unwrap();
        assert_eq!(tiled.get(0, 2), Some(2));
        assert_eq!(tiled.get(0, 4), Some(NEVER));
    }

    #[test]
    fn exhausted_tile_is_fatal() {
        let cost = cost(6, 2);
        let seeds = seeds(&cost, &[(0, 0)]);
        let tiles = [
            rect("west", 0.0, 3.0, -2.0, 0.0),
            rect("east", 3.0, 6.0, -2.0, 0.0),
        ];
        let options = SolveOptions {
            memory_budget_bytes: Some(1),
            ..SolveOptions::default()
        };
        let err = solve_tiled(&cost, &seeds, &tiles, &options, Some(1)).unwrap_err();
        assert!(matches!(err, Error::PartialTileFailure { ref tile, .. } if tile == "west"));
        assert!(!err.is_resource_exhausted());
    }

    #[test]
    fn tiles_outside_the_grid_are_skipped() {
        let cost = cost(2, 2);
        let seeds = seeds(&cost, &[(0, 0)]);
        let tiles = [
            rect("inside", 0.0, 2.0, -2.0, 0.0),
            rect("far", 100.0, 110.0, 50.0, 60.0),
        ];
        let tiled = solve_tiled(&cost, &seeds, &tiles, &SolveOptions::default(), None).unwrap();
        assert_eq!(tiled.data(), &[0, 1, 1, 1]);
    }

    #[test]
    fn budget_limits_concurrent_tiles() {
        let tile = estimated_solve_bytes(100);
        assert_eq!(concurrent_tiles(8, None, tile), 8);
        assert_eq!(concurrent_tiles(8, Some(3 * tile), tile), 3);
        assert_eq!(concurrent_tiles(8, Some(3 * tile - 1), tile), 2);
        assert_eq!(concurrent_tiles(2, Some(10 * tile), tile), 2);
        // a tile over budget still gets a worker and fails on its own
        assert_eq!(concurrent_tiles(4, Some(tile / 2), tile), 1);
        assert_eq!(concurrent_tiles(0, None, tile), 1);
    }

    #[test]
    fn tile_sized_budget_solves_on_fewer_workers() {
        let cost = cost(10, 4);
        let seeds = seeds(&cost, &[(1, 1), (2, 8)]);
        let tiles = [
            rect("left", 0.0, 7.0, -4.0, 0.0),
            rect("right", 3.0, 10.0, -4.0, 0.0),
        ];
        let options = SolveOptions {
            memory_budget_bytes: Some(estimated_solve_bytes(28)),
            ..SolveOptions::default()
        };

        assert!(cost_distance(&cost, &seeds, &options).unwrap_err().is_resource_exhausted());
        let tiled = solve_tiled(&cost, &seeds, &tiles, &options, Some(4)).unwrap();
        let full = cost_distance(&cost, &seeds, &SolveOptions::default()).unwrap();
        assert_eq!(tiled.data(), full.data());
    }

    #[test]
    fn no_tiles_is_a_configuration_error() {
        let cost = cost(2, 2);
        let err = solve_tiled(&cost, &SeedSet::default(), &[], &SolveOptions::default(), None)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
