use std::time::Duration;

use footprint_core::prelude::*;
use geo::Polygon;
use numpy::{PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use wkt::{ToWkt, TryFromWkt};

use crate::error::to_py_err;
use crate::grid::{to_array, to_grid};

pub(crate) fn tiles_from_wkt(tiles: Vec<(String, String)>) -> PyResult<Vec<TileWindow>> {
    tiles
        .into_iter()
        .map(|(name, wkt)| {
            let polygon = Polygon::try_from_wkt_str(&wkt).map_err(|e| {
                PyValueError::new_err(format!("Failed to parse WKT of tile `{name}`: {e}"))
            })?;
            Ok(TileWindow { name, polygon })
        })
        .collect()
}

fn solve_options(
    edge_weighting: &str,
    memory_budget_bytes: Option<usize>,
    timeout_secs: Option<u64>,
) -> PyResult<SolveOptions> {
    let weighting = match edge_weighting {
        "destination" => EdgeWeighting::Destination,
        "geometric" => EdgeWeighting::Geometric,
        other => {
            return Err(PyValueError::new_err(format!(
                "Unknown edge weighting `{other}`, expected `destination` or `geometric`"
            )));
        }
    };
    Ok(SolveOptions {
        weighting,
        memory_budget_bytes,
        timeout: timeout_secs.map(Duration::from_secs),
        max_time: None,
    })
}

/// Minimum accumulated cost from any seed to every cell
///
/// Parameters
/// ----------
/// cost : numpy.ndarray
///     uint32 per-cell traversal times; 4294967295 marks impassable cells
/// transform : tuple[float, ...]
///     GDAL-ordered affine transform of the grid
/// crs : str
///     Coordinate reference identifier
/// seeds_geojson : str
///     Travel origins as GeoJSON points in projected coordinates of the grid
/// edge_weighting : str, default="destination"
///     ``destination`` charges the entered cell, ``geometric`` the mean of
///     both cells times the step length
/// memory_budget_bytes : int, optional
/// timeout_secs : int, optional
///
/// Returns
/// -------
/// numpy.ndarray
///     uint32 cumulative times; 4294967294 for unreachable cells and
///     4294967295 for impassable ones
#[pyfunction]
#[pyo3(signature = (
    cost,
    transform,
    crs,
    seeds_geojson,
    edge_weighting="destination",
    memory_budget_bytes=None,
    timeout_secs=None
))]
#[allow(clippy::too_many_arguments)]
pub fn cost_distance<'py>(
    py: Python<'py>,
    cost: PyReadonlyArray2<'py, u32>,
    transform: [f64; 6],
    crs: &str,
    seeds_geojson: &str,
    edge_weighting: &str,
    memory_budget_bytes: Option<usize>,
    timeout_secs: Option<u64>,
) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let cost = to_grid(&cost, transform, crs, Some(IMPASSABLE))?;
    let seeds = SeedSet::from_geojson_str(seeds_geojson, None).map_err(to_py_err)?;
    let options = solve_options(edge_weighting, memory_budget_bytes, timeout_secs)?;

    let times = py
        .detach(|| footprint_core::cost_distance(&cost, &seeds, &options))
        .map_err(to_py_err)?;
    to_array(py, times)
}

/// Cost distance solved tile by tile and merged by per-cell minimum
///
/// Each tile only sees the seeds inside its own polygon. ``tiles`` is a list
/// of ``(name, polygon WKT)`` pairs; ``workers`` bounds the parallel solves,
/// and fewer run at once when the memory budget only fits some tiles.
#[pyfunction]
#[pyo3(signature = (
    cost,
    transform,
    crs,
    seeds_geojson,
    tiles,
    workers=None,
    edge_weighting="destination",
    memory_budget_bytes=None,
    timeout_secs=None
))]
#[allow(clippy::too_many_arguments)]
pub fn cost_distance_tiled<'py>(
    py: Python<'py>,
    cost: PyReadonlyArray2<'py, u32>,
    transform: [f64; 6],
    crs: &str,
    seeds_geojson: &str,
    tiles: Vec<(String, String)>,
    workers: Option<usize>,
    edge_weighting: &str,
    memory_budget_bytes: Option<usize>,
    timeout_secs: Option<u64>,
) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let cost = to_grid(&cost, transform, crs, Some(IMPASSABLE))?;
    let seeds = SeedSet::from_geojson_str(seeds_geojson, None).map_err(to_py_err)?;
    let tiles = tiles_from_wkt(tiles)?;
    let options = solve_options(edge_weighting, memory_budget_bytes, timeout_secs)?;

    let times = py
        .detach(|| solve_tiled(&cost, &seeds, &tiles, &options, workers))
        .map_err(to_py_err)?;
    to_array(py, times)
}

/// Read tile windows from every GeoJSON file of a directory
///
/// Returns ``(name, polygon WKT)`` pairs in file-name order.
#[pyfunction(name = "load_tile_windows")]
pub fn py_load_tile_windows(dir: &str) -> PyResult<Vec<(String, String)>> {
    let tiles = load_tile_windows(dir).map_err(to_py_err)?;
    Ok(tiles
        .into_iter()
        .map(|tile| (tile.name, tile.polygon.wkt_string()))
        .collect())
}
