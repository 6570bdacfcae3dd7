use std::collections::HashMap;

use footprint_core::prelude::*;
use numpy::{PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::to_py_err;
use crate::grid::{to_array, to_grid};
use crate::routing::tiles_from_wkt;

/// Compute the accessibility pressure layer
///
/// Parameters
/// ----------
/// config_json : str
///     JSON configuration: layer identifiers, speed and scoring constants,
///     solver limits. Only ``layers`` is required.
/// layers : dict[str, numpy.ndarray]
///     Raw float32 input rasters keyed by identifier, all on one grid
/// transform : tuple[float, ...]
///     GDAL-ordered affine transform shared by every layer
/// crs : str
///     Coordinate reference identifier shared by every layer
/// tiles : list[tuple[str, str]], optional
///     ``(name, polygon WKT)`` windows used when the full extent does not
///     fit the memory budget or timeout
/// seed : int, default=0
///     Seed of the sampling of travel origins in large settlements
/// nodata : dict[str, float], optional
///     Nodata value per layer identifier
///
/// Returns
/// -------
/// tuple[numpy.ndarray, str, bool]
///     Pressure raster (float32, nodata -9999), the travel origins as a
///     GeoJSON FeatureCollection, and whether the tiled fallback was used
///
/// Raises
/// ------
/// ConfigurationError
///     If a layer is missing, grids disagree, or a constant is invalid
/// EmptySeedSetError
///     If the built-up mask yields no travel origin
/// ResourceExhaustedError
///     If the solve runs out of resources and no tiles were given
/// PartialTileFailureError
///     If any tile of the fallback fails
///
/// Notes
/// -----
/// The function releases the GIL during processing to allow other Python
/// threads to continue execution.
#[pyfunction]
#[pyo3(signature = (config_json, layers, transform, crs, tiles=None, seed=0, nodata=None))]
#[allow(clippy::too_many_arguments)]
pub fn compute_accessibility<'py>(
    py: Python<'py>,
    config_json: &str,
    layers: HashMap<String, PyReadonlyArray2<'py, f32>>,
    transform: [f64; 6],
    crs: &str,
    tiles: Option<Vec<(String, String)>>,
    seed: u64,
    nodata: Option<HashMap<String, f32>>,
) -> PyResult<(Bound<'py, PyArray2<f32>>, String, bool)> {
    let config = AccessibilityConfig::from_json_str(config_json).map_err(to_py_err)?;
    let nodata = nodata.unwrap_or_default();
    let source = layers
        .iter()
        .map(|(id, array)| {
            let grid = to_grid(array, transform, crs, nodata.get(id).copied())?;
            Ok((id.clone(), grid))
        })
        .collect::<PyResult<HashMap<_, _>>>()?;
    let tiles = tiles_from_wkt(tiles.unwrap_or_default())?;

    let layer = py
        .detach(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            compute_accessibility_pressure(&source, &config, &tiles, &mut rng)
        })
        .map_err(to_py_err)?;

    let seeds = layer.seeds.to_geojson_string().map_err(to_py_err)?;
    Ok((to_array(py, layer.pressure)?, seeds, layer.tiled))
}

/// Default configuration as JSON, for the given layer identifiers
#[pyfunction]
#[pyo3(signature = (slope, elevation, flood, crop, river, coast, built))]
pub fn default_config(
    slope: String,
    elevation: String,
    flood: String,
    crop: String,
    river: String,
    coast: String,
    built: String,
) -> PyResult<String> {
    let config = AccessibilityConfig::new(LayerIds {
        slope,
        elevation,
        flood,
        crop: MaskLayer::Presence(crop),
        river: MaskLayer::Presence(river),
        coast: MaskLayer::Presence(coast),
        built: MaskLayer::Presence(built),
        primary_roads: None,
        secondary_roads: None,
        tertiary_roads: None,
        extent: None,
    });
    config.to_json_string().map_err(to_py_err)
}
