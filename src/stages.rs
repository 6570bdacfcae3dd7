//! Individual pipeline stages for callers that persist intermediate grids.

use footprint_core::prelude::*;
use numpy::{PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::to_py_err;
use crate::grid::{to_array, to_grid};

/// Travel origins of a boolean built-up mask, as a GeoJSON FeatureCollection
#[pyfunction]
#[pyo3(signature = (built, transform, crs, seed=0))]
pub fn extract_seeds(
    py: Python<'_>,
    built: PyReadonlyArray2<'_, bool>,
    transform: [f64; 6],
    crs: &str,
    seed: u64,
) -> PyResult<String> {
    let built = to_grid(&built, transform, crs, None)?;
    let seeds = py.detach(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        footprint_core::extract_seeds(&built, &mut rng)
    });
    if seeds.is_empty() {
        return Err(to_py_err(Error::EmptySeedSet));
    }
    seeds.to_geojson_string().map_err(to_py_err)
}

/// Pressure scores of a cumulative-time grid
///
/// ``mode`` selects the ``proximity`` or ``indirect`` constants;
/// ``params_json`` replaces them entirely. ``built`` is required when the
/// built-cell override is active. ``time_units_per_hour`` is the unit of
/// ``times``; the default counts tenths of a second.
#[pyfunction]
#[pyo3(signature = (
    times,
    transform,
    crs,
    mode="proximity",
    built=None,
    params_json=None,
    time_units_per_hour=36_000.0
))]
#[allow(clippy::too_many_arguments)]
pub fn score<'py>(
    py: Python<'py>,
    times: PyReadonlyArray2<'py, u32>,
    transform: [f64; 6],
    crs: &str,
    mode: &str,
    built: Option<PyReadonlyArray2<'py, bool>>,
    params_json: Option<&str>,
    time_units_per_hour: f64,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let params = match (params_json, mode) {
        (Some(json), _) => serde_json::from_str(json)
            .map_err(|e| PyValueError::new_err(format!("Failed to parse score parameters: {e}")))?,
        (None, "proximity") => ScoreParams::proximity(),
        (None, "indirect") => ScoreParams::indirect(),
        (None, other) => {
            return Err(PyValueError::new_err(format!(
                "Unknown scoring mode `{other}`, expected `proximity` or `indirect`"
            )));
        }
    };
    let times = to_grid(&times, transform, crs, Some(NODATA_TIME))?;
    let built = built
        .map(|mask| to_grid(&mask, transform, crs, None))
        .transpose()?;

    let pressure = py
        .detach(|| score_grid(&times, built.as_ref(), &params, time_units_per_hour))
        .map_err(to_py_err)?;
    to_array(py, pressure)
}
