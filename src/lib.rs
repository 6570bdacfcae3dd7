use pyo3::prelude::*;

use pipeline::{compute_accessibility, default_config};
use routing::{cost_distance, cost_distance_tiled, py_load_tile_windows};
use stages::{extract_seeds, score};

pub mod error;
mod grid;
pub mod pipeline;
pub mod routing;
pub mod stages;

/// Accessibility pressure engine for human footprint maps.
#[pymodule]
fn footprint(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    error::register(m)?;
    m.add("IMPASSABLE", footprint_core::IMPASSABLE)?;
    m.add("NEVER", footprint_core::NEVER)?;
    m.add("NODATA_TIME", footprint_core::NODATA_TIME)?;
    m.add("PRESSURE_NODATA", footprint_core::PRESSURE_NODATA)?;

    m.add_function(wrap_pyfunction!(compute_accessibility, m)?)?;
    m.add_function(wrap_pyfunction!(default_config, m)?)?;

    m.add_function(wrap_pyfunction!(extract_seeds, m)?)?;
    m.add_function(wrap_pyfunction!(cost_distance, m)?)?;
    m.add_function(wrap_pyfunction!(cost_distance_tiled, m)?)?;
    m.add_function(wrap_pyfunction!(score, m)?)?;

    m.add_function(wrap_pyfunction!(py_load_tile_windows, m)?)?;
    Ok(())
}
