//! Conversion between numpy arrays and engine grids.

use footprint_core::{GeoTransform, Grid, GridSpec};
use numpy::ndarray::Array2;
use numpy::{Element, IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::to_py_err;

/// Grid spec of a `(rows, cols)` array with a GDAL-ordered transform
pub(crate) fn grid_spec(shape: (usize, usize), transform: [f64; 6], crs: &str) -> GridSpec {
    let (height, width) = shape;
    GridSpec::new(width, height, GeoTransform::from_gdal(transform), crs)
}

pub(crate) fn to_grid<T: Element + Copy + PartialEq>(
    array: &PyReadonlyArray2<'_, T>,
    transform: [f64; 6],
    crs: &str,
    nodata: Option<T>,
) -> PyResult<Grid<T>> {
    let view = array.as_array();
    let spec = grid_spec(view.dim(), transform, crs);
    // logical row-major order regardless of the array's memory layout
    let data = view.iter().copied().collect();
    Grid::new(spec, data, nodata).map_err(to_py_err)
}

pub(crate) fn to_array<T: Element + Copy + PartialEq>(
    py: Python<'_>,
    grid: Grid<T>,
) -> PyResult<Bound<'_, PyArray2<T>>> {
    let shape = (grid.height(), grid.width());
    let array = Array2::from_shape_vec(shape, grid.into_data())
        .map_err(|e| PyValueError::new_err(format!("Failed to shape output grid: {e}")))?;
    Ok(array.into_pyarray(py))
}
