use footprint_core::Error;
use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyOSError, PyValueError};
use pyo3::prelude::*;

create_exception!(
    footprint,
    FootprintError,
    PyException,
    "Base class of accessibility engine failures."
);
create_exception!(
    footprint,
    ConfigurationError,
    FootprintError,
    "Missing layer, broken common grid contract or invalid constant."
);
create_exception!(
    footprint,
    EmptySeedSetError,
    FootprintError,
    "The built-up mask produced no travel origin."
);
create_exception!(
    footprint,
    ResourceExhaustedError,
    FootprintError,
    "The solve exceeded its memory budget or timeout and no tiles were given."
);
create_exception!(
    footprint,
    PartialTileFailureError,
    FootprintError,
    "A tile of the fallback failed; no output was produced."
);

pub(crate) fn to_py_err(err: Error) -> PyErr {
    let message = err.to_string();
    match err {
        Error::Configuration(_) | Error::MissingLayer { .. } | Error::GridMismatch { .. } => {
            ConfigurationError::new_err(message)
        }
        Error::EmptySeedSet => EmptySeedSetError::new_err(message),
        Error::ResourceExhausted(_) => ResourceExhaustedError::new_err(message),
        Error::PartialTileFailure { .. } => PartialTileFailureError::new_err(message),
        Error::InvalidData(_) | Error::GeoJsonError(_) => PyValueError::new_err(message),
        Error::IoError(_) => PyOSError::new_err(message),
    }
}

pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add("FootprintError", py.get_type::<FootprintError>())?;
    m.add("ConfigurationError", py.get_type::<ConfigurationError>())?;
    m.add("EmptySeedSetError", py.get_type::<EmptySeedSetError>())?;
    m.add("ResourceExhaustedError", py.get_type::<ResourceExhaustedError>())?;
    m.add("PartialTileFailureError", py.get_type::<PartialTileFailureError>())?;
    Ok(())
}
