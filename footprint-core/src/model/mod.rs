//! Data model for raster accessibility analysis
//!
//! Contains georeferenced grids, cell windows and travel origins.

pub mod grid;
pub mod seeds;

pub use grid::{CellWindow, GeoTransform, Grid, GridSpec};
pub use seeds::{Seed, SeedIndex, SeedSet};
