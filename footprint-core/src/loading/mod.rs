//! Configuration, tile windows and the end-to-end run builder.

mod builder;
mod config;
mod tiles;

pub use builder::{PressureLayer, RasterSource, compute_accessibility_pressure};
pub use config::{AccessibilityConfig, LayerIds, MaskLayer, SolverConfig};
pub use tiles::{TileWindow, load_tile_windows, tile_windows_from_geojson_str};
