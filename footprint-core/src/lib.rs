//! Accessibility pressure engine for human footprint maps.
//!
//! Builds a traversal-time surface from terrain and infrastructure layers,
//! extracts travel origins from built-up areas, solves a multi-source
//! cost-distance problem (falling back to tiles when the full extent does
//! not fit) and scores the resulting travel times.

pub mod algo;
pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;

pub use algo::cost::{CellAttributes, FloodClass, RoadClass, SpeedModel, build_cost_grid};
pub use algo::scoring::{ScoreParams, Scorer, score_grid};
pub use algo::sources::extract_seeds;
pub use loading::{
    AccessibilityConfig, LayerIds, MaskLayer, PressureLayer, RasterSource, SolverConfig,
    TileWindow, compute_accessibility_pressure, load_tile_windows,
};
pub use model::{CellWindow, GeoTransform, Grid, GridSpec, Seed, SeedSet};
pub use routing::cost_distance::{EdgeWeighting, SolveOptions, cost_distance};
pub use routing::tiling::{merge_tiles, solve_tiled};

/// Travel time in scaled integer units (tenths of a second by default)
pub type Time = u32;

/// Cost-grid nodata: the cell is impassable and excluded from the graph
pub const IMPASSABLE: Time = Time::MAX;

/// Cumulative-time nodata, carried over from impassable cost cells
pub const NODATA_TIME: Time = Time::MAX;

/// Cumulative time of a passable cell no seed can reach
pub const NEVER: Time = Time::MAX - 1;

/// Nodata value of pressure rasters
pub const PRESSURE_NODATA: f32 = -9999.0;

/// Per-cell traversal times
pub type CostGrid = Grid<Time>;

/// Minimum travel time from the nearest seed
pub type TimeGrid = Grid<Time>;

/// Final scored layer
pub type PressureRaster = Grid<f32>;
