// Re-export key components
pub use crate::loading::{
    AccessibilityConfig, LayerIds, MaskLayer, PressureLayer, RasterSource, SolverConfig,
    TileWindow, compute_accessibility_pressure, load_tile_windows,
};
pub use crate::model::{CellWindow, GeoTransform, Grid, GridSpec, Seed, SeedSet};
pub use crate::routing::{EdgeWeighting, SolveOptions, cost_distance, merge_tiles, solve_tiled};
pub use crate::{ScoreParams, SpeedModel, build_cost_grid, extract_seeds, score_grid};

// Grid value types and sentinels
pub use crate::{CostGrid, PressureRaster, Time, TimeGrid};
pub use crate::{IMPASSABLE, NEVER, NODATA_TIME, PRESSURE_NODATA};

pub use crate::Error;
