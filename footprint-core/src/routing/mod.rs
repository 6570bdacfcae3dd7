pub mod cost_distance;
pub mod tiling;

pub use cost_distance::{EdgeWeighting, SolveOptions, cost_distance, estimated_solve_bytes};
pub use tiling::{TileSolution, clip_to_tile, concurrent_tiles, merge_tiles, solve_tiled};
