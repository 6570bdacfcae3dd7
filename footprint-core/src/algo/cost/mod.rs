//! Traversal-time model: environmental attributes to per-cell crossing time.

mod river;
mod speed;
mod surface;

pub use river::RiverSpeeds;
pub use speed::{CellAttributes, FloodClass, RoadClass, SpeedModel};
pub use surface::{CostLayers, build_cost_grid};
