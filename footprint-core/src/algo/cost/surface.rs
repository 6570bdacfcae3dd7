use log::{info, warn};
use rayon::prelude::*;

use super::speed::{CellAttributes, FloodClass, RoadClass, SpeedModel};
use crate::{CostGrid, Error, Grid, IMPASSABLE};

/// Input layers of the cost surface, all on the common grid
#[derive(Debug, Clone, Copy)]
pub struct CostLayers<'a> {
    pub slope: &'a Grid<f32>,
    pub elevation: &'a Grid<f32>,
    /// Raw flood codes: 0 dry, 1 seasonal, 2 permanent
    pub flood: &'a Grid<f32>,
    pub crop: &'a Grid<bool>,
    pub river: &'a Grid<bool>,
    pub coast: &'a Grid<bool>,
    pub built: &'a Grid<bool>,
    pub primary_roads: Option<&'a Grid<bool>>,
    pub secondary_roads: Option<&'a Grid<bool>>,
    pub tertiary_roads: Option<&'a Grid<bool>>,
    /// Cells outside the study extent become impassable
    pub extent: Option<&'a Grid<bool>>,
}

impl CostLayers<'_> {
    fn validate(&self) -> Result<(), Error> {
        let spec = self.slope.spec();
        spec.ensure_matches(self.elevation.spec(), "elevation")?;
        spec.ensure_matches(self.flood.spec(), "flood")?;
        spec.ensure_matches(self.crop.spec(), "crop")?;
        spec.ensure_matches(self.river.spec(), "river")?;
        spec.ensure_matches(self.coast.spec(), "coast")?;
        spec.ensure_matches(self.built.spec(), "built")?;
        let optional = [
            ("primary roads", self.primary_roads),
            ("secondary roads", self.secondary_roads),
            ("tertiary roads", self.tertiary_roads),
            ("extent", self.extent),
        ];
        for (name, layer) in optional {
            if let Some(layer) = layer {
                spec.ensure_matches(layer.spec(), name)?;
            }
        }
        Ok(())
    }

    fn road_class(&self, index: usize) -> RoadClass {
        let on = |layer: Option<&Grid<bool>>| layer.is_some_and(|grid| grid.data()[index]);
        if on(self.primary_roads) {
            RoadClass::Primary
        } else if on(self.secondary_roads) {
            RoadClass::Secondary
        } else if on(self.tertiary_roads) {
            RoadClass::Tertiary
        } else {
            RoadClass::None
        }
    }

    /// Attributes of one cell; nodata terrain becomes NaN and walks
    pub fn attributes(&self, index: usize) -> CellAttributes {
        let terrain = |grid: &Grid<f32>| {
            let value = grid.data()[index];
            if grid.is_nodata(value) {
                f64::NAN
            } else {
                f64::from(value)
            }
        };
        CellAttributes {
            slope: terrain(self.slope),
            elevation: terrain(self.elevation),
            flood: FloodClass::from_code(self.flood.data()[index]),
            crop: self.crop.data()[index],
            river: self.river.data()[index],
            coast: self.coast.data()[index],
            road: self.road_class(index),
            built: self.built.data()[index],
        }
    }
}

/// Builds the per-cell traversal-time grid
///
/// Times are expressed in `1 / units_per_hour` hours; cells outside the
/// extent are [`IMPASSABLE`]. Out-of-range slope and elevation values are
/// clamped and reported once with their counts.
pub fn build_cost_grid(
    layers: &CostLayers<'_>,
    model: &SpeedModel,
    units_per_hour: f64,
) -> Result<CostGrid, Error> {
    layers.validate()?;
    model.validate()?;
    if !units_per_hour.is_finite() || units_per_hour <= 0.0 {
        return Err(Error::Configuration(format!(
            "time units per hour must be positive, got {units_per_hour}"
        )));
    }

    let spec = layers.slope.spec().clone();
    let cell_distance = spec.cell_distance();
    info!(
        "Building cost surface of {}x{} cells ({cell_distance:.1} m per cell)",
        spec.width, spec.height
    );

    report_clamped(layers.slope, model.slope_range, "slope");
    report_clamped(layers.elevation, model.elevation_range, "elevation");

    let data: Vec<_> = (0..spec.len())
        .into_par_iter()
        .map(|index| {
            if layers.extent.is_some_and(|extent| !extent.data()[index]) {
                return IMPASSABLE;
            }
            model.traversal_time(&layers.attributes(index), cell_distance, units_per_hour)
        })
        .collect();

    Grid::new(spec, data, Some(IMPASSABLE))
}

fn report_clamped(grid: &Grid<f32>, (low, high): (f64, f64), name: &str) {
    let clamped = grid
        .data()
        .par_iter()
        .filter(|&&raw| {
            let value = f64::from(raw);
            !grid.is_nodata(raw) && (value < low || value > high)
        })
        .count();
    if clamped > 0 {
        warn!("{clamped} {name} values outside [{low}, {high}] were clamped");
    }
}
