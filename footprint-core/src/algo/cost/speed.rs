use serde::{Deserialize, Serialize};

use super::river::RiverSpeeds;
use crate::{Error, IMPASSABLE, Time};

/// Flood regime of a cell, decoded from the flooded-areas raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloodClass {
    #[default]
    Dry,
    Seasonal,
    Permanent,
    /// Voids and unexpected codes
    Unknown,
}

impl FloodClass {
    pub fn from_code(code: f32) -> Self {
        match code {
            c if c == 0.0 => FloodClass::Dry,
            c if c == 1.0 => FloodClass::Seasonal,
            c if c == 2.0 => FloodClass::Permanent,
            _ => FloodClass::Unknown,
        }
    }
}

/// Road hierarchy, ordered so that the highest class wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RoadClass {
    #[default]
    None,
    Tertiary,
    Secondary,
    Primary,
}

/// Environmental attributes of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellAttributes {
    /// Degrees
    pub slope: f64,
    /// Metres
    pub elevation: f64,
    pub flood: FloodClass,
    pub crop: bool,
    pub river: bool,
    pub coast: bool,
    pub road: RoadClass,
    pub built: bool,
}

/// Travel speed model after Sierra's field measurements in Ecuador
///
/// Rules are applied as a cascade in which later rules override earlier
/// ones: terrain, crops, rivers, coast, roads, built-up areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedModel {
    pub slope_log_coefficient: f64,
    pub slope_intercept: f64,
    pub permanent_flood_factor: f64,
    pub crop_coefficient: f64,
    pub crop_exponent: f64,
    pub river: RiverSpeeds,
    /// Speed assigned to river cells the table cannot classify
    pub river_fallback_kmh: f64,
    pub coast_kmh: f64,
    pub primary_road_kmh: f64,
    pub secondary_road_kmh: f64,
    pub tertiary_road_kmh: f64,
    pub walking_kmh: f64,
    pub slope_range: (f64, f64),
    pub elevation_range: (f64, f64),
}

impl Default for SpeedModel {
    fn default() -> Self {
        Self {
            slope_log_coefficient: -0.975_931,
            slope_intercept: 6.761_258,
            permanent_flood_factor: 0.5,
            crop_coefficient: 10.560_326,
            crop_exponent: -0.199_553,
            river: RiverSpeeds::default(),
            river_fallback_kmh: 0.1,
            coast_kmh: 20.0,
            primary_road_kmh: 60.0,
            secondary_road_kmh: 40.0,
            tertiary_road_kmh: 30.0,
            walking_kmh: 4.0,
            slope_range: (1.8, 1000.0),
            elevation_range: (0.0, 10_000.0),
        }
    }
}

impl SpeedModel {
    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("permanent_flood_factor", self.permanent_flood_factor),
            ("crop_coefficient", self.crop_coefficient),
            ("river_fallback_kmh", self.river_fallback_kmh),
            ("coast_kmh", self.coast_kmh),
            ("primary_road_kmh", self.primary_road_kmh),
            ("secondary_road_kmh", self.secondary_road_kmh),
            ("tertiary_road_kmh", self.tertiary_road_kmh),
            ("walking_kmh", self.walking_kmh),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Configuration(format!(
                    "speed constant `{name}` must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("slope_log_coefficient", self.slope_log_coefficient),
            ("slope_intercept", self.slope_intercept),
            ("crop_exponent", self.crop_exponent),
        ] {
            if !value.is_finite() {
                return Err(Error::Configuration(format!(
                    "speed constant `{name}` must be finite"
                )));
            }
        }
        for (name, (low, high)) in [
            ("slope_range", self.slope_range),
            ("elevation_range", self.elevation_range),
        ] {
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(Error::Configuration(format!(
                    "`{name}` must be an increasing finite range, got ({low}, {high})"
                )));
            }
        }
        if self.slope_range.0 <= 0.0 {
            return Err(Error::Configuration(
                "slope range must start above zero for the log-slope regression".into(),
            ));
        }
        if !self.river.is_valid() {
            return Err(Error::Configuration(
                "river speed table needs ascending breaks and positive speeds".into(),
            ));
        }
        Ok(())
    }

    pub fn clamp_slope(&self, slope: f64) -> f64 {
        slope.clamp(self.slope_range.0, self.slope_range.1)
    }

    pub fn clamp_elevation(&self, elevation: f64) -> f64 {
        elevation.clamp(self.elevation_range.0, self.elevation_range.1)
    }

    /// Off-road walking speed on terrain of the given (clamped) slope
    pub fn terrain_speed(&self, slope: f64) -> f64 {
        self.slope_log_coefficient * slope.ln() + self.slope_intercept
    }

    /// Travel speed across a non-built cell in km/h
    pub fn speed_kmh(&self, cell: &CellAttributes) -> f64 {
        let slope = self.clamp_slope(cell.slope);
        let elevation = self.clamp_elevation(cell.elevation);

        let mut speed = match cell.flood {
            FloodClass::Dry | FloodClass::Seasonal => self.terrain_speed(slope),
            FloodClass::Permanent => self.permanent_flood_factor * self.terrain_speed(slope),
            FloodClass::Unknown => self.walking_kmh,
        };

        if cell.crop {
            speed = self.crop_coefficient * slope.powf(self.crop_exponent);
        }

        if cell.river {
            speed = self
                .river
                .lookup(elevation, slope)
                .unwrap_or(self.river_fallback_kmh);
        }

        if cell.coast {
            speed = self.coast_kmh;
        }

        speed = match cell.road {
            RoadClass::Primary => self.primary_road_kmh,
            RoadClass::Secondary => self.secondary_road_kmh,
            RoadClass::Tertiary => self.tertiary_road_kmh,
            RoadClass::None => speed,
        };

        if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            self.walking_kmh
        }
    }

    /// Time to cross a cell, in units of `1 / units_per_hour` hours
    ///
    /// Built cells are origins and cost nothing. Any traversed cell costs at
    /// least one unit.
    pub fn traversal_time(
        &self,
        cell: &CellAttributes,
        cell_distance_m: f64,
        units_per_hour: f64,
    ) -> Time {
        if cell.built {
            return 0;
        }
        let hours = cell_distance_m / 1000.0 / self.speed_kmh(cell);
        // float-to-int casts saturate, so only the upper sentinel needs reserving
        ((hours * units_per_hour) as Time).clamp(1, IMPASSABLE - 1)
    }
}
