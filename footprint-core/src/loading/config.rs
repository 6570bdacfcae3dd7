use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::routing::{EdgeWeighting, SolveOptions};
use crate::{Error, Grid, ScoreParams, SpeedModel, Time};

const TENTHS_OF_SECOND_PER_HOUR: f64 = 36_000.0;

/// Reference to a raw input layer and how it becomes a membership mask
///
/// A plain string marks cells equal to 1 (rasterized vectors); the object
/// form keeps a class range `[low, high)` of a categorical raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaskLayer {
    Presence(String),
    Classes { id: String, low: f32, high: f32 },
}

impl MaskLayer {
    pub fn id(&self) -> &str {
        match self {
            MaskLayer::Presence(id) | MaskLayer::Classes { id, .. } => id,
        }
    }

    pub fn to_mask(&self, raw: &Grid<f32>) -> Grid<bool> {
        match *self {
            MaskLayer::Presence(_) => raw.presence_mask(),
            MaskLayer::Classes { low, high, .. } => raw.class_range_mask(low, high),
        }
    }
}

impl From<&str> for MaskLayer {
    fn from(id: &str) -> Self {
        MaskLayer::Presence(id.to_string())
    }
}

/// Identifiers of the input layers in a [`RasterSource`](super::RasterSource)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerIds {
    pub slope: String,
    pub elevation: String,
    pub flood: String,
    pub crop: MaskLayer,
    pub river: MaskLayer,
    pub coast: MaskLayer,
    pub built: MaskLayer,
    #[serde(default)]
    pub primary_roads: Option<MaskLayer>,
    #[serde(default)]
    pub secondary_roads: Option<MaskLayer>,
    #[serde(default)]
    pub tertiary_roads: Option<MaskLayer>,
    #[serde(default)]
    pub extent: Option<MaskLayer>,
}

impl LayerIds {
    fn masks(&self) -> impl Iterator<Item = (&'static str, &MaskLayer)> {
        let required = [
            ("crop", &self.crop),
            ("river", &self.river),
            ("coast", &self.coast),
            ("built", &self.built),
        ];
        let optional = [
            ("primary roads", self.primary_roads.as_ref()),
            ("secondary roads", self.secondary_roads.as_ref()),
            ("tertiary roads", self.tertiary_roads.as_ref()),
            ("extent", self.extent.as_ref()),
        ];
        required.into_iter().chain(
            optional
                .into_iter()
                .filter_map(|(role, layer)| layer.map(|layer| (role, layer))),
        )
    }

    fn all(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("slope", self.slope.as_str()),
            ("elevation", self.elevation.as_str()),
            ("flood", self.flood.as_str()),
        ]
        .into_iter()
        .chain(self.masks().map(|(role, layer)| (role, layer.id())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub memory_budget_bytes: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub edge_weighting: EdgeWeighting,
    /// Parallel tile solves; `None` uses one worker per core
    pub tile_workers: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: None,
            timeout_secs: None,
            edge_weighting: EdgeWeighting::Destination,
            tile_workers: None,
        }
    }
}

impl SolverConfig {
    pub fn solve_options(&self, max_time: Option<Time>) -> SolveOptions {
        SolveOptions {
            weighting: self.edge_weighting,
            memory_budget_bytes: self.memory_budget_bytes,
            timeout: self.timeout_secs.map(Duration::from_secs),
            max_time,
        }
    }
}

fn default_time_units_per_hour() -> f64 {
    TENTHS_OF_SECOND_PER_HOUR
}

/// Per-run constants and layer identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityConfig {
    #[serde(default)]
    pub speeds: SpeedModel,
    #[serde(default = "default_time_units_per_hour")]
    pub time_units_per_hour: f64,
    #[serde(default = "ScoreParams::proximity")]
    pub scoring: ScoreParams,
    #[serde(default)]
    pub solver: SolverConfig,
    pub layers: LayerIds,
}

impl AccessibilityConfig {
    /// Default constants for the given layers
    pub fn new(layers: LayerIds) -> Self {
        Self {
            speeds: SpeedModel::default(),
            time_units_per_hour: TENTHS_OF_SECOND_PER_HOUR,
            scoring: ScoreParams::proximity(),
            solver: SolverConfig::default(),
            layers,
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, Error> {
        serde_json::from_str(source)
            .map_err(|e| Error::Configuration(format!("malformed configuration: {e}")))
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("cannot serialize configuration: {e}")))
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.speeds.validate()?;
        self.scoring.validate()?;

        if !self.time_units_per_hour.is_finite() || self.time_units_per_hour <= 0.0 {
            return Err(Error::Configuration(format!(
                "time units per hour must be positive, got {}",
                self.time_units_per_hour
            )));
        }
        self.scoring.scorer(self.time_units_per_hour)?;
        if self.solver.tile_workers == Some(0) {
            return Err(Error::Configuration(
                "tile worker count must be at least 1".into(),
            ));
        }
        if self.solver.memory_budget_bytes == Some(0) {
            return Err(Error::Configuration("memory budget must be positive".into()));
        }
        if let Some((role, _)) = self.layers.all().find(|(_, id)| id.trim().is_empty()) {
            return Err(Error::Configuration(format!(
                "layer id for {role} must not be empty"
            )));
        }
        for (role, layer) in self.layers.masks() {
            if let MaskLayer::Classes { id, low, high } = layer
                && !(low < high)
            {
                return Err(Error::Configuration(format!(
                    "{role} classes of `{id}` must be an increasing range, got [{low}, {high})"
                )));
            }
        }
        Ok(())
    }
}
