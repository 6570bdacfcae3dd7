use std::collections::HashMap;
use std::hash::BuildHasher;

use log::{info, warn};
use rand::Rng;

use super::config::{AccessibilityConfig, MaskLayer};
use super::tiles::TileWindow;
use crate::algo::cost::CostLayers;
use crate::routing::{cost_distance, solve_tiled};
use crate::{Error, Grid, PressureRaster, SeedSet, build_cost_grid, extract_seeds, score_grid};

/// Read-only provider of raw input layers by identifier
///
/// Raster reading lives outside the engine; callers hand over already
/// decoded grids on the common grid.
pub trait RasterSource {
    fn layer(&self, id: &str) -> Option<&Grid<f32>>;
}

impl<S: BuildHasher> RasterSource for HashMap<String, Grid<f32>, S> {
    fn layer(&self, id: &str) -> Option<&Grid<f32>> {
        self.get(id)
    }
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct PressureLayer {
    pub pressure: PressureRaster,
    pub seeds: SeedSet,
    /// Whether the tiling fallback produced the travel times
    pub tiled: bool,
}

fn required<'a, S: RasterSource + ?Sized>(
    source: &'a S,
    role: &'static str,
    id: &str,
) -> Result<&'a Grid<f32>, Error> {
    source.layer(id).ok_or_else(|| Error::MissingLayer {
        role,
        id: id.to_string(),
    })
}

fn mask<S: RasterSource + ?Sized>(
    source: &S,
    role: &'static str,
    layer: &MaskLayer,
) -> Result<Grid<bool>, Error> {
    Ok(layer.to_mask(required(source, role, layer.id())?))
}

fn optional_mask<S: RasterSource + ?Sized>(
    source: &S,
    role: &'static str,
    layer: Option<&MaskLayer>,
) -> Result<Option<Grid<bool>>, Error> {
    layer.map(|layer| mask(source, role, layer)).transpose()
}

/// Runs the whole accessibility pipeline
///
/// Builds the cost surface, extracts seeds with `rng`, solves the full
/// extent and, when that runs out of resources, solves `tiles` instead.
/// Nothing is returned unless every stage completed.
///
/// # Errors
///
/// Configuration errors for missing or mismatched layers and bad constants,
/// [`Error::EmptySeedSet`] when the built-up mask yields no seed,
/// [`Error::ResourceExhausted`] when the full solve fails and no tiles were
/// given, [`Error::PartialTileFailure`] when any tile fails.
pub fn compute_accessibility_pressure<S, R>(
    source: &S,
    config: &AccessibilityConfig,
    tiles: &[TileWindow],
    rng: &mut R,
) -> Result<PressureLayer, Error>
where
    S: RasterSource + ?Sized,
    R: Rng + ?Sized,
{
    config.validate()?;
    let ids = &config.layers;

    let slope = required(source, "slope", &ids.slope)?;
    let elevation = required(source, "elevation", &ids.elevation)?;
    let flood = required(source, "flood", &ids.flood)?;
    let crop = mask(source, "crop", &ids.crop)?;
    let river = mask(source, "river", &ids.river)?;
    let coast = mask(source, "coast", &ids.coast)?;
    let built = mask(source, "built", &ids.built)?;
    let primary = optional_mask(source, "primary roads", ids.primary_roads.as_ref())?;
    let secondary = optional_mask(source, "secondary roads", ids.secondary_roads.as_ref())?;
    let tertiary = optional_mask(source, "tertiary roads", ids.tertiary_roads.as_ref())?;
    let extent = optional_mask(source, "extent", ids.extent.as_ref())?;

    let layers = CostLayers {
        slope,
        elevation,
        flood,
        crop: &crop,
        river: &river,
        coast: &coast,
        built: &built,
        primary_roads: primary.as_ref(),
        secondary_roads: secondary.as_ref(),
        tertiary_roads: tertiary.as_ref(),
        extent: extent.as_ref(),
    };
    let cost = build_cost_grid(&layers, &config.speeds, config.time_units_per_hour)?;
    drop((crop, river, coast, primary, secondary, tertiary, extent));

    let seeds = extract_seeds(&built, rng);
    if seeds.is_empty() {
        return Err(Error::EmptySeedSet);
    }

    // Times past the horizon all score zero
    let horizon = config.scoring.scorer(config.time_units_per_hour)?.horizon();
    let options = config.solver.solve_options(Some(horizon));
    info!("Solving cost distance from {} seeds", seeds.len());
    let (times, tiled) = match cost_distance(&cost, &seeds, &options) {
        Ok(times) => (times, false),
        Err(err) if err.is_resource_exhausted() && !tiles.is_empty() => {
            warn!("{err}; falling back to {} tiles", tiles.len());
            let times = solve_tiled(&cost, &seeds, tiles, &options, config.solver.tile_workers)?;
            (times, true)
        }
        Err(err) => return Err(err),
    };
    drop(cost);

    let pressure = score_grid(
        &times,
        Some(&built),
        &config.scoring,
        config.time_units_per_hour,
    )?;
    drop(times);
    info!("Accessibility pressure computed");

    // Cost, time and mask grids are full-extent allocations; hand the freed
    // heap tail back to the system.
    //
    // # Safety
    //
    // Only compiled on linux with glibc, where `malloc_trim` is available.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        if libc::malloc_trim(0) == 0 {
            log::warn!("Memory trimming failed - continuing anyway");
        } else {
            log::debug!("Successfully trimmed unused heap memory");
        }
    }

    Ok(PressureLayer {
        pressure,
        seeds,
        tiled,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::loading::LayerIds;
    use crate::{GeoTransform, GridSpec, PRESSURE_NODATA};

    fn spec() -> GridSpec {
        GridSpec::new(
            5,
            3,
            GeoTransform::north_up(0.0, 0.0, 100.0, 100.0),
            "EPSG:32717",
        )
    }

    fn source() -> HashMap<String, Grid<f32>> {
        let filled = |value: f32| Grid::filled(spec(), value, Some(-9999.0));
        let mut landcover = filled(1.0);
        landcover.set(1, 0, 7.0);
        landcover.set(1, 1, 7.0);
        HashMap::from([
            ("slope".to_string(), filled(2.0)),
            ("dem".to_string(), filled(300.0)),
            ("flood".to_string(), filled(0.0)),
            ("landcover".to_string(), landcover),
            ("empty".to_string(), filled(0.0)),
        ])
    }

    fn config() -> AccessibilityConfig {
        AccessibilityConfig::new(LayerIds {
            slope: "slope".into(),
            elevation: "dem".into(),
            flood: "flood".into(),
            crop: MaskLayer::Classes {
                id: "landcover".into(),
                low: 5.0,
                high: 6.0,
            },
            river: "empty".into(),
            coast: "empty".into(),
            built: MaskLayer::Classes {
                id: "landcover".into(),
                low: 6.0,
                high: 15.0,
            },
            primary_roads: None,
            secondary_roads: None,
            tertiary_roads: None,
            extent: None,
        })
    }

    fn run(
        source: &HashMap<String, Grid<f32>>,
        config: &AccessibilityConfig,
    ) -> Result<PressureLayer, Error> {
        compute_accessibility_pressure(source, config, &[], &mut ChaCha8Rng::seed_from_u64(1))
    }

    #[test]
    fn scores_decay_away_from_the_settlement() {
        let layer = run(&source(), &config()).unwrap();
        assert!(!layer.tiled);
        assert_eq!(layer.seeds.len(), 1);

        let pressure = &layer.pressure;
        let seed_cell = pressure.spec().cell_at(layer.seeds.as_slice()[0].point).unwrap();
        assert_eq!(pressure.get(seed_cell.0, seed_cell.1), Some(7.5));
        let near = pressure.get(1, 2).unwrap();
        let far = pressure.get(1, 4).unwrap();
        assert!(near > far && far > 0.0);
        assert!(pressure.data().iter().all(|&v| v != PRESSURE_NODATA));
    }

    #[test]
    fn missing_layer_names_its_role() {
        let mut source = source();
        source.remove("dem");
        let err = run(&source, &config()).unwrap_err();
        assert!(matches!(err, Error::MissingLayer { role: "elevation", ref id } if id == "dem"));
    }

    #[test]
    fn no_settlement_is_an_empty_seed_set() {
        let mut config = config();
        config.layers.built = "empty".into();
        let err = run(&source(), &config).unwrap_err();
        assert!(matches!(err, Error::EmptySeedSet));
    }

    #[test]
    fn exhaustion_without_tiles_propagates() {
        let mut config = config();
        config.solver.memory_budget_bytes = Some(8);
        let err = run(&source(), &config).unwrap_err();
        assert!(err.is_resource_exhausted());
    }
}
