//! Shared fixtures: a small valley with two villages on a 100 m grid.

#![allow(dead_code)]

use std::collections::HashMap;

use footprint_core::prelude::*;
use geo::polygon;

pub const WIDTH: usize = 20;
pub const HEIGHT: usize = 10;
pub const RESOLUTION: f64 = 100.0;
pub const NODATA: f32 = -9999.0;

pub fn spec() -> GridSpec {
    GridSpec::new(
        WIDTH,
        HEIGHT,
        GeoTransform::north_up(500_000.0, 9_800_000.0, RESOLUTION, RESOLUTION),
        "EPSG:32717",
    )
}

pub fn filled(value: f32) -> Grid<f32> {
    Grid::filled(spec(), value, Some(NODATA))
}

/// Land cover with a two-cell village at each end of row 4
pub fn landcover() -> Grid<f32> {
    let mut grid = filled(1.0);
    for col in [2, 3, 16, 17] {
        grid.set(4, col, 7.0);
    }
    grid
}

pub fn source() -> HashMap<String, Grid<f32>> {
    HashMap::from([
        ("slope".to_string(), filled(2.0)),
        ("dem".to_string(), filled(300.0)),
        ("flood".to_string(), filled(0.0)),
        ("landcover".to_string(), landcover()),
        ("rivers".to_string(), filled(0.0)),
        ("coast".to_string(), filled(0.0)),
    ])
}

pub fn config() -> AccessibilityConfig {
    AccessibilityConfig::new(LayerIds {
        slope: "slope".into(),
        elevation: "dem".into(),
        flood: "flood".into(),
        crop: MaskLayer::Classes {
            id: "landcover".into(),
            low: 5.0,
            high: 6.0,
        },
        river: "rivers".into(),
        coast: "coast".into(),
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

/// Rectangular tile covering columns `[first, last)`
pub fn column_tile(name: &str, first: usize, last: usize) -> TileWindow {
    let transform = spec().transform;
    let top_left = transform.apply(first as f64, 0.0);
    let bottom_right = transform.apply(last as f64, HEIGHT as f64);
    TileWindow {
        name: name.to_string(),
        polygon: polygon![
            (x: top_left.x, y: top_left.y),
            (x: bottom_right.x, y: top_left.y),
            (x: bottom_right.x, y: bottom_right.y),
            (x: top_left.x, y: bottom_right.y),
        ],
    }
}

/// West and east halves overlapping over eight columns
pub fn overlapping_tiles() -> Vec<TileWindow> {
    vec![column_tile("east", 6, WIDTH), column_tile("west", 0, 14)]
}
