use std::fs;
use std::path::Path;

use geo::Polygon;
use geojson::GeoJson;
use itertools::Itertools;
use log::{debug, info};

use crate::Error;

/// Named polygon window of the tiling fallback
#[derive(Debug, Clone, PartialEq)]
pub struct TileWindow {
    pub name: String,
    pub polygon: Polygon<f64>,
}

/// Polygons of one `GeoJSON` document as tiles
///
/// A document with a single polygon yields one tile called `name`; several
/// polygons (features or multipolygon parts) are suffixed `-0`, `-1`, ...
pub fn tile_windows_from_geojson_str(
    name: &str,
    source: &str,
) -> Result<Vec<TileWindow>, Error> {
    let parsed: GeoJson = source
        .parse()
        .map_err(|e: geojson::Error| Error::GeoJsonError(format!("tile `{name}`: {e}")))?;

    let geometries: Vec<geojson::Geometry> = match parsed {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect(),
        GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        GeoJson::Geometry(geometry) => vec![geometry],
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        let geometry = geo::Geometry::<f64>::try_from(geometry)
            .map_err(|e| Error::GeoJsonError(format!("tile `{name}`: {e}")))?;
        match geometry {
            geo::Geometry::Polygon(polygon) => polygons.push(polygon),
            geo::Geometry::MultiPolygon(multi) => polygons.extend(multi.0),
            other => {
                return Err(Error::GeoJsonError(format!(
                    "tile `{name}`: expected polygons, found {other:?}"
                )));
            }
        }
    }

    match polygons.len() {
        0 => Err(Error::InvalidData(format!("tile `{name}` has no polygon"))),
        1 => Ok(vec![TileWindow {
            name: name.to_string(),
            polygon: polygons.remove(0),
        }]),
        _ => Ok(polygons
            .into_iter()
            .enumerate()
            .map(|(part, polygon)| TileWindow {
                name: format!("{name}-{part}"),
                polygon,
            })
            .collect()),
    }
}

fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
}

/// Reads every `*.geojson` / `*.json` file of a directory, in file-name order
pub fn load_tile_windows(dir: impl AsRef<Path>) -> Result<Vec<TileWindow>, Error> {
    let dir = dir.as_ref();
    let paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| path.is_file() && is_geojson(path))
        .sorted();

    let mut tiles = Vec::new();
    for path in paths {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();
        let source = fs::read_to_string(&path)?;
        let windows = tile_windows_from_geojson_str(&name, &source)?;
        debug!("{} tile windows from {}", windows.len(), path.display());
        tiles.extend(windows);
    }

    if tiles.is_empty() {
        return Err(Error::Configuration(format!(
            "no tile windows found in {}",
            dir.display()
        )));
    }
    info!("Loaded {} tile windows from {}", tiles.len(), dir.display());
    Ok(tiles)
}
