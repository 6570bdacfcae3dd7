//! Travel origins and their point-collection interchange.

use geo::{BoundingRect, Contains, Point, Polygon, Rect};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryValue};
use rstar::{AABB, RTree, primitives::GeomWithData};
use serde_json::json;

use crate::Error;

/// Travel origin in projected coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub point: Point<f64>,
}

impl Seed {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
        }
    }
}

/// Ordered collection of seeds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSet {
    seeds: Vec<Seed>,
}

impl SeedSet {
    pub fn new(seeds: Vec<Seed>) -> Self {
        Self { seeds }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point<f64>>) -> Self {
        points.into_iter().map(|point| Seed { point }).collect()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Seed> {
        self.seeds.iter()
    }

    pub fn as_slice(&self) -> &[Seed] {
        &self.seeds
    }

    pub fn push(&mut self, seed: Seed) {
        self.seeds.push(seed);
    }

    /// R-tree over the seed positions for window queries
    pub fn spatial_index(&self) -> SeedIndex<'_> {
        let entries = self
            .seeds
            .iter()
            .enumerate()
            .map(|(idx, seed)| GeomWithData::new([seed.point.x(), seed.point.y()], idx))
            .collect();
        SeedIndex {
            seeds: self,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Points as a `GeoJSON` `FeatureCollection` with an `Id` per seed
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let features = self
            .seeds
            .iter()
            .enumerate()
            .map(|(id, seed)| {
                let geometry = Geometry::new(GeometryValue::from(&seed.point));
                let value = json!({
                    "type": "Feature",
                    "geometry": geometry,
                    "properties": { "Id": id },
                });
                serde_json::from_value::<Feature>(value)
                    .map_err(|e| Error::GeoJsonError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }

    /// Reads point features back, optionally keeping only those inside `bbox`
    pub fn from_geojson_str(source: &str, bbox: Option<Rect<f64>>) -> Result<Self, Error> {
        let parsed: GeoJson = source
            .parse()
            .map_err(|e: geojson::Error| Error::GeoJsonError(e.to_string()))?;

        let geometries: Vec<Geometry> = match parsed {
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .filter_map(|feature| feature.geometry)
                .collect(),
            GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
            GeoJson::Geometry(geometry) => vec![geometry],
        };

        let mut points = Vec::new();
        for geometry in geometries {
            let geometry = geo::Geometry::<f64>::try_from(geometry)
                .map_err(|e| Error::GeoJsonError(e.to_string()))?;
            match geometry {
                geo::Geometry::Point(point) => points.push(point),
                geo::Geometry::MultiPoint(multi) => points.extend(multi.0),
                other => {
                    return Err(Error::GeoJsonError(format!(
                        "expected point features, found {other:?}"
                    )));
                }
            }
        }

        Ok(points
            .into_iter()
            .filter(|point| bbox.is_none_or(|rect| rect.contains(point)))
            .collect())
    }
}

impl FromIterator<Seed> for SeedSet {
    fn from_iter<I: IntoIterator<Item = Seed>>(iter: I) -> Self {
        Self {
            seeds: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Point<f64>> for SeedSet {
    fn from_iter<I: IntoIterator<Item = Point<f64>>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

/// Spatial index borrowed from a [`SeedSet`]
pub struct SeedIndex<'a> {
    seeds: &'a SeedSet,
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl SeedIndex<'_> {
    fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        // keep the original seed order regardless of tree layout
        found.sort_unstable();
        found
    }

    /// Seeds strictly inside the polygon, in seed-set order
    pub fn within_polygon(&self, polygon: &Polygon<f64>) -> SeedSet {
        let Some(rect) = polygon.bounding_rect() else {
            return SeedSet::default();
        };
        self.candidates(&rect)
            .into_iter()
            .map(|idx| self.seeds.seeds[idx])
            .filter(|seed| polygon.contains(&seed.point))
            .collect()
    }
}
