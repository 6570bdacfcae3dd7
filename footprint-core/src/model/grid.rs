//! Georeferenced raster grids and the common grid contract.

use geo::{Coord, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::Error;

const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Affine pixel-to-world transform in GDAL coefficient order
///
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * col_rotation + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(coefficients: [f64; 6]) -> Self {
        let [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height] =
            coefficients;
        Self {
            origin_x,
            pixel_width,
            row_rotation,
            origin_y,
            col_rotation,
            pixel_height,
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// North-up transform with square-ish cells, `origin` being the top-left corner
    pub fn north_up(origin_x: f64, origin_y: f64, res_x: f64, res_y: f64) -> Self {
        Self::from_gdal([origin_x, res_x.abs(), 0.0, origin_y, 0.0, -res_y.abs()])
    }

    /// World coordinate of a fractional pixel position
    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + col * self.pixel_width + row * self.row_rotation,
            y: self.origin_y + col * self.col_rotation + row * self.pixel_height,
        }
    }

    /// Fractional `(col, row)` pixel position of a world coordinate
    pub fn invert(&self, coord: Coord<f64>) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }
        let dx = coord.x - self.origin_x;
        let dy = coord.y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (self.pixel_width * dy - self.col_rotation * dx) / det;
        Some((col, row))
    }

    /// Projected coordinate of a cell centre
    pub fn cell_center(&self, row: usize, col: usize) -> Point<f64> {
        Point::from(self.apply(col as f64 + 0.5, row as f64 + 0.5))
    }

    /// Absolute cell size along x and y in map units
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.col_rotation),
            self.row_rotation.hypot(self.pixel_height),
        )
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= TRANSFORM_TOLERANCE * a.abs().max(b.abs()).max(1.0))
    }
}

/// Rectangular block of cells inside a larger grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub height: usize,
    pub width: usize,
}

impl CellWindow {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Maps a window-local position to the parent grid
    pub fn to_parent(&self, row: usize, col: usize) -> (usize, usize) {
        (row + self.row_off, col + self.col_off)
    }
}

/// Shape, georeferencing and CRS shared by every grid of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: String,
}

impl GridSpec {
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        crs: impl Into<String>,
    ) -> Self {
        Self {
            width,
            height,
            transform,
            crs: crs.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    /// Mean cell size, the distance crossed when traversing one cell
    pub fn cell_distance(&self) -> f64 {
        let (res_x, res_y) = self.transform.resolution();
        (res_x + res_y) / 2.0
    }

    /// Checks the common grid contract: identical shape, transform and CRS
    pub fn ensure_matches(&self, other: &GridSpec, layer: &str) -> Result<(), Error> {
        let mismatch = |reason: String| Error::GridMismatch {
            layer: layer.to_string(),
            reason,
        };
        if self.width != other.width || self.height != other.height {
            return Err(mismatch(format!(
                "shape {}x{} differs from {}x{}",
                other.width, other.height, self.width, self.height
            )));
        }
        if !self.transform.approx_eq(&other.transform) {
            return Err(mismatch(format!(
                "transform {:?} differs from {:?}",
                other.transform.to_gdal(),
                self.transform.to_gdal()
            )));
        }
        if self.crs != other.crs {
            return Err(mismatch(format!(
                "CRS `{}` differs from `{}`",
                other.crs, self.crs
            )));
        }
        Ok(())
    }

    /// Cell containing a projected point, if inside the grid
    pub fn cell_at(&self, point: Point<f64>) -> Option<(usize, usize)> {
        let (col, row) = self.transform.invert(point.0)?;
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.height && col < self.width).then_some((row, col))
    }

    /// Spec of a sub-window, with the transform shifted to the window origin
    pub fn window(&self, window: &CellWindow) -> GridSpec {
        let origin = self
            .transform
            .apply(window.col_off as f64, window.row_off as f64);
        GridSpec {
            width: window.width,
            height: window.height,
            transform: GeoTransform {
                origin_x: origin.x,
                origin_y: origin.y,
                ..self.transform
            },
            crs: self.crs.clone(),
        }
    }

    /// Smallest cell window covering a projected rectangle, clamped to the grid
    pub fn window_for_rect(&self, rect: &Rect<f64>) -> Option<CellWindow> {
        let corners = [
            rect.min(),
            rect.max(),
            Coord {
                x: rect.min().x,
                y: rect.max().y,
            },
            Coord {
                x: rect.max().x,
                y: rect.min().y,
            },
        ];
        let mut min_col = f64::INFINITY;
        let mut min_row = f64::INFINITY;
        let mut max_col = f64::NEG_INFINITY;
        let mut max_row = f64::NEG_INFINITY;
        for corner in corners {
            let (col, row) = self.transform.invert(corner)?;
            min_col = min_col.min(col);
            min_row = min_row.min(row);
            max_col = max_col.max(col);
            max_row = max_row.max(row);
        }

        let col_start = min_col.floor().max(0.0) as usize;
        let row_start = min_row.floor().max(0.0) as usize;
        let col_end = (max_col.ceil().max(0.0) as usize).min(self.width);
        let row_end = (max_row.ceil().max(0.0) as usize).min(self.height);
        if col_start >= col_end || row_start >= row_end {
            return None;
        }
        Some(CellWindow {
            row_off: row_start,
            col_off: col_start,
            height: row_end - row_start,
            width: col_end - col_start,
        })
    }
}

/// Row-major raster with an optional nodata value
#[derive(Debug, Clone)]
pub struct Grid<T> {
    spec: GridSpec,
    data: Vec<T>,
    nodata: Option<T>,
}

impl<T: Copy + PartialEq> Grid<T> {
    pub fn new(spec: GridSpec, data: Vec<T>, nodata: Option<T>) -> Result<Self, Error> {
        if data.len() != spec.len() {
            return Err(Error::InvalidData(format!(
                "grid of {}x{} needs {} cells, got {}",
                spec.width,
                spec.height,
                spec.len(),
                data.len()
            )));
        }
        Ok(Self { spec, data, nodata })
    }

    pub fn filled(spec: GridSpec, value: T, nodata: Option<T>) -> Self {
        let data = vec![value; spec.len()];
        Self { spec, data, nodata }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn width(&self) -> usize {
        self.spec.width
    }

    pub fn height(&self) -> usize {
        self.spec.height
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        (row < self.spec.height && col < self.spec.width)
            .then(|| self.data[self.spec.index(row, col)])
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let index = self.spec.index(row, col);
        self.data[index] = value;
    }

    pub fn is_nodata(&self, value: T) -> bool {
        self.nodata == Some(value)
    }

    /// Cell-wise conversion on the same grid
    pub fn map<U: Copy + PartialEq>(&self, nodata: Option<U>, f: impl Fn(T) -> U) -> Grid<U> {
        Grid {
            spec: self.spec.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
            nodata,
        }
    }

    /// Boolean membership mask; nodata cells are never members
    pub fn mask_where(&self, predicate: impl Fn(T) -> bool) -> Grid<bool> {
        let nodata = self.nodata;
        self.map(None, |v| Some(v) != nodata && predicate(v))
    }

    /// Copies a window into a standalone grid
    pub fn crop(&self, window: &CellWindow) -> Grid<T> {
        let mut data = Vec::with_capacity(window.len());
        for row in window.row_off..window.row_off + window.height {
            let start = self.spec.index(row, window.col_off);
            data.extend_from_slice(&self.data[start..start + window.width]);
        }
        Grid {
            spec: self.spec.window(window),
            data,
            nodata: self.nodata,
        }
    }
}

impl Grid<f32> {
    /// Membership of rasterized vectors: cells equal to 1
    pub fn presence_mask(&self) -> Grid<bool> {
        self.mask_where(|v| v == 1.0)
    }

    /// Membership of a class range `[low, high)`, used to reclassify land cover
    pub fn class_range_mask(&self, low: f32, high: f32) -> Grid<bool> {
        self.mask_where(|v| v >= low && v < high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(width: usize, height: usize) -> GridSpec {
        GridSpec::new(
            width,
            height,
            GeoTransform::north_up(1000.0, 5000.0, 30.0, 30.0),
            "EPSG:32717",
        )
    }

    #[test]
    fn cell_center_and_lookup_agree() {
        let spec = spec(4, 3);
        let center = spec.transform.cell_center(2, 1);
        assert_eq!(center, Point::new(1045.0, 4925.0));
        assert_eq!(spec.cell_at(center), Some((2, 1)));
        assert_eq!(spec.cell_at(Point::new(999.0, 4990.0)), None);
        assert_eq!(spec.cell_at(Point::new(1121.0, 4990.0)), None);
    }

    #[test]
    fn contract_detects_each_mismatch() {
        let base = spec(4, 3);
        assert!(base.ensure_matches(&spec(4, 3), "slope").is_ok());

        let err = base.ensure_matches(&spec(5, 3), "slope").unwrap_err();
        assert!(matches!(err, Error::GridMismatch { ref layer, .. } if layer == "slope"));

        let mut shifted = spec(4, 3);
        shifted.transform.origin_x += 30.0;
        assert!(base.ensure_matches(&shifted, "elevation").is_err());

        let mut other_crs = spec(4, 3);
        other_crs.crs = "EPSG:4326".into();
        assert!(base.ensure_matches(&other_crs, "flood").is_err());
    }

    #[test]
    fn contract_tolerates_float_noise() {
        let base = spec(4, 3);
        let mut noisy = spec(4, 3);
        noisy.transform.origin_y += 1e-7;
        assert!(base.ensure_matches(&noisy, "coast").is_ok());
    }

    #[test]
    fn crop_shifts_transform() {
        let spec = spec(4, 3);
        let grid = Grid::new(spec, (0..12).collect::<Vec<u32>>(), None).unwrap();
        let window = CellWindow {
            row_off: 1,
            col_off: 2,
            height: 2,
            width: 2,
        };
        let cropped = grid.crop(&window);
        assert_eq!(cropped.data(), &[6, 7, 10, 11]);
        assert_eq!(
            cropped.spec().transform.cell_center(0, 0),
            grid.spec().transform.cell_center(1, 2)
        );
    }

    #[test]
    fn window_for_rect_clamps_to_grid() {
        let spec = spec(4, 3);
        let rect = Rect::new(Coord { x: 1040.0, y: 4900.0 }, Coord { x: 2000.0, y: 6000.0 });
        let window = spec.window_for_rect(&rect).unwrap();
        assert_eq!(
            window,
            CellWindow {
                row_off: 0,
                col_off: 1,
                height: 3,
                width: 3,
            }
        );

        let outside = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        assert!(spec.window_for_rect(&outside).is_none());
    }

    #[test]
    fn masks_skip_nodata() {
        let grid = Grid::new(spec(3, 1), vec![1.0f32, 7.0, -1.0], Some(-1.0)).unwrap();
        assert_eq!(grid.presence_mask().data(), &[true, false, false]);
        assert_eq!(grid.class_range_mask(6.0, 15.0).data(), &[false, true, false]);
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert!(matches!(
            Grid::new(spec(2, 2), vec![0u32; 3], None),
            Err(Error::InvalidData(_))
        ));
    }
}
