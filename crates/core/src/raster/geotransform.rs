//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation between pixel (col, row) and world (x, y) coordinates:
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// No CRS is attached. Two rasters are on the same grid when their transforms
/// and shapes agree; what the coordinates mean is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X
    pub pixel_width: f64,
    /// Cell size in Y, negative for north-up grids
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a rotation-free transform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// World coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.fractional_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// World coordinates of the pixel's top-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.fractional_to_geo(col as f64, row as f64)
    }

    fn fractional_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Fractional pixel coordinates (col, row) of a world point.
    ///
    /// Integer parts index the containing cell; NaN for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Whether either rotation term is non-zero
    pub fn is_rotated(&self) -> bool {
        self.row_rotation.abs() > 1e-12 || self.col_rotation.abs() > 1e-12
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of a single cell
    pub fn cell_bounds(&self, col: usize, row: usize) -> (f64, f64, f64, f64) {
        envelope([
            self.pixel_to_geo_corner(col, row),
            self.pixel_to_geo_corner(col + 1, row),
            self.pixel_to_geo_corner(col, row + 1),
            self.pixel_to_geo_corner(col + 1, row + 1),
        ])
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of a grid of the given size
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        envelope([
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ])
    }
}

fn envelope(corners: [(f64, f64); 4]) -> (f64, f64, f64, f64) {
    corners.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_x, min_y, max_x, max_y), &(x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    )
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
