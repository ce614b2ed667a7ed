//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D raster grid.
///
/// Values are stored row-major as `(row, col)` in an [`Array2`], next to the
/// grid's [`GeoTransform`] and an optional no-data value. Rasters handed to the
/// landslide model are never modified in place; every algorithm returns a new
/// raster built with [`Raster::derive`].
///
/// # Example
///
/// ```ignore
/// use landslip_core::Raster;
///
/// let mut depth: Raster<f64> = Raster::filled(100, 100, 1.5);
/// depth.set(10, 20, 0.8)?;
/// assert_eq!(depth.get(10, 20)?, 0.8);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Build a raster on this raster's grid from row-major data.
    ///
    /// The transform is copied; the no-data value is not, since the derived
    /// values usually have a different meaning.
    pub fn derive<U: RasterElement>(&self, data: Vec<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        let mut output = Raster::from_vec(data, rows, cols)?;
        output.transform = self.transform;
        Ok(output)
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail with [`Error::SizeMismatch`] unless `other` has this raster's shape
    pub fn ensure_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// World bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Value checks

    /// Whether a value is NaN or equal to this raster's no-data value
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Calculate basic statistics over valid cells
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &value in self.data.iter().filter(|&&v| !self.is_nodata(v)) {
            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        RasterStatistics {
            min,
            max,
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
