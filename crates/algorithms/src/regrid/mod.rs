//! Regridding rasters onto a common grid
//!
//! Soil moisture reanalysis, soil depth products and DEM-derived slope come at
//! different resolutions; everything has to sit on one grid before the
//! landslide model runs. Methods:
//! - Nearest: value of the source cell whose centre is closest
//! - Bilinear: interpolation between the four surrounding source centres
//! - Conservative: overlap-area-weighted mean of the source cells
//!
//! [`GridResampler`] is the seam for plugging in an external regridding
//! service; [`NativeRegridder`] handles rotation-free grids in-process.

mod bilinear;
mod conservative;
mod nearest;

use std::fmt;
use std::str::FromStr;
use landslip_core::raster::{GeoTransform, Raster, RasterElement};
use landslip_core::{Algorithm, Error, Result};

/// Interpolation weighting used when regridding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegridMethod {
    /// Nearest source cell, clamped to the source extent
    #[default]
    Nearest,
    /// Bilinear between source cell centres; NaN outside the centre hull
    Bilinear,
    /// Area-weighted mean over overlapping source cells, normalised by the
    /// valid overlap
    Conservative,
}

impl FromStr for RegridMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nearest" | "nearest_s2d" | "nn" => Ok(RegridMethod::Nearest),
            "bilinear" | "linear" => Ok(RegridMethod::Bilinear),
            "conservative" | "area" => Ok(RegridMethod::Conservative),
            _ => Err(Error::InvalidParameter {
                name: "method",
                value: s.to_string(),
                reason: "expected nearest, bilinear or conservative".into(),
            }),
        }
    }
}

impl fmt::Display for RegridMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegridMethod::Nearest => "nearest",
            RegridMethod::Bilinear => "bilinear",
            RegridMethod::Conservative => "conservative",
        };
        f.write_str(name)
    }
}

/// Destination grid: shape plus georeferencing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetGrid {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
}

impl TargetGrid {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self { rows, cols, transform }
    }

    /// The grid of an existing raster
    pub fn like<T: RasterElement>(raster: &Raster<T>) -> Self {
        Self::new(raster.rows(), raster.cols(), *raster.transform())
    }

    fn matches<T: RasterElement>(&self, raster: &Raster<T>) -> bool {
        raster.shape() == (self.rows, self.cols) && *raster.transform() == self.transform
    }
}

/// Puts a source raster onto a destination grid.
///
/// Implementations are synchronous; the output has the target's shape and
/// transform and uses NaN for cells without a value.
pub trait GridResampler: Send + Sync {
    fn resample(&self, source: &Raster<f64>, target: &TargetGrid, method: RegridMethod) -> Result<Raster<f64>>;
}

/// In-process regridding for rotation-free grids
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRegridder;

impl GridResampler for NativeRegridder {
    fn resample(&self, source: &Raster<f64>, target: &TargetGrid, method: RegridMethod) -> Result<Raster<f64>> {
        validate_grids(source, target)?;

        let data = if target.matches(source) {
            source
                .data()
                .iter()
                .map(|&v| if source.is_nodata(v) { f64::NAN } else { v })
                .collect()
        } else {
            match method {
                RegridMethod::Nearest => nearest::resample(source, target),
                RegridMethod::Bilinear => bilinear::resample(source, target),
                RegridMethod::Conservative => conservative::resample(source, target),
            }
        };

        let mut output = Raster::from_vec(data, target.rows, target.cols)?;
        output.set_transform(target.transform);
        output.set_nodata(Some(f64::NAN));
        Ok(output)
    }
}

/// Regrid with [`NativeRegridder`]
pub fn regrid(source: &Raster<f64>, target: &TargetGrid, method: RegridMethod) -> Result<Raster<f64>> {
    NativeRegridder.resample(source, target, method)
}

/// Regrid algorithm
#[derive(Debug, Clone, Default)]
pub struct Regrid;

impl Algorithm for Regrid {
    type Input = (Raster<f64>, TargetGrid);
    type Output = Raster<f64>;
    type Params = RegridMethod;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Regrid"
    }

    fn description(&self) -> &'static str {
        "Resample a raster onto another grid (nearest, bilinear or conservative)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (source, target) = input;
        regrid(&source, &target, params)
    }
}

fn validate_grids(source: &Raster<f64>, target: &TargetGrid) -> Result<()> {
    if source.is_empty() {
        return Err(Error::InvalidDimensions {
            width: source.cols(),
            height: source.rows(),
        });
    }
    if target.rows == 0 || target.cols == 0 {
        return Err(Error::InvalidDimensions {
            width: target.cols,
            height: target.rows,
        });
    }

    for (name, gt) in [("source transform", source.transform()), ("target transform", &target.transform)] {
        if gt.is_rotated() {
            return Err(Error::InvalidParameter {
                name: "transform",
                value: format!("{:?}", gt),
                reason: format!("{} is rotated; only north-up grids are supported", name),
            });
        }
        if gt.pixel_width == 0.0 || gt.pixel_height == 0.0 || !gt.pixel_width.is_finite() || !gt.pixel_height.is_finite() {
            return Err(Error::InvalidParameter {
                name: "transform",
                value: format!("{:?}", gt),
                reason: format!("{} has a degenerate cell size", name),
            });
        }
    }
    Ok(())
}

/// Missing-aware read of a source cell
#[inline]
fn source_value(source: &Raster<f64>, row: usize, col: usize) -> Option<f64> {
    let v = unsafe { source.get_unchecked(row, col) };
    (!source.is_nodata(v)).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize, cell: f64) -> Raster<f64> {
        let data = (0..rows * cols).map(|i| i as f64).collect();
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * cell, cell, -cell));
        r
    }

    #[test]
    fn test_identity_on_same_grid() {
        let src = ramp(4, 5, 1.0);
        let target = TargetGrid::like(&src);
        for method in [RegridMethod::Nearest, RegridMethod::Bilinear, RegridMethod::Conservative] {
            let out = regrid(&src, &target, method).unwrap();
            assert_eq!(out.data(), src.data(), "{method} changed values");
            assert_eq!(out.transform(), src.transform());
        }
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("nearest_s2d".parse::<RegridMethod>().unwrap(), RegridMethod::Nearest);
        assert_eq!("Bilinear".parse::<RegridMethod>().unwrap(), RegridMethod::Bilinear);
        assert_eq!("conservative".parse::<RegridMethod>().unwrap(), RegridMethod::Conservative);
        assert!("cubic".parse::<RegridMethod>().is_err());
    }

    #[test]
    fn test_rejects_rotated_grid() {
        let src = ramp(2, 2, 1.0);
        let mut gt = GeoTransform::new(0.0, 2.0, 1.0, -1.0);
        gt.col_rotation = 0.2;
        let err = regrid(&src, &TargetGrid::new(2, 2, gt), RegridMethod::Nearest).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "transform", .. }));
    }

    #[test]
    fn test_rejects_empty_target() {
        let src = ramp(2, 2, 1.0);
        let target = TargetGrid::new(0, 3, *src.transform());
        assert!(regrid(&src, &target, RegridMethod::Bilinear).is_err());
    }

    #[test]
    fn test_output_takes_target_grid() {
        let src = ramp(4, 4, 1.0);
        let target = TargetGrid::new(8, 8, GeoTransform::new(0.0, 4.0, 0.5, -0.5));
        let out = Regrid.execute_default((src, target)).unwrap();
        assert_eq!(out.shape(), (8, 8));
        assert_eq!(*out.transform(), target.transform);
        assert!(out.nodata().unwrap().is_nan());
    }
}
