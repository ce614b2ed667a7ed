//! Nearest-neighbour regridding

use crate::maybe_rayon::map_cells;
use landslip_core::raster::Raster;

use super::{source_value, TargetGrid};

/// Each target cell takes the source cell containing its centre. Centres
/// outside the source extent use the closest edge cell.
pub(super) fn resample(source: &Raster<f64>, target: &TargetGrid) -> Vec<f64> {
    let (rows, cols) = source.shape();
    let src_gt = source.transform();

    map_cells(target.rows, target.cols, |row, col| {
        let (x, y) = target.transform.pixel_to_geo(col, row);
        let (c, r) = src_gt.geo_to_pixel(x, y);
        source_value(source, clamp_index(r, rows), clamp_index(c, cols)).unwrap_or(f64::NAN)
    })
}

fn clamp_index(fractional: f64, len: usize) -> usize {
    if fractional.is_nan() || fractional < 0.0 {
        0
    } else {
        (fractional.floor() as usize).min(len - 1)
    }
}
