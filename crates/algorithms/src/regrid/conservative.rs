//! Conservative (area-weighted) regridding

use crate::maybe_rayon::map_cells;
use landslip_core::raster::Raster;

use super::{source_value, TargetGrid};

/// Each target cell is the mean of the source cells it overlaps, weighted by
/// overlap area. Missing source cells drop out of both numerator and
/// denominator; a target cell with no valid overlap is NaN.
///
/// Overlaps are measured in source pixel units, which are proportional to
/// area on a rotation-free source grid.
pub(super) fn resample(source: &Raster<f64>, target: &TargetGrid) -> Vec<f64> {
    let (rows, cols) = source.shape();
    let src_gt = source.transform();

    map_cells(target.rows, target.cols, |row, col| {
        let (min_x, min_y, max_x, max_y) = target.transform.cell_bounds(col, row);
        let (ca, ra) = src_gt.geo_to_pixel(min_x, max_y);
        let (cb, rb) = src_gt.geo_to_pixel(max_x, min_y);

        let c0 = ca.min(cb).max(0.0);
        let c1 = ca.max(cb).min(cols as f64);
        let r0 = ra.min(rb).max(0.0);
        let r1 = ra.max(rb).min(rows as f64);
        if !(c1 > c0 && r1 > r0) {
            return f64::NAN;
        }

        let mut sum = 0.0;
        let mut weight = 0.0;
        for r in (r0.floor() as usize)..(r1.ceil() as usize).min(rows) {
            let dy = r1.min(r as f64 + 1.0) - r0.max(r as f64);
            for c in (c0.floor() as usize)..(c1.ceil() as usize).min(cols) {
                let dx = c1.min(c as f64 + 1.0) - c0.max(c as f64);
                let w = dx * dy;
                if w <= 0.0 {
                    continue;
                }
                if let Some(v) = source_value(source, r, c) {
                    sum += w * v;
                    weight += w;
                }
            }
        }

        if weight > 0.0 {
            sum / weight
        } else {
            f64::NAN
        }
    })
}
