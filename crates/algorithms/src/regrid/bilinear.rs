//! Bilinear regridding

use crate::maybe_rayon::map_cells;
use landslip_core::raster::Raster;

use super::{source_value, TargetGrid};

/// Slack for target centres that land on the outermost source centres
const EDGE_TOLERANCE: f64 = 1e-9;

/// Interpolate between the four source cell centres surrounding each target
/// centre. Target centres outside the hull of source centres, or whose
/// weighted neighbours include a missing value, are NaN.
pub(super) fn resample(source: &Raster<f64>, target: &TargetGrid) -> Vec<f64> {
    let (rows, cols) = source.shape();
    let src_gt = source.transform();

    map_cells(target.rows, target.cols, |row, col| {
        let (x, y) = target.transform.pixel_to_geo(col, row);
        let (c, r) = src_gt.geo_to_pixel(x, y);

        // Position relative to source cell centres
        let (Some(fc), Some(fr)) = (centre_offset(c, cols), centre_offset(r, rows)) else {
            return f64::NAN;
        };

        let c0 = fc.floor() as usize;
        let r0 = fr.floor() as usize;
        let c1 = (c0 + 1).min(cols - 1);
        let r1 = (r0 + 1).min(rows - 1);
        let tx = fc - c0 as f64;
        let ty = fr - r0 as f64;

        let corners = [
            (r0, c0, (1.0 - tx) * (1.0 - ty)),
            (r0, c1, tx * (1.0 - ty)),
            (r1, c0, (1.0 - tx) * ty),
            (r1, c1, tx * ty),
        ];

        let mut sum = 0.0;
        for (r, c, w) in corners {
            if w == 0.0 {
                continue;
            }
            match source_value(source, r, c) {
                Some(v) => sum += w * v,
                None => return f64::NAN,
            }
        }
        sum
    })
}

/// Fractional index measured from the first cell centre, or `None` outside
/// `[0, len - 1]`
fn centre_offset(fractional: f64, len: usize) -> Option<f64> {
    let offset = fractional - 0.5;
    let max = (len - 1) as f64;
    if offset.is_nan() || offset < -EDGE_TOLERANCE || offset > max + EDGE_TOLERANCE {
        None
    } else {
        Some(offset.clamp(0.0, max))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{regrid, RegridMethod};
    use super::*;
    use approx::assert_relative_eq;
    use landslip_core::GeoTransform;

    /// Plane z = 2x + 3y sampled at cell centres of a 5x5 grid of unit cells
    fn plane() -> Raster<f64> {
        let gt = GeoTransform::new(0.0, 5.0, 1.0, -1.0);
        let data = (0..5)
            .flat_map(|r| {
                (0..5).map(move |c| {
                    let (x, y) = gt.pixel_to_geo(c, r);
                    2.0 * x + 3.0 * y
                })
            })
            .collect();
        let mut raster = Raster::from_vec(data, 5, 5).unwrap();
        raster.set_transform(gt);
        raster
    }

    #[test]
    fn test_reproduces_linear_field() {
        let src = plane();
        let target = TargetGrid::new(6, 6, GeoTransform::new(1.0, 4.0, 0.5, -0.5));
        let out = regrid(&src, &target, RegridMethod::Bilinear).unwrap();

        for row in 0..6 {
            for col in 0..6 {
                let (x, y) = target.transform.pixel_to_geo(col, row);
                assert_relative_eq!(out.get(row, col).unwrap(), 2.0 * x + 3.0 * y, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_outside_centre_hull_is_missing() {
        let src = plane();
        // first target centre at (0.25, 4.75), outside the hull [0.5, 4.5]
        let target = TargetGrid::new(2, 2, GeoTransform::new(0.0, 5.0, 0.5, -0.5));
        let out = regrid(&src, &target, RegridMethod::Bilinear).unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        // (0.75, 4.25) is inside
        assert_relative_eq!(out.get(1, 1).unwrap(), 2.0 * 0.75 + 3.0 * 4.25, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_neighbour_is_missing() {
        let mut src = plane();
        src.set(2, 2, f64::NAN).unwrap();
        let target = TargetGrid::new(4, 4, GeoTransform::new(1.0, 4.0, 0.75, -0.75));
        let out = regrid(&src, &target, RegridMethod::Bilinear).unwrap();
        let missing = out.data().iter().filter(|v| v.is_nan()).count();
        assert!(missing > 0);
        assert!(missing < 16);
    }
}
