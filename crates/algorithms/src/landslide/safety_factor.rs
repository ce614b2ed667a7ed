//! Factor of safety of an infinite slope
//!
//! ```text
//! FS = (C_r + C_s) / (h_s · ρ_s · g · sin β)
//!    + cos β · tan φ · (1 − (h_w / h_s) · ρ_w / ρ_s) / sin β
//! ```
//!
//! `β` slope angle, `h_s` soil depth, `h_w` subsurface flow depth, `φ` internal
//! friction angle. FS < 1 predicts failure.
//!
//! The relative wetness `h_w / h_s` is used as is. Porosity below one can push
//! it past 1, which makes the friction term negative.

use std::fmt;
use crate::maybe_rayon::map_cells;
use landslip_core::raster::Raster;
use landslip_core::{Algorithm, Error, Result};

use super::material::MaterialParams;

/// `|sin β|` below this is treated as a horizontal (or overturned) cell
const SIN_SLOPE_EPSILON: f64 = 1e-12;

/// Angular unit of an input slope raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    #[default]
    Radians,
    /// Degrees, as written by most DEM slope tools
    Degrees,
}

/// Convert a slope raster to radians. Missing cells stay missing.
pub fn slope_to_radians(slope: &Raster<f64>, units: SlopeUnits) -> Result<Raster<f64>> {
    if units == SlopeUnits::Radians {
        return Ok(slope.clone());
    }

    let (rows, cols) = slope.shape();
    let data = map_cells(rows, cols, |row, col| {
        let v = unsafe { slope.get_unchecked(row, col) };
        if slope.is_nodata(v) {
            f64::NAN
        } else {
            v.to_radians()
        }
    });

    let mut output = slope.derive(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Safety factor algorithm
#[derive(Debug, Clone, Default)]
pub struct SafetyFactor;

impl Algorithm for SafetyFactor {
    /// Slope angle (radians), subsurface flow depth, soil depth
    type Input = (Raster<f64>, Raster<f64>, Raster<f64>);
    type Output = Raster<f64>;
    type Params = MaterialParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Safety factor"
    }

    fn description(&self) -> &'static str {
        "Infinite-slope factor of safety from slope, subsurface flow depth and soil depth"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (slope_angle, flow_depth, soil_depth) = input;
        safety_factor(&slope_angle, &flow_depth, &soil_depth, &params)
    }
}

/// Compute the factor of safety for every cell.
///
/// # Arguments
/// * `slope_angle` - Slope in radians
/// * `flow_depth` - Subsurface flow depth (see [`super::subsurface_flow_depth`])
/// * `soil_depth` - Soil depth, same unit as `flow_depth`
/// * `params` - Material constants
///
/// # Returns
/// Dimensionless FS raster on the slope grid. A cell where any input is
/// missing is NaN; every other cell is finite.
///
/// # Errors
/// * [`Error::SizeMismatch`] if the three rasters differ in shape
/// * [`Error::InvalidParameter`] if the material constants are unusable
/// * [`Error::SingularCell`] for the first cell (row-major) with a
///   non-finite input, soil depth ≤ 0 or zero `sin(slope)`. All cells are
///   checked before any output is computed.
pub fn safety_factor(
    slope_angle: &Raster<f64>,
    flow_depth: &Raster<f64>,
    soil_depth: &Raster<f64>,
    params: &MaterialParams,
) -> Result<Raster<f64>> {
    params.validate()?;
    slope_angle.ensure_same_shape(flow_depth)?;
    slope_angle.ensure_same_shape(soil_depth)?;
    check_singular_cells(slope_angle, flow_depth, soil_depth)?;

    let (rows, cols) = slope_angle.shape();
    let tan_phi = params.tan_friction();
    let cohesion = params.total_cohesion();
    let bulk_density = params.soil_bulk_density;

    let data = map_cells(rows, cols, |row, col| {
        let (beta, hw, hs) = match evaluated_cell(slope_angle, flow_depth, soil_depth, row, col) {
            Some(cell) => cell,
            None => return f64::NAN,
        };

        let (sin_beta, cos_beta) = beta.sin_cos();
        let relative_wetness = hw / hs;

        let cohesion_term = cohesion / (hs * bulk_density * params.gravity) / sin_beta;
        let friction_term =
            cos_beta * tan_phi * (1.0 - relative_wetness * params.water_density / bulk_density) / sin_beta;

        cohesion_term + friction_term
    });

    let mut output = slope_angle.derive(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Inputs at (row, col), or `None` when any of them is missing
#[inline]
fn evaluated_cell(
    slope_angle: &Raster<f64>,
    flow_depth: &Raster<f64>,
    soil_depth: &Raster<f64>,
    row: usize,
    col: usize,
) -> Option<(f64, f64, f64)> {
    let beta = unsafe { slope_angle.get_unchecked(row, col) };
    let hw = unsafe { flow_depth.get_unchecked(row, col) };
    let hs = unsafe { soil_depth.get_unchecked(row, col) };

    if slope_angle.is_nodata(beta) || flow_depth.is_nodata(hw) || soil_depth.is_nodata(hs) {
        None
    } else {
        Some((beta, hw, hs))
    }
}

fn check_singular_cells(slope_angle: &Raster<f64>, flow_depth: &Raster<f64>, soil_depth: &Raster<f64>) -> Result<()> {
    let (rows, cols) = slope_angle.shape();

    for row in 0..rows {
        for col in 0..cols {
            let Some((beta, hw, hs)) = evaluated_cell(slope_angle, flow_depth, soil_depth, row, col) else {
                continue;
            };

            for (input, value) in [("slope_angle", beta), ("flow_depth", hw), ("soil_depth", hs)] {
                if !value.is_finite() {
                    return Err(Error::SingularCell {
                        input,
                        row,
                        col,
                        value,
                        reason: "value is not finite",
                    });
                }
            }
            if hs <= 0.0 {
                return Err(Error::SingularCell {
                    input: "soil_depth",
                    row,
                    col,
                    value: hs,
                    reason: "soil depth must be > 0",
                });
            }
            if beta.sin().abs() < SIN_SLOPE_EPSILON {
                return Err(Error::SingularCell {
                    input: "slope_angle",
                    row,
                    col,
                    value: beta,
                    reason: "sin(slope) is zero",
                });
            }
        }
    }
    Ok(())
}

/// Stable / unstable cell counts of a safety factor raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilitySummary {
    /// Cells with FS ≥ 1
    pub stable: usize,
    /// Cells with FS < 1
    pub unstable: usize,
    /// Cells without a value
    pub missing: usize,
    /// Smallest FS, if any cell was evaluated
    pub min: Option<f64>,
}

impl StabilitySummary {
    pub fn from_raster(fs: &Raster<f64>) -> Self {
        let mut summary = Self {
            stable: 0,
            unstable: 0,
            missing: 0,
            min: None,
        };

        for &v in fs.data().iter() {
            if fs.is_nodata(v) {
                summary.missing += 1;
                continue;
            }
            if v < 1.0 {
                summary.unstable += 1;
            } else {
                summary.stable += 1;
            }
            summary.min = Some(summary.min.map_or(v, |m: f64| m.min(v)));
        }
        summary
    }

    /// Share of evaluated cells predicted to fail
    pub fn unstable_fraction(&self) -> Option<f64> {
        let evaluated = self.stable + self.unstable;
        (evaluated > 0).then(|| self.unstable as f64 / evaluated as f64)
    }
}

impl fmt::Display for StabilitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unstable (FS < 1): {}, stable: {}, missing: {}",
            self.unstable, self.stable, self.missing
        )?;
        if let Some(fraction) = self.unstable_fraction() {
            write!(f, " ({:.1}% unstable)", fraction * 100.0)?;
        }
        if let Some(min) = self.min {
            write!(f, ", min FS: {:.3}", min)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_4, FRAC_PI_6, PI};

    fn grid(value: f64) -> Raster<f64> {
        Raster::filled(3, 3, value)
    }

    fn frictional_only() -> MaterialParams {
        MaterialParams {
            root_cohesion: 0.0,
            soil_cohesion: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_worked_example_without_cohesion() {
        let fs = safety_factor(&grid(FRAC_PI_4), &grid(0.2), &grid(1.0), &frictional_only()).unwrap();
        assert_relative_eq!(fs.get(1, 1).unwrap(), 0.5924833015620621, epsilon = 1e-12);
    }

    #[test]
    fn test_default_cohesion_adds_term() {
        let fs = safety_factor(&grid(FRAC_PI_4), &grid(0.2), &grid(1.0), &MaterialParams::default()).unwrap();
        let cohesion_term = 10_000.0 / (1300.0 * 9.806) / FRAC_PI_4.sin();
        assert_relative_eq!(fs.get(0, 0).unwrap(), 0.5924833015620621 + cohesion_term, epsilon = 1e-9);
        assert_relative_eq!(fs.get(0, 0).unwrap(), 1.701861831483378, epsilon = 1e-9);
    }

    #[test]
    fn test_wetter_soil_is_less_stable() {
        let p = MaterialParams::default();
        let dry = safety_factor(&grid(FRAC_PI_6), &grid(0.0), &grid(1.5), &p).unwrap();
        let wet = safety_factor(&grid(FRAC_PI_6), &grid(1.5), &grid(1.5), &p).unwrap();
        assert!(wet.get(0, 0).unwrap() < dry.get(0, 0).unwrap());
    }

    #[test]
    fn test_relative_wetness_not_clamped() {
        // hw = 2 hs: 1 - 2 * 1000 / 1300 < 0, so the friction term goes negative
        let fs = safety_factor(&grid(FRAC_PI_4), &grid(2.0), &grid(1.0), &frictional_only()).unwrap();
        assert!(fs.get(0, 0).unwrap() < 0.0);
    }

    #[test]
    fn test_zero_soil_depth_is_rejected() {
        let mut soil = grid(1.0);
        soil.set(2, 1, 0.0).unwrap();

        let err = safety_factor(&grid(FRAC_PI_4), &grid(0.2), &soil, &MaterialParams::default()).unwrap_err();
        assert!(err.is_domain_error());
        assert!(matches!(err, Error::SingularCell { input: "soil_depth", row: 2, col: 1, .. }));
    }

    #[test]
    fn test_flat_and_overturned_slopes_are_rejected() {
        for beta in [0.0, PI] {
            let mut slope = grid(FRAC_PI_4);
            slope.set(0, 2, beta).unwrap();

            let err = safety_factor(&slope, &grid(0.2), &grid(1.0), &MaterialParams::default()).unwrap_err();
            assert!(matches!(err, Error::SingularCell { input: "slope_angle", row: 0, col: 2, .. }));
        }
    }

    #[test]
    fn test_infinite_inputs_are_rejected() {
        let mut slope = grid(FRAC_PI_4);
        slope.set(0, 0, f64::INFINITY).unwrap();
        let mut flow = grid(0.2);
        flow.set(0, 1, f64::INFINITY).unwrap();

        let err = safety_factor(&slope, &flow, &grid(1.0), &MaterialParams::default()).unwrap_err();
        assert!(err.is_domain_error());
        assert!(matches!(err, Error::SingularCell { input: "slope_angle", row: 0, col: 0, .. }));

        let err = safety_factor(&grid(FRAC_PI_4), &flow, &grid(1.0), &MaterialParams::default()).unwrap_err();
        assert!(matches!(err, Error::SingularCell { input: "flow_depth", row: 0, col: 1, .. }));

        let mut soil = grid(1.0);
        soil.set(2, 2, f64::INFINITY).unwrap();
        let err = safety_factor(&grid(FRAC_PI_4), &grid(0.2), &soil, &MaterialParams::default()).unwrap_err();
        assert!(matches!(err, Error::SingularCell { input: "soil_depth", row: 2, col: 2, .. }));
    }

    #[test]
    fn test_missing_cells_are_skipped() {
        let mut slope = grid(FRAC_PI_4);
        slope.set(0, 0, f64::NAN).unwrap();
        // would be singular if evaluated
        let mut soil = grid(1.0);
        soil.set(0, 0, 0.0).unwrap();

        let fs = safety_factor(&slope, &grid(0.2), &soil, &MaterialParams::default()).unwrap();
        assert!(fs.get(0, 0).unwrap().is_nan());
        assert!(fs.get(1, 1).unwrap().is_finite());
    }

    #[test]
    fn test_shape_mismatch() {
        let err = safety_factor(
            &grid(FRAC_PI_4),
            &Raster::filled(3, 4, 0.2),
            &grid(1.0),
            &MaterialParams::default(),
        )
        .unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_invalid_material_params() {
        let p = MaterialParams { soil_bulk_density: 0.0, ..Default::default() };
        assert!(safety_factor(&grid(FRAC_PI_4), &grid(0.2), &grid(1.0), &p).is_err());
    }

    #[test]
    fn test_slope_degrees() {
        let deg = grid(45.0);
        let rad = slope_to_radians(&deg, SlopeUnits::Degrees).unwrap();
        assert_relative_eq!(rad.get(0, 0).unwrap(), FRAC_PI_4, epsilon = 1e-15);
        let same = slope_to_radians(&rad, SlopeUnits::Radians).unwrap();
        assert_eq!(same.get(0, 0).unwrap(), rad.get(0, 0).unwrap());
    }

    #[test]
    fn test_execute_default() {
        let fs = SafetyFactor
            .execute_default((grid(FRAC_PI_4), grid(0.2), grid(1.0)))
            .unwrap();
        assert_relative_eq!(fs.get(2, 2).unwrap(), 1.701861831483378, epsilon = 1e-9);
    }

    #[test]
    fn test_stability_summary() {
        let mut fs = Raster::from_vec(vec![0.5, 0.99, 1.0, 2.0, f64::NAN, 3.0], 2, 3).unwrap();
        fs.set_nodata(Some(f64::NAN));

        let summary = StabilitySummary::from_raster(&fs);
        assert_eq!(summary.unstable, 2);
        assert_eq!(summary.stable, 3);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.min, Some(0.5));
        assert_relative_eq!(summary.unstable_fraction().unwrap(), 0.4);
        assert!(summary.to_string().contains("40.0% unstable"));
    }
}
