//! Subsurface flow depth from layered soil moisture
//!
//! Each soil layer contributes the water held in the part of the soil column
//! that falls inside it, expressed as a saturated-equivalent depth:
//!
//! ```text
//! hw = Σ_i θ_i · (clip(hs, t_i, t_i+1) − t_i) / n
//! ```
//!
//! where `hs` is soil depth, `θ_i` the volumetric water content of layer `i`,
//! `[t_i, t_i+1]` its depth bracket and `n` the porosity.

use serde::{Deserialize, Serialize};
use crate::maybe_rayon::map_cells;
use landslip_core::raster::Raster;
use landslip_core::{Algorithm, Error, Result};

use super::soil_profile::{layer_thickness, SoilProfile};

/// Parameters for the subsurface flow depth aggregation.
///
/// No `Default`: callers name the layering of the moisture product they
/// loaded, e.g. [`SoilProfile::era5_land`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsurfaceFlowParams {
    /// Depth boundaries of the moisture layers
    pub profile: SoilProfile,
    /// Soil porosity (void fraction), must be > 0
    pub porosity: f64,
}

impl SubsurfaceFlowParams {
    pub fn new(profile: SoilProfile, porosity: f64) -> Self {
        Self { profile, porosity }
    }

    /// Check the scalar parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.porosity.is_finite() && self.porosity > 0.0) {
            return Err(Error::InvalidParameter {
                name: "porosity",
                value: self.porosity.to_string(),
                reason: "must be finite and > 0".into(),
            });
        }
        Ok(())
    }
}

/// Subsurface flow depth algorithm
#[derive(Debug, Clone, Default)]
pub struct SubsurfaceFlow;

impl Algorithm for SubsurfaceFlow {
    /// Soil depth and one moisture raster per layer
    type Input = (Raster<f64>, Vec<Raster<f64>>);
    type Output = Raster<f64>;
    type Params = SubsurfaceFlowParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Subsurface flow depth"
    }

    fn description(&self) -> &'static str {
        "Aggregate layered volumetric soil moisture into a saturated-equivalent flow depth"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (soil_depth, moisture) = input;
        subsurface_flow_depth(&soil_depth, &moisture, &params)
    }
}

/// Compute the subsurface flow depth raster.
///
/// # Arguments
/// * `soil_depth` - Soil depth, same length unit as the profile boundaries
/// * `moisture` - Volumetric water content per layer, shallowest first
/// * `params` - Soil profile and porosity
///
/// # Returns
/// Flow depth raster on the soil depth grid. Cells where the soil depth or any
/// layer's moisture is missing are NaN.
///
/// # Errors
/// * [`Error::InvalidParameter`] if porosity ≤ 0
/// * [`Error::LayerCountMismatch`] if `moisture.len()` differs from the number
///   of profile layers
/// * [`Error::LayerSizeMismatch`] if a moisture raster is not on the soil
///   depth grid
pub fn subsurface_flow_depth(
    soil_depth: &Raster<f64>,
    moisture: &[Raster<f64>],
    params: &SubsurfaceFlowParams,
) -> Result<Raster<f64>> {
    params.validate()?;
    check_layer_stack(soil_depth, moisture, &params.profile)?;

    let (rows, cols) = soil_depth.shape();
    let layers: Vec<(f64, f64)> = params.profile.layers().collect();
    let porosity = params.porosity;

    let data = map_cells(rows, cols, |row, col| {
        let depth = unsafe { soil_depth.get_unchecked(row, col) };
        if soil_depth.is_nodata(depth) {
            return f64::NAN;
        }

        let mut water_depth = 0.0;
        for (theta_raster, &(top, bottom)) in moisture.iter().zip(&layers) {
            let theta = unsafe { theta_raster.get_unchecked(row, col) };
            if theta_raster.is_nodata(theta) {
                return f64::NAN;
            }
            water_depth += theta * layer_thickness(depth, top, bottom) / porosity;
        }
        water_depth
    });

    let mut output = soil_depth.derive(data)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Thickness of each profile layer occupied by the soil column, one raster
/// per layer.
///
/// Values lie in `[0, bottom - top]`. Missing soil depth gives NaN in every
/// layer.
pub fn soil_layer_thickness(soil_depth: &Raster<f64>, profile: &SoilProfile) -> Result<Vec<Raster<f64>>> {
    let (rows, cols) = soil_depth.shape();

    profile
        .layers()
        .map(|(top, bottom)| {
            let data = map_cells(rows, cols, |row, col| {
                let depth = unsafe { soil_depth.get_unchecked(row, col) };
                if soil_depth.is_nodata(depth) {
                    f64::NAN
                } else {
                    layer_thickness(depth, top, bottom)
                }
            });
            let mut layer = soil_depth.derive(data)?;
            layer.set_nodata(Some(f64::NAN));
            Ok(layer)
        })
        .collect()
}

fn check_layer_stack(soil_depth: &Raster<f64>, moisture: &[Raster<f64>], profile: &SoilProfile) -> Result<()> {
    if moisture.len() != profile.num_layers() {
        return Err(Error::LayerCountMismatch {
            expected: profile.num_layers(),
            actual: moisture.len(),
        });
    }

    let (er, ec) = soil_depth.shape();
    for (layer, raster) in moisture.iter().enumerate() {
        let (ar, ac) = raster.shape();
        if (ar, ac) != (er, ec) {
            return Err(Error::LayerSizeMismatch { layer, er, ec, ar, ac });
        }
    }
    Ok(())
}
