//! Soil and root material constants for the infinite-slope model

use serde::{Deserialize, Serialize};
use landslip_core::{Error, Result};

/// Material constants of the infinite-slope stability model (SI units).
///
/// Defaults are the values commonly used for shallow landslide screening
/// with ERA5-Land moisture: 5 kPa root and soil cohesion, 1300 kg/m³ bulk
/// density and a 35° internal friction angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialParams {
    /// Root cohesion (Pa)
    pub root_cohesion: f64,
    /// Soil cohesion (Pa)
    pub soil_cohesion: f64,
    /// Soil bulk density (kg/m³)
    pub soil_bulk_density: f64,
    /// Water density (kg/m³)
    pub water_density: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
    /// Soil internal friction angle (degrees)
    pub friction_angle_deg: f64,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            root_cohesion: 5000.0,
            soil_cohesion: 5000.0,
            soil_bulk_density: 1300.0,
            water_density: 1000.0,
            gravity: 9.806,
            friction_angle_deg: 35.0,
        }
    }
}

impl MaterialParams {
    /// tan φ of the internal friction angle
    pub fn tan_friction(&self) -> f64 {
        (self.friction_angle_deg * std::f64::consts::PI / 180.0).tan()
    }

    /// Combined root and soil cohesion
    pub fn total_cohesion(&self) -> f64 {
        self.root_cohesion + self.soil_cohesion
    }

    /// Reject values for which the stability formula is undefined
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("root_cohesion", self.root_cohesion),
            ("soil_cohesion", self.soil_cohesion),
            ("soil_bulk_density", self.soil_bulk_density),
            ("water_density", self.water_density),
            ("gravity", self.gravity),
            ("friction_angle_deg", self.friction_angle_deg),
        ];
        if let Some(&(name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(name, value, "must be finite"));
        }

        if self.soil_bulk_density <= 0.0 {
            return Err(invalid("soil_bulk_density", self.soil_bulk_density, "must be > 0"));
        }
        if self.gravity <= 0.0 {
            return Err(invalid("gravity", self.gravity, "must be > 0"));
        }
        if !(0.0..90.0).contains(&self.friction_angle_deg) {
            return Err(invalid(
                "friction_angle_deg",
                self.friction_angle_deg,
                "must lie in [0, 90) degrees",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: f64, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
