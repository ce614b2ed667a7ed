//! Soil profile: depth boundaries of the moisture layers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use landslip_core::{Error, Result};

/// Layer boundaries (metres) of the four ERA5-Land volumetric soil water
/// levels, truncated at 2 m: 0–7 cm, 7–28 cm, 28–100 cm, 100–200 cm.
pub const ERA5_LAND_BOUNDARIES: [f64; 5] = [0.0, 0.07, 0.28, 1.0, 2.0];

/// Ordered depth boundaries delimiting the subsurface layers.
///
/// `n` boundaries define `n - 1` layers; layer `i` spans
/// `[boundaries[i], boundaries[i + 1]]`. Boundaries are finite, strictly
/// increasing and start at the surface (0), which [`SoilProfile::new`]
/// checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SoilProfile {
    boundaries: Vec<f64>,
}

impl SoilProfile {
    /// Validate and wrap a boundary sequence
    pub fn new(boundaries: impl Into<Vec<f64>>) -> Result<Self> {
        let boundaries = boundaries.into();

        if boundaries.len() < 2 {
            return Err(Error::InvalidParameter {
                name: "soil_profile",
                value: format!("{:?}", boundaries),
                reason: "at least two boundaries are needed to define a layer".into(),
            });
        }

        if let Some(bad) = boundaries.iter().find(|b| !b.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "soil_profile",
                value: bad.to_string(),
                reason: "boundaries must be finite".into(),
            });
        }

        if boundaries[0] != 0.0 {
            return Err(Error::InvalidParameter {
                name: "soil_profile",
                value: boundaries[0].to_string(),
                reason: "the first boundary must be the surface (0)".into(),
            });
        }

        if let Some(i) = boundaries.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::NonMonotonicProfile {
                index: i + 1,
                previous: boundaries[i],
                value: boundaries[i + 1],
            });
        }

        Ok(Self { boundaries })
    }

    /// The ERA5-Land layering, [`ERA5_LAND_BOUNDARIES`]
    pub fn era5_land() -> Self {
        Self {
            boundaries: ERA5_LAND_BOUNDARIES.to_vec(),
        }
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Number of layers (boundaries - 1)
    pub fn num_layers(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// `(top, bottom)` of layer `index`
    pub fn layer(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.boundaries.get(index)?, *self.boundaries.get(index + 1)?))
    }

    /// `(top, bottom)` of every layer, shallowest first
    pub fn layers(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.boundaries.windows(2).map(|w| (w[0], w[1]))
    }
}

impl TryFrom<Vec<f64>> for SoilProfile {
    type Error = Error;

    fn try_from(boundaries: Vec<f64>) -> Result<Self> {
        Self::new(boundaries)
    }
}

impl From<SoilProfile> for Vec<f64> {
    fn from(profile: SoilProfile) -> Self {
        profile.boundaries
    }
}

/// Parses a comma-separated list such as `0,0.07,0.28,1,2`
impl FromStr for SoilProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let boundaries = s
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|e| Error::InvalidParameter {
                    name: "soil_profile",
                    value: part.trim().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::new(boundaries)
    }
}

impl fmt::Display for SoilProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.boundaries.iter().map(|b| b.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Portion of a soil column of depth `depth` that lies inside `[top, bottom]`.
///
/// Zero at or above the top of the layer, `bottom - top` at or below its
/// base. A depth exactly on `bottom` fills this layer completely and leaves
/// nothing for the layer beneath it.
#[inline]
pub fn layer_thickness(depth: f64, top: f64, bottom: f64) -> f64 {
    depth.max(top).min(bottom) - top
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_era5_land_profile() {
        let p = SoilProfile::era5_land();
        assert_eq!(p.num_layers(), 4);
        assert_eq!(p.layer(1), Some((0.07, 0.28)));
        assert_eq!(p.layer(4), None);
        assert_eq!(p.layers().count(), 4);
    }

    #[test]
    fn test_rejects_non_monotonic() {
        let err = SoilProfile::new(vec![0.0, 1.0, 0.5]).unwrap_err();
        assert!(err.is_domain_error());
        match err {
            Error::NonMonotonicProfile { index, previous, value } => {
                assert_eq!(index, 2);
                assert_eq!(previous, 1.0);
                assert_eq!(value, 0.5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_repeated_boundary() {
        assert!(matches!(
            SoilProfile::new(vec![0.0, 0.5, 0.5, 1.0]),
            Err(Error::NonMonotonicProfile { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(SoilProfile::new(vec![0.0]).is_err());
        assert!(SoilProfile::new(Vec::<f64>::new()).is_err());
        assert!(SoilProfile::new(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_rejects_profile_below_surface() {
        let err = SoilProfile::new(vec![0.5, 1.0]).unwrap_err();
        assert!(err.is_domain_error());
        assert!(matches!(err, Error::InvalidParameter { name: "soil_profile", .. }));
        assert!("0.07,0.28,1".parse::<SoilProfile>().is_err());
        assert!(SoilProfile::new(vec![-0.1, 1.0]).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let p: SoilProfile = "0, 0.07,0.28,1,2".parse().unwrap();
        assert_eq!(p, SoilProfile::era5_land());
        assert_eq!(p.to_string(), "0,0.07,0.28,1,2");
        assert!("0,abc".parse::<SoilProfile>().is_err());
    }

    #[test]
    fn test_serde_validates() {
        let p: SoilProfile = serde_json::from_str("[0.0, 0.5, 1.5]").unwrap();
        assert_eq!(p.num_layers(), 2);
        assert!(serde_json::from_str::<SoilProfile>("[0.0, 1.5, 0.5]").is_err());
    }

    #[test]
    fn test_layer_thickness_bounds() {
        let p = SoilProfile::era5_land();
        let depths = [-1.0, 0.0, 0.03, 0.07, 0.1, 0.28, 0.5, 1.0, 1.7, 2.0, 3.5];
        for (top, bottom) in p.layers() {
            for &d in &depths {
                let t = layer_thickness(d, top, bottom);
                assert!(t >= 0.0, "negative thickness {t} for depth {d}");
                assert!(t <= bottom - top, "thickness {t} exceeds layer width");
            }
        }
    }

    #[test]
    fn test_boundary_depth_fills_layer_above() {
        assert_eq!(layer_thickness(1.0, 0.0, 1.0), 1.0);
        assert_eq!(layer_thickness(1.0, 1.0, 2.0), 0.0);
    }
}
