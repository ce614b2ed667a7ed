//! Shallow landslide susceptibility
//!
//! Two stages, applied in order on rasters sharing one grid:
//! - Subsurface flow depth: layered volumetric soil moisture aggregated over
//!   the soil column
//! - Safety factor: infinite-slope stability from slope, flow depth and soil
//!   depth

mod material;
mod safety_factor;
mod soil_profile;
mod subsurface_flow;

pub use material::MaterialParams;
pub use safety_factor::{safety_factor, slope_to_radians, SafetyFactor, SlopeUnits, StabilitySummary};
pub use soil_profile::{layer_thickness, SoilProfile, ERA5_LAND_BOUNDARIES};
pub use subsurface_flow::{soil_layer_thickness, subsurface_flow_depth, SubsurfaceFlow, SubsurfaceFlowParams};
