//! # landslip algorithms
//!
//! Raster algorithms for shallow landslide susceptibility.
//!
//! ## Modules
//!
//! - **landslide**: subsurface flow depth from layered soil moisture, and the
//!   infinite-slope factor of safety
//! - **regrid**: putting rasters of different resolution onto one grid

pub mod landslide;
pub mod regrid;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::landslide::{
        safety_factor, slope_to_radians, soil_layer_thickness, subsurface_flow_depth,
        MaterialParams, SafetyFactor, SlopeUnits, SoilProfile, StabilitySummary,
        SubsurfaceFlow, SubsurfaceFlowParams, ERA5_LAND_BOUNDARIES,
    };
    pub use crate::regrid::{
        regrid, GridResampler, NativeRegridder, Regrid, RegridMethod, TargetGrid,
    };
    pub use landslip_core::prelude::*;
}
