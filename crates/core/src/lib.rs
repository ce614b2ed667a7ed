//! # landslip core
//!
//! Core types and I/O shared by the landslip crates.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced grid
//! - `GeoTransform`: affine pixel/world transformation
//! - `Error`: the error taxonomy (shape mismatches, domain errors, I/O)
//! - Native GeoTIFF reading and writing

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Common shape for the raster algorithms in landslip.
///
/// Algorithms are pure functions of their input and parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters, for algorithms whose parameters have a
    /// meaningful default
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error>
    where
        Self::Params: Default,
    {
        self.execute(input, Self::Params::default())
    }
}
