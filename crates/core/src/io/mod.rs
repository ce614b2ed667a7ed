//! Reading and writing georeferenced rasters

mod native;

pub use native::{
    read_geotiff, read_geotiff_layers, write_geotiff, write_geotiff_layers, GeoTiffOptions,
};
