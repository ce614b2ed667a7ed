//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
///
/// Soil moisture, soil depth and slope are always `f64` inside the physical
/// model, but rasters on disk arrive in whatever type the producer chose, so
/// reading and writing stay generic.
pub trait RasterElement:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    /// Value used to fill cells that cannot be represented
    fn default_nodata() -> Self;

    /// Whether this value marks a missing cell
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element {
    (int: $($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
    (float: $($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata.is_some_and(|nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
            }
        }
    )*};
}

impl_raster_element!(int: i8, i16, i32, i64, u8, u16, u32, u64);
impl_raster_element!(float: f32, f64);
