//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// This trait bounds the types that can be used as raster values,
/// ensuring they support necessary numeric operations.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, clamping to the representable range.
    ///
    /// Integer targets round to nearest; NaN maps to zero.
    fn from_f64_saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self::zero();
        }
        let lo = Self::min_value().to_f64().unwrap_or(f64::MIN);
        let hi = Self::max_value().to_f64().unwrap_or(f64::MAX);
        let clamped = if Self::is_float() {
            value.clamp(lo, hi)
        } else {
            value.round().clamp(lo, hi)
        };
        NumCast::from(clamped).unwrap_or_else(Self::zero)
    }

    /// Saturating conversion to an 8-bit sample.
    fn to_u8_saturating(self) -> u8 {
        match self.to_f64() {
            Some(v) => u8::from_f64_saturating(v),
            None => 0,
        }
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_float() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_float() -> bool {
                true
            }
        }
    };
}

impl_raster_element_int!(i8);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(u32);
impl_raster_element_int!(u64);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);
