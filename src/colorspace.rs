//! sRGB and CIELAB conversions used for perceptually meaningful averaging.
//!
//! Conversions go through linear sRGB and CIE XYZ with the D65 reference white,
//! using the piecewise sRGB transfer function and the CIELAB nonlinearity
//! `f(t) = cbrt(t)` for `t > (6/29)³` and its linear branch otherwise.

use palette::{white_point::D65, Clamp, IntoColor, Lab, LinSrgb, Srgb};

/// CIELAB with the D65 white point and `f64` components, used for all accumulation.
pub type Lab64 = Lab<D65, f64>;

/// Converts an 8-bit sRGB color to CIELAB.
#[must_use]
#[inline]
pub fn srgb_to_lab(color: Srgb<u8>) -> Lab64 {
    let linear: LinSrgb<f64> = color.into_format::<f64>().into_linear();
    linear.into_color()
}

/// Converts a CIELAB color back to 8-bit sRGB,
/// clamping out of gamut colors to the `0..=255` range.
#[must_use]
#[inline]
pub fn lab_to_srgb(color: Lab64) -> Srgb<u8> {
    let linear: LinSrgb<f64> = color.into_color();
    let srgb: Srgb<f64> = Srgb::from_linear(linear.clamp());
    srgb.into_format()
}
