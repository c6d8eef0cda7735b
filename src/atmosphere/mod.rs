//! Frozen-flow atmospheric turbulence.
//!
//! Turbulence strength is expressed as path-integrated Cn² (m^(1/3)) per layer. Phase screens are
//! synthesized in radians at [`REFERENCE_WAVELENGTH`] and rescaled by `λ_ref / λ` when applied.

use std::f64::consts::PI;

use crate::error::{positive, Result};

mod layer;
mod multi_layer;
mod presets;

pub use layer::{AtmosphericLayer, LayerParameters};
pub use multi_layer::MultiLayerAtmosphere;
pub use presets::AtmospherePreset;

/// Wavelength at which phase screens and preset Fried parameters are specified, in metres.
pub const REFERENCE_WAVELENGTH: f64 = 500e-9;

/// Fried parameter `r0 = (0.423 k^2 Cn²)^(-3/5)` for an integrated Cn².
pub fn fried_parameter_from_cn_squared(cn_squared: f64, wavelength: f64) -> Result<f64> {
    let cn_squared = positive("Cn²", cn_squared)?;
    let k = 2.0 * PI / positive("wavelength", wavelength)?;
    Ok((0.423 * k * k * cn_squared).powf(-3.0 / 5.0))
}

/// Inverse of [`fried_parameter_from_cn_squared`].
pub fn cn_squared_from_fried_parameter(fried_parameter: f64, wavelength: f64) -> Result<f64> {
    let r0 = positive("Fried parameter", fried_parameter)?;
    let k = 2.0 * PI / positive("wavelength", wavelength)?;
    Ok(r0.powf(-5.0 / 3.0) / (0.423 * k * k))
}

/// Von Kármán phase power spectral density, rad² m², at spatial frequency `f` in cycles per metre.
pub fn von_karman_psd(f: f64, fried_parameter: f64, outer_scale: f64) -> f64 {
    0.023 * fried_parameter.powf(-5.0 / 3.0) * (f * f + 1.0 / (outer_scale * outer_scale)).powf(-11.0 / 6.0)
}
