//! Free-space optical propagation through frozen-flow turbulence, with Shack-Hartmann and
//! focused plenoptic wavefront sensors.
//!
//! Wavefronts are sampled on centered [`Grid`]s. Every operation returns a new value; nothing
//! mutates a field it was handed.

mod aperture;
pub mod atmosphere;
mod detector;
mod error;
mod fft2;
mod field;
mod fourier;
mod fraunhofer;
mod fresnel;
mod grid;
pub mod io;
mod propagator;
mod wavefront;
pub mod wfs;

pub use aperture::{circular_aperture, soft_circular_aperture};
pub use atmosphere::{AtmosphericLayer, AtmospherePreset, LayerParameters, MultiLayerAtmosphere};
pub use detector::NoiselessDetector;
pub use error::{Error, ErrorKind, Result};
pub use field::{Complex64, Field};
pub use fourier::FourierTransform;
pub use fraunhofer::FraunhoferPropagator;
pub use fresnel::{paraxial_valid, FresnelPropagator, MonochromaticFresnelPropagator};
pub use grid::Grid;
pub use propagator::Propagator;
pub use wavefront::Wavefront;

/// Calculate the numerical aperture from diameter and focal length
///
/// * d - aperture diameter
/// * fl - focal length
/// * n - optical density of adjacent medium (1.0 for air)
pub fn na(d: f64, fl: f64, n: f64) -> f64 {
    // simplify NA = n sin(atan(D/(2f)))
    n * d / (4.0 * fl * fl + d * d).sqrt()
}

/// Radius of Airy pattern from the central peak to the first minimum
///
/// * na - numerical aperture
/// * lambda - wavelength of light
pub fn airy_radius(na: f64, lambda: f64) -> f64 {
    1.22 * 0.5 * lambda / na
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_of_a_slow_lens() {
        // f/25: NA = d / sqrt(4f² + d²)
        let na = na(0.02, 0.5, 1.0);
        assert!((na - 0.02 / 1.0004f64.sqrt()).abs() < 1e-15);
        assert!((airy_radius(na, 1e-6) - 0.61e-6 / na).abs() < 1e-18);
    }
}
