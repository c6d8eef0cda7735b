use num_complex::Complex;

use crate::error::{positive, Result};
use crate::field::Field;
use crate::fourier::FourierTransform;
use crate::grid::Grid;
use crate::wavefront::Wavefront;

/// Propagation from the front to the back focal plane of an ideal lens.
///
/// The output grid depends on the wavelength: it is the conjugate of the input grid scaled
/// by `λ f`. Power is conserved.
#[derive(Debug)]
pub struct FraunhoferPropagator {
    fft: FourierTransform,
    focal_length: f64,
}

impl FraunhoferPropagator {
    pub fn new(input_grid: &Grid, focal_length: f64) -> Result<Self> {
        Ok(FraunhoferPropagator {
            fft: FourierTransform::new(input_grid)?,
            focal_length: positive("focal length", focal_length)?,
        })
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn input_grid(&self) -> &Grid {
        self.fft.input_grid()
    }

    /// Focal plane grid at `wavelength`.
    pub fn output_grid(&self, wavelength: f64) -> Result<Grid> {
        self.fft.output_grid().scaled(wavelength * self.focal_length)
    }

    // sqrt(dx0 dx1 / du0 du1)
    fn amplitude_scale(&self, output_grid: &Grid) -> f64 {
        let (dy, dx) = self.input_grid().pitch();
        let (duy, dux) = output_grid.pitch();
        ((dy * dx) / (duy * dux)).sqrt()
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        let output_grid = self.output_grid(wavefront.wavelength())?;
        let scale = Complex::new(0.0, -self.amplitude_scale(&output_grid));
        let spectrum = self.fft.forward(wavefront.electric_field())?;
        let field = spectrum.map(|&e| e * scale).regrid(output_grid)?;
        Ok(wavefront.with_electric_field(field))
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        let output_grid = self.output_grid(wavefront.wavelength())?;
        output_grid.ensure_matches(wavefront.grid())?;
        let scale = Complex::new(0.0, 1.0 / self.amplitude_scale(&output_grid));
        let spectrum: Field = wavefront
            .electric_field()
            .map(|&e| e * scale)
            .regrid(self.fft.output_grid().clone())?;
        Ok(wavefront.with_electric_field(self.fft.backward(&spectrum)?))
    }
}
