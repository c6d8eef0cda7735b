use std::f64::consts::PI;
use std::sync::{Arc, PoisonError, RwLock};

use ndarray::{Array2, Zip};
use num_complex::Complex;

use crate::error::{positive, Error, Result};
use crate::field::{Complex64, Field};
use crate::fourier::FourierTransform;
use crate::grid::{centered_par_iter, Grid};
use crate::wavefront::Wavefront;

const CACHE_SIZE: usize = 50;
const WAVELENGTH_TOLERANCE: f64 = 1e-12;

/// Whether the paraxial (Fresnel) approximation is expected to hold over the grid.
///
/// Valid if ((x−x′)^2+(y−y′)^2)^2 << 8λL^3, evaluated over the half extent of the grid.
/// Propagators do not enforce this.
pub fn paraxial_valid(grid: &Grid, distance: f64, wavelength: f64) -> bool {
    let mid_y = grid.shape()[0] / 2;
    let mid_x = grid.shape()[1] / 2;
    let limit = 8.0 * wavelength * distance.abs().powi(3);
    let distance_sqr = mid_x as f64 * mid_x as f64 * grid.pitch().1 * grid.pitch().1
        + mid_y as f64 * mid_y as f64 * grid.pitch().0 * grid.pitch().0;
    distance_sqr * distance_sqr < limit * 0.01
}

/// Fresnel propagation at a single wavelength, by transfer function.
///
/// `H(k) = exp(-i d k^2 / (2 k0)) exp(i k0 d)` with `k0 = 2πn/λ` and `k` the angular
/// spatial frequency of the conjugate grid.
#[derive(Debug)]
pub struct MonochromaticFresnelPropagator {
    fft: Arc<FourierTransform>,
    transfer_function: Array2<Complex64>,
    distance: f64,
    wavelength: f64,
    refractive_index: f64,
}

impl MonochromaticFresnelPropagator {
    pub fn new(
        input_grid: &Grid,
        distance: f64,
        wavelength: f64,
        refractive_index: f64,
    ) -> Result<Self> {
        let fft = Arc::new(FourierTransform::new(input_grid)?);
        MonochromaticFresnelPropagator::with_transform(fft, distance, wavelength, refractive_index)
    }

    pub(crate) fn with_transform(
        fft: Arc<FourierTransform>,
        distance: f64,
        wavelength: f64,
        refractive_index: f64,
    ) -> Result<Self> {
        if !distance.is_finite() {
            return Err(Error::Configuration(format!(
                "propagation distance must be finite, found {}",
                distance
            )));
        }
        let wavelength = positive("wavelength", wavelength)?;
        let refractive_index = positive("refractive index", refractive_index)?;

        if distance != 0.0 && !paraxial_valid(fft.input_grid(), distance, wavelength) {
            log::debug!(
                "fresnel propagation over {} m at {} m is outside the paraxial regime",
                distance,
                wavelength
            );
        }

        let k0 = 2.0 * PI * refractive_index / wavelength;
        let phase_factor = Complex::new(0.0, k0 * distance).exp();
        let frequencies = fft.output_grid();
        let mut transfer_function = Array2::zeros(frequencies.shape());
        centered_par_iter(
            &mut transfer_function,
            frequencies.pitch(),
            |(fy, fx), e: &mut Complex64| {
                let k_squared = 4.0 * PI * PI * (fy * fy + fx * fx);
                *e = Complex::new(0.0, -0.5 * distance * k_squared / k0).exp() * phase_factor;
            },
        );

        Ok(MonochromaticFresnelPropagator {
            fft,
            transfer_function,
            distance,
            wavelength,
            refractive_index,
        })
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn refractive_index(&self) -> f64 {
        self.refractive_index
    }

    pub fn input_grid(&self) -> &Grid {
        self.fft.input_grid()
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.apply(wavefront, |ft, h| ft * h)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.apply(wavefront, |ft, h| ft / h)
    }

    fn apply<F>(&self, wavefront: &Wavefront, op: F) -> Result<Wavefront>
    where
        F: Fn(Complex64, Complex64) -> Complex64 + Sync + Send,
    {
        let ft = self.fft.forward(wavefront.electric_field())?;
        let grid = ft.grid().clone();
        let mut values = ft.into_values();
        Zip::from(&mut values)
            .and(&self.transfer_function)
            .par_for_each(|e, &h| *e = op(*e, h));
        let propagated = self.fft.backward(&Field::new(grid, values)?)?;
        Ok(wavefront.with_electric_field(propagated))
    }
}

/// Fresnel propagator over a fixed distance for any wavelength.
///
/// Transfer functions are built on first use for each wavelength and kept, so repeated
/// propagation at the same wavelength costs two FFTs and a multiply.
#[derive(Debug)]
pub struct FresnelPropagator {
    fft: Arc<FourierTransform>,
    distance: f64,
    refractive_index: f64,
    cache: RwLock<Vec<Arc<MonochromaticFresnelPropagator>>>,
}

impl FresnelPropagator {
    pub fn new(input_grid: &Grid, distance: f64) -> Result<Self> {
        FresnelPropagator::with_refractive_index(input_grid, distance, 1.0)
    }

    pub fn with_refractive_index(
        input_grid: &Grid,
        distance: f64,
        refractive_index: f64,
    ) -> Result<Self> {
        if !distance.is_finite() {
            return Err(Error::Configuration(format!(
                "propagation distance must be finite, found {}",
                distance
            )));
        }
        Ok(FresnelPropagator {
            fft: Arc::new(FourierTransform::new(input_grid)?),
            distance,
            refractive_index: positive("refractive index", refractive_index)?,
            cache: RwLock::new(Vec::new()),
        })
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn input_grid(&self) -> &Grid {
        self.fft.input_grid()
    }

    /// Number of wavelengths with a cached transfer function.
    pub fn cached_wavelengths(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The monochromatic propagator for `wavelength`, built if not cached.
    pub fn monochromatic(&self, wavelength: f64) -> Result<Arc<MonochromaticFresnelPropagator>> {
        let matches = |p: &&Arc<MonochromaticFresnelPropagator>| {
            (p.wavelength() - wavelength).abs() <= WAVELENGTH_TOLERANCE * wavelength.abs()
        };
        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(matches)
        {
            return Ok(Arc::clone(found));
        }

        let propagator = Arc::new(MonochromaticFresnelPropagator::with_transform(
            Arc::clone(&self.fft),
            self.distance,
            wavelength,
            self.refractive_index,
        )?);
        log::trace!(
            "built fresnel transfer function for {} m over {} m",
            wavelength,
            self.distance
        );

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = cache.iter().find(matches) {
            return Ok(Arc::clone(found));
        }
        if cache.len() >= CACHE_SIZE {
            cache.remove(0);
        }
        cache.push(Arc::clone(&propagator));
        Ok(propagator)
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.monochromatic(wavefront.wavelength())?.forward(wavefront)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.monochromatic(wavefront.wavelength())?.backward(wavefront)
    }
}
