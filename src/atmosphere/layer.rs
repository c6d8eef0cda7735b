use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::{fried_parameter_from_cn_squared, von_karman_psd, REFERENCE_WAVELENGTH};
use crate::error::{positive, Error, Result};
use crate::field::{Complex64, Field};
use crate::fourier::FourierTransform;
use crate::grid::{centered_par_iter, Grid};
use crate::wavefront::Wavefront;

// screens are synthesized on a periodic tile this many times the input grid per axis
const TILE_FACTOR: usize = 2;
// levels of 3 x 3 subharmonics filling in the tile's DC cell, each a third the spacing of the last
const SUBHARMONIC_LEVELS: i32 = 5;

/// Physical description of a single turbulent layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerParameters {
    /// Integrated Cn², m^(1/3).
    pub cn_squared: f64,
    /// Outer scale L0, m.
    pub outer_scale: f64,
    /// Wind speed, m/s.
    pub velocity: f64,
    /// Altitude, m.
    pub height: f64,
    /// Wind direction in radians from +x. Drawn at random when absent.
    #[serde(default)]
    pub wind_direction: Option<f64>,
}

impl LayerParameters {
    pub fn new(cn_squared: f64, outer_scale: f64, velocity: f64, height: f64) -> Self {
        LayerParameters {
            cn_squared,
            outer_scale,
            velocity,
            height,
            wind_direction: None,
        }
    }

    pub fn with_wind_direction(mut self, wind_direction: f64) -> Self {
        self.wind_direction = Some(wind_direction);
        self
    }

    fn validate(&self) -> Result<()> {
        positive("Cn²", self.cn_squared)?;
        positive("outer scale", self.outer_scale)?;
        if !(self.velocity.is_finite() && self.velocity >= 0.0) {
            return Err(Error::Configuration(format!(
                "wind speed must be finite and non-negative, found {}",
                self.velocity
            )));
        }
        if !self.height.is_finite() {
            return Err(Error::Configuration(format!(
                "layer height must be finite, found {}",
                self.height
            )));
        }
        if let Some(direction) = self.wind_direction {
            if !direction.is_finite() {
                return Err(Error::Configuration(format!(
                    "wind direction must be finite, found {}",
                    direction
                )));
            }
        }
        Ok(())
    }
}

/// One frozen-flow phase screen.
///
/// The screen is synthesized once, at construction, as a random von Kármán spectrum on a periodic
/// tile, plus subharmonics for the scales larger than the tile.
/// [`evolve_until`](AtmosphericLayer::evolve_until) translates it along the wind by applying the
/// Fourier shift theorem to that spectrum, so the screen at time `t` depends only on `t`.
#[derive(Debug)]
pub struct AtmosphericLayer {
    input_grid: Grid,
    parameters: LayerParameters,
    wind_direction: f64,
    fried_parameter: f64,
    tile: FourierTransform,
    spectrum: Field<Complex64>,
    // ((fy, fx), coefficient) of the low-frequency modes below the tile's frequency spacing
    subharmonics: Vec<((f64, f64), Complex64)>,
    phase_screen: Field<f64>,
    t: f64,
}

impl AtmosphericLayer {
    pub fn new(input_grid: &Grid, parameters: LayerParameters) -> Result<Self> {
        AtmosphericLayer::with_rng(input_grid, parameters, &mut StdRng::from_entropy())
    }

    pub(crate) fn with_rng<R: Rng>(
        input_grid: &Grid,
        parameters: LayerParameters,
        rng: &mut R,
    ) -> Result<Self> {
        parameters.validate()?;
        if input_grid.ndim() != 2 {
            return Err(Error::Configuration(
                "atmospheric layers need a two dimensional grid".to_string(),
            ));
        }
        let wind_direction = match parameters.wind_direction {
            Some(direction) => direction,
            None => rng.gen_range(0.0..2.0 * PI),
        };
        let fried_parameter =
            fried_parameter_from_cn_squared(parameters.cn_squared, REFERENCE_WAVELENGTH)?;

        let [h, w] = input_grid.shape();
        let tile_grid = Grid::new([h * TILE_FACTOR, w * TILE_FACTOR], input_grid.pitch())?;
        let tile = FourierTransform::new(&tile_grid)?;

        log::debug!(
            "synthesizing {:?} phase screen at {} m, r0 = {:.4} m",
            tile_grid.shape(),
            parameters.height,
            fried_parameter
        );
        let frequencies = tile.output_grid();
        let [th, tw] = frequencies.shape();
        let (dfy, dfx) = frequencies.pitch();
        let amplitude = (dfy * dfx).sqrt();
        let values = Array2::from_shape_fn([th, tw], |(y, x)| {
            let re: f64 = rng.sample(StandardNormal);
            let im: f64 = rng.sample(StandardNormal);
            if y == th / 2 && x == tw / 2 {
                return Complex::new(0.0, 0.0);
            }
            let fy = (y as f64 - (th / 2) as f64) * dfy;
            let fx = (x as f64 - (tw / 2) as f64) * dfx;
            let psd = von_karman_psd(fy.hypot(fx), fried_parameter, parameters.outer_scale);
            Complex::new(re, im) * psd.sqrt() * amplitude
        });
        let spectrum = Field::new(frequencies.clone(), values)?;

        let mut subharmonics = Vec::with_capacity(8 * SUBHARMONIC_LEVELS as usize);
        for level in 1..=SUBHARMONIC_LEVELS {
            let scale = 3f64.powi(-level);
            let (sdfy, sdfx) = (dfy * scale, dfx * scale);
            for m in -1..=1 {
                for n in -1..=1 {
                    if m == 0 && n == 0 {
                        continue;
                    }
                    let re: f64 = rng.sample(StandardNormal);
                    let im: f64 = rng.sample(StandardNormal);
                    let (fy, fx) = (m as f64 * sdfy, n as f64 * sdfx);
                    let psd = von_karman_psd(fy.hypot(fx), fried_parameter, parameters.outer_scale);
                    subharmonics.push((
                        (fy, fx),
                        Complex::new(re, im) * psd.sqrt() * (sdfy * sdfx).sqrt(),
                    ));
                }
            }
        }

        let mut layer = AtmosphericLayer {
            input_grid: input_grid.clone(),
            parameters,
            wind_direction,
            fried_parameter,
            tile,
            subharmonics,
            phase_screen: Field::new(input_grid.clone(), Array2::zeros([h, w]))?,
            spectrum,
            t: 0.0,
        };
        layer.phase_screen = layer.screen_at(0.0)?;
        Ok(layer)
    }

    // Re(Σ c(f) exp(2πi f·(r - v t))) sampled on the input grid
    fn screen_at(&self, t: f64) -> Result<Field<f64>> {
        let distance = self.parameters.velocity * t;
        let offset_y = distance * self.wind_direction.sin();
        let offset_x = distance * self.wind_direction.cos();

        let spectrum = if distance == 0.0 {
            self.spectrum.clone()
        } else {
            let mut shifted = self.spectrum.values().to_owned();
            centered_par_iter(
                &mut shifted,
                self.spectrum.grid().pitch(),
                |(fy, fx), e: &mut Complex64| {
                    *e *= Complex::new(0.0, -2.0 * PI * (fy * offset_y + fx * offset_x)).exp();
                },
            );
            Field::new(self.spectrum.grid().clone(), shifted)?
        };

        let tile = self.tile.backward(&spectrum)?;
        let normalisation = (tile.grid().size() as f64).sqrt();
        let [h, w] = self.input_grid.shape();
        let [th, tw] = tile.grid().shape();
        let (oy, ox) = (th / 2 - h / 2, tw / 2 - w / 2);
        let mut values = Array2::from_shape_fn([h, w], |(y, x)| {
            tile.values()[[y + oy, x + ox]].re * normalisation
        });
        let subharmonics = &self.subharmonics;
        centered_par_iter(&mut values, self.input_grid.pitch(), |(y, x), e: &mut f64| {
            let (y, x) = (y - offset_y, x - offset_x);
            *e += subharmonics
                .iter()
                .map(|&((fy, fx), c)| (c * Complex::new(0.0, 2.0 * PI * (fy * y + fx * x)).exp()).re)
                .sum::<f64>();
        });
        Field::new(self.input_grid.clone(), values)
    }

    /// Moves the screen to where the wind has carried it at time `t`.
    pub fn evolve_until(&mut self, t: f64) -> Result<()> {
        if !t.is_finite() {
            return Err(Error::Configuration(format!(
                "evolution time must be finite, found {}",
                t
            )));
        }
        if t != self.t {
            log::trace!("evolving layer at {} m to t = {}", self.parameters.height, t);
            self.phase_screen = self.screen_at(t)?;
            self.t = t;
        }
        Ok(())
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn input_grid(&self) -> &Grid {
        &self.input_grid
    }

    pub fn parameters(&self) -> &LayerParameters {
        &self.parameters
    }

    pub fn height(&self) -> f64 {
        self.parameters.height
    }

    pub fn cn_squared(&self) -> f64 {
        self.parameters.cn_squared
    }

    pub fn outer_scale(&self) -> f64 {
        self.parameters.outer_scale
    }

    pub fn velocity(&self) -> f64 {
        self.parameters.velocity
    }

    /// Wind direction in radians from +x, as drawn or configured.
    pub fn wind_direction(&self) -> f64 {
        self.wind_direction
    }

    /// Fried parameter at [`REFERENCE_WAVELENGTH`].
    pub fn fried_parameter(&self) -> f64 {
        self.fried_parameter
    }

    /// Current phase screen in radians at the reference wavelength.
    pub fn phase_screen(&self) -> &Field<f64> {
        &self.phase_screen
    }

    /// Current phase screen in radians at `wavelength`.
    pub fn phase_for(&self, wavelength: f64) -> Result<Field<f64>> {
        let scale = REFERENCE_WAVELENGTH / positive("wavelength", wavelength)?;
        Ok(self.phase_screen.map(|&p| p * scale))
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.modulate(wavefront, 1.0)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.modulate(wavefront, -1.0)
    }

    fn modulate(&self, wavefront: &Wavefront, sign: f64) -> Result<Wavefront> {
        let phase = self.phase_for(wavefront.wavelength())?;
        let field = wavefront
            .electric_field()
            .zip_with(&phase, |e, &p| e * Complex::new(0.0, sign * p).exp())?;
        Ok(wavefront.with_electric_field(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variance(field: &Field<f64>) -> f64 {
        let n = field.grid().size() as f64;
        let mean = field.sum() / n;
        field.values().iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
    }

    fn seeded(grid: &Grid, parameters: LayerParameters, seed: u64) -> AtmosphericLayer {
        AtmosphericLayer::with_rng(grid, parameters, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn parameters(cn_squared: f64) -> LayerParameters {
        LayerParameters::new(cn_squared, 25.0, 8.79, 616.0).with_wind_direction(0.3)
    }

    #[test]
    fn variance_scales_with_cn_squared() {
        let grid = Grid::pupil(32, 1.0).unwrap();
        let weak = seeded(&grid, parameters(1.6e-13), 7);
        let strong = seeded(&grid, parameters(3.2e-13), 7);
        let ratio = variance(strong.phase_screen()) / variance(weak.phase_screen());
        assert!((ratio - 2.0).abs() < 1e-9, "{}", ratio);
        assert!(variance(weak.phase_screen()) > 0.0);
    }

    // mean of (φ(r + s) - φ(r))² over every pair `separation` samples apart along y and x
    fn structure_function(screen: &Field<f64>, separation: usize) -> f64 {
        let v = screen.values();
        let [h, w] = screen.grid().shape();
        let mut sum = 0.0;
        let mut count = 0;
        for y in 0..h {
            for x in 0..w {
                if x + separation < w {
                    sum += (v[[y, x + separation]] - v[[y, x]]).powi(2);
                    count += 1;
                }
                if y + separation < h {
                    sum += (v[[y + separation, x]] - v[[y, x]]).powi(2);
                    count += 1;
                }
            }
        }
        sum / count as f64
    }

    // D(r) = 4π ∫ f Φ(f) (1 - J0(2π f r)) df on a log-spaced grid
    fn von_karman_structure_function(r: f64, fried_parameter: f64, outer_scale: f64) -> f64 {
        let bessel_j0 = |x: f64| {
            let n = 64;
            (0..n)
                .map(|i| (x * (PI * (i as f64 + 0.5) / n as f64).sin()).cos())
                .sum::<f64>()
                / n as f64
        };
        let (lo, hi) = (1e-4f64.ln(), 1e4f64.ln());
        let steps = 4000;
        let step = (hi - lo) / steps as f64;
        4.0 * PI
            * (0..steps)
                .map(|i| {
                    let f = (lo + (i as f64 + 0.5) * step).exp();
                    f * f
                        * von_karman_psd(f, fried_parameter, outer_scale)
                        * (1.0 - bessel_j0(2.0 * PI * f * r))
                        * step
                })
                .sum::<f64>()
    }

    #[test]
    fn structure_function_follows_von_karman() {
        let grid = Grid::pupil(32, 1.0).unwrap();
        let pitch = grid.pitch().1;
        let params = LayerParameters::new(1.6e-12, 25.0, 0.0, 0.0).with_wind_direction(0.0);
        let r0 = fried_parameter_from_cn_squared(1.6e-12, REFERENCE_WAVELENGTH).unwrap();
        let separations = [2, 4];

        let screens = 200;
        let mut rng = StdRng::seed_from_u64(2024);
        let mut measured = [0.0; 2];
        for _ in 0..screens {
            let layer = AtmosphericLayer::with_rng(&grid, params.clone(), &mut rng).unwrap();
            for (d, &s) in measured.iter_mut().zip(separations.iter()) {
                *d += structure_function(layer.phase_screen(), s) / screens as f64;
            }
        }

        // pooled over both separations; the ensemble mean sits about 4% low from the
        // frequencies above Nyquist, and 200 screens leave roughly 2% of sampling noise
        let ratio = measured
            .iter()
            .zip(separations.iter())
            .map(|(d, &s)| d / von_karman_structure_function(s as f64 * pitch, r0, 25.0))
            .sum::<f64>()
            / separations.len() as f64;
        assert!((ratio - 1.0).abs() < 0.12, "{}", ratio);
    }

    #[test]
    fn independent_realizations() {
        let grid = Grid::pupil(16, 1.0).unwrap();
        let a = AtmosphericLayer::new(&grid, parameters(1e-13)).unwrap();
        let b = AtmosphericLayer::new(&grid, parameters(1e-13)).unwrap();
        assert_ne!(a.phase_screen().values(), b.phase_screen().values());
    }

    #[test]
    fn evolution_is_idempotent() {
        let grid = Grid::pupil(32, 1.0).unwrap();
        let mut layer = seeded(&grid, parameters(1e-13), 3);
        layer.evolve_until(0.05).unwrap();
        let first = layer.phase_screen().clone();
        layer.evolve_until(0.05).unwrap();
        assert_eq!(first.values(), layer.phase_screen().values());
        assert_eq!(layer.t(), 0.05);
    }

    #[test]
    fn evolution_composes() {
        let grid = Grid::pupil(32, 1.0).unwrap();
        let mut stepped = seeded(&grid, parameters(1e-13), 11);
        let mut direct = seeded(&grid, parameters(1e-13), 11);

        stepped.evolve_until(0.02).unwrap();
        stepped.evolve_until(0.07).unwrap();
        direct.evolve_until(0.07).unwrap();

        for (a, b) in stepped
            .phase_screen()
            .values()
            .iter()
            .zip(direct.phase_screen().values().iter())
        {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn whole_pixel_shift_translates_screen() {
        let grid = Grid::pupil(32, 1.0).unwrap();
        let pitch = grid.pitch().1;
        // wind along +x, moving exactly three samples
        let params = LayerParameters::new(1e-13, 25.0, 10.0, 0.0).with_wind_direction(0.0);
        let mut layer = seeded(&grid, params, 5);
        let before = layer.phase_screen().clone();
        layer.evolve_until(3.0 * pitch / 10.0).unwrap();
        let after = layer.phase_screen();
        for y in 0..32 {
            for x in 3..32 {
                let moved = after.values()[[y, x]];
                let original = before.values()[[y, x - 3]];
                assert!((moved - original).abs() < 1e-9, "{} {}", moved, original);
            }
        }
    }

    #[test]
    fn forward_backward_cancel() {
        let grid = Grid::pupil(16, 1.0).unwrap();
        let layer = seeded(&grid, parameters(1e-12), 1);
        let wf = Wavefront::new(Field::ones(grid), 1.55e-6).unwrap();
        let aberrated = layer.forward(&wf).unwrap();
        assert!((aberrated.total_power() - wf.total_power()).abs() < 1e-12);
        let restored = layer.backward(&aberrated).unwrap();
        for e in restored.electric_field().values().iter() {
            assert!((e - Complex::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn phase_scales_inversely_with_wavelength() {
        let grid = Grid::pupil(8, 1.0).unwrap();
        let layer = seeded(&grid, parameters(1e-12), 2);
        let phase = layer.phase_for(2.0 * REFERENCE_WAVELENGTH).unwrap();
        for (a, b) in phase.values().iter().zip(layer.phase_screen().values().iter()) {
            assert!((a - 0.5 * b).abs() < 1e-15);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        let grid = Grid::pupil(8, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(AtmosphericLayer::with_rng(&grid, parameters(0.0), &mut rng).is_err());
        let mut negative_wind = parameters(1e-13);
        negative_wind.velocity = -1.0;
        assert!(AtmosphericLayer::with_rng(&grid, negative_wind, &mut rng).is_err());
        let line = Grid::new_1d(8, 0.1).unwrap();
        assert!(AtmosphericLayer::with_rng(&line, parameters(1e-13), &mut rng).is_err());
    }
}
