use super::{fried_parameter_from_cn_squared, AtmosphericLayer, AtmospherePreset, LayerParameters};
use crate::error::{Error, Result};
use crate::fresnel::FresnelPropagator;
use crate::grid::Grid;
use crate::wavefront::Wavefront;

/// A stack of frozen-flow layers with free-space propagation between them.
///
/// Light enters above the highest layer and travels down: each layer imprints its phase, then the
/// field is Fresnel propagated to the next layer below, and finally to the observation plane.
/// With scintillation disabled the propagation steps are skipped and only phase accumulates.
#[derive(Debug)]
pub struct MultiLayerAtmosphere {
    // sorted by increasing height
    layers: Vec<AtmosphericLayer>,
    // propagators[i] takes the field from layers[i] down to layers[i - 1], or to the observation plane
    propagators: Vec<FresnelPropagator>,
    scintillation: bool,
    observation_height: f64,
    t: f64,
}

impl MultiLayerAtmosphere {
    pub fn new(layers: Vec<AtmosphericLayer>, scintillation: bool) -> Result<Self> {
        MultiLayerAtmosphere::with_observation_height(layers, scintillation, 0.0)
    }

    pub fn with_observation_height(
        mut layers: Vec<AtmosphericLayer>,
        scintillation: bool,
        observation_height: f64,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::Configuration(
                "an atmosphere needs at least one layer".to_string(),
            ));
        }
        if !observation_height.is_finite() {
            return Err(Error::Configuration(format!(
                "observation height must be finite, found {}",
                observation_height
            )));
        }
        layers.sort_by(|a, b| a.height().total_cmp(&b.height()));

        let grid = layers[0].input_grid().clone();
        let mut below = observation_height;
        let mut propagators = Vec::with_capacity(layers.len());
        for layer in &layers {
            grid.ensure_matches(layer.input_grid())?;
            if layer.height() < observation_height {
                return Err(Error::Configuration(format!(
                    "layer at {} m lies below the observation plane at {} m",
                    layer.height(),
                    observation_height
                )));
            }
            propagators.push(FresnelPropagator::new(&grid, layer.height() - below)?);
            below = layer.height();
        }

        let t = layers[0].t();
        for layer in &mut layers {
            layer.evolve_until(t)?;
        }
        log::debug!(
            "atmosphere with {} layers up to {} m, scintillation {}",
            layers.len(),
            below,
            if scintillation { "on" } else { "off" }
        );

        Ok(MultiLayerAtmosphere {
            layers,
            propagators,
            scintillation,
            observation_height,
            t,
        })
    }

    /// Synthesizes one fresh layer per parameter set.
    pub fn from_parameters(
        input_grid: &Grid,
        parameters: Vec<LayerParameters>,
        scintillation: bool,
    ) -> Result<Self> {
        let layers = parameters
            .into_iter()
            .map(|p| AtmosphericLayer::new(input_grid, p))
            .collect::<Result<Vec<_>>>()?;
        MultiLayerAtmosphere::new(layers, scintillation)
    }

    pub fn from_preset(
        input_grid: &Grid,
        preset: &AtmospherePreset,
        scintillation: bool,
    ) -> Result<Self> {
        MultiLayerAtmosphere::from_parameters(input_grid, preset.layers()?, scintillation)
    }

    pub fn layers(&self) -> &[AtmosphericLayer] {
        &self.layers
    }

    pub fn input_grid(&self) -> &Grid {
        self.layers[0].input_grid()
    }

    pub fn scintillation(&self) -> bool {
        self.scintillation
    }

    pub fn observation_height(&self) -> f64 {
        self.observation_height
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    /// Sum of the Cn² of every layer.
    pub fn integrated_cn_squared(&self) -> f64 {
        self.layers.iter().map(|l| l.cn_squared()).sum()
    }

    /// Fried parameter of the whole stack at `wavelength`.
    pub fn fried_parameter(&self, wavelength: f64) -> Result<f64> {
        fried_parameter_from_cn_squared(self.integrated_cn_squared(), wavelength)
    }

    pub fn evolve_until(&mut self, t: f64) -> Result<()> {
        for layer in &mut self.layers {
            layer.evolve_until(t)?;
        }
        self.t = t;
        Ok(())
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        let mut wf = wavefront.clone();
        for (layer, propagator) in self.layers.iter().zip(&self.propagators).rev() {
            wf = layer.forward(&wf)?;
            if self.scintillation {
                wf = propagator.forward(&wf)?;
            }
        }
        Ok(wf)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        let mut wf = wavefront.clone();
        for (layer, propagator) in self.layers.iter().zip(&self.propagators) {
            if self.scintillation {
                wf = propagator.backward(&wf)?;
            }
            wf = layer.backward(&wf)?;
        }
        Ok(wf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use num_complex::Complex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(grid: &Grid, height: f64, seed: u64) -> AtmosphericLayer {
        let parameters = LayerParameters::new(2e-13, 20.0, 10.0, height).with_wind_direction(1.0);
        AtmosphericLayer::with_rng(grid, parameters, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn plane_wave(grid: &Grid) -> Wavefront {
        Wavefront::new(Field::ones(grid.clone()), 1.0e-6).unwrap()
    }

    #[test]
    fn layers_are_sorted_by_height() {
        let grid = Grid::pupil(16, 0.5).unwrap();
        let atmosphere = MultiLayerAtmosphere::new(
            vec![layer(&grid, 5000.0, 1), layer(&grid, 100.0, 2), layer(&grid, 900.0, 3)],
            true,
        )
        .unwrap();
        let heights: Vec<f64> = atmosphere.layers().iter().map(|l| l.height()).collect();
        assert_eq!(heights, vec![100.0, 900.0, 5000.0]);
        assert!((atmosphere.integrated_cn_squared() - 6e-13).abs() < 1e-25);
    }

    #[test]
    fn without_scintillation_phases_add() {
        let grid = Grid::pupil(16, 0.5).unwrap();
        let atmosphere = MultiLayerAtmosphere::new(
            vec![layer(&grid, 100.0, 1), layer(&grid, 2000.0, 2)],
            false,
        )
        .unwrap();
        let out = atmosphere.forward(&plane_wave(&grid)).unwrap();

        let a = atmosphere.layers()[0].phase_for(1.0e-6).unwrap();
        let b = atmosphere.layers()[1].phase_for(1.0e-6).unwrap();
        for ((e, pa), pb) in out
            .electric_field()
            .values()
            .iter()
            .zip(a.values().iter())
            .zip(b.values().iter())
        {
            let expected = Complex::new(0.0, pa + pb).exp();
            assert!((e - expected).norm() < 1e-12);
        }
    }

    #[test]
    fn backward_undoes_forward() {
        let grid = Grid::pupil(32, 0.5).unwrap();
        let atmosphere = MultiLayerAtmosphere::new(
            vec![layer(&grid, 300.0, 4), layer(&grid, 1200.0, 5)],
            true,
        )
        .unwrap();
        let wf = plane_wave(&grid);
        let out = atmosphere.forward(&wf).unwrap();
        assert!((out.total_power() - wf.total_power()).abs() < 1e-10);
        let back = atmosphere.backward(&out).unwrap();
        for e in back.electric_field().values().iter() {
            assert!((e - Complex::new(1.0, 0.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn evolves_every_layer() {
        let grid = Grid::pupil(16, 0.5).unwrap();
        let mut atmosphere = MultiLayerAtmosphere::new(
            vec![layer(&grid, 100.0, 1), layer(&grid, 2000.0, 2)],
            true,
        )
        .unwrap();
        atmosphere.evolve_until(0.25).unwrap();
        assert_eq!(atmosphere.t(), 0.25);
        assert!(atmosphere.layers().iter().all(|l| l.t() == 0.25));
    }

    #[test]
    fn rejects_invalid_stacks() {
        let grid = Grid::pupil(16, 0.5).unwrap();
        let other = Grid::pupil(16, 1.0).unwrap();
        assert!(MultiLayerAtmosphere::new(Vec::new(), true).is_err());
        assert!(MultiLayerAtmosphere::new(vec![layer(&grid, 100.0, 1), layer(&other, 200.0, 2)], true).is_err());
        assert!(MultiLayerAtmosphere::with_observation_height(vec![layer(&grid, 100.0, 1)], true, 500.0).is_err());
    }
}
