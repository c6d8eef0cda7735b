use std::sync::Arc;

use super::{LensletGeometry, MicroLensArray};
use crate::error::{positive, Result};
use crate::fresnel::FresnelPropagator;
use crate::grid::Grid;
use crate::propagator::Propagator;
use crate::wavefront::Wavefront;

/// Relay optics imaging a pupil onto a grid `magnification` times its size.
///
/// The field is divided by the magnification so the total power is unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Magnifier {
    magnification: f64,
}

impl Magnifier {
    pub fn new(magnification: f64) -> Result<Self> {
        Ok(Magnifier {
            magnification: positive("magnification", magnification)?,
        })
    }

    pub fn magnification(&self) -> f64 {
        self.magnification
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        magnify(wavefront, self.magnification)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        magnify(wavefront, 1.0 / self.magnification)
    }
}

fn magnify(wavefront: &Wavefront, magnification: f64) -> Result<Wavefront> {
    let grid = wavefront.grid().scaled(magnification)?;
    let field = wavefront
        .electric_field()
        .scale(1.0 / magnification)
        .regrid(grid)?;
    Ok(wavefront.with_electric_field(field))
}

/// A single stage of a sensor's optical chain.
#[derive(Debug)]
pub enum OpticalElement {
    Lenses(Arc<MicroLensArray>),
    Propagation(Propagator),
    Magnifier(Magnifier),
}

impl OpticalElement {
    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        match self {
            OpticalElement::Lenses(mla) => mla.forward(wavefront),
            OpticalElement::Propagation(p) => p.forward(wavefront),
            OpticalElement::Magnifier(m) => m.forward(wavefront),
        }
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        match self {
            OpticalElement::Lenses(mla) => mla.backward(wavefront),
            OpticalElement::Propagation(p) => p.backward(wavefront),
            OpticalElement::Magnifier(m) => m.backward(wavefront),
        }
    }
}

/// Elements applied in order.
#[derive(Debug)]
pub struct OpticalSystem {
    elements: Vec<OpticalElement>,
}

impl OpticalSystem {
    pub fn new(elements: Vec<OpticalElement>) -> Self {
        OpticalSystem { elements }
    }

    pub fn elements(&self) -> &[OpticalElement] {
        &self.elements
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        let mut wf = wavefront.clone();
        for element in &self.elements {
            wf = element.forward(&wf)?;
        }
        Ok(wf)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        let mut wf = wavefront.clone();
        for element in self.elements.iter().rev() {
            wf = element.backward(&wf)?;
        }
        Ok(wf)
    }
}

fn fresnel(input_grid: &Grid, distance: f64) -> Result<OpticalElement> {
    Ok(OpticalElement::Propagation(
        FresnelPropagator::new(input_grid, distance)?.into(),
    ))
}

/// Lenslet array followed by propagation over one lenslet focal length.
#[derive(Debug)]
pub struct ShackHartmannOptics {
    system: OpticalSystem,
    micro_lens_array: Arc<MicroLensArray>,
}

impl ShackHartmannOptics {
    pub fn new(input_grid: &Grid, micro_lens_array: Arc<MicroLensArray>) -> Result<Self> {
        input_grid.ensure_matches(micro_lens_array.input_grid())?;
        let system = OpticalSystem::new(vec![
            OpticalElement::Lenses(Arc::clone(&micro_lens_array)),
            fresnel(input_grid, micro_lens_array.focal_length())?,
        ]);
        Ok(ShackHartmannOptics {
            system,
            micro_lens_array,
        })
    }

    /// Square lenslet array as described by `geometry`.
    pub fn square(input_grid: &Grid, geometry: &LensletGeometry) -> Result<Self> {
        let mla = MicroLensArray::new(input_grid, geometry.mla_grid()?, geometry.focal_length())?;
        ShackHartmannOptics::new(input_grid, Arc::new(mla))
    }

    pub fn micro_lens_array(&self) -> &Arc<MicroLensArray> {
        &self.micro_lens_array
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.system.forward(wavefront)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.system.backward(wavefront)
    }
}

/// Objective lens focusing onto a lenslet array placed one lenslet focal length behind focus.
#[derive(Debug)]
pub struct FocusedPlenopticOptics {
    system: OpticalSystem,
    objective_lens: Arc<MicroLensArray>,
    micro_lens_array: Arc<MicroLensArray>,
}

impl FocusedPlenopticOptics {
    pub fn new(
        input_grid: &Grid,
        objective_lens: Arc<MicroLensArray>,
        micro_lens_array: Arc<MicroLensArray>,
    ) -> Result<Self> {
        input_grid.ensure_matches(objective_lens.input_grid())?;
        input_grid.ensure_matches(micro_lens_array.input_grid())?;
        let system = OpticalSystem::new(vec![
            OpticalElement::Lenses(Arc::clone(&objective_lens)),
            fresnel(
                input_grid,
                objective_lens.focal_length() + micro_lens_array.focal_length(),
            )?,
            OpticalElement::Lenses(Arc::clone(&micro_lens_array)),
            fresnel(input_grid, micro_lens_array.focal_length())?,
        ]);
        Ok(FocusedPlenopticOptics {
            system,
            objective_lens,
            micro_lens_array,
        })
    }

    /// * `f_number_objective` - focal ratio of the objective, whose diameter is the pupil diameter
    /// * `geometry` - the lenslet array behind it
    pub fn square(
        input_grid: &Grid,
        f_number_objective: f64,
        geometry: &LensletGeometry,
    ) -> Result<Self> {
        let f_number_objective = positive("objective f-number", f_number_objective)?;
        let mla_grid = geometry.mla_grid()?;
        let diameter = geometry.pupil_diameter;
        // a single lens at the origin; the second center lies outside the pupil
        let objective_grid = Grid::new([2, 2], (diameter, diameter))?;
        let objective = MicroLensArray::new(input_grid, objective_grid, f_number_objective * diameter)?;
        let mla = MicroLensArray::new(input_grid, mla_grid, geometry.focal_length())?;
        FocusedPlenopticOptics::new(input_grid, Arc::new(objective), Arc::new(mla))
    }

    pub fn objective_lens(&self) -> &Arc<MicroLensArray> {
        &self.objective_lens
    }

    pub fn micro_lens_array(&self) -> &Arc<MicroLensArray> {
        &self.micro_lens_array
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.system.forward(wavefront)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.system.backward(wavefront)
    }
}

/// Either sensor, behind a common interface.
#[derive(Debug)]
pub enum WavefrontSensorOptics {
    ShackHartmann(ShackHartmannOptics),
    FocusedPlenoptic(FocusedPlenopticOptics),
}

impl WavefrontSensorOptics {
    /// The lenslet array whose sub-apertures an estimator should use.
    pub fn micro_lens_array(&self) -> &Arc<MicroLensArray> {
        match self {
            WavefrontSensorOptics::ShackHartmann(o) => o.micro_lens_array(),
            WavefrontSensorOptics::FocusedPlenoptic(o) => o.micro_lens_array(),
        }
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        match self {
            WavefrontSensorOptics::ShackHartmann(o) => o.forward(wavefront),
            WavefrontSensorOptics::FocusedPlenoptic(o) => o.forward(wavefront),
        }
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        match self {
            WavefrontSensorOptics::ShackHartmann(o) => o.backward(wavefront),
            WavefrontSensorOptics::FocusedPlenoptic(o) => o.backward(wavefront),
        }
    }
}

impl From<ShackHartmannOptics> for WavefrontSensorOptics {
    fn from(o: ShackHartmannOptics) -> Self {
        WavefrontSensorOptics::ShackHartmann(o)
    }
}

impl From<FocusedPlenopticOptics> for WavefrontSensorOptics {
    fn from(o: FocusedPlenopticOptics) -> Self {
        WavefrontSensorOptics::FocusedPlenoptic(o)
    }
}
