use crate::error::Result;
use crate::fraunhofer::FraunhoferPropagator;
use crate::fresnel::FresnelPropagator;
use crate::grid::Grid;
use crate::wavefront::Wavefront;

/// Any of the free-space propagators, as a single optical element.
#[derive(Debug)]
pub enum Propagator {
    Fresnel(FresnelPropagator),
    Fraunhofer(FraunhoferPropagator),
}

impl Propagator {
    pub fn input_grid(&self) -> &Grid {
        match self {
            Propagator::Fresnel(p) => p.input_grid(),
            Propagator::Fraunhofer(p) => p.input_grid(),
        }
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        match self {
            Propagator::Fresnel(p) => p.forward(wavefront),
            Propagator::Fraunhofer(p) => p.forward(wavefront),
        }
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        match self {
            Propagator::Fresnel(p) => p.backward(wavefront),
            Propagator::Fraunhofer(p) => p.backward(wavefront),
        }
    }
}

impl From<FresnelPropagator> for Propagator {
    fn from(p: FresnelPropagator) -> Self {
        Propagator::Fresnel(p)
    }
}

impl From<FraunhoferPropagator> for Propagator {
    fn from(p: FraunhoferPropagator) -> Self {
        Propagator::Fraunhofer(p)
    }
}
