use ndarray::{Array2, Zip};

use crate::error::{positive, Result};
use crate::field::Field;
use crate::grid::Grid;
use crate::wavefront::Wavefront;

/// Ideal detector: accumulates power times exposure time, no noise.
#[derive(Clone, Debug)]
pub struct NoiselessDetector {
    grid: Grid,
    accumulated: Array2<f64>,
}

impl NoiselessDetector {
    pub fn new(grid: Grid) -> Self {
        let accumulated = Array2::zeros(grid.shape());
        NoiselessDetector { grid, accumulated }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Adds the power falling on each pixel over `exposure_time`.
    pub fn integrate(&mut self, wavefront: &Wavefront, exposure_time: f64) -> Result<()> {
        let exposure_time = positive("exposure time", exposure_time)?;
        self.grid.ensure_matches(wavefront.grid())?;
        let area = self.grid.cell_area();
        Zip::from(&mut self.accumulated)
            .and(wavefront.electric_field().values())
            .par_for_each(|a, e| *a += e.norm_sqr() * area * exposure_time);
        Ok(())
    }

    /// Returns the accumulated image and starts a new exposure.
    pub fn read_out(&mut self) -> Result<Field<f64>> {
        let image = std::mem::replace(&mut self.accumulated, Array2::zeros(self.grid.shape()));
        log::trace!("read out {:?} detector", self.grid.shape());
        Field::new(self.grid.clone(), image)
    }
}
