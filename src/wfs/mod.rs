//! Shack-Hartmann and focused plenoptic wavefront sensors.

use serde::{Deserialize, Serialize};

use crate::error::{positive, Error, Result};
use crate::grid::Grid;
use crate::{airy_radius, na};

mod estimator;
mod microlens;
mod optics;

pub use estimator::{flux_threshold_mask, ShackHartmannEstimator, SubapertureEstimate};
pub use microlens::MicroLensArray;
pub use optics::{
    FocusedPlenopticOptics, Magnifier, OpticalElement, OpticalSystem, ShackHartmannOptics,
    WavefrontSensorOptics,
};

/// Square lenslet array covering a pupil.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LensletGeometry {
    /// Focal ratio of each lenslet.
    pub f_number: f64,
    /// Number of lenslets across the pupil diameter.
    pub num_lenslets: usize,
    /// Pupil diameter, m.
    pub pupil_diameter: f64,
}

impl LensletGeometry {
    pub fn new(f_number: f64, num_lenslets: usize, pupil_diameter: f64) -> Self {
        LensletGeometry {
            f_number,
            num_lenslets,
            pupil_diameter,
        }
    }

    fn validate(&self) -> Result<()> {
        positive("lenslet f-number", self.f_number)?;
        positive("pupil diameter", self.pupil_diameter)?;
        if self.num_lenslets == 0 {
            return Err(Error::NonPositive {
                name: "lenslet count",
                value: 0.0,
            });
        }
        Ok(())
    }

    pub fn lenslet_diameter(&self) -> f64 {
        self.pupil_diameter / self.num_lenslets as f64
    }

    pub fn focal_length(&self) -> f64 {
        self.f_number * self.lenslet_diameter()
    }

    /// Lenslet centers every lenslet diameter from `-D` up to `D - d`.
    pub fn mla_grid(&self) -> Result<Grid> {
        self.validate()?;
        let d = self.lenslet_diameter();
        Grid::new([2 * self.num_lenslets, 2 * self.num_lenslets], (d, d))
    }

    /// Radius of the diffraction limited spot behind one lenslet at `wavelength`.
    pub fn spot_radius(&self, wavelength: f64) -> f64 {
        airy_radius(na(self.lenslet_diameter(), self.focal_length(), 1.0), wavelength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_lenslet_layout() {
        let geometry = LensletGeometry::new(100.0, 8, 0.01);
        let grid = geometry.mla_grid().unwrap();
        assert_eq!(grid.shape(), [16, 16]);
        let x = grid.x_coords();
        assert!((x[0] + 0.01).abs() < 1e-15);
        assert!((x[15] - 0.00875).abs() < 1e-15);
        assert!((geometry.focal_length() - 0.125).abs() < 1e-15);
        // λ f / d spot
        assert!((geometry.spot_radius(1e-6) / (1.22 * 1e-6 * 100.0) - 1.0).abs() < 1e-4);
        assert!(LensletGeometry::new(100.0, 0, 0.01).mla_grid().is_err());
    }
}
