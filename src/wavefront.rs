use std::f64::consts::PI;

use crate::error::{positive, Error, Result};
use crate::field::{Complex64, Field};
use crate::grid::Grid;

/// A monochromatic complex electric field.
///
/// Propagators, layers and lenses never touch the wavefront they are given; they return
/// a new one, so a stored reference can be reused across several optical branches.
#[derive(Clone, Debug)]
pub struct Wavefront {
    electric_field: Field<Complex64>,
    wavelength: f64,
}

impl Wavefront {
    pub fn new(electric_field: Field<Complex64>, wavelength: f64) -> Result<Self> {
        let wavelength = positive("wavelength", wavelength)?;
        Ok(Wavefront {
            electric_field,
            wavelength,
        })
    }

    pub fn electric_field(&self) -> &Field<Complex64> {
        &self.electric_field
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn grid(&self) -> &Grid {
        self.electric_field.grid()
    }

    /// Wavenumber `2π/λ`.
    pub fn wavenumber(&self) -> f64 {
        2.0 * PI / self.wavelength
    }

    pub fn amplitude(&self) -> Field<f64> {
        self.electric_field.map(|e| e.norm())
    }

    /// Phase wrapped to (-π, π], zero where there is no light.
    pub fn phase(&self) -> Field<f64> {
        self.electric_field.map(|e| {
            if e.norm_sqr() == 0.0 {
                return 0.0;
            }
            let phase = e.arg();
            if phase <= -PI {
                phase + 2.0 * PI
            } else {
                phase
            }
        })
    }

    pub fn intensity(&self) -> Field<f64> {
        self.electric_field.map(|e| e.norm_sqr())
    }

    /// Intensity times the area of each sample.
    pub fn power(&self) -> Field<f64> {
        let area = self.grid().cell_area();
        self.electric_field.map(|e| e.norm_sqr() * area)
    }

    pub fn total_power(&self) -> f64 {
        self.electric_field.intensity_integral()
    }

    /// The same wavefront rescaled to carry `total_power`.
    pub fn with_total_power(&self, total_power: f64) -> Result<Self> {
        if !(total_power.is_finite() && total_power >= 0.0) {
            return Err(Error::NonPositive {
                name: "total power",
                value: total_power,
            });
        }
        let current = self.total_power();
        if current <= 0.0 {
            return Err(Error::Configuration(
                "cannot normalise a wavefront that carries no power".to_string(),
            ));
        }
        Ok(Wavefront {
            electric_field: self.electric_field.scale((total_power / current).sqrt()),
            wavelength: self.wavelength,
        })
    }

    /// A wavefront at the same wavelength carrying `electric_field`.
    pub fn with_electric_field(&self, electric_field: Field<Complex64>) -> Self {
        Wavefront {
            electric_field,
            wavelength: self.wavelength,
        }
    }

    pub fn apply_mask(&self, mask: &Field<f64>) -> Result<Self> {
        Ok(self.with_electric_field(self.electric_field.multiply(mask)?))
    }
}
