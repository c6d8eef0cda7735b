use std::fmt;

use rustfft::{FftDirection, FftPlanner};

use crate::error::{positive, Result};
use crate::fft2::{fft2c_planned, Plan2};
use crate::field::{Complex64, Field};
use crate::grid::Grid;

/// Unitary centered DFT between a grid and its conjugate (spatial-frequency) grid.
///
/// `backward(forward(f)) == f` to floating point precision, and `Σ|E|²` is preserved
/// in both directions. DC sits at index `N/2` of the conjugate grid.
#[derive(Clone)]
pub struct FourierTransform {
    input_grid: Grid,
    output_grid: Grid,
    forward_plan: Plan2,
    backward_plan: Plan2,
}

impl FourierTransform {
    pub fn new(input_grid: &Grid) -> Result<Self> {
        let (height, width) = input_grid.extent();
        positive("grid extent", height)?;
        positive("grid extent", width)?;

        let mut planner = FftPlanner::new();
        let shape = input_grid.shape();
        log::trace!("planning {:?} centered fft", shape);
        Ok(FourierTransform {
            input_grid: input_grid.clone(),
            output_grid: input_grid.conjugate(),
            forward_plan: Plan2::new(&mut planner, shape, FftDirection::Forward),
            backward_plan: Plan2::new(&mut planner, shape, FftDirection::Inverse),
        })
    }

    pub fn input_grid(&self) -> &Grid {
        &self.input_grid
    }

    /// The conjugate grid, in cycles per unit length.
    pub fn output_grid(&self) -> &Grid {
        &self.output_grid
    }

    pub fn forward(&self, field: &Field<Complex64>) -> Result<Field<Complex64>> {
        self.input_grid.ensure_matches(field.grid())?;
        let mut values = field.values().to_owned();
        fft2c_planned(values.view_mut(), &self.forward_plan);
        Field::new(self.output_grid.clone(), values)
    }

    pub fn backward(&self, field: &Field<Complex64>) -> Result<Field<Complex64>> {
        self.output_grid.ensure_matches(field.grid())?;
        let mut values = field.values().to_owned();
        fft2c_planned(values.view_mut(), &self.backward_plan);
        Field::new(self.input_grid.clone(), values)
    }
}

impl fmt::Debug for FourierTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FourierTransform")
            .field("input_grid", &self.input_grid)
            .field("output_grid", &self.output_grid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use num_complex::Complex;

    fn test_field(grid: Grid) -> Field<Complex64> {
        let [h, w] = grid.shape();
        let values = Array2::from_shape_fn([h, w], |(y, x)| {
            Complex::new((y * 7 + x * 3) as f64 % 5.0 - 2.0, ((y + 2 * x) as f64).sin())
        });
        Field::new(grid, values).unwrap()
    }

    fn max_difference(a: &Field<Complex64>, b: &Field<Complex64>) -> f64 {
        a.values()
            .iter()
            .zip(b.values().iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn round_trip_2d() {
        for &shape in &[[8, 8], [7, 9], [16, 5]] {
            let grid = Grid::new(shape, (0.1, 0.2)).unwrap();
            let fft = FourierTransform::new(&grid).unwrap();
            let field = test_field(grid);
            let spectrum = fft.forward(&field).unwrap();
            assert!(spectrum.grid().matches(fft.output_grid()));
            let back = fft.backward(&spectrum).unwrap();
            assert!(max_difference(&field, &back) < 1e-12);
        }
    }

    #[test]
    fn round_trip_1d() {
        let grid = Grid::new_1d(33, 0.5).unwrap();
        let fft = FourierTransform::new(&grid).unwrap();
        let field = test_field(grid);
        let back = fft.backward(&fft.forward(&field).unwrap()).unwrap();
        assert!(max_difference(&field, &back) < 1e-12);
        assert_eq!(back.grid().ndim(), 1);
    }

    #[test]
    fn parseval() {
        let grid = Grid::new([12, 10], (1.0, 1.0)).unwrap();
        let fft = FourierTransform::new(&grid).unwrap();
        let field = test_field(grid);
        let spectrum = fft.forward(&field).unwrap();
        assert!((field.norm_sqr_sum() - spectrum.norm_sqr_sum()).abs() < 1e-9);
    }

    #[test]
    fn rejects_fields_on_other_grids() {
        let grid = Grid::new([8, 8], (1.0, 1.0)).unwrap();
        let fft = FourierTransform::new(&grid).unwrap();
        let other = Field::ones(Grid::new([8, 8], (0.5, 0.5)).unwrap());
        assert!(fft.forward(&other).is_err());
        // the input grid is not the conjugate grid
        assert!(fft.backward(&Field::ones(grid)).is_err());
    }
}
