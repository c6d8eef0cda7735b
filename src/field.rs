use ndarray::{Array2, Zip};
use num_complex::Complex;

use crate::error::{Error, Result};
use crate::grid::Grid;

pub type Complex64 = Complex<f64>;

/// Values sampled on a [`Grid`], one per grid point.
///
/// Fields are values: there is no way to mutate the samples of an existing field, every
/// operation returns a new one. Cloning copies the samples.
#[derive(Clone, Debug)]
pub struct Field<T = Complex64> {
    grid: Grid,
    values: Array2<T>,
}

impl<T: Clone> Field<T> {
    pub fn new(grid: Grid, values: Array2<T>) -> Result<Self> {
        if values.shape() != grid.shape() {
            return Err(Error::Configuration(format!(
                "field values of shape {:?} do not fit a grid of shape {:?}",
                values.shape(),
                grid.shape()
            )));
        }
        let values = if values.is_standard_layout() {
            values
        } else {
            values.as_standard_layout().into_owned()
        };
        Ok(Field { grid, values })
    }

    /// Builds a field from row-major samples.
    pub fn from_vec(grid: Grid, values: Vec<T>) -> Result<Self> {
        if values.len() != grid.size() {
            return Err(Error::Configuration(format!(
                "{} values cannot be placed on a grid of {} points",
                values.len(),
                grid.size()
            )));
        }
        let values = Array2::from_shape_vec(grid.shape(), values)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(Field { grid, values })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn values(&self) -> &Array2<T> {
        &self.values
    }

    pub fn into_values(self) -> Array2<T> {
        self.values
    }

    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Field<U> {
        Field {
            grid: self.grid.clone(),
            values: self.values.map(f),
        }
    }

    /// Element-wise combination of two fields on matching grids.
    pub fn zip_with<U, V, F>(&self, other: &Field<U>, f: F) -> Result<Field<V>>
    where
        U: Clone,
        F: Fn(&T, &U) -> V,
    {
        self.grid.ensure_matches(&other.grid)?;
        let values = Zip::from(&self.values)
            .and(&other.values)
            .map_collect(|a, b| f(a, b));
        Ok(Field {
            grid: self.grid.clone(),
            values,
        })
    }

    /// Same values, reinterpreted on a grid of the same shape.
    pub(crate) fn regrid(self, grid: Grid) -> Result<Self> {
        Field::new(grid, self.values)
    }
}

impl Field<Complex64> {
    pub fn ones(grid: Grid) -> Self {
        let values = Array2::from_elem(grid.shape(), Complex::new(1.0, 0.0));
        Field { grid, values }
    }

    /// Multiplies by a real field (an aperture mask, an amplitude screen, ...).
    pub fn multiply(&self, mask: &Field<f64>) -> Result<Self> {
        self.zip_with(mask, |e, &m| e * m)
    }

    pub fn scale(&self, factor: f64) -> Self {
        self.map(|e| e * factor)
    }

    pub fn norm_sqr_sum(&self) -> f64 {
        self.values.iter().fold(0.0, |sum, v| sum + v.norm_sqr())
    }

    /// Calculates the area weighted sum of the squared norm of the field.
    ///
    /// This results in a conserved value, Radiant flux.
    pub fn intensity_integral(&self) -> f64 {
        self.norm_sqr_sum() * self.grid.cell_area()
    }
}

impl Field<f64> {
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn to_complex(&self) -> Field<Complex64> {
        self.map(|&v| Complex::new(v, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_must_match_grid() {
        let grid = Grid::new([2, 3], (1.0, 1.0)).unwrap();
        assert!(Field::from_vec(grid.clone(), vec![0.0; 5]).is_err());
        assert!(Field::new(grid.clone(), Array2::<f64>::zeros([3, 2])).is_err());
        let field = Field::from_vec(grid, (0..6).map(|v| v as f64).collect()).unwrap();
        assert_eq!(field.values()[[1, 0]], 3.0);
    }

    #[test]
    fn arithmetic_requires_matching_grids() {
        let a = Field::ones(Grid::new([4, 4], (1.0, 1.0)).unwrap());
        let mask = Field::from_vec(Grid::new([4, 4], (2.0, 2.0)).unwrap(), vec![1.0; 16]).unwrap();
        assert!(a.multiply(&mask).is_err());
    }

    #[test]
    fn operations_do_not_alias() {
        let grid = Grid::new([2, 2], (1.0, 1.0)).unwrap();
        let field = Field::ones(grid.clone());
        let mask = Field::from_vec(grid, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let masked = field.multiply(&mask).unwrap();
        assert_eq!(masked.norm_sqr_sum(), 2.0);
        assert_eq!(field.norm_sqr_sum(), 4.0);
    }

    #[test]
    fn transposed_values_are_normalised() {
        let grid = Grid::new([2, 3], (1.0, 1.0)).unwrap();
        let values = Array2::from_shape_vec([3, 2], vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0])
            .unwrap()
            .reversed_axes();
        let field = Field::new(grid, values).unwrap();
        assert!(field.values().is_standard_layout());
        assert_eq!(field.values().as_slice().unwrap(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
