use ndarray::{Array1, Array2, Zip};

use crate::error::{positive, Error, Result};

/// A regularly sampled, centered coordinate grid.
///
/// Axis 0 is `y` (rows) and axis 1 is `x` (columns), as for the sample arrays.
/// Sample `i` on an axis of length `n` sits at `(i - n/2) * pitch` (integer division),
/// so the origin is always at index `n/2`, the same place the centered FFT puts DC.
///
/// A 1-D grid is stored as a single row, `[1, n]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    shape: [usize; 2],
    pitch: (f64, f64),
    ndim: usize,
}

impl Grid {
    /// * `shape` - `[rows, columns]`
    /// * `pitch` - sample spacing `(dy, dx)`
    pub fn new(shape: [usize; 2], pitch: (f64, f64)) -> Result<Self> {
        if shape[0] == 0 || shape[1] == 0 {
            return Err(Error::Configuration(format!(
                "grid shape must be non-empty, found {:?}",
                shape
            )));
        }
        positive("grid pitch", pitch.0)?;
        positive("grid pitch", pitch.1)?;
        Ok(Grid {
            shape,
            pitch,
            ndim: 2,
        })
    }

    pub fn new_1d(n: usize, pitch: f64) -> Result<Self> {
        let mut grid = Grid::new([1, n], (1.0, pitch))?;
        grid.ndim = 1;
        Ok(grid)
    }

    /// Square grid of `n x n` samples spanning `diameter` on each axis.
    pub fn pupil(n: usize, diameter: f64) -> Result<Self> {
        let diameter = positive("pupil diameter", diameter)?;
        if n == 0 {
            return Err(Error::NonPositive {
                name: "pupil sample count",
                value: 0.0,
            });
        }
        let pitch = diameter / n as f64;
        Grid::new([n, n], (pitch, pitch))
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn pitch(&self) -> (f64, f64) {
        self.pitch
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Number of sample points.
    pub fn size(&self) -> usize {
        self.shape[0] * self.shape[1]
    }

    /// Physical size `(height, width)`.
    pub fn extent(&self) -> (f64, f64) {
        (
            self.shape[0] as f64 * self.pitch.0,
            self.shape[1] as f64 * self.pitch.1,
        )
    }

    /// Area associated with a single sample.
    pub fn cell_area(&self) -> f64 {
        self.pitch.0 * self.pitch.1
    }

    /// Same dimensionality and point count.
    pub fn is_compatible(&self, other: &Grid) -> bool {
        self.ndim == other.ndim && self.size() == other.size()
    }

    /// Same shape and, to within floating point noise, the same pitch.
    pub fn matches(&self, other: &Grid) -> bool {
        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
        }
        self.ndim == other.ndim
            && self.shape == other.shape
            && close(self.pitch.0, other.pitch.0)
            && close(self.pitch.1, other.pitch.1)
    }

    pub(crate) fn ensure_matches(&self, other: &Grid) -> Result<()> {
        if self.matches(other) {
            Ok(())
        } else {
            Err(Error::IncompatibleGrids {
                expected: self.clone(),
                found: other.clone(),
            })
        }
    }

    /// The spatial-frequency grid of a DFT over this grid: same shape, pitch `1/(N * d)`.
    pub fn conjugate(&self) -> Grid {
        Grid {
            shape: self.shape,
            pitch: (
                1.0 / (self.shape[0] as f64 * self.pitch.0),
                1.0 / (self.shape[1] as f64 * self.pitch.1),
            ),
            ndim: self.ndim,
        }
    }

    pub fn scaled(&self, factor: f64) -> Result<Grid> {
        let factor = positive("grid scale factor", factor)?;
        Ok(Grid {
            shape: self.shape,
            pitch: (self.pitch.0 * factor, self.pitch.1 * factor),
            ndim: self.ndim,
        })
    }

    pub fn y_coords(&self) -> Array1<f64> {
        axis_coords(self.shape[0], self.pitch.0)
    }

    pub fn x_coords(&self) -> Array1<f64> {
        axis_coords(self.shape[1], self.pitch.1)
    }

    pub fn y(&self) -> Array2<f64> {
        let y = self.y_coords();
        Array2::from_shape_fn(self.shape, |(i, _)| y[i])
    }

    pub fn x(&self) -> Array2<f64> {
        let x = self.x_coords();
        Array2::from_shape_fn(self.shape, |(_, j)| x[j])
    }

    /// Polar radius of every sample.
    pub fn r(&self) -> Array2<f64> {
        let (y, x) = (self.y_coords(), self.x_coords());
        Array2::from_shape_fn(self.shape, |(i, j)| y[i].hypot(x[j]))
    }

    /// Polar angle of every sample, measured from +x.
    pub fn theta(&self) -> Array2<f64> {
        let (y, x) = (self.y_coords(), self.x_coords());
        Array2::from_shape_fn(self.shape, |(i, j)| y[i].atan2(x[j]))
    }

    /// `(y, x)` of the sample at row-major `index`.
    pub fn point(&self, index: usize) -> (f64, f64) {
        let i = index / self.shape[1];
        let j = index % self.shape[1];
        (
            centered(i, self.shape[0], self.pitch.0),
            centered(j, self.shape[1], self.pitch.1),
        )
    }
}

#[inline]
pub(crate) fn centered(i: usize, n: usize, pitch: f64) -> f64 {
    (i as f64 - (n / 2) as f64) * pitch
}

pub(crate) fn centered_par_iter<T, F>(array: &mut Array2<T>, (dh, dw): (f64, f64), f: F)
where
    T: Send,
    F: Fn((f64, f64), &mut T) + Sync + Send,
{
    let h = array.shape()[0];
    let w = array.shape()[1];
    Zip::indexed(array).par_for_each(|(y, x), e| f((centered(y, h, dh), centered(x, w, dw)), e));
}

fn axis_coords(n: usize, pitch: f64) -> Array1<f64> {
    Array1::from_shape_fn(n, |i| centered(i, n, pitch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_grids() {
        assert!(Grid::new([0, 4], (1.0, 1.0)).is_err());
        assert!(Grid::new([4, 4], (0.0, 1.0)).is_err());
        assert!(Grid::new([4, 4], (1.0, -2.0)).is_err());
        assert!(Grid::pupil(0, 1.0).is_err());
        assert!(Grid::pupil(8, f64::NAN).is_err());
    }

    #[test]
    fn origin_is_at_half_length() {
        let grid = Grid::pupil(8, 1.0).unwrap();
        let x = grid.x_coords();
        assert_eq!(x[4], 0.0);
        assert_eq!(x[0], -0.5);
        assert_eq!(x[7], 0.375);

        let odd = Grid::new([1, 5], (1.0, 2.0)).unwrap();
        assert_eq!(odd.x_coords().to_vec(), vec![-4.0, -2.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn conjugate_pitch() {
        let grid = Grid::new([16, 32], (0.5, 0.25)).unwrap();
        let conj = grid.conjugate();
        assert_eq!(conj.shape(), [16, 32]);
        assert_eq!(conj.pitch(), (1.0 / 8.0, 1.0 / 8.0));
        assert!(conj.conjugate().matches(&grid));
    }

    #[test]
    fn compatibility_versus_matching() {
        let a = Grid::new([4, 8], (1.0, 1.0)).unwrap();
        let b = Grid::new([8, 4], (1.0, 1.0)).unwrap();
        let c = Grid::new_1d(32, 1.0).unwrap();
        assert!(a.is_compatible(&b));
        assert!(!a.matches(&b));
        assert!(!a.is_compatible(&c));
        assert_eq!(c.ndim(), 1);
    }

    #[test]
    fn polar_view() {
        let grid = Grid::pupil(4, 4.0).unwrap();
        let r = grid.r();
        let theta = grid.theta();
        assert_eq!(r[[2, 2]], 0.0);
        assert_eq!(r[[2, 3]], 1.0);
        assert!((theta[[3, 2]] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(grid.point(2 * 4 + 3), (0.0, 1.0));
    }
}
