use std::f64::consts::PI;

use ndarray::{Array2, Zip};
use num_complex::Complex;

use crate::error::{positive, Error, Result};
use crate::field::{Complex64, Field};
use crate::grid::Grid;
use crate::wavefront::Wavefront;

/// A regular array of thin lenses, each covering the input samples closest to its center.
///
/// The index map assigning input samples to lenslets is computed once and shared, read only, by
/// sensor optics and estimators built on the same array.
#[derive(Debug)]
pub struct MicroLensArray {
    input_grid: Grid,
    mla_grid: Grid,
    focal_length: f64,
    mla_index: Array2<usize>,
    // offset of every input sample from the center of its lenslet, (dy, dx)
    offsets: Array2<(f64, f64)>,
}

// nearest center along one axis of a centered lattice, clamped to the array
fn nearest(coordinate: f64, pitch: f64, n: usize) -> usize {
    let i = (coordinate / pitch + (n / 2) as f64).round();
    i.max(0.0).min((n - 1) as f64) as usize
}

impl MicroLensArray {
    /// * `input_grid` - grid of the wavefronts passing through the array
    /// * `mla_grid` - lenslet centers
    /// * `focal_length` - focal length shared by every lenslet
    pub fn new(input_grid: &Grid, mla_grid: Grid, focal_length: f64) -> Result<Self> {
        let focal_length = positive("lenslet focal length", focal_length)?;
        if input_grid.ndim() != 2 || mla_grid.ndim() != 2 {
            return Err(Error::Configuration(
                "micro lens arrays need two dimensional grids".to_string(),
            ));
        }

        let [mh, mw] = mla_grid.shape();
        let (py, px) = mla_grid.pitch();
        let (y, x) = (input_grid.y_coords(), input_grid.x_coords());

        let mut mla_index = Array2::zeros(input_grid.shape());
        let mut offsets = Array2::from_elem(input_grid.shape(), (0.0, 0.0));
        Zip::indexed(&mut mla_index)
            .and(&mut offsets)
            .par_for_each(|(i, j), index, offset| {
                let row = nearest(y[i], py, mh);
                let column = nearest(x[j], px, mw);
                *index = row * mw + column;
                let (cy, cx) = mla_grid.point(*index);
                *offset = (y[i] - cy, x[j] - cx);
            });
        log::debug!(
            "micro lens array of {:?} lenslets, f = {} m",
            mla_grid.shape(),
            focal_length
        );

        Ok(MicroLensArray {
            input_grid: input_grid.clone(),
            mla_grid,
            focal_length,
            mla_index,
            offsets,
        })
    }

    pub fn input_grid(&self) -> &Grid {
        &self.input_grid
    }

    pub fn mla_grid(&self) -> &Grid {
        &self.mla_grid
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Lenslet (flat index into the lenslet grid) of every input sample.
    pub fn mla_index(&self) -> &Array2<usize> {
        &self.mla_index
    }

    pub fn num_lenslets(&self) -> usize {
        self.mla_grid.size()
    }

    /// `(y, x)` of a lenslet center.
    pub fn center(&self, lenslet: usize) -> (f64, f64) {
        self.mla_grid.point(lenslet)
    }

    pub fn forward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.apply(wavefront, -1.0)
    }

    pub fn backward(&self, wavefront: &Wavefront) -> Result<Wavefront> {
        self.apply(wavefront, 1.0)
    }

    // exp(∓ i k r^2 / 2f) about each sample's own lenslet center
    fn apply(&self, wavefront: &Wavefront, sign: f64) -> Result<Wavefront> {
        self.input_grid.ensure_matches(wavefront.grid())?;
        let k = 2.0 * PI / wavefront.wavelength();
        let curvature = sign * k / (2.0 * self.focal_length);
        let values = Zip::from(wavefront.electric_field().values())
            .and(&self.offsets)
            .par_map_collect(|&e: &Complex64, &(dy, dx)| {
                e * Complex::new(0.0, curvature * (dy * dy + dx * dx)).exp()
            });
        let field = Field::new(self.input_grid.clone(), values)?;
        Ok(wavefront.with_electric_field(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_map_assigns_nearest_lenslet() {
        // 16 samples, lenslets every 4 samples centered at -8, -4, 0, 4 (in samples)
        let grid = Grid::pupil(16, 16.0).unwrap();
        let mla_grid = Grid::new([4, 4], (4.0, 4.0)).unwrap();
        let mla = MicroLensArray::new(&grid, mla_grid, 10.0).unwrap();
        let index = mla.mla_index();

        // sample at x = -8 belongs to column 0, x = 0 to column 2, x = 7 clamps to column 3
        assert_eq!(index[[8, 0]] % 4, 0);
        assert_eq!(index[[8, 8]] % 4, 2);
        assert_eq!(index[[8, 15]] % 4, 3);
        assert_eq!(index[[0, 8]] / 4, 0);
        assert_eq!(mla.center(index[[8, 8]]), (0.0, 0.0));
        assert_eq!(mla.num_lenslets(), 16);
    }

    #[test]
    fn lens_phase_is_quadratic_about_each_center() {
        let grid = Grid::pupil(8, 8.0).unwrap();
        let mla = MicroLensArray::new(&grid, Grid::new([2, 2], (4.0, 4.0)).unwrap(), 100.0).unwrap();
        let wf = Wavefront::new(Field::ones(grid), 1.0).unwrap();
        let out = mla.forward(&wf).unwrap();
        let phase = out.phase();

        // sample (y, x) = (0, 1) sits one unit from the center at the origin
        let expected = -2.0 * PI / (2.0 * 100.0);
        assert!((phase.values()[[4, 5]] - expected).abs() < 1e-12);
        assert_eq!(phase.values()[[4, 4]], 0.0);

        let back = mla.backward(&out).unwrap();
        for e in back.electric_field().values().iter() {
            assert!((e - Complex::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn rejects_mismatched_wavefronts() {
        let grid = Grid::pupil(8, 8.0).unwrap();
        let mla = MicroLensArray::new(&grid, Grid::new([2, 2], (4.0, 4.0)).unwrap(), 1.0).unwrap();
        let other = Wavefront::new(Field::ones(Grid::pupil(8, 4.0).unwrap()), 1.0).unwrap();
        assert!(mla.forward(&other).is_err());
        assert!(MicroLensArray::new(&grid, Grid::new([2, 2], (4.0, 4.0)).unwrap(), 0.0).is_err());
    }
}
