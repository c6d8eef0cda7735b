use ndarray::Array2;

use crate::error::{positive, Result};
use crate::field::Field;
use crate::grid::{centered_par_iter, Grid};

// returns 1.0 if greater than nominal, with a soft transition of a distance of 1.0 straddling the nominal transition.
fn soft_greater_than(x: f64, x_nominal: f64, pitch: f64) -> f64 {
    if x < x_nominal - 0.5 * pitch {
        0.0
    } else if x > x_nominal + 0.5 * pitch {
        1.0
    } else {
        (x - (x_nominal - 0.5 * pitch)) / pitch
    }
}

/// Hard-edged circular aperture: 1 where `r <= radius`, 0 elsewhere.
pub fn circular_aperture(grid: &Grid, radius: f64) -> Result<Field<f64>> {
    let radius = positive("aperture radius", radius)?;
    build(grid, |r| if r <= radius { 1.0 } else { 0.0 })
}

/// Circular aperture with an optional central obscuration, anti-aliased over one sample.
pub fn soft_circular_aperture(grid: &Grid, radius: f64, obscuration: f64) -> Result<Field<f64>> {
    let radius = positive("aperture radius", radius)?;
    let pitch = grid.pitch().0.min(grid.pitch().1);
    build(grid, |r| {
        let mut value = 1.0 - soft_greater_than(r, radius, pitch);
        if obscuration > 0.0 {
            value *= soft_greater_than(r, obscuration, pitch);
        }
        value
    })
}

fn build<F: Fn(f64) -> f64 + Sync + Send>(grid: &Grid, profile: F) -> Result<Field<f64>> {
    let mut mask = Array2::zeros(grid.shape());
    centered_par_iter(&mut mask, grid.pitch(), |(y, x), e: &mut f64| {
        *e = profile(y.hypot(x))
    });
    Field::new(grid.clone(), mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_aperture_area() {
        let grid = Grid::pupil(256, 2.0).unwrap();
        let mask = circular_aperture(&grid, 1.0).unwrap();
        let area = mask.sum() * grid.cell_area();
        assert!((area - std::f64::consts::PI).abs() < 0.01, "{}", area);
        assert_eq!(mask.values()[[128, 128]], 1.0);
        assert_eq!(mask.values()[[0, 0]], 0.0);
    }

    #[test]
    fn soft_edge_is_bounded() {
        let grid = Grid::pupil(64, 2.0).unwrap();
        let mask = soft_circular_aperture(&grid, 0.8, 0.2).unwrap();
        assert!(mask.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
        // centre is obscured
        assert_eq!(mask.values()[[32, 32]], 0.0);
        assert_eq!(mask.values()[[32, 40]], 1.0);
    }

    #[test]
    fn soft_step() {
        assert_eq!(soft_greater_than(0.0, 1.0, 1.0), 0.0);
        assert_eq!(soft_greater_than(1.0, 1.0, 1.0), 0.5);
        assert_eq!(soft_greater_than(2.0, 1.0, 1.0), 1.0);
    }
}
