use std::sync::Arc;

use ndarray::Zip;

use super::MicroLensArray;
use crate::error::{Error, Result};
use crate::field::Field;

/// Estimate for one active sub-aperture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubapertureEstimate {
    /// Flat index of the lenslet in the lenslet grid.
    pub lenslet: usize,
    /// Lenslet center, `(y, x)`.
    pub center: (f64, f64),
    /// Estimate along `(y, x)`.
    pub value: (f64, f64),
}

/// Which of `fluxes` reach `fraction` of the largest.
pub fn flux_threshold_mask(fluxes: &[f64], fraction: f64) -> Result<Vec<bool>> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::Configuration(format!(
            "flux threshold must be a fraction between 0 and 1, found {}",
            fraction
        )));
    }
    let max = fluxes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Ok(fluxes.iter().map(|&f| f >= fraction * max).collect())
}

// per-lenslet Σ I, Σ y I, Σ x I
struct Moments {
    flux: Vec<f64>,
    y: Vec<f64>,
    x: Vec<f64>,
}

/// Centroid estimator for Shack-Hartmann images.
///
/// Centroids are measured in the detector plane relative to each lenslet center. After
/// [`calibrate`](ShackHartmannEstimator::calibrate) the centroids of the reference exposure are
/// subtracted from every estimate.
///
/// An active sub-aperture that receives no light makes the centroid undefined; estimation then
/// fails with [`Error::ZeroFlux`] instead of returning NaN. Use
/// [`select_by_flux`](ShackHartmannEstimator::select_by_flux) to drop dim sub-apertures first.
#[derive(Clone, Debug)]
pub struct ShackHartmannEstimator {
    micro_lens_array: Arc<MicroLensArray>,
    // sorted lenslet indices
    active: Vec<usize>,
    reference: Option<Vec<(f64, f64)>>,
}

impl ShackHartmannEstimator {
    /// Every lenslet that covers at least one sample is active.
    pub fn new(micro_lens_array: Arc<MicroLensArray>) -> Self {
        let mut covered = vec![false; micro_lens_array.num_lenslets()];
        for &i in micro_lens_array.mla_index().iter() {
            covered[i] = true;
        }
        let active = (0..covered.len()).filter(|&i| covered[i]).collect();
        ShackHartmannEstimator {
            micro_lens_array,
            active,
            reference: None,
        }
    }

    pub fn with_active_subapertures(
        micro_lens_array: Arc<MicroLensArray>,
        mut active: Vec<usize>,
    ) -> Result<Self> {
        let n = micro_lens_array.num_lenslets();
        if let Some(&bad) = active.iter().find(|&&i| i >= n) {
            return Err(Error::Configuration(format!(
                "sub-aperture {} does not exist in an array of {} lenslets",
                bad, n
            )));
        }
        active.sort_unstable();
        active.dedup();
        Ok(ShackHartmannEstimator {
            micro_lens_array,
            active,
            reference: None,
        })
    }

    pub fn micro_lens_array(&self) -> &Arc<MicroLensArray> {
        &self.micro_lens_array
    }

    pub fn active_subapertures(&self) -> &[usize] {
        &self.active
    }

    pub fn is_calibrated(&self) -> bool {
        self.reference.is_some()
    }

    fn moments(&self, image: &Field<f64>) -> Result<Moments> {
        self.micro_lens_array.input_grid().ensure_matches(image.grid())?;
        let n = self.micro_lens_array.num_lenslets();
        let mut moments = Moments {
            flux: vec![0.0; n],
            y: vec![0.0; n],
            x: vec![0.0; n],
        };
        let grid = image.grid();
        let (y, x) = (grid.y_coords(), grid.x_coords());
        Zip::indexed(image.values())
            .and(self.micro_lens_array.mla_index())
            .for_each(|(i, j), &intensity, &lenslet| {
                moments.flux[lenslet] += intensity;
                moments.y[lenslet] += y[i] * intensity;
                moments.x[lenslet] += x[j] * intensity;
            });
        Ok(moments)
    }

    /// Total intensity in each active sub-aperture.
    pub fn subaperture_fluxes(&self, image: &Field<f64>) -> Result<Vec<f64>> {
        let moments = self.moments(image)?;
        Ok(self.active.iter().map(|&i| moments.flux[i]).collect())
    }

    /// Keeps the active sub-apertures whose flux in `reference` reaches `fraction` of the brightest.
    ///
    /// Any calibration is discarded.
    pub fn select_by_flux(self, reference: &Field<f64>, fraction: f64) -> Result<Self> {
        let fluxes = self.subaperture_fluxes(reference)?;
        let mask = flux_threshold_mask(&fluxes, fraction)?;
        let active: Vec<usize> = self
            .active
            .iter()
            .zip(mask)
            .filter(|(_, keep)| *keep)
            .map(|(&i, _)| i)
            .collect();
        log::debug!(
            "kept {} of {} sub-apertures above {} of peak flux",
            active.len(),
            self.active.len(),
            fraction
        );
        Ok(ShackHartmannEstimator {
            micro_lens_array: self.micro_lens_array,
            active,
            reference: None,
        })
    }

    /// Flux weighted centroid of each active sub-aperture, relative to its lenslet center.
    pub fn centroids(&self, image: &Field<f64>) -> Result<Vec<(f64, f64)>> {
        let moments = self.moments(image)?;
        self.active
            .iter()
            .map(|&i| {
                let flux = moments.flux[i];
                if !(flux > 0.0) {
                    return Err(Error::ZeroFlux { subaperture: i });
                }
                let (cy, cx) = self.micro_lens_array.center(i);
                Ok((moments.y[i] / flux - cy, moments.x[i] / flux - cx))
            })
            .collect()
    }

    /// Records the centroids of an unaberrated exposure as the zero point.
    pub fn calibrate(&mut self, reference: &Field<f64>) -> Result<()> {
        self.reference = Some(self.centroids(reference)?);
        Ok(())
    }

    /// Centroid shift of each active sub-aperture, in metres.
    ///
    /// Only `images[0]` is reduced; any further images are ignored. An empty slice is a
    /// configuration error.
    pub fn estimate(&self, images: &[Field<f64>]) -> Result<Vec<SubapertureEstimate>> {
        let image = images.first().ok_or_else(|| {
            Error::Configuration("at least one image is needed for estimation".to_string())
        })?;
        let centroids = self.centroids(image)?;
        Ok(self
            .active
            .iter()
            .enumerate()
            .map(|(k, &i)| {
                let (mut y, mut x) = centroids[k];
                if let Some(reference) = &self.reference {
                    y -= reference[k].0;
                    x -= reference[k].1;
                }
                SubapertureEstimate {
                    lenslet: i,
                    center: self.micro_lens_array.center(i),
                    value: (y, x),
                }
            })
            .collect())
    }

    /// Local wavefront tilt in radians: centroid shift over lenslet focal length.
    pub fn estimate_slopes(&self, images: &[Field<f64>]) -> Result<Vec<SubapertureEstimate>> {
        let focal_length = self.micro_lens_array.focal_length();
        Ok(self
            .estimate(images)?
            .into_iter()
            .map(|mut e| {
                e.value = (e.value.0 / focal_length, e.value.1 / focal_length);
                e
            })
            .collect())
    }

    /// Relative field amplitude `sqrt(flux / max flux)` of each active sub-aperture.
    pub fn estimate_amplitude(&self, image: &Field<f64>) -> Result<Vec<f64>> {
        let fluxes = self.subaperture_fluxes(image)?;
        let max = fluxes.iter().cloned().fold(0.0, f64::max);
        if !(max > 0.0) {
            return Err(Error::ZeroFlux {
                subaperture: self.active.first().cloned().unwrap_or(0),
            });
        }
        Ok(fluxes.iter().map(|f| (f.max(0.0) / max).sqrt()).collect())
    }
}
