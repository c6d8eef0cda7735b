use serde::{Deserialize, Serialize};

use super::{cn_squared_from_fried_parameter, LayerParameters, REFERENCE_WAVELENGTH};
use crate::error::Result;

/// Standard site models, as tables of `(height, velocity, Cn²)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AtmospherePreset {
    /// Six layers, 500 m to 16 km, all at 10 m/s.
    Standard { outer_scale: f64 },
    /// Seven layer Las Campanas model, scaled to a total Fried parameter at 500 nm.
    LasCampanas { fried_parameter: f64, outer_scale: f64 },
    /// Hufnagel-Valley 5/7 compressed to five layers.
    HufnagelValley57 { outer_scale: f64 },
    /// Hufnagel-Valley 5/7 compressed to ten layers between 250 m and 25 km.
    HufnagelValley57TenLayer { outer_scale: f64 },
}

impl Default for AtmospherePreset {
    fn default() -> Self {
        AtmospherePreset::Standard { outer_scale: 10.0 }
    }
}

const STANDARD_HEIGHTS: [f64; 6] = [500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0];
const STANDARD_CN_SQUARED: [f64; 6] = [
    0.2283e-12, 0.0883e-12, 0.0666e-12, 0.1458e-12, 0.3350e-12, 0.1350e-12,
];

const LAS_CAMPANAS_HEIGHTS: [f64; 7] = [250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0];
const LAS_CAMPANAS_VELOCITIES: [f64; 7] = [10.0, 10.0, 20.0, 20.0, 25.0, 30.0, 25.0];
const LAS_CAMPANAS_FRACTIONS: [f64; 7] = [0.42, 0.03, 0.06, 0.16, 0.11, 0.10, 0.12];

const HV57_HEIGHTS: [f64; 5] = [
    616.19462052,
    7832.84451292,
    12168.23587393,
    16724.5778265,
    21506.01234568,
];
const HV57_VELOCITIES: [f64; 5] = [
    9.05384542,
    34.96665728,
    29.51168465,
    10.92315246,
    8.05183343,
];
const HV57_CN_SQUARED: [f64; 5] = [
    2.10098101e-12,
    6.65139093e-14,
    6.10804283e-14,
    1.40578871e-14,
    1.33430937e-15,
];

const HV57_TEN_VELOCITIES: [f64; 10] = [
    8.7925, 13.0704, 24.8266, 36.9636, 33.8588, 19.9747, 10.8762, 8.3583, 8.0233, 8.0008,
];
const HV57_TEN_CN_SQUARED: [f64; 10] = [
    1.6226e-12, 4.2760e-13, 5.0330e-14, 3.3898e-14, 4.4593e-14, 3.3403e-14, 1.5743e-14,
    5.3596e-15, 1.4406e-15, 3.239e-16,
];

impl AtmospherePreset {
    /// Layer parameters of the model, lowest layer first. Wind directions are left to be drawn.
    pub fn layers(&self) -> Result<Vec<LayerParameters>> {
        let layers: Vec<LayerParameters> = match *self {
            AtmospherePreset::Standard { outer_scale } => STANDARD_HEIGHTS
                .iter()
                .zip(STANDARD_CN_SQUARED.iter())
                .map(|(&h, &cn2)| LayerParameters::new(cn2, outer_scale, 10.0, h))
                .collect(),
            AtmospherePreset::LasCampanas {
                fried_parameter,
                outer_scale,
            } => {
                let total = cn_squared_from_fried_parameter(fried_parameter, REFERENCE_WAVELENGTH)?;
                LAS_CAMPANAS_HEIGHTS
                    .iter()
                    .zip(LAS_CAMPANAS_VELOCITIES.iter())
                    .zip(LAS_CAMPANAS_FRACTIONS.iter())
                    .map(|((&h, &v), &fraction)| {
                        LayerParameters::new(fraction * total, outer_scale, v, h)
                    })
                    .collect()
            }
            AtmospherePreset::HufnagelValley57 { outer_scale } => HV57_HEIGHTS
                .iter()
                .zip(HV57_VELOCITIES.iter())
                .zip(HV57_CN_SQUARED.iter())
                .map(|((&h, &v), &cn2)| LayerParameters::new(cn2, outer_scale, v, h))
                .collect(),
            AtmospherePreset::HufnagelValley57TenLayer { outer_scale } => HV57_TEN_VELOCITIES
                .iter()
                .zip(HV57_TEN_CN_SQUARED.iter())
                .enumerate()
                .map(|(i, (&v, &cn2))| {
                    LayerParameters::new(cn2, outer_scale, v, 250.0 + 2750.0 * i as f64)
                })
                .collect(),
        };
        Ok(layers)
    }
}
