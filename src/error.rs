use std::path::PathBuf;

use crate::grid::Grid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("incompatible grids: expected {expected:?}, found {found:?}")]
    IncompatibleGrids { expected: Grid, found: Grid },
    #[error("{name} must be positive and finite, found {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("sub-aperture {subaperture} has zero flux")]
    ZeroFlux { subaperture: usize },
    #[error("cannot infer a supported field format from {0:?}")]
    UnsupportedFormat(PathBuf),
    #[error("field i/o error")]
    Io(#[from] std::io::Error),
    #[error("pickle codec error")]
    Pickle(#[from] serde_pickle::Error),
    #[error("bincode codec error")]
    Bincode(#[from] bincode::Error),
}

/// Coarse classification of [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NumericalDegeneracy,
    UnsupportedFormat,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IncompatibleGrids { .. } | Error::NonPositive { .. } | Error::Configuration(_) => {
                ErrorKind::Configuration
            }
            Error::ZeroFlux { .. } => ErrorKind::NumericalDegeneracy,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Io(_) | Error::Pickle(_) | Error::Bincode(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns `value` if it is finite and strictly positive.
pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::NonPositive { name, value })
    }
}
