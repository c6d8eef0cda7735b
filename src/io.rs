//! Field persistence.
//!
//! The format is inferred from the file name: `.pkl`/`.pickle` for Python pickle, `.bin` for
//! bincode. FITS and ASDF files are recognised but not supported.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{Complex64, Field};
use crate::grid::Grid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldFormat {
    Pickle,
    Bincode,
}

impl FieldFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".pkl") || name.ends_with(".pickle") {
            Ok(FieldFormat::Pickle)
        } else if name.ends_with(".bin") {
            Ok(FieldFormat::Bincode)
        } else {
            Err(Error::UnsupportedFormat(path.to_path_buf()))
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FieldRecord {
    shape: [usize; 2],
    pitch: (f64, f64),
    ndim: usize,
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl From<&Field<Complex64>> for FieldRecord {
    fn from(field: &Field<Complex64>) -> Self {
        let grid = field.grid();
        FieldRecord {
            shape: grid.shape(),
            pitch: grid.pitch(),
            ndim: grid.ndim(),
            real: field.values().iter().map(|e| e.re).collect(),
            imag: field.values().iter().map(|e| e.im).collect(),
        }
    }
}

impl FieldRecord {
    fn into_field(self) -> Result<Field<Complex64>> {
        let grid = match self.ndim {
            1 if self.shape[0] == 1 => Grid::new_1d(self.shape[1], self.pitch.1)?,
            2 => Grid::new(self.shape, self.pitch)?,
            _ => {
                return Err(Error::Configuration(format!(
                    "stored field has shape {:?} with {} dimensions",
                    self.shape, self.ndim
                )))
            }
        };
        if self.real.len() != self.imag.len() {
            return Err(Error::Configuration(format!(
                "stored field has {} real and {} imaginary parts",
                self.real.len(),
                self.imag.len()
            )));
        }
        let values = self
            .real
            .into_iter()
            .zip(self.imag)
            .map(|(re, im)| Complex::new(re, im))
            .collect();
        Field::from_vec(grid, values)
    }
}

/// Loads a complex field written by [`write_field`].
pub fn read_field<P: AsRef<Path>>(path: P) -> Result<Field<Complex64>> {
    let path = path.as_ref();
    let format = FieldFormat::from_path(path)?;
    log::info!("reading field from {:?}", path);
    let reader = BufReader::new(File::open(path)?);
    let record: FieldRecord = match format {
        FieldFormat::Pickle => serde_pickle::from_reader(reader, Default::default())?,
        FieldFormat::Bincode => bincode::deserialize_from(reader)?,
    };
    record.into_field()
}

pub fn write_field<P: AsRef<Path>>(field: &Field<Complex64>, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = FieldFormat::from_path(path)?;
    log::info!("writing {:?} field to {:?}", field.grid().shape(), path);
    let record = FieldRecord::from(field);
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        FieldFormat::Pickle => serde_pickle::to_writer(&mut writer, &record, Default::default())?,
        FieldFormat::Bincode => bincode::serialize_into(&mut writer, &record)?,
    }
    writer.flush()?;
    Ok(())
}
