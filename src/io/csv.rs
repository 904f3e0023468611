//! CSV ingestion backed by polars

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver};
use ndarray::Array2;
use polars::prelude::*;
use tracing::debug;

use crate::error::{GuardError, Result};

use super::DataSource;

/// Reads rectangular numeric data from a CSV file.
///
/// Every column is cast to `f64`; rows containing cells that do not parse
/// are dropped, so partially textual files still yield a rectangular matrix.
pub struct CsvSource {
    path: PathBuf,
    has_header: bool,
}

impl CsvSource {
    /// Creates a source for the given file, expecting a header row.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            has_header: true,
        }
    }

    /// Sets whether the file starts with a header row.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    fn load_matrix(&self) -> Result<Array2<f64>> {
        let df = CsvReadOptions::default()
            .with_has_header(self.has_header)
            .with_infer_schema_length(Some(100))
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .map_err(|e| GuardError::Data(e.to_string()))?
            .finish()
            .map_err(|e| GuardError::Data(e.to_string()))?;

        // Non-numeric cells become nulls under the cast; dropping null rows
        // reproduces skip-malformed-row reading.
        let columns: Vec<Series> = df
            .get_columns()
            .iter()
            .map(|s| s.cast(&DataType::Float64))
            .collect::<PolarsResult<_>>()
            .map_err(|e| GuardError::Data(e.to_string()))?;
        let df = DataFrame::new(columns).map_err(|e| GuardError::Data(e.to_string()))?;
        let df = df
            .drop_nulls::<String>(None)
            .map_err(|e| GuardError::Data(e.to_string()))?;

        let (rows, cols) = (df.height(), df.width());
        let mut matrix = Array2::zeros((rows, cols));
        for (j, series) in df.get_columns().iter().enumerate() {
            let values = series.f64().map_err(|e| GuardError::Data(e.to_string()))?;
            for (i, value) in values.into_iter().enumerate() {
                matrix[[i, j]] = value.unwrap_or(f64::NAN);
            }
        }

        debug!(path = %self.path.display(), rows, cols, "loaded csv data");
        Ok(matrix)
    }
}

impl DataSource for CsvSource {
    fn read(&self) -> Result<Array2<f64>> {
        self.load_matrix()
    }

    fn stream(&self, cancel: Receiver<()>, capacity: usize) -> Result<Receiver<Vec<f64>>> {
        let matrix = self.load_matrix()?;
        let (tx, rx) = bounded(capacity);

        thread::spawn(move || {
            for row in matrix.rows() {
                let sample = row.to_vec();
                select! {
                    recv(cancel) -> _ => return,
                    send(tx, sample) -> sent => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}
