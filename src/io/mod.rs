//! Data ingestion and result output
//!
//! Sources deliver rectangular `f64` matrices for batch work or individual
//! feature vectors over a bounded channel for streaming; writers consume
//! detection results as [`Record`]s.

pub mod csv;
pub mod pcap;
pub mod writer;

use std::collections::HashMap;

use crossbeam_channel::Receiver;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::detectors::Score;
use crate::error::Result;

/// A source of rectangular numeric feature data.
pub trait DataSource {
    /// Reads the complete dataset; one row per sample.
    fn read(&self) -> Result<Array2<f64>>;

    /// Streams samples over a bounded channel of the given capacity.
    /// The channel closes at end-of-input or when `cancel` fires.
    fn stream(&self, cancel: Receiver<()>, capacity: usize) -> Result<Receiver<Vec<f64>>>;
}

/// An anomaly detection result ready for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unix epoch milliseconds at which the score was produced.
    pub timestamp: i64,
    /// Anomaly score in [0, 1].
    pub score: f64,
    /// Whether the score reached the detector threshold.
    pub is_anomaly: bool,
    /// Original input features.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<f64>>,
    /// Additional information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Record {
    /// Builds a record from a detector score, stamped with the current time.
    pub fn from_score(score: &Score) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            score: score.value,
            is_anomaly: score.is_anomaly,
            features: Some(score.features.clone()),
            metadata: score.metadata.clone(),
        }
    }
}

/// Sink for detection results.
pub trait RecordWriter {
    /// Writes a single result.
    fn write(&mut self, record: &Record) -> Result<()>;

    /// Writes multiple results.
    fn write_all(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }
}
