//! Unsupervised anomaly detection algorithms

pub mod iforest;

pub use iforest::{ForestConfig, IsolationForest};

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An anomaly detection result for a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Anomaly score in [0, 1]; higher means more anomalous.
    pub value: f64,
    /// Whether the score reached the detector threshold at emission time.
    pub is_anomaly: bool,
    /// The original input features.
    pub features: Vec<f64>,
    /// Additional information attached by the producer.
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Common interface for anomaly detectors.
///
/// Methods take `&self`; implementations guard their mutable state internally
/// so a single detector can be shared across threads.
pub trait Detector: Send + Sync {
    /// Trains the detector on historical data. Each row is a sample, each
    /// column a feature.
    fn fit(&self, data: &Array2<f64>) -> Result<()>;

    /// Returns anomaly scores in [0, 1] for the given samples, in input
    /// order. Higher values indicate anomalies.
    fn predict(&self, data: &Array2<f64>) -> Result<Vec<f64>>;

    /// Returns the anomaly score for a single sample.
    fn predict_one(&self, sample: &[f64]) -> Result<f64>;

    /// Serializes the trained model to bytes.
    fn save(&self) -> Result<Vec<u8>>;

    /// Restores a trained model from bytes.
    fn load(&self, blob: &[u8]) -> Result<()>;
}

/// Detectors that can score an unbounded stream of samples.
pub trait StreamDetector: Detector {
    /// Pulls samples from `input` and pushes one [`Score`] per sample to
    /// `output`, in input order, until `input` closes (returns `Ok`) or
    /// `cancel` fires (returns [`crate::GuardError::Cancelled`]).
    ///
    /// The coordinator never closes `output`; the caller owns both channels.
    fn predict_stream(
        &self,
        cancel: &Receiver<()>,
        input: &Receiver<Vec<f64>>,
        output: &Sender<Score>,
    ) -> Result<()>;
}
