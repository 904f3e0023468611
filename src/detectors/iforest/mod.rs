//! Isolation Forest anomaly detection
//!
//! An ensemble of randomized binary trees. Outliers isolate in fewer random
//! splits than inliers, so shorter average path lengths map to anomaly scores
//! near 1 while deep, hard-to-isolate samples score near 0.

pub mod rng;

mod stats;
mod stream;
mod tree;

pub use tree::{average_path_length, Node, Tree};

use crossbeam_channel::{Receiver, Sender};
use ndarray::{Array2, ArrayView1};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detectors::{Detector, Score, StreamDetector};
use crate::error::{GuardError, Result};

use rng::ForestRng;
use stats::percentile;

/// Threshold applied before calibration or when calibration is disabled.
const DEFAULT_THRESHOLD: f64 = 0.5;

/// Isolation Forest configuration. Immutable after construction.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Subsample size ψ per tree; clamped to the dataset size at fit time.
    pub sample_size: usize,
    /// Expected fraction of anomalies in training data, in [0, 1].
    /// 0 disables threshold calibration.
    pub contamination: f64,
    /// Seed for the tree-construction RNG.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

struct ForestState {
    n_trees: usize,
    sample_size: usize,
    contamination: f64,
    rng: ForestRng,
    trees: Vec<Tree>,
    trained: bool,
    max_depth: usize,
    avg_path_length: f64,
    threshold: f64,
}

/// Isolation Forest anomaly detector.
///
/// All state lives behind a reader/writer lock: [`fit`](Self::fit),
/// [`load`](Self::load) and [`set_threshold`](Self::set_threshold) take the
/// writer side, every scoring path takes the reader side. Concurrent scorers
/// therefore observe either the previous model or the fully installed new
/// one, never an intermediate.
pub struct IsolationForest {
    state: RwLock<ForestState>,
}

/// Wire layout of a persisted model. Field order is the format; there is no
/// version tag. The seed is deliberately absent: it only affected training.
#[derive(Serialize)]
struct ModelBlobRef<'a> {
    n_trees: usize,
    sample_size: usize,
    contamination: f64,
    threshold: f64,
    avg_path_length: f64,
    trees: &'a [Tree],
}

#[derive(Deserialize)]
struct ModelBlob {
    n_trees: usize,
    sample_size: usize,
    contamination: f64,
    threshold: f64,
    avg_path_length: f64,
    trees: Vec<Tree>,
}

impl IsolationForest {
    /// Creates an untrained forest. Out-of-range configuration fields are
    /// clamped (`n_trees ≥ 1`, `sample_size ≥ 1`, `contamination ∈ [0, 1]`).
    pub fn new(config: ForestConfig) -> Self {
        Self {
            state: RwLock::new(ForestState {
                n_trees: config.n_trees.max(1),
                sample_size: config.sample_size.max(1),
                contamination: config.contamination.clamp(0.0, 1.0),
                rng: ForestRng::seeded(config.seed),
                trees: Vec::new(),
                trained: false,
                max_depth: 0,
                avg_path_length: 0.0,
                threshold: DEFAULT_THRESHOLD,
            }),
        }
    }

    /// Trains the ensemble from scratch, replacing any previous model.
    ///
    /// Subsamples ψ = min(sample_size, n) rows without replacement per tree,
    /// then calibrates the anomaly threshold to the
    /// (1 − contamination)·100 percentile of the training scores.
    pub fn fit(&self, data: &Array2<f64>) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let n_samples = data.nrows();
        if n_samples == 0 {
            return Err(GuardError::EmptyData);
        }

        let psi = state.sample_size.min(n_samples);
        // Depth budget from the clamped ψ, so ψ = 1 degenerates to depth-0
        // leaves instead of an undefined budget.
        state.max_depth = (psi as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(state.n_trees);
        for _ in 0..state.n_trees {
            // Sample without replacement.
            let mut indices = state.rng.permutation(n_samples);
            indices.truncate(psi);
            trees.push(Tree::build(data, &indices, state.max_depth, &mut state.rng));
        }
        state.trees = trees;
        state.avg_path_length = average_path_length(psi as f64);
        state.trained = true;

        if state.contamination > 0.0 {
            let scores = predict_all(state, data);
            state.threshold = percentile(&scores, 100.0 * (1.0 - state.contamination));
        }

        Ok(())
    }

    /// Anomaly scores for a batch, in input order.
    pub fn predict(&self, data: &Array2<f64>) -> Result<Vec<f64>> {
        let state = self.state.read();
        if !state.trained {
            return Err(GuardError::NotTrained);
        }
        Ok(predict_all(&state, data))
    }

    /// Anomaly score for a single sample.
    pub fn predict_one(&self, sample: &[f64]) -> Result<f64> {
        let state = self.state.read();
        if !state.trained {
            return Err(GuardError::NotTrained);
        }
        Ok(score_sample(&state, ArrayView1::from(sample)))
    }

    /// Serializes the trained model to an opaque blob.
    pub fn save(&self) -> Result<Vec<u8>> {
        let state = self.state.read();
        if !state.trained {
            return Err(GuardError::NotTrained);
        }

        let blob = ModelBlobRef {
            n_trees: state.n_trees,
            sample_size: state.sample_size,
            contamination: state.contamination,
            threshold: state.threshold,
            avg_path_length: state.avg_path_length,
            trees: &state.trees,
        };
        bincode::serialize(&blob).map_err(|e| GuardError::Serialization(e.to_string()))
    }

    /// Restores a trained model, replacing any current one atomically.
    pub fn load(&self, blob: &[u8]) -> Result<()> {
        let decoded: ModelBlob =
            bincode::deserialize(blob).map_err(|e| GuardError::Deserialization(e.to_string()))?;

        let mut state = self.state.write();
        state.n_trees = decoded.n_trees;
        state.sample_size = decoded.sample_size;
        state.contamination = decoded.contamination;
        state.threshold = decoded.threshold;
        state.avg_path_length = decoded.avg_path_length;
        state.trees = decoded.trees;
        // The blob does not carry the fit-time ψ; rebuild the depth budget
        // from the stored sample size.
        state.max_depth = (decoded.sample_size as f64).log2().ceil() as usize;
        state.trained = true;

        Ok(())
    }

    /// Current anomaly threshold.
    pub fn threshold(&self) -> f64 {
        self.state.read().threshold
    }

    /// Overrides the anomaly threshold.
    pub fn set_threshold(&self, threshold: f64) {
        self.state.write().threshold = threshold;
    }

    /// Whether a successful fit or load has installed a model.
    pub fn is_trained(&self) -> bool {
        self.state.read().trained
    }

    /// Number of trees currently installed (0 before training).
    pub fn num_trees(&self) -> usize {
        self.state.read().trees.len()
    }

    /// Configured subsample size.
    pub fn sample_size(&self) -> usize {
        self.state.read().sample_size
    }

    /// Configured contamination fraction.
    pub fn contamination(&self) -> f64 {
        self.state.read().contamination
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

fn predict_all(state: &ForestState, data: &Array2<f64>) -> Vec<f64> {
    (0..data.nrows())
        .into_par_iter()
        .map(|i| score_sample(state, data.row(i)))
        .collect()
}

fn score_sample(state: &ForestState, sample: ArrayView1<'_, f64>) -> f64 {
    let total: f64 = state
        .trees
        .iter()
        .map(|tree| tree.path_length(sample))
        .sum();
    let avg_path = total / state.trees.len() as f64;

    // c(ψ) = 0 only for ψ = 1; the transform is undefined there, so report
    // the neutral score.
    if state.avg_path_length == 0.0 {
        return DEFAULT_THRESHOLD;
    }

    // s(x) = 2^(-h̄(x) / c(ψ)), clamped against floating-point spill.
    2f64.powf(-avg_path / state.avg_path_length).clamp(0.0, 1.0)
}

impl Detector for IsolationForest {
    fn fit(&self, data: &Array2<f64>) -> Result<()> {
        IsolationForest::fit(self, data)
    }

    fn predict(&self, data: &Array2<f64>) -> Result<Vec<f64>> {
        IsolationForest::predict(self, data)
    }

    fn predict_one(&self, sample: &[f64]) -> Result<f64> {
        IsolationForest::predict_one(self, sample)
    }

    fn save(&self) -> Result<Vec<u8>> {
        IsolationForest::save(self)
    }

    fn load(&self, blob: &[u8]) -> Result<()> {
        IsolationForest::load(self, blob)
    }
}

impl StreamDetector for IsolationForest {
    fn predict_stream(
        &self,
        cancel: &Receiver<()>,
        input: &Receiver<Vec<f64>>,
        output: &Sender<Score>,
    ) -> Result<()> {
        IsolationForest::predict_stream(self, cancel, input, output)
    }
}
