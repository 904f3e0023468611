//! GuardML - anomaly detection for network telemetry
//!
//! This crate provides unsupervised anomaly detection over tabular numeric
//! feature vectors, built for network-traffic and log telemetry:
//! - Isolation Forest training, batch scoring, and single-sample scoring
//! - A streaming scorer over bounded channels with cooperative cancellation
//! - Durable model persistence (opaque binary blobs)
//! - CSV and PCAP ingestion with a packet feature extractor
//! - JSON-lines result output
//!
//! # Modules
//!
//! ## Detection
//! - [`detectors`] - Detector traits and the Isolation Forest implementation
//!
//! ## Data
//! - [`io`] - CSV/PCAP data sources, result records, and writers
//!
//! ## Services
//! - [`cli`] - Command-line interface (train, score, stream, info)

// Core error handling
pub mod error;

// Detection algorithms
pub mod detectors;

// Data ingestion and result output
pub mod io;

// Services
pub mod cli;

pub use error::{GuardError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{GuardError, Result};

    // Detection
    pub use crate::detectors::iforest::{ForestConfig, IsolationForest};
    pub use crate::detectors::{Detector, Score, StreamDetector};

    // Data sources and sinks
    pub use crate::io::csv::CsvSource;
    pub use crate::io::pcap::{PacketFeatureExtractor, PcapSource};
    pub use crate::io::writer::JsonLinesWriter;
    pub use crate::io::{DataSource, Record, RecordWriter};
}
