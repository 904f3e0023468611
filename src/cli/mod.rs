//! GuardML CLI Module
//!
//! Command-line interface for training, scoring, streaming, and model
//! inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;
use tracing::info;

use crate::detectors::iforest::{ForestConfig, IsolationForest};
use crate::io::csv::CsvSource;
use crate::io::pcap::PcapSource;
use crate::io::writer::JsonLinesWriter;
use crate::io::{DataSource, Record, RecordWriter};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "guardml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Unsupervised anomaly detection for network telemetry")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train an isolation forest on tabular data
    Train {
        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output model file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of trees in the ensemble
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Subsample size per tree
        #[arg(long, default_value = "256")]
        sample_size: usize,

        /// Expected fraction of anomalies in the training data
        #[arg(long, default_value = "0.1")]
        contamination: f64,

        /// Random seed for reproducible training
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Treat the first CSV row as data, not a header
        #[arg(long)]
        no_header: bool,
    },

    /// Score a batch of samples with a trained model
    Score {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file (CSV or PCAP)
        #[arg(short, long)]
        data: PathBuf,

        /// Output results file (JSON lines)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat the first CSV row as data, not a header
        #[arg(long)]
        no_header: bool,
    },

    /// Score samples as a stream with backpressure
    Stream {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file (CSV or PCAP)
        #[arg(short, long)]
        data: PathBuf,

        /// Output results file (JSON lines)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Channel capacity between pipeline stages
        #[arg(long, default_value = "100")]
        buffer: usize,

        /// Treat the first CSV row as data, not a header
        #[arg(long)]
        no_header: bool,
    },

    /// Inspect a persisted model
    Info {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,
    },
}

/// Dispatches a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train {
            data,
            output,
            trees,
            sample_size,
            contamination,
            seed,
            no_header,
        } => cmd_train(
            &data,
            &output,
            trees,
            sample_size,
            contamination,
            seed,
            no_header,
        ),
        Commands::Score {
            model,
            data,
            output,
            no_header,
        } => cmd_score(&model, &data, output.as_deref(), no_header),
        Commands::Stream {
            model,
            data,
            output,
            buffer,
            no_header,
        } => cmd_stream(&model, &data, output.as_deref(), buffer, no_header),
        Commands::Info { model } => cmd_info(&model),
    }
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn open_source(path: &Path, has_header: bool) -> anyhow::Result<Box<dyn DataSource>> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "csv" => Ok(Box::new(CsvSource::new(path).with_header(has_header))),
        "pcap" => Ok(Box::new(PcapSource::new(path))),
        ext => anyhow::bail!("unsupported file format: {ext}"),
    }
}

fn load_model(path: &Path) -> anyhow::Result<IsolationForest> {
    let blob = std::fs::read(path)?;
    let forest = IsolationForest::default();
    forest.load(&blob)?;
    Ok(forest)
}

fn open_writer(path: &Path) -> anyhow::Result<JsonLinesWriter<BufWriter<File>>> {
    Ok(JsonLinesWriter::new(BufWriter::new(File::create(path)?)))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    output_path: &Path,
    trees: usize,
    sample_size: usize,
    contamination: f64,
    seed: u64,
    no_header: bool,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let source = CsvSource::new(data_path).with_header(!no_header);
    let matrix = source.read()?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        matrix.nrows(),
        matrix.ncols(),
        start.elapsed()
    ));

    let forest = IsolationForest::new(ForestConfig {
        n_trees: trees,
        sample_size,
        contamination,
        seed,
    });

    step_run(&format!("Training {} trees", trees));
    let start = Instant::now();
    forest.fit(&matrix)?;
    step_done(&format!("{:?}", start.elapsed()));
    info!(rows = matrix.nrows(), trees, "model trained");

    let blob = forest.save()?;
    std::fs::write(output_path, &blob)?;
    step_ok(&format!(
        "Model saved → {} ({} bytes)",
        output_path.display(),
        blob.len()
    ));

    println!();
    println!(
        "  {:<16} {}",
        muted("Threshold"),
        format!("{:.4}", forest.threshold()).white().bold()
    );
    println!();

    Ok(())
}

pub fn cmd_score(
    model_path: &Path,
    data_path: &Path,
    output_path: Option<&Path>,
    no_header: bool,
) -> anyhow::Result<()> {
    section("Score");

    step_run("Loading model");
    let forest = load_model(model_path)?;
    step_done(&format!("{} trees", forest.num_trees()));

    step_run("Loading data");
    let source = open_source(data_path, !no_header)?;
    let matrix = source.read()?;
    step_done(&format!("{} rows × {} cols", matrix.nrows(), matrix.ncols()));

    step_run("Scoring");
    let start = Instant::now();
    let scores = forest.predict(&matrix)?;
    step_done(&format!("{:?}", start.elapsed()));

    let threshold = forest.threshold();
    let mut writer = output_path.map(open_writer).transpose()?;
    let mut anomalies = 0usize;

    for (i, &score) in scores.iter().enumerate() {
        let is_anomaly = score >= threshold;
        if is_anomaly {
            anomalies += 1;
            println!(
                "  {} sample {:>5}  score {}",
                "!".red().bold(),
                i,
                format!("{score:.4}").red()
            );
        }
        if let Some(w) = writer.as_mut() {
            w.write(&Record {
                timestamp: chrono::Utc::now().timestamp_millis(),
                score,
                is_anomaly,
                features: Some(matrix.row(i).to_vec()),
                metadata: None,
            })?;
        }
    }
    if let Some(w) = writer {
        w.into_inner()?;
    }

    println!();
    println!(
        "  {:<16} {}",
        muted("Anomalies"),
        format!("{anomalies}/{}", scores.len()).white().bold()
    );
    println!(
        "  {:<16} {}",
        muted("Threshold"),
        format!("{threshold:.4}").white()
    );
    println!();

    Ok(())
}

pub fn cmd_stream(
    model_path: &Path,
    data_path: &Path,
    output_path: Option<&Path>,
    buffer: usize,
    no_header: bool,
) -> anyhow::Result<()> {
    section("Stream");

    step_run("Loading model");
    let forest = load_model(model_path)?;
    step_done(&format!("{} trees", forest.num_trees()));

    let source = open_source(data_path, !no_header)?;

    // Dropping the cancel sender fans cancellation out to every stage;
    // it must stay alive until the stream is done.
    let (cancel_tx, cancel_rx) = bounded::<()>(1);
    let mut cancel_tx = Some(cancel_tx);
    let input_rx = source.stream(cancel_rx.clone(), buffer)?;
    let (output_tx, output_rx) = bounded(buffer);

    let mut writer = output_path.map(open_writer).transpose()?;
    let mut total = 0usize;
    let mut anomalies = 0usize;

    let forest_ref = &forest;
    let scorer_cancel = cancel_rx.clone();
    thread::scope(|s| -> anyhow::Result<()> {
        let scorer =
            s.spawn(move || forest_ref.predict_stream(&scorer_cancel, &input_rx, &output_tx));

        let mut write_err = None;
        for score in output_rx.iter() {
            total += 1;
            if score.is_anomaly {
                anomalies += 1;
                println!(
                    "  {} score {}  features {:?}",
                    "!".red().bold(),
                    format!("{:.4}", score.value).red(),
                    score.features
                );
            }
            if let Some(w) = writer.as_mut() {
                if let Err(e) = w.write(&Record::from_score(&score)) {
                    // Cancel the pipeline before bailing out, or the scorer
                    // could sit blocked on a full output channel forever.
                    cancel_tx.take();
                    write_err = Some(e);
                    break;
                }
            }
        }
        for _ in output_rx.iter() {}

        let joined = scorer
            .join()
            .map_err(|_| anyhow::anyhow!("scoring thread panicked"))?;
        if let Some(e) = write_err {
            return Err(e.into());
        }
        joined?;
        Ok(())
    })?;

    if let Some(w) = writer {
        w.into_inner()?;
    }
    info!(total, anomalies, "stream finished");

    println!();
    println!(
        "  {:<16} {}",
        muted("Anomalies"),
        format!("{anomalies}/{total}").white().bold()
    );
    println!();

    Ok(())
}

pub fn cmd_info(model_path: &Path) -> anyhow::Result<()> {
    section("Model");

    let forest = load_model(model_path)?;

    println!(
        "  {:<16} {}",
        muted("Trees"),
        forest.num_trees().to_string().white().bold()
    );
    println!(
        "  {:<16} {}",
        muted("Sample size"),
        forest.sample_size().to_string().white()
    );
    println!(
        "  {:<16} {}",
        muted("Contamination"),
        format!("{:.3}", forest.contamination()).white()
    );
    println!(
        "  {:<16} {}",
        muted("Threshold"),
        format!("{:.4}", forest.threshold()).white()
    );
    println!();

    Ok(())
}
