//! Basic usage: train on synthetic normal traffic, then flag injected bursts.
//!
//! Run with `cargo run --example basic`.

use guardml::prelude::*;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

// Features per row: [packet_size, interval, protocol, src_port, dst_port]
const FEATURES: usize = 5;

fn main() -> guardml::Result<()> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);

    let training = normal_traffic(1000, &mut rng);

    let forest = IsolationForest::new(ForestConfig::default());

    println!("Training Isolation Forest...");
    forest.fit(&training)?;
    println!("Training complete!");

    let test = mixed_traffic(100, &mut rng);
    let scores = forest.predict(&test)?;

    println!("\nAnomaly Detection Results:");
    println!("==========================");

    let threshold = forest.threshold();
    let mut anomaly_count = 0;

    for (i, score) in scores.iter().enumerate() {
        if *score >= threshold {
            anomaly_count += 1;
            println!(
                "Sample {i:3}: score={score:.3} [ANOMALY] features={:?}",
                test.row(i).to_vec()
            );
        }
    }

    println!(
        "\nTotal anomalies detected: {}/{} (threshold: {:.2})",
        anomaly_count,
        test.nrows(),
        threshold
    );

    Ok(())
}

/// Synthetic normal traffic: small TCP packets at regular intervals to port
/// 443 from ephemeral source ports.
fn normal_traffic(n: usize, rng: &mut Xoshiro256PlusPlus) -> Array2<f64> {
    let mut values = Vec::with_capacity(n * FEATURES);
    for _ in 0..n {
        values.extend_from_slice(&normal_row(rng));
    }
    Array2::from_shape_vec((n, FEATURES), values).expect("row size is fixed")
}

/// Test traffic with roughly 10% injected UDP bursts on privileged ports.
fn mixed_traffic(n: usize, rng: &mut Xoshiro256PlusPlus) -> Array2<f64> {
    let mut values = Vec::with_capacity(n * FEATURES);
    for _ in 0..n {
        if rng.gen::<f64>() < 0.1 {
            values.extend_from_slice(&[
                1400.0 + rng.gen::<f64>() * 100.0,
                0.0001,
                17.0,
                rng.gen_range(0..1024) as f64,
                rng.gen_range(0..1024) as f64,
            ]);
        } else {
            values.extend_from_slice(&normal_row(rng));
        }
    }
    Array2::from_shape_vec((n, FEATURES), values).expect("row size is fixed")
}

fn normal_row(rng: &mut Xoshiro256PlusPlus) -> [f64; FEATURES] {
    [
        64.0 + rng.gen::<f64>() * 200.0,
        0.001 + rng.gen::<f64>() * 0.1,
        6.0,
        rng.gen_range(1024..65024) as f64,
        443.0,
    ]
}
