//! Tests for the CSV and PCAP data sources.

use std::fs::File;
use std::io::Write as _;
use std::time::Duration;

use crossbeam_channel::bounded;
use etherparse::PacketBuilder;
use guardml::prelude::*;
use pcap_file::pcap::{PcapPacket, PcapWriter};
use tempfile::tempdir;

fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_csv_read() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "data.csv",
        "a,b,c\n1.0,2.0,3.0\n4.5,5.5,6.5\n7.0,8.0,9.0\n",
    );

    let matrix = CsvSource::new(&path).read().unwrap();
    assert_eq!(matrix.shape(), &[3, 3]);
    assert_eq!(matrix[[0, 0]], 1.0);
    assert_eq!(matrix[[1, 1]], 5.5);
    assert_eq!(matrix[[2, 2]], 9.0);
}

#[test]
fn test_csv_without_header() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "data.csv", "1,2\n3,4\n");

    let matrix = CsvSource::new(&path).with_header(false).read().unwrap();
    assert_eq!(matrix.shape(), &[2, 2]);
    assert_eq!(matrix[[0, 0]], 1.0);
    assert_eq!(matrix[[1, 1]], 4.0);
}

#[test]
fn test_csv_skips_malformed_rows() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "data.csv", "a,b\n1.0,2.0\noops,3.0\n4.0,5.0\n");

    let matrix = CsvSource::new(&path).read().unwrap();
    assert_eq!(matrix.shape(), &[2, 2]);
    assert_eq!(matrix[[0, 0]], 1.0);
    assert_eq!(matrix[[1, 0]], 4.0);
}

#[test]
fn test_csv_stream_preserves_file_order() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "data.csv", "a,b\n1.0,2.0\n3.0,4.0\n5.0,6.0\n");

    let (_cancel_tx, cancel_rx) = bounded::<()>(1);
    let rx = CsvSource::new(&path).stream(cancel_rx, 2).unwrap();

    let rows: Vec<Vec<f64>> = rx.iter().collect();
    assert_eq!(
        rows,
        vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]
    );
}

fn tcp_syn_ack_frame(payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([192, 168, 1, 1], [192, 168, 1, 2], 64)
        .tcp(4000, 443, 1234, 1024)
        .syn()
        .ack(0);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

fn udp_frame(payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 32)
        .udp(5353, 53);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

#[test]
fn test_pcap_feature_extraction() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.pcap");

    let tcp = tcp_syn_ack_frame(&[1, 2, 3, 4]);
    let udp = udp_frame(&[9, 9]);
    {
        let mut writer = PcapWriter::new(File::create(&path).unwrap()).unwrap();
        writer
            .write_packet(&PcapPacket::new(
                Duration::from_secs(1),
                tcp.len() as u32,
                &tcp,
            ))
            .unwrap();
        writer
            .write_packet(&PcapPacket::new(
                Duration::from_millis(1500),
                udp.len() as u32,
                &udp,
            ))
            .unwrap();
    }

    let matrix = PcapSource::new(&path).read().unwrap();
    assert_eq!(matrix.shape(), &[2, 8]);

    // TCP packet: [size, 0, 6, 4000, 443, SYN+ACK, 64, 4]
    assert_eq!(matrix[[0, 0]], tcp.len() as f64);
    assert_eq!(matrix[[0, 1]], 0.0);
    assert_eq!(matrix[[0, 2]], 6.0);
    assert_eq!(matrix[[0, 3]], 4000.0);
    assert_eq!(matrix[[0, 4]], 443.0);
    assert_eq!(matrix[[0, 5]], 3.0);
    assert_eq!(matrix[[0, 6]], 64.0);
    assert_eq!(matrix[[0, 7]], 4.0);

    // UDP packet arrives half a second later.
    assert_eq!(matrix[[1, 1]], 0.5);
    assert_eq!(matrix[[1, 2]], 17.0);
    assert_eq!(matrix[[1, 3]], 5353.0);
    assert_eq!(matrix[[1, 4]], 53.0);
    assert_eq!(matrix[[1, 5]], 0.0);
    assert_eq!(matrix[[1, 6]], 32.0);
    assert_eq!(matrix[[1, 7]], 2.0);
}

#[test]
fn test_extractor_skips_unparsable_frames() {
    let mut extractor = PacketFeatureExtractor::new();
    assert!(extractor.extract(&[0x01, 0x02], 0.0).is_none());
}

#[test]
fn test_pcap_stream_matches_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.pcap");

    let tcp = tcp_syn_ack_frame(&[0; 16]);
    {
        let mut writer = PcapWriter::new(File::create(&path).unwrap()).unwrap();
        for i in 0..5u64 {
            writer
                .write_packet(&PcapPacket::new(
                    Duration::from_secs(i),
                    tcp.len() as u32,
                    &tcp,
                ))
                .unwrap();
        }
    }

    let source = PcapSource::new(&path);
    let matrix = source.read().unwrap();

    let (_cancel_tx, cancel_rx) = bounded::<()>(1);
    let rows: Vec<Vec<f64>> = source.stream(cancel_rx, 2).unwrap().iter().collect();

    assert_eq!(rows.len(), matrix.nrows());
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.as_slice(), matrix.row(i).as_slice().unwrap());
    }
}

#[test]
fn test_end_to_end_csv_train_and_score() {
    let dir = tempdir().unwrap();
    let mut contents = String::from("a,b\n");
    for i in 0..100 {
        contents.push_str(&format!("{}.0,{}.5\n", i % 10, i % 7));
    }
    let path = write_csv(&dir, "train.csv", &contents);

    let matrix = CsvSource::new(&path).read().unwrap();
    let forest = IsolationForest::new(ForestConfig {
        n_trees: 20,
        ..Default::default()
    });
    forest.fit(&matrix).unwrap();

    let scores = forest.predict(&matrix).unwrap();
    assert_eq!(scores.len(), 100);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
}
