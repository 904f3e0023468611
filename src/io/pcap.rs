//! Packet capture ingestion and feature extraction

use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver};
use etherparse::{NetSlice, SlicedPacket, TcpSlice, TransportSlice};
use ndarray::Array2;
use pcap_file::pcap::PcapReader;
use tracing::debug;

use crate::error::{GuardError, Result};

use super::DataSource;

/// Number of features extracted per packet.
pub const FEATURE_COUNT: usize = 8;

/// Extracts a fixed numeric feature vector from raw Ethernet frames.
///
/// Features, in order: `packet_size`, `inter_arrival_time`, `protocol`
/// (6 TCP / 17 UDP / 1 ICMP / 0 other), `src_port`, `dst_port`, `tcp_flags`,
/// `ip_ttl`, `payload_size`.
#[derive(Debug, Default)]
pub struct PacketFeatureExtractor {
    last_timestamp: Option<f64>,
}

impl PacketFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts one frame to a feature vector. Returns `None` when the
    /// link layer cannot be parsed.
    pub fn extract(&mut self, frame: &[u8], timestamp_secs: f64) -> Option<Vec<f64>> {
        let sliced = SlicedPacket::from_ethernet(frame).ok()?;

        let mut features = vec![0.0; FEATURE_COUNT];
        features[0] = frame.len() as f64;

        // Inter-arrival time; 0 for the first packet.
        if let Some(last) = self.last_timestamp {
            features[1] = timestamp_secs - last;
        }
        self.last_timestamp = Some(timestamp_secs);

        match &sliced.transport {
            Some(TransportSlice::Tcp(tcp)) => {
                features[2] = 6.0;
                features[3] = f64::from(tcp.source_port());
                features[4] = f64::from(tcp.destination_port());
                features[5] = encode_tcp_flags(tcp);
                features[7] = tcp.payload().len() as f64;
            }
            Some(TransportSlice::Udp(udp)) => {
                features[2] = 17.0;
                features[3] = f64::from(udp.source_port());
                features[4] = f64::from(udp.destination_port());
                features[7] = udp.payload().len() as f64;
            }
            Some(TransportSlice::Icmpv4(_)) => {
                features[2] = 1.0;
            }
            _ => {}
        }

        if let Some(NetSlice::Ipv4(ipv4)) = &sliced.net {
            features[6] = f64::from(ipv4.header().ttl());
        }

        Some(features)
    }

    /// Names of the extracted features, in extraction order.
    pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
        [
            "packet_size",
            "inter_arrival_time",
            "protocol",
            "src_port",
            "dst_port",
            "tcp_flags",
            "ip_ttl",
            "payload_size",
        ]
    }
}

/// SYN=1, ACK=2, FIN=4, RST=8, PSH=16, URG=32, summed.
fn encode_tcp_flags(tcp: &TcpSlice<'_>) -> f64 {
    let mut flags = 0.0;
    if tcp.syn() {
        flags += 1.0;
    }
    if tcp.ack() {
        flags += 2.0;
    }
    if tcp.fin() {
        flags += 4.0;
    }
    if tcp.rst() {
        flags += 8.0;
    }
    if tcp.psh() {
        flags += 16.0;
    }
    if tcp.urg() {
        flags += 32.0;
    }
    flags
}

/// Reads packets from a capture file as feature vectors.
pub struct PcapSource {
    path: PathBuf,
}

impl PcapSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_features(&self) -> Result<Vec<Vec<f64>>> {
        let file = File::open(&self.path)?;
        let mut reader = PcapReader::new(file).map_err(|e| GuardError::Data(e.to_string()))?;
        let mut extractor = PacketFeatureExtractor::new();

        let mut rows = Vec::new();
        while let Some(packet) = reader.next_packet() {
            let packet = packet.map_err(|e| GuardError::Data(e.to_string()))?;
            let timestamp = packet.timestamp.as_secs_f64();
            if let Some(features) = extractor.extract(&packet.data, timestamp) {
                rows.push(features);
            }
        }

        debug!(path = %self.path.display(), packets = rows.len(), "loaded pcap data");
        Ok(rows)
    }
}

impl DataSource for PcapSource {
    fn read(&self) -> Result<Array2<f64>> {
        let rows = self.read_features()?;
        let mut matrix = Array2::zeros((rows.len(), FEATURE_COUNT));
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                matrix[[i, j]] = *value;
            }
        }
        Ok(matrix)
    }

    fn stream(&self, cancel: Receiver<()>, capacity: usize) -> Result<Receiver<Vec<f64>>> {
        let rows = self.read_features()?;
        let (tx, rx) = bounded(capacity);

        thread::spawn(move || {
            for sample in rows {
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
