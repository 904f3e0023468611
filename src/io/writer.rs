//! Result writers

use std::io::Write;

use crate::error::{GuardError, Result};

use super::{Record, RecordWriter};

/// Writes detection results as one JSON object per line.
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> RecordWriter for JsonLinesWriter<W> {
    fn write(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)
            .map_err(|e| GuardError::Serialization(e.to_string()))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: f64, is_anomaly: bool) -> Record {
        Record {
            timestamp: 1_700_000_000_000,
            score,
            is_anomaly,
            features: Some(vec![1.0, 2.0]),
            metadata: None,
        }
    }

    #[test]
    fn test_one_json_object_per_line() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer
            .write_all(&[record(0.9, true), record(0.2, false)])
            .unwrap();

        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let decoded: Record = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(decoded, record(0.9, true));
        let decoded: Record = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(decoded, record(0.2, false));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer
            .write(&Record {
                timestamp: 0,
                score: 0.5,
                is_anomaly: false,
                features: None,
                metadata: None,
            })
            .unwrap();

        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("features"));
        assert!(!text.contains("metadata"));
    }
}
