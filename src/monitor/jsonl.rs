//! JSON-lines diagnostics sink

use super::{DiagnosticsSink, LoggedValue};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shape and mean of an image diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub shape: [usize; 2],
    pub mean: f32,
}

/// One line of the log: everything recorded between two flushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsLogEntry {
    pub step: usize,
    pub timestamp_ms: u128,
    pub scalars: BTreeMap<String, f32>,
    pub images: BTreeMap<String, ImageSummary>,
}

/// Buffers updates and appends one JSON object per flush
pub struct JsonlSink<W: Write> {
    writer: W,
    step: usize,
    scalars: BTreeMap<String, f32>,
    images: BTreeMap<String, ImageSummary>,
}

impl JsonlSink<File> {
    /// Append to the file at `path`, creating it if needed
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> JsonlSink<W> {
    /// Write log lines to `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            step: 0,
            scalars: BTreeMap::new(),
            images: BTreeMap::new(),
        }
    }

    /// Number of lines written
    pub fn step(&self) -> usize {
        self.step
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticsSink for JsonlSink<W> {
    fn update(&mut self, key: &str, value: LoggedValue) {
        match value {
            LoggedValue::Scalar(v) => {
                self.scalars.insert(key.to_string(), v);
            }
            LoggedValue::Image(img) => {
                let (h, w) = img.dim();
                let summary = ImageSummary {
                    shape: [h, w],
                    mean: img.mean().unwrap_or(0.0),
                };
                self.images.insert(key.to_string(), summary);
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.scalars.is_empty() && self.images.is_empty() {
            return Ok(());
        }

        let entry = DiagnosticsLogEntry {
            step: self.step,
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            scalars: std::mem::take(&mut self.scalars),
            images: std::mem::take(&mut self.images),
        };

        serde_json::to_writer(&mut self.writer, &entry)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.step += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::io::{BufRead, BufReader};
    use tempfile::NamedTempFile;

    #[test]
    fn test_one_line_per_flush() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.update("bce", LoggedValue::Scalar(2.5));
        sink.update("pred", LoggedValue::Image(arr2(&[[0.0, 1.0], [1.0, 0.0]])));
        sink.flush().unwrap();
        sink.update("kl", LoggedValue::Scalar(0.25));
        sink.flush().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: DiagnosticsLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.scalars["bce"], 2.5);
        assert_eq!(first.images["pred"].shape, [2, 2]);
        assert_eq!(first.images["pred"].mean, 0.5);

        let second: DiagnosticsLogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.step, 1);
        assert!(second.images.is_empty());
        assert!(!second.scalars.contains_key("bce"));
    }

    #[test]
    fn test_empty_flush_writes_nothing() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.flush().unwrap();
        assert_eq!(sink.step(), 0);
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn test_file_sink_appends() {
        let temp = NamedTempFile::new().unwrap();
        for _ in 0..2 {
            let mut sink = JsonlSink::create(temp.path()).unwrap();
            sink.update("kl", LoggedValue::Scalar(1.0));
            sink.flush().unwrap();
        }

        let reader = BufReader::new(File::open(temp.path()).unwrap());
        assert_eq!(reader.lines().count(), 2);
    }
}
