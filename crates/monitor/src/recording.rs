//! Landmark recordings
//!
//! One JSON object per line:
//! `{"timestamp_ms": 1234, "landmarks": [[x, y], ...]}`, with `"landmarks":
//! null` for frames where no face was found. Timestamps must not decrease.

use feature_engine::LandmarkSet;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Recording errors
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: timestamp {timestamp_ms} is earlier than the previous frame")]
    OutOfOrder { line: usize, timestamp_ms: u64 },
}

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: u64,
    pub landmarks: Option<LandmarkSet>,
}

/// A parsed recording, in timestamp order
#[derive(Debug, Clone, Default)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self { frames }
    }

    /// Read a recording file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let file = File::open(path.as_ref())?;
        let recording = Self::parse(BufReader::new(file))?;
        debug!(
            "Loaded {} frames from {}",
            recording.len(),
            path.as_ref().display()
        );
        Ok(recording)
    }

    /// Parse JSON lines; blank lines are skipped
    pub fn parse(reader: impl BufRead) -> Result<Self, RecordingError> {
        let mut frames: Vec<RecordedFrame> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: RecordedFrame = serde_json::from_str(&line)
                .map_err(|source| RecordingError::Parse { line: idx + 1, source })?;

            if let Some(prev) = frames.last() {
                if frame.timestamp_ms < prev.timestamp_ms {
                    return Err(RecordingError::OutOfOrder {
                        line: idx + 1,
                        timestamp_ms: frame.timestamp_ms,
                    });
                }
            }
            frames.push(frame);
        }

        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Time from the first to the last frame
    pub fn span(&self) -> Duration {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => {
                Duration::from_millis(last.timestamp_ms - first.timestamp_ms)
            }
            _ => Duration::ZERO,
        }
    }

    /// Split into the frames recorded within `lead` of the start and the rest
    pub fn split_at(&self, lead: Duration) -> (&[RecordedFrame], &[RecordedFrame]) {
        let Some(first) = self.frames.first() else {
            return (&[], &[]);
        };
        let lead_ms = lead.as_millis();
        let idx = self
            .frames
            .partition_point(|f| u128::from(f.timestamp_ms - first.timestamp_ms) < lead_ms);
        self.frames.split_at(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = r#"{"timestamp_ms": 1000, "landmarks": [[0.1, 0.2], [0.3, 0.4]]}

{"timestamp_ms": 1033, "landmarks": null}
{"timestamp_ms": 1066, "landmarks": [[0.5, 0.5]]}
"#;

    #[test]
    fn test_parse_lines() {
        let recording = Recording::parse(Cursor::new(SAMPLE)).unwrap();

        assert_eq!(recording.len(), 3);
        assert_eq!(recording.frames()[0].landmarks.as_ref().unwrap().len(), 2);
        assert!(recording.frames()[1].landmarks.is_none());
        assert_eq!(recording.span(), Duration::from_millis(66));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let text = "{\"timestamp_ms\": 0, \"landmarks\": null}\n{\"timestamp_ms\": oops}\n";
        let err = Recording::parse(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, RecordingError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_out_of_order_timestamps() {
        let text = "{\"timestamp_ms\": 50, \"landmarks\": null}\n{\"timestamp_ms\": 10, \"landmarks\": null}\n";
        let err = Recording::parse(Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            RecordingError::OutOfOrder {
                line: 2,
                timestamp_ms: 10
            }
        ));
    }

    #[test]
    fn test_split_at_lead() {
        let frames = (0..10)
            .map(|i| RecordedFrame {
                timestamp_ms: 500 + i * 100,
                landmarks: None,
            })
            .collect();
        let recording = Recording::new(frames);

        let (lead, rest) = recording.split_at(Duration::from_millis(300));
        assert_eq!(lead.len(), 3);
        assert_eq!(rest[0].timestamp_ms, 800);

        let (all, none) = recording.split_at(Duration::from_secs(60));
        assert_eq!(all.len(), 10);
        assert!(none.is_empty());

        let recording = Recording::default();
        let (lead, rest) = recording.split_at(Duration::from_secs(1));
        assert!(lead.is_empty() && rest.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.jsonl");
        std::fs::write(&path, SAMPLE).unwrap();

        let recording = Recording::load(&path).unwrap();
        assert_eq!(recording.len(), 3);

        assert!(matches!(
            Recording::load(dir.path().join("missing.jsonl")),
            Err(RecordingError::Io(_))
        ));
    }
}
