//! JSON output adapter.

use anyhow::{anyhow, Result};
use signconnect_core::{PredictionRecord, ResultOutput};
use std::io::{self, Write};
use std::sync::Mutex;

/// JSON output adapter for prediction records.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Writes all records as a single JSON array.
    #[allow(clippy::significant_drop_tightening)]
    pub fn write_array(&self, records: &[PredictionRecord], pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(records)?
        } else {
            serde_json::to_string(records)?
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Output lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    #[allow(clippy::significant_drop_tightening)]
    fn write(&self, record: &PredictionRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Output lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Output lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use signconnect_core::SignPrediction;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(path: &str) -> PredictionRecord {
        PredictionRecord {
            path: path.to_string(),
            prediction: SignPrediction::no_hand(),
        }
    }

    #[test]
    fn test_jsonl_record_is_flat() {
        let buf = Shared::default();
        let output = JsonOutput::new(Box::new(buf.clone()));
        output.write(&record("a.png")).unwrap();
        output.write(&record("b.png")).unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(
            first,
            serde_json::json!({
                "path": "a.png",
                "label": "No Hand",
                "confidence": 0.0,
                "message": "No hand detected."
            })
        );
    }

    #[test]
    fn test_pretty_array() {
        let buf = Shared::default();
        let output = JsonOutput::new(Box::new(buf.clone()));
        output.write_array(&[record("a.png")], true).unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(text.starts_with("[\n"));
        let parsed: Vec<PredictionRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec![record("a.png")]);
    }
}
