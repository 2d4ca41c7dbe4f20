//! Setpoint sources.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{InputError, InputResult};

/// Supplies the target for each cycle.
pub trait SetpointSource {
    fn read(&mut self) -> InputResult<f64>;
}

/// Reads one numeric field from a JSON document, fresh on every call.
///
/// The producer is expected to replace the file atomically; partial
/// writes surface as parse errors.
#[derive(Debug, Clone)]
pub struct JsonSetpointFile {
    path: PathBuf,
    field: String,
}

impl JsonSetpointFile {
    pub fn new(path: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field: field.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SetpointSource for JsonSetpointFile {
    fn read(&mut self) -> InputResult<f64> {
        let content = std::fs::read(&self.path).map_err(|source| InputError::Read {
            path: self.path.clone(),
            source,
        })?;
        let doc: Value = serde_json::from_slice(&content)?;
        parse_field(&doc, &self.field)
    }
}

fn parse_field(doc: &Value, field: &str) -> InputResult<f64> {
    let value = doc
        .get(field)
        .ok_or_else(|| InputError::MissingField(field.to_string()))?;
    let setpoint = value
        .as_f64()
        .ok_or_else(|| InputError::NotANumber(field.to_string()))?;
    if !setpoint.is_finite() || setpoint < 0.0 {
        return Err(InputError::OutOfRange(setpoint));
    }
    Ok(setpoint)
}

/// Replays a fixed sequence of setpoints. `None` entries read as a
/// missing field. Once drained, the last entry repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSetpoints {
    queue: VecDeque<Option<f64>>,
    last: Option<f64>,
}

impl ScriptedSetpoints {
    pub fn new(script: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self {
            queue: script.into_iter().collect(),
            last: None,
        }
    }

    /// Always returns `setpoint`.
    pub fn constant(setpoint: f64) -> Self {
        Self {
            queue: VecDeque::new(),
            last: Some(setpoint),
        }
    }
}

impl SetpointSource for ScriptedSetpoints {
    fn read(&mut self) -> InputResult<f64> {
        let next = match self.queue.pop_front() {
            Some(entry) => {
                self.last = entry;
                entry
            }
            None => self.last,
        };
        next.ok_or_else(|| InputError::MissingField("setpoint".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(content: &str) -> (tempfile::TempDir, JsonSetpointFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setpoint.json");
        std::fs::write(&path, content).unwrap();
        (dir, JsonSetpointFile::new(path, "setpoint"))
    }

    #[test]
    fn reads_numeric_field() {
        let (_dir, mut source) = source_with(r#"{"setpoint": 50}"#);
        assert_eq!(source.read().unwrap(), 50.0);
    }

    #[test]
    fn rereads_each_call() {
        let (_dir, mut source) = source_with(r#"{"setpoint": 10.5}"#);
        assert_eq!(source.read().unwrap(), 10.5);
        std::fs::write(source.path(), r#"{"setpoint": 12.25, "other": 1}"#).unwrap();
        assert_eq!(source.read().unwrap(), 12.25);
    }

    #[test]
    fn custom_field_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpo.json");
        std::fs::write(&path, r#"{"tpo": 7.5}"#).unwrap();
        let mut source = JsonSetpointFile::new(path, "tpo");
        assert_eq!(source.read().unwrap(), 7.5);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = JsonSetpointFile::new(dir.path().join("absent.json"), "setpoint");
        assert!(matches!(source.read(), Err(InputError::Read { .. })));
    }

    #[test]
    fn malformed_documents() {
        let (_dir, mut source) = source_with("{\"setpoint\": ");
        assert!(matches!(source.read(), Err(InputError::Parse(_))));

        let (_dir, mut source) = source_with(r#"{"target": 3}"#);
        assert!(matches!(source.read(), Err(InputError::MissingField(f)) if f == "setpoint"));

        let (_dir, mut source) = source_with(r#"{"setpoint": "high"}"#);
        assert!(matches!(source.read(), Err(InputError::NotANumber(_))));

        let (_dir, mut source) = source_with(r#"{"setpoint": -1.0}"#);
        assert!(matches!(source.read(), Err(InputError::OutOfRange(v)) if v == -1.0));

        let (_dir, mut source) = source_with("[50]");
        assert!(matches!(source.read(), Err(InputError::MissingField(_))));
    }

    #[test]
    fn scripted_replays_then_repeats() {
        let mut source = ScriptedSetpoints::new([Some(1.0), None, Some(3.0)]);
        assert_eq!(source.read().unwrap(), 1.0);
        assert!(source.read().is_err());
        assert_eq!(source.read().unwrap(), 3.0);
        assert_eq!(source.read().unwrap(), 3.0);

        let mut constant = ScriptedSetpoints::constant(42.0);
        assert_eq!(constant.read().unwrap(), 42.0);
        assert!(ScriptedSetpoints::default().read().is_err());
    }
}
