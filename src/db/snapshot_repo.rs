// src/db/snapshot_repo.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::common::error::AppError;

/// Reads one exported collection from disk. Exports come either as a list of
/// documents or as an object keyed by document id; both are handed back as a
/// list, with the key copied into `id` when the document lacks one.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    path: PathBuf,
}

impl SnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Value, AppError> {
        let text = fs::read_to_string(&self.path)?;
        let snapshot: Value = serde_json::from_str(&text)?;

        let documents = match snapshot {
            Value::Array(documents) => documents,
            Value::Object(map) => map
                .into_iter()
                .map(|(key, mut document)| {
                    if let Value::Object(fields) = &mut document {
                        fields.entry("id").or_insert(Value::String(key));
                    }
                    document
                })
                .collect(),
            other => {
                return Err(AppError::InvalidSnapshot(format!(
                    "{} holds a {} instead of documents",
                    self.path.display(),
                    kind_of(&other)
                )));
            }
        };

        tracing::info!(path = %self.path.display(), documents = documents.len(), "Snapshot loaded");
        Ok(Value::Array(documents))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
