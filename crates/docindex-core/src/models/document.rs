//! Documents as handed to the engine by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Opaque document identifier owned by the caller's datastore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId(value.to_string())
    }
}

/// One metadata association of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub type_name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A document and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub label: String,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl Document {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: DocumentId(id.into()),
            label: label.into(),
            file_path: None,
            date_added: None,
            metadata: Vec::new(),
        }
    }

    /// Attach a metadata value. `None` or `""` records the type without a value.
    pub fn with_metadata(mut self, type_name: impl Into<String>, value: Option<&str>) -> Self {
        self.metadata.push(MetadataEntry {
            type_name: type_name.into(),
            value: value.map(str::to_string),
        });
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = Some(date_added);
        self
    }

    /// Non-empty metadata values keyed by metadata type name.
    ///
    /// When a type appears more than once the last non-empty value wins.
    pub fn metadata_values(&self) -> Map<String, Value> {
        self.metadata
            .iter()
            .filter_map(|entry| match entry.value.as_deref() {
                Some(value) if !value.is_empty() => {
                    Some((entry.type_name.clone(), Value::String(value.to_string())))
                }
                _ => None,
            })
            .collect()
    }

    /// Lowercased extension of the backing file, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_path
            .as_ref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}
