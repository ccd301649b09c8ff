//! Index definitions (authored) and index instances (materialized).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an [`IndexDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(pub i64);

/// Identifier of an [`IndexInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub i64);

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of an authored index tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub id: DefinitionId,
    pub parent: Option<DefinitionId>,
    pub title: String,
    pub expression: String,
    pub enabled: bool,
    pub link_documents: bool,
    /// Sort key among siblings; ties fall back to `id`.
    pub position: i64,
}

impl IndexDefinition {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Fields for creating an [`IndexDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndexDefinition {
    pub parent: Option<DefinitionId>,
    pub title: String,
    pub expression: String,
    pub enabled: bool,
    pub link_documents: bool,
    pub position: i64,
}

impl NewIndexDefinition {
    /// An enabled, document-linking root definition.
    pub fn root(title: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            parent: None,
            title: title.into(),
            expression: expression.into(),
            enabled: true,
            link_documents: true,
            position: 0,
        }
    }

    /// An enabled, document-linking child of `parent`.
    pub fn child(
        parent: DefinitionId,
        title: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            parent: Some(parent),
            ..Self::root(title, expression)
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn link_documents(mut self, link_documents: bool) -> Self {
        self.link_documents = link_documents;
        self
    }

    pub fn position(mut self, position: i64) -> Self {
        self.position = position;
        self
    }
}

/// Nested definition forest as stored in JSON files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionTree {
    #[serde(default)]
    pub title: String,
    pub expression: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub link_documents: bool,
    #[serde(default)]
    pub children: Vec<DefinitionTree>,
}

fn default_true() -> bool {
    true
}

/// A materialized tree node for one evaluated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexInstance {
    pub id: InstanceId,
    pub definition: DefinitionId,
    pub value: String,
    pub parent: Option<InstanceId>,
}

impl IndexInstance {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for IndexInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
