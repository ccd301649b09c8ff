//! docindex core - hierarchical document indexes driven by metadata.
//!
//! Administrators author a forest of index definitions, each holding a small
//! expression over a document and its metadata. Evaluating the forest for a
//! document materializes a tree of index instances (one per distinct value
//! under a given parent) and links the document to them. Deleting a document
//! detaches it again and prunes instances left empty.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use docindex_core::{
//!     Document, DocumentIndexer, IndexStore, NewIndexDefinition, SqliteIndexStore,
//! };
//!
//! # fn main() -> docindex_core::Result<()> {
//! let store = Arc::new(SqliteIndexStore::open_in_memory()?);
//! let indexer = DocumentIndexer::new(store);
//! indexer.create_definition(&NewIndexDefinition::root("Category", "metadata['category']"))?;
//!
//! let document = Document::new("42", "Invoice 42").with_metadata("category", Some("Invoices"));
//! let warnings = indexer.update_indexes(&document);
//! assert!(warnings.is_empty());
//!
//! let instances = indexer.store().list_instances()?;
//! assert_eq!(instances[0].value, "Invoices");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod expression;
pub mod fileserving;
pub mod indexing;
pub mod models;
pub mod presenter;
pub mod slug;
pub mod store;

mod api;

// Re-export commonly used types
pub use api::{DocumentIndexer, DocumentIndexerBuilder};
pub use config::{FileServingConfig, IndexingConfig, IndexingDefaults, PresentationConfig};
pub use error::{DocIndexError, Result};
pub use expression::{evaluate, EvalContext, EvalError, FunctionRegistry, IndexFunction};
pub use fileserving::FileServingMirror;
pub use indexing::IndexWarning;
pub use models::{
    DefinitionId, DefinitionTree, Document, DocumentId, IndexDefinition, IndexInstance,
    InstanceId, MetadataEntry, NewIndexDefinition,
};
pub use presenter::Presenter;
pub use store::{DetachOutcome, IndexStore, SqliteIndexStore};
