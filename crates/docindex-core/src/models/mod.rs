//! Domain types shared by the store, the engine and the presenter.

mod document;
mod index;

pub use document::{Document, DocumentId, MetadataEntry};
pub use index::{
    DefinitionId, DefinitionTree, IndexDefinition, IndexInstance, InstanceId, NewIndexDefinition,
};
