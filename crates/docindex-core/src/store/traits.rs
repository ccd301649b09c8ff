//! Store backend trait and types.

use crate::error::{DocIndexError, Result};
use crate::models::{
    DefinitionId, DocumentId, IndexDefinition, IndexInstance, InstanceId, NewIndexDefinition,
};
use std::collections::HashSet;

/// What happened to an instance after a document was detached from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    /// The instance still has documents or child instances.
    Retained,
    /// The instance became an empty leaf and was deleted.
    Deleted { parent: Option<InstanceId> },
}

/// Persistent storage for index definitions, instances and memberships.
///
/// All operations are synchronous to match rusqlite's API. Implementations
/// must make [`IndexStore::resolve_or_create`] atomic with respect to the
/// `(definition, value, parent)` key and [`IndexStore::detach_and_prune`]
/// atomic per instance.
///
/// Each call commits on its own. An update resolves a parent and its children
/// in separate calls, so a concurrent delete may prune the parent in between.
/// The child's resolve then fails with
/// [`DocIndexError::InstanceNotFound`] and the branch is reported as a
/// warning; the next update of the document recreates it.
pub trait IndexStore: Send + Sync {
    /// Create a definition. The parent, if any, must exist.
    fn create_definition(&self, new: &NewIndexDefinition) -> Result<IndexDefinition>;

    fn get_definition(&self, id: DefinitionId) -> Result<Option<IndexDefinition>>;

    fn set_definition_enabled(&self, id: DefinitionId, enabled: bool) -> Result<()>;

    /// Delete a definition, its descendants and all their instances.
    fn delete_definition(&self, id: DefinitionId) -> Result<bool>;

    /// Definitions without a parent, in sibling order.
    fn root_definitions(&self) -> Result<Vec<IndexDefinition>>;

    /// Direct children of `parent`, in sibling order.
    fn child_definitions(&self, parent: DefinitionId) -> Result<Vec<IndexDefinition>>;

    /// Find the instance keyed by `(definition, value, parent)` or create it
    /// with an empty document set. The flag is `true` when it was created.
    fn resolve_or_create(
        &self,
        definition: DefinitionId,
        value: &str,
        parent: Option<InstanceId>,
    ) -> Result<(IndexInstance, bool)>;

    fn get_instance(&self, id: InstanceId) -> Result<Option<IndexInstance>>;

    /// Child instances of `parent`, or the root instances for `None`.
    fn child_instances(&self, parent: Option<InstanceId>) -> Result<Vec<IndexInstance>>;

    /// Every instance, parents before children.
    fn list_instances(&self) -> Result<Vec<IndexInstance>>;

    /// Add a document to an instance. Returns `false` if it was already linked.
    fn link_document(&self, instance: InstanceId, document: &DocumentId) -> Result<bool>;

    fn instance_documents(&self, instance: InstanceId) -> Result<Vec<DocumentId>>;

    /// Instances the document is currently linked to.
    fn document_instances(&self, document: &DocumentId) -> Result<Vec<IndexInstance>>;

    /// Remove the document from the instance, then delete the instance if it
    /// has neither documents nor children left. One atomic step.
    fn detach_and_prune(&self, instance: InstanceId, document: &DocumentId)
        -> Result<DetachOutcome>;

    /// Delete every instance and membership, keeping definitions.
    fn clear_instances(&self) -> Result<usize>;

    /// Ancestors of an instance from the root down to its parent. The
    /// instance itself is not included; a root has no ancestors.
    fn ancestors(&self, id: InstanceId) -> Result<Vec<IndexInstance>> {
        let instance = self
            .get_instance(id)?
            .ok_or(DocIndexError::InstanceNotFound { id: id.0 })?;

        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut next = instance.parent;
        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                return Err(DocIndexError::Other(format!(
                    "Cycle in instance tree at {}",
                    parent_id
                )));
            }
            let parent = self
                .get_instance(parent_id)?
                .ok_or(DocIndexError::InstanceNotFound { id: parent_id.0 })?;
            next = parent.parent;
            chain.push(parent);
        }
        chain.reverse();
        Ok(chain)
    }
}
