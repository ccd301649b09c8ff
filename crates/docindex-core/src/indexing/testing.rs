//! Store double that fails on demand.

use crate::error::{DocIndexError, Result};
use crate::models::{
    DefinitionId, DocumentId, IndexDefinition, IndexInstance, InstanceId, NewIndexDefinition,
};
use crate::store::{DetachOutcome, IndexStore, SqliteIndexStore};
use std::collections::HashSet;
use std::sync::Mutex;

/// Delegates to an in-memory SQLite store, except for the operations and
/// instances marked to fail.
pub(crate) struct FlakyStore {
    inner: SqliteIndexStore,
    failing_detach: Mutex<HashSet<InstanceId>>,
    failing_link: Mutex<bool>,
    pruning_parents: Mutex<bool>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteIndexStore::open_in_memory().unwrap(),
            failing_detach: Mutex::new(HashSet::new()),
            failing_link: Mutex::new(false),
            pruning_parents: Mutex::new(false),
        }
    }

    pub(crate) fn fail_detach(&self, instance: InstanceId) {
        self.failing_detach.lock().unwrap().insert(instance);
    }

    pub(crate) fn fail_links(&self) {
        *self.failing_link.lock().unwrap() = true;
    }

    /// Prune the parent of every child resolve first, as a concurrent
    /// delete could between two resolves.
    pub(crate) fn prune_parents_before_resolve(&self, enabled: bool) {
        *self.pruning_parents.lock().unwrap() = enabled;
    }

    fn injected() -> DocIndexError {
        DocIndexError::Database {
            message: "injected failure".to_string(),
            source: None,
        }
    }
}

impl IndexStore for FlakyStore {
    fn create_definition(&self, new: &NewIndexDefinition) -> Result<IndexDefinition> {
        self.inner.create_definition(new)
    }

    fn get_definition(&self, id: DefinitionId) -> Result<Option<IndexDefinition>> {
        self.inner.get_definition(id)
    }

    fn set_definition_enabled(&self, id: DefinitionId, enabled: bool) -> Result<()> {
        self.inner.set_definition_enabled(id, enabled)
    }

    fn delete_definition(&self, id: DefinitionId) -> Result<bool> {
        self.inner.delete_definition(id)
    }

    fn root_definitions(&self) -> Result<Vec<IndexDefinition>> {
        self.inner.root_definitions()
    }

    fn child_definitions(&self, parent: DefinitionId) -> Result<Vec<IndexDefinition>> {
        self.inner.child_definitions(parent)
    }

    fn resolve_or_create(
        &self,
        definition: DefinitionId,
        value: &str,
        parent: Option<InstanceId>,
    ) -> Result<(IndexInstance, bool)> {
        if let (Some(parent), true) = (parent, *self.pruning_parents.lock().unwrap()) {
            self.inner
                .detach_and_prune(parent, &DocumentId::from("concurrent"))?;
        }
        self.inner.resolve_or_create(definition, value, parent)
    }

    fn get_instance(&self, id: InstanceId) -> Result<Option<IndexInstance>> {
        self.inner.get_instance(id)
    }

    fn child_instances(&self, parent: Option<InstanceId>) -> Result<Vec<IndexInstance>> {
        self.inner.child_instances(parent)
    }

    fn list_instances(&self) -> Result<Vec<IndexInstance>> {
        self.inner.list_instances()
    }

    fn link_document(&self, instance: InstanceId, document: &DocumentId) -> Result<bool> {
        if *self.failing_link.lock().unwrap() {
            return Err(Self::injected());
        }
        self.inner.link_document(instance, document)
    }

    fn instance_documents(&self, instance: InstanceId) -> Result<Vec<DocumentId>> {
        self.inner.instance_documents(instance)
    }

    fn document_instances(&self, document: &DocumentId) -> Result<Vec<IndexInstance>> {
        self.inner.document_instances(document)
    }

    fn detach_and_prune(
        &self,
        instance: InstanceId,
        document: &DocumentId,
    ) -> Result<DetachOutcome> {
        if self.failing_detach.lock().unwrap().contains(&instance) {
            return Err(Self::injected());
        }
        self.inner.detach_and_prune(instance, document)
    }

    fn clear_instances(&self) -> Result<usize> {
        self.inner.clear_instances()
    }
}
