//! Detach a document from the instance tree and prune empty leaves.

use super::warnings::IndexWarning;
use crate::fileserving::FileServingMirror;
use crate::models::{Document, InstanceId};
use crate::store::{DetachOutcome, IndexStore};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Removes a document from every instance it is linked to, deleting
/// instances that end up with neither documents nor children.
pub struct IndexPruner<'a> {
    store: &'a dyn IndexStore,
    mirror: Option<&'a FileServingMirror>,
}

impl<'a> IndexPruner<'a> {
    pub fn new(store: &'a dyn IndexStore) -> Self {
        Self {
            store,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: Option<&'a FileServingMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    /// Detach `document` from every instance it belongs to.
    pub fn delete(&self, document: &Document) -> Vec<IndexWarning> {
        debug!("Deleting indexes for document {}", document.id);

        let linked = match self.store.document_instances(&document.id) {
            Ok(linked) => linked,
            Err(e) => {
                warn!("Unable to list instances of document {}: {}", document.id, e);
                return vec![IndexWarning::DeleteFailed(e.to_string())];
            }
        };

        let mut warnings = Vec::new();
        let mut pruned = HashSet::new();
        for instance in linked {
            // Already removed while walking up from an earlier instance.
            if pruned.contains(&instance.id) {
                continue;
            }
            self.detach(document, instance.id, &mut pruned, &mut warnings);
        }
        warnings
    }

    /// Walk upward from `start` while instances keep becoming empty.
    fn detach(
        &self,
        document: &Document,
        start: InstanceId,
        pruned: &mut HashSet<InstanceId>,
        warnings: &mut Vec<IndexWarning>,
    ) {
        let mut current = Some(start);
        while let Some(id) = current {
            let dir = self.unlink_mirrored(document, id, warnings);

            match self.store.detach_and_prune(id, &document.id) {
                Ok(DetachOutcome::Retained) => {
                    current = None;
                }
                Ok(DetachOutcome::Deleted { parent }) => {
                    pruned.insert(id);
                    if let (Some(mirror), Some(dir)) = (self.mirror, dir) {
                        if let Err(e) = mirror.remove_dir(&dir) {
                            warn!("Unable to remove indexing directory: {}", e);
                            warnings.push(IndexWarning::MirrorCleanup(e.to_string()));
                        }
                    }
                    current = parent;
                }
                Err(e) => {
                    if e.is_stale_reference() {
                        debug!("Index instance {} vanished during pruning: {}", id, e);
                    } else {
                        warn!("Unable to delete document indexing node {}: {}", id, e);
                    }
                    warnings.push(IndexWarning::DeleteFailed(e.to_string()));
                    current = None;
                }
            }
        }
    }

    /// Remove the document's mirror link from the instance directory and
    /// return that directory for later cleanup.
    fn unlink_mirrored(
        &self,
        document: &Document,
        id: InstanceId,
        warnings: &mut Vec<IndexWarning>,
    ) -> Option<PathBuf> {
        let mirror = self.mirror?;
        let dir = match mirror.instance_dir(self.store, id) {
            Ok(dir) => dir,
            // The detach step reports missing instances itself.
            Err(e) if e.is_stale_reference() => return None,
            Err(e) => {
                warnings.push(IndexWarning::MirrorUnlink(e.to_string()));
                return None;
            }
        };
        if let Err(e) = mirror.unlink_document(&dir, document) {
            warn!("Unable to remove document link: {}", e);
            warnings.push(IndexWarning::MirrorUnlink(e.to_string()));
        }
        Some(dir)
    }
}
