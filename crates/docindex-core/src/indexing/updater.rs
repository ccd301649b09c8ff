//! Evaluate the definition forest for one document.

use super::resolver::resolve_instance;
use super::warnings::IndexWarning;
use crate::expression::{evaluate, render_value, EvalContext, EvalError, FunctionRegistry};
use crate::fileserving::FileServingMirror;
use crate::models::{Document, IndexDefinition, IndexInstance};
use crate::store::IndexStore;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Walks the definition forest depth-first and attaches a document to every
/// instance its metadata produces.
pub struct IndexUpdater<'a> {
    store: &'a dyn IndexStore,
    functions: &'a FunctionRegistry,
    mirror: Option<&'a FileServingMirror>,
}

/// The instance a child definition is evaluated under.
struct Parent<'p> {
    instance: &'p IndexInstance,
    /// Mirror directory of the instance, if it could be created.
    dir: Option<&'p Path>,
}

impl<'a> IndexUpdater<'a> {
    pub fn new(store: &'a dyn IndexStore, functions: &'a FunctionRegistry) -> Self {
        Self {
            store,
            functions,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: Option<&'a FileServingMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    /// Index `document` under every enabled root definition.
    ///
    /// Never fails; every problem becomes a warning and the walk moves on to
    /// the next branch.
    pub fn update(&self, document: &Document) -> Vec<IndexWarning> {
        debug!("Updating indexes for document {}", document.id);
        let context = EvalContext::for_document(document);
        let mut warnings = Vec::new();

        let roots = match self.store.root_definitions() {
            Ok(roots) => roots,
            Err(e) => {
                warn!("Unable to read index definitions: {}", e);
                return vec![IndexWarning::DefinitionsUnavailable(e.to_string())];
            }
        };

        for root in &roots {
            self.evaluate_node(&context, document, root, None, &mut warnings);
        }
        warnings
    }

    fn evaluate_node(
        &self,
        context: &EvalContext,
        document: &Document,
        node: &IndexDefinition,
        parent: Option<&Parent<'_>>,
        warnings: &mut Vec<IndexWarning>,
    ) {
        if !node.enabled {
            debug!("Skipping disabled definition {} ('{}')", node.id, node.title);
            return;
        }

        let value = match evaluate(&node.expression, context, self.functions) {
            Ok(value) => value,
            Err(EvalError::Unresolved(error)) => {
                debug!(
                    "Document {} does not match '{}': {}",
                    document.id, node.expression, error
                );
                warnings.push(IndexWarning::UnresolvedExpression {
                    expression: node.expression.clone(),
                    error,
                });
                return;
            }
            Err(EvalError::Failed(error)) => {
                warn!(
                    "Error evaluating '{}' for document {}: {}",
                    node.expression, document.id, error
                );
                warnings.push(IndexWarning::UpdateFailed {
                    expression: node.expression.clone(),
                    error,
                });
                return;
            }
        };

        let store_failure = |error: crate::error::DocIndexError| {
            warn!(
                "Error updating index '{}' for document {}: {}",
                node.expression, document.id, error
            );
            IndexWarning::UpdateFailed {
                expression: node.expression.clone(),
                error: error.to_string(),
            }
        };

        let instance = match resolve_instance(
            self.store,
            node,
            &render_value(&value),
            parent.map(|p| p.instance.id),
        ) {
            Ok(instance) => instance,
            Err(e) => {
                warnings.push(store_failure(e));
                return;
            }
        };

        let dir = self.mirror_dir(&instance, parent, warnings);

        if node.link_documents {
            if let Err(e) = self.store.link_document(instance.id, &document.id) {
                warnings.push(store_failure(e));
                return;
            }
            if let (Some(mirror), Some(dir)) = (self.mirror, dir.as_deref()) {
                if let Err(e) = mirror.link_document(dir, document) {
                    warn!("Unable to create document link: {}", e);
                    warnings.push(IndexWarning::MirrorLink(e.to_string()));
                }
            }
        }

        let children = match self.store.child_definitions(node.id) {
            Ok(children) => children,
            Err(e) => {
                warnings.push(store_failure(e));
                return;
            }
        };

        let branch = Parent {
            instance: &instance,
            dir: dir.as_deref(),
        };
        for child in &children {
            self.evaluate_node(context, document, child, Some(&branch), warnings);
        }
    }

    /// Create the mirror directory for `instance`. A child of an instance
    /// whose directory failed gets no directory either.
    fn mirror_dir(
        &self,
        instance: &IndexInstance,
        parent: Option<&Parent<'_>>,
        warnings: &mut Vec<IndexWarning>,
    ) -> Option<PathBuf> {
        let mirror = self.mirror?;
        let parent_dir = match parent {
            Some(parent) => Some(parent.dir?),
            None => None,
        };

        let dir = mirror.child_dir(parent_dir, &instance.value);
        match mirror.ensure_dir(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                warn!("Unable to create indexing directory: {}", e);
                warnings.push(IndexWarning::MirrorDirectory(e.to_string()));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::testing::FlakyStore;
    use crate::models::NewIndexDefinition;
    use crate::store::SqliteIndexStore;

    fn invoice(id: &str) -> Document {
        Document::new(id, format!("Invoice {}", id))
            .with_metadata("category", Some("Invoices"))
            .with_metadata("client", Some("Acme"))
    }

    fn update(store: &SqliteIndexStore, document: &Document) -> Vec<String> {
        let functions = FunctionRegistry::with_defaults();
        IndexUpdater::new(store, &functions)
            .update(document)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_nested_branch() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let root = store
            .create_definition(
                &NewIndexDefinition::root("Category", "metadata.category").link_documents(false),
            )
            .unwrap();
        let child = store
            .create_definition(
                &NewIndexDefinition::child(root.id, "Client", "upper(metadata.client)")
                    .link_documents(true),
            )
            .unwrap();

        assert!(update(&store, &invoice("d1")).is_empty());

        let roots = store.child_instances(None).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].value, "Invoices");
        assert!(store.instance_documents(roots[0].id).unwrap().is_empty());

        let leaves = store.child_instances(Some(roots[0].id)).unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].definition, child.id);
        assert_eq!(leaves[0].value, "ACME");
        assert_eq!(
            store.instance_documents(leaves[0].id).unwrap(),
            vec!["d1".into()]
        );
    }

    #[test]
    fn test_unresolved_stops_branch() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let root = store
            .create_definition(&NewIndexDefinition::root("Missing", "metadata['missing_key']"))
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::child(root.id, "Child", "'x'"))
            .unwrap();

        let warnings = update(&store, &invoice("d1"));
        assert_eq!(
            warnings,
            vec![
                "Error in document indexing update expression: metadata['missing_key']; 'metadata' has no key 'missing_key'"
                    .to_string()
            ]
        );
        assert!(store.list_instances().unwrap().is_empty());
    }

    #[test]
    fn test_failure_does_not_affect_siblings() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        store
            .create_definition(&NewIndexDefinition::root("Broken", "1 / 0"))
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::root("Category", "metadata.category"))
            .unwrap();

        let warnings = update(&store, &invoice("d1"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Error updating document index, expression: 1 / 0; "));

        let instances = store.list_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].value, "Invoices");
    }

    #[test]
    fn test_overly_long_expression_becomes_warning() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let chain = format!("metadata.category{}", " + 'x'".repeat(10_000));
        store
            .create_definition(&NewIndexDefinition::root("Chain", chain))
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::root("Category", "metadata.category"))
            .unwrap();

        let warnings = update(&store, &invoice("d1"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Error updating document index, expression: "));
        assert!(warnings[0].ends_with("; invalid syntax: expression nested too deeply"));

        let instances = store.list_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].value, "Invoices");
    }

    #[test]
    fn test_disabled_subtree_skipped() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let root = store
            .create_definition(
                &NewIndexDefinition::root("Category", "metadata.category").enabled(false),
            )
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::child(root.id, "Client", "metadata.client"))
            .unwrap();

        assert!(update(&store, &invoice("d1")).is_empty());
        assert!(store.list_instances().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_child_only() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let root = store
            .create_definition(&NewIndexDefinition::root("Category", "metadata.category"))
            .unwrap();
        store
            .create_definition(
                &NewIndexDefinition::child(root.id, "Client", "metadata.client").enabled(false),
            )
            .unwrap();

        update(&store, &invoice("d1"));
        let instances = store.list_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert!(instances[0].is_root());
    }

    #[test]
    fn test_warning_order_is_depth_first() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let first = store
            .create_definition(&NewIndexDefinition::root("First", "metadata.category"))
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::child(first.id, "A", "metadata.a").position(0))
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::child(first.id, "B", "metadata.b").position(1))
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::root("Second", "metadata.c"))
            .unwrap();

        let warnings = update(&store, &invoice("d1"));
        let expressions: Vec<_> = warnings
            .iter()
            .map(|w| w.split("; ").next().unwrap().rsplit(": ").next().unwrap().to_string())
            .collect();
        assert_eq!(expressions, vec!["metadata.a", "metadata.b", "metadata.c"]);
    }

    #[test]
    fn test_null_value_creates_empty_instance() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        store
            .create_definition(&NewIndexDefinition::root("Nothing", "None"))
            .unwrap();

        assert!(update(&store, &invoice("d1")).is_empty());
        let instances = store.list_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].value, "");
    }

    #[test]
    fn test_parent_pruned_mid_update_is_repaired_next_run() {
        let store = FlakyStore::new();
        let root = store
            .create_definition(
                &NewIndexDefinition::root("Category", "metadata.category").link_documents(false),
            )
            .unwrap();
        store
            .create_definition(&NewIndexDefinition::child(root.id, "Client", "metadata.client"))
            .unwrap();
        let functions = FunctionRegistry::with_defaults();

        store.prune_parents_before_resolve(true);
        let warnings = IndexUpdater::new(&store, &functions).update(&invoice("d1"));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            IndexWarning::UpdateFailed { expression, error }
                if expression == "metadata.client" && error.starts_with("Index instance not found")
        ));
        assert!(store.list_instances().unwrap().is_empty());

        store.prune_parents_before_resolve(false);
        assert!(IndexUpdater::new(&store, &functions)
            .update(&invoice("d1"))
            .is_empty());
        assert_eq!(store.list_instances().unwrap().len(), 2);
    }

    #[test]
    fn test_store_failure_uses_update_template() {
        let store = FlakyStore::new();
        store
            .create_definition(&NewIndexDefinition::root("Category", "metadata.category"))
            .unwrap();
        store.fail_links();

        let functions = FunctionRegistry::with_defaults();
        let warnings = IndexUpdater::new(&store, &functions).update(&invoice("d1"));
        assert_eq!(
            warnings,
            vec![IndexWarning::UpdateFailed {
                expression: "metadata.category".into(),
                error: "Database error: injected failure".into(),
            }]
        );
    }
}
