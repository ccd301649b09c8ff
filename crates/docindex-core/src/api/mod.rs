//! Public facade over the store, the evaluator and the tree walkers.

mod builder;

pub use builder::DocumentIndexerBuilder;

use std::sync::Arc;

use crate::config::IndexingConfig;
use crate::error::{DocIndexError, Result};
use crate::expression::{check_syntax, FunctionRegistry};
use crate::fileserving::FileServingMirror;
use crate::indexing::{IndexPruner, IndexUpdater};
use crate::models::{DefinitionId, DefinitionTree, Document, IndexDefinition, NewIndexDefinition};
use crate::presenter::Presenter;
use crate::store::IndexStore;
use tracing::info;

/// Keeps the instance tree in sync with documents.
///
/// Cheap to share behind an `Arc`: every method takes `&self` and the store
/// handles its own locking.
pub struct DocumentIndexer {
    store: Arc<dyn IndexStore>,
    functions: FunctionRegistry,
    config: IndexingConfig,
    mirror: Option<FileServingMirror>,
}

impl std::fmt::Debug for DocumentIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndexer")
            .field("functions", &self.functions)
            .field("config", &self.config)
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}

impl DocumentIndexer {
    pub fn builder(store: Arc<dyn IndexStore>) -> DocumentIndexerBuilder {
        DocumentIndexerBuilder::new(store)
    }

    /// An indexer with default configuration and the default functions.
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store,
            functions: FunctionRegistry::with_defaults(),
            config: IndexingConfig::default(),
            mirror: None,
        }
    }

    pub fn store(&self) -> &dyn IndexStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    // ========================================
    // Indexing
    // ========================================

    /// Attach `document` to every instance its metadata produces.
    ///
    /// Returns warnings in generation order; an empty list means every
    /// enabled branch matched.
    pub fn update_indexes(&self, document: &Document) -> Vec<String> {
        IndexUpdater::new(self.store(), &self.functions)
            .with_mirror(self.mirror.as_ref())
            .update(document)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Detach `document` from all instances and prune the ones left empty.
    pub fn delete_indexes(&self, document: &Document) -> Vec<String> {
        IndexPruner::new(self.store())
            .with_mirror(self.mirror.as_ref())
            .delete(document)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Drop every instance and index `documents` from scratch.
    pub fn rebuild_indexes<'d>(
        &self,
        documents: impl IntoIterator<Item = &'d Document>,
    ) -> Result<Vec<String>> {
        let roots = self.store.child_instances(None)?;
        let removed = self.store.clear_instances()?;
        if let Some(mirror) = &self.mirror {
            mirror.clear(&roots)?;
        }
        info!("Cleared {} index instances for rebuild", removed);

        let mut warnings = Vec::new();
        for document in documents {
            warnings.extend(self.update_indexes(document));
        }
        Ok(warnings)
    }

    pub fn presenter(&self) -> Presenter<'_> {
        Presenter::new(self.store(), &self.config.presentation)
    }

    // ========================================
    // Definitions
    // ========================================

    /// Create a definition after checking that its expression parses.
    pub fn create_definition(&self, new: &NewIndexDefinition) -> Result<IndexDefinition> {
        validate_expression(&new.expression)?;
        self.store.create_definition(new)
    }

    pub fn set_definition_enabled(&self, id: DefinitionId, enabled: bool) -> Result<()> {
        self.store.set_definition_enabled(id, enabled)
    }

    /// Import a nested forest of definitions, appending to existing roots.
    ///
    /// Every expression is checked before anything is written.
    pub fn import_definitions(&self, forest: &[DefinitionTree]) -> Result<Vec<IndexDefinition>> {
        fn check(trees: &[DefinitionTree]) -> Result<()> {
            for tree in trees {
                validate_expression(&tree.expression)?;
                check(&tree.children)?;
            }
            Ok(())
        }
        check(forest)?;

        let mut created = Vec::new();
        self.import_level(forest, None, &mut created)?;
        info!("Imported {} index definitions", created.len());
        Ok(created)
    }

    fn import_level(
        &self,
        trees: &[DefinitionTree],
        parent: Option<DefinitionId>,
        created: &mut Vec<IndexDefinition>,
    ) -> Result<()> {
        for (position, tree) in trees.iter().enumerate() {
            let title = if tree.title.is_empty() {
                tree.expression.clone()
            } else {
                tree.title.clone()
            };
            let new = NewIndexDefinition {
                parent,
                title,
                expression: tree.expression.clone(),
                enabled: tree.enabled,
                link_documents: tree.link_documents,
                position: position as i64,
            };
            let definition = self.store.create_definition(&new)?;
            let id = definition.id;
            created.push(definition);
            self.import_level(&tree.children, Some(id), created)?;
        }
        Ok(())
    }
}

fn validate_expression(expression: &str) -> Result<()> {
    if expression.trim().is_empty() {
        return Err(DocIndexError::Validation {
            field: "expression".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    check_syntax(expression).map_err(|message| DocIndexError::Validation {
        field: "expression".to_string(),
        message: format!("'{}': {}", expression, message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileServingConfig;
    use crate::store::SqliteIndexStore;
    use tempfile::TempDir;

    fn indexer() -> DocumentIndexer {
        DocumentIndexer::new(Arc::new(SqliteIndexStore::open_in_memory().unwrap()))
    }

    fn forest() -> Vec<DefinitionTree> {
        serde_json::from_str(
            r#"[
                {
                    "title": "Category",
                    "expression": "metadata.category",
                    "children": [
                        {"expression": "metadata.client", "link_documents": true}
                    ]
                },
                {"title": "Year", "expression": "year(document.date_added)", "enabled": false}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_import_definitions() {
        let indexer = indexer();
        let created = indexer.import_definitions(&forest()).unwrap();
        assert_eq!(created.len(), 3);

        let roots = indexer.store().root_definitions().unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].title, "Category");
        assert!(!roots[0].link_documents);
        assert!(!roots[1].enabled);

        let children = indexer.store().child_definitions(roots[0].id).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title, "metadata.client");
        assert!(children[0].link_documents);
    }

    #[test]
    fn test_import_rejects_bad_expression_before_writing() {
        let indexer = indexer();
        let mut trees = forest();
        trees[0].children[0].expression = "metadata.".to_string();

        let err = indexer.import_definitions(&trees).unwrap_err();
        assert!(matches!(err, DocIndexError::Validation { .. }));
        assert!(indexer.store().root_definitions().unwrap().is_empty());
    }

    #[test]
    fn test_create_definition_validates() {
        let indexer = indexer();
        assert!(indexer
            .create_definition(&NewIndexDefinition::root("Empty", "  "))
            .is_err());
        assert!(indexer
            .create_definition(&NewIndexDefinition::root("Category", "metadata.category"))
            .is_ok());
    }

    #[test]
    fn test_create_definition_rejects_long_chain() {
        let indexer = indexer();
        let chain = format!("metadata{}", ".a".repeat(10_000));
        let err = indexer
            .create_definition(&NewIndexDefinition::root("Chain", chain))
            .unwrap_err();
        assert!(matches!(err, DocIndexError::Validation { .. }));
        assert!(indexer.store().root_definitions().unwrap().is_empty());
    }

    #[test]
    fn test_update_and_delete() {
        let indexer = indexer();
        indexer.import_definitions(&forest()).unwrap();
        let doc = Document::new("d1", "Invoice")
            .with_metadata("category", Some("Invoices"))
            .with_metadata("client", Some("Acme"));

        assert!(indexer.update_indexes(&doc).is_empty());
        assert_eq!(indexer.store().list_instances().unwrap().len(), 2);

        assert!(indexer.delete_indexes(&doc).is_empty());
        assert!(indexer.store().list_instances().unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_indexes() {
        let indexer = indexer();
        indexer.import_definitions(&forest()).unwrap();
        let doc = Document::new("d1", "Invoice")
            .with_metadata("category", Some("Invoices"))
            .with_metadata("client", Some("Acme"));
        indexer.update_indexes(&doc);

        indexer
            .create_definition(&NewIndexDefinition::root("Label", "document.label"))
            .unwrap();
        let warnings = indexer.rebuild_indexes([&doc]).unwrap();
        assert!(warnings.is_empty());

        let values: Vec<_> = indexer
            .store()
            .list_instances()
            .unwrap()
            .into_iter()
            .map(|i| i.value)
            .collect();
        assert_eq!(values, vec!["Invoices", "Acme", "Invoice"]);
    }

    #[test]
    fn test_builder_restricts_functions() {
        let store = Arc::new(SqliteIndexStore::open_in_memory().unwrap());
        let config = IndexingConfig {
            allowed_functions: Some(vec!["lower".to_string()]),
            ..Default::default()
        };
        let indexer = DocumentIndexer::builder(store).config(config).build().unwrap();
        assert!(indexer.functions().contains("lower"));
        assert!(!indexer.functions().contains("upper"));
    }

    #[test]
    fn test_builder_requires_mirror_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("mirror");
        let config = IndexingConfig {
            fileserving: FileServingConfig {
                enabled: true,
                path: Some(root.clone()),
            },
            ..Default::default()
        };

        let store = Arc::new(SqliteIndexStore::open_in_memory().unwrap());
        let err = DocumentIndexer::builder(store.clone())
            .config(config.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, DocIndexError::Config { .. }));

        DocumentIndexer::builder(store)
            .config(config)
            .auto_create_dirs(true)
            .build()
            .unwrap();
        assert!(root.is_dir());
    }
}
