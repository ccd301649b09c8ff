//! Builder for configuring a DocumentIndexer.

use std::sync::Arc;

use crate::api::DocumentIndexer;
use crate::config::IndexingConfig;
use crate::error::{DocIndexError, Result};
use crate::expression::FunctionRegistry;
use crate::fileserving::FileServingMirror;
use crate::store::IndexStore;

/// Builder for configuring a [`DocumentIndexer`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use docindex_core::{DocumentIndexer, FunctionRegistry, IndexingConfig, SqliteIndexStore};
///
/// # fn main() -> docindex_core::Result<()> {
/// let store = Arc::new(SqliteIndexStore::open("docindex.db")?);
/// let indexer = DocumentIndexer::builder(store)
///     .config(IndexingConfig::load("docindex.json")?)
///     .functions(FunctionRegistry::with_defaults())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct DocumentIndexerBuilder {
    store: Arc<dyn IndexStore>,
    config: IndexingConfig,
    functions: FunctionRegistry,
    auto_create_dirs: bool,
}

impl DocumentIndexerBuilder {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store,
            config: IndexingConfig::default(),
            functions: FunctionRegistry::with_defaults(),
            auto_create_dirs: false,
        }
    }

    /// Runtime configuration. Default: [`IndexingConfig::default`].
    pub fn config(mut self, config: IndexingConfig) -> Self {
        self.config = config;
        self
    }

    /// Functions expressions may call. The configured `allowed_functions`
    /// list, if any, is applied on top.
    ///
    /// Default: [`FunctionRegistry::with_defaults`]
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Create the file serving root if it doesn't exist.
    ///
    /// Default: `false` (the directory must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Build the DocumentIndexer instance.
    pub fn build(self) -> Result<DocumentIndexer> {
        self.config.validate()?;

        let functions = match &self.config.allowed_functions {
            Some(names) => self.functions.restrict(names),
            None => self.functions,
        };

        let mirror = FileServingMirror::from_config(&self.config);
        if let Some(mirror) = &mirror {
            let root = mirror.root();
            if !root.exists() {
                if self.auto_create_dirs {
                    std::fs::create_dir_all(root).map_err(|e| DocIndexError::Io {
                        message: format!("Failed to create file serving root: {}", root.display()),
                        path: Some(root.to_path_buf()),
                        source: Some(e),
                    })?;
                } else {
                    return Err(DocIndexError::Config {
                        message: format!("File serving root does not exist: {}", root.display()),
                    });
                }
            }
        }

        Ok(DocumentIndexer {
            store: self.store,
            functions,
            config: self.config,
            mirror,
        })
    }
}
