//! Optional on-disk mirror of the instance tree.
//!
//! Every instance becomes a directory under the configured root, named after
//! its value, and every document linked to an instance becomes a link to the
//! document's file inside that directory. Mirror failures never abort index
//! maintenance; callers turn them into warnings.

mod links;

pub use links::LinkKind;

use crate::config::IndexingConfig;
use crate::error::{DocIndexError, Result};
use crate::models::{Document, IndexInstance, InstanceId};
use crate::slug::{link_name, path_component};
use crate::store::IndexStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mirrors index instances as directories and document links.
#[derive(Debug, Clone)]
pub struct FileServingMirror {
    root: PathBuf,
    slugify_paths: bool,
}

impl FileServingMirror {
    pub fn new(root: impl Into<PathBuf>, slugify_paths: bool) -> Self {
        Self {
            root: root.into(),
            slugify_paths,
        }
    }

    /// Build a mirror when file serving is enabled in `config`.
    pub fn from_config(config: &IndexingConfig) -> Option<Self> {
        config
            .fileserving_root()
            .map(|root| Self::new(root, config.slugify_paths))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a child instance under `parent_dir`, or under the root
    /// for a root instance.
    pub fn child_dir(&self, parent_dir: Option<&Path>, value: &str) -> PathBuf {
        parent_dir
            .unwrap_or(&self.root)
            .join(path_component(value, self.slugify_paths))
    }

    /// Directory of an existing instance, resolved through its ancestors.
    pub fn instance_dir(&self, store: &dyn IndexStore, id: InstanceId) -> Result<PathBuf> {
        let instance = store
            .get_instance(id)?
            .ok_or(DocIndexError::InstanceNotFound { id: id.0 })?;
        Ok(self.path_for(&store.ancestors(id)?, &instance))
    }

    fn path_for(&self, ancestors: &[IndexInstance], instance: &IndexInstance) -> PathBuf {
        let mut path = self.root.clone();
        for node in ancestors.iter().chain(std::iter::once(instance)) {
            path.push(path_component(&node.value, self.slugify_paths));
        }
        path
    }

    /// Create an instance directory and any missing parents.
    pub fn ensure_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| DocIndexError::io_with_path(e, dir))
    }

    /// Link the document's file into `dir`.
    ///
    /// Returns `None` when the document has no file. Re-linking a document
    /// that is already present is a no-op. When another document already
    /// owns the name, the document id is appended. Copies, made only when
    /// neither symlinks nor hard links work, always use the id-suffixed name
    /// so they can be told apart from other documents' files.
    pub fn link_document(&self, dir: &Path, document: &Document) -> Result<Option<PathBuf>> {
        let Some(source) = document.file_path.as_deref() else {
            debug!("Document {} has no file to link", document.id);
            return Ok(None);
        };

        self.ensure_dir(dir)?;

        let [primary, owned] = self.link_candidates(dir, document);
        if let Some(existing) = Self::owned_entry(&primary, &owned, source) {
            return Ok(Some(existing));
        }

        let target = if !links::entry_exists(&primary) {
            primary
        } else if !links::entry_exists(&owned) {
            owned.clone()
        } else {
            return Err(DocIndexError::io_with_path(
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "link name taken by another document",
                ),
                dir,
            ));
        };

        let (target, kind) = match links::create_link(source, &target) {
            Ok(kind) => (target, kind),
            Err(e) if links::entry_exists(&owned) => {
                return Err(DocIndexError::io_with_path(e, &target));
            }
            Err(_) => {
                let kind = links::copy_file(source, &owned)
                    .map_err(|e| DocIndexError::io_with_path(e, &owned))?;
                (owned, kind)
            }
        };
        debug!("Linked document {} at {:?} ({:?})", document.id, target, kind);
        Ok(Some(target))
    }

    /// Remove the document's link from `dir`. Returns `true` if one was removed.
    pub fn unlink_document(&self, dir: &Path, document: &Document) -> Result<bool> {
        let Some(source) = document.file_path.as_deref() else {
            return Ok(false);
        };

        let [primary, owned] = self.link_candidates(dir, document);
        match Self::owned_entry(&primary, &owned, source) {
            Some(entry) => {
                std::fs::remove_file(&entry)
                    .map_err(|e| DocIndexError::io_with_path(e, &entry))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove an instance directory once it is empty. A directory that is
    /// already gone, or still holds entries of an instance mapped to the
    /// same path, is left alone.
    pub fn remove_dir(&self, dir: &Path) -> Result<bool> {
        match std::fs::remove_dir(dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::DirectoryNotEmpty => {
                debug!("Keeping non-empty index directory {:?}", dir);
                Ok(false)
            }
            Err(e) => Err(DocIndexError::io_with_path(e, dir)),
        }
    }

    /// Remove the directories of all root instances with their contents.
    ///
    /// Only paths derived from the instances are touched; anything else under
    /// the mirror root is left alone.
    pub fn clear(&self, roots: &[IndexInstance]) -> Result<()> {
        for instance in roots {
            let dir = self.path_for(&[], instance);
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(DocIndexError::io_with_path(e, dir)),
            }
        }
        Ok(())
    }

    fn link_candidates(&self, dir: &Path, document: &Document) -> [PathBuf; 2] {
        let extension = document.extension();
        let primary = link_name(&document.label, extension.as_deref(), self.slugify_paths);
        let fallback = link_name(
            &format!("{}_{}", document.label, document.id),
            extension.as_deref(),
            self.slugify_paths,
        );
        [dir.join(primary), dir.join(fallback)]
    }

    /// The entry in `dir` that belongs to the document, if any. Links are
    /// matched by target or file identity; a copy only under the owned name.
    fn owned_entry(primary: &Path, owned: &Path, source: &Path) -> Option<PathBuf> {
        [primary, owned]
            .into_iter()
            .find(|candidate| links::is_link_to(candidate, source))
            .or_else(|| links::is_copy_of(owned, source).then_some(owned))
            .map(Path::to_path_buf)
    }
}
