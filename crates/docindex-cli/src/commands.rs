//! Subcommand handlers.

use anyhow::{Context, Result};
use docindex_core::{DefinitionTree, Document, DocumentIndexer, IndexStore};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Document files hold either one document or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentInput {
    One(Box<Document>),
    Many(Vec<Document>),
}

fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input: DocumentInput = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid document JSON in {}", path.display()))?;
    Ok(match input {
        DocumentInput::One(document) => vec![*document],
        DocumentInput::Many(documents) => documents,
    })
}

fn report(document: &Document, warnings: &[String]) {
    if warnings.is_empty() {
        println!("{}: ok", document.id);
        return;
    }
    for warning in warnings {
        warn!("{}: {}", document.id, warning);
        println!("{}: {}", document.id, warning);
    }
}

pub fn define(indexer: &DocumentIndexer, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let forest: Vec<DefinitionTree> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid definition JSON in {}", path.display()))?;

    let created = indexer.import_definitions(&forest)?;
    println!("Imported {} index definitions", created.len());
    Ok(())
}

pub fn update(indexer: &DocumentIndexer, path: &Path) -> Result<()> {
    for document in read_documents(path)? {
        let warnings = indexer.update_indexes(&document);
        report(&document, &warnings);
    }
    Ok(())
}

pub fn delete(indexer: &DocumentIndexer, path: &Path) -> Result<()> {
    for document in read_documents(path)? {
        let warnings = indexer.delete_indexes(&document);
        report(&document, &warnings);
    }
    Ok(())
}

pub fn rebuild(indexer: &DocumentIndexer, path: &Path) -> Result<()> {
    let documents = read_documents(path)?;
    let warnings = indexer.rebuild_indexes(&documents)?;
    info!("Rebuilt indexes for {} documents", documents.len());
    for warning in &warnings {
        println!("{}", warning);
    }
    Ok(())
}

pub fn tree(indexer: &DocumentIndexer) -> Result<()> {
    let store = indexer.store();
    let presenter = indexer.presenter();
    for instance in store.list_instances()? {
        let breadcrumb = presenter.render_breadcrumb(&instance, true, false)?;
        let documents = store.instance_documents(instance.id)?.len();
        println!("{} ({})", breadcrumb, documents);
    }
    Ok(())
}
