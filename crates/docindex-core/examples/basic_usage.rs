//! Basic usage example - index a few documents and print the tree

use std::sync::Arc;

use docindex_core::{
    Document, DocumentIndexer, IndexStore, NewIndexDefinition, Result, SqliteIndexStore,
};

fn main() -> Result<()> {
    // Get database path from args or keep everything in memory
    let store = match std::env::args().nth(1) {
        Some(path) => SqliteIndexStore::open(path)?,
        None => SqliteIndexStore::open_in_memory()?,
    };
    let indexer = DocumentIndexer::new(Arc::new(store));

    let category = indexer.create_definition(
        &NewIndexDefinition::root("Category", "metadata['category']").link_documents(false),
    )?;
    indexer.create_definition(&NewIndexDefinition::child(
        category.id,
        "Client",
        "proper_name(metadata['client'])",
    ))?;

    let documents = [
        Document::new("1", "Invoice 1")
            .with_metadata("category", Some("Invoices"))
            .with_metadata("client", Some("acme corp")),
        Document::new("2", "Invoice 2")
            .with_metadata("category", Some("Invoices"))
            .with_metadata("client", Some("globex")),
        Document::new("3", "Memo").with_metadata("category", Some("Memos")),
    ];

    for document in &documents {
        for warning in indexer.update_indexes(document) {
            println!("warning: {}", warning);
        }
    }

    let presenter = indexer.presenter();
    for instance in indexer.store().list_instances()? {
        println!("  - {}", presenter.render_breadcrumb(&instance, true, false)?);
    }

    Ok(())
}
