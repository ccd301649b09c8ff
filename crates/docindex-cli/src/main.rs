//! docindex - maintain metadata-driven document indexes from the command line.
//!
//! Definitions and documents are read from JSON files; the instance tree lives
//! in a SQLite database.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docindex_core::{DocumentIndexer, IndexingConfig, IndexingDefaults, SqliteIndexStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "docindex")]
#[command(about = "Hierarchical document indexes driven by metadata")]
struct Args {
    /// SQLite database holding definitions and instances
    #[arg(long, default_value = IndexingDefaults::DATABASE_FILENAME)]
    db: PathBuf,

    /// JSON configuration file (defaults to ./docindex.json when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a nested forest of index definitions
    Define {
        /// JSON file with an array of definition trees
        forest: PathBuf,
    },
    /// Index one or more documents
    Update {
        /// JSON file with a document or an array of documents
        documents: PathBuf,
    },
    /// Remove one or more documents from all indexes
    Delete {
        /// JSON file with a document or an array of documents
        documents: PathBuf,
    },
    /// Drop every instance and index the given documents again
    Rebuild {
        /// JSON file with a document or an array of documents
        documents: PathBuf,
    },
    /// Print every instance with its document count
    Tree,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(args.config.as_deref())?;
    debug!("Configuration: {:?}", config);

    info!("Opening index database {}", args.db.display());
    let store = SqliteIndexStore::open(&args.db)
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;

    let indexer = DocumentIndexer::builder(Arc::new(store))
        .config(config)
        .auto_create_dirs(true)
        .build()?;

    match args.command {
        Command::Define { forest } => commands::define(&indexer, &forest),
        Command::Update { documents } => commands::update(&indexer, &documents),
        Command::Delete { documents } => commands::delete(&indexer, &documents),
        Command::Rebuild { documents } => commands::rebuild(&indexer, &documents),
        Command::Tree => commands::tree(&indexer),
    }
}

fn load_config(path: Option<&Path>) -> Result<IndexingConfig> {
    match path {
        Some(path) => IndexingConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let default_path = Path::new(IndexingDefaults::CONFIG_FILENAME);
            if default_path.exists() {
                Ok(IndexingConfig::load(default_path)?)
            } else {
                Ok(IndexingConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update() {
        let args = Args::parse_from(["docindex", "--db", "x.db", "update", "doc.json"]);
        assert_eq!(args.db, PathBuf::from("x.db"));
        assert!(matches!(args.command, Command::Update { documents } if documents == PathBuf::from("doc.json")));
    }

    #[test]
    fn test_default_database() {
        let args = Args::parse_from(["docindex", "tree"]);
        assert_eq!(args.db, PathBuf::from(IndexingDefaults::DATABASE_FILENAME));
        assert!(!args.debug);
    }
}
