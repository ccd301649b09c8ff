//! SQLite-backed index store.

use super::traits::{DetachOutcome, IndexStore};
use crate::config::StoreConfig;
use crate::error::{DocIndexError, Result};
use crate::models::{
    DefinitionId, DocumentId, IndexDefinition, IndexInstance, InstanceId, NewIndexDefinition,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const DEFINITION_COLUMNS: &str =
    "id, parent_id, title, expression, enabled, link_documents, position";

const INSTANCE_COLUMNS: &str = "id, definition_id, value, parent_id";

/// SQLite index store.
///
/// Uses WAL mode for concurrent access across processes and
/// `Arc<Mutex<Connection>>` for thread safety within a process. Every
/// mutation runs in an IMMEDIATE transaction.
pub struct SqliteIndexStore {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIndexStore {
    /// Create or open a store at the given path.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| DocIndexError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        debug!("Opened index store at {}", db_path.display());

        Ok(Self {
            db_path: Some(db_path),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Database path, or `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA foreign_keys=ON;",
            StoreConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS index_definitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER REFERENCES index_definitions(id) ON DELETE CASCADE,
                title TEXT NOT NULL DEFAULT '',
                expression TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                link_documents INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_definitions_parent
                ON index_definitions(parent_id, position, id);

            CREATE TABLE IF NOT EXISTS index_instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                definition_id INTEGER NOT NULL
                    REFERENCES index_definitions(id) ON DELETE CASCADE,
                value TEXT NOT NULL,
                parent_id INTEGER REFERENCES index_instances(id) ON DELETE CASCADE
            );

            -- NULL parents must collide too, hence IFNULL.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_instances_key
                ON index_instances(definition_id, value, IFNULL(parent_id, 0));

            CREATE INDEX IF NOT EXISTS idx_instances_parent
                ON index_instances(parent_id);

            CREATE TABLE IF NOT EXISTS index_instance_documents (
                instance_id INTEGER NOT NULL
                    REFERENCES index_instances(id) ON DELETE CASCADE,
                document_id TEXT NOT NULL,
                PRIMARY KEY (instance_id, document_id)
            );

            CREATE INDEX IF NOT EXISTS idx_instance_documents_document
                ON index_instance_documents(document_id);",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DocIndexError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    fn row_to_definition(row: &Row) -> rusqlite::Result<IndexDefinition> {
        Ok(IndexDefinition {
            id: DefinitionId(row.get(0)?),
            parent: row.get::<_, Option<i64>>(1)?.map(DefinitionId),
            title: row.get(2)?,
            expression: row.get(3)?,
            enabled: row.get(4)?,
            link_documents: row.get(5)?,
            position: row.get(6)?,
        })
    }

    fn row_to_instance(row: &Row) -> rusqlite::Result<IndexInstance> {
        Ok(IndexInstance {
            id: InstanceId(row.get(0)?),
            definition: DefinitionId(row.get(1)?),
            value: row.get(2)?,
            parent: row.get::<_, Option<i64>>(3)?.map(InstanceId),
        })
    }

    fn definition_exists(conn: &Connection, id: DefinitionId) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM index_definitions WHERE id = ?1",
                params![id.0],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn instance_exists(conn: &Connection, id: InstanceId) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM index_instances WHERE id = ?1",
                params![id.0],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn query_definitions(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<IndexDefinition>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_definition)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_instances(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<IndexInstance>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_instance)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl IndexStore for SqliteIndexStore {
    fn create_definition(&self, new: &NewIndexDefinition) -> Result<IndexDefinition> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(parent) = new.parent {
            if !Self::definition_exists(&tx, parent)? {
                return Err(DocIndexError::DefinitionNotFound { id: parent.0 });
            }
        }

        tx.execute(
            "INSERT INTO index_definitions
                 (parent_id, title, expression, enabled, link_documents, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.parent.map(|p| p.0),
                new.title,
                new.expression,
                new.enabled,
                new.link_documents,
                new.position,
            ],
        )?;
        let id = DefinitionId(tx.last_insert_rowid());
        tx.commit()?;

        debug!("Created index definition {}: {}", id, new.expression);

        Ok(IndexDefinition {
            id,
            parent: new.parent,
            title: new.title.clone(),
            expression: new.expression.clone(),
            enabled: new.enabled,
            link_documents: new.link_documents,
            position: new.position,
        })
    }

    fn get_definition(&self, id: DefinitionId) -> Result<Option<IndexDefinition>> {
        let conn = self.lock_conn()?;
        let definition = conn
            .query_row(
                &format!("SELECT {} FROM index_definitions WHERE id = ?1", DEFINITION_COLUMNS),
                params![id.0],
                Self::row_to_definition,
            )
            .optional()?;
        Ok(definition)
    }

    fn set_definition_enabled(&self, id: DefinitionId, enabled: bool) -> Result<()> {
        let conn = self.lock_conn()?;
        let rows = conn.execute(
            "UPDATE index_definitions SET enabled = ?1 WHERE id = ?2",
            params![enabled, id.0],
        )?;
        if rows == 0 {
            return Err(DocIndexError::DefinitionNotFound { id: id.0 });
        }
        Ok(())
    }

    fn delete_definition(&self, id: DefinitionId) -> Result<bool> {
        let conn = self.lock_conn()?;
        let rows = conn.execute("DELETE FROM index_definitions WHERE id = ?1", params![id.0])?;
        if rows > 0 {
            debug!("Deleted index definition {}", id);
        }
        Ok(rows > 0)
    }

    fn root_definitions(&self) -> Result<Vec<IndexDefinition>> {
        let conn = self.lock_conn()?;
        Self::query_definitions(
            &conn,
            &format!(
                "SELECT {} FROM index_definitions WHERE parent_id IS NULL ORDER BY position, id",
                DEFINITION_COLUMNS
            ),
            [],
        )
    }

    fn child_definitions(&self, parent: DefinitionId) -> Result<Vec<IndexDefinition>> {
        let conn = self.lock_conn()?;
        Self::query_definitions(
            &conn,
            &format!(
                "SELECT {} FROM index_definitions WHERE parent_id = ?1 ORDER BY position, id",
                DEFINITION_COLUMNS
            ),
            params![parent.0],
        )
    }

    fn resolve_or_create(
        &self,
        definition: DefinitionId,
        value: &str,
        parent: Option<InstanceId>,
    ) -> Result<(IndexInstance, bool)> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                &format!(
                    "SELECT {} FROM index_instances
                     WHERE definition_id = ?1 AND value = ?2 AND parent_id IS ?3",
                    INSTANCE_COLUMNS
                ),
                params![definition.0, value, parent.map(|p| p.0)],
                Self::row_to_instance,
            )
            .optional()?;

        if let Some(instance) = existing {
            tx.commit()?;
            return Ok((instance, false));
        }

        if !Self::definition_exists(&tx, definition)? {
            return Err(DocIndexError::DefinitionNotFound { id: definition.0 });
        }
        if let Some(parent) = parent {
            if !Self::instance_exists(&tx, parent)? {
                return Err(DocIndexError::InstanceNotFound { id: parent.0 });
            }
        }

        tx.execute(
            "INSERT INTO index_instances (definition_id, value, parent_id) VALUES (?1, ?2, ?3)",
            params![definition.0, value, parent.map(|p| p.0)],
        )?;
        let instance = IndexInstance {
            id: InstanceId(tx.last_insert_rowid()),
            definition,
            value: value.to_string(),
            parent,
        };
        tx.commit()?;

        debug!(
            "Created index instance {} ({}, {:?}, {:?})",
            instance.id, definition, value, parent
        );
        Ok((instance, true))
    }

    fn get_instance(&self, id: InstanceId) -> Result<Option<IndexInstance>> {
        let conn = self.lock_conn()?;
        let instance = conn
            .query_row(
                &format!("SELECT {} FROM index_instances WHERE id = ?1", INSTANCE_COLUMNS),
                params![id.0],
                Self::row_to_instance,
            )
            .optional()?;
        Ok(instance)
    }

    fn child_instances(&self, parent: Option<InstanceId>) -> Result<Vec<IndexInstance>> {
        let conn = self.lock_conn()?;
        Self::query_instances(
            &conn,
            &format!(
                "SELECT {} FROM index_instances WHERE parent_id IS ?1 ORDER BY value, id",
                INSTANCE_COLUMNS
            ),
            params![parent.map(|p| p.0)],
        )
    }

    fn list_instances(&self) -> Result<Vec<IndexInstance>> {
        let conn = self.lock_conn()?;
        // Parents are always inserted before their children.
        Self::query_instances(
            &conn,
            &format!("SELECT {} FROM index_instances ORDER BY id", INSTANCE_COLUMNS),
            [],
        )
    }

    fn link_document(&self, instance: InstanceId, document: &DocumentId) -> Result<bool> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !Self::instance_exists(&tx, instance)? {
            return Err(DocIndexError::InstanceNotFound { id: instance.0 });
        }
        let rows = tx.execute(
            "INSERT OR IGNORE INTO index_instance_documents (instance_id, document_id)
             VALUES (?1, ?2)",
            params![instance.0, document.as_str()],
        )?;
        tx.commit()?;

        Ok(rows > 0)
    }

    fn instance_documents(&self, instance: InstanceId) -> Result<Vec<DocumentId>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT document_id FROM index_instance_documents
             WHERE instance_id = ?1 ORDER BY document_id",
        )?;
        let rows = stmt.query_map(params![instance.0], |row| row.get::<_, String>(0).map(DocumentId))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn document_instances(&self, document: &DocumentId) -> Result<Vec<IndexInstance>> {
        let conn = self.lock_conn()?;
        Self::query_instances(
            &conn,
            "SELECT i.id, i.definition_id, i.value, i.parent_id
             FROM index_instances i
             JOIN index_instance_documents d ON d.instance_id = i.id
             WHERE d.document_id = ?1
             ORDER BY i.id",
            params![document.as_str()],
        )
    }

    fn detach_and_prune(
        &self,
        instance: InstanceId,
        document: &DocumentId,
    ) -> Result<DetachOutcome> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let parent = tx
            .query_row(
                "SELECT parent_id FROM index_instances WHERE id = ?1",
                params![instance.0],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .ok_or(DocIndexError::InstanceNotFound { id: instance.0 })?
            .map(InstanceId);

        tx.execute(
            "DELETE FROM index_instance_documents WHERE instance_id = ?1 AND document_id = ?2",
            params![instance.0, document.as_str()],
        )?;

        let documents: i64 = tx.query_row(
            "SELECT COUNT(*) FROM index_instance_documents WHERE instance_id = ?1",
            params![instance.0],
            |row| row.get(0),
        )?;
        let children: i64 = tx.query_row(
            "SELECT COUNT(*) FROM index_instances WHERE parent_id = ?1",
            params![instance.0],
            |row| row.get(0),
        )?;

        let outcome = if documents == 0 && children == 0 {
            tx.execute("DELETE FROM index_instances WHERE id = ?1", params![instance.0])?;
            DetachOutcome::Deleted { parent }
        } else {
            DetachOutcome::Retained
        };
        tx.commit()?;

        if let DetachOutcome::Deleted { .. } = outcome {
            debug!("Pruned empty index instance {}", instance);
        }
        Ok(outcome)
    }

    fn clear_instances(&self) -> Result<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM index_instance_documents", [])?;
        let removed = tx.execute("DELETE FROM index_instances", [])?;
        tx.commit()?;
        Ok(removed)
    }
}
