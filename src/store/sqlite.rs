// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-based vector store.
//!
//! Embeddings are stored as little-endian `f32` BLOBs and scored by brute
//! force in Rust. Writes land in a pending table and only move into the
//! searchable `documents` table on [`refresh`](VectorStore::refresh), which
//! mirrors how buffering search engines expose bulk writes.

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{
    compare_keys, BulkReport, Document, DocumentFailure, IndexInfo, IndexSchema, ScoredHit, ScoredQuery,
    VectorStore,
};
use crate::errors::StoreError;

/// SQLite-backed [`VectorStore`].
///
/// Stores data in `.semdex/store.sqlite` by default.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Returns the path to the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initializes the database schema if it does not exist.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS indices (
                name TEXT PRIMARY KEY,
                schema TEXT NOT NULL,
                dims INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                index_name TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                title TEXT NOT NULL,
                text TEXT NOT NULL,
                link TEXT NOT NULL,
                embedding BLOB NOT NULL,
                indexed_at INTEGER NOT NULL,
                PRIMARY KEY (index_name, doc_id)
            );

            CREATE TABLE IF NOT EXISTS pending_documents (
                index_name TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                title TEXT NOT NULL,
                text TEXT NOT NULL,
                link TEXT NOT NULL,
                embedding BLOB NOT NULL,
                indexed_at INTEGER NOT NULL,
                PRIMARY KEY (index_name, doc_id)
            );

            CREATE TABLE IF NOT EXISTS index_meta (
                index_name TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (index_name, key)
            );
            "#,
        )?;
        Ok(())
    }

    fn set_meta(tx: &Transaction<'_>, index: &str, key: &str, value: &str) -> Result<(), StoreError> {
        tx.execute(
            r#"
            INSERT INTO index_meta (index_name, key, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(index_name, key) DO UPDATE SET value = excluded.value
            "#,
            params![index, key, value],
        )?;
        Ok(())
    }

    /// Declared vector dimension of `index`.
    fn index_dims(conn: &Connection, index: &str) -> Result<usize, StoreError> {
        let dims: Option<i64> = conn
            .query_row(
                "SELECT dims FROM indices WHERE name = ?1",
                params![index],
                |row| row.get(0),
            )
            .optional()?;
        dims.map(|d| d as usize)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))
    }

    fn write_pending(
        conn: &Connection,
        index: &str,
        document: &Document,
        indexed_at: i64,
    ) -> Result<(), StoreError> {
        conn.execute(
            r#"
            INSERT INTO pending_documents (index_name, doc_id, title, text, link, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(index_name, doc_id) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                link = excluded.link,
                embedding = excluded.embedding,
                indexed_at = excluded.indexed_at
            "#,
            params![
                index,
                document.id,
                document.title,
                document.text,
                document.link,
                embedding_to_blob(&document.embedding),
                indexed_at
            ],
        )?;
        Ok(())
    }

    fn check_dims(expected: usize, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
        let embedding_blob: Vec<u8> = row.get(4)?;
        Ok(Document {
            id: row.get(0)?,
            title: row.get(1)?,
            text: row.get(2)?,
            link: row.get(3)?,
            embedding: blob_to_embedding(&embedding_blob),
        })
    }
}

impl VectorStore for SqliteStore {
    fn index_exists(&self, name: &str) -> Result<bool, StoreError> {
        let found: Option<String> = self
            .conn()
            .query_row(
                "SELECT name FROM indices WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_index(&self, name: &str, schema: &IndexSchema) -> Result<(), StoreError> {
        let dims = schema.vector_dims().ok_or_else(|| {
            StoreError::InvalidSchema("schema declares no dense_vector field".to_string())
        })?;
        if dims == 0 {
            return Err(StoreError::InvalidSchema(
                "dense_vector dims must be greater than 0".to_string(),
            ));
        }
        let schema_json = serde_json::to_string(schema)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO indices (name, schema, dims, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, schema_json, dims as i64, now_secs()],
        )?;
        if inserted == 0 {
            return Err(StoreError::IndexExists(name.to_string()));
        }
        tx.commit()?;

        tracing::debug!(index = name, dims, "created index");
        Ok(())
    }

    fn delete_index(&self, name: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM indices WHERE name = ?1", params![name])?;
        if deleted == 0 {
            return Err(StoreError::IndexNotFound(name.to_string()));
        }
        tx.execute("DELETE FROM documents WHERE index_name = ?1", params![name])?;
        tx.execute(
            "DELETE FROM pending_documents WHERE index_name = ?1",
            params![name],
        )?;
        tx.execute("DELETE FROM index_meta WHERE index_name = ?1", params![name])?;
        tx.commit()?;

        tracing::debug!(index = name, "deleted index");
        Ok(())
    }

    fn index_document(&self, name: &str, document: &Document) -> Result<(), StoreError> {
        let conn = self.conn();
        let dims = Self::index_dims(&conn, name)?;
        Self::check_dims(dims, &document.embedding)?;
        Self::write_pending(&conn, name, document, now_secs())
    }

    fn bulk_index(&self, name: &str, documents: &[Document]) -> Result<BulkReport, StoreError> {
        let mut conn = self.conn();
        let dims = Self::index_dims(&conn, name)?;
        let indexed_at = now_secs();
        let mut report = BulkReport::default();

        let mut tx = conn.transaction()?;
        for document in documents {
            if let Err(err) = Self::check_dims(dims, &document.embedding) {
                report.failed.push(DocumentFailure {
                    id: document.id.clone(),
                    reason: err.to_string(),
                });
                continue;
            }

            // A failed document rolls back only its own savepoint.
            let sp = tx.savepoint()?;
            match Self::write_pending(&sp, name, document, indexed_at) {
                Ok(()) => {
                    sp.commit()?;
                    report.indexed += 1;
                }
                Err(err) => {
                    drop(sp);
                    report.failed.push(DocumentFailure {
                        id: document.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        tx.commit()?;

        Ok(report)
    }

    fn refresh(&self, name: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        Self::index_dims(&conn, name)?;

        let tx = conn.transaction()?;
        let moved = tx.execute(
            r#"
            INSERT INTO documents (index_name, doc_id, title, text, link, embedding, indexed_at)
            SELECT index_name, doc_id, title, text, link, embedding, indexed_at
            FROM pending_documents
            WHERE index_name = ?1
            ON CONFLICT(index_name, doc_id) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                link = excluded.link,
                embedding = excluded.embedding,
                indexed_at = excluded.indexed_at
            "#,
            params![name],
        )?;
        tx.execute(
            "DELETE FROM pending_documents WHERE index_name = ?1",
            params![name],
        )?;
        Self::set_meta(&tx, name, "last_refresh", &now_secs().to_string())?;
        tx.commit()?;

        tracing::debug!(index = name, moved, "refreshed index");
        Ok(())
    }

    fn scored_query(&self, name: &str, query: &ScoredQuery) -> Result<Vec<ScoredHit>, StoreError> {
        let conn = self.conn();
        let dims = Self::index_dims(&conn, name)?;
        Self::check_dims(dims, &query.query_vector)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT doc_id, title, text, link, embedding
            FROM documents
            WHERE index_name = ?1
            "#,
        )?;

        let mut hits = stmt
            .query_map(params![name], Self::row_to_document)?
            .map(|row| {
                row.map(|document| ScoredHit {
                    score: query.expression.score(&query.query_vector, &document.embedding),
                    document,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Highest score first; ties fall back to ascending document key.
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| compare_keys(&a.document.id, &b.document.id))
        });
        hits.truncate(query.top_k);

        Ok(hits)
    }

    fn get_document(&self, name: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.conn();
        Self::index_dims(&conn, name)?;
        let document = conn
            .query_row(
                r#"
                SELECT doc_id, title, text, link, embedding
                FROM documents
                WHERE index_name = ?1 AND doc_id = ?2
                "#,
                params![name, id],
                Self::row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    fn count(&self, name: &str) -> Result<u64, StoreError> {
        let conn = self.conn();
        Self::index_dims(&conn, name)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE index_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn index_info(&self, name: &str) -> Result<Option<IndexInfo>, StoreError> {
        let conn = self.conn();
        let header: Option<(i64, i64)> = conn
            .query_row(
                "SELECT dims, created_at FROM indices WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((dims, created_at)) = header else {
            return Ok(None);
        };

        let document_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE index_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        let pending_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pending_documents WHERE index_name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        let last_refresh: Option<String> = conn
            .query_row(
                "SELECT value FROM index_meta WHERE index_name = ?1 AND key = 'last_refresh'",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(Some(IndexInfo {
            name: name.to_string(),
            dims: dims as usize,
            document_count: document_count as u64,
            pending_count: pending_count as u64,
            created_at,
            last_refresh: last_refresh.and_then(|v| v.parse().ok()),
        }))
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Converts an embedding vector to a compact blob.
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Converts a blob back to an embedding vector.
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
