//! Sqlite-backed data store
//!
//! Implements the `DataStore` interface the orchestrators program against.
//! Embeddings are stored as little-endian f32 BLOBs and nearest-neighbor
//! search is cosine similarity computed in-process over the document-scoped,
//! owner-scoped candidate rows. Document-sized corpora stay small enough that
//! a linear scan per question is fine.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::data_store::{DataStore, MatchedChunk};
use crate::types::conversation::{Citation, Conversation, Message, MessageRole};
use crate::types::document::{Chunk, Document, DocumentStatus, DocumentSummary};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    name          TEXT NOT NULL,
    mime_type     TEXT NOT NULL,
    size_bytes    INTEGER NOT NULL,
    status        TEXT NOT NULL,
    error_message TEXT,
    storage_path  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id, created_at);

CREATE TABLE IF NOT EXISTS document_chunks (
    id          TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id),
    content     TEXT NOT NULL,
    embedding   BLOB NOT NULL,
    chunk_index INTEGER NOT NULL,
    UNIQUE(document_id, chunk_index)
);
CREATE INDEX IF NOT EXISTS idx_chunks_document ON document_chunks(document_id);

CREATE TABLE IF NOT EXISTS document_summaries (
    id          TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id),
    model       TEXT NOT NULL,
    summary     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversations (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    title      TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    role            TEXT NOT NULL,
    content         TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at);

CREATE TABLE IF NOT EXISTS citations (
    id          TEXT PRIMARY KEY,
    message_id  TEXT NOT NULL REFERENCES messages(id),
    document_id TEXT NOT NULL,
    chunk_id    TEXT NOT NULL,
    start_char  INTEGER NOT NULL,
    end_char    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_citations_message ON citations(message_id);
"#;

/// Embedded sqlite store
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at a path and run migrations
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("failed to create data dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database; used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
        Ok(Document {
            id: parse_uuid(row, 0)?,
            user_id: parse_uuid(row, 1)?,
            name: row.get(2)?,
            mime_type: row.get(3)?,
            size_bytes: row.get::<_, i64>(4)? as u64,
            status: DocumentStatus::parse(&row.get::<_, String>(5)?)
                .unwrap_or(DocumentStatus::Failed),
            error_message: row.get(6)?,
            storage_path: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, user_id, name, mime_type, size_bytes, status, error_message, storage_path, created_at, updated_at";

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Encode an embedding as a little-endian f32 blob
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 blob back into an embedding
fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; 0.0 when either vector has zero norm or the
/// dimensionalities disagree
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl DataStore for Database {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents (id, user_id, name, mime_type, size_bytes, status, error_message, storage_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                document.id.to_string(),
                document.user_id.to_string(),
                document.name,
                document.mime_type,
                document.size_bytes as i64,
                document.status.as_str(),
                document.error_message,
                document.storage_path,
                document.created_at,
                document.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let doc = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                params![id.to_string()],
                Self::row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    async fn get_document_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let doc = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), user_id.to_string()],
                Self::row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    async fn list_documents(
        &self,
        user_id: Uuid,
        status: Option<DocumentStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Document>, usize)> {
        let conn = self.conn.lock();
        let (documents, count) = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents
                     WHERE user_id = ?1 AND status = ?2
                     ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
                ))?;
                let docs = stmt
                    .query_map(
                        params![
                            user_id.to_string(),
                            status.as_str(),
                            limit as i64,
                            offset as i64
                        ],
                        Self::row_to_document,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE user_id = ?1 AND status = ?2",
                    params![user_id.to_string(), status.as_str()],
                    |row| row.get(0),
                )?;
                (docs, count as usize)
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents
                     WHERE user_id = ?1
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                ))?;
                let docs = stmt
                    .query_map(
                        params![user_id.to_string(), limit as i64, offset as i64],
                        Self::row_to_document,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE user_id = ?1",
                    params![user_id.to_string()],
                    |row| row.get(0),
                )?;
                (docs, count as usize)
            }
        };
        Ok((documents, count))
    }

    async fn try_transition_status(
        &self,
        id: Uuid,
        from: &[DocumentStatus],
        to: DocumentStatus,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let placeholders = from.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "UPDATE documents SET status = ?, updated_at = ? WHERE id = ? AND status IN ({placeholders})"
        );
        let now = Utc::now();
        let id_str = id.to_string();
        let to_str = to.as_str();
        let mut values: Vec<&dyn rusqlite::ToSql> = vec![&to_str, &now, &id_str];
        let from_strs: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        for status in &from_strs {
            values.push(status);
        }
        let changed = conn.execute(&sql, &values[..])?;
        Ok(changed == 1)
    }

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE documents SET status = ?1, error_message = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.as_str(), error_message, Utc::now(), id.to_string()],
        )?;
        Ok(())
    }

    async fn update_document(
        &self,
        id: Uuid,
        user_id: Uuid,
        name: Option<&str>,
        status: Option<DocumentStatus>,
    ) -> Result<Option<Document>> {
        {
            let conn = self.conn.lock();
            if let Some(name) = name {
                conn.execute(
                    "UPDATE documents SET name = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                    params![name, Utc::now(), id.to_string(), user_id.to_string()],
                )?;
            }
            if let Some(status) = status {
                conn.execute(
                    "UPDATE documents SET status = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                    params![status.as_str(), Utc::now(), id.to_string(), user_id.to_string()],
                )?;
            }
        }
        self.get_document_owned(id, user_id).await
    }

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO document_chunks (id, document_id, content, embedding, chunk_index)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chunk.id.to_string(),
                chunk.document_id.to_string(),
                chunk.content,
                embedding_to_blob(&chunk.embedding),
                chunk.chunk_index,
            ],
        )?;
        Ok(())
    }

    async fn delete_chunks_for_document(&self, document_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM document_chunks WHERE document_id = ?1",
            params![document_id.to_string()],
        )?;
        Ok(deleted)
    }

    async fn count_chunks(&self, document_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM document_chunks WHERE document_id = ?1",
            params![document_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn match_chunks(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        query_embedding: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<MatchedChunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.document_id, c.content, c.embedding, c.chunk_index
             FROM document_chunks c
             JOIN documents d ON d.id = c.document_id
             WHERE c.document_id = ?1 AND d.user_id = ?2",
        )?;

        let mut matches: Vec<MatchedChunk> = stmt
            .query_map(
                params![document_id.to_string(), user_id.to_string()],
                |row| {
                    let embedding = blob_to_embedding(&row.get::<_, Vec<u8>>(3)?);
                    Ok(MatchedChunk {
                        id: parse_uuid(row, 0)?,
                        document_id: parse_uuid(row, 1)?,
                        content: row.get(2)?,
                        chunk_index: row.get(4)?,
                        similarity: cosine_similarity(query_embedding, &embedding),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        matches.retain(|m| m.similarity >= threshold);
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        matches.truncate(count);
        Ok(matches)
    }

    async fn insert_summary(&self, summary: &DocumentSummary) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO document_summaries (id, document_id, model, summary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                summary.id.to_string(),
                summary.document_id.to_string(),
                summary.model,
                summary.summary,
                summary.created_at,
            ],
        )?;
        Ok(())
    }

    async fn latest_summary(&self, document_id: Uuid) -> Result<Option<DocumentSummary>> {
        let conn = self.conn.lock();
        let summary = conn
            .query_row(
                "SELECT id, document_id, model, summary, created_at
                 FROM document_summaries WHERE document_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![document_id.to_string()],
                |row| {
                    Ok(DocumentSummary {
                        id: parse_uuid(row, 0)?,
                        document_id: parse_uuid(row, 1)?,
                        model: row.get(2)?,
                        summary: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                conversation.id.to_string(),
                conversation.user_id.to_string(),
                conversation.title,
                conversation.created_at,
                conversation.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn get_conversation_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>> {
        let conn = self.conn.lock();
        let conversation = conn
            .query_row(
                "SELECT id, user_id, title, created_at, updated_at
                 FROM conversations WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
                |row| {
                    Ok(Conversation {
                        id: parse_uuid(row, 0)?,
                        user_id: parse_uuid(row, 1)?,
                        title: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(conversation)
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.role.as_str(),
                message.content,
                message.created_at,
            ],
        )?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let messages = stmt
            .query_map(params![conversation_id.to_string()], |row| {
                Ok(Message {
                    id: parse_uuid(row, 0)?,
                    conversation_id: parse_uuid(row, 1)?,
                    role: MessageRole::parse(&row.get::<_, String>(2)?)
                        .unwrap_or(MessageRole::User),
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    async fn insert_citations(&self, citations: &[Citation]) -> Result<()> {
        let conn = self.conn.lock();
        for citation in citations {
            conn.execute(
                "INSERT INTO citations (id, message_id, document_id, chunk_id, start_char, end_char)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    citation.id.to_string(),
                    citation.message_id.to_string(),
                    citation.document_id.to_string(),
                    citation.chunk_id.to_string(),
                    citation.start_char as i64,
                    citation.end_char as i64,
                ],
            )?;
        }
        Ok(())
    }

    async fn list_citations_for_message(&self, message_id: Uuid) -> Result<Vec<Citation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, message_id, document_id, chunk_id, start_char, end_char
             FROM citations WHERE message_id = ?1 ORDER BY rowid ASC",
        )?;
        let citations = stmt
            .query_map(params![message_id.to_string()], |row| {
                Ok(Citation {
                    id: parse_uuid(row, 0)?,
                    message_id: parse_uuid(row, 1)?,
                    document_id: parse_uuid(row, 2)?,
                    chunk_id: parse_uuid(row, 3)?,
                    start_char: row.get::<_, i64>(4)? as usize,
                    end_char: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(citations)
    }
}
