//! SQLite-backed storage for chunk embeddings.
//!
//! The `meta` table pins the embedding model and dimensions the vectors were
//! produced with; loading with a different embedding config is refused.

use crate::embeddings::EmbeddingConfig;
use crate::types::Chunk;
use legal_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Initialize the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            chunk_json TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_order ON chunks(source_id, position);
        "#,
    )
    .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Record the embedding model and dimensions the index is built with.
pub fn write_meta(conn: &Connection, config: &EmbeddingConfig) -> AppResult<()> {
    for (key, value) in [
        ("model", config.model.clone()),
        ("dimensions", config.dimensions.to_string()),
    ] {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| AppError::Index(format!("Failed to write index meta: {}", e)))?;
    }
    Ok(())
}

/// Embedding model and dimensions recorded at build time, if any.
pub fn read_meta(conn: &Connection) -> AppResult<Option<(String, usize)>> {
    let get = |key: &str| -> AppResult<Option<String>> {
        conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| AppError::Index(format!("Failed to read index meta: {}", e)))
    };

    match (get("model")?, get("dimensions")?) {
        (Some(model), Some(dims)) => {
            let dims = dims
                .parse()
                .map_err(|_| AppError::Index(format!("Invalid dimensions in meta: {}", dims)))?;
            Ok(Some((model, dims)))
        }
        _ => Ok(None),
    }
}

/// Insert chunks with their embeddings in one transaction.
pub fn insert_chunks(conn: &mut Connection, rows: &[(Chunk, Vec<f32>)]) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO chunks (id, source_id, position, chunk_json, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| AppError::Index(format!("Failed to prepare insert: {}", e)))?;

        for (chunk, embedding) in rows {
            let chunk_json = serde_json::to_string(chunk)?;
            stmt.execute(params![
                chunk.id,
                chunk.source_id,
                chunk.position as i64,
                chunk_json,
                embedding_to_bytes(embedding),
            ])
            .map_err(|e| AppError::Index(format!("Failed to insert chunk: {}", e)))?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Index(format!("Failed to commit chunks: {}", e)))?;
    Ok(())
}

/// Every stored chunk and vector in corpus order.
pub fn load_rows(conn: &Connection) -> AppResult<Vec<(Chunk, Vec<f32>)>> {
    let mut stmt = conn
        .prepare("SELECT chunk_json, embedding FROM chunks ORDER BY source_id, position")
        .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })
        .map_err(|e| AppError::Index(format!("Failed to query chunks: {}", e)))?;

    let mut out = Vec::new();
    for row in rows {
        let (chunk_json, bytes) =
            row.map_err(|e| AppError::Index(format!("Failed to read row: {}", e)))?;
        let chunk: Chunk = serde_json::from_str(&chunk_json)?;
        out.push((chunk, bytes_to_embedding(&bytes)?));
    }

    Ok(out)
}

/// Number of stored vectors.
pub fn count_rows(conn: &Connection) -> AppResult<u32> {
    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| {
        row.get::<_, i64>(0).map(|v| v as u32)
    })
    .map_err(|e| AppError::Index(format!("Failed to count chunks: {}", e)))
}

/// Reset the index (delete all data).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM meta;")
        .map_err(|e| AppError::Index(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset dense index");
    Ok(())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chunk(id: &str, source: &str, position: u32) -> Chunk {
        Chunk {
            id: id.to_string(),
            source_id: source.to_string(),
            position,
            text: format!("текст {}", id),
            code_ru: String::new(),
            code_kz: String::new(),
            article_number: Some(position.to_string()),
            clause: None,
            overlap_chars: 0,
        }
    }

    #[test]
    fn test_init_index() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("nested/dense.sqlite")).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 2);
    }

    #[test]
    fn test_insert_and_load_in_corpus_order() {
        let temp = TempDir::new().unwrap();
        let mut conn = init_index(&temp.path().join("dense.sqlite")).unwrap();

        insert_chunks(
            &mut conn,
            &[
                (chunk("b", "tax_code", 1), vec![0.0, 1.0]),
                (chunk("a", "civil_code", 3), vec![1.0, 0.0]),
                (chunk("c", "tax_code", 0), vec![0.5, 0.5]),
            ],
        )
        .unwrap();

        let rows = load_rows(&conn).unwrap();
        let ids: Vec<_> = rows.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert_eq!(rows[0].1, vec![1.0, 0.0]);
        assert_eq!(count_rows(&conn).unwrap(), 3);
    }

    #[test]
    fn test_meta_round_trip_and_reset() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("dense.sqlite")).unwrap();
        assert_eq!(read_meta(&conn).unwrap(), None);

        write_meta(&conn, &EmbeddingConfig::default()).unwrap();
        assert_eq!(
            read_meta(&conn).unwrap(),
            Some(("trigram-v1".to_string(), 384))
        );

        reset_index(&conn).unwrap();
        assert_eq!(read_meta(&conn).unwrap(), None);
        assert_eq!(count_rows(&conn).unwrap(), 0);
    }

    #[test]
    fn test_bad_embedding_bytes() {
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
        assert_eq!(
            bytes_to_embedding(&embedding_to_bytes(&[1.5, -2.0])).unwrap(),
            vec![1.5, -2.0]
        );
    }
}
