//! Repository for per-page embedding vectors.
//!
//! Vectors are stored as little-endian f32 blobs against the content
//! row they were computed from.

use rusqlite::{params, OptionalExtension, Row};

use super::{now_rfc3339, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub id: String,
    pub document_content_id: String,
    pub vector: Vec<f32>,
    pub created_at: String,
}

impl EmbeddingRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let blob: Vec<u8> = row.get("vector")?;
        let vector = decode_vector(&blob).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                blob.len(),
                rusqlite::types::Type::Blob,
                Box::new(e),
            )
        })?;
        Ok(Self {
            id: row.get("id")?,
            document_content_id: row.get("document_content_id")?,
            vector,
            created_at: row.get("created_at")?,
        })
    }
}

/// Packs an f32 vector into a little-endian byte blob.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Unpacks a little-endian byte blob into an f32 vector.
pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>, DatabaseError> {
    if blob.len() % 4 != 0 {
        return Err(DatabaseError::CorruptVector(blob.len()));
    }
    let mut vector = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        vector.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(vector)
}

pub fn insert(
    db: &Database,
    document_content_id: &str,
    vector: &[f32],
) -> Result<EmbeddingRow, DatabaseError> {
    let row = EmbeddingRow {
        id: uuid::Uuid::new_v4().to_string(),
        document_content_id: document_content_id.to_string(),
        vector: vector.to_vec(),
        created_at: now_rfc3339(),
    };
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO document_embeddings (id, document_content_id, vector, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.id,
                row.document_content_id,
                encode_vector(&row.vector),
                row.created_at
            ],
        )?;
        Ok(())
    })?;
    Ok(row)
}

pub fn exists_for_content(
    db: &Database,
    document_content_id: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM document_embeddings WHERE document_content_id = ?1",
            params![document_content_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

pub fn find_by_content(
    db: &Database,
    document_content_id: &str,
) -> Result<Option<EmbeddingRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM document_embeddings WHERE document_content_id = ?1",
                params![document_content_id],
                EmbeddingRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::content_repo;
    use crate::db::document_repo::{self, DocumentRow};

    fn seed_content(db: &Database) -> String {
        let doc = DocumentRow::new(None, None);
        document_repo::insert(db, &doc).unwrap();
        let rows =
            content_repo::replace_for_document(db, &doc.id, &["page text".to_string()]).unwrap();
        rows[0].id.clone()
    }

    #[test]
    fn test_vector_blob_round_trip() {
        let vector = vec![0.0_f32, -1.5, 3.25, f32::MAX];
        let blob = encode_vector(&vector);
        assert_eq!(blob.len(), 16);
        assert_eq!(decode_vector(&blob).unwrap(), vector);
    }

    #[test]
    fn test_decode_rejects_truncated_blob() {
        let err = decode_vector(&[0u8, 1, 2]).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptVector(3)));
    }

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let content_id = seed_content(&db);

        assert!(!exists_for_content(&db, &content_id).unwrap());
        let vector: Vec<f32> = (0..8).map(|i| i as f32 * 0.5).collect();
        insert(&db, &content_id, &vector).unwrap();

        assert!(exists_for_content(&db, &content_id).unwrap());
        let found = find_by_content(&db, &content_id).unwrap().unwrap();
        assert_eq!(found.vector, vector);
    }

    #[test]
    fn test_unique_per_content() {
        let db = Database::open_in_memory().unwrap();
        let content_id = seed_content(&db);

        insert(&db, &content_id, &[1.0]).unwrap();
        assert!(insert(&db, &content_id, &[2.0]).is_err());
    }

    #[test]
    fn test_cascade_on_content_replace() {
        let db = Database::open_in_memory().unwrap();
        let doc = DocumentRow::new(None, None);
        document_repo::insert(&db, &doc).unwrap();
        let rows =
            content_repo::replace_for_document(&db, &doc.id, &["page".to_string()]).unwrap();
        insert(&db, &rows[0].id, &[1.0, 2.0]).unwrap();

        content_repo::replace_for_document(&db, &doc.id, &["new page".to_string()]).unwrap();
        assert!(!exists_for_content(&db, &rows[0].id).unwrap());
    }
}
