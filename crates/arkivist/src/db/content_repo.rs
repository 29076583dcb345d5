//! Repository for per-page document contents.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct DocumentContentRow {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub page_number: i64,
}

impl DocumentContentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            content: row.get("content")?,
            page_number: row.get("page_number")?,
        })
    }
}

/// Replaces all content rows for a document with the given pages,
/// numbered from 1, in a single transaction.
pub fn replace_for_document(
    db: &Database,
    document_id: &str,
    pages: &[String],
) -> Result<Vec<DocumentContentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM document_contents WHERE document_id = ?1",
            params![document_id],
        )?;
        let mut rows = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let row = DocumentContentRow {
                id: uuid::Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                content: page.clone(),
                page_number: index as i64 + 1,
            };
            tx.execute(
                "INSERT INTO document_contents (id, document_id, content, page_number)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row.id, row.document_id, row.content, row.page_number],
            )?;
            rows.push(row);
        }
        tx.commit()?;
        Ok(rows)
    })
}

pub fn list_for_document(
    db: &Database,
    document_id: &str,
) -> Result<Vec<DocumentContentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM document_contents WHERE document_id = ?1 ORDER BY page_number",
        )?;
        let rows = stmt
            .query_map(params![document_id], DocumentContentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count_for_document(db: &Database, document_id: &str) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM document_contents WHERE document_id = ?1",
            params![document_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
