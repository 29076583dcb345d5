//! Repository for the per-document OCR text record.

use rusqlite::{params, OptionalExtension, Row};

use crate::pipeline::OcrStatus;

use super::{corrupt_status, now_rfc3339, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct DocumentTextRow {
    pub id: String,
    pub document_id: String,
    pub extracted_text: Option<String>,
    pub ocr_status: OcrStatus,
    pub error_message: Option<String>,
    pub processed_at: Option<String>,
}

impl DocumentTextRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("ocr_status")?;
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            extracted_text: row.get("extracted_text")?,
            ocr_status: OcrStatus::parse(&status)
                .ok_or_else(|| corrupt_status("ocr_status", &status))?,
            error_message: row.get("error_message")?,
            processed_at: row.get("processed_at")?,
        })
    }
}

pub fn find_by_document(
    db: &Database,
    document_id: &str,
) -> Result<Option<DocumentTextRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM document_texts WHERE document_id = ?1",
                params![document_id],
                DocumentTextRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Returns the existing text record for the document, creating a
/// pending one if none exists.
pub fn find_or_create(db: &Database, document_id: &str) -> Result<DocumentTextRow, DatabaseError> {
    if let Some(existing) = find_by_document(db, document_id)? {
        return Ok(existing);
    }
    let row = DocumentTextRow {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        extracted_text: None,
        ocr_status: OcrStatus::Pending,
        error_message: None,
        processed_at: None,
    };
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO document_texts (id, document_id, ocr_status) VALUES (?1, ?2, ?3)",
            params![row.id, row.document_id, row.ocr_status.as_str()],
        )?;
        Ok(())
    })?;
    Ok(row)
}

pub fn mark_processing(db: &Database, id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_texts SET ocr_status = ?2 WHERE id = ?1",
            params![id, OcrStatus::Processing.as_str()],
        )?;
        Ok(())
    })
}

pub fn mark_completed(db: &Database, id: &str, text: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_texts SET extracted_text = ?2, ocr_status = ?3,
             error_message = NULL, processed_at = ?4
             WHERE id = ?1",
            params![id, text, OcrStatus::Completed.as_str(), now_rfc3339()],
        )?;
        Ok(())
    })
}

pub fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_texts SET ocr_status = ?2, error_message = ?3, processed_at = ?4
             WHERE id = ?1",
            params![id, OcrStatus::Failed.as_str(), error, now_rfc3339()],
        )?;
        Ok(())
    })
}
