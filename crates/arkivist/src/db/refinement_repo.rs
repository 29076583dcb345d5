//! Repository for the per-document AI refinement record.

use rusqlite::{params, OptionalExtension, Row};

use crate::pipeline::RefinementStatus;

use super::{corrupt_status, now_rfc3339, Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct RefinementRow {
    pub id: String,
    pub document_id: String,
    /// JSON-encoded structured fields extracted by the model.
    pub structured_data: Option<String>,
    /// Percentage scale, 0.0 to 100.0.
    pub confidence_score: Option<f64>,
    pub raw_response: Option<String>,
    pub refinement_status: RefinementStatus,
    pub error_message: Option<String>,
    pub processed_at: Option<String>,
}

impl RefinementRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("refinement_status")?;
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            structured_data: row.get("structured_data")?,
            confidence_score: row.get("confidence_score")?,
            raw_response: row.get("raw_response")?,
            refinement_status: RefinementStatus::parse(&status)
                .ok_or_else(|| corrupt_status("refinement_status", &status))?,
            error_message: row.get("error_message")?,
            processed_at: row.get("processed_at")?,
        })
    }
}

pub fn find_by_document(
    db: &Database,
    document_id: &str,
) -> Result<Option<RefinementRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM document_refinements WHERE document_id = ?1",
                params![document_id],
                RefinementRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn find_or_create(db: &Database, document_id: &str) -> Result<RefinementRow, DatabaseError> {
    if let Some(existing) = find_by_document(db, document_id)? {
        return Ok(existing);
    }
    let row = RefinementRow {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        structured_data: None,
        confidence_score: None,
        raw_response: None,
        refinement_status: RefinementStatus::Pending,
        error_message: None,
        processed_at: None,
    };
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO document_refinements (id, document_id, refinement_status)
             VALUES (?1, ?2, ?3)",
            params![row.id, row.document_id, row.refinement_status.as_str()],
        )?;
        Ok(())
    })?;
    Ok(row)
}

pub fn mark_processing(db: &Database, id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_refinements SET refinement_status = ?2 WHERE id = ?1",
            params![id, RefinementStatus::Processing.as_str()],
        )?;
        Ok(())
    })
}

pub fn mark_completed(
    db: &Database,
    id: &str,
    structured_json: &str,
    confidence: Option<f64>,
    raw_response: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_refinements SET structured_data = ?2, confidence_score = ?3,
             raw_response = ?4, refinement_status = ?5, error_message = NULL, processed_at = ?6
             WHERE id = ?1",
            params![
                id,
                structured_json,
                confidence,
                raw_response,
                RefinementStatus::Completed.as_str(),
                now_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

pub fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE document_refinements SET refinement_status = ?2, error_message = ?3,
             processed_at = ?4
             WHERE id = ?1",
            params![id, RefinementStatus::Failed.as_str(), error, now_rfc3339()],
        )?;
        Ok(())
    })
}

/// True when the document has a refinement record in the completed state.
pub fn has_completed(db: &Database, document_id: &str) -> Result<bool, DatabaseError> {
    Ok(find_by_document(db, document_id)?
        .map(|r| r.refinement_status == RefinementStatus::Completed)
        .unwrap_or(false))
}
