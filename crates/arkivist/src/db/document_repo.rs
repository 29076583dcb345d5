//! Document repository — CRUD and pipeline-status updates for the
//! `documents` table.

use std::fmt;

use rusqlite::{params, OptionalExtension, Row};

use crate::pipeline::PipelineStatus;

use super::{corrupt_status, now_rfc3339, Database, DatabaseError};

/// Completeness of the physical student file, independent of the
/// pipeline status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStatus {
    Draft,
    Incomplete,
    Complete,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Draft => "draft",
            FileStatus::Incomplete => "incomplete",
            FileStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(FileStatus::Draft),
            "incomplete" => Some(FileStatus::Incomplete),
            "complete" => Some(FileStatus::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document row.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub file_number: Option<String>,
    pub file_status: FileStatus,
    /// Path of the stored binary, relative to the media root. Owned by
    /// the media collaborator; the pipeline only reads it.
    pub file_path: Option<String>,
    pub pipeline_status: PipelineStatus,
    pub pipeline_error: Option<String>,
    /// Optimistic-concurrency version, bumped on every status write.
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentRow {
    /// A freshly registered document: draft, pipeline pending.
    pub fn new(file_number: Option<String>, file_path: Option<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_number,
            file_status: FileStatus::Draft,
            file_path,
            pipeline_status: PipelineStatus::Pending,
            pipeline_error: None,
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let file_status: String = row.get("file_status")?;
        let pipeline_status: String = row.get("pipeline_status")?;
        Ok(Self {
            id: row.get("id")?,
            file_number: row.get("file_number")?,
            file_status: FileStatus::parse(&file_status)
                .ok_or_else(|| corrupt_status("file_status", &file_status))?,
            file_path: row.get("file_path")?,
            pipeline_status: PipelineStatus::parse(&pipeline_status)
                .ok_or_else(|| corrupt_status("pipeline_status", &pipeline_status))?,
            pipeline_error: row.get("pipeline_error")?,
            version: row.get("version")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn insert(db: &Database, document: &DocumentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, file_number, file_status, file_path, pipeline_status,
             pipeline_error, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                document.id,
                document.file_number,
                document.file_status.as_str(),
                document.file_path,
                document.pipeline_status.as_str(),
                document.pipeline_error,
                document.version,
                document.created_at,
                document.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM documents WHERE id = ?1",
                params![id],
                DocumentRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Compare-and-swap pipeline-status update. Returns false when the
/// version check fails (a concurrent writer won).
pub fn update_pipeline_status(
    db: &Database,
    id: &str,
    new_status: PipelineStatus,
    clear_error: bool,
    expected_version: i64,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = if clear_error {
            conn.execute(
                "UPDATE documents SET pipeline_status = ?2, pipeline_error = NULL,
                 version = version + 1, updated_at = ?3
                 WHERE id = ?1 AND version = ?4",
                params![id, new_status.as_str(), now_rfc3339(), expected_version],
            )?
        } else {
            conn.execute(
                "UPDATE documents SET pipeline_status = ?2,
                 version = version + 1, updated_at = ?3
                 WHERE id = ?1 AND version = ?4",
                params![id, new_status.as_str(), now_rfc3339(), expected_version],
            )?
        };
        Ok(changed > 0)
    })
}

/// Unconditional Failed write. Bypasses the version check but still
/// bumps the version so a racing legal transition loses its CAS.
pub fn force_failed(db: &Database, id: &str, error: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET pipeline_status = ?2, pipeline_error = ?3,
             version = version + 1, updated_at = ?4
             WHERE id = ?1",
            params![
                id,
                PipelineStatus::Failed.as_str(),
                error,
                now_rfc3339()
            ],
        )?;
        Ok(changed > 0)
    })
}

pub fn set_file_status(db: &Database, id: &str, status: FileStatus) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET file_status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_rfc3339()],
        )?;
        Ok(())
    })
}

pub fn list_by_pipeline_status(
    db: &Database,
    status: PipelineStatus,
) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM documents WHERE pipeline_status = ?1 ORDER BY created_at")?;
        let rows = stmt
            .query_map(params![status.as_str()], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Documents with a stage currently in flight.
pub fn list_processing(db: &Database) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM documents WHERE pipeline_status IN (?1, ?2, ?3) ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map(
                params![
                    PipelineStatus::OcrProcessing.as_str(),
                    PipelineStatus::Refining.as_str(),
                    PipelineStatus::Embedding.as_str(),
                ],
                DocumentRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    })
}
