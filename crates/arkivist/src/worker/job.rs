use std::fmt;

/// The three pipeline stages that run as queued jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Ocr,
    Refine,
    Embed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ocr => "ocr",
            Stage::Refine => "refine",
            Stage::Embed => "embed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work: run one stage for one document.
#[derive(Clone, Debug)]
pub struct StageJob {
    pub id: String,
    pub document_id: String,
    pub stage: Stage,
}

impl StageJob {
    fn new(document_id: &str, stage: Stage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            stage,
        }
    }

    pub fn ocr(document_id: &str) -> Self {
        Self::new(document_id, Stage::Ocr)
    }

    pub fn refine(document_id: &str) -> Self {
        Self::new(document_id, Stage::Refine)
    }

    pub fn embed(document_id: &str) -> Self {
        Self::new(document_id, Stage::Embed)
    }
}

/// Result of a completed job, reported back through the pool.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: StageJob,
    pub success: bool,
    pub error: Option<String>,
}
