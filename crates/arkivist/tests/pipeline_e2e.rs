//! End-to-end tests for the document processing pipeline, driven
//! entirely through the public API with stub AI clients.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use arkivist::db::document_repo::{self, DocumentRow, FileStatus};
use arkivist::db::{content_repo, embedding_repo, refinement_repo};
use arkivist::{
    AiError, Database, DocumentParser, EmbeddingClient, GenerativeClient, MediaStore, ParseError,
    ParserRegistry, PipelineRunner, PipelineSettings, PipelineStatus, Stage, StageJob, WorkerPool,
    EMBEDDING_DIM,
};

struct TextFileParser {
    calls: Arc<AtomicUsize>,
}

impl DocumentParser for TextFileParser {
    fn name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, path: &Path) -> Result<String, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::read_to_string(path).map_err(|e| ParseError::ReadDocument {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["txt"]
    }
}

struct DirMediaStore {
    root: PathBuf,
}

impl MediaStore for DirMediaStore {
    fn attached_file(&self, document: &DocumentRow) -> Option<PathBuf> {
        document.file_path.as_deref().map(|p| self.root.join(p))
    }
}

/// Generative client that fails a configurable number of times before
/// returning a fixed high-confidence extraction.
struct FlakyGenerative {
    failures_before_success: usize,
    calls: AtomicUsize,
}

impl FlakyGenerative {
    fn new(failures_before_success: usize) -> Self {
        Self {
            failures_before_success,
            calls: AtomicUsize::new(0),
        }
    }
}

impl GenerativeClient for FlakyGenerative {
    fn generate_content(
        &self,
        _prompt: &str,
        _system_instruction: Option<&str>,
    ) -> Result<serde_json::Value, AiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            return Err(AiError::Api {
                status: 503,
                body: "temporarily overloaded".to_string(),
            });
        }
        Ok(json!({
            "student_number": "2019-04567",
            "student_name": "Maria Santos",
            "college": "College of Nursing",
            "program": "BS Nursing",
            "document_type": "transcript",
            "confidence": 0.93,
        }))
    }
}

struct FixedEmbedding;

impl EmbeddingClient for FixedEmbedding {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, AiError> {
        Ok(vec![0.05; EMBEDDING_DIM])
    }

    fn embed_query(&self, _text: &str) -> Result<Vec<f32>, AiError> {
        Ok(vec![0.07; EMBEDDING_DIM])
    }
}

struct Harness {
    db: Database,
    runner: Arc<PipelineRunner>,
    parser_calls: Arc<AtomicUsize>,
    media_dir: tempfile::TempDir,
}

fn harness(generative: Arc<dyn GenerativeClient>) -> Harness {
    let media_dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();

    let parser_calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ParserRegistry::new();
    registry.register(Box::new(TextFileParser {
        calls: Arc::clone(&parser_calls),
    }));

    let settings = PipelineSettings {
        confidence_threshold: 85.0,
        max_attempts: 3,
        backoff_secs: vec![0],
        stage_timeout_secs: 30,
    };

    let runner = Arc::new(PipelineRunner::new(
        db.clone(),
        Arc::new(registry),
        Arc::new(DirMediaStore {
            root: media_dir.path().to_path_buf(),
        }),
        generative,
        Arc::new(FixedEmbedding),
        &settings,
    ));

    Harness {
        db,
        runner,
        parser_calls,
        media_dir,
    }
}

fn register_document(h: &Harness, file_name: &str, contents: &str) -> String {
    let doc = DocumentRow::new(Some("F-2024-117".to_string()), Some(file_name.to_string()));
    document_repo::insert(&h.db, &doc).unwrap();
    std::fs::write(h.media_dir.path().join(file_name), contents).unwrap();
    doc.id
}

fn document_status(h: &Harness, id: &str) -> PipelineStatus {
    document_repo::find_by_id(&h.db, id)
        .unwrap()
        .unwrap()
        .pipeline_status
}

#[test]
fn multi_page_document_completes_through_worker_pool() {
    let h = harness(Arc::new(FlakyGenerative::new(0)));
    let id = register_document(
        &h,
        "transcript.txt",
        "Transcript of Records\nMaria Santos\u{c}Semester 2 grades\u{c}Remarks page",
    );

    let pool = WorkerPool::new(Arc::clone(&h.runner), 2);
    pool.submit(StageJob::ocr(&id)).unwrap();

    let mut completed = 0;
    while completed < 3 {
        let outcome = pool.recv_result().unwrap();
        assert!(outcome.success, "{:?} failed: {:?}", outcome.job.stage, outcome.error);
        completed += 1;
    }
    pool.shutdown();
    pool.wait();

    assert_eq!(document_status(&h, &id), PipelineStatus::Completed);

    let pages = content_repo::list_for_document(&h.db, &id).unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].page_number, 1);
    assert!(pages[0].content.contains("Maria Santos"));
    for page in &pages {
        let embedding = embedding_repo::find_by_content(&h.db, &page.id)
            .unwrap()
            .unwrap();
        assert_eq!(embedding.vector.len(), EMBEDDING_DIM);
    }

    // High confidence plus required fields auto-classifies the file.
    let doc = document_repo::find_by_id(&h.db, &id).unwrap().unwrap();
    assert_eq!(doc.file_status, FileStatus::Complete);
    let refinement = refinement_repo::find_by_document(&h.db, &id)
        .unwrap()
        .unwrap();
    assert_eq!(refinement.confidence_score, Some(93.0));
}

#[test]
fn transient_ai_failures_are_retried_within_the_stage() {
    // Two failures, then success: within the 3-attempt budget.
    let h = harness(Arc::new(FlakyGenerative::new(2)));
    let id = register_document(&h, "doc.txt", "some document text");

    let pool = WorkerPool::new(Arc::clone(&h.runner), 1);
    pool.submit(StageJob::ocr(&id)).unwrap();

    for _ in 0..3 {
        let outcome = pool.recv_result().unwrap();
        assert!(outcome.success, "{:?} failed: {:?}", outcome.job.stage, outcome.error);
    }
    pool.shutdown();
    pool.wait();

    assert_eq!(document_status(&h, &id), PipelineStatus::Completed);
}

#[test]
fn exhausted_retries_fail_the_document_with_annotation() {
    // More failures than the attempt budget allows.
    let h = harness(Arc::new(FlakyGenerative::new(10)));
    let id = register_document(&h, "doc.txt", "some document text");

    let pool = WorkerPool::new(Arc::clone(&h.runner), 1);
    pool.submit(StageJob::ocr(&id)).unwrap();

    let ocr = pool.recv_result().unwrap();
    assert!(ocr.success);
    assert_eq!(ocr.job.stage, Stage::Ocr);

    let refine = pool.recv_result().unwrap();
    assert!(!refine.success);
    pool.shutdown();
    pool.wait();

    let doc = document_repo::find_by_id(&h.db, &id).unwrap().unwrap();
    assert_eq!(doc.pipeline_status, PipelineStatus::Failed);
    let message = doc.pipeline_error.unwrap();
    assert!(message.starts_with("Max retries exceeded: "), "{}", message);
}

#[test]
fn retried_document_resumes_without_repeating_extraction() {
    let h = harness(Arc::new(FlakyGenerative::new(3)));
    let id = register_document(&h, "doc.txt", "some document text");

    // First pass: OCR succeeds, refinement exhausts its 3 attempts.
    h.runner.run(&StageJob::ocr(&id)).unwrap();
    h.runner.run(&StageJob::refine(&id)).unwrap_err();
    assert_eq!(document_status(&h, &id), PipelineStatus::Failed);
    assert_eq!(h.parser_calls.load(Ordering::SeqCst), 1);

    // Retry re-enters from the top but keeps the extracted content.
    let job = h.runner.retry_document(&id).unwrap();
    assert_eq!(job.stage, Stage::Ocr);
    h.runner.run(&job).unwrap();
    assert_eq!(h.parser_calls.load(Ordering::SeqCst), 1);

    // The fourth model call succeeds.
    h.runner.run(&StageJob::refine(&id)).unwrap();
    h.runner.run(&StageJob::embed(&id)).unwrap();
    assert_eq!(document_status(&h, &id), PipelineStatus::Completed);

    // Error annotation from the failed pass is gone.
    let doc = document_repo::find_by_id(&h.db, &id).unwrap().unwrap();
    assert!(doc.pipeline_error.is_none());
}

#[test]
fn unsupported_format_fails_without_looping() {
    let h = harness(Arc::new(FlakyGenerative::new(0)));
    let doc = DocumentRow::new(None, Some("scan.xyz".to_string()));
    document_repo::insert(&h.db, &doc).unwrap();
    std::fs::write(h.media_dir.path().join("scan.xyz"), b"data").unwrap();

    let err = h.runner.run(&StageJob::ocr(&doc.id)).unwrap_err();
    assert!(err.to_string().contains("No parser available"));
    assert_eq!(document_status(&h, &doc.id), PipelineStatus::Failed);
    assert_eq!(h.parser_calls.load(Ordering::SeqCst), 0);
}
