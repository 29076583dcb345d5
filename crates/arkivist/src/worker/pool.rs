use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::{PipelineRunner, StageOutcome};

use super::job::{JobOutcome, StageJob};

/// Pool of OS threads pulling stage jobs off a shared queue.
///
/// Workers enqueue the follow-up stage themselves, so the job channel
/// is unbounded; a bounded channel could block a worker on the queue it
/// is draining.
pub struct WorkerPool {
    job_sender: Sender<StageJob>,
    result_receiver: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `worker_count` workers sharing the runner.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(runner: Arc<PipelineRunner>, worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = unbounded::<StageJob>();
        let (result_sender, result_receiver) = unbounded::<JobOutcome>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let job_tx = job_sender.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_runner = Arc::clone(&runner);

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    job_rx,
                    job_tx,
                    result_tx,
                    shutdown_flag,
                    worker_runner,
                );
            });
            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    pub fn submit(&self, job: StageJob) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }
        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn wait(self) {
        // Workers hold their own sender clones for follow-up jobs, so
        // dropping ours cannot disconnect the channel. The flag is what
        // stops them.
        self.shutdown.store(true, Ordering::Relaxed);
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<StageJob>,
    job_sender: Sender<StageJob>,
    result_sender: Sender<JobOutcome>,
    shutdown: Arc<AtomicBool>,
    runner: Arc<PipelineRunner>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                debug!(
                    "Worker {} running {} for document {}",
                    worker_id, job.stage, job.document_id
                );

                let outcome = match runner.run(&job) {
                    Ok(StageOutcome::Continue(next)) => {
                        if job_sender.send(next).is_err() {
                            debug!("Worker {} could not enqueue follow-up job", worker_id);
                        }
                        JobOutcome {
                            job,
                            success: true,
                            error: None,
                        }
                    }
                    Ok(StageOutcome::Done) => JobOutcome {
                        job,
                        success: true,
                        error: None,
                    },
                    Err(e) => JobOutcome {
                        job,
                        success: false,
                        error: Some(e.to_string()),
                    },
                };

                if let Err(e) = result_sender.send(outcome) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{EmbeddingClient, GenerativeClient};
    use crate::config::PipelineSettings;
    use crate::db::document_repo::{self, DocumentRow};
    use crate::db::Database;
    use crate::embed::EMBEDDING_DIM;
    use crate::error::{AiError, ParseError};
    use crate::media::MediaStore;
    use crate::parser::{DocumentParser, ParserRegistry};
    use crate::pipeline::PipelineStatus;
    use crate::worker::Stage;
    use serde_json::json;
    use std::path::{Path, PathBuf};

    struct TextFileParser;

    impl DocumentParser for TextFileParser {
        fn name(&self) -> &'static str {
            "text"
        }

        fn parse(&self, path: &Path) -> Result<String, ParseError> {
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

    struct StubGenerative;

    impl GenerativeClient for StubGenerative {
        fn generate_content(
            &self,
            _prompt: &str,
            _system_instruction: Option<&str>,
        ) -> Result<serde_json::Value, AiError> {
            Ok(json!({
                "student_number": "2021-00123",
                "student_name": "Jane Doe",
                "college": "Engineering",
                "confidence": 0.95,
            }))
        }
    }

    struct StubEmbedding;

    impl EmbeddingClient for StubEmbedding {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, AiError> {
            Ok(vec![0.1; EMBEDDING_DIM])
        }

        fn embed_query(&self, _text: &str) -> Result<Vec<f32>, AiError> {
            Ok(vec![0.2; EMBEDDING_DIM])
        }
    }

    fn test_runner(db: &Database, media_root: &Path) -> Arc<PipelineRunner> {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(TextFileParser));

        let settings = PipelineSettings {
            confidence_threshold: 85.0,
            max_attempts: 1,
            backoff_secs: vec![0],
            stage_timeout_secs: 30,
        };

        Arc::new(PipelineRunner::new(
            db.clone(),
            Arc::new(registry),
            Arc::new(DirMediaStore {
                root: media_root.to_path_buf(),
            }),
            Arc::new(StubGenerative),
            Arc::new(StubEmbedding),
            &settings,
        ))
    }

    #[test]
    fn test_pool_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let pool = WorkerPool::new(test_runner(&db, dir.path()), 2);

        assert!(!pool.is_shutdown());
        pool.shutdown();
        assert!(pool.is_shutdown());
        pool.wait();
    }

    #[test]
    fn test_document_flows_through_all_stages() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();

        let doc = DocumentRow::new(None, Some("doc.txt".to_string()));
        document_repo::insert(&db, &doc).unwrap();
        std::fs::write(dir.path().join("doc.txt"), "Transcript for Jane Doe").unwrap();

        let pool = WorkerPool::new(test_runner(&db, dir.path()), 1);
        pool.submit(StageJob::ocr(&doc.id)).unwrap();

        let mut stages_seen = Vec::new();
        while stages_seen.len() < 3 {
            let outcome = pool.recv_result().unwrap();
            assert!(outcome.success, "stage failed: {:?}", outcome.error);
            stages_seen.push(outcome.job.stage);
        }
        assert_eq!(stages_seen, vec![Stage::Ocr, Stage::Refine, Stage::Embed]);

        let found = document_repo::find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.pipeline_status, PipelineStatus::Completed);

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_failed_job_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();

        // No file attached, so the OCR stage fails.
        let doc = DocumentRow::new(None, None);
        document_repo::insert(&db, &doc).unwrap();

        let pool = WorkerPool::new(test_runner(&db, dir.path()), 1);
        pool.submit(StageJob::ocr(&doc.id)).unwrap();

        let outcome = pool.recv_result().unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("no attached file"));

        let found = document_repo::find_by_id(&db, &doc.id).unwrap().unwrap();
        assert_eq!(found.pipeline_status, PipelineStatus::Failed);

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let pool = WorkerPool::new(test_runner(&db, dir.path()), 1);

        pool.shutdown();
        assert!(pool.submit(StageJob::ocr("any")).is_err());
        pool.wait();
    }
}
