//! Embedding generation for extracted document pages.

use std::sync::Arc;

use tracing::info_span;

use crate::ai::EmbeddingClient;
use crate::db::{content_repo, embedding_repo, Database};
use crate::pipeline::PipelineError;

/// All stored vectors have this many dimensions.
pub const EMBEDDING_DIM: usize = 768;

pub struct EmbeddingStage {
    db: Database,
    client: Arc<dyn EmbeddingClient>,
}

impl EmbeddingStage {
    pub fn new(db: Database, client: Arc<dyn EmbeddingClient>) -> Self {
        Self { db, client }
    }

    /// Embeds every content page of the document that does not already
    /// have a stored vector. Returns the number of pages embedded.
    pub fn embed_document(&self, document_id: &str) -> Result<usize, PipelineError> {
        let span = info_span!("embed_document", document_id = %document_id);
        let _guard = span.enter();

        let pages = content_repo::list_for_document(&self.db, document_id)?;
        let mut embedded = 0;
        for page in &pages {
            if embedding_repo::exists_for_content(&self.db, &page.id)? {
                continue;
            }
            let vector = self.client.embed(&page.content)?;
            check_dimension(&vector)?;
            embedding_repo::insert(&self.db, &page.id, &vector)?;
            embedded += 1;
        }

        log::info!(
            "Embedded {} of {} pages for document {}",
            embedded,
            pages.len(),
            document_id
        );
        Ok(embedded)
    }

    /// Embeds a search query with the query-side task type.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let vector = self.client.embed_query(text)?;
        check_dimension(&vector)?;
        Ok(vector)
    }
}

fn check_dimension(vector: &[f32]) -> Result<(), PipelineError> {
    if vector.len() != EMBEDDING_DIM {
        return Err(PipelineError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual: vector.len(),
        });
    }
    Ok(())
}
