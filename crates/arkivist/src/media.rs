//! Resolution of a document's stored binary on disk.

use std::path::{Path, PathBuf};

use crate::db::document_repo::DocumentRow;

/// Resolves the attached file for a document.
///
/// Abstracted so the pipeline can run against a plain directory tree in
/// production and against fixtures in tests.
pub trait MediaStore: Send + Sync {
    /// Absolute path of the document's attached file, or `None` when no
    /// file has been attached.
    fn attached_file(&self, document: &DocumentRow) -> Option<PathBuf>;
}

/// Media store backed by a directory: documents carry paths relative to
/// the media root.
pub struct FilesystemMediaStore {
    root: PathBuf,
}

impl FilesystemMediaStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl MediaStore for FilesystemMediaStore {
    fn attached_file(&self, document: &DocumentRow) -> Option<PathBuf> {
        document
            .file_path
            .as_deref()
            .map(|relative| self.root.join(relative))
    }
}
