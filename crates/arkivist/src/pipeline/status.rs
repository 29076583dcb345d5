use std::fmt;

/// Document-level pipeline state.
///
/// Transition legality lives in [`PipelineStatus::allowed_transitions`];
/// the display label is a separate concern and never consulted when
/// validating a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStatus {
    Pending,
    OcrProcessing,
    OcrCompleted,
    Refining,
    Refined,
    Embedding,
    Completed,
    Failed,
}

impl PipelineStatus {
    pub const ALL: [PipelineStatus; 8] = [
        PipelineStatus::Pending,
        PipelineStatus::OcrProcessing,
        PipelineStatus::OcrCompleted,
        PipelineStatus::Refining,
        PipelineStatus::Refined,
        PipelineStatus::Embedding,
        PipelineStatus::Completed,
        PipelineStatus::Failed,
    ];

    /// The set of states this state may legally transition to.
    pub fn allowed_transitions(self) -> &'static [PipelineStatus] {
        match self {
            PipelineStatus::Pending => &[PipelineStatus::OcrProcessing],
            PipelineStatus::OcrProcessing => {
                &[PipelineStatus::OcrCompleted, PipelineStatus::Failed]
            }
            PipelineStatus::OcrCompleted => &[PipelineStatus::Refining],
            PipelineStatus::Refining => &[PipelineStatus::Refined, PipelineStatus::Failed],
            PipelineStatus::Refined => &[PipelineStatus::Embedding],
            PipelineStatus::Embedding => &[PipelineStatus::Completed, PipelineStatus::Failed],
            PipelineStatus::Failed => &[PipelineStatus::Pending],
            PipelineStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(self, new_status: PipelineStatus) -> bool {
        self.allowed_transitions().contains(&new_status)
    }

    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::OcrProcessing => "ocr_processing",
            PipelineStatus::OcrCompleted => "ocr_completed",
            PipelineStatus::Refining => "refining",
            PipelineStatus::Refined => "refined",
            PipelineStatus::Embedding => "embedding",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|st| st.as_str() == s)
    }

    /// Human-readable label for display surfaces.
    pub fn label(self) -> &'static str {
        match self {
            PipelineStatus::Pending => "Pending",
            PipelineStatus::OcrProcessing => "Extracting text",
            PipelineStatus::OcrCompleted => "Text extraction complete",
            PipelineStatus::Refining => "Analyzing document",
            PipelineStatus::Refined => "Analysis complete",
            PipelineStatus::Embedding => "Generating embeddings",
            PipelineStatus::Completed => "Completed",
            PipelineStatus::Failed => "Failed",
        }
    }

    /// True for states with an active stage in flight.
    pub fn is_processing(self) -> bool {
        matches!(
            self,
            PipelineStatus::OcrProcessing | PipelineStatus::Refining | PipelineStatus::Embedding
        )
    }

    pub fn is_terminal(self) -> bool {
        self == PipelineStatus::Completed
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-state of the OCR extraction record, independent of the
/// document-level pipeline status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcrStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OcrStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OcrStatus::Pending => "pending",
            OcrStatus::Processing => "processing",
            OcrStatus::Completed => "completed",
            OcrStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OcrStatus::Pending),
            "processing" => Some(OcrStatus::Processing),
            "completed" => Some(OcrStatus::Completed),
            "failed" => Some(OcrStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-state of the refinement record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefinementStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RefinementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RefinementStatus::Pending => "pending",
            RefinementStatus::Processing => "processing",
            RefinementStatus::Completed => "completed",
            RefinementStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RefinementStatus::Pending),
            "processing" => Some(RefinementStatus::Processing),
            "completed" => Some(RefinementStatus::Completed),
            "failed" => Some(RefinementStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RefinementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
