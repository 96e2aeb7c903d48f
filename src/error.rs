use thiserror::Error;

/// Failures surfaced by the reference index and OCR batch pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch feed from {source_name}: {reason}")]
    FetchFailure { source_name: String, reason: String },
    #[error("record has no parseable timestamp (created_at={created:?}, updated_at={updated:?})")]
    InvalidTimestamp {
        created: Option<String>,
        updated: Option<String>,
    },
    #[error("recognition failed for {location}: {reason}")]
    RecognitionFailure { location: String, reason: String },
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("OCR batch cancelled")]
    Cancelled,
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
