use std::io;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while assembling or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A document could not be supplied by the source.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A stage was enabled without the data it needs. Raised before any document is processed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A persisted index could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        PipelineError::Configuration(msg.into())
    }

    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        PipelineError::Encoding(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A document that could not be read or parsed.
#[derive(Debug, Error)]
#[error("source error at {location} (document {}): {cause}", .doc_id.as_deref().unwrap_or("<unknown>"))]
pub struct SourceError {
    pub doc_id: Option<String>,
    /// File path plus line or array index, whatever locates the record.
    pub location: String,
    #[source]
    pub cause: BoxError,
}

impl SourceError {
    pub fn new<L, E>(location: L, cause: E) -> Self
    where
        L: Into<String>,
        E: Into<BoxError>,
    {
        Self { doc_id: None, location: location.into(), cause: cause.into() }
    }

    pub fn with_doc_id<S: Into<String>>(mut self, doc_id: S) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }
}
