//! Error types for the export pipeline.
//!
//! Only structural failures are errors. Per-row problems in the source data
//! (bad formulas, missing units or rates) never surface here: they degrade to
//! placeholder cells, see [`crate::schedule::Resolved`].

use thiserror::Error;

/// The unified error type returned by the public export API.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The schedule's predefined type has no table layout.
    #[error("unsupported document type: {0}")]
    UnsupportedDocumentType(String),
    /// The requested schedule is not in the document.
    #[error("cost schedule not found: {0}")]
    ScheduleNotFound(String),
    /// Page geometry or column layout cannot paginate safely.
    #[error("invalid table layout: {0}")]
    LayoutInvariant(String),
    /// The cost schedule (or options) JSON failed to parse.
    #[error("failed to parse cost schedule: {0}")]
    Schedule(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The recorded layout could not be serialised.
    #[error("render error: {0}")]
    Render(String),
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
