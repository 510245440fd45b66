//! Error types for the inspector

use error_stack::Report;
use strata_view::StrataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Scene error: {0}")]
    Scene(String),

    #[error("Invalid pick position: {0}")]
    BadPick(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keeps the report's attachments in the message.
impl From<Report<StrataError>> for InspectError {
    fn from(report: Report<StrataError>) -> Self {
        let text = format!("{report:?}");
        match report.current_context() {
            StrataError::Projection => InspectError::Camera(text),
            _ => InspectError::Scene(text),
        }
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
