use std::time::Duration;
use thiserror::Error;

/// Coarse grouping of failures, used by callers to pick a response severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The submitted payload was rejected before any matching ran.
    Input,
    /// The text-recognition service failed or answered with garbage.
    Collaborator,
    /// Reference data or settings are missing or unusable.
    Configuration,
    /// Anything else; reported generically.
    Internal,
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("the uploaded file is empty")]
    EmptyImage,

    #[error("the uploaded file is not a supported image: {0}")]
    UnsupportedMedia(String),

    #[error("could not decode the image: {0}")]
    UndecodableImage(String),

    #[error("text recognition timed out after {0:?}")]
    RecognitionTimeout(Duration),

    #[error("text recognition service answered with HTTP {0}")]
    RecognitionStatus(u16),

    #[error("text recognition service reported an error: {0}")]
    RecognitionFailed(String),

    #[error("malformed text recognition response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no reference profile could be compared with the submitted receipt")]
    NoComparableReference,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image processing error: {0}")]
    Vision(#[from] opencv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::EmptyImage
            | VerifyError::UnsupportedMedia(_)
            | VerifyError::UndecodableImage(_) => ErrorKind::Input,
            VerifyError::RecognitionTimeout(_)
            | VerifyError::RecognitionStatus(_)
            | VerifyError::RecognitionFailed(_)
            | VerifyError::MalformedResponse(_)
            | VerifyError::Http(_) => ErrorKind::Collaborator,
            VerifyError::Config(_) | VerifyError::NoComparableReference => {
                ErrorKind::Configuration
            }
            VerifyError::Vision(_) | VerifyError::Json(_) | VerifyError::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
