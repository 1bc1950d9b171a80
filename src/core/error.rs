use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while tailing and classifying a character log.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The character log could not be opened.
    #[error("Could not open character log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A read was attempted after the reader was closed.
    #[error("Log reader is closed")]
    ReaderClosed,

    /// The reference store could not serve a request.
    #[error("Reference store error: {0}")]
    Reference(String),

    /// The notifier rejected a message.
    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
