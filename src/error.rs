use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the message logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Invalid or unreachable endpoint, or a logger started twice.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The connection dropped or failed after it was opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// Appending a record to the output log failed.
    #[error("failed to append to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl LoggerError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, LoggerError::Configuration(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LoggerError::Transport(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, LoggerError::Persistence { .. })
    }
}
