//! Muninn error types

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Lifecycle errors
    #[error("no provider installed; call resolve() or initialize() first")]
    NotInitialized,

    #[error("text generation is not supported on this device ({device})")]
    UnsupportedDevice {
        /// Device model string from the classification, or "unknown".
        device: String,
    },

    #[error("device classification failed: {0}")]
    ClassificationFailed(String),

    // Download lifecycle errors
    #[error("model download failed: {0}")]
    DownloadFailed(String),

    #[error("model download cancelled")]
    DownloadCancelled,

    /// Generation requested while the artifact is being written to disk.
    /// The engine cannot serve inference mid-transfer, so fail fast
    /// instead of blocking the caller.
    #[error("model download in progress; generation unavailable until it completes")]
    DownloadInProgress,

    #[error("model artifact not downloaded")]
    ModelNotDownloaded,

    // Backend errors
    #[error("backend error: {0}")]
    Backend(String),

    // Transport/storage errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MuninnError {
    /// Whether this error is recoverable by re-running the lifecycle step
    /// that produced it (retry `resolve()`, retry the download, or download
    /// the model first).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::ClassificationFailed(_)
                | Self::DownloadFailed(_)
                | Self::DownloadCancelled
                | Self::DownloadInProgress
                | Self::ModelNotDownloaded
                | Self::Http(_)
        )
    }
}

impl From<reqwest::Error> for MuninnError {
    fn from(err: reqwest::Error) -> Self {
        MuninnError::Http(err.to_string())
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
