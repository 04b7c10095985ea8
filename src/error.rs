//! Error taxonomy for the heightmap pipeline.

use thiserror::Error;

/// Result type alias using HeightmapError.
pub type Result<T> = std::result::Result<T, HeightmapError>;

/// Every failure is fatal to the single request being processed.
#[derive(Debug, Error)]
pub enum HeightmapError {
    /// The request document is malformed; raised before any raster I/O.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to open raster '{path}': {message}")]
    RasterOpen { path: String, message: String },

    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    #[error("I/O failure: {0}")]
    Io(String),
}

impl HeightmapError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn raster_open(path: impl Into<String>, message: impl ToString) -> Self {
        Self::RasterOpen {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn reprojection(message: impl Into<String>) -> Self {
        Self::Reprojection(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Process exit code for the command-line entry point.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidRequest(_) => 2,
            Self::RasterOpen { .. } => 3,
            Self::Reprojection(_) => 4,
            Self::Io(_) => 5,
        }
    }
}

impl From<std::io::Error> for HeightmapError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for HeightmapError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidRequest(format!("Failed to parse request: {}", e))
    }
}
