//! Error types for JTAG image assembly

use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, JtagImageError>;

/// Everything that can abort an image run.
///
/// None of these are recoverable: the driver stops at the first one and the
/// partially written image must be discarded.
#[derive(thiserror::Error, Debug)]
pub enum JtagImageError {
    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("cannot read {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    Usage(String),

    #[error("{} is too large for a segment ({size} bytes, max {max})", path.display(), max = u32::MAX)]
    FileTooLarge { path: PathBuf, size: u64 },

    #[error("refusing to write a binary image to a terminal, redirect stdout or use -o")]
    StdoutIsTerminal,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JtagImageError {
    pub fn invalid_size(msg: impl Into<String>) -> Self {
        Self::InvalidSize(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    pub fn file_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Usage errors get the full help text printed alongside them.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}
