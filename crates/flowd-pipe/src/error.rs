use std::path::PathBuf;

/// Errors from FIFO handling and port-argument parsing.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// `mkfifo` or the follow-up permission change failed.
    #[error("failed to create fifo {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stale FIFO from an earlier run could not be removed.
    #[error("failed to remove stale fifo {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Something other than a FIFO already occupies the path.
    #[error("refusing to replace {path}: existing file is not a fifo")]
    NotAFifo { path: PathBuf },

    /// The path cannot name a FIFO (empty, no file name, interior NUL).
    #[error("invalid fifo path {path:?}")]
    InvalidPath { path: PathBuf },

    /// Opening a FIFO end failed.
    #[error("failed to open fifo {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A port flag was given without its value.
    #[error("missing value for {0}")]
    MissingValue(String),

    /// A port name without a path, or a path without a port name.
    #[error("{flag} {name:?} is not paired with a matching {expected}")]
    UnpairedPort {
        flag: &'static str,
        name: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, PipeError>;
