//! Structured error types for readprofile
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("{}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: input file is empty", .0.display())]
    EmptyProfile(PathBuf),

    #[error("{}: truncated profile ({len} bytes, need at least 4)", path.display())]
    TruncatedProfile { path: PathBuf, len: usize },

    #[error("{file}({line}): wrong map line")]
    WrongMapLine { file: String, line: usize },

    #[error("can't find \"_stext\" in {0}")]
    MissingTextStart(String),

    #[error("profile address out of range. Wrong map file?")]
    AddressOutOfRange { index: usize, bins: usize },

    #[error("{}: decompressor exited with {status}", path.display())]
    Decompressor { path: PathBuf, status: ExitStatus },

    #[error("{}: short write ({written} of {expected} bytes)", path.display())]
    ShortWrite { path: PathBuf, written: usize, expected: usize },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to write report: {0}")]
    Output(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ProfileError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProfileError::Io { path: path.into(), source }
    }
}
