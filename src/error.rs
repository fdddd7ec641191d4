use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::grouping::GroupingError;
use crate::metadata::MetadataError;

pub type Result<T> = std::result::Result<T, SigmfError>;

#[derive(Error, Debug)]
pub enum SigmfError {
    /// Bad call shape: no source, or both a path and a buffer.
    #[error("usage error: {0}")]
    Usage(&'static str),
    #[error("archive extension of {} != .{expected}", .path.display())]
    Format { path: PathBuf, expected: &'static str },
    #[error("invalid metadata for recording `{recording}`: {source}")]
    Validation {
        recording: String,
        #[source]
        source:    MetadataError,
    },
    #[error("malformed archive: {0}")]
    Malformed(String),
    #[error("checksum mismatch for recording `{recording}`: expected {expected}, got {actual}")]
    ChecksumMismatch {
        recording: String,
        expected:  String,
        actual:    String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<GroupingError> for SigmfError {
    fn from(e: GroupingError) -> Self {
        SigmfError::Malformed(e.to_string())
    }
}
