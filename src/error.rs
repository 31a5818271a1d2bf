//! Crate-level error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;
use crate::envelope::EnvelopeError;
use crate::kind::PointerWidth;
use crate::resolver::UsageError;

#[derive(Error, Debug)]
pub enum EximError {
    /// Bad or missing command-line arguments.
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error("Unsupported input format: {} (expected a .tbl or .mbm file)", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),
    #[error("Pointer width mismatch: the table was exported with {recorded} pointers, import requested {requested}")]
    PointerWidthMismatch { recorded: PointerWidth, requested: PointerWidth },
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EximError>;
