//! Binary codecs for the two text containers.
//!
//! The conversion pipeline only talks to [`FormatCodec`]; it never looks at
//! pointer tables or text blobs itself.  Each codec owns its record type,
//! which is what ends up (as JSON) inside an envelope.
//!
//! | Kind  | Codec          | Record          | Pointer width |
//! |-------|----------------|-----------------|---------------|
//! | Table | [`TableCodec`] | [`TableRecord`] | honoured      |
//! | MBM   | [`MbmCodec`]   | [`MbmRecord`]   | ignored       |

pub mod mbm;
pub mod table;
pub mod text;

use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::kind::{FileKind, PointerWidth};

pub use mbm::{MbmCodec, MbmEntry, MbmRecord};
pub use table::{TableCodec, TableRecord};
pub use text::TextError;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("File truncated: needed {needed} bytes at offset {offset:#x}, only {available} available")]
    Truncated { offset: u64, needed: u64, available: u64 },
    #[error("Invalid MBM magic: expected \"MSG2\", found {0:?}")]
    InvalidMagic([u8; 4]),
    /// The pointer is odd, out of range, or lands inside another entry.
    /// Almost always means the table was read with the wrong pointer width.
    #[error("Pointer {index} ({offset:#x}) does not point at an entry; wrong pointer width?")]
    BadPointer { index: usize, offset: u64 },
    #[error("{len} byte(s) at {offset:#x} are not referenced by any pointer; wrong pointer width?")]
    Unreferenced { offset: u64, len: u64 },
    #[error("Entry {index} is not terminated")]
    Unterminated { index: usize },
    #[error("Entry {index} contains the terminator code {code:#06x}")]
    EmbeddedTerminator { index: usize, code: u16 },
    #[error("Offset {offset:#x} of entry {index} does not fit in a {width} pointer")]
    PointerOverflow { index: usize, offset: u64, width: PointerWidth },
    #[error("{what} exceeds the 32-bit limit of the format")]
    TooLarge { what: &'static str },
    #[error("Entry {index}: {source}")]
    Text { index: usize, source: TextError },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

/// Binary ⇄ record conversion for one [`FileKind`].
pub trait FormatCodec {
    /// Editable in-memory form; serialized into the envelope payload.
    type Record: Serialize + DeserializeOwned;

    fn kind(&self) -> FileKind;
    fn parse(&self, data: &[u8], width: PointerWidth) -> Result<Self::Record, CodecError>;
    fn serialize(&self, record: &Self::Record, width: PointerWidth) -> Result<Vec<u8>, CodecError>;
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Bounds-check `data[offset..offset + len]`.
pub(crate) fn slice_at(data: &[u8], offset: u64, len: u64) -> Result<&[u8], CodecError> {
    let truncated = || CodecError::Truncated {
        offset,
        needed:    len,
        available: (data.len() as u64).saturating_sub(offset),
    };
    let end = offset.checked_add(len).ok_or_else(truncated)?;
    if end > data.len() as u64 {
        return Err(truncated());
    }
    Ok(&data[offset as usize..end as usize])
}

/// Read big-endian u16 codes up to (not including) `terminator`.
/// Returns `None` when the slice ends first.
pub(crate) fn read_codes(data: &[u8], terminator: u16) -> Option<Vec<u16>> {
    let mut codes = Vec::new();
    for pair in data.chunks_exact(2) {
        let code = u16::from_be_bytes([pair[0], pair[1]]);
        if code == terminator {
            return Some(codes);
        }
        codes.push(code);
    }
    None
}

/// Encode one entry's text, rejecting embedded terminators.
pub(crate) fn encode_entry(index: usize, text: &str, terminator: u16) -> Result<Vec<u16>, CodecError> {
    let codes = text::encode(text).map_err(|source| CodecError::Text { index, source })?;
    if codes.contains(&terminator) {
        return Err(CodecError::EmbeddedTerminator { index, code: terminator });
    }
    Ok(codes)
}
