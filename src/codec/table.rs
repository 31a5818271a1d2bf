//! Pointer-indexed string tables (`.tbl`).
//!
//! ```text
//! u32                 entry count N            (LE)
//! N × pointer         u16 or u32 (LE)          byte offset of the entry from blob start
//! blob                entries, big-endian u16 codes, each ended by 0x0000
//! ```
//!
//! The file carries no marker for its pointer width; the caller supplies it.
//! Parsing checks every pointer against the blob, and the blob against the
//! pointers, so that a table read with the wrong width fails loudly instead
//! of decoding garbage.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use super::{encode_entry, read_codes, slice_at, text, CodecError, FormatCodec};
use crate::kind::{FileKind, PointerWidth};

/// Entry terminator code.
pub const TERMINATOR: u16 = 0x0000;
/// Size of the entry-count header.
pub const HEADER_SIZE: u64 = 4;

/// Every string in a table, in pointer order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRecord {
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableCodec;

impl FormatCodec for TableCodec {
    type Record = TableRecord;

    fn kind(&self) -> FileKind { FileKind::Table }

    fn parse(&self, data: &[u8], width: PointerWidth) -> Result<TableRecord, CodecError> {
        let count = Cursor::new(slice_at(data, 0, HEADER_SIZE)?).read_u32::<LittleEndian>()? as u64;

        // Bounds-check the whole pointer table before trusting `count`.
        let table_len = count.saturating_mul(width.bytes() as u64);
        let mut pointers = Cursor::new(slice_at(data, HEADER_SIZE, table_len)?);
        let blob = &data[(HEADER_SIZE + table_len) as usize..];

        let mut entries  = Vec::with_capacity(count as usize);
        let mut blob_end = 0u64;
        for index in 0..count as usize {
            let offset = match width {
                PointerWidth::Short => pointers.read_u16::<LittleEndian>()? as u64,
                PointerWidth::Long  => pointers.read_u32::<LittleEndian>()? as u64,
            };
            let codes = read_entry(blob, index, offset)?;
            blob_end = blob_end.max(offset + 2 * (codes.len() as u64 + 1));
            entries.push(text::decode(&codes));
        }

        // Anything past the last entry must be zero padding.  Non-zero bytes
        // nobody points at usually mean the pointer width is wrong.
        let trailing = &blob[blob_end as usize..];
        if trailing.iter().any(|&b| b != 0) {
            return Err(CodecError::Unreferenced {
                offset: HEADER_SIZE + table_len + blob_end,
                len:    trailing.len() as u64,
            });
        }
        if !trailing.is_empty() {
            tracing::warn!("{} byte(s) of zero padding after the last entry are not preserved", trailing.len());
        }
        tracing::debug!("parsed table: {} entries, {} pointers", entries.len(), width);
        Ok(TableRecord { entries })
    }

    fn serialize(&self, record: &TableRecord, width: PointerWidth) -> Result<Vec<u8>, CodecError> {
        let count = u32::try_from(record.entries.len())
            .map_err(|_| CodecError::TooLarge { what: "entry count" })?;

        let mut pointers = Vec::with_capacity(record.entries.len());
        let mut blob     = Vec::new();
        for (index, entry) in record.entries.iter().enumerate() {
            let offset = blob.len() as u64;
            if offset > width.max_offset() {
                return Err(CodecError::PointerOverflow { index, offset, width });
            }
            pointers.push(offset);
            for code in encode_entry(index, entry, TERMINATOR)? {
                blob.write_u16::<BigEndian>(code)?;
            }
            blob.write_u16::<BigEndian>(TERMINATOR)?;
        }

        let mut out = Vec::with_capacity(
            HEADER_SIZE as usize + pointers.len() * width.bytes() + blob.len(),
        );
        out.write_u32::<LittleEndian>(count)?;
        for offset in pointers {
            // Range was checked against `width.max_offset()` above.
            match width {
                PointerWidth::Short => out.write_u16::<LittleEndian>(offset as u16)?,
                PointerWidth::Long  => out.write_u32::<LittleEndian>(offset as u32)?,
            }
        }
        out.extend_from_slice(&blob);
        Ok(out)
    }
}

/// Validate one pointer and read the codes it addresses.
fn read_entry(blob: &[u8], index: usize, offset: u64) -> Result<Vec<u16>, CodecError> {
    let bad = || CodecError::BadPointer { index, offset };
    if offset % 2 != 0 || offset + 2 > blob.len() as u64 {
        return Err(bad());
    }
    let start = offset as usize;
    // An entry starts the blob or directly follows another entry's terminator.
    if start > 0 && blob[start - 2..start] != TERMINATOR.to_be_bytes() {
        return Err(bad());
    }
    read_codes(&blob[start..], TERMINATOR).ok_or(CodecError::Unterminated { index })
}
