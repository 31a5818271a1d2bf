//! Message banks (`.mbm`).
//!
//! ```text
//! 0x00  u32      0
//! 0x04  [u8; 4]  "MSG2"
//! 0x08  u32      0x0001_0000
//! 0x0C  u32      total file size
//! 0x10  u32      entry count N
//! 0x14  u32      entry table offset (0x20)
//! 0x18  u32 × 2  0
//! 0x20  N × { u32 id, u32 byte length incl. terminator, u32 offset, u32 0 }
//! ....  text: big-endian u16 codes, each entry ended by 0xFFFF
//! ```
//!
//! Header integers are little-endian.  An entry with length 0 is a null
//! entry: it keeps its slot and id but has no text.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

use super::{encode_entry, read_codes, slice_at, text, CodecError, FormatCodec};
use crate::kind::{FileKind, PointerWidth};

pub const MAGIC:        &[u8; 4] = b"MSG2";
pub const VERSION:      u32 = 0x0001_0000;
pub const HEADER_SIZE:  u64 = 0x20;
pub const ENTRY_SIZE:   u64 = 16;
/// Entry terminator code.
pub const TERMINATOR:   u16 = 0xFFFF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MbmEntry {
    pub id:   u32,
    /// `None` for a null entry.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MbmRecord {
    pub entries: Vec<MbmEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MbmCodec;

impl FormatCodec for MbmCodec {
    type Record = MbmRecord;

    fn kind(&self) -> FileKind { FileKind::MBM }

    fn parse(&self, data: &[u8], _: PointerWidth) -> Result<MbmRecord, CodecError> {
        let mut header = Cursor::new(slice_at(data, 0, HEADER_SIZE)?);
        let _reserved = header.read_u32::<LittleEndian>()?;
        let mut magic = [0u8; 4];
        header.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CodecError::InvalidMagic(magic));
        }
        let version      = header.read_u32::<LittleEndian>()?;
        let file_size    = header.read_u32::<LittleEndian>()?;
        let count        = header.read_u32::<LittleEndian>()? as u64;
        let table_offset = header.read_u32::<LittleEndian>()? as u64;

        if version != VERSION {
            tracing::warn!("unexpected MBM version {:#x}; will be rewritten as {:#x}", version, VERSION);
        }
        if file_size as usize != data.len() {
            tracing::warn!("MBM header says {} bytes, file has {}", file_size, data.len());
        }

        let mut table = Cursor::new(slice_at(data, table_offset, count.saturating_mul(ENTRY_SIZE))?);
        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count as usize {
            let id        = table.read_u32::<LittleEndian>()?;
            let length    = table.read_u32::<LittleEndian>()? as u64;
            let offset    = table.read_u32::<LittleEndian>()? as u64;
            let _reserved = table.read_u32::<LittleEndian>()?;

            let text = if length == 0 {
                None
            } else {
                let raw = slice_at(data, offset, length)?;
                // The terminator must be the final code of the declared range.
                let codes = read_codes(raw, TERMINATOR)
                    .filter(|codes| (codes.len() as u64 + 1) * 2 == length)
                    .ok_or(CodecError::Unterminated { index })?;
                Some(text::decode(&codes))
            };
            entries.push(MbmEntry { id, text });
        }

        tracing::debug!("parsed MBM: {} entries", entries.len());
        Ok(MbmRecord { entries })
    }

    fn serialize(&self, record: &MbmRecord, _: PointerWidth) -> Result<Vec<u8>, CodecError> {
        let count = record.entries.len() as u64;
        let text_start = HEADER_SIZE + count * ENTRY_SIZE;

        // (id, length, offset) per entry; text laid out in entry order.
        let mut slots = Vec::with_capacity(record.entries.len());
        let mut blob  = Vec::new();
        for (index, entry) in record.entries.iter().enumerate() {
            match &entry.text {
                None => slots.push((entry.id, 0u64, 0u64)),
                Some(text) => {
                    let offset = text_start + blob.len() as u64;
                    for code in encode_entry(index, text, TERMINATOR)? {
                        blob.write_u16::<BigEndian>(code)?;
                    }
                    blob.write_u16::<BigEndian>(TERMINATOR)?;
                    slots.push((entry.id, text_start + blob.len() as u64 - offset, offset));
                }
            }
        }

        let file_size = text_start + blob.len() as u64;
        let file_size_u32 = to_u32(file_size, "MBM file size")?;

        let mut out = Vec::with_capacity(file_size as usize);
        out.write_u32::<LittleEndian>(0)?;
        out.extend_from_slice(MAGIC);
        out.write_u32::<LittleEndian>(VERSION)?;
        out.write_u32::<LittleEndian>(file_size_u32)?;
        out.write_u32::<LittleEndian>(to_u32(count, "entry count")?)?;
        out.write_u32::<LittleEndian>(HEADER_SIZE as u32)?;
        out.write_u64::<LittleEndian>(0)?;
        // Every offset and length is bounded by `file_size`, checked above.
        for (id, length, offset) in slots {
            out.write_u32::<LittleEndian>(id)?;
            out.write_u32::<LittleEndian>(length as u32)?;
            out.write_u32::<LittleEndian>(offset as u32)?;
            out.write_u32::<LittleEndian>(0)?;
        }
        out.extend_from_slice(&blob);
        Ok(out)
    }
}

fn to_u32(value: u64, what: &'static str) -> Result<u32, CodecError> {
    u32::try_from(value).map_err(|_| CodecError::TooLarge { what })
}
