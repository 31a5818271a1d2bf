//! High-level [`Pipeline`] API: binary ⇄ envelope conversion.
//!
//! ```no_run
//! use exim::pipeline::{ConvertOptions, Pipeline};
//! use exim::PointerWidth;
//!
//! let pipeline = Pipeline::new(ConvertOptions::default());
//! pipeline.export_file("ItemNameTable.tbl".as_ref(), "items.json".as_ref(), PointerWidth::Short)?;
//! pipeline.import_file("items.json".as_ref(), "ItemNameTable.tbl".as_ref(), PointerWidth::Short)?;
//! # Ok::<(), exim::EximError>(())
//! ```
//!
//! Every conversion is one straight line: read the whole input, convert,
//! write the whole output.  Any error ends it; nothing is retried and a
//! failed conversion writes nothing.

use std::fs;
use std::path::Path;

use crate::codec::{FormatCodec, MbmCodec, TableCodec};
use crate::envelope::{Envelope, EnvelopeError, EnvelopeLayout};
use crate::error::{EximError, Result};
use crate::kind::{FileKind, PointerWidth};
use crate::resolver::{ConversionRequest, Mode};

// ── ConvertOptions ────────────────────────────────────────────────────────────

/// Configuration for [`Pipeline`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Envelope layout written on export.  Import always auto-detects.
    pub layout: EnvelopeLayout,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline<T = TableCodec, M = MbmCodec> {
    table:   T,
    mbm:     M,
    options: ConvertOptions,
}

impl Pipeline {
    /// Pipeline over the built-in codecs.
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_codecs(TableCodec, MbmCodec, options)
    }
}

impl Default for Pipeline {
    fn default() -> Self { Self::new(ConvertOptions::default()) }
}

impl<T: FormatCodec, M: FormatCodec> Pipeline<T, M> {
    pub fn with_codecs(table: T, mbm: M, options: ConvertOptions) -> Self {
        Self { table, mbm, options }
    }

    pub fn table_codec(&self) -> &T { &self.table }
    pub fn mbm_codec(&self) -> &M { &self.mbm }

    /// Run a resolved request.  Returns the kind of file converted.
    pub fn run(&self, request: &ConversionRequest) -> Result<FileKind> {
        match request.mode {
            Mode::Export => self.export_file(&request.input, &request.output, request.pointer_width),
            Mode::Import => self.import_file(&request.input, &request.output, request.pointer_width),
        }
    }

    // ── Export ───────────────────────────────────────────────────────────────

    pub fn export_file(&self, input: &Path, output: &Path, width: PointerWidth) -> Result<FileKind> {
        let kind = FileKind::from_path(input)
            .ok_or_else(|| EximError::UnsupportedFormat { path: input.to_owned() })?;
        let data = fs::read(input)?;
        let text = self.export_bytes(kind, &data, width)?;
        fs::write(output, text)?;
        tracing::info!("exported {} {} -> {}", kind, input.display(), output.display());
        Ok(kind)
    }

    /// Parse `data` as `kind` and render the envelope text.
    pub fn export_bytes(&self, kind: FileKind, data: &[u8], width: PointerWidth) -> Result<String> {
        tracing::debug!("export: {} bytes as {}", data.len(), kind);
        let envelope = match kind {
            FileKind::Table => wrap_record(&self.table, data, width)?,
            FileKind::MBM   => wrap_record(&self.mbm, data, width)?,
        };
        if self.options.layout == EnvelopeLayout::Tagged && envelope.pointer_width.is_some() {
            tracing::debug!("tagged layout does not record the pointer width");
        }
        Ok(envelope.to_text(self.options.layout)?)
    }

    // ── Import ───────────────────────────────────────────────────────────────

    pub fn import_file(&self, input: &Path, output: &Path, width: PointerWidth) -> Result<FileKind> {
        let text = String::from_utf8(fs::read(input)?).map_err(EnvelopeError::from)?;
        let (kind, bytes) = self.import_text(&text, width)?;
        fs::write(output, bytes)?;
        tracing::info!("imported {} {} -> {}", kind, input.display(), output.display());
        Ok(kind)
    }

    /// Decode envelope `text` and rebuild the binary it describes.
    pub fn import_text(&self, text: &str, width: PointerWidth) -> Result<(FileKind, Vec<u8>)> {
        let envelope = Envelope::from_text(text)?;
        let kind     = envelope.kind;
        tracing::debug!("import: envelope of kind {}", kind);
        let bytes = match kind {
            FileKind::Table => {
                let width = table_width(envelope.pointer_width, width)?;
                unwrap_record(&self.table, envelope, width)?
            }
            FileKind::MBM => unwrap_record(&self.mbm, envelope, width)?,
        };
        Ok((kind, bytes))
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn wrap_record<C: FormatCodec>(codec: &C, data: &[u8], width: PointerWidth) -> Result<Envelope> {
    let record   = codec.parse(data, width)?;
    let recorded = match codec.kind() {
        FileKind::Table => Some(width),
        FileKind::MBM   => None,
    };
    Ok(Envelope::wrap(codec.kind(), recorded, &record)?)
}

fn unwrap_record<C: FormatCodec>(codec: &C, envelope: Envelope, width: PointerWidth) -> Result<Vec<u8>> {
    let record = envelope.into_record::<C::Record>()?;
    Ok(codec.serialize(&record, width)?)
}

/// Pick the pointer width for a table import.
///
/// A width recorded in the envelope wins.  The CLI can only ask for long
/// pointers explicitly, so a `--long` against a recorded short width is an
/// error, while an omitted flag defers to the recording.
fn table_width(recorded: Option<PointerWidth>, requested: PointerWidth) -> Result<PointerWidth> {
    match (recorded, requested) {
        (None, requested) => Ok(requested),
        (Some(PointerWidth::Short), PointerWidth::Long) => Err(EximError::PointerWidthMismatch {
            recorded:  PointerWidth::Short,
            requested: PointerWidth::Long,
        }),
        (Some(recorded), requested) => {
            if recorded != requested {
                tracing::info!("using the {} pointers recorded in the envelope", recorded);
            }
            Ok(recorded)
        }
    }
}
