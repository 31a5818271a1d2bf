//! The JSON artifact written by export and read by import.
//!
//! # Document layout (default)
//! One JSON object, symmetric to write and read:
//!
//! ```json
//! {
//!   "kind": "Table",
//!   "version": 1,
//!   "pointer_width": "long",
//!   "payload": { "entries": ["..."] }
//! }
//! ```
//!
//! `kind` is matched exactly.  `pointer_width` is only written for tables.
//!
//! # Tagged layout
//! The older two-line form: a tag line (see [`FileKind::tag`]) followed by
//! the pretty-printed record.  On read, every line after the tag is joined
//! back together with no separator.  It carries no pointer width.
//!
//! [`Envelope::from_text`] tells the two apart by the first non-blank
//! character: `{` means document, anything else is a tag.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::kind::{FileKind, PointerWidth};

/// Current document layout version.
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("the file is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("the file is empty (no type tag)")]
    MissingTag,
    #[error("unrecognised type tag {0:?}")]
    UnknownTag(String),
    #[error("no JSON body after the type tag")]
    MissingBody,
    #[error("unsupported envelope version {0} (expected {ENVELOPE_VERSION})")]
    UnsupportedVersion(u32),
    #[error("payload is not a valid {kind} record: {source}")]
    PayloadShape { kind: FileKind, source: serde_json::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which on-disk form [`Envelope::to_text`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeLayout {
    #[default]
    Document,
    Tagged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind:          FileKind,
    pub version:       u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_width: Option<PointerWidth>,
    pub payload:       Value,
}

impl Envelope {
    pub fn wrap<R: Serialize>(
        kind:          FileKind,
        pointer_width: Option<PointerWidth>,
        record:        &R,
    ) -> Result<Self, EnvelopeError> {
        Ok(Self {
            kind,
            version: ENVELOPE_VERSION,
            pointer_width,
            payload: serde_json::to_value(record)?,
        })
    }

    /// Deserialize the payload as the record type of `self.kind`.
    pub fn into_record<R: DeserializeOwned>(self) -> Result<R, EnvelopeError> {
        let kind = self.kind;
        serde_json::from_value(self.payload)
            .map_err(|source| EnvelopeError::PayloadShape { kind, source })
    }

    pub fn to_text(&self, layout: EnvelopeLayout) -> Result<String, EnvelopeError> {
        let mut text = match layout {
            EnvelopeLayout::Document => serde_json::to_string_pretty(self)?,
            EnvelopeLayout::Tagged   => format!(
                "{}\n{}",
                self.kind.tag(),
                serde_json::to_string_pretty(&self.payload)?,
            ),
        };
        text.push('\n');
        Ok(text)
    }

    pub fn from_text(text: &str) -> Result<Self, EnvelopeError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            return Err(EnvelopeError::MissingTag);
        }

        if trimmed.starts_with('{') {
            let envelope: Envelope = serde_json::from_str(text)?;
            if envelope.version != ENVELOPE_VERSION {
                return Err(EnvelopeError::UnsupportedVersion(envelope.version));
            }
            return Ok(envelope);
        }

        let mut lines = trimmed.lines();
        let tag  = lines.next().ok_or(EnvelopeError::MissingTag)?;
        let kind = FileKind::from_tag(tag)
            .ok_or_else(|| EnvelopeError::UnknownTag(tag.trim().to_owned()))?;
        let body = join_body(lines);
        if body.trim().is_empty() {
            return Err(EnvelopeError::MissingBody);
        }
        Ok(Self {
            kind,
            version:       ENVELOPE_VERSION,
            pointer_width: None,
            payload:       serde_json::from_str(&body)?,
        })
    }
}

/// Rejoin body lines verbatim, in order, with no separator.
pub fn join_body<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().collect()
}
