//! Game text encoding shared by the Table and MBM codecs.
//!
//! In-game strings are sequences of 16-bit codes.  The high and low byte of a
//! printable code form a Shift-JIS double-byte character; everything else is
//! a control code (line break, page break, colour, name substitution, ...).
//!
//! # Decoding
//! - `0x8001` becomes `\n`.
//! - A code that decodes to exactly one character, which re-encodes to the
//!   same code, becomes that character.
//! - Any other code becomes an `[XXXX]` escape (upper-case hex).
//!
//! # Encoding
//! The inverse, with one convenience: printable ASCII is widened to its
//! full-width form first, so translators can type plain text.  `decode`
//! followed by `encode` is the identity on every code sequence.
//!
//! Only escapes `decode` itself would write are read back as codes: four
//! upper-case hex digits naming a code that has no printable form.  Anything
//! else in brackets (`[Cafe]`, `[8341]`, `[8001]`) is ordinary text and is
//! widened like the rest, so `［` is never mistaken for an escape.

use encoding_rs::SHIFT_JIS;
use thiserror::Error;

/// Control code for a line break inside a message.
pub const NEWLINE: u16 = 0x8001;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("Character {0:?} has no two-byte Shift-JIS encoding (use an [XXXX] escape)")]
    Unencodable(char),
}

/// Decode a code sequence (without its terminator) into editable text.
pub fn decode(codes: &[u16]) -> String {
    let mut out = String::with_capacity(codes.len() * 3);
    for &code in codes {
        if code == NEWLINE {
            out.push('\n');
            continue;
        }
        match decode_code(code) {
            Some(c) => out.push(c),
            None    => out.push_str(&format!("[{code:04X}]")),
        }
    }
    out
}

/// Encode editable text back into a code sequence (without terminator).
pub fn encode(text: &str) -> Result<Vec<u16>, TextError> {
    let mut codes = Vec::with_capacity(text.len());
    let mut rest  = text;
    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(code) = parse_escape(rest) {
                codes.push(code);
                rest = &rest[ESCAPE_LEN..];
                continue;
            }
        }
        rest = &rest[c.len_utf8()..];
        match c {
            '\n' => codes.push(NEWLINE),
            // Editors on Windows may sneak these in next to a `\n`.
            '\r' => {}
            _    => codes.push(encode_char(widen(c)).ok_or(TextError::Unencodable(c))?),
        }
    }
    Ok(codes)
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Length of an `[XXXX]` escape in bytes.
const ESCAPE_LEN: usize = 6;

fn parse_escape(s: &str) -> Option<u16> {
    let bytes = s.as_bytes();
    if bytes.len() < ESCAPE_LEN || bytes[0] != b'[' || bytes[ESCAPE_LEN - 1] != b']' {
        return None;
    }
    let hex = &bytes[1..ESCAPE_LEN - 1];
    if !hex.iter().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F')) {
        return None;
    }
    // All-ASCII, so slicing the str here is on char boundaries.
    let code = u16::from_str_radix(&s[1..ESCAPE_LEN - 1], 16).ok()?;
    (code != NEWLINE && decode_code(code).is_none()).then_some(code)
}

fn decode_code(code: u16) -> Option<char> {
    let bytes   = code.to_be_bytes();
    let decoded = SHIFT_JIS.decode_without_bom_handling_and_without_replacement(&bytes)?;
    let mut chars = decoded.chars();
    let c = chars.next()?;
    // User-defined area codes decode to private-use characters that no font
    // shows; keep them as escapes.  ASCII would be widened again on encode.
    if chars.next().is_some() || c.is_ascii() || ('\u{E000}'..='\u{F8FF}').contains(&c) {
        return None;
    }
    (encode_char(c) == Some(code)).then_some(c)
}

fn encode_char(c: char) -> Option<u16> {
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = SHIFT_JIS.encode(c.encode_utf8(&mut buf));
    if had_errors || bytes.len() != 2 {
        return None;
    }
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Map printable ASCII onto the full-width block the game fonts cover.
fn widen(c: char) -> char {
    match c {
        ' '       => '\u{3000}',
        '!'..='~' => char::from_u32(c as u32 - 0x21 + 0xFF01).unwrap_or(c),
        _         => c,
    }
}
