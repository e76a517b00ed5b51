//! Byte-level pre-flight checks and source position bookkeeping.

use alloc::{format, string::String};

use crate::{Error, ParseError};

const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];

/// Validate raw input bytes and hand back the text to parse.
///
/// UTF-16 byte-order marks and NUL bytes are rejected outright (TOML is
/// UTF-8 only), invalid UTF-8 is reported with its line, and a leading
/// UTF-8 BOM is stripped.
pub(crate) fn prepare_bytes(bytes: &[u8]) -> Result<&str, Error> {
    if bytes.starts_with(UTF16_BE_BOM) || bytes.starts_with(UTF16_LE_BOM) {
        return Err(pre_error(
            1,
            String::from("files cannot contain a UTF-16 BOM; TOML files must be UTF-8"),
        ));
    }
    match core::str::from_utf8(bytes) {
        Ok(s) => prepare_str(s),
        Err(e) => {
            let offset = e.valid_up_to();
            Err(pre_error(
                line_at_bytes(bytes, offset),
                format!("invalid UTF-8 at byte offset {offset}; TOML files must be UTF-8"),
            ))
        }
    }
}

/// The NUL-byte check and BOM strip shared by every entry point.
pub(crate) fn prepare_str(input: &str) -> Result<&str, Error> {
    if let Some(pos) = input.bytes().position(|b| b == 0) {
        return Err(pre_error(
            line_at_bytes(input.as_bytes(), pos),
            String::from(
                "files cannot contain NULL bytes; probably using UTF-16; TOML files must be UTF-8",
            ),
        ));
    }
    Ok(input.strip_prefix('\u{feff}').unwrap_or(input))
}

fn pre_error(line: usize, message: String) -> Error {
    Error::Parse(ParseError::new(line, message, String::new()))
}

/// 1-based line number of a byte offset. `\n` advances the count, so a
/// `\r\n` pair counts once.
pub(crate) fn line_at(src: &str, offset: usize) -> usize {
    line_at_bytes(src.as_bytes(), offset)
}

fn line_at_bytes(src: &[u8], offset: usize) -> usize {
    let end = offset.min(src.len());
    1 + src[..end].iter().filter(|b| **b == b'\n').count()
}
