// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Text front-ends for caller supplied TransportIDs.
//!
//! * [`parse_hex_list`]: one record as `"5,0,0,1c,69,71,6e"`.
//! * [`parse_transport_id_lines`]: one record per line; bytes separated by
//!   spaces, tabs or commas; `#` starts a comment line; blank lines skipped.
//!
//! Both end in [`TransportIdRecord::from_bytes`], so padding is applied the
//! same way no matter where the bytes came from.

use crate::{
    error::{PrError, Result},
    models::transport_id::TransportIdRecord,
};

/// Upper bound on bytes accepted for a single record.
pub const MAX_TRANSPORT_ID_BYTES: usize = 1024;

const LINE_SEPARATORS: &[u8] = b" ,\t";

fn malformed(line: usize, pos: usize, reason: impl Into<String>) -> PrError {
    PrError::MalformedInput {
        line,
        pos,
        reason: reason.into(),
    }
}

/// Parse a hex token into one byte. `line`/`pos` locate it for messages.
fn hex_byte(tok: &str, line: usize, pos: usize) -> Result<u8> {
    if tok.is_empty() {
        return Err(malformed(line, pos, "expected hex number"));
    }
    match u32::from_str_radix(tok, 16) {
        Ok(v) if v <= 0xff => Ok(v as u8),
        _ => Err(PrError::invalid(format!(
            "hex number larger than 0xff in line {line}, pos {pos}"
        ))),
    }
}

fn push_byte(out: &mut Vec<u8>, b: u8, line: usize) -> Result<()> {
    if out.len() >= MAX_TRANSPORT_ID_BYTES {
        return Err(PrError::invalid(format!(
            "transport id in line {line} longer than {MAX_TRANSPORT_ID_BYTES} bytes"
        )));
    }
    out.push(b);
    Ok(())
}

/// Parse a comma separated list of hex bytes into a single record.
pub fn parse_hex_list(inp: &str) -> Result<TransportIdRecord> {
    if let Some(bad) = inp
        .bytes()
        .position(|c| !(c.is_ascii_hexdigit() || c == b','))
    {
        return Err(malformed(1, bad + 1, "expected hex digit or ','"));
    }

    let mut bytes = Vec::new();
    let mut pos = 0usize;
    for tok in inp.split(',') {
        let b = hex_byte(tok, 1, pos + 1)?;
        push_byte(&mut bytes, b, 1)?;
        pos += tok.len() + 1;
    }
    Ok(TransportIdRecord::from_bytes(bytes))
}

/// Parse one non-comment, non-blank line. `start` is the byte index of the
/// first non-blank character.
fn parse_line(line: &str, start: usize, line_no: usize) -> Result<TransportIdRecord> {
    let body = &line.as_bytes()[start..];
    if let Some(bad) = body
        .iter()
        .position(|c| !(c.is_ascii_hexdigit() || LINE_SEPARATORS.contains(c)))
    {
        return Err(malformed(
            line_no,
            start + bad + 1,
            "syntax error, expected hex digits separated by space, tab or ','",
        ));
    }
    if body.first() == Some(&b',') {
        return Err(malformed(line_no, start + 1, "expected hex number"));
    }

    let mut bytes = Vec::new();
    let mut i = start;
    let raw = line.as_bytes();
    while i < raw.len() {
        let tok_start = i;
        while i < raw.len() && !LINE_SEPARATORS.contains(&raw[i]) {
            i += 1;
        }
        let b = hex_byte(&line[tok_start..i], line_no, tok_start + 1)?;
        push_byte(&mut bytes, b, line_no)?;
        while i < raw.len() && LINE_SEPARATORS.contains(&raw[i]) {
            i += 1;
        }
    }
    Ok(TransportIdRecord::from_bytes(bytes))
}

/// Parse a line oriented TransportID listing, one record per line.
pub fn parse_transport_id_lines(text: &str) -> Result<Vec<TransportIdRecord>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(start) = line.bytes().position(|c| c != b' ' && c != b'\t') else {
            continue;
        };
        if line.as_bytes()[start] == b'#' {
            continue;
        }
        out.push(parse_line(line, start, idx + 1)?);
    }
    Ok(out)
}
