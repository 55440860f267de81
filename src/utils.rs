// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt::Write;

use crate::error::{PrError, Result};

const BYTES_PER_LINE: usize = 16;

/// Hex + ASCII dump, 16 bytes per line, every line prefixed with `indent`.
///
/// ```text
/// <indent>00     5e 03 00 00 00 00 00 20  00 00                    ^...... ..
/// ```
pub fn hex_dump(bytes: &[u8], indent: &str) -> String {
    let mut out = String::new();
    for (n, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        write!(out, "{indent}{:02x}    ", n * BYTES_PER_LINE)
            .expect("Writing to String cannot fail");
        for i in 0..BYTES_PER_LINE {
            if i == 8 {
                out.push(' ');
            }
            match chunk.get(i) {
                Some(b) => write!(out, " {b:02x}").expect("Writing to String cannot fail"),
                None => out.push_str("   "),
            }
        }
        out.push_str("  ");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

/// Parse `"0x1f"`, `"0X1F"` or `"1f"` as hex.
pub fn parse_hex_u64(s: &str) -> Result<u64> {
    let t = s.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    u64::from_str_radix(digits, 16)
        .map_err(|e| PrError::invalid(format!("bad hex number {s:?}: {e}")))
}
