// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use anyhow::{Result, bail};

/// Fixed format sense data must be at least this long.
pub const FIXED_MIN_LEN: usize = 18;
/// Descriptor format header length.
pub const DESC_MIN_LEN: usize = 8;

/// Sense data format, from the RESPONSE CODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseFormat {
    Fixed,
    Descriptor,
}

/// Sense keys (SPC-4 table 49).
static SENSE_KEY_NAMES: [&str; 16] = [
    "No Sense",
    "Recovered Error",
    "Not Ready",
    "Medium Error",
    "Hardware Error",
    "Illegal Request",
    "Unit Attention",
    "Data Protect",
    "Blank Check",
    "Vendor Specific",
    "Copy Aborted",
    "Aborted Command",
    "Reserved",
    "Volume Overflow",
    "Miscompare",
    "Completed",
];

pub const SENSE_KEY_RECOVERED_ERROR: u8 = 0x1;
pub const SENSE_KEY_ILLEGAL_REQUEST: u8 = 0x5;

/// The parts of sense data needed to classify a failed PR command.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct SenseData {
    pub format: Option<SenseFormat>,
    pub current: bool,     // response code 0x70/0x72 vs 0x71/0x73
    pub valid: bool,       // fixed: bit7 of byte0
    pub sense_key: u8,
    pub information: u32,  // fixed: bytes 3..7
    pub additional_len: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl SenseData {
    /// Parse fixed (0x70/0x71) or descriptor (0x72/0x73) format sense data.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let Some(&b0) = buf.first() else {
            bail!("empty sense buffer");
        };
        let response_code = b0 & 0x7F;
        match response_code {
            0x70 | 0x71 => {
                if buf.len() < FIXED_MIN_LEN {
                    bail!("sense buffer too small: {} < {FIXED_MIN_LEN}", buf.len());
                }
                Ok(Self {
                    format: Some(SenseFormat::Fixed),
                    current: response_code == 0x70,
                    valid: b0 & 0x80 != 0,
                    sense_key: buf[2] & 0x0F,
                    information: u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]),
                    additional_len: buf[7],
                    asc: buf[12],
                    ascq: buf[13],
                })
            },
            0x72 | 0x73 => {
                if buf.len() < DESC_MIN_LEN {
                    bail!("sense buffer too small: {} < {DESC_MIN_LEN}", buf.len());
                }
                Ok(Self {
                    format: Some(SenseFormat::Descriptor),
                    current: response_code == 0x72,
                    valid: false,
                    sense_key: buf[1] & 0x0F,
                    information: 0,
                    additional_len: buf[7],
                    asc: buf[2],
                    ascq: buf[3],
                })
            },
            other => bail!("unsupported sense response code {other:#04x}"),
        }
    }

    pub fn sense_key_name(&self) -> &'static str {
        SENSE_KEY_NAMES[(self.sense_key & 0x0F) as usize]
    }

    pub fn description(&self) -> &'static str {
        asc_ascq_to_str(self.asc, self.ascq)
    }

    pub fn is_illegal_request(&self) -> bool {
        self.sense_key == SENSE_KEY_ILLEGAL_REQUEST
    }
}

impl fmt::Display for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} (asc={:#04x}, ascq={:#04x})",
            self.sense_key_name(),
            if self.current { "current" } else { "deferred" },
            self.description(),
            self.asc,
            self.ascq
        )
    }
}

impl fmt::Debug for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenseData")
            .field("format", &self.format)
            .field("current", &self.current)
            .field("valid", &self.valid)
            .field("sense_key", &format_args!("{:#x}", self.sense_key))
            .field("information", &self.information)
            .field("additional_len", &self.additional_len)
            .field("asc", &format_args!("{:#04x}", self.asc))
            .field("ascq", &format_args!("{:#04x}", self.ascq))
            .field("description", &self.description())
            .finish()
    }
}

/// Description for an ASC/ASCQ pair, or `"UNSPECIFIED / vendor specific"`.
#[inline]
pub fn asc_ascq_to_str(asc: u8, ascq: u8) -> &'static str {
    hot_table(asc, ascq).unwrap_or("UNSPECIFIED / vendor specific")
}

fn hot_table(asc: u8, ascq: u8) -> Option<&'static str> {
    Some(match (asc, ascq) {
        (0x00, 0x00) => "No additional sense information",
        (0x04, 0x01) => "Logical unit is in process of becoming ready",
        (0x1A, 0x00) => "Parameter list length error",
        (0x20, 0x00) => "Invalid command operation code",
        (0x24, 0x00) => "Invalid field in CDB",
        (0x25, 0x00) => "Logical unit not supported",
        (0x26, 0x00) => "Invalid field in parameter list",
        (0x29, 0x00) => "Power on, reset, or bus device reset occurred",
        (0x2A, 0x03) => "Reservations preempted",
        (0x2A, 0x04) => "Reservations released",
        (0x2A, 0x05) => "Registrations preempted",
        (0x3A, 0x00) => "Medium not present",
        (0x55, 0x02) => "Insufficient reservation resources",
        (0x55, 0x04) => "Insufficient registration resources",
        _ => return None,
    })
}
