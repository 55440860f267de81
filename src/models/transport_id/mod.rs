// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SCSI TransportID records (SPC-3 §7.5.4).
//!
//! ```text
//!  byte 0:  7   6   5   4   3   2   1   0
//!          +-------+-------+---------------+
//!          | FORMAT CODE   | rsvd  | PROTOCOL IDENTIFIER |
//!          +-------+-------+---------------+
//!  bytes 1.. : protocol specific body
//! ```
//!
//! Two directions are covered here:
//!
//! * **encode**: [`TransportIdRecord`] wraps caller-provided bytes and only
//!   normalises the length (≥ 24, multiple of 4). Building a meaningful body
//!   is the caller's business.
//! * **decode**: [`decode_transport_ids`] walks a buffer lazily and yields
//!   one [`TransportId`] per record. Unknown protocols never stop the scan.
//!
//! The two directions round lengths differently: the builder pads an iSCSI
//! record to a multiple of 4, while the scanner advances by the unrounded
//! `4 + ADDITIONAL LENGTH` (floored at 24).

pub mod parse;

use core::{fmt, iter::FusedIterator};

use tracing::{debug, warn};

use crate::utils::hex_dump;

/// Every TransportID is at least this long.
pub const TRANSPORT_ID_MIN_LEN: usize = 24;

/// Protocol identifier, low nibble of byte 0 (SPC-3 table 262).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    FibreChannel,
    ParallelScsi,
    Ssa,
    Ieee1394,
    Rdma,
    Iscsi,
    Sas,
    Adt,
    Atapi,
    Unknown(u8),
}

impl ProtocolId {
    pub fn code(self) -> u8 {
        match self {
            ProtocolId::FibreChannel => 0x0,
            ProtocolId::ParallelScsi => 0x1,
            ProtocolId::Ssa => 0x2,
            ProtocolId::Ieee1394 => 0x3,
            ProtocolId::Rdma => 0x4,
            ProtocolId::Iscsi => 0x5,
            ProtocolId::Sas => 0x6,
            ProtocolId::Adt => 0x7,
            ProtocolId::Atapi => 0x8,
            ProtocolId::Unknown(v) => v & 0x0f,
        }
    }
}

impl From<u8> for ProtocolId {
    fn from(v: u8) -> Self {
        match v & 0x0f {
            0x0 => ProtocolId::FibreChannel,
            0x1 => ProtocolId::ParallelScsi,
            0x2 => ProtocolId::Ssa,
            0x3 => ProtocolId::Ieee1394,
            0x4 => ProtocolId::Rdma,
            0x5 => ProtocolId::Iscsi,
            0x6 => ProtocolId::Sas,
            0x7 => ProtocolId::Adt,
            0x8 => ProtocolId::Atapi,
            other => ProtocolId::Unknown(other),
        }
    }
}

/// Protocol specific content of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportIdDetail {
    /// FCP-2 N_Port name, bytes 8..16.
    FibreChannel { port_name: [u8; 8] },
    /// SCSI address at 2..4, relative target port at 6..8.
    ParallelScsi {
        scsi_address: u16,
        relative_port: u16,
    },
    /// EUI-64 name, bytes 8..16.
    Ieee1394 { eui64: [u8; 8] },
    /// RDMA initiator port identifier, bytes 8..24.
    Rdma { port_id: [u8; 16] },
    /// iSCSI name (format code 0), exactly ADDITIONAL LENGTH bytes.
    IscsiName { name: Vec<u8> },
    /// iSCSI name + ISID (format code 1).
    IscsiPortId { port_id: Vec<u8> },
    /// SAS address, big-endian at 4..12.
    Sas { address: u64 },
    /// No body layout known (SSA, ADT, ATAPI, unknown protocol, or an iSCSI
    /// record with format code 2/3). `dump_len` bytes of `raw` are shown.
    Opaque { dump_len: usize },
}

/// One decoded TransportID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportId {
    /// Offset of the record inside the scanned region.
    pub offset: usize,
    pub format_code: u8,
    pub protocol: ProtocolId,
    pub detail: TransportIdDetail,
    /// Distance to the next record.
    pub length: usize,
    /// Record bytes actually present, at most `length`.
    pub raw: Vec<u8>,
}

impl TransportId {
    /// Protocols with a defined layout expect format code 0.
    pub fn has_unexpected_format(&self) -> bool {
        match self.protocol {
            ProtocolId::FibreChannel
            | ProtocolId::ParallelScsi
            | ProtocolId::Ieee1394
            | ProtocolId::Rdma
            | ProtocolId::Sas => self.format_code != 0,
            ProtocolId::Iscsi => self.format_code > 1,
            _ => false,
        }
    }

    /// iSCSI name as text, without the NUL padding the standard allows.
    pub fn iscsi_name(&self) -> Option<String> {
        match &self.detail {
            TransportIdDetail::IscsiName { name } => Some(ascii_lossy(name)),
            TransportIdDetail::IscsiPortId { port_id } => Some(ascii_lossy(port_id)),
            _ => None,
        }
    }
}

fn ascii_lossy(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[inline]
fn byte_at(rec: &[u8], i: usize) -> u8 {
    rec.get(i).copied().unwrap_or(0)
}

/// Fixed-size field at `off`; bytes past the buffer read as zero.
fn array_at<const N: usize>(rec: &[u8], off: usize) -> [u8; N] {
    let mut out = [0u8; N];
    for (i, o) in out.iter_mut().enumerate() {
        *o = byte_at(rec, off + i);
    }
    out
}

#[inline]
fn be16_at(rec: &[u8], off: usize) -> u16 {
    u16::from_be_bytes(array_at(rec, off))
}

/// Decode the record starting at `rec[0]`. `rec` ends where the scanned
/// region ends, so it may be shorter than the record claims.
fn decode_one(rec: &[u8], offset: usize) -> TransportId {
    let b0 = byte_at(rec, 0);
    let format_code = (b0 >> 6) & 0x3;
    let protocol = ProtocolId::from(b0);
    let fixed_dump = rec.len().min(TRANSPORT_ID_MIN_LEN);

    let (detail, length) = match protocol {
        ProtocolId::FibreChannel => (
            TransportIdDetail::FibreChannel {
                port_name: array_at(rec, 8),
            },
            TRANSPORT_ID_MIN_LEN,
        ),
        ProtocolId::ParallelScsi => (
            TransportIdDetail::ParallelScsi {
                scsi_address: be16_at(rec, 2),
                relative_port: be16_at(rec, 6),
            },
            TRANSPORT_ID_MIN_LEN,
        ),
        ProtocolId::Ieee1394 => (
            TransportIdDetail::Ieee1394 {
                eui64: array_at(rec, 8),
            },
            TRANSPORT_ID_MIN_LEN,
        ),
        ProtocolId::Rdma => (
            TransportIdDetail::Rdma {
                port_id: array_at(rec, 8),
            },
            TRANSPORT_ID_MIN_LEN,
        ),
        ProtocolId::Iscsi => {
            let num = be16_at(rec, 2) as usize;
            let avail = rec.len().saturating_sub(4).min(num);
            let text = rec.get(4..4 + avail).unwrap_or_default().to_vec();
            let detail = match format_code {
                0 => TransportIdDetail::IscsiName { name: text },
                1 => TransportIdDetail::IscsiPortId { port_id: text },
                _ => TransportIdDetail::Opaque {
                    dump_len: (num + 4).min(rec.len()),
                },
            };
            (detail, (num + 4).max(TRANSPORT_ID_MIN_LEN))
        },
        ProtocolId::Sas => (
            TransportIdDetail::Sas {
                address: u64::from_be_bytes(array_at(rec, 4)),
            },
            TRANSPORT_ID_MIN_LEN,
        ),
        ProtocolId::Ssa | ProtocolId::Adt | ProtocolId::Atapi => (
            TransportIdDetail::Opaque {
                dump_len: fixed_dump,
            },
            TRANSPORT_ID_MIN_LEN,
        ),
        ProtocolId::Unknown(code) => {
            warn!(proto_id = code, format_code, "unknown TransportID protocol id");
            (
                TransportIdDetail::Opaque {
                    dump_len: fixed_dump,
                },
                TRANSPORT_ID_MIN_LEN,
            )
        },
    };

    let raw = rec[..rec.len().min(length)].to_vec();
    let tid = TransportId {
        offset,
        format_code,
        protocol,
        detail,
        length,
        raw,
    };
    if tid.has_unexpected_format() {
        debug!(?protocol, format_code, "unexpected TransportID format code");
    }
    tid
}

/// `true` when a TransportID area length is at least 24 and a multiple of 4.
#[inline]
pub fn transport_id_length_conforms(len: usize) -> bool {
    len >= TRANSPORT_ID_MIN_LEN && len % 4 == 0
}

/// Lazy scan over consecutive TransportIDs.
///
/// Created by [`decode_transport_ids`]; consumed once.
#[derive(Debug)]
pub struct TransportIdIter<'a> {
    region: &'a [u8],
    declared: usize,
    offset: usize,
}

impl TransportIdIter<'_> {
    /// Whether the declared length is well formed (see
    /// [`transport_id_length_conforms`]).
    pub fn length_conforms(&self) -> bool {
        transport_id_length_conforms(self.declared)
    }

    /// `true` if the declared length ran past the supplied buffer.
    pub fn is_clamped(&self) -> bool {
        self.region.len() < self.declared
    }
}

impl Iterator for TransportIdIter<'_> {
    type Item = TransportId;

    fn next(&mut self) -> Option<TransportId> {
        if self.offset >= self.region.len() {
            return None;
        }
        let tid = decode_one(&self.region[self.offset..], self.offset);
        self.offset = self.offset.saturating_add(tid.length);
        Some(tid)
    }
}

impl FusedIterator for TransportIdIter<'_> {}

/// Scan `declared_len` bytes of TransportIDs from the start of `buf`.
///
/// A declared length below 24 or not a multiple of 4 is tolerated and only
/// reported; a declared length past `buf` is clamped to `buf.len()`.
pub fn decode_transport_ids(buf: &[u8], declared_len: usize) -> TransportIdIter<'_> {
    let it = TransportIdIter {
        region: &buf[..declared_len.min(buf.len())],
        declared: declared_len,
        offset: 0,
    };
    if !it.length_conforms() {
        warn!(
            length = declared_len,
            "TransportID area short or not a multiple of 4"
        );
    }
    if it.is_clamped() {
        warn!(
            declared = declared_len,
            available = it.region.len(),
            "TransportID area truncated to buffer"
        );
    }
    it
}

/// Length a record of `n` caller bytes occupies in a PR-Out parameter list.
#[inline]
pub fn normalized_len(n: usize) -> usize {
    if n < TRANSPORT_ID_MIN_LEN {
        TRANSPORT_ID_MIN_LEN
    } else {
        n.next_multiple_of(4)
    }
}

/// A caller-supplied TransportID ready for a PR-Out parameter list.
///
/// Bytes are taken as given and zero padded to [`normalized_len`].
#[derive(Clone, PartialEq, Eq)]
pub struct TransportIdRecord(Vec<u8>);

impl TransportIdRecord {
    pub fn from_bytes(mut bytes: Vec<u8>) -> Self {
        let len = normalized_len(bytes.len());
        bytes.resize(len, 0);
        TransportIdRecord(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode this record the way a device would report it.
    pub fn decode(&self) -> Option<TransportId> {
        decode_transport_ids(&self.0, self.0.len()).next()
    }
}

impl fmt::Debug for TransportIdRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransportIdRecord({})", hex::encode(&self.0))
    }
}

/// Concatenate records as they appear in a parameter list.
pub fn serialize_records(records: &[TransportIdRecord]) -> Vec<u8> {
    let total = records.iter().map(TransportIdRecord::len).sum();
    let mut out = Vec::with_capacity(total);
    for r in records {
        out.extend_from_slice(r.as_bytes());
    }
    out
}

const INDENT: &str = "        ";

fn write_unexpected_format(f: &mut fmt::Formatter<'_>, tid: &TransportId) -> fmt::Result {
    if tid.has_unexpected_format() {
        writeln!(f, "{INDENT}[Unexpected format code: {}]", tid.format_code)?;
    }
    Ok(())
}

/// Multi-line, indented rendering used in reports.
impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            TransportIdDetail::FibreChannel { port_name } => {
                writeln!(f, "{INDENT}FCP-2 World Wide Name:")?;
                write_unexpected_format(f, self)?;
                f.write_str(&hex_dump(port_name, INDENT))
            },
            TransportIdDetail::ParallelScsi {
                scsi_address,
                relative_port,
            } => {
                writeln!(
                    f,
                    "{INDENT}Parallel SCSI initiator SCSI address: 0x{scsi_address:x}"
                )?;
                write_unexpected_format(f, self)?;
                writeln!(
                    f,
                    "{INDENT}relative port number (of target): 0x{relative_port:x}"
                )
            },
            TransportIdDetail::Ieee1394 { eui64 } => {
                writeln!(f, "{INDENT}IEEE 1394 EUI-64 name:")?;
                write_unexpected_format(f, self)?;
                f.write_str(&hex_dump(eui64, INDENT))
            },
            TransportIdDetail::Rdma { port_id } => {
                writeln!(f, "{INDENT}RDMA initiator port identifier:")?;
                write_unexpected_format(f, self)?;
                f.write_str(&hex_dump(port_id, INDENT))
            },
            TransportIdDetail::IscsiName { name } => {
                writeln!(f, "{INDENT}iSCSI name: {}", ascii_lossy(name))
            },
            TransportIdDetail::IscsiPortId { port_id } => writeln!(
                f,
                "{INDENT}iSCSI world wide unique port id: {}",
                ascii_lossy(port_id)
            ),
            TransportIdDetail::Sas { address } => {
                writeln!(f, "{INDENT}SAS address: 0x{address:x}")?;
                write_unexpected_format(f, self)
            },
            TransportIdDetail::Opaque { dump_len } => {
                let dump = &self.raw[..(*dump_len).min(self.raw.len())];
                match self.protocol {
                    ProtocolId::Ssa => {
                        writeln!(f, "{INDENT}SSA (transport id not defined):")?;
                        writeln!(f, "{INDENT}format code: {}", self.format_code)?;
                    },
                    ProtocolId::Adt => {
                        writeln!(f, "{INDENT}ADT:")?;
                        writeln!(f, "{INDENT}format code: {}", self.format_code)?;
                    },
                    ProtocolId::Atapi => {
                        writeln!(f, "{INDENT}ATAPI:")?;
                        writeln!(f, "{INDENT}format code: {}", self.format_code)?;
                    },
                    ProtocolId::Iscsi => {
                        writeln!(f, "{INDENT}iSCSI ")?;
                        write_unexpected_format(f, self)?;
                    },
                    other => {
                        writeln!(
                            f,
                            "{INDENT}unknown protocol id=0x{:x}  format_code={}",
                            other.code(),
                            self.format_code
                        )?;
                    },
                }
                f.write_str(&hex_dump(dump, INDENT))
            },
        }
    }
}
