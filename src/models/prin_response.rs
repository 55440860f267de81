// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PERSISTENT RESERVE IN parameter data decoding.
//!
//! All service actions except REPORT CAPABILITIES share an 8-byte header:
//!   [0..4] PRgeneration (BE)
//!   [4..8] ADDITIONAL LENGTH (BE), payload bytes starting at offset 8
//!
//! Payloads:
//! - READ KEYS           : packed 8-byte keys
//! - READ RESERVATION    : nothing, or one 16-byte reservation descriptor
//! - READ FULL STATUS    : variable length descriptors, each carrying a
//!   TransportID of the registered I_T nexus
//! - REPORT CAPABILITIES : fixed 8-byte structure, no header
//!
//! An ADDITIONAL LENGTH beyond the buffer is clamped to the buffer; the
//! clamp is recorded as a [`Truncation`] on the result.

use core::fmt;

use bitflags::bitflags;
use tracing::warn;
use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{BigEndian, U16, U32, U64},
};

use crate::{
    error::{PrError, Result},
    models::{
        reservation_type::{ReservationType, Scope, split_scope_type},
        service_action::PrInAction,
        transport_id::{TransportId, decode_transport_ids, transport_id_length_conforms},
    },
};

pub const PRIN_HEADER_LEN: usize = 8;
pub const RESERVATION_DESC_LEN: usize = 16;
pub const FULL_STATUS_DESC_LEN: usize = 24;
pub const CAPABILITIES_LEN: usize = 8;

/// Common 8-byte PR-In header.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
pub struct PrInHeaderRaw {
    pub generation: U32<BigEndian>,
    pub additional_length: U32<BigEndian>,
}

/// READ RESERVATION descriptor.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
pub struct ReservationDescriptorRaw {
    pub key: U64<BigEndian>,
    pub obsolete: [u8; 4],
    pub reserved: u8,
    /// SCOPE (7..4) | TYPE (3..0)
    pub scope_type: u8,
    pub obsolete2: [u8; 2],
}

/// Fixed head of a READ FULL STATUS descriptor.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
pub struct FullStatusDescriptorRaw {
    pub key: U64<BigEndian>,
    pub reserved: [u8; 4],
    /// ALL_TG_PT (bit 1) | R_HOLDER (bit 0)
    pub flags: u8,
    pub scope_type: u8,
    pub reserved2: [u8; 4],
    pub relative_target_port: U16<BigEndian>,
    pub additional_desc_len: U32<BigEndian>,
}

/// REPORT CAPABILITIES parameter data.
#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Debug)]
pub struct CapabilitiesRaw {
    pub length: U16<BigEndian>,
    pub flags: [u8; 2],
    pub type_mask: [u8; 2],
    pub reserved: [u8; 2],
}

const FS_ALL_TG_PT: u8 = 0x02;
const FS_R_HOLDER: u8 = 0x01;

bitflags! {
    /// Bytes 2..4 of REPORT CAPABILITIES as one big-endian word.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u16 {
        /// Compatible Reservation Handling
        const CRH    = 0x1000;
        /// Specify Initiator Ports Capable
        const SIP_C  = 0x0800;
        /// All Target Ports Capable
        const ATP_C  = 0x0400;
        /// Persist Through Power Loss Capable
        const PTPL_C = 0x0100;
        /// Type Mask Valid
        const TMV    = 0x0080;
        /// Persist Through Power Loss Activated
        const PTPL_A = 0x0001;
    }
}

bitflags! {
    /// PERSISTENT RESERVATION TYPE MASK, bytes 4..6 as one big-endian word.
    ///
    /// The bit positions are not ordered by type code.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct TypeMask: u16 {
        /// WR_EX_AR, byte 4 bit 7
        const WRITE_EXCLUSIVE_ALL_REGISTRANTS   = 0x8000;
        /// EX_AC_RO, byte 4 bit 6
        const EXCLUSIVE_ACCESS_REGISTRANTS_ONLY = 0x4000;
        /// WR_EX_RO, byte 4 bit 5
        const WRITE_EXCLUSIVE_REGISTRANTS_ONLY  = 0x2000;
        /// EX_AC, byte 4 bit 3
        const EXCLUSIVE_ACCESS                  = 0x0800;
        /// WR_EX, byte 4 bit 1
        const WRITE_EXCLUSIVE                   = 0x0200;
        /// EX_AC_AR, byte 5 bit 0
        const EXCLUSIVE_ACCESS_ALL_REGISTRANTS  = 0x0001;
    }
}

/// Report order of the type mask entries.
static TYPE_MASK_TABLE: [(ReservationType, TypeMask); 6] = [
    (
        ReservationType::WriteExclusiveAllRegistrants,
        TypeMask::WRITE_EXCLUSIVE_ALL_REGISTRANTS,
    ),
    (
        ReservationType::ExclusiveAccessRegistrantsOnly,
        TypeMask::EXCLUSIVE_ACCESS_REGISTRANTS_ONLY,
    ),
    (
        ReservationType::WriteExclusiveRegistrantsOnly,
        TypeMask::WRITE_EXCLUSIVE_REGISTRANTS_ONLY,
    ),
    (ReservationType::ExclusiveAccess, TypeMask::EXCLUSIVE_ACCESS),
    (ReservationType::WriteExclusive, TypeMask::WRITE_EXCLUSIVE),
    (
        ReservationType::ExclusiveAccessAllRegistrants,
        TypeMask::EXCLUSIVE_ACCESS_ALL_REGISTRANTS,
    ),
];

impl TypeMask {
    /// Mask bit for a reservation type; obsolete types have none.
    pub fn for_type(t: ReservationType) -> Option<TypeMask> {
        TYPE_MASK_TABLE
            .iter()
            .find(|(ty, _)| *ty == t)
            .map(|(_, bit)| *bit)
    }

    pub fn supports(&self, t: ReservationType) -> bool {
        Self::for_type(t).is_some_and(|bit| self.contains(bit))
    }

    /// `(type, supported)` pairs in report order.
    pub fn entries(&self) -> impl Iterator<Item = (ReservationType, bool)> + '_ {
        TYPE_MASK_TABLE
            .iter()
            .map(move |(ty, bit)| (*ty, self.contains(*bit)))
    }
}

/// ADDITIONAL LENGTH ran past the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    pub declared: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyList {
    pub generation: u32,
    pub additional_length: u32,
    pub keys: Vec<u64>,
    pub truncation: Option<Truncation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationDescriptor {
    pub key: u64,
    pub scope: Scope,
    pub pr_type: ReservationType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationStatus {
    pub generation: u32,
    pub additional_length: u32,
    /// `None`: no reservation is held.
    pub reservation: Option<ReservationDescriptor>,
    pub truncation: Option<Truncation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub length: u16,
    pub flags: CapabilityFlags,
    /// Present only when TMV is set.
    pub type_mask: Option<TypeMask>,
}

impl Capabilities {
    pub fn crh(&self) -> bool {
        self.flags.contains(CapabilityFlags::CRH)
    }

    pub fn sip_c(&self) -> bool {
        self.flags.contains(CapabilityFlags::SIP_C)
    }

    pub fn atp_c(&self) -> bool {
        self.flags.contains(CapabilityFlags::ATP_C)
    }

    pub fn ptpl_c(&self) -> bool {
        self.flags.contains(CapabilityFlags::PTPL_C)
    }

    pub fn tmv(&self) -> bool {
        self.flags.contains(CapabilityFlags::TMV)
    }

    pub fn ptpl_a(&self) -> bool {
        self.flags.contains(CapabilityFlags::PTPL_A)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullStatusDescriptor {
    pub key: u64,
    /// Scope and type, only for the reservation holder.
    pub holding: Option<(Scope, ReservationType)>,
    pub all_tg_pt: bool,
    /// Only when ALL_TG_PT is clear.
    pub relative_target_port: Option<u16>,
    /// ADDITIONAL DESCRIPTOR LENGTH as reported.
    pub transport_id_length: u32,
    pub transport_ids: Vec<TransportId>,
}

impl FullStatusDescriptor {
    pub fn is_holder(&self) -> bool {
        self.holding.is_some()
    }

    /// The registrant's TransportID.
    pub fn transport_id(&self) -> Option<&TransportId> {
        self.transport_ids.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullStatusList {
    pub generation: u32,
    pub additional_length: u32,
    pub descriptors: Vec<FullStatusDescriptor>,
    pub truncation: Option<Truncation>,
}

/// Decoded PR-In response, one variant per service action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrInResult {
    KeyList(KeyList),
    Reservation(ReservationStatus),
    Capabilities(Capabilities),
    FullStatusList(FullStatusList),
}

impl PrInResult {
    pub fn service_action(&self) -> PrInAction {
        match self {
            PrInResult::KeyList(_) => PrInAction::ReadKeys,
            PrInResult::Reservation(_) => PrInAction::ReadReservation,
            PrInResult::Capabilities(_) => PrInAction::ReportCapabilities,
            PrInResult::FullStatusList(_) => PrInAction::ReadFullStatus,
        }
    }

    pub fn generation(&self) -> Option<u32> {
        match self {
            PrInResult::KeyList(k) => Some(k.generation),
            PrInResult::Reservation(r) => Some(r.generation),
            PrInResult::Capabilities(_) => None,
            PrInResult::FullStatusList(f) => Some(f.generation),
        }
    }

    pub fn truncation(&self) -> Option<Truncation> {
        match self {
            PrInResult::KeyList(k) => k.truncation,
            PrInResult::Reservation(r) => r.truncation,
            PrInResult::Capabilities(_) => None,
            PrInResult::FullStatusList(f) => f.truncation,
        }
    }
}

struct Payload<'a> {
    generation: u32,
    additional_length: u32,
    data: &'a [u8],
    truncation: Option<Truncation>,
}

fn split_payload(buf: &[u8]) -> Result<Payload<'_>> {
    let (hdr, rest) = PrInHeaderRaw::ref_from_prefix(buf).map_err(|_| {
        PrError::malformed_response(format!(
            "PR-In response needs >= {PRIN_HEADER_LEN} bytes, got {}",
            buf.len()
        ))
    })?;
    let additional_length = hdr.additional_length.get();
    let declared = additional_length as usize;
    let truncation = (declared > rest.len()).then(|| {
        warn!(
            declared,
            available = rest.len(),
            "Additional length too large, truncating"
        );
        Truncation {
            declared,
            available: rest.len(),
        }
    });
    Ok(Payload {
        generation: hdr.generation.get(),
        additional_length,
        data: &rest[..declared.min(rest.len())],
        truncation,
    })
}

fn decode_keys(buf: &[u8]) -> Result<KeyList> {
    let p = split_payload(buf)?;
    let keys = p
        .data
        .chunks_exact(8)
        .filter_map(|c| U64::<BigEndian>::read_from_bytes(c).ok())
        .map(|k| k.get())
        .collect();
    Ok(KeyList {
        generation: p.generation,
        additional_length: p.additional_length,
        keys,
        truncation: p.truncation,
    })
}

fn decode_reservation(buf: &[u8]) -> Result<ReservationStatus> {
    let p = split_payload(buf)?;
    // The descriptor count is ADDITIONAL LENGTH / 16, so 1..=15 holds none.
    let reservation = if (p.additional_length as usize) < RESERVATION_DESC_LEN {
        None
    } else {
        let mut desc = [0u8; RESERVATION_DESC_LEN];
        let n = p.data.len().min(RESERVATION_DESC_LEN);
        desc[..n].copy_from_slice(&p.data[..n]);
        let raw = ReservationDescriptorRaw::read_from_bytes(&desc).map_err(|_| {
            PrError::malformed_response("reservation descriptor layout mismatch")
        })?;
        let (scope, pr_type) = split_scope_type(raw.scope_type);
        Some(ReservationDescriptor {
            key: raw.key.get(),
            scope,
            pr_type,
        })
    };
    Ok(ReservationStatus {
        generation: p.generation,
        additional_length: p.additional_length,
        reservation,
        truncation: p.truncation,
    })
}

fn decode_capabilities(buf: &[u8]) -> Result<Capabilities> {
    let (raw, _) = CapabilitiesRaw::ref_from_prefix(buf).map_err(|_| {
        PrError::malformed_response(format!(
            "Report Capabilities response needs {CAPABILITIES_LEN} bytes, got {}",
            buf.len()
        ))
    })?;
    if raw.length.get() & 0xff != CAPABILITIES_LEN as u16 {
        return Err(PrError::malformed_response(format!(
            "unexpected Report Capabilities length byte {}",
            raw.length.get() & 0xff
        )));
    }
    let flags = CapabilityFlags::from_bits_truncate(u16::from_be_bytes(raw.flags));
    let type_mask = flags
        .contains(CapabilityFlags::TMV)
        .then(|| TypeMask::from_bits_truncate(u16::from_be_bytes(raw.type_mask)));
    Ok(Capabilities {
        length: raw.length.get(),
        flags,
        type_mask,
    })
}

fn decode_full_status(buf: &[u8]) -> Result<FullStatusList> {
    let p = split_payload(buf)?;
    let mut descriptors = Vec::new();
    let mut off = 0usize;
    while off < p.data.len() {
        let Ok((raw, rest)) = FullStatusDescriptorRaw::ref_from_prefix(&p.data[off..]) else {
            warn!(
                offset = off,
                remaining = p.data.len() - off,
                "full status descriptor cut short, stopping"
            );
            break;
        };
        let tid_len = raw.additional_desc_len.get();
        let all_tg_pt = raw.flags & FS_ALL_TG_PT != 0;
        let holding = (raw.flags & FS_R_HOLDER != 0).then(|| split_scope_type(raw.scope_type));
        let transport_ids = if tid_len > 0 {
            decode_transport_ids(rest, tid_len as usize).collect()
        } else {
            Vec::new()
        };
        descriptors.push(FullStatusDescriptor {
            key: raw.key.get(),
            holding,
            all_tg_pt,
            relative_target_port: (!all_tg_pt).then(|| raw.relative_target_port.get()),
            transport_id_length: tid_len,
            transport_ids,
        });
        off = off
            .saturating_add(FULL_STATUS_DESC_LEN)
            .saturating_add(tid_len as usize);
    }
    Ok(FullStatusList {
        generation: p.generation,
        additional_length: p.additional_length,
        descriptors,
        truncation: p.truncation,
    })
}

/// Decode a PR-In response for `action`.
///
/// Clamping an oversized ADDITIONAL LENGTH is not an error; see
/// [`PrInResult::truncation`] or use [`decode_prin_strict`].
pub fn decode_prin(action: PrInAction, buf: &[u8]) -> Result<PrInResult> {
    Ok(match action {
        PrInAction::ReadKeys => PrInResult::KeyList(decode_keys(buf)?),
        PrInAction::ReadReservation => PrInResult::Reservation(decode_reservation(buf)?),
        PrInAction::ReportCapabilities => {
            PrInResult::Capabilities(decode_capabilities(buf)?)
        },
        PrInAction::ReadFullStatus => PrInResult::FullStatusList(decode_full_status(buf)?),
    })
}

/// Like [`decode_prin`] but a clamped ADDITIONAL LENGTH is an error.
pub fn decode_prin_strict(action: PrInAction, buf: &[u8]) -> Result<PrInResult> {
    let res = decode_prin(action, buf)?;
    match res.truncation() {
        Some(t) => Err(PrError::Truncated {
            declared: t.declared,
            available: t.available,
        }),
        None => Ok(res),
    }
}

fn write_scope_type(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    scope: Scope,
    pr_type: ReservationType,
) -> fmt::Result {
    match scope {
        Scope::LogicalUnit => write!(f, "{indent}scope: LU_SCOPE, ")?,
        Scope::Other(v) => write!(f, "{indent}scope: {v} ")?,
    }
    writeln!(f, " type: {pr_type}")
}

impl fmt::Display for KeyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  PR generation=0x{:x}, ", self.generation)?;
        match self.keys.len() {
            0 => return writeln!(f, "there are NO registered reservation keys"),
            1 => writeln!(f, "1 registered reservation key follows:")?,
            n => writeln!(f, "{n} registered reservation keys follow:")?,
        }
        for k in &self.keys {
            writeln!(f, "    0x{k:x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  PR generation=0x{:x}, ", self.generation)?;
        match &self.reservation {
            None => writeln!(f, "there is NO reservation held"),
            Some(r) => {
                writeln!(f, "Reservation follows:")?;
                writeln!(f, "    Key=0x{:x}", r.key)?;
                write_scope_type(f, "    ", r.scope, r.pr_type)
            },
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = |v: bool| v as u8;
        writeln!(f, "Report capabilities response:")?;
        writeln!(f, "  Compatible Reservation handling(CRH): {}", b(self.crh()))?;
        writeln!(f, "  Specify Initiator Ports capable(SIP_C): {}", b(self.sip_c()))?;
        writeln!(f, "  All target ports capable(ATP_C): {}", b(self.atp_c()))?;
        writeln!(
            f,
            "  Persist Through Power Loss capable(PTPL_C): {}",
            b(self.ptpl_c())
        )?;
        writeln!(f, "  Type Mask Valid(TMV): {}", b(self.tmv()))?;
        writeln!(
            f,
            "  Persist Through Power Loss active(PTPL_A): {}",
            b(self.ptpl_a())
        )?;
        if let Some(mask) = &self.type_mask {
            writeln!(f, "    Support indicated in Type mask:")?;
            for (ty, on) in mask.entries() {
                writeln!(f, "      {ty}: {}", b(on))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for FullStatusDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Key=0x{:x}", self.key)?;
        match self.relative_target_port {
            None => writeln!(f, "      All target ports bit set")?,
            Some(port) => {
                writeln!(f, "      All target ports bit clear")?;
                writeln!(f, "      Relative port address: 0x{port:x}")?;
            },
        }
        match self.holding {
            Some((scope, pr_type)) => {
                writeln!(f, "      << Reservation holder >>")?;
                write_scope_type(f, "      ", scope, pr_type)?;
            },
            None => writeln!(f, "      not reservation holder")?,
        }
        let len = self.transport_id_length as usize;
        for tid in &self.transport_ids {
            if transport_id_length_conforms(len) {
                writeln!(f, "      Transport Id of initiator:")?;
            } else {
                writeln!(
                    f,
                    "      Transport Id short or not multiple of 4 [length={len}]:"
                )?;
            }
            write!(f, "{tid}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FullStatusList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  PR generation=0x{:x}", self.generation)?;
        for d in &self.descriptors {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PrInResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrInResult::KeyList(v) => v.fmt(f),
            PrInResult::Reservation(v) => v.fmt(f),
            PrInResult::Capabilities(v) => v.fmt(f),
            PrInResult::FullStatusList(v) => v.fmt(f),
        }
    }
}
