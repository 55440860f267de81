// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PERSISTENT RESERVE OUT parameter lists.
//!
//! Basic layout (all service actions except REGISTER AND MOVE):
//!   [0..8]   RESERVATION KEY (BE)
//!   [8..16]  SERVICE ACTION RESERVATION KEY (BE)
//!   [16..20] obsolete
//!   [20]     SPEC_I_PT (bit 3) | ALL_TG_PT (bit 2) | APTPL (bit 0)
//!   [21..24] reserved / obsolete
//!   [24..28] TRANSPORTID PARAMETER DATA LENGTH (BE, only with SPEC_I_PT)
//!   [28..]   TransportIDs
//!
//! REGISTER AND MOVE layout:
//!   [0..16]  keys as above
//!   [16]     reserved
//!   [17]     UNREG (bit 1) | APTPL (bit 0)
//!   [18..20] RELATIVE TARGET PORT IDENTIFIER (BE)
//!   [20..24] TRANSPORTID PARAMETER DATA LENGTH (BE)
//!   [24..]   exactly one TransportID

use bitflags::bitflags;

use crate::{
    error::{PrError, Result},
    models::{
        service_action::PrOutAction,
        transport_id::{TransportIdRecord, serialize_records},
    },
};

/// Fixed part of both parameter list layouts.
pub const PROUT_BASE_LEN: usize = 24;

bitflags! {
    /// Byte 20 of the basic parameter list.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ProutFlags: u8 {
        const SPEC_I_PT = 0x08;
        const ALL_TG_PT = 0x04;
        const APTPL     = 0x01;
    }
}

bitflags! {
    /// Byte 17 of the REGISTER AND MOVE parameter list.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct RegisterMoveFlags: u8 {
        const UNREG = 0x02;
        const APTPL = 0x01;
    }
}

fn write_keys(buf: &mut [u8], key: u64, service_action_key: u64) {
    buf[0..8].copy_from_slice(&key.to_be_bytes());
    buf[8..16].copy_from_slice(&service_action_key.to_be_bytes());
}

/// TRANSPORTID PARAMETER DATA LENGTH. Lists long enough to overflow it can
/// never fit the 16-bit PARAMETER LIST LENGTH of the CDB, which rejects them.
fn tid_len_field(len: usize) -> [u8; 4] {
    (len as u32).to_be_bytes()
}

/// Build the basic parameter list. SPEC_I_PT is set iff `transport_ids` is
/// non-empty.
pub fn build_register_params(
    key: u64,
    service_action_key: u64,
    all_tg_pt: bool,
    aptpl: bool,
    transport_ids: &[TransportIdRecord],
) -> Vec<u8> {
    let tids = serialize_records(transport_ids);
    let len = if tids.is_empty() {
        PROUT_BASE_LEN
    } else {
        PROUT_BASE_LEN + 4 + tids.len()
    };
    let mut buf = vec![0u8; len];
    write_keys(&mut buf, key, service_action_key);

    let mut flags = ProutFlags::empty();
    flags.set(ProutFlags::ALL_TG_PT, all_tg_pt);
    flags.set(ProutFlags::APTPL, aptpl);
    if !tids.is_empty() {
        flags |= ProutFlags::SPEC_I_PT;
        buf[24..28].copy_from_slice(&tid_len_field(tids.len()));
        buf[28..].copy_from_slice(&tids);
    }
    buf[20] = flags.bits();
    buf
}

/// Build the REGISTER AND MOVE parameter list.
pub fn build_register_move_params(
    key: u64,
    service_action_key: u64,
    unregister: bool,
    aptpl: bool,
    relative_port: u16,
    transport_ids: &[TransportIdRecord],
) -> Result<Vec<u8>> {
    let [tid] = transport_ids else {
        return Err(PrError::invalid(
            "register-and-move requires exactly one transport id",
        ));
    };
    let mut buf = vec![0u8; PROUT_BASE_LEN + tid.len()];
    write_keys(&mut buf, key, service_action_key);

    let mut flags = RegisterMoveFlags::empty();
    flags.set(RegisterMoveFlags::UNREG, unregister);
    flags.set(RegisterMoveFlags::APTPL, aptpl);
    buf[17] = flags.bits();
    buf[18..20].copy_from_slice(&relative_port.to_be_bytes());
    buf[20..24].copy_from_slice(&tid_len_field(tid.len()));
    buf[24..].copy_from_slice(tid.as_bytes());
    Ok(buf)
}

/// Everything a PR-Out parameter list can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrOutParameters {
    pub reservation_key: u64,
    pub service_action_key: u64,
    pub all_tg_pt: bool,
    pub aptpl: bool,
    /// REGISTER AND MOVE only.
    pub unregister: bool,
    /// REGISTER AND MOVE only.
    pub relative_target_port: u16,
    pub transport_ids: Vec<TransportIdRecord>,
}

impl PrOutParameters {
    pub fn new(reservation_key: u64, service_action_key: u64) -> Self {
        Self {
            reservation_key,
            service_action_key,
            ..Default::default()
        }
    }

    /// Serialise for `action`, choosing the register-and-move layout when
    /// needed.
    pub fn build(&self, action: PrOutAction) -> Result<Vec<u8>> {
        match action {
            PrOutAction::RegisterAndMove => build_register_move_params(
                self.reservation_key,
                self.service_action_key,
                self.unregister,
                self.aptpl,
                self.relative_target_port,
                &self.transport_ids,
            ),
            _ => Ok(build_register_params(
                self.reservation_key,
                self.service_action_key,
                self.all_tg_pt,
                self.aptpl,
                &self.transport_ids,
            )),
        }
    }
}
