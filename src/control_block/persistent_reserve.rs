// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PERSISTENT RESERVE IN (0x5E) / OUT (0x5F): 10-byte CDB builders.
//!
//! CDB layout (SPC-3):
//!   [0]    = opcode (0x5E / 0x5F)
//!   [1]    = SERVICE ACTION (bits 4..0)
//!   [2]    = PR-Out only: SCOPE (bits 7..4) | TYPE (bits 3..0)
//!   [3..7] = reserved
//!   [7..9] = ALLOCATION LENGTH (PR-In) / PARAMETER LIST LENGTH (PR-Out), BE
//!   [9]    = CONTROL
//!
//! Scope is always LU_SCOPE; no caller needs element scope.

use core::fmt;

use crate::{
    error::{PrError, Result},
    models::{
        reservation_type::{LU_SCOPE, ReservationType},
        service_action::{PrInAction, PrOutAction, SERVICE_ACTION_MASK},
    },
};

pub const PERSISTENT_RESERVE_IN: u8 = 0x5E;
pub const PERSISTENT_RESERVE_OUT: u8 = 0x5F;
pub const PRINOUT_CMD_LEN: usize = 10;

/// A complete PR-In or PR-Out CDB.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommandBlock([u8; PRINOUT_CMD_LEN]);

impl CommandBlock {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; PRINOUT_CMD_LEN] {
        &self.0
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn service_action(&self) -> u8 {
        self.0[1] & SERVICE_ACTION_MASK
    }

    #[inline]
    pub fn scope(&self) -> u8 {
        (self.0[2] >> 4) & 0x0f
    }

    #[inline]
    pub fn pr_type(&self) -> u8 {
        self.0[2] & 0x0f
    }

    /// Allocation length (PR-In) or parameter list length (PR-Out).
    #[inline]
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.0[7], self.0[8]])
    }

    pub fn is_prin(&self) -> bool {
        self.opcode() == PERSISTENT_RESERVE_IN
    }
}

impl AsRef<[u8]> for CommandBlock {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CommandBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandBlock({self})")
    }
}

/// Space separated hex bytes, e.g. `5e 00 00 00 00 00 00 20 00 00`.
impl fmt::Display for CommandBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for b in &self.0 {
            write!(f, "{sep}{b:02x}")?;
            sep = " ";
        }
        Ok(())
    }
}

fn check_service_action(sa: u8) -> Result<()> {
    if sa > SERVICE_ACTION_MASK {
        return Err(PrError::invalid(format!(
            "service action 0x{sa:02x} does not fit in 5 bits"
        )));
    }
    Ok(())
}

fn check_length(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| PrError::invalid(format!("{what} {len} exceeds 0xffff")))
}

/// Build a PERSISTENT RESERVE IN CDB from a raw service action code.
pub fn encode_prin(service_action: u8, allocation_length: usize) -> Result<CommandBlock> {
    check_service_action(service_action)?;
    let alloc = check_length(allocation_length, "allocation length")?;

    let mut cdb = [0u8; PRINOUT_CMD_LEN];
    cdb[0] = PERSISTENT_RESERVE_IN;
    cdb[1] = service_action & SERVICE_ACTION_MASK;
    cdb[7..9].copy_from_slice(&alloc.to_be_bytes());
    Ok(CommandBlock(cdb))
}

/// Build a PERSISTENT RESERVE OUT CDB from raw service action and type codes.
pub fn encode_prout(
    service_action: u8,
    pr_type: u8,
    parameter_length: usize,
) -> Result<CommandBlock> {
    check_service_action(service_action)?;
    if pr_type > 0x0f {
        return Err(PrError::invalid(format!(
            "reservation type 0x{pr_type:02x} does not fit in 4 bits"
        )));
    }
    let plen = check_length(parameter_length, "parameter list length")?;

    let mut cdb = [0u8; PRINOUT_CMD_LEN];
    cdb[0] = PERSISTENT_RESERVE_OUT;
    cdb[1] = service_action & SERVICE_ACTION_MASK;
    cdb[2] = (LU_SCOPE << 4) | pr_type;
    cdb[7..9].copy_from_slice(&plen.to_be_bytes());
    Ok(CommandBlock(cdb))
}

impl PrInAction {
    /// Convenience: CDB for this action.
    pub fn command_block(self, allocation_length: usize) -> Result<CommandBlock> {
        encode_prin(self.code(), allocation_length)
    }
}

impl PrOutAction {
    /// Convenience: CDB for this action.
    pub fn command_block(
        self,
        pr_type: ReservationType,
        parameter_length: usize,
    ) -> Result<CommandBlock> {
        encode_prout(self.code(), pr_type.code(), parameter_length)
    }
}
