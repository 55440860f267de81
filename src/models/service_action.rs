// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! PERSISTENT RESERVE IN / OUT service action codes (SPC-3 §6.11, §6.12).
//!
//! A request is either one PR-In action or one PR-Out action; the
//! [`ServiceAction`] sum type makes "both" unrepresentable.

use core::fmt;

use crate::error::{PrError, Result};

/// Mask of the SERVICE ACTION field in CDB byte 1.
pub const SERVICE_ACTION_MASK: u8 = 0x1f;

static PRIN_SA_NAMES: [&str; 8] = [
    "Read keys",
    "Read reservation",
    "Report capabilities",
    "Read full status",
    "[reserved 0x4]",
    "[reserved 0x5]",
    "[reserved 0x6]",
    "[reserved 0x7]",
];

static PROUT_SA_NAMES: [&str; 9] = [
    "Register",
    "Reserve",
    "Release",
    "Clear",
    "Preempt",
    "Preempt and abort",
    "Register and ignore existing key",
    "Register and move",
    "[reserved 0x8]",
];

/// Name of a raw PR-In service action code, `"??"` past the table.
pub fn prin_sa_name(code: u8) -> &'static str {
    PRIN_SA_NAMES.get(code as usize).copied().unwrap_or("??")
}

/// Name of a raw PR-Out service action code, `"??"` past the table.
pub fn prout_sa_name(code: u8) -> &'static str {
    PROUT_SA_NAMES.get(code as usize).copied().unwrap_or("??")
}

/// PERSISTENT RESERVE IN service actions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrInAction {
    ReadKeys = 0x00,
    ReadReservation = 0x01,
    ReportCapabilities = 0x02,
    ReadFullStatus = 0x03,
}

/// PERSISTENT RESERVE OUT service actions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrOutAction {
    Register = 0x00,
    Reserve = 0x01,
    Release = 0x02,
    Clear = 0x03,
    Preempt = 0x04,
    PreemptAndAbort = 0x05,
    RegisterIgnoreExisting = 0x06,
    RegisterAndMove = 0x07,
}

impl PrInAction {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        prin_sa_name(self.code())
    }
}

impl PrOutAction {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        prout_sa_name(self.code())
    }

    /// Actions whose TYPE field selects the reservation being acted upon;
    /// issuing them with type 0 is almost certainly a mistake.
    pub fn uses_type(self) -> bool {
        matches!(
            self,
            PrOutAction::Reserve
                | PrOutAction::Release
                | PrOutAction::Preempt
                | PrOutAction::PreemptAndAbort
        )
    }

    /// Actions that may carry TransportIDs in their parameter list.
    pub fn accepts_transport_ids(self) -> bool {
        matches!(
            self,
            PrOutAction::Register
                | PrOutAction::RegisterIgnoreExisting
                | PrOutAction::RegisterAndMove
        )
    }
}

impl TryFrom<u8> for PrInAction {
    type Error = PrError;

    fn try_from(v: u8) -> Result<Self> {
        use PrInAction::*;
        Ok(match v {
            0x00 => ReadKeys,
            0x01 => ReadReservation,
            0x02 => ReportCapabilities,
            0x03 => ReadFullStatus,
            _ => {
                return Err(PrError::invalid(format!(
                    "unknown PR-In service action 0x{v:02x}"
                )));
            },
        })
    }
}

impl TryFrom<u8> for PrOutAction {
    type Error = PrError;

    fn try_from(v: u8) -> Result<Self> {
        use PrOutAction::*;
        Ok(match v {
            0x00 => Register,
            0x01 => Reserve,
            0x02 => Release,
            0x03 => Clear,
            0x04 => Preempt,
            0x05 => PreemptAndAbort,
            0x06 => RegisterIgnoreExisting,
            0x07 => RegisterAndMove,
            _ => {
                return Err(PrError::invalid(format!(
                    "unknown PR-Out service action 0x{v:02x}"
                )));
            },
        })
    }
}

/// The single service action of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    In(PrInAction),
    Out(PrOutAction),
}

impl ServiceAction {
    pub fn code(self) -> u8 {
        match self {
            ServiceAction::In(a) => a.code(),
            ServiceAction::Out(a) => a.code(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ServiceAction::In(a) => a.name(),
            ServiceAction::Out(a) => a.name(),
        }
    }
}

impl From<PrInAction> for ServiceAction {
    fn from(a: PrInAction) -> Self {
        ServiceAction::In(a)
    }
}

impl From<PrOutAction> for ServiceAction {
    fn from(a: PrOutAction) -> Self {
        ServiceAction::Out(a)
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAction::In(a) => write!(f, "PR In: {}", a.name()),
            ServiceAction::Out(a) => write!(f, "PR Out: {}", a.name()),
        }
    }
}
