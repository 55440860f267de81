// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Persistent reservation TYPE and SCOPE nibbles.
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---------------+---------------+
//! |     SCOPE     |     TYPE      |   PR-Out CDB byte 2, descriptor byte 13
//! +---------------+---------------+
//! ```
//!
//! Type codes 0, 2, 4 and 9..=15 are obsolete or reserved. They are kept as
//! [`ReservationType::Obsolete`] so a device reporting them still decodes.

use core::fmt;

/// Scope code for a reservation covering the whole logical unit.
pub const LU_SCOPE: u8 = 0x0;

static PR_TYPE_NAMES: [&str; 16] = [
    "obsolete [0]",
    "Write Exclusive",
    "obsolete [2]",
    "Exclusive Access",
    "obsolete [4]",
    "Write Exclusive, registrants only",
    "Exclusive Access, registrants only",
    "Write Exclusive, all registrants",
    "Exclusive Access, all registrants",
    "obsolete [9]",
    "obsolete [0xa]",
    "obsolete [0xb]",
    "obsolete [0xc]",
    "obsolete [0xd]",
    "obsolete [0xe]",
    "obsolete [0xf]",
];

/// Name of a raw TYPE code; only the low nibble is significant.
#[inline]
pub fn pr_type_name(code: u8) -> &'static str {
    PR_TYPE_NAMES[(code & 0x0f) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationType {
    WriteExclusive,
    ExclusiveAccess,
    WriteExclusiveRegistrantsOnly,
    ExclusiveAccessRegistrantsOnly,
    WriteExclusiveAllRegistrants,
    ExclusiveAccessAllRegistrants,
    /// 0, 2, 4, 9..=15
    Obsolete(u8),
}

impl ReservationType {
    pub fn code(self) -> u8 {
        match self {
            ReservationType::WriteExclusive => 0x1,
            ReservationType::ExclusiveAccess => 0x3,
            ReservationType::WriteExclusiveRegistrantsOnly => 0x5,
            ReservationType::ExclusiveAccessRegistrantsOnly => 0x6,
            ReservationType::WriteExclusiveAllRegistrants => 0x7,
            ReservationType::ExclusiveAccessAllRegistrants => 0x8,
            ReservationType::Obsolete(v) => v & 0x0f,
        }
    }

    pub fn name(self) -> &'static str {
        pr_type_name(self.code())
    }

    pub fn is_obsolete(self) -> bool {
        matches!(self, ReservationType::Obsolete(_))
    }
}

impl From<u8> for ReservationType {
    /// Decodes the low nibble; the high nibble (scope) is ignored.
    fn from(v: u8) -> Self {
        match v & 0x0f {
            0x1 => ReservationType::WriteExclusive,
            0x3 => ReservationType::ExclusiveAccess,
            0x5 => ReservationType::WriteExclusiveRegistrantsOnly,
            0x6 => ReservationType::ExclusiveAccessRegistrantsOnly,
            0x7 => ReservationType::WriteExclusiveAllRegistrants,
            0x8 => ReservationType::ExclusiveAccessAllRegistrants,
            other => ReservationType::Obsolete(other),
        }
    }
}

impl From<ReservationType> for u8 {
    fn from(t: ReservationType) -> u8 {
        t.code()
    }
}

impl fmt::Display for ReservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SCOPE nibble. Only LU_SCOPE is defined for current devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    LogicalUnit,
    Other(u8),
}

impl Scope {
    pub fn code(self) -> u8 {
        match self {
            Scope::LogicalUnit => LU_SCOPE,
            Scope::Other(v) => v & 0x0f,
        }
    }
}

impl From<u8> for Scope {
    fn from(v: u8) -> Self {
        match v & 0x0f {
            LU_SCOPE => Scope::LogicalUnit,
            other => Scope::Other(other),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::LogicalUnit => f.write_str("LU_SCOPE"),
            Scope::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Split a SCOPE/TYPE byte into its two nibbles.
#[inline]
pub fn split_scope_type(b: u8) -> (Scope, ReservationType) {
    (Scope::from((b >> 4) & 0x0f), ReservationType::from(b & 0x0f))
}
