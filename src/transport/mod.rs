// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The "execute one CDB" boundary.
//!
//! Everything above this module is transport agnostic; a [`ScsiTransport`]
//! delivers a CDB plus an optional data buffer and reports how the command
//! ended.

#[cfg(target_os = "linux")]
pub mod sg_io;

use core::fmt;
use std::time::Duration;

use anyhow::Result;

use crate::models::sense_data::SenseData;

/// Data phase of a command.
#[derive(Debug)]
pub enum DataDirection<'a> {
    None,
    /// Device to host; the buffer is filled in place.
    FromDevice(&'a mut [u8]),
    /// Host to device.
    ToDevice(&'a [u8]),
}

impl DataDirection<'_> {
    pub fn len(&self) -> usize {
        match self {
            DataDirection::None => 0,
            DataDirection::FromDevice(b) => b.len(),
            DataDirection::ToDevice(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// SAM status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScsiStatus {
    Good,
    CheckCondition,
    ConditionMet,
    Busy,
    ReservationConflict,
    TaskSetFull,
    AcaActive,
    TaskAborted,
    Other(u8),
}

impl From<u8> for ScsiStatus {
    fn from(b: u8) -> Self {
        match b {
            0x00 => ScsiStatus::Good,
            0x02 => ScsiStatus::CheckCondition,
            0x04 => ScsiStatus::ConditionMet,
            0x08 => ScsiStatus::Busy,
            0x18 => ScsiStatus::ReservationConflict,
            0x28 => ScsiStatus::TaskSetFull,
            0x30 => ScsiStatus::AcaActive,
            0x40 => ScsiStatus::TaskAborted,
            other => ScsiStatus::Other(other),
        }
    }
}

impl fmt::Display for ScsiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScsiStatus::Good => f.write_str("Good"),
            ScsiStatus::CheckCondition => f.write_str("Check Condition"),
            ScsiStatus::ConditionMet => f.write_str("Condition Met"),
            ScsiStatus::Busy => f.write_str("Busy"),
            ScsiStatus::ReservationConflict => f.write_str("Reservation Conflict"),
            ScsiStatus::TaskSetFull => f.write_str("Task Set Full"),
            ScsiStatus::AcaActive => f.write_str("ACA Active"),
            ScsiStatus::TaskAborted => f.write_str("Task Aborted"),
            ScsiStatus::Other(v) => write!(f, "status 0x{v:02x}"),
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Completed, with RECOVERED ERROR sense.
    RecoveredError(SenseData),
    CheckCondition(SenseData),
    /// Any other non-GOOD status without usable sense.
    Status(ScsiStatus),
    /// Host adapter or driver level failure.
    TransportError(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::RecoveredError(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::RecoveredError(s) => write!(f, "recovered error: {s}"),
            Outcome::CheckCondition(s) => write!(f, "check condition: {s}"),
            Outcome::Status(s) => write!(f, "{s}"),
            Outcome::TransportError(m) => write!(f, "transport error: {m}"),
        }
    }
}

/// Delivers one CDB to a device.
///
/// `Err` means the command could not be issued at all; a command that reached
/// the device and failed is an `Ok` with a non-success [`Outcome`].
pub trait ScsiTransport {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataDirection<'_>,
        timeout: Duration,
    ) -> Result<Outcome>;
}

impl<T: ScsiTransport + ?Sized> ScsiTransport for &mut T {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataDirection<'_>,
        timeout: Duration,
    ) -> Result<Outcome> {
        (**self).execute(cdb, data, timeout)
    }
}
