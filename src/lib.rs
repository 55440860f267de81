//! SCSI Persistent Reservation (PERSISTENT RESERVE IN / OUT) codec and the
//! pieces needed to drive it against a device.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Handles configuration, command-line parsing, and logging.
pub mod cfg;
/// PR-In / PR-Out command descriptor blocks.
pub mod control_block;
/// Typed errors of the codec layers.
pub mod error;
/// Encode, execute and decode one PR exchange.
pub mod handlers;
/// Service actions, reservation types, parameter lists and responses.
pub mod models;
/// The device side "execute command" boundary.
pub mod transport;
/// Provides utility functions used throughout the crate.
pub mod utils;

pub use error::PrError;
