//! Drives one encode, execute, decode exchange with a device.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// PERSISTENT RESERVE IN / OUT exchanges.
pub mod persistent_reserve;
