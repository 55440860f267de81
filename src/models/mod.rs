//! Wire formats of the PERSISTENT RESERVE IN/OUT commands.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// PR-In response decoding and reports.
pub mod prin_response;
/// PR-Out parameter list construction.
pub mod prout_params;
/// Reservation TYPE and SCOPE codes.
pub mod reservation_type;
/// Fixed and descriptor format sense data.
pub mod sense_data;
/// PR-In / PR-Out service action codes.
pub mod service_action;
/// TransportID records and their text input forms.
pub mod transport_id;
