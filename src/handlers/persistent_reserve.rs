// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt::Write, time::Duration};

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::{
    control_block::persistent_reserve::CommandBlock,
    models::{
        prin_response::{CAPABILITIES_LEN, PRIN_HEADER_LEN, PrInResult, decode_prin},
        prout_params::PrOutParameters,
        reservation_type::ReservationType,
        service_action::{PrInAction, PrOutAction},
    },
    transport::{DataDirection, Outcome, ScsiTransport},
    utils::hex_dump,
};

/// Default PR-In allocation length.
pub const MX_ALLOC_LEN: usize = 8192;
/// Default command timeout.
pub const DEF_TIMEOUT: Duration = Duration::from_secs(60);

const HEX_INDENT: &str = "";

fn check_outcome(kind: &str, sa_name: &str, outcome: &Outcome) -> Result<()> {
    if outcome.is_success() {
        if let Outcome::RecoveredError(sense) = outcome {
            warn!("Recovered error on {kind}, continuing: {sense}");
        }
        return Ok(());
    }
    error!("{kind} error, service action: {sa_name}: {outcome}");
    bail!("{kind} error, service action: {sa_name}: {outcome}")
}

/// A completed PR-In exchange.
#[derive(Debug, Clone)]
pub struct PrInReply {
    pub cdb: CommandBlock,
    /// The whole allocation buffer; bytes the device did not send are zero.
    pub data: Vec<u8>,
    pub result: PrInResult,
}

impl PrInReply {
    /// Raw payload dump.
    pub fn hex_report(&self) -> String {
        if let PrInResult::Capabilities(_) = self.result {
            let end = CAPABILITIES_LEN.min(self.data.len());
            return hex_dump(&self.data[..end], HEX_INDENT);
        }

        let payload = self.data.get(PRIN_HEADER_LEN..).unwrap_or_default();
        let mut out = String::new();
        if let Some(generation) = self.result.generation() {
            write!(out, "  PR generation=0x{generation:x}, ")
                .expect("Writing to String cannot fail");
        }
        match self.result.truncation() {
            Some(t) => {
                writeln!(out, "Additional length too large={}, truncate", t.declared)
                    .expect("Writing to String cannot fail");
                out.push_str(&hex_dump(payload, HEX_INDENT));
            },
            None => {
                let len = self.declared_length().min(payload.len());
                writeln!(out, "Additional length={len}")
                    .expect("Writing to String cannot fail");
                out.push_str(&hex_dump(&payload[..len], HEX_INDENT));
            },
        }
        out
    }

    fn declared_length(&self) -> usize {
        match &self.result {
            PrInResult::KeyList(k) => k.additional_length as usize,
            PrInResult::Reservation(r) => r.additional_length as usize,
            PrInResult::FullStatusList(f) => f.additional_length as usize,
            PrInResult::Capabilities(_) => CAPABILITIES_LEN,
        }
    }
}

/// Issue PERSISTENT RESERVE IN and decode the response.
pub fn persistent_reserve_in<T: ScsiTransport + ?Sized>(
    dev: &mut T,
    action: PrInAction,
    allocation_length: usize,
    timeout: Duration,
) -> Result<PrInReply> {
    let cdb = action.command_block(allocation_length)?;
    debug!("Persistent Reservation In cmd: {cdb}");

    let mut data = vec![0u8; allocation_length];
    let outcome = dev
        .execute(cdb.as_ref(), DataDirection::FromDevice(&mut data), timeout)
        .with_context(|| format!("PRIN command, service action: {}", action.name()))?;
    check_outcome("PRIN", action.name(), &outcome)?;

    let result = decode_prin(action, &data)
        .with_context(|| format!("PRIN {} response", action.name()))?;
    if let Some(t) = result.truncation() {
        warn!(
            declared = t.declared,
            available = t.available,
            "PRIN {} response truncated",
            action.name()
        );
    }
    Ok(PrInReply { cdb, data, result })
}

/// Build the parameter list for `action` and issue PERSISTENT RESERVE OUT.
pub fn persistent_reserve_out<T: ScsiTransport + ?Sized>(
    dev: &mut T,
    action: PrOutAction,
    pr_type: ReservationType,
    params: &PrOutParameters,
    timeout: Duration,
) -> Result<CommandBlock> {
    for (i, rec) in params.transport_ids.iter().enumerate() {
        if let Some(tid) = rec.decode() {
            debug!("TransportID {i} ({} bytes):\n{tid}", rec.len());
        }
    }

    let data = params
        .build(action)
        .with_context(|| format!("PROUT {} parameter list", action.name()))?;
    let cdb = action.command_block(pr_type, data.len())?;
    debug!("Persistent Reservation Out cmd: {cdb}");
    debug!("Persistent Reservation Out parameters:\n{}", hex_dump(&data, "  "));

    let outcome = dev
        .execute(cdb.as_ref(), DataDirection::ToDevice(&data), timeout)
        .with_context(|| format!("PROUT command, service action: {}", action.name()))?;
    check_outcome("PROUT", action.name(), &outcome)?;

    info!("PR out: command ({}) successful", action.name());
    Ok(cdb)
}
