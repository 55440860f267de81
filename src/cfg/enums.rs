// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::models::service_action::{PrInAction, PrOutAction, ServiceAction};

/// Which of the two commands a request issues.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    #[serde(rename = "in", alias = "In", alias = "IN", alias = "prin")]
    In,
    #[serde(rename = "out", alias = "Out", alias = "OUT", alias = "prout")]
    Out,
}
impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::In => "PR In",
            Direction::Out => "PR Out",
        })
    }
}

/// Service action as written in the request config. The short aliases are
/// the single-letter options of the classic command line tool.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceActionName {
    #[serde(alias = "k", alias = "read_keys")]
    ReadKeys,
    #[serde(alias = "r", alias = "read_reservation")]
    ReadReservation,
    #[serde(alias = "c", alias = "report_capabilities")]
    ReportCapabilities,
    #[serde(alias = "s", alias = "read_full_status")]
    ReadFullStatus,
    #[serde(alias = "G")]
    Register,
    #[serde(alias = "R")]
    Reserve,
    #[serde(alias = "L")]
    Release,
    #[serde(alias = "C")]
    Clear,
    #[serde(alias = "P")]
    Preempt,
    #[serde(alias = "A", alias = "preempt_abort")]
    PreemptAbort,
    #[serde(alias = "I", alias = "register_ignore")]
    RegisterIgnore,
    #[serde(alias = "M", alias = "register_move")]
    RegisterMove,
}

impl From<ServiceActionName> for ServiceAction {
    fn from(n: ServiceActionName) -> Self {
        use ServiceActionName as N;
        match n {
            N::ReadKeys => PrInAction::ReadKeys.into(),
            N::ReadReservation => PrInAction::ReadReservation.into(),
            N::ReportCapabilities => PrInAction::ReportCapabilities.into(),
            N::ReadFullStatus => PrInAction::ReadFullStatus.into(),
            N::Register => PrOutAction::Register.into(),
            N::Reserve => PrOutAction::Reserve.into(),
            N::Release => PrOutAction::Release.into(),
            N::Clear => PrOutAction::Clear.into(),
            N::Preempt => PrOutAction::Preempt.into(),
            N::PreemptAbort => PrOutAction::PreemptAndAbort.into(),
            N::RegisterIgnore => PrOutAction::RegisterIgnoreExisting.into(),
            N::RegisterMove => PrOutAction::RegisterAndMove.into(),
        }
    }
}

impl fmt::Display for ServiceActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ServiceAction::from(*self).name())
    }
}

/// Log line encoding.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    #[serde(rename = "json", alias = "Json", alias = "JSON")]
    Json,
    #[serde(rename = "pretty", alias = "Pretty", alias = "text")]
    Pretty,
}
