// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    cfg::enums::{Direction, ServiceActionName},
    handlers::persistent_reserve::{DEF_TIMEOUT, MX_ALLOC_LEN},
    models::{
        prin_response::PRIN_HEADER_LEN,
        prout_params::PrOutParameters,
        reservation_type::ReservationType,
        service_action::{PrInAction, PrOutAction, ServiceAction},
        transport_id::{
            TransportIdRecord,
            parse::{parse_hex_list, parse_transport_id_lines},
        },
    },
};

/// `transport_id` value that means "read TransportID lines from stdin".
pub const TRANSPORT_ID_STDIN: &str = "-";

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Target device and command knobs.
    pub device: DeviceConfig,
    /// The single PR-In or PR-Out request to issue.
    #[serde(default)]
    pub request: RequestConfig,
    /// How results are printed.
    #[serde(default)]
    pub output: OutputConfig,
    /// TransportIDs resolved from `request.transport_id[_file]`.
    #[serde(skip)]
    pub transport_ids: Vec<TransportIdRecord>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DeviceConfig {
    /// `/dev/sgN` or a block device node.
    pub path: PathBuf,
    #[serde(rename = "timeout_secs", default = "default_timeout", with = "serde_secs")]
    /// Per-command timeout.
    pub timeout: Duration,
    #[serde(default = "default_allocation_length")]
    /// PR-In ALLOCATION LENGTH.
    pub allocation_length: usize,
}

fn default_timeout() -> Duration {
    DEF_TIMEOUT
}

fn default_allocation_length() -> usize {
    MX_ALLOC_LEN
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RequestConfig {
    pub direction: Direction,
    /// Defaults to `read-keys` for PR-In; mandatory for PR-Out.
    pub service_action: Option<ServiceActionName>,
    /// TYPE field of the PR-Out CDB.
    pub prout_type: u8,
    #[serde(with = "serde_hex")]
    pub reservation_key: u64,
    #[serde(with = "serde_hex")]
    pub service_action_key: u64,
    pub all_target_ports: bool,
    /// Activate Persist Through Power Loss.
    pub aptpl: bool,
    /// REGISTER AND MOVE: unregister the source I_T nexus.
    pub unregister: bool,
    /// REGISTER AND MOVE: relative target port identifier.
    #[serde(with = "serde_hex_opt")]
    pub relative_target_port: Option<u64>,
    /// Comma separated hex bytes of one TransportID, or `-` for stdin.
    pub transport_id: Option<String>,
    /// File with one TransportID per line.
    pub transport_id_file: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Dump responses as hex instead of decoding them.
    pub hex: bool,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_yaml(&s)
    }

    pub fn from_yaml(s: &str) -> Result<Self> {
        let mut cfg: Config =
            serde_yaml::from_str(s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants, fills defaults and resolves TransportIDs.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            (PRIN_HEADER_LEN..=0xffff).contains(&self.device.allocation_length),
            "allocation_length must be in 8..=65535, got {}",
            self.device.allocation_length
        );

        let req = &mut self.request;
        match (req.direction, req.service_action.map(ServiceAction::from)) {
            (Direction::In, None) => {
                warn!("no service action given, assume Persistent Reserve In: Read keys");
                req.service_action = Some(ServiceActionName::ReadKeys);
            },
            (Direction::In, Some(ServiceAction::Out(sa))) => {
                bail!("PR In request cannot take PR Out service action ({})", sa.name())
            },
            (Direction::Out, None) => {
                bail!("PR Out request needs exactly one PR Out service action")
            },
            (Direction::Out, Some(ServiceAction::In(sa))) => {
                bail!("PR Out request cannot take PR In service action ({})", sa.name())
            },
            _ => {},
        }

        let prout = self.prout_action();
        let req = &self.request;
        let is_move = prout == Some(PrOutAction::RegisterAndMove);
        ensure!(
            !req.unregister || is_move,
            "unregister is only valid with register-move"
        );
        ensure!(
            req.relative_target_port.unwrap_or(0) == 0 || is_move,
            "relative_target_port is only valid with register-move"
        );
        if let Some(rtp) = req.relative_target_port {
            ensure!(rtp <= 0xffff, "relative_target_port 0x{rtp:x} exceeds 0xffff");
        }
        ensure!(
            req.prout_type <= 0x0f,
            "prout_type {} exceeds 15",
            req.prout_type
        );
        match prout {
            Some(sa) if sa.uses_type() && req.prout_type == 0 => {
                warn!("{} with prout_type 0 is probably a mistake", sa.name())
            },
            _ => {},
        }

        ensure!(
            !(req.transport_id.is_some() && req.transport_id_file.is_some()),
            "transport_id and transport_id_file are mutually exclusive"
        );
        self.transport_ids = self.resolve_transport_ids()?;

        if let Some(sa) = prout {
            if is_move {
                ensure!(
                    self.transport_ids.len() == 1,
                    "register-move needs exactly one transport id, got {}",
                    self.transport_ids.len()
                );
            } else if !self.transport_ids.is_empty() && !sa.accepts_transport_ids() {
                warn!(
                    "transport ids are normally only sent with register actions, not {}",
                    sa.name()
                );
            }
        } else if !self.transport_ids.is_empty() {
            warn!("transport ids ignored for a PR In request");
        }
        Ok(())
    }

    fn resolve_transport_ids(&self) -> Result<Vec<TransportIdRecord>> {
        if let Some(path) = &self.request.transport_id_file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return parse_transport_id_lines(&text)
                .with_context(|| format!("bad transport id in {}", path.display()));
        }
        match self.request.transport_id.as_deref() {
            None => Ok(Vec::new()),
            Some(TRANSPORT_ID_STDIN) => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read transport ids from stdin")?;
                parse_transport_id_lines(&text).context("bad transport id on stdin")
            },
            Some(list) => Ok(vec![
                parse_hex_list(list).context("bad transport_id hex list")?,
            ]),
        }
    }

    /// The validated service action.
    pub fn service_action(&self) -> ServiceAction {
        self.request
            .service_action
            .unwrap_or(ServiceActionName::ReadKeys)
            .into()
    }

    pub fn prin_action(&self) -> Option<PrInAction> {
        match self.service_action() {
            ServiceAction::In(a) => Some(a),
            ServiceAction::Out(_) => None,
        }
    }

    pub fn prout_action(&self) -> Option<PrOutAction> {
        match self.service_action() {
            ServiceAction::Out(a) => Some(a),
            ServiceAction::In(_) => None,
        }
    }

    pub fn reservation_type(&self) -> ReservationType {
        ReservationType::from(self.request.prout_type)
    }

    /// PR-Out parameter list contents.
    pub fn prout_parameters(&self) -> PrOutParameters {
        let req = &self.request;
        PrOutParameters {
            reservation_key: req.reservation_key,
            service_action_key: req.service_action_key,
            all_tg_pt: req.all_target_ports,
            aptpl: req.aptpl,
            unregister: req.unregister,
            relative_target_port: req.relative_target_port.unwrap_or(0) as u16,
            transport_ids: self.transport_ids.clone(),
        }
    }
}

mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Hex string (`"0x1234"`, `"1234"`) or plain YAML integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum HexValue {
    Int(u64),
    Str(String),
}

impl HexValue {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            HexValue::Int(v) => Ok(v),
            HexValue::Str(s) => crate::utils::parse_hex_u64(&s).map_err(E::custom),
        }
    }
}

mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::HexValue;

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{v:x}"))
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        HexValue::deserialize(d)?.into_u64()
    }
}

mod serde_hex_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::HexValue;

    pub fn serialize<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_str(&format!("0x{v:x}")),
            None => s.serialize_none(),
        }
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Option::<HexValue>::deserialize(d)?
            .map(HexValue::into_u64)
            .transpose()
    }
}
