// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

/// Issue one SCSI PERSISTENT RESERVE IN or OUT command described by a YAML
/// request file.
#[derive(Parser, Debug, Clone)]
#[command(name = "sg_persist", version, about)]
pub struct Cli {
    /// Request configuration (YAML).
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Logger configuration (YAML); plain stderr logging when absent.
    #[arg(short, long)]
    pub logger: Option<String>,

    /// Override `device.path` from the config.
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// Dump responses in hex.
    #[arg(short = 'H', long)]
    pub hex: bool,
}

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot get current working dir")?
            .join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}
