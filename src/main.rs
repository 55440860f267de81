// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use clap::Parser;
use sg_persist_rs::cfg::{
    cli::{Cli, resolve_config_path},
    config::Config,
    logger::{init_default_logger, init_logger},
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = match cli.logger.as_deref() {
        Some(path) => Some(init_logger(path)?),
        None => {
            init_default_logger()?;
            None
        },
    };

    let mut config = resolve_config_path(&cli.config)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;
    if let Some(device) = cli.device {
        config.device.path = device;
    }
    config.output.hex |= cli.hex;

    run(&config)
}

#[cfg(target_os = "linux")]
fn run(config: &Config) -> Result<()> {
    use sg_persist_rs::{
        handlers::persistent_reserve::{persistent_reserve_in, persistent_reserve_out},
        models::service_action::ServiceAction,
        transport::sg_io::SgDevice,
    };
    use tracing::info;

    let mut dev = SgDevice::open(&config.device.path)?;
    info!("opened {}", config.device.path.display());

    match config.service_action() {
        ServiceAction::In(action) => {
            let reply = persistent_reserve_in(
                &mut dev,
                action,
                config.device.allocation_length,
                config.device.timeout,
            )?;
            if config.output.hex {
                print!("{}", reply.hex_report());
            } else {
                print!("{}", reply.result);
            }
        },
        ServiceAction::Out(action) => {
            persistent_reserve_out(
                &mut dev,
                action,
                config.reservation_type(),
                &config.prout_parameters(),
                config.device.timeout,
            )?;
        },
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run(_config: &Config) -> Result<()> {
    anyhow::bail!("SCSI pass-through is only available on Linux")
}
