use std::time::Duration;

use anyhow::{Context, Result};
use sg_persist_rs::{
    cfg::{cli::resolve_config_path, config::Config, enums::Direction},
    models::{
        reservation_type::ReservationType,
        service_action::{PrInAction, PrOutAction, ServiceAction},
    },
};

#[test]
fn test_load_register_move_config() -> Result<()> {
    let cfg = resolve_config_path("tests/config.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    assert_eq!(cfg.device.timeout, Duration::from_secs(30));
    assert_eq!(cfg.device.allocation_length, 4096);
    assert_eq!(cfg.request.direction, Direction::Out);
    assert_eq!(
        cfg.service_action(),
        ServiceAction::Out(PrOutAction::RegisterAndMove)
    );
    assert_eq!(cfg.reservation_type(), ReservationType::WriteExclusive);
    assert_eq!(cfg.transport_ids.len(), 1);

    let params = cfg.prout_parameters();
    assert_eq!(params.reservation_key, 0x123abc);
    assert_eq!(params.service_action_key, 0x456def);
    assert_eq!(params.relative_target_port, 2);
    assert!(params.unregister && !params.aptpl);
    Ok(())
}

#[test]
fn test_prin_defaults() -> Result<()> {
    let cfg = Config::from_yaml("device:\n  path: /dev/sg0\n")?;
    assert_eq!(cfg.prin_action(), Some(PrInAction::ReadKeys));
    assert_eq!(cfg.device.allocation_length, 8192);
    assert_eq!(cfg.device.timeout, Duration::from_secs(60));
    assert!(!cfg.output.hex);

    let cfg = Config::from_yaml(
        "device:\n  path: /dev/sg0\nrequest:\n  service_action: s\noutput:\n  hex: true\n",
    )?;
    assert_eq!(cfg.prin_action(), Some(PrInAction::ReadFullStatus));
    assert!(cfg.output.hex);
    Ok(())
}

#[test]
fn test_keys_accept_plain_hex_and_integers() -> Result<()> {
    let cfg = Config::from_yaml(
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  \
         service_action: reserve\n  prout_type: 3\n  reservation_key: abc\n  \
         service_action_key: 16\n",
    )?;
    let params = cfg.prout_parameters();
    assert_eq!(params.reservation_key, 0xabc);
    assert_eq!(params.service_action_key, 16);
    assert_eq!(cfg.reservation_type(), ReservationType::ExclusiveAccess);
    Ok(())
}

#[test]
fn test_invalid_requests_are_rejected() -> Result<()> {
    let cases = [
        // PR-Out without a service action.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n",
        // PR-In with a PR-Out action.
        "device:\n  path: /dev/sg0\nrequest:\n  service_action: clear\n",
        // unregister outside register-move.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: register\n  unregister: true\n",
        // register-move without a transport id.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: M\n",
        // type out of range.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: R\n  prout_type: 16\n",
        // relative port out of range.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: M\n  relative_target_port: \"0x10000\"\n  transport_id: \"1,0,0,7\"\n",
        // nonzero relative port outside register-move.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: register\n  relative_target_port: \"0x1\"\n",
        // both transport id sources.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: G\n  transport_id: \"1\"\n  transport_id_file: ids.txt\n",
        // malformed hex list.
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: G\n  transport_id: \"1,,2\"\n",
        // allocation length below the header size.
        "device:\n  path: /dev/sg0\n  allocation_length: 4\n",
    ];
    for yaml in cases {
        assert!(Config::from_yaml(yaml).is_err(), "accepted: {yaml}");
    }
    Ok(())
}

#[test]
fn test_transport_id_file() -> Result<()> {
    let cfg = Config::from_yaml(
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: I\n  \
         service_action_key: \"0x1\"\n  \
         transport_id_file: tests/unit_tests/fixtures/transport_ids.txt\n",
    )?;
    assert_eq!(cfg.transport_ids.len(), 2);
    assert_eq!(
        cfg.prout_action(),
        Some(PrOutAction::RegisterIgnoreExisting)
    );
    Ok(())
}

#[test]
fn test_zero_relative_port_outside_register_move() -> Result<()> {
    let cfg = Config::from_yaml(
        "device:\n  path: /dev/sg0\nrequest:\n  direction: out\n  service_action: register\n  relative_target_port: 0\n",
    )?;
    assert_eq!(cfg.prout_action(), Some(PrOutAction::Register));
    assert_eq!(cfg.prout_parameters().relative_target_port, 0);
    Ok(())
}
