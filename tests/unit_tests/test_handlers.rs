use std::time::Duration;

use anyhow::Result;
use hex_literal::hex;
use sg_persist_rs::{
    handlers::persistent_reserve::{
        DEF_TIMEOUT, MX_ALLOC_LEN, persistent_reserve_in, persistent_reserve_out,
    },
    models::{
        prin_response::PrInResult,
        prout_params::PrOutParameters,
        reservation_type::ReservationType,
        sense_data::SenseData,
        service_action::{PrInAction, PrOutAction},
        transport_id::parse::parse_hex_list,
    },
    transport::{Outcome, ScsiStatus},
};

use super::common::{FakeDevice, load_fixture};

#[test]
fn test_prin_round_trip_through_device() -> Result<()> {
    let rsp = load_fixture("tests/unit_tests/fixtures/prin_read_full_status.hex")?;
    let mut dev = FakeDevice::replying(rsp);

    let reply =
        persistent_reserve_in(&mut dev, PrInAction::ReadFullStatus, MX_ALLOC_LEN, DEF_TIMEOUT)?;

    assert_eq!(dev.cdbs, vec![hex!("5e 03 00 00 00 00 00 20 00 00").to_vec()]);
    assert_eq!(dev.timeouts, vec![Duration::from_secs(60)]);
    assert_eq!(reply.data.len(), MX_ALLOC_LEN);
    let PrInResult::FullStatusList(list) = &reply.result else {
        anyhow::bail!("expected full status");
    };
    assert_eq!(list.descriptors.len(), 2);
    Ok(())
}

#[test]
fn test_prin_hex_report() -> Result<()> {
    let rsp = load_fixture("tests/unit_tests/fixtures/prin_read_keys.hex")?;
    let mut dev = FakeDevice::replying(rsp);
    let reply = persistent_reserve_in(&mut dev, PrInAction::ReadKeys, 64, DEF_TIMEOUT)?;

    let hex_report = reply.hex_report();
    let mut lines = hex_report.lines();
    assert_eq!(lines.next(), Some("  PR generation=0x12, Additional length=16"));
    let dump = lines.next().unwrap_or_default();
    assert!(dump.starts_with("00     00 00 00 00 00 12 3a bc  00 00 de ad be ef ca fe"));
    assert_eq!(lines.next(), None);
    Ok(())
}

#[test]
fn test_prin_hex_report_when_truncated() -> Result<()> {
    let rsp = load_fixture("tests/unit_tests/fixtures/prin_read_keys_truncated.hex")?;
    let mut dev = FakeDevice::replying(rsp);
    let reply = persistent_reserve_in(&mut dev, PrInAction::ReadKeys, 24, DEF_TIMEOUT)?;

    assert!(
        reply
            .hex_report()
            .starts_with("  PR generation=0x1, Additional length too large=256, truncate\n")
    );
    Ok(())
}

#[test]
fn test_prout_register_sends_parameter_list() -> Result<()> {
    let mut dev = FakeDevice::default();
    let mut params = PrOutParameters::new(0, 0x123abc);
    params.transport_ids = vec![parse_hex_list("6,0,0,0,50,0,c5,0,12,34,56,78")?];

    let cdb = persistent_reserve_out(
        &mut dev,
        PrOutAction::Register,
        ReservationType::from(0),
        &params,
        DEF_TIMEOUT,
    )?;

    assert_eq!(cdb.as_bytes(), &hex!("5f 00 00 00 00 00 00 00 34 00"));
    assert_eq!(dev.data_out.len(), 1);
    let sent = &dev.data_out[0];
    assert_eq!(sent.len(), 0x34);
    assert_eq!(sent[20], 0x08);
    assert_eq!(&sent[24..28], &24u32.to_be_bytes());
    Ok(())
}

#[test]
fn test_prout_reserve_carries_type() -> Result<()> {
    let mut dev = FakeDevice::default();
    let params = PrOutParameters::new(0x123abc, 0);
    persistent_reserve_out(
        &mut dev,
        PrOutAction::Reserve,
        ReservationType::WriteExclusiveRegistrantsOnly,
        &params,
        DEF_TIMEOUT,
    )?;
    assert_eq!(dev.cdbs[0], hex!("5f 01 05 00 00 00 00 00 18 00").to_vec());
    Ok(())
}

#[test]
fn test_failed_outcomes_become_errors() -> Result<()> {
    let mut dev = FakeDevice::failing(Outcome::Status(ScsiStatus::ReservationConflict));
    let err = persistent_reserve_out(
        &mut dev,
        PrOutAction::Release,
        ReservationType::WriteExclusive,
        &PrOutParameters::new(1, 0),
        DEF_TIMEOUT,
    )
    .expect_err("reservation conflict");
    assert_eq!(
        err.to_string(),
        "PROUT error, service action: Release: Reservation Conflict"
    );

    let sense = SenseData::parse(&hex!(
        "70 00 05 00 00 00 00 0a 00 00 00 00 24 00 00 00 00 00"
    ))?;
    let mut dev = FakeDevice::failing(Outcome::CheckCondition(sense));
    let err = persistent_reserve_in(&mut dev, PrInAction::ReadKeys, 64, DEF_TIMEOUT)
        .expect_err("check condition");
    assert!(err.to_string().contains("Invalid field in CDB"));
    Ok(())
}

#[test]
fn test_recovered_error_is_success() -> Result<()> {
    let sense = SenseData::parse(&hex!("72 01 00 00 00 00 00 00"))?;
    let mut dev = FakeDevice::failing(Outcome::RecoveredError(sense));
    dev.response = vec![0, 0, 0, 9, 0, 0, 0, 0];
    let reply = persistent_reserve_in(&mut dev, PrInAction::ReadReservation, 64, DEF_TIMEOUT)?;
    assert_eq!(reply.result.generation(), Some(9));
    Ok(())
}

#[test]
fn test_register_move_needs_one_transport_id() -> Result<()> {
    let mut dev = FakeDevice::default();
    let err = persistent_reserve_out(
        &mut dev,
        PrOutAction::RegisterAndMove,
        ReservationType::WriteExclusive,
        &PrOutParameters::new(1, 2),
        DEF_TIMEOUT,
    )
    .expect_err("no transport id");
    assert!(format!("{err:#}").contains("exactly one transport id"));
    assert!(dev.cdbs.is_empty());
    Ok(())
}
