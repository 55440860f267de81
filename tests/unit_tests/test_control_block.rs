use anyhow::Result;
use hex_literal::hex;
use sg_persist_rs::{
    PrError,
    control_block::persistent_reserve::{
        PERSISTENT_RESERVE_IN, PERSISTENT_RESERVE_OUT, encode_prin, encode_prout,
    },
    models::{
        reservation_type::ReservationType,
        service_action::{PrInAction, PrOutAction},
    },
};

#[test]
fn test_prin_cdb_layout() -> Result<()> {
    let cdb = encode_prin(0x00, 8192)?;
    assert_eq!(cdb.as_bytes(), &hex!("5e 00 00 00 00 00 00 20 00 00"));

    let cdb = PrInAction::ReportCapabilities.command_block(0x1234)?;
    assert_eq!(cdb.opcode(), PERSISTENT_RESERVE_IN);
    assert_eq!(cdb.as_bytes(), &hex!("5e 02 00 00 00 00 00 12 34 00"));
    Ok(())
}

#[test]
fn test_prout_cdb_layout() -> Result<()> {
    let cdb = encode_prout(0x01, 0x03, 24)?;
    assert_eq!(cdb.as_bytes(), &hex!("5f 01 03 00 00 00 00 00 18 00"));

    let cdb = PrOutAction::PreemptAndAbort
        .command_block(ReservationType::ExclusiveAccessAllRegistrants, 0x0100)?;
    assert_eq!(cdb.opcode(), PERSISTENT_RESERVE_OUT);
    assert_eq!(cdb.as_bytes(), &hex!("5f 05 08 00 00 00 00 01 00 00"));
    assert_eq!(cdb.to_string(), "5f 05 08 00 00 00 00 01 00 00");
    Ok(())
}

#[test]
fn test_cdb_field_ranges() -> Result<()> {
    assert!(matches!(
        encode_prin(0x03, 0x10000),
        Err(PrError::InvalidArgument(_))
    ));
    assert!(matches!(
        encode_prout(0x20, 0, 24),
        Err(PrError::InvalidArgument(_))
    ));
    let cdb = encode_prin(0x1f, 0xffff)?;
    assert_eq!(cdb.service_action(), 0x1f);
    assert_eq!(cdb.length(), 0xffff);
    Ok(())
}
