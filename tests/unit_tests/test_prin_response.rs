use anyhow::Result;
use hex_literal::hex;
use sg_persist_rs::{
    PrError,
    models::{
        prin_response::{PrInResult, Truncation, decode_prin, decode_prin_strict},
        reservation_type::{ReservationType, Scope},
        service_action::PrInAction,
        transport_id::TransportIdDetail,
    },
};

use super::common::load_fixture;

const FIXTURES: &str = "tests/unit_tests/fixtures";

fn fixture(name: &str) -> Result<Vec<u8>> {
    load_fixture(&format!("{FIXTURES}/{name}"))
}

#[test]
fn test_read_keys() -> Result<()> {
    let buf = fixture("prin_read_keys.hex")?;
    let res = decode_prin(PrInAction::ReadKeys, &buf)?;
    let PrInResult::KeyList(keys) = &res else {
        anyhow::bail!("expected a key list, got {res:?}");
    };
    assert_eq!(keys.generation, 0x12);
    assert_eq!(keys.keys, vec![0x123abc, 0xdead_beef_cafe]);
    assert_eq!(keys.truncation, None);
    assert_eq!(
        res.to_string(),
        "  PR generation=0x12, 2 registered reservation keys follow:\n    0x123abc\n    0xdeadbeefcafe\n"
    );
    Ok(())
}

#[test]
fn test_read_keys_empty() -> Result<()> {
    let res = decode_prin(PrInAction::ReadKeys, &[0, 0, 0, 7, 0, 0, 0, 0])?;
    assert_eq!(
        res.to_string(),
        "  PR generation=0x7, there are NO registered reservation keys\n"
    );
    Ok(())
}

#[test]
fn test_read_keys_partial_key_is_dropped() -> Result<()> {
    let buf = hex!(
        "00 00 00 02 00 00 00 0d"
        "00 00 00 00 00 00 00 07"
        "00 00 00 00 00"
    );
    let res = decode_prin_strict(PrInAction::ReadKeys, &buf)?;
    let PrInResult::KeyList(keys) = &res else {
        anyhow::bail!("expected a key list");
    };
    assert_eq!(keys.additional_length, 13);
    assert_eq!(keys.keys, vec![7]);
    Ok(())
}

#[test]
fn test_read_keys_truncated() -> Result<()> {
    let buf = fixture("prin_read_keys_truncated.hex")?;
    let res = decode_prin(PrInAction::ReadKeys, &buf)?;
    assert_eq!(
        res.truncation(),
        Some(Truncation {
            declared: 0x100,
            available: 16
        })
    );
    let PrInResult::KeyList(keys) = &res else {
        anyhow::bail!("expected a key list");
    };
    assert_eq!(keys.keys.len(), 2);

    assert_eq!(
        decode_prin_strict(PrInAction::ReadKeys, &buf),
        Err(PrError::Truncated {
            declared: 0x100,
            available: 16
        })
    );
    Ok(())
}

#[test]
fn test_read_reservation() -> Result<()> {
    let buf = fixture("prin_read_reservation.hex")?;
    let res = decode_prin_strict(PrInAction::ReadReservation, &buf)?;
    let PrInResult::Reservation(r) = &res else {
        anyhow::bail!("expected a reservation");
    };
    let desc = r.reservation.expect("reservation held");
    assert_eq!(desc.key, 0x123abc);
    assert_eq!(desc.scope, Scope::LogicalUnit);
    assert_eq!(desc.pr_type, ReservationType::ExclusiveAccess);
    assert_eq!(
        res.to_string(),
        "  PR generation=0x4, Reservation follows:\n    Key=0x123abc\n    scope: LU_SCOPE,  type: Exclusive Access\n"
    );
    Ok(())
}

#[test]
fn test_read_reservation_length_below_descriptor_holds_none() -> Result<()> {
    let mut buf = vec![0, 0, 0, 1, 0, 0, 0, 0x08];
    buf.extend_from_slice(&[0u8; 8]);
    let res = decode_prin_strict(PrInAction::ReadReservation, &buf)?;
    let PrInResult::Reservation(r) = &res else {
        anyhow::bail!("expected a reservation");
    };
    assert_eq!(r.additional_length, 8);
    assert_eq!(r.reservation, None);
    assert_eq!(
        res.to_string(),
        "  PR generation=0x1, there is NO reservation held\n"
    );
    Ok(())
}

#[test]
fn test_read_reservation_truncated_descriptor() -> Result<()> {
    let buf = hex!("00 00 00 01 00 00 00 10 00 00 00 00 00 12 3a bc");
    let res = decode_prin(PrInAction::ReadReservation, &buf)?;
    assert_eq!(
        res.truncation(),
        Some(Truncation {
            declared: 16,
            available: 8
        })
    );
    let PrInResult::Reservation(r) = &res else {
        anyhow::bail!("expected a reservation");
    };
    let desc = r.reservation.expect("descriptor read from available bytes");
    assert_eq!(desc.key, 0x123abc);
    assert_eq!(desc.scope, Scope::LogicalUnit);
    assert_eq!(desc.pr_type, ReservationType::Obsolete(0));

    assert_eq!(
        decode_prin_strict(PrInAction::ReadReservation, &buf),
        Err(PrError::Truncated {
            declared: 16,
            available: 8
        })
    );
    Ok(())
}

#[test]
fn test_read_full_status() -> Result<()> {
    let buf = fixture("prin_read_full_status.hex")?;
    let res = decode_prin_strict(PrInAction::ReadFullStatus, &buf)?;
    let PrInResult::FullStatusList(list) = &res else {
        anyhow::bail!("expected full status");
    };
    assert_eq!(list.generation, 5);
    assert_eq!(list.descriptors.len(), 2);

    let d1 = &list.descriptors[0];
    assert_eq!(d1.key, 0x1122_3344_5566_7788);
    assert!(d1.is_holder() && !d1.all_tg_pt);
    assert_eq!(
        d1.holding,
        Some((Scope::LogicalUnit, ReservationType::WriteExclusive))
    );
    assert_eq!(d1.relative_target_port, Some(2));
    assert_eq!(d1.transport_id_length, 24);
    assert_eq!(
        d1.transport_id().map(|t| &t.detail),
        Some(&TransportIdDetail::Sas {
            address: 0x5001_2345_6789_abcd
        })
    );

    let d2 = &list.descriptors[1];
    assert_eq!(d2.key, 0xaabb_ccdd_eeff_0011);
    assert!(!d2.is_holder() && d2.all_tg_pt);
    assert_eq!(d2.relative_target_port, None);
    assert_eq!(d2.transport_ids.len(), 1);
    assert_eq!(
        d2.transport_id().and_then(|t| t.iscsi_name()).as_deref(),
        Some("iqn.2004-10.com.example:host")
    );

    let report = res.to_string();
    let expected = "  PR generation=0x5\n\
                    \x20   Key=0x1122334455667788\n\
                    \x20     All target ports bit clear\n\
                    \x20     Relative port address: 0x2\n\
                    \x20     << Reservation holder >>\n\
                    \x20     scope: LU_SCOPE,  type: Write Exclusive\n\
                    \x20     Transport Id of initiator:\n\
                    \x20       SAS address: 0x500123456789abcd\n\
                    \x20   Key=0xaabbccddeeff0011\n\
                    \x20     All target ports bit set\n\
                    \x20     not reservation holder\n\
                    \x20     Transport Id of initiator:\n\
                    \x20       iSCSI name: iqn.2004-10.com.example:host\n";
    assert_eq!(report, expected);
    Ok(())
}

#[test]
fn test_full_status_header_per_transport_id() -> Result<()> {
    let buf = hex!(
        "00 00 00 01 00 00 00 48"
        "00 00 00 00 00 00 00 10 00 00 00 00 02 00 00 00"
        "00 00 00 00 00 00 00 30"
        "06 00 00 00 50 00 00 00 00 00 00 01 00 00 00 00"
        "00 00 00 00 00 00 00 00"
        "06 00 00 00 50 00 00 00 00 00 00 02 00 00 00 00"
        "00 00 00 00 00 00 00 00"
    );
    let res = decode_prin_strict(PrInAction::ReadFullStatus, &buf)?;
    let PrInResult::FullStatusList(list) = &res else {
        anyhow::bail!("expected full status");
    };
    assert_eq!(list.descriptors.len(), 1);
    assert_eq!(list.descriptors[0].transport_ids.len(), 2);

    let expected = "  PR generation=0x1\n\
                    \x20   Key=0x10\n\
                    \x20     All target ports bit set\n\
                    \x20     not reservation holder\n\
                    \x20     Transport Id of initiator:\n\
                    \x20       SAS address: 0x5000000000000001\n\
                    \x20     Transport Id of initiator:\n\
                    \x20       SAS address: 0x5000000000000002\n";
    assert_eq!(res.to_string(), expected);
    Ok(())
}

#[test]
fn test_full_status_cut_short_keeps_complete_descriptors() -> Result<()> {
    let mut buf = fixture("prin_read_full_status.hex")?;
    // Drop the second descriptor's TransportID and half its header.
    buf.truncate(8 + 48 + 12);
    let res = decode_prin(PrInAction::ReadFullStatus, &buf)?;
    let PrInResult::FullStatusList(list) = &res else {
        anyhow::bail!("expected full status");
    };
    assert_eq!(list.descriptors.len(), 1);
    assert_eq!(
        list.truncation,
        Some(Truncation {
            declared: 104,
            available: 60
        })
    );
    Ok(())
}

#[test]
fn test_report_capabilities() -> Result<()> {
    let buf = fixture("prin_report_capabilities.hex")?;
    let res = decode_prin(PrInAction::ReportCapabilities, &buf)?;
    let PrInResult::Capabilities(caps) = &res else {
        anyhow::bail!("expected capabilities");
    };
    assert!(caps.crh() && caps.ptpl_c() && caps.tmv() && caps.ptpl_a());
    assert_eq!(res.generation(), None);

    let report = res.to_string();
    let expected = "Report capabilities response:\n\
                    \x20 Compatible Reservation handling(CRH): 1\n\
                    \x20 Specify Initiator Ports capable(SIP_C): 0\n\
                    \x20 All target ports capable(ATP_C): 0\n\
                    \x20 Persist Through Power Loss capable(PTPL_C): 1\n\
                    \x20 Type Mask Valid(TMV): 1\n\
                    \x20 Persist Through Power Loss active(PTPL_A): 1\n\
                    \x20   Support indicated in Type mask:\n\
                    \x20     Write Exclusive, all registrants: 0\n\
                    \x20     Exclusive Access, registrants only: 0\n\
                    \x20     Write Exclusive, registrants only: 0\n\
                    \x20     Exclusive Access: 1\n\
                    \x20     Write Exclusive: 1\n\
                    \x20     Exclusive Access, all registrants: 1\n";
    assert_eq!(report, expected);
    Ok(())
}
