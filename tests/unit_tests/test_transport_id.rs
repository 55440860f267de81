use std::fs;

use anyhow::Result;
use hex_literal::hex;
use sg_persist_rs::{
    PrError,
    models::transport_id::{
        ProtocolId, TransportIdDetail, TransportIdRecord, decode_transport_ids,
        parse::parse_transport_id_lines, serialize_records,
    },
};

#[test]
fn test_lines_file_to_records() -> Result<()> {
    let text = fs::read_to_string("tests/unit_tests/fixtures/transport_ids.txt")?;
    let recs = parse_transport_id_lines(&text)?;
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r.len() == 24));

    let sas = recs[0].decode().expect("sas record");
    assert_eq!(sas.protocol, ProtocolId::Sas);
    assert_eq!(
        sas.detail,
        TransportIdDetail::Sas {
            address: 0x5000_c500_1234_5678
        }
    );

    let iscsi = recs[1].decode().expect("iscsi record");
    assert_eq!(iscsi.iscsi_name().as_deref(), Some("iqn.2004-10.com:ab"));
    Ok(())
}

#[test]
fn test_serialized_records_scan_back() -> Result<()> {
    let text = fs::read_to_string("tests/unit_tests/fixtures/transport_ids.txt")?;
    let recs = parse_transport_id_lines(&text)?;
    let area = serialize_records(&recs);

    let mut it = decode_transport_ids(&area, area.len());
    assert!(it.length_conforms());
    let offsets: Vec<_> = it.by_ref().map(|t| t.offset).collect();
    assert_eq!(offsets, vec![0, 24]);
    Ok(())
}

#[test]
fn test_fibre_channel_and_rdma_report() -> Result<()> {
    let mut area = vec![0u8; 48];
    area[..16].copy_from_slice(&hex!("00 00 00 00 00 00 00 00 21 00 00 24 ff 4b 3c 2a"));
    area[24] = 0x04;
    area[32..48].copy_from_slice(&hex!("00 11 22 33 44 55 66 77 88 99 aa bb cc dd ee ff"));

    let tids: Vec<_> = decode_transport_ids(&area, area.len()).collect();
    assert_eq!(tids.len(), 2);
    assert_eq!(
        tids[0].detail,
        TransportIdDetail::FibreChannel {
            port_name: hex!("21 00 00 24 ff 4b 3c 2a")
        }
    );
    let report = tids[0].to_string();
    assert!(report.starts_with("        FCP-2 World Wide Name:\n"));
    assert!(report.contains("21 00 00 24 ff 4b 3c 2a"));

    assert_eq!(tids[1].protocol, ProtocolId::Rdma);
    assert!(tids[1].to_string().contains("RDMA initiator port identifier:"));
    Ok(())
}

#[test]
fn test_line_errors_carry_position() -> Result<()> {
    let err = parse_transport_id_lines("# ok\n6 0 0 0\n,5 0\n").expect_err("leading comma");
    assert_eq!(
        err,
        PrError::MalformedInput {
            line: 3,
            pos: 1,
            reason: "expected hex number".into()
        }
    );
    Ok(())
}

#[test]
fn test_fixed_layout_records_decode_to_same_bytes() -> Result<()> {
    for proto in [0u8, 1, 2, 3, 4, 6, 7, 8] {
        let mut rec = [0u8; 24];
        rec[0] = proto;
        for (i, b) in rec.iter_mut().enumerate().skip(1) {
            *b = 0xa0 | i as u8;
        }
        let mut it = decode_transport_ids(&rec, rec.len());
        let tid = it.next().expect("one record");
        assert!(it.next().is_none(), "protocol {proto}");
        assert_eq!(tid.length, 24, "protocol {proto}");
        assert_eq!(tid.raw, rec, "protocol {proto}");
        assert_eq!(serialize_records(&[TransportIdRecord::from_bytes(tid.raw.clone())]), rec);
    }
    Ok(())
}
