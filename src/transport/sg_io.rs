// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Linux SCSI generic pass-through (`SG_IO`).

use std::{
    ffi::{c_int, c_uchar, c_uint, c_ushort, c_void},
    fs::{File, OpenOptions},
    os::unix::{fs::OpenOptionsExt, io::AsRawFd},
    path::Path,
    ptr,
    time::Duration,
};

use anyhow::{Context, Result};
use nix::fcntl::OFlag;
use tracing::{debug, warn};

use super::{DataDirection, Outcome, ScsiStatus, ScsiTransport};
use crate::models::sense_data::{SENSE_KEY_RECOVERED_ERROR, SenseData};

pub const SENSE_BUFF_LEN: usize = 32;

const SG_INTERFACE_ID_ORIG: c_int = b'S' as c_int;
const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

const DRIVER_STATUS_MASK: c_ushort = 0x0f;
const DRIVER_TIMEOUT: c_ushort = 0x06;
const DRIVER_SENSE: c_ushort = 0x08;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
#[repr(C)]
#[derive(Debug)]
struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: c_uchar,
    mx_sb_len: c_uchar,
    iovec_count: c_ushort,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *const c_uchar,
    sbp: *mut c_uchar,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: c_uchar,
    masked_status: c_uchar,
    msg_status: c_uchar,
    sb_len_wr: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

mod ioctl {
    use super::SgIoHdr;

    // #define SG_IO 0x2285
    nix::ioctl_readwrite_bad!(sg_io, 0x2285, SgIoHdr);
}

/// An open `/dev/sg*` or block device node.
#[derive(Debug)]
pub struct SgDevice {
    file: File,
}

impl SgDevice {
    /// Open read-write, non-blocking.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self { file })
    }
}

fn classify(hdr: &SgIoHdr, sense: &[u8]) -> Outcome {
    if hdr.host_status != 0 {
        return Outcome::TransportError(format!("host_status=0x{:02x}", hdr.host_status));
    }
    let driver = hdr.driver_status & DRIVER_STATUS_MASK;
    if driver == DRIVER_TIMEOUT {
        return Outcome::TransportError("command timed out".into());
    }

    let status = ScsiStatus::from(hdr.status & 0x7e);
    let has_sense = driver == DRIVER_SENSE || status == ScsiStatus::CheckCondition;
    if !has_sense {
        return match status {
            ScsiStatus::Good | ScsiStatus::ConditionMet => Outcome::Success,
            other => Outcome::Status(other),
        };
    }

    let written = (hdr.sb_len_wr as usize).min(sense.len());
    match SenseData::parse(&sense[..written]) {
        Ok(s) if s.sense_key == 0 && s.asc == 0 && s.ascq == 0 => Outcome::Success,
        Ok(s) if s.sense_key == SENSE_KEY_RECOVERED_ERROR => Outcome::RecoveredError(s),
        Ok(s) => Outcome::CheckCondition(s),
        Err(e) => {
            warn!("unusable sense data ({written} bytes): {e:#}");
            Outcome::Status(status)
        },
    }
}

impl ScsiTransport for SgDevice {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataDirection<'_>,
        timeout: Duration,
    ) -> Result<Outcome> {
        let mut sense = [0u8; SENSE_BUFF_LEN];
        let (dxfer_direction, dxferp, dxfer_len) = match data {
            DataDirection::None => (SG_DXFER_NONE, ptr::null_mut(), 0),
            DataDirection::FromDevice(buf) => (
                SG_DXFER_FROM_DEV,
                buf.as_mut_ptr().cast::<c_void>(),
                buf.len(),
            ),
            DataDirection::ToDevice(buf) => (
                SG_DXFER_TO_DEV,
                buf.as_ptr().cast_mut().cast::<c_void>(),
                buf.len(),
            ),
        };

        let mut hdr = SgIoHdr {
            interface_id: SG_INTERFACE_ID_ORIG,
            dxfer_direction,
            cmd_len: c_uchar::try_from(cdb.len()).context("CDB too long")?,
            mx_sb_len: SENSE_BUFF_LEN as c_uchar,
            iovec_count: 0,
            dxfer_len: c_uint::try_from(dxfer_len).context("transfer too long")?,
            dxferp,
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: c_uint::try_from(timeout.as_millis()).unwrap_or(c_uint::MAX),
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        // SAFETY: every pointer in `hdr` refers to a live buffer of the length
        // given alongside it, and all of them outlive the ioctl call.
        unsafe { ioctl::sg_io(self.file.as_raw_fd(), &mut hdr) }
            .context("SG_IO ioctl failed")?;

        debug!(
            status = hdr.status,
            host_status = hdr.host_status,
            driver_status = hdr.driver_status,
            resid = hdr.resid,
            duration_ms = hdr.duration,
            "SG_IO completed"
        );
        Ok(classify(&hdr, &sense))
    }
}
