use std::{fs, time::Duration};

use anyhow::Result;
use hex::FromHex;
use sg_persist_rs::transport::{DataDirection, Outcome, ScsiTransport};

pub fn load_fixture(path: &str) -> Result<Vec<u8>> {
    let s = fs::read_to_string(path)?;
    let cleaned = s.trim().replace(|c: char| c.is_whitespace(), "");
    Ok(Vec::from_hex(&cleaned)?)
}

/// In-memory device: records every CDB and data-out buffer, answers data-in
/// requests from `response`.
#[derive(Debug, Default)]
pub struct FakeDevice {
    pub response: Vec<u8>,
    pub outcome: Option<Outcome>,
    pub cdbs: Vec<Vec<u8>>,
    pub data_out: Vec<Vec<u8>>,
    pub timeouts: Vec<Duration>,
}

impl FakeDevice {
    pub fn replying(response: Vec<u8>) -> Self {
        Self {
            response,
            ..Default::default()
        }
    }

    pub fn failing(outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..Default::default()
        }
    }
}

impl ScsiTransport for FakeDevice {
    fn execute(
        &mut self,
        cdb: &[u8],
        data: DataDirection<'_>,
        timeout: Duration,
    ) -> Result<Outcome> {
        self.cdbs.push(cdb.to_vec());
        self.timeouts.push(timeout);
        match data {
            DataDirection::FromDevice(buf) => {
                let n = buf.len().min(self.response.len());
                buf[..n].copy_from_slice(&self.response[..n]);
            },
            DataDirection::ToDevice(buf) => self.data_out.push(buf.to_vec()),
            DataDirection::None => {},
        }
        Ok(self.outcome.clone().unwrap_or(Outcome::Success))
    }
}
