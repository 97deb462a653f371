//! Shared scripted fake transport for integration tests.
//!
//! The fake records every call so tests can assert the exact rollback
//! sequence, and it is scripted per-step so any point of the start
//! handshake can be made to fail.
#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use vhost_scsi_ctl::{ChannelSource, ControlChannel, ControlOp, ControlTransport};

/// Per-channel failure script.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    /// ABI version the fake kernel reports.
    pub abi_version: i32,
    /// errno for `open`, if opening should fail.
    pub open_errno: Option<i32>,
    /// errno for `enable_notifiers`, if it should fail.
    pub enable_notifiers_errno: Option<i32>,
    /// errno for `start`, if it should fail.
    pub start_errno: Option<i32>,
    /// errno for the ABI version query, if it should fail.
    pub abi_query_errno: Option<i32>,
    /// errno for SetEndpoint, if binding should fail.
    pub bind_errno: Option<i32>,
    /// errno for ClearEndpoint, if unbinding should fail.
    pub unbind_errno: Option<i32>,
}

/// Observed calls, shared by all channels a transport opens.
#[derive(Debug, Default)]
pub struct CallLog {
    pub opens: usize,
    pub enable_notifiers: usize,
    pub disable_notifiers: usize,
    pub starts: usize,
    pub stops: usize,
    /// Every control request, with its payload.
    pub requests: Vec<(ControlOp, Vec<u8>)>,
    pub drops: usize,
}

impl CallLog {
    /// Number of control requests with the given opcode.
    pub fn request_count(&self, op: ControlOp) -> usize {
        self.requests.iter().filter(|(o, _)| *o == op).count()
    }
}

/// Scripted in-memory transport.
pub struct FakeTransport {
    script: FakeScript,
    log: Arc<Mutex<CallLog>>,
}

impl FakeTransport {
    pub fn new(script: FakeScript) -> Self {
        Self {
            script,
            log: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Shared call log; clone before handing the transport to a registry.
    pub fn log(&self) -> Arc<Mutex<CallLog>> {
        Arc::clone(&self.log)
    }
}

impl ControlTransport for FakeTransport {
    fn open(&self, _source: &ChannelSource) -> io::Result<Box<dyn ControlChannel>> {
        self.log.lock().unwrap().opens += 1;
        if let Some(errno) = self.script.open_errno {
            return Err(io::Error::from_raw_os_error(errno));
        }
        Ok(Box::new(FakeChannel {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeChannel {
    script: FakeScript,
    log: Arc<Mutex<CallLog>>,
}

impl ControlChannel for FakeChannel {
    fn enable_notifiers(&mut self) -> io::Result<()> {
        self.log.lock().unwrap().enable_notifiers += 1;
        match self.script.enable_notifiers_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }

    fn disable_notifiers(&mut self) {
        self.log.lock().unwrap().disable_notifiers += 1;
    }

    fn start(&mut self) -> io::Result<()> {
        self.log.lock().unwrap().starts += 1;
        match self.script.start_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
    }

    fn control_request(&mut self, op: ControlOp, payload: &[u8]) -> io::Result<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .requests
            .push((op, payload.to_vec()));
        let errno = match op {
            ControlOp::GetAbiVersion => self.script.abi_query_errno,
            ControlOp::SetEndpoint => self.script.bind_errno,
            ControlOp::ClearEndpoint => self.script.unbind_errno,
        };
        if let Some(errno) = errno {
            return Err(io::Error::from_raw_os_error(errno));
        }
        match op {
            ControlOp::GetAbiVersion => Ok(self.script.abi_version.to_le_bytes().to_vec()),
            _ => Ok(Vec::new()),
        }
    }
}

impl Drop for FakeChannel {
    fn drop(&mut self) {
        self.log.lock().unwrap().drops += 1;
    }
}
