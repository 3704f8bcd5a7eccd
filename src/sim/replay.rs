//! Syscall record and replay.
//!
//! While recording, every completed syscall appends a [`TraceEntry`]. While
//! replaying, each syscall consumes the next entry in order: the entry must
//! name the same pc and syscall id, host I/O is not touched, and the
//! recorded result (and, for `read`, the recorded bytes) is delivered to
//! the guest instead.

use crate::common::{HostError, HostResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version of the trace file format.
pub const TRACE_VERSION: u32 = 1;

/// One completed syscall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Address of the `ecall`.
    pub pc: u64,
    /// Syscall id.
    pub syscall: u64,
    /// Value returned in `a0` (the exit code for `exit`).
    pub result: i64,
    /// Bytes delivered to the guest by `read`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

/// Ordered syscall trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLog {
    pub version: u32,
    pub entries: Vec<TraceEntry>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceLog {
    pub fn new() -> Self {
        Self {
            version: TRACE_VERSION,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn to_json(&self) -> HostResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> HostResult<Self> {
        let log: TraceLog = serde_json::from_str(text)?;
        if log.version != TRACE_VERSION {
            return Err(HostError::InvalidImage(format!(
                "trace version {} (expected {})",
                log.version, TRACE_VERSION
            )));
        }
        Ok(log)
    }

    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> HostResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Replays a trace log in order.
#[derive(Clone, Debug)]
pub struct Replayer {
    log: TraceLog,
    cursor: usize,
    transcript: BTreeMap<u64, Vec<u8>>,
}

impl Replayer {
    pub fn new(log: TraceLog) -> Self {
        Self {
            log,
            cursor: 0,
            transcript: BTreeMap::new(),
        }
    }

    /// Consumes the next entry, which must match `pc` and `syscall`.
    ///
    /// # Errors
    ///
    /// `ReplayExhausted` if every entry was consumed, `ReplayDivergence` if
    /// the next entry is for another pc or syscall.
    pub fn next(&mut self, pc: u64, syscall: u64) -> HostResult<(usize, TraceEntry)> {
        let index = self.cursor;
        let entry = self
            .log
            .entries
            .get(index)
            .ok_or(HostError::ReplayExhausted { pc, syscall })?;
        if entry.pc != pc || entry.syscall != syscall {
            return Err(HostError::ReplayDivergence {
                index,
                expected_pc: entry.pc,
                expected_syscall: entry.syscall,
                pc,
                syscall,
            });
        }
        self.cursor += 1;
        Ok((index, entry.clone()))
    }

    /// Records bytes the guest wrote to `fd`.
    pub fn capture(&mut self, fd: u64, data: &[u8]) {
        self.transcript.entry(fd).or_default().extend_from_slice(data);
    }

    /// Bytes the guest wrote to `fd` during replay.
    pub fn transcript(&self, fd: u64) -> &[u8] {
        self.transcript.get(&fd).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.log.entries.len() - self.cursor
    }
}

/// Record/replay state of a hypervisor.
#[derive(Clone, Debug, Default)]
pub enum ReplayState {
    #[default]
    Off,
    Record(TraceLog),
    Replay(Replayer),
}

impl ReplayState {
    pub fn is_replaying(&self) -> bool {
        matches!(self, ReplayState::Replay(_))
    }
}
