//! Null host backend.

use crate::soc::traits::HostIo;
use std::io;

/// Host backend of pass-through hypervisor levels, which host contexts for
/// the level above but never service their syscalls.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHost;

impl NullHost {
    fn unsupported() -> io::Error {
        io::Error::new(io::ErrorKind::Unsupported, "no host i/o at this level")
    }
}

impl HostIo for NullHost {
    fn name(&self) -> &str {
        "null"
    }

    fn read(&mut self, _fd: u64, _len: usize) -> io::Result<Vec<u8>> {
        Err(Self::unsupported())
    }

    fn write(&mut self, _fd: u64, _data: &[u8]) -> io::Result<usize> {
        Err(Self::unsupported())
    }

    fn open(&mut self, _path: &str, _flags: u64, _mode: u64) -> io::Result<u64> {
        Err(Self::unsupported())
    }
}
