//! Real host backend.

use super::bad_fd;
use crate::isa::abi::open_flags::{O_ACCMODE, O_APPEND, O_CREAT, O_RDWR, O_TRUNC, O_WRONLY};
use crate::isa::abi::{STDERR_FD, STDIN_FD, STDOUT_FD};
use crate::soc::traits::HostIo;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};

/// Services guest I/O with the process's own stdio and the host file
/// system. Descriptors above 2 index files opened by the guest.
pub struct StdHost {
    files: BTreeMap<u64, File>,
    next_fd: u64,
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl StdHost {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            next_fd: STDERR_FD + 1,
        }
    }
}

impl HostIo for StdHost {
    fn name(&self) -> &str {
        "std"
    }

    fn read(&mut self, fd: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = match fd {
            STDIN_FD => io::stdin().read(&mut buf)?,
            _ => self.files.get_mut(&fd).ok_or_else(|| bad_fd(fd))?.read(&mut buf)?,
        };
        buf.truncate(n);
        Ok(buf)
    }

    fn write(&mut self, fd: u64, data: &[u8]) -> io::Result<usize> {
        match fd {
            STDOUT_FD => {
                let mut out = io::stdout().lock();
                out.write_all(data)?;
                out.flush()?;
            }
            STDERR_FD => io::stderr().write_all(data)?,
            _ => self
                .files
                .get_mut(&fd)
                .ok_or_else(|| bad_fd(fd))?
                .write_all(data)?,
        }
        Ok(data.len())
    }

    fn open(&mut self, path: &str, flags: u64, _mode: u64) -> io::Result<u64> {
        let access = flags & O_ACCMODE;
        let file = OpenOptions::new()
            .read(access != O_WRONLY)
            .write(access == O_WRONLY || access == O_RDWR)
            .append(flags & O_APPEND != 0)
            .create(flags & O_CREAT != 0)
            .truncate(flags & O_TRUNC != 0)
            .open(path)?;
        let fd = self.next_fd;
        self.next_fd += 1;
        self.files.insert(fd, file);
        log::debug!("opened {} as fd {}", path, fd);
        Ok(fd)
    }
}
