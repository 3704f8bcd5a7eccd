//! In-memory host backend.
//!
//! Standard input is a fixed byte buffer, standard output and error are
//! captured, and files live in a map from path to contents. Two runs fed
//! the same inputs see exactly the same host, which is what replay tests
//! and the self-hosting comparison rely on.

use super::bad_fd;
use crate::isa::abi::open_flags::{O_ACCMODE, O_APPEND, O_CREAT, O_RDWR, O_TRUNC, O_WRONLY};
use crate::isa::abi::{STDERR_FD, STDIN_FD, STDOUT_FD};
use crate::soc::traits::HostIo;
use std::collections::BTreeMap;
use std::io;

#[derive(Clone, Debug)]
struct OpenFile {
    path: String,
    pos: usize,
    readable: bool,
    writable: bool,
    append: bool,
}

/// Host backend backed entirely by memory.
#[derive(Clone, Debug)]
pub struct BufferHost {
    stdin: Vec<u8>,
    stdin_pos: usize,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    files: BTreeMap<String, Vec<u8>>,
    open_files: BTreeMap<u64, OpenFile>,
    next_fd: u64,
}

impl Default for BufferHost {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferHost {
    /// Creates a host with empty stdin and no files.
    pub fn new() -> Self {
        Self {
            stdin: Vec::new(),
            stdin_pos: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            files: BTreeMap::new(),
            open_files: BTreeMap::new(),
            next_fd: STDERR_FD + 1,
        }
    }

    /// Creates a host whose stdin yields `input`.
    pub fn with_stdin(input: impl Into<Vec<u8>>) -> Self {
        let mut host = Self::new();
        host.stdin = input.into();
        host
    }

    /// Adds (or replaces) a file.
    pub fn add_file(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Bytes written to stdout so far.
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Bytes written to stderr so far.
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Current contents of a file.
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }
}

impl HostIo for BufferHost {
    fn name(&self) -> &str {
        "buffer"
    }

    fn read(&mut self, fd: u64, len: usize) -> io::Result<Vec<u8>> {
        if fd == STDIN_FD {
            let end = (self.stdin_pos + len).min(self.stdin.len());
            let out = self.stdin[self.stdin_pos..end].to_vec();
            self.stdin_pos = end;
            return Ok(out);
        }

        let file = self.open_files.get_mut(&fd).ok_or_else(|| bad_fd(fd))?;
        if !file.readable {
            return Err(bad_fd(fd));
        }
        let contents = self
            .files
            .get(&file.path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        let start = file.pos.min(contents.len());
        let end = (start + len).min(contents.len());
        file.pos = end;
        Ok(contents[start..end].to_vec())
    }

    fn write(&mut self, fd: u64, data: &[u8]) -> io::Result<usize> {
        match fd {
            STDOUT_FD => self.stdout.extend_from_slice(data),
            STDERR_FD => self.stderr.extend_from_slice(data),
            _ => {
                let file = self.open_files.get_mut(&fd).ok_or_else(|| bad_fd(fd))?;
                if !file.writable {
                    return Err(bad_fd(fd));
                }
                let contents = self.files.entry(file.path.clone()).or_default();
                if file.append {
                    file.pos = contents.len();
                }
                let end = file.pos + data.len();
                if contents.len() < end {
                    contents.resize(end, 0);
                }
                contents[file.pos..end].copy_from_slice(data);
                file.pos = end;
            }
        }
        Ok(data.len())
    }

    fn open(&mut self, path: &str, flags: u64, _mode: u64) -> io::Result<u64> {
        let access = flags & O_ACCMODE;
        let writable = access == O_WRONLY || access == O_RDWR;
        if !self.files.contains_key(path) {
            if flags & O_CREAT == 0 {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            self.files.insert(path.to_string(), Vec::new());
        }
        if writable && flags & O_TRUNC != 0 {
            self.files.insert(path.to_string(), Vec::new());
        }

        let fd = self.next_fd;
        self.next_fd += 1;
        self.open_files.insert(
            fd,
            OpenFile {
                path: path.to_string(),
                pos: 0,
                readable: access != O_WRONLY,
                writable,
                append: flags & O_APPEND != 0,
            },
        );
        Ok(fd)
    }

    fn as_buffer(&self) -> Option<&BufferHost> {
        Some(self)
    }
}
