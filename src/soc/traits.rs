//! Host I/O interface.
//!
//! The syscall layer of the hypervisor that owns a context does not talk to
//! the operating system directly. It goes through a [`HostIo`] backend so
//! that the same guest can run against the real host, against in-memory
//! buffers in tests and self-hosting comparisons, or against nothing at all
//! in pass-through levels.

use crate::soc::host::BufferHost;
use std::io;

/// Backend servicing file-descriptor syscalls.
///
/// File descriptors 0, 1 and 2 are standard input, output and error. Any
/// error is reported to the guest as `-1`; the error value itself is only
/// logged.
pub trait HostIo {
    /// Returns the user-friendly name of the backend.
    fn name(&self) -> &str;

    /// Reads at most `len` bytes from `fd`. An empty result is end of file.
    fn read(&mut self, fd: u64, len: usize) -> io::Result<Vec<u8>>;

    /// Writes `data` to `fd` and returns the number of bytes written.
    fn write(&mut self, fd: u64, data: &[u8]) -> io::Result<usize>;

    /// Opens `path` with guest `flags` (Linux `O_*` values) and returns a
    /// new file descriptor.
    fn open(&mut self, path: &str, flags: u64, mode: u64) -> io::Result<u64>;

    /// Downcasts the backend to an in-memory buffer host if applicable.
    ///
    /// Used by tests and by the self-hosting comparison to collect the
    /// guest's output.
    fn as_buffer(&self) -> Option<&BufferHost> {
        None
    }
}
