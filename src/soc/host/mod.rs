//! Host I/O backends.

/// In-memory backend.
pub mod buffer_host;

/// Backend that refuses every request.
pub mod null_host;

/// Backend over the real process stdio and file system.
pub mod std_host;

pub use buffer_host::BufferHost;
pub use null_host::NullHost;
pub use std_host::StdHost;

use std::io;

pub(crate) fn bad_fd(fd: u64) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("bad file descriptor {}", fd))
}
