//! Machine resources shared by the contexts of one level.
//!
//! * `memory`: frame pool, page tables, layout and the pager.
//! * `host`: host I/O backends for the syscall layer.
//! * `traits`: the [`HostIo`](traits::HostIo) interface.

/// Host I/O backends.
pub mod host;

/// Guest memory management.
pub mod memory;

/// Host I/O interface.
pub mod traits;
