//! Memory Access Types.
//!
//! This module defines the classification of memory accesses used by the
//! pager to pick the segment bounds and page permissions an access must
//! satisfy.

/// Type of memory access operation.
///
/// Used to distinguish between instruction fetches, data reads and data
/// writes for permission checking in the pager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch access.
    ///
    /// Only the code segment may be fetched from.
    Fetch,

    /// Data read access.
    ///
    /// Any segment (code, data, heap, stack) may be read.
    Read,

    /// Data write access.
    ///
    /// Requires a read-write page; the code segment is read-only.
    Write,
}
