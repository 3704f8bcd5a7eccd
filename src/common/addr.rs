//! Guest virtual and pool physical addresses.

use super::constants::{PAGE_OFFSET_MASK, PAGE_SHIFT};
use std::fmt;

/// A guest virtual address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtAddr(u64);

impl VirtAddr {
    /// Wraps a raw virtual address.
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw address.
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Returns the virtual page number.
    pub const fn vpn(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Returns the offset within the page.
    pub const fn page_offset(self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Returns true if the address is a multiple of `align`.
    pub const fn is_aligned(self, align: u64) -> bool {
        self.0 % align == 0
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An address inside the physical frame pool.
///
/// Encodes the frame index in the upper bits and the byte offset within the
/// frame in the lower `PAGE_SHIFT` bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(u64);

impl PhysAddr {
    /// Builds a physical address from a frame index and an in-frame offset.
    pub const fn from_frame(frame: usize, offset: u64) -> Self {
        Self(((frame as u64) << PAGE_SHIFT) | (offset & PAGE_OFFSET_MASK))
    }

    /// Returns the raw address.
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Returns the frame index.
    pub const fn frame(self) -> usize {
        (self.0 >> PAGE_SHIFT) as usize
    }

    /// Returns the offset within the frame.
    pub const fn offset(self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
