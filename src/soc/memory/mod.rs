//! Guest memory management.
//!
//! Physical memory is a bounded [`FramePool`] shared by every context of a
//! machine. Each context owns an [`AddressSpace`]: a page table, a segment
//! layout and a paging mode. A [`Pager`] borrows one address space together
//! with the pool and performs every guest memory access.

/// Bounded pool of physical frames.
pub mod frame_pool;

/// Segment layout and paging modes.
pub mod layout;

/// Virtual page to frame mapping.
pub mod page_table;

/// Address translation and guest memory access.
pub mod pager;

pub use frame_pool::{FrameId, FramePool, PoolUsage};
pub use layout::{MemoryLayout, MemoryMode, Segment};
pub use page_table::{PageEntry, PageTable, Permission};
pub use pager::{AddressSpace, Pager};
