//! Guest address space layout.
//!
//! ```text
//! 0x10000                                                     4 GiB
//!   | code (RO) | pad | data | heap -> brk ....... stack_limit | stack |
//! ```
//!
//! Code starts at `CODE_START`; data starts at the page boundary following
//! code; the heap starts at the word-aligned end of data and ends at the
//! program break; the stack occupies the top `stack_size` bytes of the
//! virtual address space.

use crate::common::constants::{CODE_START, PAGE_SIZE, VIRTUAL_MEMORY_SIZE, WORD_SIZE};
use crate::common::{AccessType, Fault, HostError, HostResult};
use serde::Deserialize;

/// How a context's pages are backed by frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    /// Frames are allocated and zero-filled on first touch.
    #[default]
    Demand,
    /// Every page of the layout is backed at load time and heap growth is
    /// backed eagerly.
    FullyMapped,
}

/// Segment an address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Code,
    Data,
    Heap,
    Stack,
}

/// Rounds `value` up to a multiple of `align` (a power of two).
pub const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// Segment bounds of one address space. All ranges are half-open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    pub code_start: u64,
    pub code_end: u64,
    pub data_start: u64,
    pub data_end: u64,
    pub heap_start: u64,
    pub program_break: u64,
    pub stack_limit: u64,
    pub stack_top: u64,
}

impl MemoryLayout {
    /// Lays out a program with `code_len` bytes of code, `data_len` bytes of
    /// initialized data and a stack of `stack_size` bytes (rounded up to
    /// whole pages).
    pub fn new(code_len: u64, data_len: u64, stack_size: u64) -> HostResult<Self> {
        let stack_size = align_up(stack_size.max(PAGE_SIZE), PAGE_SIZE);
        let code_end = CODE_START + code_len;
        let data_start = align_up(code_end, PAGE_SIZE);
        let data_end = data_start + data_len;
        let heap_start = align_up(data_end, WORD_SIZE);
        let stack_top = VIRTUAL_MEMORY_SIZE;

        if stack_size >= stack_top || heap_start > stack_top - stack_size {
            return Err(HostError::LoadFailed(format!(
                "program of {} code and {} data bytes does not fit below a {} byte stack",
                code_len, data_len, stack_size
            )));
        }

        Ok(Self {
            code_start: CODE_START,
            code_end,
            data_start,
            data_end,
            heap_start,
            program_break: heap_start,
            stack_limit: stack_top - stack_size,
            stack_top,
        })
    }

    /// Returns the segment containing `addr`, if any.
    pub fn segment_of(&self, addr: u64) -> Option<Segment> {
        if (self.code_start..self.code_end).contains(&addr) {
            Some(Segment::Code)
        } else if (self.data_start..self.data_end).contains(&addr) {
            Some(Segment::Data)
        } else if (self.heap_start..self.program_break).contains(&addr) {
            Some(Segment::Heap)
        } else if (self.stack_limit..self.stack_top).contains(&addr) {
            Some(Segment::Stack)
        } else {
            None
        }
    }

    /// Checks that `addr` may be accessed with `access`.
    ///
    /// # Errors
    ///
    /// `Fault::SegmentationFault` for addresses outside every segment,
    /// fetches outside code and writes to code.
    pub fn check(&self, addr: u64, access: AccessType) -> Result<Segment, Fault> {
        let segment = self
            .segment_of(addr)
            .ok_or(Fault::SegmentationFault(addr))?;
        match (access, segment) {
            (AccessType::Fetch, Segment::Code) | (AccessType::Read, _) => Ok(segment),
            (AccessType::Write, Segment::Data | Segment::Heap | Segment::Stack) => Ok(segment),
            _ => Err(Fault::SegmentationFault(addr)),
        }
    }

    /// Checks a whole range `[addr, addr + len)`.
    pub fn check_range(&self, addr: u64, len: u64, access: AccessType) -> Result<(), Fault> {
        if len == 0 {
            return Ok(());
        }
        let last = addr
            .checked_add(len - 1)
            .filter(|last| *last < VIRTUAL_MEMORY_SIZE)
            .ok_or(Fault::SegmentationFault(addr))?;
        // Segments are contiguous ranges, so both ends in the same segment
        // means the whole range is.
        let first_seg = self.check(addr, access)?;
        let last_seg = self.check(last, access)?;
        if first_seg == last_seg {
            Ok(())
        } else {
            self.check_each_segment(addr, last, access)
        }
    }

    fn check_each_segment(&self, addr: u64, last: u64, access: AccessType) -> Result<(), Fault> {
        let mut cursor = addr;
        while cursor <= last {
            self.check(cursor, access)?;
            let segment_end = match self.segment_of(cursor) {
                Some(Segment::Code) => self.code_end,
                Some(Segment::Data) => self.data_end,
                Some(Segment::Heap) => self.program_break,
                Some(Segment::Stack) => self.stack_top,
                None => return Err(Fault::SegmentationFault(cursor)),
            };
            cursor = segment_end;
        }
        Ok(())
    }

    /// Page numbers `[start, end)` that hold any byte of the program's
    /// segments: code through the program break, and the stack.
    pub fn mapped_page_ranges(&self) -> [(u64, u64); 2] {
        let low_end = self.program_break.max(self.data_end).max(self.code_end);
        [
            (self.code_start / PAGE_SIZE, align_up(low_end, PAGE_SIZE) / PAGE_SIZE),
            (self.stack_limit / PAGE_SIZE, self.stack_top / PAGE_SIZE),
        ]
    }

    /// Highest break the heap may grow to.
    pub fn max_break(&self) -> u64 {
        self.stack_limit
    }
}
