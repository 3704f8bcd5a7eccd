//! Virtual Memory Manager.
//!
//! Every guest memory access goes through a [`Pager`], which pairs one
//! context's [`AddressSpace`] with the machine's [`FramePool`]. The pager
//! checks the access against the segment layout, maps the page on first
//! touch in demand mode, checks page permissions, and only then touches the
//! backing frame. Nothing wraps: addresses past the end of the 4 GiB space
//! fault like any other unmapped address.

use super::frame_pool::FramePool;
use super::layout::{align_up, MemoryLayout, MemoryMode};
use super::page_table::{PageEntry, PageTable, Permission};
use crate::common::constants::{INSTRUCTION_SIZE, PAGE_SIZE, WORD_SIZE};
use crate::common::{AccessType, Fault, PhysAddr, VirtAddr};

/// Page table, layout and paging mode of one context.
#[derive(Clone, Debug)]
pub struct AddressSpace {
    pub table: PageTable,
    pub layout: MemoryLayout,
    pub mode: MemoryMode,
    /// Pages mapped on first touch.
    pub page_faults: u64,
}

impl AddressSpace {
    /// Creates an empty address space with the given layout.
    pub fn new(layout: MemoryLayout, mode: MemoryMode) -> Self {
        Self {
            table: PageTable::new(),
            layout,
            mode,
            page_faults: 0,
        }
    }

    /// An empty address space with the same layout and mode, used as the
    /// target of a fork.
    pub fn empty_copy(&self) -> Self {
        Self::new(self.layout, self.mode)
    }

    /// Number of frames this space currently holds.
    pub fn frames_mapped(&self) -> usize {
        self.table.len()
    }
}

/// Guest memory accessor for one address space.
pub struct Pager<'a> {
    space: &'a mut AddressSpace,
    pool: &'a mut FramePool,
}

impl<'a> Pager<'a> {
    pub fn new(space: &'a mut AddressSpace, pool: &'a mut FramePool) -> Self {
        Self { space, pool }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.space.layout
    }

    pub fn mode(&self) -> MemoryMode {
        self.space.mode
    }

    pub fn pool(&self) -> &FramePool {
        self.pool
    }

    fn permission_for(&self, vpn: u64) -> Permission {
        if vpn * PAGE_SIZE < self.space.layout.code_end {
            Permission::ReadOnly
        } else {
            Permission::ReadWrite
        }
    }

    /// Makes sure page `vpn` is backed by a frame.
    ///
    /// In demand mode an unmapped page gets a fresh zero-filled frame. In
    /// fully-mapped mode every page of the layout was backed at load time,
    /// so this only allocates for pages that were never part of it.
    ///
    /// # Errors
    ///
    /// `Fault::PageTableExhausted` if the pool is empty.
    pub fn ensure_mapped(&mut self, vpn: u64) -> Result<PageEntry, Fault> {
        if let Some(entry) = self.space.table.get(vpn) {
            return Ok(entry);
        }
        let frame = self.pool.alloc()?;
        let entry = PageEntry {
            frame,
            permission: self.permission_for(vpn),
        };
        self.space.table.map(vpn, entry);
        self.space.page_faults += 1;
        log::debug!("mapped page {:#x} to frame {}", vpn * PAGE_SIZE, frame);
        Ok(entry)
    }

    /// Translates a guest virtual address for `access`.
    ///
    /// # Errors
    ///
    /// `SegmentationFault` outside the layout or on a write to a read-only
    /// page; `PageTableExhausted` when the page cannot be backed.
    pub fn translate(&mut self, vaddr: VirtAddr, access: AccessType) -> Result<PhysAddr, Fault> {
        self.space.layout.check(vaddr.val(), access)?;
        let entry = self.ensure_mapped(vaddr.vpn())?;
        if access == AccessType::Write && entry.permission == Permission::ReadOnly {
            return Err(Fault::SegmentationFault(vaddr.val()));
        }
        Ok(PhysAddr::from_frame(entry.frame, vaddr.page_offset()))
    }

    /// Fetches the instruction word at `pc`.
    pub fn fetch_u32(&mut self, pc: u64) -> Result<u32, Fault> {
        let vaddr = VirtAddr::new(pc);
        if !vaddr.is_aligned(INSTRUCTION_SIZE) {
            return Err(Fault::MisalignedAccess(pc));
        }
        let paddr = self.translate(vaddr, AccessType::Fetch)?;
        let mut buf = [0u8; 4];
        self.pool.read(paddr.frame(), paddr.offset() as usize, &mut buf);
        Ok(u32::from_le_bytes(buf))
    }

    /// Loads the doubleword at `addr`, which must be 8-byte aligned and lie
    /// wholly inside one segment.
    pub fn load_u64(&mut self, addr: u64) -> Result<u64, Fault> {
        let vaddr = VirtAddr::new(addr);
        if !vaddr.is_aligned(WORD_SIZE) {
            return Err(Fault::MisalignedAccess(addr));
        }
        self.space
            .layout
            .check_range(addr, WORD_SIZE, AccessType::Read)?;
        let paddr = self.translate(vaddr, AccessType::Read)?;
        let mut buf = [0u8; 8];
        self.pool.read(paddr.frame(), paddr.offset() as usize, &mut buf);
        Ok(u64::from_le_bytes(buf))
    }

    /// Stores a doubleword at `addr`, which must be 8-byte aligned and lie
    /// wholly inside one writable segment.
    pub fn store_u64(&mut self, addr: u64, val: u64) -> Result<(), Fault> {
        let vaddr = VirtAddr::new(addr);
        if !vaddr.is_aligned(WORD_SIZE) {
            return Err(Fault::MisalignedAccess(addr));
        }
        self.space
            .layout
            .check_range(addr, WORD_SIZE, AccessType::Write)?;
        let paddr = self.translate(vaddr, AccessType::Write)?;
        self.pool
            .write(paddr.frame(), paddr.offset() as usize, &val.to_le_bytes());
        Ok(())
    }

    /// Calls `f(page_address, in_page_offset, chunk_len, buf_offset)` for
    /// every page-sized chunk of `[addr, addr + len)`.
    fn for_each_chunk(
        &mut self,
        addr: u64,
        len: usize,
        access: AccessType,
        mut f: impl FnMut(&mut FramePool, PhysAddr, usize, usize),
    ) -> Result<(), Fault> {
        self.space.layout.check_range(addr, len as u64, access)?;
        let mut done = 0usize;
        while done < len {
            let vaddr = VirtAddr::new(addr + done as u64);
            let chunk = ((PAGE_SIZE - vaddr.page_offset()) as usize).min(len - done);
            let paddr = self.translate(vaddr, access)?;
            f(self.pool, paddr, chunk, done);
            done += chunk;
        }
        Ok(())
    }

    /// Reads `len` bytes starting at `addr`.
    pub fn read_bytes(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, Fault> {
        let mut out = vec![0u8; len];
        self.for_each_chunk(addr, len, AccessType::Read, |pool, paddr, chunk, at| {
            pool.read(paddr.frame(), paddr.offset() as usize, &mut out[at..at + chunk]);
        })?;
        Ok(out)
    }

    /// Writes `data` starting at `addr`.
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<(), Fault> {
        self.for_each_chunk(addr, data.len(), AccessType::Write, |pool, paddr, chunk, at| {
            pool.write(paddr.frame(), paddr.offset() as usize, &data[at..at + chunk]);
        })
    }

    /// Reads a NUL-terminated string of at most `max_len` bytes (NUL
    /// included). The NUL is not returned.
    ///
    /// # Errors
    ///
    /// `SegmentationFault` if the string runs off its segment or no NUL is
    /// found within `max_len` bytes.
    pub fn read_cstring(&mut self, addr: u64, max_len: u64) -> Result<Vec<u8>, Fault> {
        let mut out = Vec::new();
        for i in 0..max_len {
            let at = addr.checked_add(i).ok_or(Fault::SegmentationFault(addr))?;
            let paddr = self.translate(VirtAddr::new(at), AccessType::Read)?;
            let mut byte = [0u8; 1];
            self.pool.read(paddr.frame(), paddr.offset() as usize, &mut byte);
            if byte[0] == 0 {
                return Ok(out);
            }
            out.push(byte[0]);
        }
        Err(Fault::SegmentationFault(addr))
    }

    /// Writes bytes at `addr` regardless of page permissions. Used by the
    /// loader to place code and data; the range must lie inside the layout.
    pub(crate) fn initialize(&mut self, addr: u64, data: &[u8]) -> Result<(), Fault> {
        self.for_each_chunk(addr, data.len(), AccessType::Read, |pool, paddr, chunk, at| {
            pool.write(paddr.frame(), paddr.offset() as usize, &data[at..at + chunk]);
        })
    }

    /// Moves the program break to `new_break` and returns it.
    ///
    /// Shrinking releases the frames of pages that lie wholly above the new
    /// break. Growing first checks that the pool can back the new pages and,
    /// in fully-mapped mode, backs them immediately.
    ///
    /// # Errors
    ///
    /// `SegmentationFault` if `new_break` is below the heap start or inside
    /// the stack; `PageTableExhausted` if the pool cannot back the growth.
    /// On error the break is unchanged.
    pub fn set_program_break(&mut self, new_break: u64) -> Result<u64, Fault> {
        let layout = self.space.layout;
        if new_break < layout.heap_start || new_break > layout.max_break() {
            return Err(Fault::SegmentationFault(new_break));
        }

        let old_break = layout.program_break;
        // The page holding the heap start may also hold data.
        let low_page = align_up(layout.heap_start, PAGE_SIZE) / PAGE_SIZE;
        let old_top = (align_up(old_break, PAGE_SIZE) / PAGE_SIZE).max(low_page);
        let new_top = (align_up(new_break, PAGE_SIZE) / PAGE_SIZE).max(low_page);

        if new_top > old_top {
            let needed = (old_top..new_top)
                .filter(|vpn| !self.space.table.is_mapped(*vpn))
                .count();
            if needed > self.pool.available() {
                return Err(Fault::PageTableExhausted);
            }
            self.space.layout.program_break = new_break;
            if self.space.mode == MemoryMode::FullyMapped {
                for vpn in old_top..new_top {
                    self.ensure_mapped(vpn)?;
                }
            }
        } else {
            self.space.layout.program_break = new_break;
            for (_, entry) in self.space.table.unmap_range(new_top, old_top) {
                self.pool.release(entry.frame);
            }
        }

        Ok(new_break)
    }

    /// Backs every page of the layout with a frame.
    pub fn map_all(&mut self) -> Result<(), Fault> {
        for (start, end) in self.space.layout.mapped_page_ranges() {
            for vpn in start..end {
                self.ensure_mapped(vpn)?;
            }
        }
        Ok(())
    }

    /// Fills this (empty) address space with a private copy of every page
    /// mapped in `parent`.
    ///
    /// # Errors
    ///
    /// `PageTableExhausted` if the pool cannot hold the copy; any frames
    /// taken before the failure are released again.
    pub fn copy_from(&mut self, parent: &AddressSpace) -> Result<(), Fault> {
        if parent.table.len() > self.pool.available() {
            return Err(Fault::PageTableExhausted);
        }
        for (vpn, entry) in parent.table.iter() {
            let frame = match self.pool.alloc() {
                Ok(frame) => frame,
                Err(fault) => {
                    self.release();
                    return Err(fault);
                }
            };
            self.pool.copy_frame(entry.frame, frame);
            self.space.table.map(
                vpn,
                PageEntry {
                    frame,
                    permission: entry.permission,
                },
            );
        }
        self.space.layout = parent.layout;
        self.space.mode = parent.mode;
        Ok(())
    }

    /// Returns every frame to the pool and leaves the table empty.
    pub fn release(&mut self) -> usize {
        let pages = self.space.table.drain();
        let count = pages.len();
        for (_, entry) in pages {
            self.pool.release(entry.frame);
        }
        count
    }
}

