//! Per-context page table.

use super::frame_pool::FrameId;
use std::collections::BTreeMap;

/// Access rights of a mapped page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    /// Code pages.
    ReadOnly,
    /// Data, heap and stack pages.
    ReadWrite,
}

/// A mapped page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageEntry {
    /// Backing frame in the machine's pool.
    pub frame: FrameId,
    /// Access rights.
    pub permission: Permission,
}

/// Ordered map from virtual page number to page entry. Absent pages are
/// unmapped.
#[derive(Clone, Debug, Default)]
pub struct PageTable {
    entries: BTreeMap<u64, PageEntry>,
}

impl PageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vpn: u64) -> Option<PageEntry> {
        self.entries.get(&vpn).copied()
    }

    pub fn map(&mut self, vpn: u64, entry: PageEntry) -> Option<PageEntry> {
        self.entries.insert(vpn, entry)
    }

    pub fn unmap(&mut self, vpn: u64) -> Option<PageEntry> {
        self.entries.remove(&vpn)
    }

    pub fn is_mapped(&self, vpn: u64) -> bool {
        self.entries.contains_key(&vpn)
    }

    /// Number of mapped pages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mapped pages in ascending page order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, PageEntry)> + '_ {
        self.entries.iter().map(|(vpn, entry)| (*vpn, *entry))
    }

    /// Removes every page with `start <= vpn < end` and returns them.
    pub fn unmap_range(&mut self, start: u64, end: u64) -> Vec<(u64, PageEntry)> {
        let vpns: Vec<u64> = self.entries.range(start..end).map(|(vpn, _)| *vpn).collect();
        vpns.into_iter()
            .filter_map(|vpn| self.entries.remove(&vpn).map(|e| (vpn, e)))
            .collect()
    }

    /// Removes every page and returns them.
    pub fn drain(&mut self) -> Vec<(u64, PageEntry)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }
}
