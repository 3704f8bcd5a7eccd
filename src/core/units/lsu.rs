//! Load/Store Unit (LSU) Helpers.
//!
//! Address generation for `ld` and `sd`. Only doubleword accesses exist in
//! RISC-U and they must be naturally aligned.

use crate::common::constants::WORD_SIZE;
use crate::common::{Fault, VirtAddr};

/// Load/Store Unit.
pub struct Lsu;

impl Lsu {
    /// Computes `base + offset` and checks doubleword alignment.
    ///
    /// # Errors
    ///
    /// `Fault::MisalignedAccess` carrying the effective address.
    pub fn effective_address(base: u64, offset: i64) -> Result<VirtAddr, Fault> {
        let addr = base.wrapping_add(offset as u64);
        let vaddr = VirtAddr::new(addr);
        if !vaddr.is_aligned(WORD_SIZE) {
            return Err(Fault::MisalignedAccess(addr));
        }
        Ok(vaddr)
    }
}
