//! Instruction Fetch.
//!
//! Reads the word at the pc through the pager, logging it at `trace` level
//! when instruction tracing is on.

use crate::common::Fault;
use crate::isa::disasm;
use crate::soc::memory::Pager;

/// Fetches the instruction word at `pc`.
///
/// The pc must be 4-byte aligned and inside the code segment.
pub fn fetch_stage(pager: &mut Pager<'_>, pc: u64, trace: bool) -> Result<u32, Fault> {
    let inst = pager.fetch_u32(pc)?;

    if trace || cfg!(feature = "always-trace") {
        log::trace!("IF  {}", disasm::trace_line(pc, inst));
    }

    Ok(inst)
}
