//! Execution engines.
//!
//! Every virtualization level is a [`Machine`]. Level 0 is the [`Cpu`],
//! which interprets instructions. Each hypervisor level sits on top of the
//! machine one level below it, asks that machine to run its contexts, and is
//! itself a machine for the level above.

/// RISC-U architectural state (registers, traps).
pub mod arch;

/// Guest execution contexts.
pub mod context;

/// The level 0 interpreter.
pub mod cpu;

/// Instruction cycle (fetch, decode, execute).
pub mod stages;

/// Functional units (ALU, LSU).
pub mod units;

pub use context::{Context, ContextId};
pub use cpu::Cpu;

use crate::common::HostResult;
use crate::core::arch::trap::Trap;
use crate::sim::image::CodeImage;
use crate::sim::loader::LoadOptions;
use crate::soc::memory::{Pager, PoolUsage};
use crate::stats::SimStats;

/// The contract shared by every virtualization level.
///
/// Contexts physically live in the level 0 machine; ids are unique across a
/// stack of levels. A level that hosts a context on behalf of the level
/// above forwards every request for it downwards after checking that it
/// knows the id.
pub trait Machine {
    /// Virtualization level: 0 for the interpreter, n for the n-th
    /// hypervisor stacked on top of it.
    fn level(&self) -> u32;

    /// Creates a context from a code image.
    fn create_context(&mut self, image: &CodeImage, options: &LoadOptions)
        -> HostResult<ContextId>;

    /// Creates a copy of `parent` with private copies of all its pages.
    ///
    /// Returns `Ok(None)` if the frame pool cannot hold the copy.
    fn fork_context(&mut self, parent: ContextId) -> HostResult<Option<ContextId>>;

    /// Removes a context, releasing any frames it still holds.
    fn destroy_context(&mut self, id: ContextId) -> HostResult<()>;

    /// Returns every frame of a context to the pool and returns how many
    /// there were. The context record stays.
    fn release_memory(&mut self, id: ContextId) -> HostResult<usize>;

    /// Runs a context for at most `quantum` instructions.
    fn switch(&mut self, id: ContextId, quantum: u64) -> HostResult<Trap>;

    fn context(&self, id: ContextId) -> Option<&Context>;

    fn context_mut(&mut self, id: ContextId) -> Option<&mut Context>;

    /// Memory accessor for a context.
    fn memory(&mut self, id: ContextId) -> Option<Pager<'_>>;

    /// Occupancy of the frame pool backing every level.
    fn frames(&self) -> PoolUsage;

    /// Counters of this level.
    fn stats(&self) -> &SimStats;

    /// Counters of this level and every level below it, top first.
    fn all_stats(&self) -> Vec<(u32, SimStats)>;
}
