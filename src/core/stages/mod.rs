//! Instruction cycle of the level 0 machine.
//!
//! One instruction is fetched through the pager, decoded by the shared ISA
//! decoder and executed against the context's register file and memory.
//! There is no pipelining: each instruction completes before the next is
//! fetched.

/// Execute stage.
pub mod execute;

/// Fetch stage.
pub mod fetch;

use crate::common::Fault;
use crate::core::context::Context;
use crate::isa::decode;
use crate::soc::memory::{FramePool, Pager};

pub use execute::Flow;

/// Runs one complete instruction cycle for `context`.
///
/// On a fault the context is unchanged: no register is written and the pc
/// still points at the faulting instruction.
pub fn step(context: &mut Context, pool: &mut FramePool, trace: bool) -> Result<Flow, Fault> {
    let Context {
        regs, pc, space, ..
    } = context;
    let mut pager = Pager::new(space, pool);

    let word = fetch::fetch_stage(&mut pager, *pc, trace)?;
    let inst = decode(word)?;
    let flow = execute::execute_stage(inst, regs, pc, &mut pager)?;

    context.instructions += 1;
    Ok(flow)
}
