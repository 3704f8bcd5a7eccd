//! Guest execution contexts.
//!
//! A context is one virtual machine instance: a register file, a program
//! counter, an address space and the bookkeeping a hypervisor needs to
//! schedule it and report its exit to its parent.

use crate::common::Fault;
use crate::core::arch::gpr::Gpr;
use crate::core::arch::trap::ExitStatus;
use crate::soc::memory::AddressSpace;
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a context, unique within the machine that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub u32);

impl ContextId {
    /// Raw value, as handed to the guest by `fork`.
    pub fn val(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a context is not runnable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// Its `ecall` is being serviced.
    Syscall,
    /// It waits for a child to exit (`None` = any child).
    Wait(Option<ContextId>),
}

/// Scheduling state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Ready,
    Running,
    Blocked(BlockReason),
    /// Parked after a fault for inspection by a debugger.
    Trapped { fault: Fault, pc: u64 },
    Exited,
}

/// One guest execution context.
#[derive(Clone, Debug)]
pub struct Context {
    pub id: ContextId,
    pub regs: Gpr,
    pub pc: u64,
    pub space: AddressSpace,
    pub state: ContextState,
    pub exit_status: Option<ExitStatus>,
    pub parent: Option<ContextId>,
    pub children: BTreeSet<ContextId>,
    /// Instructions retired.
    pub instructions: u64,
}

impl Context {
    /// Creates a ready context starting at `entry`.
    pub fn new(id: ContextId, space: AddressSpace, entry: u64) -> Self {
        Self {
            id,
            regs: Gpr::new(),
            pc: entry,
            space,
            state: ContextState::Ready,
            exit_status: None,
            parent: None,
            children: BTreeSet::new(),
            instructions: 0,
        }
    }

    /// Returns true once the context has an exit status.
    pub fn has_exited(&self) -> bool {
        self.exit_status.is_some()
    }

    /// Records the exit status and marks the context exited.
    pub fn terminate(&mut self, status: ExitStatus) {
        self.exit_status = Some(status);
        self.state = ContextState::Exited;
    }
}
