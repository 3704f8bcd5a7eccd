//! Interactive debugging support.
//!
//! A [`Debugger`] wraps a hypervisor with debug traps enabled, so a context
//! that faults is parked in `Trapped` with its registers intact instead of
//! being terminated.

use crate::common::constants::NUM_REGISTERS;
use crate::common::{Fault, HostResult};
use crate::core::arch::trap::{ExitStatus, Trap};
use crate::core::context::{ContextId, ContextState};
use crate::isa::disasm;
use crate::sim::hypervisor::Hypervisor;
use std::collections::BTreeSet;

/// Why [`Debugger::resume`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A context reached a breakpoint; the instruction there has not run.
    Breakpoint { id: ContextId, pc: u64 },
    /// The predicate accepted a context's pc; the instruction has not run.
    Predicate { id: ContextId, pc: u64 },
    /// A context faulted and is parked for inspection.
    Trapped { id: ContextId, fault: Fault, pc: u64 },
    /// No context is runnable.
    Idle,
}

/// Register file and pc of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registers {
    pub x: [u64; NUM_REGISTERS],
    pub pc: u64,
}

type PcPredicate = Box<dyn FnMut(ContextId, u64) -> bool>;

/// Single-stepping debugger over a hypervisor.
pub struct Debugger {
    hv: Hypervisor,
    breakpoints: BTreeSet<u64>,
    predicate: Option<PcPredicate>,
    resume_from: Option<(ContextId, u64)>,
}

impl Debugger {
    pub fn new(mut hv: Hypervisor) -> Self {
        hv.set_debug_traps(true);
        Self {
            hv,
            breakpoints: BTreeSet::new(),
            predicate: None,
            resume_from: None,
        }
    }

    pub fn hypervisor(&self) -> &Hypervisor {
        &self.hv
    }

    /// Gives the hypervisor back, with debug traps still enabled.
    pub fn into_inner(self) -> Hypervisor {
        self.hv
    }

    pub fn add_breakpoint(&mut self, pc: u64) {
        self.breakpoints.insert(pc);
    }

    pub fn remove_breakpoint(&mut self, pc: u64) -> bool {
        self.breakpoints.remove(&pc)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = u64> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Stops [`resume`](Self::resume) before any instruction whose context
    /// and pc satisfy `predicate`.
    pub fn set_predicate(&mut self, predicate: impl FnMut(ContextId, u64) -> bool + 'static) {
        self.predicate = Some(Box::new(predicate));
    }

    pub fn clear_predicate(&mut self) {
        self.predicate = None;
    }

    /// Executes one instruction of `id`.
    pub fn step(&mut self, id: ContextId) -> HostResult<Option<Trap>> {
        self.resume_from = None;
        self.hv.step(id)
    }

    /// Runs the scheduler one instruction at a time until a breakpoint, the
    /// predicate or a fault stops it, or nothing is left to run.
    ///
    /// Resuming from a breakpoint or predicate stop executes the stopped
    /// instruction before checking again.
    pub fn resume(&mut self) -> HostResult<StopReason> {
        let mut skip = self.resume_from.take();
        loop {
            let Some(id) = self.hv.next_ready() else {
                return Ok(StopReason::Idle);
            };

            for _ in 0..self.hv.quantum() {
                let pc = self.hv.pc_of(id)?;
                if skip == Some((id, pc)) {
                    skip = None;
                } else if self.breakpoints.contains(&pc) {
                    self.resume_from = Some((id, pc));
                    return Ok(StopReason::Breakpoint { id, pc });
                } else if self.predicate.as_mut().map_or(false, |p| p(id, pc)) {
                    self.resume_from = Some((id, pc));
                    return Ok(StopReason::Predicate { id, pc });
                }

                // Syscall handlers can fault too, so the state is what
                // tells whether the context ended up trapped.
                self.hv.step(id)?;
                match self.hv.snapshot(id).map(|s| s.state) {
                    Ok(ContextState::Ready) => {}
                    Ok(ContextState::Trapped { fault, pc }) => {
                        return Ok(StopReason::Trapped { id, fault, pc });
                    }
                    _ => break,
                }
            }
            self.hv.requeue(id);
        }
    }

    /// Registers of a context, typically one that is trapped or stopped.
    pub fn registers(&self, id: ContextId) -> HostResult<Registers> {
        let snap = self.hv.snapshot(id)?;
        Ok(Registers {
            x: snap.regs,
            pc: snap.pc,
        })
    }

    /// Disassembles the instruction at the context's pc.
    pub fn disassemble(&mut self, id: ContextId) -> HostResult<String> {
        let pc = self.hv.pc_of(id)?;
        let word = self.hv.guest_memory(id)?.fetch_u32(pc);
        Ok(match word {
            Ok(word) => disasm::trace_line(pc, word),
            Err(fault) => format!("{:#010x}: <{}>", pc, fault),
        })
    }

    /// Fault and pc of a trapped context.
    pub fn trap_of(&self, id: ContextId) -> HostResult<Option<(Fault, u64)>> {
        Ok(match self.hv.snapshot(id)?.state {
            ContextState::Trapped { fault, pc } => Some((fault, pc)),
            _ => None,
        })
    }

    /// Ends a trapped context with the fault it raised.
    pub fn terminate(&mut self, id: ContextId) -> HostResult<ExitStatus> {
        self.hv.finalize_trapped(id)
    }
}
