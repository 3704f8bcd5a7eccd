//! Level 0 machine.
//!
//! The `Cpu` owns the frame pool and the table of every context in the
//! stack, and interprets instructions for whichever context a hypervisor
//! switches to. It makes no scheduling decisions: `switch` runs one
//! context until its quantum expires, it calls `ecall`, or it faults.

use crate::common::{Fault, HostError, HostResult};
use crate::config::Config;
use crate::core::arch::trap::Trap;
use crate::core::context::{Context, ContextId, ContextState};
use crate::core::stages::{self, Flow};
use crate::core::Machine;
use crate::sim::image::CodeImage;
use crate::sim::loader::{self, LoadOptions};
use crate::soc::memory::{FramePool, Pager, PoolUsage};
use crate::stats::SimStats;
use std::collections::BTreeMap;

/// Instruction interpreter and owner of all guest memory.
pub struct Cpu {
    pool: FramePool,
    contexts: BTreeMap<ContextId, Context>,
    next_id: u32,
    /// Log every instruction at `trace` level.
    pub trace: bool,
    pub stats: SimStats,
}

impl Cpu {
    /// Creates an interpreter with a pool of `frames` frames.
    pub fn new(frames: usize) -> Self {
        Self {
            pool: FramePool::new(frames),
            contexts: BTreeMap::new(),
            next_id: 1,
            trace: false,
            stats: SimStats::default(),
        }
    }

    /// Creates an interpreter sized and traced as configured.
    pub fn from_config(config: &Config) -> Self {
        let mut cpu = Self::new(config.memory.frames);
        cpu.trace = config.general.trace_instructions;
        cpu
    }

    fn allocate_id(&mut self) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Machine for Cpu {
    fn level(&self) -> u32 {
        0
    }

    fn create_context(
        &mut self,
        image: &CodeImage,
        options: &LoadOptions,
    ) -> HostResult<ContextId> {
        let id = self.allocate_id();
        let ctx = loader::load_context(id, image, options, &mut self.pool)?;
        self.contexts.insert(id, ctx);
        self.stats.contexts_created += 1;
        Ok(id)
    }

    fn fork_context(&mut self, parent: ContextId) -> HostResult<Option<ContextId>> {
        let id = ContextId(self.next_id);
        let source = self
            .contexts
            .get(&parent)
            .ok_or(HostError::UnknownContext(parent))?;

        let mut space = source.space.empty_copy();
        match Pager::new(&mut space, &mut self.pool).copy_from(&source.space) {
            Ok(()) => {}
            Err(Fault::PageTableExhausted) => return Ok(None),
            Err(fault) => {
                return Err(HostError::SchedulerInvariant {
                    context: parent,
                    pc: source.pc,
                    reason: format!("fork copy failed: {}", fault),
                })
            }
        }

        let mut child = Context::new(id, space, source.pc);
        child.regs = source.regs.clone();
        child.parent = Some(parent);
        self.next_id += 1;
        self.contexts.insert(id, child);
        if let Some(p) = self.contexts.get_mut(&parent) {
            p.children.insert(id);
        }
        self.stats.contexts_created += 1;
        Ok(Some(id))
    }

    fn destroy_context(&mut self, id: ContextId) -> HostResult<()> {
        let mut ctx = self
            .contexts
            .remove(&id)
            .ok_or(HostError::UnknownContext(id))?;
        Pager::new(&mut ctx.space, &mut self.pool).release();

        if let Some(parent) = ctx.parent.and_then(|p| self.contexts.get_mut(&p)) {
            parent.children.remove(&id);
        }
        for child in &ctx.children {
            if let Some(c) = self.contexts.get_mut(child) {
                c.parent = None;
            }
        }
        Ok(())
    }

    fn release_memory(&mut self, id: ContextId) -> HostResult<usize> {
        let ctx = self
            .contexts
            .get_mut(&id)
            .ok_or(HostError::UnknownContext(id))?;
        Ok(Pager::new(&mut ctx.space, &mut self.pool).release())
    }

    fn switch(&mut self, id: ContextId, quantum: u64) -> HostResult<Trap> {
        let ctx = self
            .contexts
            .get_mut(&id)
            .ok_or(HostError::UnknownContext(id))?;
        if ctx.state == ContextState::Exited {
            return Err(HostError::SchedulerInvariant {
                context: id,
                pc: ctx.pc,
                reason: "switch to an exited context".to_string(),
            });
        }

        let faults_before = ctx.space.page_faults;
        let start = ctx.instructions;
        let mut trap = Trap::TimerInterrupt;

        for _ in 0..quantum {
            match stages::step(ctx, &mut self.pool, self.trace) {
                Ok(Flow::Next) => {}
                Ok(Flow::EnvironmentCall) => {
                    trap = Trap::EnvironmentCall;
                    break;
                }
                Err(Fault::PageTableExhausted) => {
                    return Err(HostError::ResourceExhausted {
                        context: id,
                        pc: ctx.pc,
                    });
                }
                Err(fault) => {
                    trap = Trap::Fault { fault, pc: ctx.pc };
                    break;
                }
            }
        }

        self.stats.instructions += ctx.instructions - start;
        self.stats.page_faults += ctx.space.page_faults - faults_before;
        self.stats.frames_peak = self.pool.usage().peak;
        Ok(trap)
    }

    fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(&id)
    }

    fn context_mut(&mut self, id: ContextId) -> Option<&mut Context> {
        self.contexts.get_mut(&id)
    }

    fn memory(&mut self, id: ContextId) -> Option<Pager<'_>> {
        let ctx = self.contexts.get_mut(&id)?;
        Some(Pager::new(&mut ctx.space, &mut self.pool))
    }

    fn frames(&self) -> PoolUsage {
        self.pool.usage()
    }

    fn stats(&self) -> &SimStats {
        &self.stats
    }

    fn all_stats(&self) -> Vec<(u32, SimStats)> {
        vec![(0, self.stats.clone())]
    }
}
