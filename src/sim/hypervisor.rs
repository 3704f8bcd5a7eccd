//! Hypervisor.
//!
//! A hypervisor owns the contexts it loaded (and their fork descendants),
//! schedules them round-robin with a fixed instruction quantum, and
//! services their syscalls through its host backend. It runs them by
//! switching to them on its engine, the machine one level below.
//!
//! A hypervisor is itself a [`Machine`]: the level above may create contexts
//! on it and switch to them. Such hosted contexts are forwarded to the
//! engine untouched; the hosting level never schedules them and never
//! services their syscalls.
//!
//! Nesting follows a `switch` forwarding model: only the top level
//! schedules, and each lower level turns `switch(id, quantum)` into a
//! `switch` on its own engine until the call reaches the [`Cpu`] at level 0.
//! Traps travel back up the same path. Lower levels keep their own
//! statistics and check that they host the context, but apply no policy of
//! their own, so every level of a stack runs the same scheduling code.
//!
//! Context state machine:
//!
//! ```text
//! Ready --switch--> Running --timer/yield/syscall done--> Ready
//!                   Running --ecall--> Blocked(Syscall) --> Ready
//!                                      Blocked(Wait)    --child exits--> Ready
//!                   Running --exit/fault/kill--> Exited
//!                   Running --fault (debug traps)--> Trapped
//! ```

mod syscall;

use crate::common::constants::NUM_REGISTERS;
use crate::common::{Fault, HostError, HostResult};
use crate::config::Config;
use crate::core::arch::trap::{ExitStatus, Trap};
use crate::core::context::{BlockReason, Context, ContextId, ContextState};
use crate::core::{Cpu, Machine};
use crate::isa::abi;
use crate::sim::image::CodeImage;
use crate::sim::loader::LoadOptions;
use crate::sim::replay::{Replayer, ReplayState, TraceLog};
use crate::soc::host::NullHost;
use crate::soc::memory::{MemoryMode, Pager, PoolUsage};
use crate::soc::traits::HostIo;
use crate::stats::SimStats;
use std::collections::{BTreeSet, VecDeque};

use self::syscall::SyscallOutcome;

/// Inspectable copy of a context's observable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub id: ContextId,
    pub regs: [u64; NUM_REGISTERS],
    pub pc: u64,
    pub state: ContextState,
    pub exit_status: Option<ExitStatus>,
    pub instructions: u64,
    pub frames_mapped: usize,
}

/// A scheduler and syscall layer on top of a lower machine.
pub struct Hypervisor {
    level: u32,
    engine: Box<dyn Machine>,
    ready: VecDeque<ContextId>,
    owned: BTreeSet<ContextId>,
    hosted: BTreeSet<ContextId>,
    orphans: BTreeSet<ContextId>,
    quantum: u64,
    memory_mode: MemoryMode,
    stack_size: u64,
    host: Box<dyn HostIo>,
    replay: ReplayState,
    debug_traps: bool,
    pub stats: SimStats,
}

impl Hypervisor {
    /// Builds the configured stack of levels with `host` serving the top.
    pub fn new(config: &Config, host: Box<dyn HostIo>) -> HostResult<Self> {
        Self::nested(config, host, config.scheduler.virtualization_level)
    }

    /// Builds a stack of `level` hypervisors over one interpreter. Only the
    /// top level talks to `host`; the levels below it are pass-through.
    ///
    /// # Errors
    ///
    /// `InvalidLevel` for level 0.
    pub fn nested(config: &Config, host: Box<dyn HostIo>, level: u32) -> HostResult<Self> {
        if level == 0 {
            return Err(HostError::InvalidLevel(level));
        }
        let mut engine: Box<dyn Machine> = Box::new(Cpu::from_config(config));
        for _ in 1..level {
            engine = Box::new(Self::on_top_of(engine, config, Box::new(NullHost)));
        }
        let hv = Self::on_top_of(engine, config, host);
        log::info!(
            "hypervisor stack of {} level(s), {} frames, quantum {}",
            hv.level,
            config.memory.frames,
            hv.quantum
        );
        Ok(hv)
    }

    /// Creates a hypervisor one level above `engine`.
    pub fn on_top_of(engine: Box<dyn Machine>, config: &Config, host: Box<dyn HostIo>) -> Self {
        Self {
            level: engine.level() + 1,
            engine,
            ready: VecDeque::new(),
            owned: BTreeSet::new(),
            hosted: BTreeSet::new(),
            orphans: BTreeSet::new(),
            quantum: config.scheduler.quantum.max(1),
            memory_mode: config.memory.mode,
            stack_size: config.memory.stack_size,
            host,
            replay: ReplayState::Off,
            debug_traps: false,
            stats: SimStats::default(),
        }
    }

    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    /// Memory mode applied to contexts loaded from now on.
    pub fn configure_memory_mode(&mut self, mode: MemoryMode) {
        self.memory_mode = mode;
    }

    pub fn memory_mode(&self) -> MemoryMode {
        self.memory_mode
    }

    /// Parks faulting contexts in `Trapped` instead of terminating them.
    pub fn set_debug_traps(&mut self, enabled: bool) {
        self.debug_traps = enabled;
    }

    pub fn debug_traps(&self) -> bool {
        self.debug_traps
    }

    pub fn host(&self) -> &dyn HostIo {
        self.host.as_ref()
    }

    pub fn engine(&self) -> &dyn Machine {
        self.engine.as_ref()
    }

    /// Starts recording every completed syscall.
    pub fn start_recording(&mut self) {
        self.replay = ReplayState::Record(TraceLog::new());
    }

    /// Serves subsequent syscalls from `log`.
    pub fn start_replay(&mut self, log: TraceLog) {
        self.replay = ReplayState::Replay(Replayer::new(log));
    }

    /// Returns the recorded trace and stops recording.
    pub fn take_trace(&mut self) -> Option<TraceLog> {
        match std::mem::take(&mut self.replay) {
            ReplayState::Record(log) => Some(log),
            other => {
                self.replay = other;
                None
            }
        }
    }

    /// The active replayer, if replaying.
    pub fn replayer(&self) -> Option<&Replayer> {
        match &self.replay {
            ReplayState::Replay(r) => Some(r),
            _ => None,
        }
    }

    fn context_of(&self, id: ContextId) -> HostResult<&Context> {
        self.engine.context(id).ok_or(HostError::UnknownContext(id))
    }

    fn context_of_mut(&mut self, id: ContextId) -> HostResult<&mut Context> {
        self.engine
            .context_mut(id)
            .ok_or(HostError::UnknownContext(id))
    }

    fn check_owned(&self, id: ContextId) -> HostResult<()> {
        if self.owned.contains(&id) {
            Ok(())
        } else {
            Err(HostError::UnknownContext(id))
        }
    }

    fn check_hosted(&self, id: ContextId) -> HostResult<()> {
        if self.hosted.contains(&id) {
            Ok(())
        } else {
            Err(HostError::UnknownContext(id))
        }
    }

    /// Loads `image` as a new context with argument vector `args` and
    /// queues it.
    pub fn load(&mut self, image: &CodeImage, args: &[String]) -> HostResult<ContextId> {
        let options = LoadOptions {
            mode: self.memory_mode,
            stack_size: self.stack_size,
            args: args.to_vec(),
        };
        let id = self.engine.create_context(image, &options)?;
        self.owned.insert(id);
        self.ready.push_back(id);
        self.stats.contexts_created += 1;
        log::info!("level {} loaded context {}", self.level, id);
        Ok(id)
    }

    /// Observable state of an owned context.
    pub fn snapshot(&self, id: ContextId) -> HostResult<ContextSnapshot> {
        self.check_owned(id)?;
        let ctx = self.context_of(id)?;
        Ok(ContextSnapshot {
            id,
            regs: ctx.regs.snapshot(),
            pc: ctx.pc,
            state: ctx.state,
            exit_status: ctx.exit_status,
            instructions: ctx.instructions,
            frames_mapped: ctx.space.frames_mapped(),
        })
    }

    /// Current program counter of an owned context.
    pub fn pc_of(&self, id: ContextId) -> HostResult<u64> {
        self.check_owned(id)?;
        Ok(self.context_of(id)?.pc)
    }

    /// Exit status of an owned context, `None` while it runs.
    pub fn exit_status(&self, id: ContextId) -> HostResult<Option<ExitStatus>> {
        self.check_owned(id)?;
        Ok(self.context_of(id)?.exit_status)
    }

    /// Owned contexts that have not been removed yet.
    pub fn owned_contexts(&self) -> Vec<ContextId> {
        self.owned.iter().copied().collect()
    }

    /// Contexts in the ready queue, front first.
    pub fn ready_queue(&self) -> Vec<ContextId> {
        self.ready.iter().copied().collect()
    }

    /// Memory of an owned context.
    pub fn guest_memory(&mut self, id: ContextId) -> HostResult<Pager<'_>> {
        self.check_owned(id)?;
        self.engine.memory(id).ok_or(HostError::UnknownContext(id))
    }

    fn make_ready(&mut self, id: ContextId) -> HostResult<()> {
        self.context_of_mut(id)?.state = ContextState::Ready;
        if !self.ready.contains(&id) {
            self.ready.push_back(id);
        }
        Ok(())
    }

    /// Drops stale entries from the front of the ready queue and returns the
    /// next context to run without dequeuing it.
    pub fn next_ready(&mut self) -> Option<ContextId> {
        while let Some(&id) = self.ready.front() {
            match self.engine.context(id) {
                Some(ctx) if ctx.state == ContextState::Ready => return Some(id),
                _ => {
                    self.ready.pop_front();
                }
            }
        }
        None
    }

    /// Moves `id` to the back of the ready queue if it is still ready.
    pub fn requeue(&mut self, id: ContextId) {
        self.ready.retain(|x| *x != id);
        if matches!(self.engine.context(id), Some(c) if c.state == ContextState::Ready) {
            self.ready.push_back(id);
        }
    }

    /// Runs the next ready context for one quantum.
    ///
    /// Returns the context that ran, or `None` if nothing was ready.
    pub fn schedule_once(&mut self) -> HostResult<Option<ContextId>> {
        let Some(id) = self.next_ready() else {
            return Ok(None);
        };
        self.ready.pop_front();
        self.slice(id, self.quantum)?;
        Ok(Some(id))
    }

    /// Runs an owned context for up to `quantum` instructions and handles
    /// the resulting trap.
    pub fn slice(&mut self, id: ContextId, quantum: u64) -> HostResult<Trap> {
        self.check_owned(id)?;
        let ctx = self.context_of_mut(id)?;
        if ctx.state != ContextState::Ready {
            return Err(HostError::SchedulerInvariant {
                context: id,
                pc: ctx.pc,
                reason: format!("scheduled in state {:?}", ctx.state),
            });
        }
        ctx.state = ContextState::Running;
        self.stats.context_switches += 1;
        log::debug!("level {} switch to {}", self.level, id);

        let trap = self.engine.switch(id, quantum)?;
        self.handle_trap(id, trap)?;
        Ok(trap)
    }

    fn handle_trap(&mut self, id: ContextId, trap: Trap) -> HostResult<()> {
        match trap {
            Trap::TimerInterrupt => {
                self.stats.timer_interrupts += 1;
                self.make_ready(id)
            }
            Trap::EnvironmentCall => self.service_ecall(id),
            Trap::Fault { fault, pc } => self.handle_fault(id, fault, pc),
        }
    }

    fn service_ecall(&mut self, id: ContextId) -> HostResult<()> {
        self.context_of_mut(id)?.state = ContextState::Blocked(BlockReason::Syscall);
        let pc = self.context_of(id)?.pc;

        match self.dispatch_syscall(id)? {
            SyscallOutcome::Return(value) => {
                let ctx = self.context_of_mut(id)?;
                ctx.regs.write(abi::REG_A0, value as u64);
                ctx.pc = pc.wrapping_add(4);
                self.make_ready(id)
            }
            SyscallOutcome::Exit(code) => {
                self.context_of_mut(id)?.pc = pc.wrapping_add(4);
                self.terminate(id, ExitStatus::Exited(code))
            }
            SyscallOutcome::Block(reason) => {
                self.context_of_mut(id)?.state = ContextState::Blocked(reason);
                Ok(())
            }
            SyscallOutcome::Fault(fault) => self.handle_fault(id, fault, pc),
        }
    }

    fn handle_fault(&mut self, id: ContextId, fault: Fault, pc: u64) -> HostResult<()> {
        self.stats.faults += 1;
        log::warn!("context {} faulted: {} at pc {:#x}", id, fault, pc);
        if self.debug_traps {
            self.context_of_mut(id)?.state = ContextState::Trapped { fault, pc };
            self.ready.retain(|x| *x != id);
            Ok(())
        } else {
            self.terminate(id, ExitStatus::Faulted { fault, pc })
        }
    }

    /// Terminates a context: frames go back to the pool, its children are
    /// orphaned and a waiting parent is woken.
    fn terminate(&mut self, id: ContextId, status: ExitStatus) -> HostResult<()> {
        let released = self.engine.release_memory(id)?;
        let (parent, children) = {
            let ctx = self.context_of_mut(id)?;
            ctx.terminate(status);
            (ctx.parent, std::mem::take(&mut ctx.children))
        };
        self.ready.retain(|x| *x != id);
        self.stats.exits += 1;
        log::info!("context {} {} ({} frames released)", id, status, released);

        for child in children {
            let exited = match self.engine.context_mut(child) {
                Some(c) => {
                    c.parent = None;
                    c.has_exited()
                }
                None => continue,
            };
            if exited {
                self.discard(child)?;
            } else {
                self.orphans.insert(child);
            }
        }

        if self.orphans.remove(&id) {
            self.discard(id)
        } else if let Some(parent) = parent {
            self.wake_parent(parent, id)
        } else {
            Ok(())
        }
    }

    fn wake_parent(&mut self, parent: ContextId, child: ContextId) -> HostResult<()> {
        let waiting = match self.engine.context(parent).map(|p| p.state) {
            Some(ContextState::Blocked(BlockReason::Wait(target))) => {
                target.map_or(true, |t| t == child)
            }
            _ => false,
        };
        if waiting {
            log::debug!("context {} wakes parent {}", child, parent);
            self.make_ready(parent)?;
        }
        Ok(())
    }

    fn discard(&mut self, id: ContextId) -> HostResult<()> {
        self.engine.destroy_context(id)?;
        self.owned.remove(&id);
        self.orphans.remove(&id);
        self.ready.retain(|x| *x != id);
        Ok(())
    }

    /// Terminates `child` on behalf of `parent`.
    ///
    /// Returns false if `child` is not a live child of `parent`.
    pub fn kill(&mut self, parent: ContextId, child: ContextId) -> HostResult<bool> {
        if !self.owned.contains(&child) {
            return Ok(false);
        }
        let ctx = self.context_of(child)?;
        if ctx.parent != Some(parent) || ctx.has_exited() {
            return Ok(false);
        }
        self.terminate(child, ExitStatus::Killed)?;
        Ok(true)
    }

    /// Removes an exited context and returns its exit status. Returns
    /// `None` (and keeps the context) while it has not exited.
    pub fn reap(&mut self, id: ContextId) -> HostResult<Option<ExitStatus>> {
        self.check_owned(id)?;
        let status = self.context_of(id)?.exit_status;
        if status.is_some() {
            self.discard(id)?;
        }
        Ok(status)
    }

    /// Terminates a context parked in `Trapped` with the fault it raised.
    pub fn finalize_trapped(&mut self, id: ContextId) -> HostResult<ExitStatus> {
        self.check_owned(id)?;
        let (state, pc) = {
            let ctx = self.context_of(id)?;
            (ctx.state, ctx.pc)
        };
        match state {
            ContextState::Trapped { fault, pc } => {
                let status = ExitStatus::Faulted { fault, pc };
                self.terminate(id, status)?;
                Ok(status)
            }
            state => Err(HostError::SchedulerInvariant {
                context: id,
                pc,
                reason: format!("finalize of an untrapped context in state {:?}", state),
            }),
        }
    }

    /// Schedules every owned context until `id` exits and returns its exit
    /// status. The context stays until reaped.
    ///
    /// # Errors
    ///
    /// `SchedulerInvariant` if nothing is runnable while `id` has not
    /// exited, so the run can never complete.
    pub fn run(&mut self, id: ContextId) -> HostResult<ExitStatus> {
        self.check_owned(id)?;
        loop {
            let (status, state, pc) = {
                let ctx = self.context_of(id)?;
                (ctx.exit_status, ctx.state, ctx.pc)
            };
            if let Some(status) = status {
                return Ok(status);
            }
            if matches!(state, ContextState::Trapped { .. }) {
                return self.finalize_trapped(id);
            }
            if self.schedule_once()?.is_none() {
                return Err(HostError::SchedulerInvariant {
                    context: id,
                    pc,
                    reason: "no runnable context left".to_string(),
                });
            }
        }
    }

    /// Schedules until no context is ready and returns the exit status of
    /// every owned context that has one.
    pub fn run_all(&mut self) -> HostResult<Vec<(ContextId, ExitStatus)>> {
        while self.schedule_once()?.is_some() {}
        Ok(self
            .owned
            .iter()
            .filter_map(|id| {
                self.engine
                    .context(*id)
                    .and_then(|c| c.exit_status)
                    .map(|s| (*id, s))
            })
            .collect())
    }

    /// Executes exactly one instruction of an owned context.
    ///
    /// Returns `None` when the instruction completed without trapping (or
    /// the context is blocked), otherwise the trap, which has already been
    /// handled: syscalls are serviced and faults recorded.
    pub fn step(&mut self, id: ContextId) -> HostResult<Option<Trap>> {
        self.check_owned(id)?;
        let ctx = self.context_of_mut(id)?;
        match ctx.state {
            ContextState::Ready | ContextState::Running => {}
            ContextState::Blocked(_) => return Ok(None),
            state => {
                return Err(HostError::SchedulerInvariant {
                    context: id,
                    pc: ctx.pc,
                    reason: format!("step in state {:?}", state),
                })
            }
        }
        ctx.state = ContextState::Running;

        match self.engine.switch(id, 1)? {
            Trap::TimerInterrupt => {
                self.make_ready(id)?;
                Ok(None)
            }
            trap => {
                self.handle_trap(id, trap)?;
                Ok(Some(trap))
            }
        }
    }
}

impl Machine for Hypervisor {
    fn level(&self) -> u32 {
        self.level
    }

    fn create_context(
        &mut self,
        image: &CodeImage,
        options: &LoadOptions,
    ) -> HostResult<ContextId> {
        let id = self.engine.create_context(image, options)?;
        self.hosted.insert(id);
        self.stats.contexts_created += 1;
        Ok(id)
    }

    fn fork_context(&mut self, parent: ContextId) -> HostResult<Option<ContextId>> {
        self.check_hosted(parent)?;
        let child = self.engine.fork_context(parent)?;
        if let Some(child) = child {
            self.hosted.insert(child);
            self.stats.forks += 1;
        }
        Ok(child)
    }

    fn destroy_context(&mut self, id: ContextId) -> HostResult<()> {
        self.check_hosted(id)?;
        self.engine.destroy_context(id)?;
        self.hosted.remove(&id);
        Ok(())
    }

    fn release_memory(&mut self, id: ContextId) -> HostResult<usize> {
        self.check_hosted(id)?;
        self.engine.release_memory(id)
    }

    fn switch(&mut self, id: ContextId, quantum: u64) -> HostResult<Trap> {
        self.check_hosted(id)?;
        self.stats.context_switches += 1;
        let trap = self.engine.switch(id, quantum)?;
        match trap {
            Trap::TimerInterrupt => self.stats.timer_interrupts += 1,
            Trap::EnvironmentCall => self.stats.syscalls += 1,
            Trap::Fault { .. } => self.stats.faults += 1,
        }
        Ok(trap)
    }

    fn context(&self, id: ContextId) -> Option<&Context> {
        if self.hosted.contains(&id) {
            self.engine.context(id)
        } else {
            None
        }
    }

    fn context_mut(&mut self, id: ContextId) -> Option<&mut Context> {
        if self.hosted.contains(&id) {
            self.engine.context_mut(id)
        } else {
            None
        }
    }

    fn memory(&mut self, id: ContextId) -> Option<Pager<'_>> {
        if self.hosted.contains(&id) {
            self.engine.memory(id)
        } else {
            None
        }
    }

    fn frames(&self) -> PoolUsage {
        self.engine.frames()
    }

    fn stats(&self) -> &SimStats {
        &self.stats
    }

    fn all_stats(&self) -> Vec<(u32, SimStats)> {
        let mut all = vec![(self.level, self.stats.clone())];
        all.extend(self.engine.all_stats());
        all
    }
}
