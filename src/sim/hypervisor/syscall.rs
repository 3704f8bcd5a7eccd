//! Syscall emulation.
//!
//! Arguments arrive in `a0`..`a3`, the syscall number in `a7`, and the
//! result goes back in `a0`. Guest mistakes (bad buffers, bad paths, bad
//! descriptors) return `-1`; only an unknown syscall number faults.

use super::Hypervisor;
use crate::common::constants::MAX_PATH_LENGTH;
use crate::common::{AccessType, Fault, HostError, HostResult};
use crate::core::context::{BlockReason, ContextId};
use crate::isa::abi::syscall::{
    self as sys, SYS_BRK, SYS_EXIT, SYS_FORK, SYS_KILL, SYS_OPENAT, SYS_READ, SYS_SCHED_YIELD,
    SYS_WAIT, SYS_WRITE,
};
use crate::isa::abi;
use crate::sim::replay::{ReplayState, TraceEntry};
use crate::soc::memory::Pager;

/// What the scheduler does with a context after its syscall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SyscallOutcome {
    /// Write the value to `a0`, step past the `ecall`, make ready.
    Return(i64),
    /// Terminate with this exit code.
    Exit(i64),
    /// Leave the pc on the `ecall` and block; it is re-executed on wakeup.
    Block(BlockReason),
    /// Terminate with a fault.
    Fault(Fault),
}

struct Call {
    pc: u64,
    nr: u64,
    args: [u64; 4],
}

fn is_host_io(nr: u64) -> bool {
    matches!(nr, SYS_READ | SYS_WRITE | SYS_OPENAT)
}

impl Hypervisor {
    pub(super) fn dispatch_syscall(&mut self, id: ContextId) -> HostResult<SyscallOutcome> {
        let call = {
            let ctx = self.context_of(id)?;
            Call {
                pc: ctx.pc,
                nr: ctx.regs.read(abi::REG_A7),
                args: [
                    ctx.regs.read(abi::REG_A0),
                    ctx.regs.read(abi::REG_A1),
                    ctx.regs.read(abi::REG_A2),
                    ctx.regs.read(abi::REG_A3),
                ],
            }
        };
        self.stats.syscalls += 1;
        log::debug!(
            "context {} syscall {} ({}) at {:#x}",
            id,
            call.nr,
            sys::name(call.nr),
            call.pc
        );

        if self.replay.is_replaying() && is_host_io(call.nr) {
            return self.replay_host_io(id, &call);
        }

        let mut data = Vec::new();
        let outcome = match call.nr {
            SYS_READ => self.sys_read(id, &call, &mut data)?,
            SYS_WRITE => self.sys_write(id, &call)?,
            SYS_OPENAT => self.sys_openat(id, &call)?,
            SYS_EXIT => SyscallOutcome::Exit(call.args[0] as i64),
            SYS_SCHED_YIELD => SyscallOutcome::Return(0),
            SYS_KILL => self.sys_kill(id, &call)?,
            SYS_BRK => self.sys_brk(id, &call)?,
            SYS_FORK => self.sys_fork(id)?,
            SYS_WAIT => self.sys_wait(id, &call)?,
            nr => SyscallOutcome::Fault(Fault::SyscallArgumentInvalid(nr)),
        };

        self.note_completed(&call, outcome, data)?;
        Ok(outcome)
    }

    /// Appends a completed syscall to the trace, or checks it against the
    /// trace when replaying.
    fn note_completed(
        &mut self,
        call: &Call,
        outcome: SyscallOutcome,
        data: Vec<u8>,
    ) -> HostResult<()> {
        let result = match outcome {
            SyscallOutcome::Return(value) | SyscallOutcome::Exit(value) => value,
            SyscallOutcome::Block(_) | SyscallOutcome::Fault(_) => return Ok(()),
        };
        match &mut self.replay {
            ReplayState::Off => Ok(()),
            ReplayState::Record(log) => {
                log.push(TraceEntry {
                    pc: call.pc,
                    syscall: call.nr,
                    result,
                    data,
                });
                Ok(())
            }
            ReplayState::Replay(replayer) => {
                let (index, entry) = replayer.next(call.pc, call.nr)?;
                if entry.result != result {
                    return Err(HostError::ReplayResultMismatch {
                        index,
                        syscall: call.nr,
                        expected: entry.result,
                        result,
                    });
                }
                Ok(())
            }
        }
    }

    /// Serves `read`, `write` and `openat` from the trace without touching
    /// the host.
    fn replay_host_io(&mut self, id: ContextId, call: &Call) -> HostResult<SyscallOutcome> {
        let entry = match &mut self.replay {
            ReplayState::Replay(replayer) => replayer.next(call.pc, call.nr)?.1,
            _ => {
                return Err(HostError::SchedulerInvariant {
                    context: id,
                    pc: call.pc,
                    reason: "replay requested while not replaying".to_string(),
                })
            }
        };

        match call.nr {
            SYS_READ if !entry.data.is_empty() => {
                let buf = call.args[1];
                let written = self.with_memory(id, call.pc, |m| m.write_bytes(buf, &entry.data))?;
                if let Err(fault) = written {
                    log::warn!("replayed read into {:#x} failed: {}", buf, fault);
                }
            }
            SYS_WRITE if entry.result > 0 => {
                let (fd, buf) = (call.args[0], call.args[1]);
                let len = entry.result as usize;
                if let Ok(bytes) = self.with_memory(id, call.pc, |m| m.read_bytes(buf, len))? {
                    if let ReplayState::Replay(replayer) = &mut self.replay {
                        replayer.capture(fd, &bytes);
                    }
                }
            }
            _ => {}
        }
        Ok(SyscallOutcome::Return(entry.result))
    }

    /// Runs `f` on the memory of `id`. Frame exhaustion is a host error;
    /// any other fault is handed back for the syscall to report as `-1`.
    fn with_memory<T>(
        &mut self,
        id: ContextId,
        pc: u64,
        f: impl FnOnce(&mut Pager<'_>) -> Result<T, Fault>,
    ) -> HostResult<Result<T, Fault>> {
        let mut pager = self
            .engine
            .memory(id)
            .ok_or(HostError::UnknownContext(id))?;
        match f(&mut pager) {
            Err(Fault::PageTableExhausted) => {
                Err(HostError::ResourceExhausted { context: id, pc })
            }
            other => Ok(other),
        }
    }

    fn sys_read(
        &mut self,
        id: ContextId,
        call: &Call,
        data: &mut Vec<u8>,
    ) -> HostResult<SyscallOutcome> {
        let [fd, buf, count, _] = call.args;
        if count == 0 {
            return Ok(SyscallOutcome::Return(0));
        }
        let writable = self.with_memory(id, call.pc, |m| {
            m.layout().check_range(buf, count, AccessType::Write)
        })?;
        if writable.is_err() {
            return Ok(SyscallOutcome::Return(-1));
        }

        let bytes = match self.host.read(fd, count as usize) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("read from fd {} failed: {}", fd, e);
                return Ok(SyscallOutcome::Return(-1));
            }
        };
        if self
            .with_memory(id, call.pc, |m| m.write_bytes(buf, &bytes))?
            .is_err()
        {
            return Ok(SyscallOutcome::Return(-1));
        }

        let n = bytes.len() as i64;
        *data = bytes;
        Ok(SyscallOutcome::Return(n))
    }

    fn sys_write(&mut self, id: ContextId, call: &Call) -> HostResult<SyscallOutcome> {
        let [fd, buf, count, _] = call.args;
        if count == 0 {
            return Ok(SyscallOutcome::Return(0));
        }
        let bytes = match self.with_memory(id, call.pc, |m| m.read_bytes(buf, count as usize))? {
            Ok(bytes) => bytes,
            Err(_) => return Ok(SyscallOutcome::Return(-1)),
        };

        Ok(SyscallOutcome::Return(match self.host.write(fd, &bytes) {
            Ok(n) => n as i64,
            Err(e) => {
                log::debug!("write to fd {} failed: {}", fd, e);
                -1
            }
        }))
    }

    fn sys_openat(&mut self, id: ContextId, call: &Call) -> HostResult<SyscallOutcome> {
        let [_dirfd, path_ptr, flags, mode] = call.args;
        let raw = self.with_memory(id, call.pc, |m| m.read_cstring(path_ptr, MAX_PATH_LENGTH))?;
        let path = match raw {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(path) => path,
                Err(_) => return Ok(SyscallOutcome::Return(-1)),
            },
            Err(_) => return Ok(SyscallOutcome::Return(-1)),
        };

        Ok(SyscallOutcome::Return(
            match self.host.open(&path, flags, mode) {
                Ok(fd) => fd as i64,
                Err(e) => {
                    log::debug!("open of {} failed: {}", path, e);
                    -1
                }
            },
        ))
    }

    fn sys_kill(&mut self, id: ContextId, call: &Call) -> HostResult<SyscallOutcome> {
        let target = call.args[0];
        if target > u32::MAX as u64 {
            return Ok(SyscallOutcome::Return(-1));
        }
        let killed = self.kill(id, ContextId(target as u32))?;
        Ok(SyscallOutcome::Return(if killed { 0 } else { -1 }))
    }

    fn sys_brk(&mut self, id: ContextId, call: &Call) -> HostResult<SyscallOutcome> {
        let requested = call.args[0];
        let mut pager = self
            .engine
            .memory(id)
            .ok_or(HostError::UnknownContext(id))?;
        let current = pager.layout().program_break;
        if requested == 0 {
            return Ok(SyscallOutcome::Return(current as i64));
        }
        let result = match pager.set_program_break(requested) {
            Ok(brk) => brk,
            Err(fault) => {
                log::debug!("brk to {:#x} refused: {}", requested, fault);
                current
            }
        };
        Ok(SyscallOutcome::Return(result as i64))
    }

    fn sys_fork(&mut self, id: ContextId) -> HostResult<SyscallOutcome> {
        let child = match self.engine.fork_context(id)? {
            Some(child) => child,
            None => {
                log::warn!("fork of context {} failed: frame pool exhausted", id);
                return Ok(SyscallOutcome::Return(-1));
            }
        };
        self.stats.forks += 1;
        self.owned.insert(child);
        {
            let ctx = self.context_of_mut(child)?;
            ctx.regs.write(abi::REG_A0, 0);
            ctx.pc = ctx.pc.wrapping_add(4);
        }
        self.make_ready(child)?;
        log::debug!("context {} forked {}", id, child);
        Ok(SyscallOutcome::Return(child.val() as i64))
    }

    fn sys_wait(&mut self, id: ContextId, call: &Call) -> HostResult<SyscallOutcome> {
        let [target, status_ptr, _, _] = call.args;
        let target = if target as i64 == -1 {
            None
        } else if target > u32::MAX as u64 {
            return Ok(SyscallOutcome::Return(-1));
        } else {
            Some(ContextId(target as u32))
        };

        let candidates: Vec<ContextId> = self
            .context_of(id)?
            .children
            .iter()
            .copied()
            .filter(|c| target.map_or(true, |t| t == *c))
            .collect();
        if candidates.is_empty() {
            return Ok(SyscallOutcome::Return(-1));
        }

        let exited = candidates.into_iter().find_map(|c| {
            self.engine
                .context(c)
                .and_then(|ctx| ctx.exit_status)
                .map(|status| (c, status))
        });
        let Some((child, status)) = exited else {
            return Ok(SyscallOutcome::Block(BlockReason::Wait(target)));
        };

        if status_ptr != 0 {
            let code = status.code() as u64;
            if self
                .with_memory(id, call.pc, |m| m.store_u64(status_ptr, code))?
                .is_err()
            {
                return Ok(SyscallOutcome::Return(-1));
            }
        }
        self.reap(child)?;
        Ok(SyscallOutcome::Return(child.val() as i64))
    }
}
