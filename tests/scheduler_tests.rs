//! Scheduling, process lifecycle and resource exhaustion tests.

#[path = "support/mod.rs"]
mod support;

use riscu_hypervisor::common::{Fault, HostError};
use riscu_hypervisor::core::arch::trap::{ExitStatus, Trap};
use riscu_hypervisor::core::context::{BlockReason, ContextState};
use riscu_hypervisor::core::Machine;
use riscu_hypervisor::isa::abi::syscall::*;
use riscu_hypervisor::isa::abi::*;
use riscu_hypervisor::isa::encode::*;
use riscu_hypervisor::sim::{CodeImage, Hypervisor};
use riscu_hypervisor::soc::host::BufferHost;
use support::*;

/// A program that never stops.
fn spin() -> CodeImage {
    CodeImage::from_words(&[jal(REG_ZERO, 0)])
}

/// Tests that a quantum expiry preempts a context and leaves it ready.
#[test]
fn test_timer_preemption() {
    let (mut hv, id) = boot(&spin(), b"");
    let trap = hv.slice(id, 50).expect("slice");
    assert_eq!(trap, Trap::TimerInterrupt);

    let snap = hv.snapshot(id).expect("snapshot");
    assert_eq!(snap.state, ContextState::Ready);
    assert_eq!(snap.instructions, 50);
    assert_eq!(snap.pc, pc_at(0));
}

/// Tests round-robin order and equal shares for compute-bound contexts.
#[test]
fn test_round_robin_fairness() {
    let image = spin();
    let (mut hv, a) = boot(&image, b"");
    let b = hv.load(&image, &["b".to_string()]).expect("load b");

    let order: Vec<_> = (0..4)
        .map(|_| hv.schedule_once().expect("schedule").expect("ready"))
        .collect();
    assert_eq!(order, vec![a, b, a, b]);

    let quantum = hv.quantum();
    assert_eq!(hv.snapshot(a).expect("a").instructions, 2 * quantum);
    assert_eq!(hv.snapshot(b).expect("b").instructions, 2 * quantum);
    assert_eq!(hv.stats.timer_interrupts, 4);
}

/// Tests that context ids are distinct and the ready queue holds both.
#[test]
fn test_load_queues_contexts() {
    let image = spin();
    let (mut hv, a) = boot(&image, b"");
    let b = hv.load(&image, &[]).expect("load b");
    assert_ne!(a, b);
    assert_eq!(hv.ready_queue(), vec![a, b]);
    assert_eq!(hv.owned_contexts(), vec![a, b]);
}

/// Tests `sched_yield`: returns 0 and gives up the rest of the slice.
#[test]
fn test_sched_yield() {
    let words = program(&[sys(SYS_SCHED_YIELD), exit_a0()]);
    let (mut hv, id) = boot(&CodeImage::from_words(&words), b"");

    let trap = hv.slice(id, 100).expect("slice");
    assert_eq!(trap, Trap::EnvironmentCall);
    assert_eq!(hv.snapshot(id).expect("snapshot").pc, pc_at(2));
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(0));
}

/// Tests fork, wait and reaping: the parent reports the child's exit code.
#[test]
fn test_fork_wait() {
    let (mut hv, parent) = boot(&fork_wait(42), b"");
    assert_eq!(hv.run(parent).expect("run"), ExitStatus::Exited(42));

    // The child was reaped by wait; the parent stays until reaped.
    assert_eq!(hv.owned_contexts(), vec![parent]);
    assert_eq!(hv.stats.forks, 1);
    assert_eq!(hv.engine().frames().in_use, 0);

    assert_eq!(hv.reap(parent).expect("reap"), Some(ExitStatus::Exited(42)));
    assert!(hv.owned_contexts().is_empty());
}

/// Tests that the forked child resumes after the `ecall` with `a0 == 0`
/// and a private copy of memory.
#[test]
fn test_fork_child_state() {
    let words = vec![
        lui(REG_T0, 0x11),
        addi(REG_T1, REG_ZERO, 7),
        sd(REG_T1, REG_T0, 0),
        addi(REG_A7, REG_ZERO, SYS_FORK as i64),
        ecall(),
        jal(REG_ZERO, 0),
    ];
    let image = CodeImage::new(&words, vec![0; 8]);
    let (mut hv, parent) = boot(&image, b"");
    hv.slice(parent, 100).expect("slice");

    let child = hv
        .owned_contexts()
        .into_iter()
        .find(|c| *c != parent)
        .expect("child");
    let p = hv.snapshot(parent).expect("parent");
    let c = hv.snapshot(child).expect("child");
    assert_eq!(p.regs[REG_A0], child.val());
    assert_eq!(c.regs[REG_A0], 0);
    assert_eq!(p.pc, pc_at(5));
    assert_eq!(c.pc, pc_at(5));
    assert_eq!(c.regs[REG_SP], p.regs[REG_SP]);
    assert_eq!(c.frames_mapped, p.frames_mapped);

    hv.guest_memory(child)
        .expect("child memory")
        .store_u64(DATA, 99)
        .expect("store");
    assert_eq!(
        hv.guest_memory(parent).expect("memory").load_u64(DATA),
        Ok(7)
    );
}

/// Tests `wait` without children.
#[test]
fn test_wait_without_children() {
    let words = program(&[
        vec![addi(REG_A0, REG_ZERO, -1), addi(REG_A1, REG_ZERO, 0)],
        sys(SYS_WAIT),
        exit_a0(),
    ]);
    let (mut hv, id) = boot(&CodeImage::from_words(&words), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
}

/// Tests that a parent blocked in `wait` stays on its `ecall`.
#[test]
fn test_wait_blocks_parent() {
    let words = vec![
        addi(REG_A7, REG_ZERO, SYS_FORK as i64),
        ecall(),
        beq(REG_A0, REG_ZERO, 16),
        addi(REG_A0, REG_ZERO, -1),
        addi(REG_A7, REG_ZERO, SYS_WAIT as i64),
        ecall(),
        // child
        jal(REG_ZERO, 0),
    ];
    let (mut hv, parent) = boot(&CodeImage::from_words(&words), b"");
    // Fork, then the child spins for a slice, then the parent waits.
    for _ in 0..3 {
        hv.schedule_once().expect("schedule");
    }
    let snap = hv.snapshot(parent).expect("parent");
    assert_eq!(snap.state, ContextState::Blocked(BlockReason::Wait(None)));
    assert_eq!(snap.pc, pc_at(5));
    assert!(!hv.ready_queue().contains(&parent));
}

/// Tests `kill`: the child ends as killed and the parent sees 137.
#[test]
fn test_kill_child() {
    let words = vec![
        addi(REG_A7, REG_ZERO, SYS_FORK as i64),
        ecall(),
        beq(REG_A0, REG_ZERO, 44),
        addi(REG_S1, REG_A0, 0),
        addi(REG_A7, REG_ZERO, SYS_KILL as i64),
        ecall(),
        addi(REG_A0, REG_S1, 0),
        addi(REG_A1, REG_SP, -8),
        addi(REG_A7, REG_ZERO, SYS_WAIT as i64),
        ecall(),
        ld(REG_A0, REG_SP, -8),
        addi(REG_A7, REG_ZERO, SYS_EXIT as i64),
        ecall(),
        // child
        jal(REG_ZERO, 0),
    ];
    let (mut hv, parent) = boot(&CodeImage::from_words(&words), b"");
    assert_eq!(hv.run(parent).expect("run"), ExitStatus::Exited(137));
    assert_eq!(hv.owned_contexts(), vec![parent]);
}

/// Tests that only live children can be killed.
#[test]
fn test_kill_rejects_non_children() {
    let words = program(&[
        vec![addi(REG_A0, REG_ZERO, 999)],
        sys(SYS_KILL),
        exit_a0(),
    ]);
    let (mut hv, id) = boot(&CodeImage::from_words(&words), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
    assert!(!hv.kill(id, id).expect("kill"));
}

/// Tests that a child outliving its parent is discarded when it exits.
#[test]
fn test_orphan_discarded_on_exit() {
    let words = vec![
        addi(REG_A7, REG_ZERO, SYS_FORK as i64),
        ecall(),
        beq(REG_A0, REG_ZERO, 16),
        addi(REG_A0, REG_ZERO, 1),
        addi(REG_A7, REG_ZERO, SYS_EXIT as i64),
        ecall(),
        // child: count down from 50, then exit(2)
        addi(REG_T0, REG_ZERO, 50),
        addi(REG_T0, REG_T0, -1),
        beq(REG_T0, REG_ZERO, 8),
        jal(REG_ZERO, -8),
        addi(REG_A0, REG_ZERO, 2),
        addi(REG_A7, REG_ZERO, SYS_EXIT as i64),
        ecall(),
    ];
    let (mut hv, parent) = boot(&CodeImage::from_words(&words), b"");
    let done = hv.run_all().expect("run");

    assert_eq!(done, vec![(parent, ExitStatus::Exited(1))]);
    assert_eq!(hv.owned_contexts(), vec![parent]);
    assert_eq!(hv.stats.exits, 2);
    assert_eq!(hv.engine().frames().in_use, 0);
}

/// Tests that faults terminate only the faulting context with its code.
#[test]
fn test_fault_exit_codes() {
    let cases: Vec<(Vec<u32>, Fault, i64)> = vec![
        (
            vec![addi(REG_A1, REG_ZERO, 7), divu(REG_A0, REG_A1, REG_ZERO)],
            Fault::DivisionByZero,
            8,
        ),
        (vec![0xffff_ffff], Fault::IllegalInstruction(0xffff_ffff), 9),
        (
            vec![ld(REG_A0, REG_ZERO, 0)],
            Fault::SegmentationFault(0),
            6,
        ),
        (
            vec![addi(REG_T0, REG_SP, 4), ld(REG_A0, REG_T0, 0)],
            Fault::MisalignedAccess(0),
            11,
        ),
        (sys(999), Fault::SyscallArgumentInvalid(999), 10),
    ];

    for (words, fault, code) in cases {
        let (mut hv, id) = boot(&CodeImage::from_words(&words), b"");
        let status = hv.run(id).expect("run");
        assert_eq!(status.code(), code, "{:?}", words);
        match status {
            ExitStatus::Faulted { fault: f, .. } => {
                assert_eq!(std::mem::discriminant(&f), std::mem::discriminant(&fault));
            }
            other => panic!("expected a fault, got {}", other),
        }
        assert_eq!(hv.engine().frames().in_use, 0);
    }
}

/// Tests that an illegal jump target faults at the target.
#[test]
fn test_fetch_outside_code() {
    let image = CodeImage::from_words(&[lui(REG_T0, 0x11), jalr(REG_ZERO, REG_T0, 0)]);
    let (mut hv, id) = boot(&image, b"");
    assert_eq!(
        hv.run(id).expect("run"),
        ExitStatus::Faulted {
            fault: Fault::SegmentationFault(0x11000),
            pc: 0x11000
        }
    );
}

/// Tests the argument vector on the initial stack.
#[test]
fn test_initial_stack() {
    let words = program(&[
        vec![
            ld(REG_T0, REG_SP, 16),
            addi(REG_A0, REG_ZERO, 1),
            addi(REG_A1, REG_T0, 0),
            addi(REG_A2, REG_ZERO, 3),
        ],
        sys(SYS_WRITE),
        vec![ld(REG_A0, REG_SP, 0)],
        exit_a0(),
    ]);
    let image = CodeImage::from_words(&words);
    let mut hv = Hypervisor::new(&config(), Box::new(BufferHost::new())).expect("hv");
    let args: Vec<String> = ["prog", "abc", "de"].iter().map(|s| s.to_string()).collect();
    let id = hv.load(&image, &args).expect("load");

    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(3));
    assert_eq!(stdout_of(&hv), b"abc");
}

/// Tests that running out of frames while paging is a host error naming
/// the context.
#[test]
fn test_frame_exhaustion_is_host_error() {
    let words = vec![
        lui(REG_T0, 1),
        sub(REG_T1, REG_SP, REG_T0),
        sd(REG_ZERO, REG_T1, 0),
        sub(REG_T1, REG_T1, REG_T0),
        sd(REG_ZERO, REG_T1, 0),
        jal(REG_ZERO, 0),
    ];
    let mut config = config();
    config.memory.frames = 3;
    let (mut hv, id) = boot_with(&config, &CodeImage::from_words(&words), BufferHost::new());

    match hv.run(id) {
        Err(HostError::ResourceExhausted { context, pc }) => {
            assert_eq!(context, id);
            assert_eq!(pc, pc_at(4));
        }
        other => panic!("expected resource exhaustion, got {:?}", other),
    }
}

/// Tests that a fork the pool cannot hold fails with -1.
#[test]
fn test_fork_exhaustion() {
    let words = program(&[sys(SYS_FORK), exit_a0()]);
    let mut config = config();
    config.memory.frames = 3;
    let (mut hv, id) = boot_with(&config, &CodeImage::from_words(&words), BufferHost::new());
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
    assert_eq!(hv.owned_contexts(), vec![id]);
}

/// Tests that unknown ids are rejected.
#[test]
fn test_unknown_context() {
    let (mut hv, id) = boot(&spin(), b"");
    let other = riscu_hypervisor::core::ContextId(id.0 + 100);
    assert!(matches!(
        hv.snapshot(other),
        Err(HostError::UnknownContext(c)) if c == other
    ));
    assert!(hv.slice(other, 1).is_err());
}

/// Tests that hosted contexts are only reachable through the level that
/// created them.
#[test]
fn test_machine_forwarding() {
    let mut cfg = config();
    cfg.scheduler.virtualization_level = 2;
    let (mut hv, id) = boot_with(&cfg, &spin(), BufferHost::new());
    assert_eq!(hv.level(), 2);
    assert_eq!(hv.engine().level(), 1);
    assert!(hv.engine().context(id).is_some());

    hv.slice(id, 10).expect("slice");
    let stats = hv.all_stats();
    let levels: Vec<u32> = stats.iter().map(|(l, _)| *l).collect();
    assert_eq!(levels, vec![2, 1, 0]);
    assert_eq!(stats[2].1.instructions, 10);
    assert_eq!(stats[1].1.timer_interrupts, 1);
}
