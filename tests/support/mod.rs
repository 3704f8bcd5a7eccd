//! Shared helpers for assembling guest programs and booting hypervisors.

#![allow(dead_code)]

use riscu_hypervisor::common::constants::CODE_START;
use riscu_hypervisor::config::Config;
use riscu_hypervisor::core::ContextId;
use riscu_hypervisor::isa::abi::{self, syscall};
use riscu_hypervisor::isa::encode::*;
use riscu_hypervisor::sim::{CodeImage, Hypervisor};
use riscu_hypervisor::soc::host::BufferHost;

/// Start of initialized data for programs shorter than one page of code.
pub const DATA: u64 = CODE_START + 0x1000;

/// Address of the instruction at word index `index`.
pub fn pc_at(index: u64) -> u64 {
    CODE_START + 4 * index
}

/// Small, fast configuration used by most tests.
pub fn config() -> Config {
    let mut config = Config::default();
    config.memory.frames = 256;
    config.scheduler.quantum = 100;
    config
}

/// `a7 = nr; ecall`.
pub fn sys(nr: u64) -> Vec<u32> {
    vec![addi(abi::REG_A7, abi::REG_ZERO, nr as i64), ecall()]
}

/// `exit(code)`.
pub fn exit_with(code: i32) -> Vec<u32> {
    let mut words = load_immediate(abi::REG_A0, code);
    words.extend(sys(syscall::SYS_EXIT));
    words
}

/// `exit(a0)`: exits with whatever the previous syscall returned.
pub fn exit_a0() -> Vec<u32> {
    sys(syscall::SYS_EXIT)
}

/// `write(fd, addr, len)`.
pub fn write_out(fd: u64, addr: u64, len: i32) -> Vec<u32> {
    let mut words = vec![addi(abi::REG_A0, abi::REG_ZERO, fd as i64)];
    words.extend(load_immediate(abi::REG_A1, addr as i32));
    words.extend(load_immediate(abi::REG_A2, len));
    words.extend(sys(syscall::SYS_WRITE));
    words
}

/// Concatenates program fragments.
pub fn program(parts: &[Vec<u32>]) -> Vec<u32> {
    parts.concat()
}

/// Program that writes `text` to stdout and exits with 0.
pub fn hello(text: &[u8]) -> CodeImage {
    let words = program(&[write_out(abi::STDOUT_FD, DATA, text.len() as i32), exit_with(0)]);
    CodeImage::new(&words, text.to_vec())
}

/// Parent forks; the child exits with `code`; the parent waits for it and
/// exits with the child's exit code read back through the status pointer.
pub fn fork_wait(code: i64) -> CodeImage {
    use abi::*;
    let words = vec![
        addi(REG_A7, REG_ZERO, syscall::SYS_FORK as i64),
        ecall(),
        beq(REG_A0, REG_ZERO, 32),
        addi(REG_A0, REG_ZERO, -1),
        addi(REG_A1, REG_SP, -8),
        addi(REG_A7, REG_ZERO, syscall::SYS_WAIT as i64),
        ecall(),
        ld(REG_A0, REG_SP, -8),
        addi(REG_A7, REG_ZERO, syscall::SYS_EXIT as i64),
        ecall(),
        // child
        addi(REG_A0, REG_ZERO, code),
        addi(REG_A7, REG_ZERO, syscall::SYS_EXIT as i64),
        ecall(),
    ];
    CodeImage::from_words(&words)
}

/// Builds a level-1 hypervisor over a buffer host and loads `image`.
pub fn boot(image: &CodeImage, stdin: &[u8]) -> (Hypervisor, ContextId) {
    boot_with(&config(), image, BufferHost::with_stdin(stdin))
}

/// Builds the configured stack over `host` and loads `image`.
pub fn boot_with(config: &Config, image: &CodeImage, host: BufferHost) -> (Hypervisor, ContextId) {
    let mut hv = Hypervisor::new(config, Box::new(host)).expect("hypervisor");
    let id = hv.load(image, &["test".to_string()]).expect("load");
    (hv, id)
}

/// Everything the guest wrote to stdout.
pub fn stdout_of(hv: &Hypervisor) -> Vec<u8> {
    hv.host()
        .as_buffer()
        .map(|b| b.stdout().to_vec())
        .unwrap_or_default()
}
