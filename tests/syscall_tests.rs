//! Syscall emulation tests against the in-memory host.

#[path = "support/mod.rs"]
mod support;

use riscu_hypervisor::core::arch::trap::ExitStatus;
use riscu_hypervisor::isa::abi::open_flags::*;
use riscu_hypervisor::isa::abi::syscall::*;
use riscu_hypervisor::isa::abi::*;
use riscu_hypervisor::isa::encode::*;
use riscu_hypervisor::sim::CodeImage;
use riscu_hypervisor::soc::host::BufferHost;
use support::*;

/// Data segment holding a NUL-terminated path followed by a buffer.
fn path_data(path: &str) -> Vec<u8> {
    let mut data = path.as_bytes().to_vec();
    data.resize(64, 0);
    data
}

/// `openat(AT_FDCWD, DATA, flags, 0o644)`.
fn open_data_path(flags: u64) -> Vec<u32> {
    program(&[
        vec![
            addi(REG_A0, REG_ZERO, -100),
            lui(REG_A1, 0x11),
            addi(REG_A2, REG_ZERO, flags as i64),
            addi(REG_A3, REG_ZERO, 0o644),
        ],
        sys(SYS_OPENAT),
    ])
}

/// Tests writing to stdout; `write` returns the byte count.
#[test]
fn test_write_stdout() {
    let (mut hv, id) = boot(&hello(b"hello\n"), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(0));
    assert_eq!(stdout_of(&hv), b"hello\n");
    assert_eq!(hv.stats.syscalls, 2);
}

/// Tests that `write` returns the byte count and stderr is separate.
#[test]
fn test_write_stderr_count() {
    let words = program(&[write_out(STDERR_FD, DATA, 4), exit_a0()]);
    let image = CodeImage::new(&words, b"oops".to_vec());
    let (mut hv, id) = boot(&image, b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(4));
    let host = hv.host().as_buffer().expect("buffer host");
    assert_eq!(host.stderr(), b"oops");
    assert!(host.stdout().is_empty());
}

/// Tests echoing stdin: short reads return what is available.
#[test]
fn test_read_echo() {
    let words = program(&[
        vec![
            addi(REG_A0, REG_ZERO, STDIN_FD as i64),
            lui(REG_A1, 0x11),
            addi(REG_A2, REG_ZERO, 8),
        ],
        sys(SYS_READ),
        vec![
            addi(REG_S1, REG_A0, 0),
            addi(REG_A2, REG_A0, 0),
            addi(REG_A0, REG_ZERO, STDOUT_FD as i64),
            lui(REG_A1, 0x11),
        ],
        sys(SYS_WRITE),
        vec![addi(REG_A0, REG_S1, 0)],
        exit_a0(),
    ]);
    let image = CodeImage::new(&words, vec![0; 8]);
    let (mut hv, id) = boot(&image, b"abc");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(3));
    assert_eq!(stdout_of(&hv), b"abc");
}

/// Tests end of file on stdin.
#[test]
fn test_read_eof() {
    let words = program(&[
        vec![
            addi(REG_A0, REG_ZERO, STDIN_FD as i64),
            lui(REG_A1, 0x11),
            addi(REG_A2, REG_ZERO, 8),
        ],
        sys(SYS_READ),
        exit_a0(),
    ]);
    let (mut hv, id) = boot(&CodeImage::new(&words, vec![0; 8]), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(0));
}

/// Tests that bad buffers fail with -1 instead of faulting.
#[test]
fn test_invalid_buffers() {
    let cases = [
        // Unmapped address.
        program(&[write_out(STDOUT_FD, 0, 4), exit_a0()]),
        // Runs off the end of the data segment.
        program(&[write_out(STDOUT_FD, DATA, 16), exit_a0()]),
        // Reading into the code segment.
        program(&[
            vec![
                addi(REG_A0, REG_ZERO, STDIN_FD as i64),
                lui(REG_A1, 0x10),
                addi(REG_A2, REG_ZERO, 4),
            ],
            sys(SYS_READ),
            exit_a0(),
        ]),
    ];
    for words in cases {
        let (mut hv, id) = boot(&CodeImage::new(&words, vec![0; 8]), b"input");
        assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
        assert!(stdout_of(&hv).is_empty());
    }
}

/// Tests writing to a descriptor that was never opened.
#[test]
fn test_bad_descriptor() {
    let words = program(&[write_out(9, DATA, 4), exit_a0()]);
    let (mut hv, id) = boot(&CodeImage::new(&words, b"data".to_vec()), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
}

/// Tests opening and reading a file.
#[test]
fn test_openat_read() {
    let words = program(&[
        open_data_path(O_RDONLY),
        // read(fd, DATA + 32, 32)
        vec![
            lui(REG_T0, 0x11),
            addi(REG_A1, REG_T0, 0x20),
            addi(REG_A2, REG_ZERO, 32),
        ],
        sys(SYS_READ),
        vec![addi(REG_A2, REG_A0, 0), addi(REG_A0, REG_ZERO, 1)],
        vec![lui(REG_T0, 0x11), addi(REG_A1, REG_T0, 0x20)],
        sys(SYS_WRITE),
        exit_with(0),
    ]);
    let mut host = BufferHost::new();
    host.add_file("notes.txt", "file contents");
    let image = CodeImage::new(&words, path_data("notes.txt"));
    let (mut hv, id) = boot_with(&config(), &image, host);

    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(0));
    assert_eq!(stdout_of(&hv), b"file contents");
}

/// Tests that opening a missing file fails with -1.
#[test]
fn test_openat_missing() {
    let words = program(&[open_data_path(O_RDONLY), exit_a0()]);
    let image = CodeImage::new(&words, path_data("missing.txt"));
    let (mut hv, id) = boot(&image, b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
}

/// Tests creating and writing a file.
#[test]
fn test_openat_create_write() {
    let words = program(&[
        open_data_path(O_CREAT | O_WRONLY),
        vec![
            lui(REG_T0, 0x11),
            addi(REG_A1, REG_T0, 0x20),
            addi(REG_A2, REG_ZERO, 5),
        ],
        sys(SYS_WRITE),
        exit_a0(),
    ]);
    let mut data = path_data("out.txt");
    data[0x20..0x25].copy_from_slice(b"saved");
    let image = CodeImage::new(&words, data);
    let (mut hv, id) = boot(&image, b"");

    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(5));
    let host = hv.host().as_buffer().expect("buffer host");
    assert_eq!(host.file("out.txt"), Some(&b"saved"[..]));
}

/// Tests a path that is not NUL-terminated inside its segment.
#[test]
fn test_openat_unterminated_path() {
    let words = program(&[open_data_path(O_RDONLY), exit_a0()]);
    let image = CodeImage::new(&words, b"no-nul!!".to_vec());
    let (mut hv, id) = boot(&image, b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-1));
}

/// Tests `brk`: query, growth, use of the new heap and refusal.
#[test]
fn test_brk() {
    let words = program(&[
        vec![addi(REG_A0, REG_ZERO, 0)],
        sys(SYS_BRK),
        vec![
            addi(REG_S1, REG_A0, 0),
            lui(REG_T0, 1),
            add(REG_A0, REG_S1, REG_T0),
        ],
        sys(SYS_BRK),
        vec![
            addi(REG_S2, REG_A0, 0),
            sd(REG_S1, REG_S2, -8),
            ld(REG_T1, REG_S2, -8),
        ],
        // Below the heap: refused, returns the current break.
        vec![addi(REG_A0, REG_ZERO, 8)],
        sys(SYS_BRK),
        vec![
            sub(REG_A0, REG_A0, REG_S1),
            sub(REG_T1, REG_T1, REG_S1),
            add(REG_A0, REG_A0, REG_T1),
        ],
        exit_a0(),
    ]);
    let (mut hv, id) = boot(&CodeImage::from_words(&words), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(4096));
}

/// Tests that `brk` growth the pool cannot back returns the old break.
#[test]
fn test_brk_exhaustion() {
    let words = program(&[
        vec![addi(REG_A0, REG_ZERO, 0)],
        sys(SYS_BRK),
        vec![addi(REG_S1, REG_A0, 0), lui(REG_T0, 0x100)],
        vec![add(REG_A0, REG_S1, REG_T0)],
        sys(SYS_BRK),
        vec![sub(REG_A0, REG_A0, REG_S1)],
        exit_a0(),
    ]);
    let mut cfg = config();
    cfg.memory.frames = 8;
    let (mut hv, id) = boot_with(&cfg, &CodeImage::from_words(&words), BufferHost::new());
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(0));
}

/// Tests that an unknown syscall number terminates the context.
#[test]
fn test_unknown_syscall() {
    let (mut hv, id) = boot(&CodeImage::from_words(&sys(1234)), b"");
    let status = hv.run(id).expect("run");
    assert_eq!(status.code(), 10);
    assert_eq!(hv.stats.faults, 1);
}

/// Tests that `exit` passes its code through untouched.
#[test]
fn test_exit_code() {
    let (mut hv, id) = boot(&CodeImage::from_words(&exit_with(-7)), b"");
    assert_eq!(hv.run(id).expect("run"), ExitStatus::Exited(-7));
    assert_eq!(hv.exit_status(id).expect("status"), Some(ExitStatus::Exited(-7)));
}
