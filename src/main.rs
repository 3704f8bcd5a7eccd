//! RISC-U Hypervisor CLI.
//!
//! Loads a code image, builds the configured stack of hypervisor levels over
//! the interpreter, runs the program with the real host's stdio and files,
//! and exits with the guest's exit code.
//!
//! # Usage
//!
//! ```text
//! riscu --config configs/default.toml --file prog.risu [--level 2]
//!       [--record trace.json | --replay trace.json] [--stats] [-- args...]
//! ```

use clap::Parser;
use std::process;

use riscu_hypervisor::common::HostResult;
use riscu_hypervisor::config::{Config, ReplayMode};
use riscu_hypervisor::core::Machine;
use riscu_hypervisor::sim::{CodeImage, Hypervisor, TraceLog};
use riscu_hypervisor::soc::host::StdHost;

/// Command-line arguments for the RISC-U hypervisor.
#[derive(Parser, Debug)]
#[command(author, version, about = "RISC-U emulator and self-virtualizing hypervisor")]
struct Args {
    /// TOML configuration; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Code image to run.
    #[arg(short, long)]
    file: String,

    /// Virtualization level (overrides the configuration).
    #[arg(short, long)]
    level: Option<u32>,

    /// Record every syscall to this trace file.
    #[arg(long, conflicts_with = "replay")]
    record: Option<String>,

    /// Replay syscalls from this trace file.
    #[arg(long)]
    replay: Option<String>,

    /// Print per-level statistics on exit.
    #[arg(long)]
    stats: bool,

    /// Arguments passed to the guest after its own name.
    #[arg(last = true)]
    guest_args: Vec<String>,
}

/// Minimal `log` backend writing to stderr; filtering follows
/// `log::max_level()`.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(level: log::LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn run(args: Args) -> HostResult<i64> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(level) = args.level {
        config.scheduler.virtualization_level = level;
    }
    init_logger(config.general.log_level_filter());

    log::info!(
        "config: level {}, quantum {}, {} frames ({:?}), stack {} bytes",
        config.scheduler.virtualization_level,
        config.scheduler.quantum,
        config.memory.frames,
        config.memory.mode,
        config.memory.stack_size
    );

    let configured_trace = config.replay.trace_file.clone();
    let record = args.record.clone().or_else(|| {
        (config.replay.mode == ReplayMode::Record)
            .then(|| configured_trace.clone())
            .flatten()
    });
    let replay = args.replay.clone().or_else(|| {
        (config.replay.mode == ReplayMode::Replay)
            .then(|| configured_trace.clone())
            .flatten()
    });

    let image = CodeImage::load(&args.file)?;
    let mut hv = Hypervisor::new(&config, Box::new(StdHost::new()))?;

    if let Some(path) = &replay {
        hv.start_replay(TraceLog::load(path)?);
        log::info!("replaying syscalls from {}", path);
    } else if record.is_some() {
        hv.start_recording();
    }

    let mut guest_args = vec![args.file.clone()];
    guest_args.extend(args.guest_args.iter().cloned());

    let id = hv.load(&image, &guest_args)?;
    let status = hv.run(id)?;
    log::info!("context {} {}", id, status);

    if let Some(path) = &record {
        if let Some(trace) = hv.take_trace() {
            trace.save(path)?;
            log::info!("recorded {} syscalls to {}", trace.len(), path);
        }
    }

    if args.stats {
        for (level, stats) in hv.all_stats() {
            stats.print(level);
        }
    }

    Ok(status.code())
}

/// Main entry point.
///
/// Host-level errors end the process with status 1 after a diagnostic;
/// otherwise the process exits with the guest's exit code.
fn main() {
    let args = Args::parse();
    match run(args) {
        Ok(code) => process::exit(code as i32),
        Err(e) => {
            eprintln!("\n[!] FATAL: {}", e);
            process::exit(1);
        }
    }
}
