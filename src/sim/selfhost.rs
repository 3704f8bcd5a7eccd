//! Self-hosting comparison.
//!
//! Runs one program at several virtualization levels, each with a fresh
//! in-memory host fed the same stdin, and compares what the guest produced.
//! A correct stack of hypervisors is a fixed point: every level yields the
//! same exit status and byte-identical output.

use crate::common::{HostError, HostResult};
use crate::config::Config;
use crate::core::arch::trap::ExitStatus;
use crate::sim::hypervisor::Hypervisor;
use crate::sim::image::CodeImage;
use crate::soc::host::BufferHost;

/// Result of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelRun {
    pub level: u32,
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Results of all runs, in the order requested.
#[derive(Clone, Debug, Default)]
pub struct LevelReport {
    pub runs: Vec<LevelRun>,
}

impl LevelReport {
    /// True when every level agrees with the first one.
    pub fn is_fixed_point(&self) -> bool {
        self.mismatches().is_empty()
    }

    /// Levels whose status or output differs from the first run.
    pub fn mismatches(&self) -> Vec<u32> {
        let Some(first) = self.runs.first() else {
            return Vec::new();
        };
        self.runs
            .iter()
            .filter(|r| {
                r.status != first.status || r.stdout != first.stdout || r.stderr != first.stderr
            })
            .map(|r| r.level)
            .collect()
    }
}

/// Runs `image` with `args` at `level` against a fresh buffer host.
pub fn run_at_level(
    config: &Config,
    image: &CodeImage,
    args: &[String],
    stdin: &[u8],
    level: u32,
) -> HostResult<LevelRun> {
    let host = Box::new(BufferHost::with_stdin(stdin));
    let mut hv = Hypervisor::nested(config, host, level)?;
    let id = hv.load(image, args)?;
    let status = hv.run(id)?;

    let buffer = hv.host().as_buffer().ok_or_else(|| {
        HostError::LoadFailed("self-hosting run needs a buffer host".to_string())
    })?;
    log::info!("level {} run finished: {}", level, status);
    Ok(LevelRun {
        level,
        status,
        stdout: buffer.stdout().to_vec(),
        stderr: buffer.stderr().to_vec(),
    })
}

/// Runs `image` at every level in `levels` and collects the results.
pub fn compare_levels(
    config: &Config,
    image: &CodeImage,
    stdin: &[u8],
    levels: &[u32],
) -> HostResult<LevelReport> {
    let args = vec!["selfhost".to_string()];
    let runs = levels
        .iter()
        .map(|&level| run_at_level(config, image, &args, stdin, level))
        .collect::<HostResult<Vec<_>>>()?;
    Ok(LevelReport { runs })
}
