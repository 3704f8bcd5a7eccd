//! Configuration.
//!
//! Every field has a default, so an empty TOML file is a valid
//! configuration:
//!
//! ```toml
//! [general]
//! trace_instructions = false
//! log_level = "info"
//!
//! [memory]
//! frames = 4096
//! mode = "demand"        # or "fully_mapped"
//! stack_size = 65536
//!
//! [scheduler]
//! quantum = 10000
//! virtualization_level = 1
//!
//! [replay]
//! mode = "off"           # "record" or "replay"
//! trace_file = "trace.json"
//! ```

use crate::common::constants::{DEFAULT_FRAMES, DEFAULT_QUANTUM, DEFAULT_STACK_SIZE};
use crate::common::{HostError, HostResult};
use crate::soc::memory::MemoryMode;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> HostResult<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> HostResult<()> {
        if self.scheduler.virtualization_level == 0 {
            return Err(HostError::InvalidLevel(0));
        }
        if self.scheduler.quantum == 0 {
            return Err(HostError::InvalidConfig(
                "scheduler.quantum must be at least 1".to_string(),
            ));
        }
        if self.replay.mode != ReplayMode::Off && self.replay.trace_file.is_none() {
            return Err(HostError::InvalidConfig(
                "replay.trace_file is required when replay.mode is set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub trace_instructions: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_instructions: false,
            log_level: default_log_level(),
        }
    }
}

impl GeneralConfig {
    /// The configured level filter, falling back to `Info` for unknown names.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Capacity of the physical frame pool.
    #[serde(default = "default_frames")]
    pub frames: usize,
    #[serde(default)]
    pub mode: MemoryMode,
    #[serde(default = "default_stack_size")]
    pub stack_size: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            mode: MemoryMode::default(),
            stack_size: default_stack_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Instructions per time slice.
    #[serde(default = "default_quantum")]
    pub quantum: u64,
    #[serde(default = "default_level")]
    pub virtualization_level: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum: default_quantum(),
            virtualization_level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    #[default]
    Off,
    Record,
    Replay,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub mode: ReplayMode,
    #[serde(default)]
    pub trace_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_frames() -> usize {
    DEFAULT_FRAMES
}

fn default_stack_size() -> u64 {
    DEFAULT_STACK_SIZE
}

fn default_quantum() -> u64 {
    DEFAULT_QUANTUM
}

fn default_level() -> u32 {
    1
}
