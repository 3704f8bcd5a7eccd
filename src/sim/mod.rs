//! Simulation harness: hypervisor, syscall layer, loaders and tooling.

/// Single-stepping debugger.
pub mod debug;

/// Scheduler and syscall layer (levels 1 and up).
pub mod hypervisor;

/// Code image container format.
pub mod image;

/// Context creation from code images.
pub mod loader;

/// Syscall trace record and replay.
pub mod replay;

/// Running one program at several virtualization levels.
pub mod selfhost;

pub use debug::{Debugger, StopReason};
pub use hypervisor::{ContextSnapshot, Hypervisor};
pub use image::CodeImage;
pub use loader::LoadOptions;
pub use replay::{TraceEntry, TraceLog};
