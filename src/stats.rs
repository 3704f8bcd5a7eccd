//! Simulation statistics collection and reporting.
//!
//! Each virtualization level keeps its own counters. The interpreter counts
//! instructions and page faults; hypervisor levels count scheduling and
//! syscall events for the contexts they own or host.

use std::time::Instant;

/// Counters of one virtualization level.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    pub instructions: u64,
    pub syscalls: u64,
    pub timer_interrupts: u64,
    pub context_switches: u64,
    pub page_faults: u64,
    pub forks: u64,
    pub exits: u64,
    pub faults: u64,
    pub contexts_created: u64,
    pub frames_peak: usize,
}

impl Default for SimStats {
    /// Returns the default value.
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            instructions: 0,
            syscalls: 0,
            timer_interrupts: 0,
            context_switches: 0,
            page_faults: 0,
            forks: 0,
            exits: 0,
            faults: 0,
            contexts_created: 0,
            frames_peak: 0,
        }
    }
}

impl SimStats {
    /// Prints a formatted summary of the counters of `level`.
    pub fn print(&self, level: u32) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let mips = if seconds > 0.0 {
            (self.instructions as f64 / seconds) / 1_000_000.0
        } else {
            0.0
        };

        println!("\n==========================================================");
        println!("RISC-U LEVEL {} STATISTICS", level);
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        if level == 0 {
            println!("sim_insts                {}", self.instructions);
            println!("sim_mips                 {:.2}", mips);
            println!("----------------------------------------------------------");
            println!("MEMORY");
            println!("  mem.page_faults        {}", self.page_faults);
            println!("  mem.frames_peak        {}", self.frames_peak);
            println!("  ctx.created            {}", self.contexts_created);
        } else {
            println!("----------------------------------------------------------");
            println!("SCHEDULER");
            println!("  sched.switches         {}", self.context_switches);
            println!("  sched.timer_irqs       {}", self.timer_interrupts);
            println!("  sys.calls              {}", self.syscalls);
            println!("  sys.forks              {}", self.forks);
            println!("  ctx.exits              {}", self.exits);
            println!("  ctx.faults             {}", self.faults);
        }
        println!("==========================================================");
    }
}
