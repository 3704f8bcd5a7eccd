//! Context Loader.
//!
//! Builds a fresh context from a code image: lays out its address space,
//! copies code and data into it and prepares the initial stack.
//!
//! Initial stack, growing down from the top of the address space:
//!
//! ```text
//! stack_top ->  argument strings (NUL-terminated)
//!               padding to a word boundary
//!               0                (argv terminator)
//!               argv[argc - 1]
//!               ...
//!               argv[0]          <- sp + 8
//! sp        ->  argc
//! ```

use crate::common::constants::{DEFAULT_STACK_SIZE, WORD_SIZE};
use crate::common::{Fault, HostError, HostResult};
use crate::core::context::{Context, ContextId};
use crate::isa::abi;
use crate::sim::image::CodeImage;
use crate::soc::memory::{AddressSpace, FramePool, MemoryLayout, MemoryMode, Pager};

/// Per-context options applied at load time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    pub mode: MemoryMode,
    pub stack_size: u64,
    /// Argument vector; `args[0]` is conventionally the program name.
    pub args: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mode: MemoryMode::Demand,
            stack_size: DEFAULT_STACK_SIZE,
            args: Vec::new(),
        }
    }
}

/// Creates context `id` running `image`.
///
/// # Errors
///
/// `InvalidImage` for a malformed image, `LoadFailed` if the program or its
/// arguments do not fit, `ResourceExhausted` if the pool cannot back it.
/// Frames taken before a failure are returned to the pool.
pub fn load_context(
    id: ContextId,
    image: &CodeImage,
    options: &LoadOptions,
    pool: &mut FramePool,
) -> HostResult<Context> {
    image.validate()?;
    let layout = MemoryLayout::new(
        image.code.len() as u64,
        image.data.len() as u64,
        options.stack_size,
    )?;
    let mut space = AddressSpace::new(layout, options.mode);

    let sp = {
        let mut pager = Pager::new(&mut space, pool);
        match populate(&mut pager, image, &options.args) {
            Ok(sp) => sp,
            Err(err) => {
                pager.release();
                return Err(match err {
                    Fault::PageTableExhausted => HostError::ResourceExhausted {
                        context: id,
                        pc: image.entry,
                    },
                    fault => HostError::LoadFailed(format!("{}", fault)),
                });
            }
        }
    };

    let mut ctx = Context::new(id, space, image.entry);
    ctx.regs.write(abi::REG_SP, sp);
    log::info!(
        "loaded context {}: {} code bytes, {} data bytes, entry {:#x}, {} args",
        id,
        image.code.len(),
        image.data.len(),
        image.entry,
        options.args.len()
    );
    Ok(ctx)
}

fn populate(pager: &mut Pager<'_>, image: &CodeImage, args: &[String]) -> Result<u64, Fault> {
    if pager.mode() == MemoryMode::FullyMapped {
        pager.map_all()?;
    }
    let layout = *pager.layout();
    pager.initialize(layout.code_start, &image.code)?;
    pager.initialize(layout.data_start, &image.data)?;
    build_stack(pager, args)
}

fn build_stack(pager: &mut Pager<'_>, args: &[String]) -> Result<u64, Fault> {
    let layout = *pager.layout();
    let mut top = layout.stack_top;
    let mut argv = Vec::with_capacity(args.len());

    for arg in args {
        let mut bytes = arg.as_bytes().to_vec();
        bytes.push(0);
        top = top
            .checked_sub(bytes.len() as u64)
            .filter(|t| *t >= layout.stack_limit)
            .ok_or(Fault::SegmentationFault(top))?;
        pager.write_bytes(top, &bytes)?;
        argv.push(top);
    }

    top &= !(WORD_SIZE - 1);
    let words = args.len() as u64 + 2;
    let sp = top
        .checked_sub(words * WORD_SIZE)
        .filter(|sp| *sp >= layout.stack_limit)
        .ok_or(Fault::SegmentationFault(top))?;

    pager.store_u64(sp, args.len() as u64)?;
    for (i, ptr) in argv.iter().enumerate() {
        pager.store_u64(sp + WORD_SIZE * (i as u64 + 1), *ptr)?;
    }
    pager.store_u64(sp + WORD_SIZE * (args.len() as u64 + 1), 0)?;
    Ok(sp)
}
