//! Physical Frame Pool.
//!
//! A fixed number of 4 KiB frames. Backing storage for a frame is
//! allocated the first time the frame is handed out and kept for reuse
//! after release, so a large pool costs nothing until it is touched.

use crate::common::constants::PAGE_SIZE;
use crate::common::Fault;

/// Index of a frame within its pool.
pub type FrameId = usize;

const FRAME_BYTES: usize = PAGE_SIZE as usize;

/// Occupancy of a frame pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolUsage {
    /// Frames currently checked out.
    pub in_use: usize,
    /// Maximum number of frames.
    pub capacity: usize,
    /// Highest `in_use` ever observed.
    pub peak: usize,
}

/// Bounded pool of zero-filled physical frames.
pub struct FramePool {
    frames: Vec<Box<[u8]>>,
    checked_out: Vec<bool>,
    free: Vec<FrameId>,
    capacity: usize,
    in_use: usize,
    peak: usize,
}

impl FramePool {
    /// Creates a pool of `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            checked_out: Vec::new(),
            free: Vec::new(),
            capacity,
            in_use: 0,
            peak: 0,
        }
    }

    /// Checks out a zero-filled frame.
    ///
    /// # Errors
    ///
    /// `Fault::PageTableExhausted` when every frame is in use.
    pub fn alloc(&mut self) -> Result<FrameId, Fault> {
        let frame = if let Some(frame) = self.free.pop() {
            self.frames[frame].fill(0);
            frame
        } else if self.frames.len() < self.capacity {
            self.frames.push(vec![0u8; FRAME_BYTES].into_boxed_slice());
            self.checked_out.push(false);
            self.frames.len() - 1
        } else {
            return Err(Fault::PageTableExhausted);
        };

        self.checked_out[frame] = true;
        self.in_use += 1;
        self.peak = self.peak.max(self.in_use);
        Ok(frame)
    }

    /// Returns a frame to the pool. Releasing a frame that is not checked
    /// out is ignored.
    pub fn release(&mut self, frame: FrameId) {
        if let Some(flag) = self.checked_out.get_mut(frame) {
            if *flag {
                *flag = false;
                self.in_use -= 1;
                self.free.push(frame);
            }
        }
    }

    /// Returns the contents of a checked-out frame.
    pub fn frame(&self, frame: FrameId) -> &[u8] {
        &self.frames[frame]
    }

    /// Copies `buf.len()` bytes starting at `offset` within `frame`.
    pub fn read(&self, frame: FrameId, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.frames[frame][offset..offset + buf.len()]);
    }

    /// Writes `data` starting at `offset` within `frame`.
    pub fn write(&mut self, frame: FrameId, offset: usize, data: &[u8]) {
        self.frames[frame][offset..offset + data.len()].copy_from_slice(data);
    }

    /// Copies the whole of `src` into `dst`.
    pub fn copy_frame(&mut self, src: FrameId, dst: FrameId) {
        if src == dst {
            return;
        }
        let (lo, hi) = (src.min(dst), src.max(dst));
        let (head, tail) = self.frames.split_at_mut(hi);
        if src < dst {
            tail[0].copy_from_slice(&head[lo]);
        } else {
            head[lo].copy_from_slice(&tail[0]);
        }
    }

    /// Number of frames that can still be checked out.
    pub fn available(&self) -> usize {
        self.capacity - self.in_use
    }

    /// Current occupancy.
    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            in_use: self.in_use,
            capacity: self.capacity,
            peak: self.peak,
        }
    }
}
