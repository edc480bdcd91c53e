use crate::state::{DoState, PointerWrap};

pub const GATHER_PIPE_SIZE: usize = 32;
/// Extra room so a burst can overrun the pipe before it is flushed.
pub const GATHER_PIPE_EXTRA_SIZE: usize = GATHER_PIPE_SIZE * 16;

/// Write-gather pipe feeding the graphics FIFO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpFifo {
    pub gather_pipe: Vec<u8>,
    /// Next write position, as an index into `gather_pipe`.
    pub write_pos: usize,
    pub fifo_bursts: u32,
}

impl Default for GpFifo {
    fn default() -> Self {
        Self {
            gather_pipe: vec![0; GATHER_PIPE_SIZE + GATHER_PIPE_EXTRA_SIZE],
            write_pos: 0,
            fifo_bursts: 0,
        }
    }
}

impl GpFifo {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        p.do_bytes(&mut self.gather_pipe);
        p.do_pointer(&mut self.write_pos, 0);
        self.fifo_bursts.do_state(p);

        if p.is_read() && self.write_pos > self.gather_pipe.len() {
            tracing::warn!(write_pos = self.write_pos, "gather pipe position out of range; resetting");
            self.write_pos = 0;
        }
    }
}
