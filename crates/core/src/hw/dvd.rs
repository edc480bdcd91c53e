use std::collections::VecDeque;

use crate::state::{DoState, PointerWrap};

/// Disc interface registers and the queue of blocks still to be delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DvdInterface {
    pub status: u32,
    pub cover: u32,
    pub command: [u32; 3],
    pub dma_address: u32,
    pub dma_length: u32,
    pub control: u32,
    pub immediate_buffer: u32,
    pub config: u32,
    pub disc_inserted: bool,
    pub error_code: u32,
    /// Partition offset of the open Wii partition, if any.
    pub current_partition: Option<u64>,
    /// Disc offsets queued for the drive thread.
    pub pending_blocks: VecDeque<u64>,
}

impl DvdInterface {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.status.do_state(p);
        self.cover.do_state(p);
        self.command.do_state(p);
        self.dma_address.do_state(p);
        self.dma_length.do_state(p);
        self.control.do_state(p);
        self.immediate_buffer.do_state(p);
        self.config.do_state(p);
        self.disc_inserted.do_state(p);
        self.error_code.do_state(p);
        self.current_partition.do_state(p);
        self.pending_blocks.do_state(p);
    }
}
