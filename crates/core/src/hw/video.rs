use bytemuck::{Pod, Zeroable};

use crate::state::{DoState, PointerWrap};

/// Video interface register file, transferred as one raw block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VideoRegisters {
    pub vertical_timing: u16,
    pub display_control: u16,
    pub horizontal_timing_0: u32,
    pub horizontal_timing_1: u32,
    pub vblank_timing_odd: u32,
    pub vblank_timing_even: u32,
    pub burst_blanking_odd: u32,
    pub burst_blanking_even: u32,
    pub xfb_top_left: u32,
    pub xfb_bottom_left: u32,
    pub horizontal_beam_position: u16,
    pub vertical_beam_position: u16,
    pub interrupt_registers: [u32; 4],
    pub latch_registers: [u32; 2],
    pub horizontal_scaling: u16,
    pub fb_width: u16,
    pub filter_coefficients: [u32; 7],
    pub clock_select: u16,
    pub dtv_status: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoInterface {
    pub registers: VideoRegisters,
    pub ticks_last_line_start: u64,
    pub half_line_count: u32,
    pub half_line_of_next_si_poll: u32,
}

impl VideoInterface {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        p.do_pod(&mut self.registers);
        self.ticks_last_line_start.do_state(p);
        self.half_line_count.do_state(p);
        self.half_line_of_next_si_poll.do_state(p);
    }
}
