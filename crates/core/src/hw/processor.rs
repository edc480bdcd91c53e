use crate::state::{DoState, PointerWrap};

/// Processor interface: interrupt routing and the CPU-side FIFO window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorInterface {
    pub interrupt_cause: u32,
    pub interrupt_mask: u32,
    pub fifo_cpu_base: u32,
    pub fifo_cpu_end: u32,
    pub fifo_cpu_write_pointer: u32,
    pub reset_code: u32,
}

impl ProcessorInterface {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.interrupt_cause.do_state(p);
        self.interrupt_mask.do_state(p);
        self.fifo_cpu_base.do_state(p);
        self.fifo_cpu_end.do_state(p);
        self.fifo_cpu_write_pointer.do_state(p);
        self.reset_code.do_state(p);
    }
}
