use crate::state::{DoState, PointerWrap};

pub const MAX_EXI_CHANNELS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExiChannel {
    pub status: u32,
    /// DMA (address, length).
    pub dma: (u32, u32),
    pub control: u32,
    pub immediate_data: u32,
    pub card_inserted: bool,
}

impl ExiChannel {
    fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        self.status.do_state(p);
        self.dma.do_state(p);
        self.control.do_state(p);
        self.immediate_data.do_state(p);
        self.card_inserted.do_state(p);
    }
}

/// Expansion interface: memory card and serial port slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionInterface {
    pub channels: [ExiChannel; MAX_EXI_CHANNELS],
}

impl ExpansionInterface {
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) {
        for channel in self.channels.iter_mut() {
            channel.do_state(p);
        }
    }
}
