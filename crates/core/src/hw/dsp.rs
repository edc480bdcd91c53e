use bytemuck::{Pod, Zeroable};

use crate::state::{DoState, PointerWrap};

/// Retail auxiliary RAM size.
pub const ARAM_SIZE_RETAIL: u32 = 0x0100_0000;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct AramDma {
    pub mm_addr: u32,
    pub aram_addr: u32,
    pub count: u32,
}

/// DSP interface registers plus auxiliary RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsp {
    pub control: u16,
    pub mailbox_to_dsp: [u16; 2],
    pub mailbox_from_dsp: [u16; 2],
    pub ar_info: u16,
    pub ar_mode: u16,
    pub ar_refresh: u16,
    pub aram_dma: AramDma,
    /// Transfers queued behind `aram_dma`.
    pub pending_dma: Vec<AramDma>,
    pub aram: Vec<u8>,
}

impl Dsp {
    pub fn new(aram_size: u32) -> Self {
        Self {
            control: 0,
            mailbox_to_dsp: [0; 2],
            mailbox_from_dsp: [0; 2],
            ar_info: 0,
            ar_mode: 0,
            ar_refresh: 0,
            aram_dma: AramDma::default(),
            pending_dma: Vec::new(),
            aram: vec![0; aram_size as usize],
        }
    }

    /// Returns `false` when the saved ARAM size differs from this machine's.
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) -> bool {
        self.control.do_state(p);
        self.mailbox_to_dsp.do_state(p);
        self.mailbox_from_dsp.do_state(p);
        self.ar_info.do_state(p);
        self.ar_mode.do_state(p);
        self.ar_refresh.do_state(p);
        p.do_pod(&mut self.aram_dma);
        p.do_pod_vec(&mut self.pending_dma);

        let mut aram_size = self.aram.len() as u32;
        aram_size.do_state(p);
        if p.is_read() && aram_size as usize != self.aram.len() {
            tracing::error!(saved = aram_size, current = self.aram.len(), "ARAM size mismatch");
            return false;
        }
        p.do_bytes(&mut self.aram);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_dma_round_trips_as_raw_blocks() {
        let mut source = Dsp::new(0x20);
        source.aram_dma = AramDma { mm_addr: 0x8000_1000, aram_addr: 0x40, count: 0x20 };
        source.pending_dma = vec![AramDma { mm_addr: 0x8000_2000, aram_addr: 0x80, count: 0x10 }];
        source.aram[3] = 0x99;

        let mut buf = Vec::new();
        assert!(source.do_state(&mut PointerWrap::writer(&mut buf)));

        let mut target = Dsp::new(0x20);
        assert!(target.do_state(&mut PointerWrap::reader(&buf)));
        assert_eq!(target, source);
    }

    #[test]
    fn aram_size_mismatch_is_rejected() {
        let mut buf = Vec::new();
        assert!(Dsp::new(0x20).do_state(&mut PointerWrap::writer(&mut buf)));
        assert!(!Dsp::new(0x40).do_state(&mut PointerWrap::reader(&buf)));
    }
}
