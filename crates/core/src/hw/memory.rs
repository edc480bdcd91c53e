use crate::state::{DoState, PointerWrap};

/// Retail MEM1 size.
pub const MEM1_SIZE_RETAIL: u32 = 0x0180_0000;
/// Retail MEM2 (Wii only) size.
pub const MEM2_SIZE_RETAIL: u32 = 0x0400_0000;
/// Locked L1 data cache scratchpad size.
pub const L1_CACHE_SIZE: u32 = 0x4000;

/// Main memory banks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub ram: Vec<u8>,
    pub l1_cache: Vec<u8>,
    /// MEM2; only present on Wii configurations.
    pub exram: Option<Vec<u8>>,
}

impl Memory {
    pub fn new(ram_size: u32, exram_size: Option<u32>) -> Self {
        Self {
            ram: vec![0; ram_size as usize],
            l1_cache: vec![0; L1_CACHE_SIZE as usize],
            exram: exram_size.map(|size| vec![0; size as usize]),
        }
    }

    fn exram_len(&self) -> usize {
        self.exram.as_ref().map_or(0, Vec::len)
    }

    /// Returns `false` when the saved bank sizes differ from this machine's.
    pub fn do_state(&mut self, p: &mut PointerWrap<'_>) -> bool {
        let mut ram_size = self.ram.len() as u32;
        let mut exram_size = self.exram_len() as u32;
        ram_size.do_state(p);
        exram_size.do_state(p);

        if p.is_read() && (ram_size as usize != self.ram.len() || exram_size as usize != self.exram_len())
        {
            tracing::error!(
                saved_ram = ram_size,
                saved_exram = exram_size,
                current_ram = self.ram.len(),
                current_exram = self.exram_len(),
                "save state memory size does not match the running configuration"
            );
            return false;
        }

        p.do_bytes(&mut self.ram);
        p.do_bytes(&mut self.l1_cache);
        if let Some(exram) = self.exram.as_mut() {
            p.do_bytes(exram);
        }
        true
    }
}
