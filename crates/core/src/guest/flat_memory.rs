use std::fs;
use std::io;
use std::path::Path;

use crate::guest::Guest;

/// Default load address of a retail executable image.
pub const DEFAULT_BASE: u32 = 0x8000_0000;

/// A contiguous big-endian memory image mapped at `base`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatMemory {
    base: u32,
    data: Vec<u8>,
}

impl FlatMemory {
    pub fn new(base: u32, data: Vec<u8>) -> Self {
        Self { base, data }
    }

    pub fn from_file(path: &Path, base: u32) -> io::Result<Self> {
        Ok(Self::new(base, fs::read(path)?))
    }

    pub fn from_words(base: u32, words: &[u32]) -> Self {
        let data = words.iter().flat_map(|word| word.to_be_bytes()).collect();
        Self::new(base, data)
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw image, first byte at [`FlatMemory::base`].
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite one word. Returns `false` if `addr` is not a mapped, aligned word.
    pub fn write_word(&mut self, addr: u32, value: u32) -> bool {
        match self.word_offset(addr) {
            Some(offset) => {
                self.data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
                true
            }
            None => false,
        }
    }

    fn offset_of(&self, addr: u32) -> Option<usize> {
        let offset = addr.checked_sub(self.base)? as usize;
        (offset < self.data.len()).then_some(offset)
    }

    fn word_offset(&self, addr: u32) -> Option<usize> {
        if addr % 4 != 0 {
            return None;
        }
        let offset = self.offset_of(addr)?;
        (offset + 4 <= self.data.len()).then_some(offset)
    }
}

impl Guest for FlatMemory {
    fn read_instruction(&self, addr: u32) -> Option<u32> {
        let offset = self.word_offset(addr)?;
        let bytes: [u8; 4] = self.data[offset..offset + 4].try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    fn is_instruction_ram(&self, addr: u32) -> bool {
        self.word_offset(addr).is_some()
    }

    fn is_ram(&self, addr: u32) -> bool {
        self.offset_of(addr).is_some()
    }
}
