//! Call points into the running guest: instruction fetch, address checks and
//! the code analysis built on top of them.

pub mod analyzer;
pub mod checksum;
pub mod disasm;
pub mod flat_memory;

use crate::symbols::CallSite;

pub use analyzer::{analyze_function, MAX_FUNCTION_SIZE};
pub use checksum::code_checksum;
pub use flat_memory::FlatMemory;

/// `blr`, the PowerPC return instruction.
pub const BLR: u32 = 0x4E80_0020;

/// Result of scanning a function from its entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionAnalysis {
    pub size: u32,
    pub checksum: u32,
    /// Direct calls (`bl`) found inside the function body.
    pub calls: Vec<CallSite>,
}

/// View of guest memory used by the symbol table.
pub trait Guest {
    /// Fetch the instruction word at `addr`, or `None` if nothing is mapped there.
    fn read_instruction(&self, addr: u32) -> Option<u32>;

    /// Whether `addr` can be executed from.
    fn is_instruction_ram(&self, addr: u32) -> bool;

    /// Whether `addr` is backed by data memory.
    fn is_ram(&self, addr: u32) -> bool;

    /// Scan the function at `start`. A nonzero `max_size` bounds the scan.
    fn analyze_function(&self, start: u32, max_size: u32) -> Option<FunctionAnalysis> {
        analyzer::analyze_function(self, start, max_size)
    }

    /// Opcode checksum of the words in `[start, end]`.
    fn code_checksum(&self, start: u32, end: u32) -> u32 {
        checksum::code_checksum(self, start, end)
    }

    fn disassemble(&self, addr: u32) -> String {
        disasm::disassemble(addr, self.read_instruction(addr))
    }
}
