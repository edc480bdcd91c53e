//! Symbol database for executables without native debug metadata.
//!
//! - `SymbolDb`: thread-safe table of functions, data and notes keyed by
//!   start address, with a checksum index and a call graph.
//! - `map_file`: parser for CodeWarrior-style and exported map files.

pub mod db;
pub mod map_file;

use serde::{Deserialize, Serialize};

pub use db::{SymbolDb, SymbolDbError, SymbolDbResult};
pub use map_file::{ColumnLayout, MapEntry, MapLoadReport};

/// Whether a symbol covers code or data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    #[default]
    Function,
    Data,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Data => "data",
        }
    }
}

/// One edge of the call graph.
///
/// In a symbol's `calls`, `function` is the callee; in its `callers`,
/// `function` is the calling function's start address. `call_address` is
/// always the address of the `bl` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    pub function: u32,
    pub call_address: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub address: u32,
    pub size: u32,
    pub name: String,
    /// Object file or library the symbol came from; empty when unknown.
    pub object_name: String,
    pub kind: SymbolKind,
    pub checksum: u32,
    pub num_calls: u32,
    pub calls: Vec<CallSite>,
    /// Derived by `SymbolDb::rebuild_call_graph`; never read from a map.
    pub callers: Vec<CallSite>,
}

impl Symbol {
    pub fn new(address: u32, name: impl Into<String>) -> Self {
        Self { address, name: name.into(), ..Self::default() }
    }

    /// First address past the symbol.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + u64::from(self.size)
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.address && u64::from(addr) < self.end()
    }
}

/// Free-form annotation over an address range. Notes may nest; `layer` is 0
/// for the outermost note at any address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub address: u32,
    pub size: u32,
    pub name: String,
    pub layer: u32,
}

impl Note {
    pub fn end(&self) -> u64 {
        u64::from(self.address) + u64::from(self.size)
    }
}

/// Name given to functions discovered by analysis rather than imported.
pub fn default_function_name(addr: u32) -> String {
    format!("zz_{addr:08x}_")
}
