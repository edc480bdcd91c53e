//! symstate-core
//!
//! Core library for a PowerPC console emulator's save states and symbol
//! database:
//!
//! - `state`: the `PointerWrap` cursor, the `DoState` value shapes and the
//!   fixed-order, transactional snapshot coordinator.
//! - `hw`: hardware register blocks walked by a save state.
//! - `guest`: the guest-memory call points the symbol table relies on.
//! - `symbols`: the symbol table and the map file parser.
//! - `signatures`: SQLite-backed function signatures keyed by code checksum.
//! - `config`: per-title session layout and configuration.
//!
//! All substantive logic lives here so it is testable and reusable from the
//! CLI and any other frontend.

pub mod config;
pub mod guest;
pub mod hw;
pub mod signatures;
pub mod state;
pub mod symbols;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
