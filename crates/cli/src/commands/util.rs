use std::path::Path;

use anyhow::Result;
use symstate_core::config::{load_map_on_boot, SessionContext};
use symstate_core::guest::FlatMemory;
use symstate_core::symbols::SymbolDb;

use crate::canonicalize_or_current;

/// Resolve `root` and load its session layout and config.
pub fn open_session(root: &str) -> Result<SessionContext> {
    let root_path = canonicalize_or_current(root)?;
    SessionContext::from_root(&root_path)
}

/// Load the session's memory image and the title's map (if one exists).
pub fn load_session_symbols(ctx: &SessionContext) -> Result<(FlatMemory, SymbolDb)> {
    let memory = ctx.load_memory()?;
    let symbols = SymbolDb::new();
    load_map_on_boot(&symbols, &memory, &ctx.layout, &ctx.config);
    Ok((memory, symbols))
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}
