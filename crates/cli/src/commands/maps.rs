use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use symstate_core::config::find_map_file;
use symstate_core::guest::Guest;
use symstate_core::symbols::{CallSite, MapLoadReport, Note, Symbol, SymbolDb};

use crate::commands::{load_session_symbols, open_session};
use crate::parse_address;

#[derive(Serialize)]
pub struct MapImportSummary {
    pub source: String,
    pub saved_to: String,
    pub lenient: bool,
    #[serde(flatten)]
    pub report: MapLoadReport,
    pub symbols: usize,
    pub notes: usize,
}

#[derive(Serialize)]
pub struct CallEdge {
    pub function: u32,
    pub call_address: u32,
    pub name: String,
}

impl From<(CallSite, String)> for CallEdge {
    fn from((site, name): (CallSite, String)) -> Self {
        Self { function: site.function, call_address: site.call_address, name }
    }
}

#[derive(Serialize)]
pub struct LookupResult {
    pub address: u32,
    pub description: String,
    pub instruction: String,
    pub symbol: Option<Symbol>,
    pub note: Option<Note>,
    pub calls: Vec<CallEdge>,
    pub callers: Vec<CallEdge>,
}

/// Validate a map file against the session's memory image and store it as
/// the title's map (`Maps/<game id>.map`).
pub fn load_map_command(root: &str, path: &str, lenient: bool, json: bool) -> Result<()> {
    let ctx = open_session(root)?;
    let memory = ctx.load_memory()?;
    let lenient = lenient || ctx.config.lenient_maps;

    let source = ctx.layout.resolve(path);
    let symbols = SymbolDb::new();
    let report = symbols
        .load_map(&memory, &source, lenient)
        .with_context(|| format!("Failed to load map file {}", source.display()))?;

    let target = find_map_file(&ctx.layout, &ctx.config.game_id).writable;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    symbols.save_symbol_map(&target).context("Failed to save session map")?;

    let summary = MapImportSummary {
        source: source.display().to_string(),
        saved_to: target.display().to_string(),
        lenient,
        report,
        symbols: symbols.len(),
        notes: symbols.notes().len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Loaded map {}", summary.source);
        println!("  Good: {}", report.good);
        println!("  Bad: {}", report.bad);
        if let Some(columns) = report.columns {
            println!("  Columns: {}", columns.count());
        }
        println!("  Symbols: {}", summary.symbols);
        println!("  Notes: {}", summary.notes);
        println!("  Saved to: {}", summary.saved_to);
    }

    Ok(())
}

/// Describe whatever covers `address`: symbol, note, call edges and the instruction there.
pub fn lookup_command(root: &str, address: &str, json: bool) -> Result<()> {
    let addr = parse_address(address)?;
    let ctx = open_session(root)?;
    let (memory, symbols) = load_session_symbols(&ctx)?;

    let symbol = symbols.lookup_symbol(addr);
    let edges = |found: Option<Vec<(CallSite, String)>>| -> Vec<CallEdge> {
        found.unwrap_or_default().into_iter().map(CallEdge::from).collect()
    };
    let (calls, callers) = match &symbol {
        Some(symbol) => (edges(symbols.calls_of(symbol.address)), edges(symbols.callers_of(symbol.address))),
        None => (Vec::new(), Vec::new()),
    };

    let result = LookupResult {
        address: addr,
        description: symbols.describe(addr),
        instruction: memory.disassemble(addr),
        note: symbols.lookup_note(addr),
        symbol,
        calls,
        callers,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{:08x}: {}", result.address, result.instruction.trim_start());
    match &result.symbol {
        Some(symbol) => {
            println!("  Symbol: {} ({:08x}, size {:#x})", symbol.name, symbol.address, symbol.size);
            if !symbol.object_name.is_empty() {
                println!("  Object: {}", symbol.object_name);
            }
            println!("  Kind: {}", symbol.kind.as_str());
            println!("  Checksum: {:08x}", symbol.checksum);
        }
        None => println!("  Symbol: (none)"),
    }
    if let Some(note) = &result.note {
        println!("  Note: {} (layer {})", note.name, note.layer);
    }
    for edge in &result.calls {
        println!("  calls {} at {:08x}", edge.name, edge.call_address);
    }
    for edge in &result.callers {
        println!("  called by {} at {:08x}", edge.name, edge.call_address);
    }

    Ok(())
}

fn write_or_print(out: Option<&str>, render: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> Result<()> {
    match out {
        Some(path) => {
            let mut rendered = Vec::new();
            render(&mut rendered).context("Failed to render map")?;
            fs::write(Path::new(path), rendered).with_context(|| format!("Failed to write {path}"))?;
            println!("Wrote {path}");
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            render(&mut lock).context("Failed to write map to stdout")?;
        }
    }
    Ok(())
}

/// Write the session's symbol table in map file form.
pub fn export_map_command(root: &str, out: Option<&str>) -> Result<()> {
    let ctx = open_session(root)?;
    let (_memory, symbols) = load_session_symbols(&ctx)?;
    if symbols.is_empty() {
        return Err(anyhow!("No map loaded for {}", ctx.config.game_id));
    }
    write_or_print(out, |w| symbols.write_symbol_map(w))
}

/// Write a disassembly listing of every function in the session's map.
pub fn code_map_command(root: &str, out: Option<&str>) -> Result<()> {
    let ctx = open_session(root)?;
    let (memory, symbols) = load_session_symbols(&ctx)?;
    if symbols.is_empty() {
        return Err(anyhow!("No map loaded for {}", ctx.config.game_id));
    }
    write_or_print(out, |w| symbols.write_code_map(&memory, w))
}
