use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::guest::{Guest, BLR};
use crate::symbols::map_file::{self, MapEntry, MapLoadReport};
use crate::symbols::{default_function_name, CallSite, Note, Symbol, SymbolKind};

/// Width of the name column in code maps.
const CODE_MAP_NAME_WIDTH: usize = 30;

/// Error type for symbol database file operations.
#[derive(Debug, Error)]
pub enum SymbolDbError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type SymbolDbResult<T> = Result<T, SymbolDbError>;

/// The collections guarded by [`SymbolDb`]'s lock.
///
/// Map loads build one of these off to the side and swap it in whole.
#[derive(Debug, Default, Clone)]
struct SymbolTable {
    functions: BTreeMap<u32, Symbol>,
    notes: BTreeMap<u32, Note>,
    /// Checksum -> start addresses of the functions carrying it.
    checksum_index: BTreeMap<u32, BTreeSet<u32>>,
    map_name: Option<PathBuf>,
}

impl SymbolTable {
    fn index(&mut self, checksum: u32, addr: u32) {
        self.checksum_index.entry(checksum).or_default().insert(addr);
    }

    fn unindex(&mut self, checksum: u32, addr: u32) {
        if let Some(addrs) = self.checksum_index.get_mut(&checksum) {
            addrs.remove(&addr);
            if addrs.is_empty() {
                self.checksum_index.remove(&checksum);
            }
        }
    }

    fn add_function(&mut self, guest: &dyn Guest, addr: u32) -> Option<Symbol> {
        if self.functions.contains_key(&addr) {
            return None;
        }
        let analysis = guest.analyze_function(addr, 0)?;

        let symbol = Symbol {
            address: addr,
            size: analysis.size,
            name: default_function_name(addr),
            kind: SymbolKind::Function,
            checksum: analysis.checksum,
            calls: analysis.calls,
            ..Symbol::default()
        };
        self.index(symbol.checksum, addr);
        self.functions.insert(addr, symbol.clone());
        Some(symbol)
    }

    fn add_known_symbol(
        &mut self,
        guest: &dyn Guest,
        addr: u32,
        size: u32,
        name: &str,
        object_name: &str,
        kind: SymbolKind,
    ) {
        if let Some(existing) = self.functions.get_mut(&addr) {
            let old_checksum = existing.checksum;
            existing.name = name.to_string();
            existing.object_name = object_name.to_string();
            existing.checksum = guest.code_checksum(addr, addr.wrapping_add(size).wrapping_sub(4));
            existing.kind = kind;
            existing.size = size;

            let (checksum, is_function) = (existing.checksum, kind == SymbolKind::Function);
            self.unindex(old_checksum, addr);
            if is_function {
                self.index(checksum, addr);
            }
            return;
        }

        let mut symbol = Symbol {
            address: addr,
            size,
            name: name.to_string(),
            object_name: object_name.to_string(),
            kind,
            ..Symbol::default()
        };

        if kind == SymbolKind::Function {
            match guest.analyze_function(addr, size) {
                Some(analysis) => {
                    // A size given by the map wins over the analysed one.
                    if size != 0 && analysis.size != size {
                        tracing::warn!(
                            name,
                            expected = size,
                            computed = analysis.size,
                            "analysed symbol size mismatch"
                        );
                    } else {
                        symbol.size = analysis.size;
                    }
                    symbol.checksum = analysis.checksum;
                    symbol.calls = analysis.calls;
                }
                None => {
                    tracing::debug!(name, addr = format_args!("{addr:#010x}"), "function analysis failed");
                }
            }
            self.index(symbol.checksum, addr);
        }
        self.functions.insert(addr, symbol);
    }

    fn add_known_note(&mut self, addr: u32, size: u32, name: &str) {
        let note = self.notes.entry(addr).or_insert_with(|| Note { address: addr, ..Note::default() });
        note.name = name.to_string();
        note.size = size;
    }

    /// Layer 0 notes are outermost; each note nested inside another's range
    /// sits one layer deeper per enclosing note.
    fn recompute_note_layers(&mut self) {
        let ranges: Vec<(u32, u64)> = self.notes.values().map(|note| (note.address, note.end())).collect();
        let mut layers = vec![0u32; ranges.len()];

        for (i, &(_, end)) in ranges.iter().enumerate() {
            let boundary = ranges.partition_point(|&(start, _)| u64::from(start) < end);
            if boundary > i + 1 {
                for layer in &mut layers[i + 1..boundary] {
                    *layer += 1;
                }
            }
        }

        for (note, layer) in self.notes.values_mut().zip(layers) {
            note.layer = layer;
        }
    }

    fn lookup_symbol(&self, addr: u32) -> Option<&Symbol> {
        let (_, symbol) = self.functions.range(..=addr).next_back()?;
        (symbol.address == addr || symbol.contains(addr)).then_some(symbol)
    }

    fn lookup_note(&self, addr: u32) -> Option<&Note> {
        if let Some(note) = self.notes.get(&addr) {
            return Some(note);
        }
        for note in self.notes.range(..addr).map(|(_, note)| note).rev() {
            if u64::from(addr) < note.end() {
                return Some(note);
            }
            // Nothing below an outermost note can reach past it.
            if note.layer == 0 {
                break;
            }
        }
        None
    }

    fn delete_function(&mut self, addr: u32) {
        if let Some(symbol) = self.functions.remove(&addr) {
            self.unindex(symbol.checksum, addr);
        }
    }

    fn rebuild_call_graph(&mut self) {
        for symbol in self.functions.values_mut() {
            symbol.callers.clear();
        }

        let edges: Vec<(u32, CallSite)> = self
            .functions
            .iter()
            .flat_map(|(&caller, symbol)| {
                symbol.calls.iter().map(move |call| {
                    (call.function, CallSite { function: caller, call_address: call.call_address })
                })
            })
            .collect();

        for (target, edge) in edges {
            match self.functions.get_mut(&target) {
                Some(callee) => callee.callers.push(edge),
                None => tracing::trace!(
                    target = format_args!("{target:#010x}"),
                    from = format_args!("{:#010x}", edge.call_address),
                    "call into unknown function"
                ),
            }
        }
    }

    fn clear(&mut self) -> bool {
        let changed = !self.functions.is_empty() || !self.notes.is_empty();
        *self = SymbolTable::default();
        changed
    }

    fn write_symbol_map(&self, w: &mut dyn Write) -> io::Result<()> {
        fn line(w: &mut dyn Write, addr: u32, size: u32, name: &str, object_name: &str) -> io::Result<()> {
            write!(w, "{addr:08x} {size:06x} {addr:08x} 0 {name}")?;
            if !object_name.is_empty() {
                write!(w, " \t{object_name}")?;
            }
            writeln!(w)
        }

        writeln!(w, ".text section layout")?;
        for symbol in self.functions.values().filter(|s| s.kind == SymbolKind::Function) {
            line(w, symbol.address, symbol.size, &symbol.name, &symbol.object_name)?;
        }

        writeln!(w, "\n.data section layout")?;
        for symbol in self.functions.values().filter(|s| s.kind == SymbolKind::Data) {
            line(w, symbol.address, symbol.size, &symbol.name, &symbol.object_name)?;
        }

        writeln!(w, "\n.note section layout")?;
        for note in self.notes.values() {
            line(w, note.address, note.size, &note.name, "")?;
        }
        Ok(())
    }

    fn write_code_map(&self, guest: &dyn Guest, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, ".text")?;

        let mut next_address = 0u64;
        for symbol in self.functions.values() {
            // Nested inside the function just written out.
            if symbol.end() <= next_address {
                writeln!(w, "// {:08x} beginning of {}", symbol.address, symbol.name)?;
                continue;
            }

            writeln!(w, "\n{}:", symbol.name)?;
            next_address = symbol.end();

            let mut addr = u64::from(symbol.address);
            while addr < next_address {
                let word_addr = addr as u32;
                writeln!(
                    w,
                    "{word_addr:08x} {:<width$.width$} {}",
                    symbol.name,
                    guest.disassemble(word_addr),
                    width = CODE_MAP_NAME_WIDTH
                )?;
                addr += 4;
            }
        }
        Ok(())
    }
}

/// Whether a map entry can be trusted against the running image.
///
/// Strict loads only check that the claimed range is mapped. Lenient loads
/// are for maps from a slightly different build: a function is kept when a
/// `blr` sits right before it and at its last word, and data is never kept
/// because nothing in memory can confirm where it lives.
fn map_entry_is_good(guest: &dyn Guest, entry: &MapEntry, lenient: bool) -> bool {
    let start = entry.vaddress;
    if entry.is_function() {
        let last_word = start.wrapping_add(entry.size).wrapping_sub(4);
        if lenient {
            guest.read_instruction(start.wrapping_sub(4)) == Some(BLR)
                && guest.read_instruction(last_word) == Some(BLR)
        } else {
            guest.is_instruction_ram(start) && guest.is_instruction_ram(last_word)
        }
    } else {
        let last_byte = start.wrapping_add(entry.size).wrapping_sub(1);
        !lenient && guest.is_ram(start) && guest.is_ram(last_byte)
    }
}

/// Thread-safe symbol database for one running title.
///
/// Every operation takes the single table lock for its own duration and
/// hands back owned copies, so callers never hold references into the
/// table. Map loads parse and analyse without the lock and only take it to
/// swap the finished table in.
#[derive(Debug, Default)]
pub struct SymbolDb {
    table: Mutex<SymbolTable>,
}

impl SymbolDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SymbolTable> {
        // Each operation leaves the table consistent before it can panic.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Analyse and add the function at `addr`.
    ///
    /// Returns `None` if a symbol already starts there or analysis fails.
    pub fn add_function(&self, guest: &dyn Guest, addr: u32) -> Option<Symbol> {
        self.lock().add_function(guest, addr)
    }

    /// Insert or update a symbol whose name and extent are already known.
    pub fn add_known_symbol(
        &self,
        guest: &dyn Guest,
        addr: u32,
        size: u32,
        name: &str,
        object_name: &str,
        kind: SymbolKind,
    ) {
        self.lock().add_known_symbol(guest, addr, size, name, object_name, kind);
    }

    /// Insert or update a note. Layers are recomputed.
    pub fn add_known_note(&self, addr: u32, size: u32, name: &str) {
        let mut table = self.lock();
        table.add_known_note(addr, size, name);
        table.recompute_note_layers();
    }

    pub fn recompute_note_layers(&self) {
        self.lock().recompute_note_layers();
    }

    /// Symbol starting at `addr`, or the one whose range covers it.
    pub fn lookup_symbol(&self, addr: u32) -> Option<Symbol> {
        self.lock().lookup_symbol(addr).cloned()
    }

    /// Innermost note starting at `addr`, else the nearest enclosing one.
    pub fn lookup_note(&self, addr: u32) -> Option<Note> {
        self.lock().lookup_note(addr).cloned()
    }

    pub fn delete_function(&self, addr: u32) {
        self.lock().delete_function(addr);
    }

    pub fn delete_note(&self, addr: u32) {
        let mut table = self.lock();
        if table.notes.remove(&addr).is_some() {
            table.recompute_note_layers();
        }
    }

    /// Recompute every function's callers from the recorded call sites.
    pub fn rebuild_call_graph(&self) {
        self.lock().rebuild_call_graph();
    }

    /// Increment the call counter of the function starting at `addr`.
    pub fn log_function_call(&self, addr: u32) {
        if let Some(symbol) = self.lock().functions.get_mut(&addr) {
            symbol.num_calls += 1;
        }
    }

    /// Drop every symbol and note. Returns whether anything was removed.
    pub fn clear(&self) -> bool {
        self.lock().clear()
    }

    pub fn is_empty(&self) -> bool {
        let table = self.lock();
        table.functions.is_empty() && table.notes.is_empty()
    }

    /// Number of function and data symbols.
    pub fn len(&self) -> usize {
        self.lock().functions.len()
    }

    /// Path of the map file the table was last loaded from.
    pub fn map_name(&self) -> Option<PathBuf> {
        self.lock().map_name.clone()
    }

    /// Snapshot of all symbols in address order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.lock().functions.values().cloned().collect()
    }

    /// Snapshot of all notes in address order.
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes.values().cloned().collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Symbol> {
        self.lock().functions.values().find(|s| s.name == name).cloned()
    }

    pub fn find_all_by_name(&self, name: &str) -> Vec<Symbol> {
        self.lock().functions.values().filter(|s| s.name == name).cloned().collect()
    }

    /// Functions whose code checksum equals `checksum`.
    pub fn symbols_with_checksum(&self, checksum: u32) -> Vec<Symbol> {
        let table = self.lock();
        table
            .checksum_index
            .get(&checksum)
            .into_iter()
            .flatten()
            .filter_map(|addr| table.functions.get(addr))
            .cloned()
            .collect()
    }

    /// Rename the symbol starting at `addr`. Returns `false` if there is none.
    pub fn rename(&self, addr: u32, name: &str, object_name: Option<&str>) -> bool {
        let mut table = self.lock();
        let Some(symbol) = table.functions.get_mut(&addr) else {
            return false;
        };
        symbol.name = name.to_string();
        if let Some(object_name) = object_name {
            symbol.object_name = object_name.to_string();
        }
        true
    }

    /// Name of the symbol covering `addr`, or `" --- "`.
    pub fn describe(&self, addr: u32) -> String {
        self.lookup_symbol(addr).map(|s| s.name).unwrap_or_else(|| " --- ".to_string())
    }

    /// Resolved callees of the function at `addr` as `(call site, callee name)`.
    pub fn calls_of(&self, addr: u32) -> Option<Vec<(CallSite, String)>> {
        let table = self.lock();
        let symbol = table.functions.get(&addr)?;
        tracing::debug!("the function {} at {:08x} calls:", symbol.name, symbol.address);
        Some(resolve_edges(&table, &symbol.calls))
    }

    /// Resolved callers of the function at `addr` as `(caller edge, caller name)`.
    pub fn callers_of(&self, addr: u32) -> Option<Vec<(CallSite, String)>> {
        let table = self.lock();
        let symbol = table.functions.get(&addr)?;
        tracing::debug!("the function {} at {:08x} is called by:", symbol.name, symbol.address);
        Some(resolve_edges(&table, &symbol.callers))
    }

    /// Replace the whole table with the contents of a map file.
    ///
    /// Nothing is committed if the file cannot be read. Lines that fail
    /// validation are counted in the report and skipped.
    pub fn load_map(&self, guest: &dyn Guest, path: &Path, lenient: bool) -> SymbolDbResult<MapLoadReport> {
        let bytes = fs::read(path).map_err(|source| SymbolDbError::Io { path: path.to_path_buf(), source })?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.load_map_text(guest, &text, path, lenient))
    }

    /// [`SymbolDb::load_map`] over text that is already in memory.
    pub fn load_map_text(&self, guest: &dyn Guest, text: &str, name: &Path, lenient: bool) -> MapLoadReport {
        let (entries, columns) = map_file::parse_map(text);
        let mut scratch = SymbolTable::default();
        let mut report = MapLoadReport { columns, ..MapLoadReport::default() };

        for entry in &entries {
            if !map_entry_is_good(guest, entry, lenient) {
                report.bad += 1;
                continue;
            }
            report.good += 1;

            if entry.is_note() {
                scratch.add_known_note(entry.vaddress, entry.size, &entry.name);
            } else {
                let kind = if entry.is_function() { SymbolKind::Function } else { SymbolKind::Data };
                scratch.add_known_symbol(guest, entry.vaddress, entry.size, &entry.name, &entry.object_name, kind);
            }
        }

        scratch.recompute_note_layers();
        scratch.rebuild_call_graph();
        scratch.map_name = Some(name.to_path_buf());

        *self.lock() = scratch;
        tracing::info!(
            map = %name.display(),
            good = report.good,
            bad = report.bad,
            "{} symbols loaded, {} symbols ignored",
            report.good,
            report.bad
        );
        report
    }

    /// Write the table in map file form; the output loads back with [`SymbolDb::load_map`].
    pub fn write_symbol_map(&self, w: &mut dyn Write) -> io::Result<()> {
        let mut rendered = Vec::new();
        self.lock().write_symbol_map(&mut rendered)?;
        w.write_all(&rendered)
    }

    pub fn save_symbol_map(&self, path: &Path) -> SymbolDbResult<()> {
        let mut rendered = Vec::new();
        self.lock()
            .write_symbol_map(&mut rendered)
            .map_err(|source| SymbolDbError::Io { path: path.to_path_buf(), source })?;
        fs::write(path, rendered).map_err(|source| SymbolDbError::Io { path: path.to_path_buf(), source })
    }

    /// Write a disassembly listing of every function. Code maps are not
    /// meant to be loaded back.
    pub fn write_code_map(&self, guest: &dyn Guest, w: &mut dyn Write) -> io::Result<()> {
        let mut rendered = Vec::new();
        self.lock().write_code_map(guest, &mut rendered)?;
        w.write_all(&rendered)
    }

    pub fn save_code_map(&self, guest: &dyn Guest, path: &Path) -> SymbolDbResult<()> {
        let mut rendered = Vec::new();
        self.lock()
            .write_code_map(guest, &mut rendered)
            .map_err(|source| SymbolDbError::Io { path: path.to_path_buf(), source })?;
        fs::write(path, rendered).map_err(|source| SymbolDbError::Io { path: path.to_path_buf(), source })
    }
}

fn resolve_edges(table: &SymbolTable, edges: &[CallSite]) -> Vec<(CallSite, String)> {
    edges
        .iter()
        .filter_map(|edge| {
            let target = table.functions.get(&edge.function)?;
            tracing::debug!("* {:08x} : {}", edge.call_address, target.name);
            Some((*edge, target.name.clone()))
        })
        .collect()
}
