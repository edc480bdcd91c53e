use std::sync::Arc;
use std::thread;

use symstate_core::guest::{FlatMemory, Guest, BLR};
use symstate_core::symbols::{CallSite, SymbolDb, SymbolDbError, SymbolKind};
use tempfile::tempdir;

const BASE: u32 = 0x8000_0000;
const NOP: u32 = 0x6000_0000;

fn bl(from: u32, to: u32) -> u32 {
    0x4800_0001 | (to.wrapping_sub(from) & 0x03FF_FFFC)
}

#[test]
fn add_known_symbol_is_idempotent() {
    let memory = FlatMemory::from_words(BASE, &[0x3860_0001, BLR]);
    let db = SymbolDb::new();
    db.add_known_symbol(&memory, BASE, 8, "get_one", "util.o", SymbolKind::Function);
    let first = db.symbols();
    db.add_known_symbol(&memory, BASE, 8, "get_one", "util.o", SymbolKind::Function);

    assert_eq!(db.len(), 1);
    assert_eq!(db.symbols(), first);
    assert_eq!(db.symbols_with_checksum(first[0].checksum).len(), 1);
}

#[test]
fn add_known_symbol_updates_existing_entry_and_index() {
    let memory = FlatMemory::from_words(BASE, &[0x3860_0001, BLR, NOP]);
    let db = SymbolDb::new();
    db.add_known_symbol(&memory, BASE, 8, "first", "", SymbolKind::Function);
    let old = db.lookup_symbol(BASE).expect("present");

    db.add_known_symbol(&memory, BASE, 12, "second", "b.o", SymbolKind::Function);
    let new = db.lookup_symbol(BASE).expect("present");
    assert_eq!(new.name, "second");
    assert_eq!(new.object_name, "b.o");
    assert_eq!(new.size, 12);
    assert_eq!(new.checksum, memory.code_checksum(BASE, BASE + 8));
    assert_ne!(new.checksum, old.checksum);
    assert!(db.symbols_with_checksum(old.checksum).is_empty());
    assert_eq!(db.symbols_with_checksum(new.checksum).len(), 1);
}

#[test]
fn explicit_size_wins_over_analysis() {
    let memory = FlatMemory::from_words(BASE, &[0x3860_0001, BLR, NOP, NOP]);
    let db = SymbolDb::new();
    db.add_known_symbol(&memory, BASE, 0x10, "padded", "", SymbolKind::Function);
    assert_eq!(db.lookup_symbol(BASE).map(|s| s.size), Some(0x10));

    db.add_known_symbol(&memory, BASE + 8, 0, "table", "", SymbolKind::Data);
    assert_eq!(db.lookup_symbol(BASE + 8).map(|s| (s.size, s.kind)), Some((0, SymbolKind::Data)));
}

#[test]
fn add_function_twice_returns_none_second_time() {
    let memory = FlatMemory::from_words(BASE, &[NOP, BLR]);
    let db = SymbolDb::new();

    let symbol = db.add_function(&memory, BASE).expect("first add");
    assert_eq!(symbol.name, "zz_80000000_");
    assert_eq!(symbol.size, 8);
    assert_eq!(symbol.kind, SymbolKind::Function);

    assert!(db.add_function(&memory, BASE).is_none());
    assert_eq!(db.lookup_symbol(BASE).map(|s| s.size), Some(8));
    assert!(db.add_function(&memory, BASE + 0x100).is_none());
}

#[test]
fn call_graph_links_known_targets_and_drops_unknown() {
    let words = [
        bl(BASE, BASE + 0x10),
        bl(BASE + 4, BASE + 0x40),
        BLR,
        NOP,
        BLR, // BASE + 0x10
    ];
    let memory = FlatMemory::from_words(BASE, &words);
    let db = SymbolDb::new();
    let caller = db.add_function(&memory, BASE).expect("caller");
    db.add_function(&memory, BASE + 0x10).expect("callee");
    assert_eq!(caller.calls.len(), 2);

    db.rebuild_call_graph();
    let callee = db.lookup_symbol(BASE + 0x10).expect("callee");
    assert_eq!(callee.callers, vec![CallSite { function: BASE, call_address: BASE }]);
    assert!(db.lookup_symbol(BASE).expect("caller").callers.is_empty());

    let calls = db.calls_of(BASE).expect("known function");
    assert_eq!(calls, vec![(CallSite { function: BASE + 0x10, call_address: BASE }, "zz_80000010_".to_string())]);
    let callers = db.callers_of(BASE + 0x10).expect("known function");
    assert_eq!(callers[0].1, "zz_80000000_");
    assert!(db.calls_of(BASE + 4).is_none());

    // Rebuilding again does not duplicate edges.
    db.rebuild_call_graph();
    assert_eq!(db.lookup_symbol(BASE + 0x10).expect("callee").callers.len(), 1);
}

#[test]
fn symbol_map_round_trips_through_file() {
    let words = [0x3860_0001, BLR, 0x3860_0002, 0x3880_0000, BLR, 0, 0, 0];
    let memory = FlatMemory::from_words(BASE, &words);
    let db = SymbolDb::new();
    db.add_known_symbol(&memory, BASE, 8, "get_one", "util.o", SymbolKind::Function);
    db.add_known_symbol(&memory, BASE + 8, 12, "Foo::bar", "", SymbolKind::Function);
    db.add_known_symbol(&memory, BASE + 0x14, 8, "g_table", "data.o", SymbolKind::Data);
    db.add_known_note(BASE, 0x14, "code region");
    db.add_known_note(BASE + 8, 4, "inner");

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("GALE01.map");
    db.save_symbol_map(&path).expect("save map");

    let text = std::fs::read_to_string(&path).expect("read map");
    assert!(text.starts_with(".text section layout\n80000000 000008 80000000 0 get_one \tutil.o\n"));
    assert!(text.contains("\n.data section layout\n80000014 000008 80000014 0 g_table \tdata.o\n"));
    assert!(text.ends_with("\n.note section layout\n80000000 000014 80000000 0 code region\n80000008 000004 80000008 0 inner\n"));

    let loaded = SymbolDb::new();
    let report = loaded.load_map(&memory, &path, false).expect("load map");
    assert_eq!((report.good, report.bad), (5, 0));
    assert_eq!(loaded.symbols(), db.symbols());
    assert_eq!(loaded.notes(), db.notes());
    assert_eq!(loaded.map_name().as_deref(), Some(path.as_path()));
}

#[test]
fn missing_map_file_reports_io_and_keeps_table() {
    let memory = FlatMemory::from_words(BASE, &[BLR]);
    let db = SymbolDb::new();
    db.add_function(&memory, BASE).expect("added");

    let dir = tempdir().expect("tempdir");
    let err = db.load_map(&memory, &dir.path().join("absent.map"), false).unwrap_err();
    assert!(matches!(err, SymbolDbError::Io { .. }));
    assert_eq!(db.len(), 1);
    assert!(db.map_name().is_none());
}

#[test]
fn clear_reports_whether_anything_changed() {
    let memory = FlatMemory::from_words(BASE, &[BLR]);
    let db = SymbolDb::new();
    assert!(!db.clear());
    db.add_function(&memory, BASE).expect("added");
    assert!(db.clear());
    assert!(db.is_empty());
}

#[test]
fn concurrent_adds_and_lookups() {
    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 16;

    let memory = Arc::new(FlatMemory::from_words(BASE, &vec![BLR; (THREADS * PER_THREAD) as usize]));
    let db = Arc::new(SymbolDb::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let db = Arc::clone(&db);
            let memory = Arc::clone(&memory);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let addr = BASE + 4 * (t * PER_THREAD + i);
                    assert!(db.add_function(&*memory, addr).is_some());
                    assert_eq!(db.lookup_symbol(addr).map(|s| s.address), Some(addr));
                    db.log_function_call(addr);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker");
    }

    assert_eq!(db.len(), (THREADS * PER_THREAD) as usize);
    assert!(db.symbols().iter().all(|s| s.num_calls == 1 && s.size == 4));
    // Every function is a lone blr, so they all share one checksum.
    assert_eq!(db.symbols_with_checksum(memory.code_checksum(BASE, BASE)).len(), db.len());
}

#[test]
fn find_by_name_and_describe() {
    let memory = FlatMemory::from_words(BASE, &[NOP, BLR, BLR]);
    let db = SymbolDb::new();
    db.add_known_symbol(&memory, BASE, 8, "dup", "a.o", SymbolKind::Function);
    db.add_known_symbol(&memory, BASE + 8, 4, "dup", "b.o", SymbolKind::Function);

    assert_eq!(db.find_by_name("dup").map(|s| s.object_name), Some("a.o".to_string()));
    assert_eq!(db.find_all_by_name("dup").len(), 2);
    assert!(db.find_by_name("missing").is_none());
    assert_eq!(db.describe(BASE + 4), "dup");
    assert_eq!(db.describe(BASE + 0xC), " --- ");
}

#[test]
fn deleting_outer_note_flattens_inner_layer() {
    let db = SymbolDb::new();
    db.add_known_note(0, 10, "A");
    db.add_known_note(2, 3, "B");
    db.add_known_note(10, 10, "C");
    assert_eq!(db.lookup_note(3).map(|n| (n.name, n.layer)), Some(("B".to_string(), 1)));

    db.delete_note(0);
    assert_eq!(db.lookup_note(3).map(|n| (n.name, n.layer)), Some(("B".to_string(), 0)));
    assert!(db.lookup_note(1).is_none());
    assert_eq!(db.notes().len(), 2);
}
