use symstate_core::guest::{FlatMemory, BLR};
use symstate_core::signatures::{ApplyReport, SignatureDb};
use symstate_core::symbols::{SymbolDb, SymbolKind};

const NOP: u32 = 0x6000_0000;

/// `stwu r1,-16(r1); li r3,<imm>; addi r1,r1,16; blr`
fn leaf(imm: u16) -> [u32; 4] {
    [0x9421_FFF0, 0x3860_0000 | u32::from(imm), 0x3821_0010, BLR]
}

#[test]
fn signatures_rename_relocated_function() {
    // Build A: the named function sits at the start of the image.
    let mut words_a = leaf(1).to_vec();
    words_a.push(NOP);
    let build_a = FlatMemory::from_words(0x8000_0000, &words_a);
    let named = SymbolDb::new();
    named.add_known_symbol(&build_a, 0x8000_0000, 16, "OSGetTick", "os.a", SymbolKind::Function);

    let db = SignatureDb::open_in_memory().expect("open");
    assert_eq!(db.populate(&named, None).expect("populate"), 1);

    // Build B: same code with a different immediate, moved by 0x40.
    let mut words_b = vec![NOP; 16];
    words_b.extend_from_slice(&leaf(7));
    let build_b = FlatMemory::from_words(0x8000_0000, &words_b);
    let unnamed = SymbolDb::new();
    unnamed.add_function(&build_b, 0x8000_0040).expect("analysed");

    let report = db.apply(&unnamed).expect("apply");
    assert_eq!(report, ApplyReport { renamed: 1, size_mismatches: 0 });

    let symbol = unnamed.lookup_symbol(0x8000_0040).expect("present");
    assert_eq!(symbol.name, "OSGetTick");
    assert_eq!(symbol.object_name, "os.a");
}

#[test]
fn size_mismatch_is_counted_not_applied() {
    let build = FlatMemory::from_words(0x8000_0000, &leaf(1));
    let symbols = SymbolDb::new();
    symbols.add_function(&build, 0x8000_0000).expect("analysed");
    let checksum = symbols.lookup_symbol(0x8000_0000).expect("present").checksum;

    let db = SignatureDb::open_in_memory().expect("open");
    db.upsert(&symstate_core::signatures::SignatureRecord {
        checksum,
        size: 0x40,
        name: "TooBig".into(),
        object_name: String::new(),
        added_at: String::new(),
    })
    .expect("upsert");

    let report = db.apply(&symbols).expect("apply");
    assert_eq!(report, ApplyReport { renamed: 0, size_mismatches: 1 });
    assert_eq!(symbols.lookup_symbol(0x8000_0000).map(|s| s.name), Some("zz_80000000_".to_string()));
}
