//! Map file parsing.
//!
//! Accepts CodeWarrior linker maps and the maps written by
//! `SymbolDb::save_symbol_map`. The column layout is guessed from the first
//! data line and then locked for the rest of the file:
//!
//! ```text
//! 80004000 zz_80004000_                          two columns
//! 00000000 000094 80003100  4 __start  os.a      three columns
//! 00000000 000094 80003100 00000400  4 __start   four columns
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

macro_rules! static_regex {
    ($name:ident, $str:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($str).unwrap());
    };
}

static_regex!(TWO_COLUMNS, r"^\s*([0-9A-Fa-f]{1,8})\s+([^\r\n]+)$");
static_regex!(
    THREE_COLUMNS,
    r"^\s*([0-9A-Fa-f]{1,8})\s+([0-9A-Fa-f]{1,8})\s+([0-9A-Fa-f]{1,8})\s+([^\r\n]+)$"
);
static_regex!(
    FOUR_COLUMNS,
    r"^\s*([0-9A-Fa-f]{1,8})\s+([0-9A-Fa-f]{1,8})\s+([0-9A-Fa-f]{1,8})\s+([0-9A-Fa-f]{1,8})\s+([^\r\n]+)$"
);
static_regex!(ENTRY_OF, r"^(?s)(.*?) \(entry of\s*(\S+)(.*)$");

const SECTION_LAYOUT_SUFFIX: &str = " section layout";

/// Number of leading hex columns before the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnLayout {
    /// `address name`
    Two,
    /// `address size vaddress [align] name`
    Three,
    /// `address size vaddress file-offset [align] name`
    Four,
}

impl ColumnLayout {
    pub fn count(self) -> u32 {
        match self {
            ColumnLayout::Two => 2,
            ColumnLayout::Three => 3,
            ColumnLayout::Four => 4,
        }
    }
}

/// One symbol line from a map file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEntry {
    /// First token of the section header the line appeared under (`.text`, `.data`, ...).
    pub section: String,
    pub address: u32,
    pub size: u32,
    pub vaddress: u32,
    pub alignment: u32,
    pub name: String,
    pub object_name: String,
}

impl MapEntry {
    /// Code sections hold functions; everything else, notes included, is data.
    pub fn is_function(&self) -> bool {
        self.section == ".text" || self.section == ".init"
    }

    pub fn is_note(&self) -> bool {
        self.section == ".note"
    }
}

/// Totals from one map load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapLoadReport {
    pub good: usize,
    pub bad: usize,
    pub columns: Option<ColumnLayout>,
}

/// Line-at-a-time parser carrying the current section and the locked layout.
#[derive(Debug, Default)]
pub struct MapParser {
    section: String,
    columns: Option<ColumnLayout>,
}

impl MapParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> Option<ColumnLayout> {
        self.columns
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Feed one raw line (including its line terminator, if any).
    pub fn feed(&mut self, line: &str) -> Option<MapEntry> {
        if line.len() < 4 {
            return None;
        }

        let first = line.split_whitespace().next().unwrap_or("");
        if first == "UNUSED" {
            return None;
        }
        if line.trim().ends_with(SECTION_LAYOUT_SUFFIX) || first == ".text" || first == ".init" {
            self.section = first.to_string();
            return None;
        }
        if matches!(first, "Starting" | "address" | "-----------------------") {
            return None;
        }
        // Link map tree lines: "  3] _stack_addr found as linker generated symbol"
        if first.ends_with(']') {
            return None;
        }
        if self.section.is_empty() {
            return None;
        }

        let columns = match self.columns {
            Some(columns) => columns,
            None => {
                let columns = detect_columns(line)?;
                tracing::debug!(columns = columns.count(), "map column layout detected");
                self.columns = Some(columns);
                columns
            }
        };

        let mut entry = parse_line(line, columns)?;
        entry.section = self.section.clone();
        Some(entry)
    }
}

/// Parse a whole map file.
pub fn parse_map(text: &str) -> (Vec<MapEntry>, Option<ColumnLayout>) {
    let mut parser = MapParser::new();
    let entries = text.split_inclusive('\n').filter_map(|line| parser.feed(line)).collect();
    (entries, parser.columns())
}

fn is_hex(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Guess the column layout from a data line, or `None` if it does not start
/// with an 8-digit hex word.
pub fn detect_columns(line: &str) -> Option<ColumnLayout> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some(word) if word.len() == 8 && is_hex(word) => {}
        _ => return None,
    }

    let size_and_vaddr = words.next().is_some_and(is_hex) && words.next().is_some_and(is_hex);
    if !size_and_vaddr {
        return Some(ColumnLayout::Two);
    }
    match words.next() {
        Some(word) if word.len() == 8 && is_hex(word) => Some(ColumnLayout::Four),
        _ => Some(ColumnLayout::Three),
    }
}

fn hex(text: &str) -> u32 {
    // At most eight digits, so this cannot overflow.
    u32::from_str_radix(text, 16).unwrap_or(0)
}

/// Parse one data line with a known layout. Lines that do not fit the layout
/// or carry no name yield `None`.
pub fn parse_line(line: &str, columns: ColumnLayout) -> Option<MapEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut entry = MapEntry::default();

    let raw_name = match columns {
        ColumnLayout::Two => {
            let caps = TWO_COLUMNS.captures(line)?;
            entry.address = hex(&caps[1]);
            entry.vaddress = entry.address;
            caps[2].to_string()
        }
        ColumnLayout::Three => {
            let caps = THREE_COLUMNS.captures(line)?;
            entry.address = hex(&caps[1]);
            entry.size = hex(&caps[2]);
            entry.vaddress = hex(&caps[3]);
            split_alignment(&caps[4], &mut entry.alignment)
        }
        ColumnLayout::Four => {
            let caps = FOUR_COLUMNS.captures(line)?;
            entry.address = hex(&caps[1]);
            entry.size = hex(&caps[2]);
            entry.vaddress = hex(&caps[3]);
            split_alignment(&caps[5], &mut entry.alignment)
        }
    };

    let raw_name = match columns {
        ColumnLayout::Two => raw_name,
        _ => resolve_entry_of(&raw_name),
    };
    if raw_name.trim().is_empty() {
        return None;
    }

    let mut parts = raw_name.split('\t');
    entry.name = parts.next().unwrap_or("").trim().to_string();
    entry.object_name = parts.next().unwrap_or("").trim().to_string();
    Some(entry)
}

/// Strip a leading alignment column from `name` when one is present.
fn split_alignment(name: &str, alignment: &mut u32) -> String {
    if !name.starts_with(|c: char| c == ' ' || c.is_ascii_digit()) {
        return name.to_string();
    }
    let stripped = name.trim();
    match parse_c_int(stripped) {
        Some((value, rest)) => {
            *alignment = value as u32;
            let rest = rest.trim_start();
            if rest.is_empty() {
                name.to_string()
            } else {
                rest.to_string()
            }
        }
        None => name.to_string(),
    }
}

/// Parse a leading integer the way C's `%i` does (decimal, `0x` hex or
/// leading-zero octal) and return it with the unparsed remainder.
pub fn parse_c_int(text: &str) -> Option<(i64, &str)> {
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (radix, digits_start) = if (body.starts_with("0x") || body.starts_with("0X"))
        && body[2..].starts_with(|c: char| c.is_ascii_hexdigit())
    {
        (16, 2)
    } else if body.starts_with('0') {
        (8, 0)
    } else {
        (10, 0)
    };

    let digits = &body[digits_start..];
    let len = digits.find(|c: char| !c.is_digit(radix)).unwrap_or(digits.len());
    if len == 0 {
        return None;
    }
    let value = i64::from_str_radix(&digits[..len], radix).ok()?;
    let value = if negative { -value } else { value };
    Some((value, &digits[len..]))
}

/// Rewrite `name (entry of Container) rest` as `Container::name rest`.
/// Entries of sections (`(entry of .text)`) are left alone.
fn resolve_entry_of(name: &str) -> String {
    let Some(caps) = ENTRY_OF.captures(name) else {
        return name.to_string();
    };
    let token = &caps[2];
    match token.find(')') {
        Some(close) if !token.starts_with('.') => {
            format!("{}::{}{}", &token[..close], &caps[1], &caps[3])
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_layout() {
        assert_eq!(detect_columns("80004000 zz_80004000_\n"), Some(ColumnLayout::Two));
        assert_eq!(
            detect_columns("  00000000 000094 80003100  4 __start \tos.a\n"),
            Some(ColumnLayout::Three)
        );
        assert_eq!(
            detect_columns("  00000000 000094 80003100 00000400  4 __start\n"),
            Some(ColumnLayout::Four)
        );
        assert_eq!(detect_columns("  8000 foo\n"), None);
    }

    #[test]
    fn three_column_line_strips_alignment_and_object() {
        let entry =
            parse_line("  00000000 000094 80003100  4 __start \tos.a __start.c\n", ColumnLayout::Three)
                .expect("entry");
        assert_eq!(entry.address, 0);
        assert_eq!(entry.size, 0x94);
        assert_eq!(entry.vaddress, 0x8000_3100);
        assert_eq!(entry.alignment, 4);
        assert_eq!(entry.name, "__start");
        assert_eq!(entry.object_name, "os.a __start.c");
    }

    #[test]
    fn exported_line_reads_back() {
        let entry =
            parse_line("80003100 000020 80003100 0 my_func \tmain.o\n", ColumnLayout::Three).expect("entry");
        assert_eq!(entry.vaddress, 0x8000_3100);
        assert_eq!(entry.size, 0x20);
        assert_eq!(entry.alignment, 0);
        assert_eq!(entry.name, "my_func");
        assert_eq!(entry.object_name, "main.o");
    }

    #[test]
    fn entry_of_prefixes_container() {
        let entry = parse_line(
            "  00000010 000008 80003110 memset_inner (entry of memset) \tlibc.a\n",
            ColumnLayout::Three,
        )
        .expect("entry");
        assert_eq!(entry.name, "memset::memset_inner");
        assert_eq!(entry.object_name, "libc.a");

        let section = parse_line("  00000010 000008 80003110 init (entry of .init)\n", ColumnLayout::Three)
            .expect("entry");
        assert_eq!(section.name, "init (entry of .init)");
    }

    #[test]
    fn c_int_prefixes() {
        assert_eq!(parse_c_int("32 foo"), Some((32, " foo")));
        assert_eq!(parse_c_int("0x10 foo"), Some((16, " foo")));
        assert_eq!(parse_c_int("010 foo"), Some((8, " foo")));
        assert_eq!(parse_c_int("foo"), None);
    }

    #[test]
    fn parser_skips_headers_and_link_map() {
        let text = "\
Link map of __start
  1] __start(func, weak) found in os.a __start.c
.text section layout
  Starting        Virtual
  address  Size   address
  -----------------------
  00000000 000094 80003100  4 __start \tos.a
UNUSED   000034 ........ unused_func
  00000094 000010 80003194  4 helper

.data section layout
  00000000 000008 80200000  8 table
";
        let (entries, columns) = parse_map(text);
        assert_eq!(columns, Some(ColumnLayout::Three));
        let names: Vec<_> = entries.iter().map(|e| (e.section.as_str(), e.name.as_str())).collect();
        assert_eq!(names, vec![(".text", "__start"), (".text", "helper"), (".data", "table")]);
        assert!(entries[0].is_function());
        assert!(!entries[2].is_function());
    }

    #[test]
    fn lines_before_any_section_are_ignored() {
        let (entries, columns) = parse_map("80004000 stray\n.text\n80004000 zz_80004000_\n");
        assert_eq!(columns, Some(ColumnLayout::Two));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].vaddress, 0x8000_4000);
        assert_eq!(entries[0].size, 0);
    }
}
