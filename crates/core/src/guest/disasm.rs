use crate::guest::analyzer::branch_target;
use crate::guest::BLR;

/// One-line rendering of the word at `addr`, enough for code maps.
///
/// Only a handful of common forms are named; anything else prints as a raw
/// `.long`.
pub fn disassemble(addr: u32, word: Option<u32>) -> String {
    let Some(word) = word else {
        return "(unmapped)".to_string();
    };

    match word {
        BLR => return "blr".to_string(),
        0x4E80_0021 => return "blrl".to_string(),
        0x4E80_0420 => return "bctr".to_string(),
        0x4E80_0421 => return "bctrl".to_string(),
        0x6000_0000 => return "nop".to_string(),
        _ => {}
    }

    let rd = (word >> 21) & 0x1F;
    let ra = (word >> 16) & 0x1F;
    let simm = word as u16 as i16;

    match word >> 26 {
        18 => {
            let mnemonic = match word & 3 {
                0 => "b",
                1 => "bl",
                2 => "ba",
                _ => "bla",
            };
            let target = branch_target(word, addr, 0x03FF_FFFC, 26);
            format!("{mnemonic}\t->0x{target:08X}")
        }
        14 if ra == 0 => format!("li\tr{rd}, {simm}"),
        14 => format!("addi\tr{rd}, r{ra}, {simm}"),
        15 if ra == 0 => format!("lis\tr{rd}, 0x{:04X}", word & 0xFFFF),
        15 => format!("addis\tr{rd}, r{ra}, 0x{:04X}", word & 0xFFFF),
        31 if word & 0x001F_FFFE == 0x0008_02A6 => format!("mflr\tr{rd}"),
        31 if word & 0x001F_FFFE == 0x0008_03A6 => format!("mtlr\tr{rd}"),
        _ => format!(".long 0x{word:08X}"),
    }
}
