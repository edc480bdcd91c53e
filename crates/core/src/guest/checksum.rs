use crate::guest::Guest;

/// Checksum over the opcode fields of every word in `[start, end]`.
///
/// Register numbers and immediates are masked out so the same function hashes
/// identically after relocation or a register-allocation change. Unmapped
/// words count as zero.
pub fn code_checksum<G: Guest + ?Sized>(guest: &G, start: u32, end: u32) -> u32 {
    let mut sum = 0u32;
    for addr in (start..=end).step_by(4) {
        let word = guest.read_instruction(addr).unwrap_or(0);
        sum = sum.rotate_left(17) ^ significant_bits(word);
    }
    sum
}

fn significant_bits(word: u32) -> u32 {
    let primary = word & 0xFC00_0000;
    let opcd = word >> 26;

    let (extended, sub) = match opcd {
        // Paired singles.
        4 => {
            let extended = word & 0x0000_003F;
            let sub = match extended {
                0 | 8 | 16 | 21 | 22 => word & 0x0000_07C0,
                _ => 0,
            };
            (extended, sub)
        }
        7 | 8 | 10..=15 => (word & 0x03FF_0000, 0),
        19 | 31 | 63 => (word & 0x0000_07FF, 0),
        59 => {
            let extended = word & 0x0000_003F;
            let sub = if extended < 16 { word & 0x0000_07C0 } else { 0 };
            (extended, sub)
        }
        // Loads and stores.
        32..=55 => (word & 0x03FF_0000, 0),
        _ => (0, 0),
    };
    primary | extended | sub
}
