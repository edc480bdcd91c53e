use crate::guest::{FunctionAnalysis, Guest, BLR};
use crate::symbols::CallSite;

/// Scans longer than this are treated as runaway and rejected.
pub const MAX_FUNCTION_SIZE: u32 = 0x20000;

const OPCODE_BC: u32 = 16;
const OPCODE_B: u32 = 18;

/// Walk forward from `start` until the function's final `blr`.
///
/// A `blr` only ends the function once no earlier conditional or forward
/// branch targets a later address. A backwards unconditional `b` is a tail
/// call and also ends it. `bl` targets are recorded as call sites. With a
/// nonzero `max_size` the scan stops at that size instead of failing.
pub fn analyze_function<G: Guest + ?Sized>(
    guest: &G,
    start: u32,
    max_size: u32,
) -> Option<FunctionAnalysis> {
    let mut calls = Vec::new();
    let mut farthest_branch = start;
    let mut size = 0u32;
    let mut addr = start;

    loop {
        size += 4;
        if size >= MAX_FUNCTION_SIZE || !guest.is_instruction_ram(addr) {
            tracing::trace!(start = format_args!("{start:#010x}"), size, "function analysis gave up");
            return None;
        }
        if max_size != 0 && size > max_size {
            return Some(FunctionAnalysis {
                size: size - 4,
                checksum: guest.code_checksum(start, addr.wrapping_sub(4)),
                calls,
            });
        }

        let word = guest.read_instruction(addr)?;
        let ends_here = if word == BLR {
            farthest_branch <= addr
        } else {
            match word >> 26 {
                OPCODE_B => {
                    let target = branch_target(word, addr, 0x03FF_FFFC, 26);
                    if word & 1 != 0 {
                        calls.push(CallSite { function: target, call_address: addr });
                        false
                    } else if target < start {
                        farthest_branch <= addr
                    } else {
                        farthest_branch = farthest_branch.max(target);
                        false
                    }
                }
                OPCODE_BC if word & 1 == 0 => {
                    let target = branch_target(word, addr, 0x0000_FFFC, 16);
                    farthest_branch = farthest_branch.max(target);
                    false
                }
                _ => false,
            }
        };

        if ends_here {
            return Some(FunctionAnalysis {
                size: addr.wrapping_add(4).wrapping_sub(start),
                checksum: guest.code_checksum(start, addr),
                calls,
            });
        }
        addr = addr.wrapping_add(4);
    }
}

/// Resolve an I-form or B-form branch displacement of `bits` bits.
pub(crate) fn branch_target(word: u32, addr: u32, mask: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    let displacement = (((word & mask) << shift) as i32 >> shift) as u32;
    if word & 2 != 0 {
        displacement
    } else {
        addr.wrapping_add(displacement)
    }
}
