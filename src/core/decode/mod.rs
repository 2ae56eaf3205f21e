mod arm;
mod thumb;

use thiserror::Error;

use crate::{
    common::u32::test_bit,
    core::instructions::ARMv4Instruction
};

pub use self::arm::decode_arm;
pub use self::thumb::decode_thumb;

/// The word does not encode any ARMv4T instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unrecognised encoding {0:#010x}")]
pub struct NotRecognized(pub u32);

/// Decode a fetched word.
///
/// Narrow (thumb) words only use the low halfword.
pub fn classify(word: u32, narrow: bool) -> Result<ARMv4Instruction, NotRecognized> {
    let decoded = if narrow {
        decode_thumb(word as u16)
    } else {
        decode_arm(word)
    };
    decoded.ok_or(NotRecognized(word))
}

/// Make fsxc mask for manipulating PSR.
/// Creates a 32-bit mask based on the status of certain bits in the input value.
/// Bit 19: flags. Bits 24-31
/// Bit 18: status. Bits 16-23
/// Bit 17: extension. Bits 8-15
/// Bit 16: control. Bits 0-7
const fn fsxc_mask(from: u32) -> u32 {
    let mut mask = 0;
    if test_bit(from, 19) {
        mask |= 0xFF00_0000;
    }
    if test_bit(from, 18) {
        mask |= 0x00FF_0000;
    }
    if test_bit(from, 17) {
        mask |= 0x0000_FF00;
    }
    if test_bit(from, 16) {
        mask |= 0x0000_00FF;
    }
    mask
}
