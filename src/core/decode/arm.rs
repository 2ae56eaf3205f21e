/// ARM (wide) instruction decoding.

use crate::{
    common::u32::*,
    core::{
        constants::*,
        ARMCondition,
        instructions::*
    }
};

type Decoder = fn(u32) -> Option<ARMv4InstructionType>;

/// Encoding classes as (mask, expected, decoder).
/// Walked in order: the first entry where `i & mask == expected` decodes the word.
/// Later entries overlap earlier ones, so the order matters.
const DECODE_TABLE: [(u32, u32, Decoder); 14] = [
    (0x0F00_0000, 0x0F00_0000, decode_swi),
    (0x0E00_0000, 0x0A00_0000, decode_branch),
    (0x0FC0_00F0, 0x0000_0090, decode_multiply),
    (0x0F80_00F0, 0x0080_0090, decode_multiply_long),
    (0x0FB0_0FF0, 0x0100_0090, decode_swp),
    (0x0FFF_FFF0, 0x012F_FF10, decode_bx),
    (0x0E00_0090, 0x0000_0090, decode_transfer_halfword),
    (0x0FBF_0FFF, 0x010F_0000, decode_mrs),
    (0x0DB0_F000, 0x0120_F000, decode_msr),
    (0x0C00_0000, 0x0000_0000, decode_data_proc),
    (0x0E00_0010, 0x0600_0010, decode_undefined),
    (0x0C00_0000, 0x0400_0000, decode_transfer),
    (0x0E00_0000, 0x0800_0000, decode_transfer_multiple),
    (0x0C00_0000, 0x0C00_0000, decode_coproc),
];

/// Decode the instruction.
pub fn decode_arm(i: u32) -> Option<ARMv4Instruction> {
    let cond = ARMCondition::from_bits(i >> 28);
    DECODE_TABLE.iter()
        .find(|(mask, expected, _)| (i & mask) == *expected)
        .and_then(|(_, _, decode)| decode(i))
        .map(|instr| ARMv4Instruction::new(cond, instr))
}

/// i has the value cccc1111...
fn decode_swi(i: u32) -> Option<ARMv4InstructionType> {
    Some(ARMv4InstructionType::SWI{comment: i & 0xFF_FFFF})
}

/// i has the value cccc101L...
fn decode_branch(i: u32) -> Option<ARMv4InstructionType> {
    let offset = sign_extend(i & 0xFF_FFFF, 24) << 2;
    if test_bit(i, 24) {
        Some(ARMv4InstructionType::BL{offset})
    } else {
        Some(ARMv4InstructionType::B{offset})
    }
}

fn decode_multiply(i: u32) -> Option<ARMv4InstructionType> {
    let set_flags = test_bit(i, 20);
    let rd = ((i >> 16) & 0xF) as usize;
    let rn = ((i >> 12) & 0xF) as usize;
    let rs = ((i >> 8) & 0xF) as usize;
    let rm = (i & 0xF) as usize;
    if test_bit(i, 21) {
        Some(ARMv4InstructionType::MLA{set_flags, rd, rn, rs, rm})
    } else {
        Some(ARMv4InstructionType::MUL{set_flags, rd, rs, rm})
    }
}

fn decode_multiply_long(i: u32) -> Option<ARMv4InstructionType> {
    let set_flags = test_bit(i, 20);
    let rd_hi = ((i >> 16) & 0xF) as usize;
    let rd_lo = ((i >> 12) & 0xF) as usize;
    let rs = ((i >> 8) & 0xF) as usize;
    let rm = (i & 0xF) as usize;
    match (i >> 21) & 0x3 {
        0b00 => Some(ARMv4InstructionType::UMULL{set_flags, rd_hi, rd_lo, rs, rm}),
        0b01 => Some(ARMv4InstructionType::UMLAL{set_flags, rd_hi, rd_lo, rs, rm}),
        0b10 => Some(ARMv4InstructionType::SMULL{set_flags, rd_hi, rd_lo, rs, rm}),
        _    => Some(ARMv4InstructionType::SMLAL{set_flags, rd_hi, rd_lo, rs, rm}),
    }
}

/// Decode a data swap.
fn decode_swp(i: u32) -> Option<ARMv4InstructionType> {
    let rn = ((i >> 16) & 0xF) as usize;
    let rd = ((i >> 12) & 0xF) as usize;
    let rm = (i & 0xF) as usize;
    if test_bit(i, 22) {
        Some(ARMv4InstructionType::SWPB{rn, rd, rm})
    } else {
        Some(ARMv4InstructionType::SWP{rn, rd, rm})
    }
}

fn decode_bx(i: u32) -> Option<ARMv4InstructionType> {
    Some(ARMv4InstructionType::BX{reg: (i & 0xF) as usize})
}

fn decode_mrs(i: u32) -> Option<ARMv4InstructionType> {
    let rd = ((i >> 12) & 0xF) as usize;
    Some(ARMv4InstructionType::MRS{spsr: test_bit(i, 22), rd})
}

fn decode_msr(i: u32) -> Option<ARMv4InstructionType> {
    let spsr = test_bit(i, 22);
    let mask = super::fsxc_mask(i);
    if test_bit(i, 25) {
        let shift = (i >> 7) & 0x1E;
        let imm = i & 0xFF;
        let data = OpData::Immediate(imm.rotate_right(shift));
        Some(ARMv4InstructionType::MSR{spsr, mask, data})
    } else if (i & 0xFF0) == 0 {
        let data = OpData::Register((i & 0xF) as usize);
        Some(ARMv4InstructionType::MSR{spsr, mask, data})
    } else {
        None
    }
}

fn decode_undefined(_i: u32) -> Option<ARMv4InstructionType> {
    None
}

/// Decode a data processing instruction.
/// i has the value cccc00...
fn decode_data_proc(i: u32) -> Option<ARMv4InstructionType> {
    // Register shifts never have bit 7 set. Those encodings belong to multiply and extended transfers.
    if !test_bit(i, 25) && test_bit(i, 4) && test_bit(i, 7) {
        return None;
    }
    let set_flags = test_bit(i, 20);
    let rn = ((i >> 16) & 0xF) as usize;
    let rd = ((i >> 12) & 0xF) as usize;
    let op2 = decode_alu_op2(i);

    Some(match (i >> 21) & 0xF {
        0x0 => ARMv4InstructionType::AND{rd, rn, op2, set_flags},
        0x1 => ARMv4InstructionType::EOR{rd, rn, op2, set_flags},
        0x2 => ARMv4InstructionType::SUB{rd, rn, op2, set_flags},
        0x3 => ARMv4InstructionType::RSB{rd, rn, op2, set_flags},
        0x4 => ARMv4InstructionType::ADD{rd, rn, op2, set_flags},
        0x5 => ARMv4InstructionType::ADC{rd, rn, op2, set_flags},
        0x6 => ARMv4InstructionType::SBC{rd, rn, op2, set_flags},
        0x7 => ARMv4InstructionType::RSC{rd, rn, op2, set_flags},
        // Comparisons without S are PSR transfers, which were matched already.
        0x8 if set_flags => ARMv4InstructionType::TST{rn, op2},
        0x9 if set_flags => ARMv4InstructionType::TEQ{rn, op2},
        0xA if set_flags => ARMv4InstructionType::CMP{rn, op2},
        0xB if set_flags => ARMv4InstructionType::CMN{rn, op2},
        0x8..=0xB => return None,
        0xC => ARMv4InstructionType::ORR{rd, rn, op2, set_flags},
        0xD => ARMv4InstructionType::MOV{rd, op2, set_flags},
        0xE => ARMv4InstructionType::BIC{rd, rn, op2, set_flags},
        _   => ARMv4InstructionType::MVN{rd, op2, set_flags},
    })
}

/// Decode the second operand of an arithmetic / logic instruction.
///
/// Extracts a value from the lower 12 bits based on the 25th bit.
fn decode_alu_op2(i: u32) -> ALUOperand {
    // Immediate value with rotate:
    if test_bit(i, 25) {
        let shift = (i >> 7) & 0x1E;
        let n = i & 0xFF;
        return if shift == 0 {
            ALUOperand::Normal(ShiftOperand::Immediate(n))
        } else {
            ALUOperand::Normal(ShiftOperand::RotatedImmediate(n.rotate_right(shift)))
        };
    }
    let reg = (i & 0xF) as usize;
    if test_bit(i, 4) {
        let shift_reg = ((i >> 8) & 0xF) as usize;
        let op = match (i >> 5) & 3 {
            0 => RegShiftOperand::LSL,
            1 => RegShiftOperand::LSR,
            2 => RegShiftOperand::ASR,
            _ => RegShiftOperand::ROR,
        };
        ALUOperand::RegShift{op, shift_reg, reg}
    } else {
        ALUOperand::Normal(decode_imm_shift(i))
    }
}

/// Register shifted by an immediate amount, from the lower 12 bits.
fn decode_imm_shift(i: u32) -> ShiftOperand {
    let reg = (i & 0xF) as usize;
    let shift_amount = (i >> 7) & 0x1F;
    // Special shift cases when the immediate is 0:
    if shift_amount == 0 {
        return match (i >> 5) & 3 {
            0 => ShiftOperand::Register(reg),
            1 => ShiftOperand::LSR32{reg},
            2 => ShiftOperand::ASR32{reg},
            _ => ShiftOperand::RRX{reg},
        };
    }
    match (i >> 5) & 3 {
        0 => ShiftOperand::LSL{shift_amount, reg},
        1 => ShiftOperand::LSR{shift_amount, reg},
        2 => ShiftOperand::ASR{shift_amount, reg},
        _ => ShiftOperand::ROR{shift_amount, reg},
    }
}

fn transfer_params(i: u32) -> TransferParams {
    TransferParams {
        base_reg:   ((i >> 16) & 0xF) as usize,
        inc:        test_bit(i, 23),
        pre_index:  test_bit(i, 24),
        writeback:  test_bit(i, 21),
    }
}

/// Decode a single transfer instruction (load or store).
/// i has the value cccc01...
fn decode_transfer(i: u32) -> Option<ARMv4InstructionType> {
    let data_reg = ((i >> 12) & 0xF) as usize;
    let offset = if test_bit(i, 25) {
        decode_imm_shift(i)
    } else {
        ShiftOperand::Immediate(i & 0xFFF)
    };
    let transfer_params = transfer_params(i);

    Some(match (test_bit(i, 20), test_bit(i, 22)) {
        (true, false)   => ARMv4InstructionType::LDR{transfer_params, data_reg, offset},
        (true, true)    => ARMv4InstructionType::LDRB{transfer_params, data_reg, offset},
        (false, false)  => ARMv4InstructionType::STR{transfer_params, data_reg, offset},
        (false, true)   => ARMv4InstructionType::STRB{transfer_params, data_reg, offset},
    })
}

/// Decode a load or store halfword instruction.
fn decode_transfer_halfword(i: u32) -> Option<ARMv4InstructionType> {
    let data_reg = ((i >> 12) & 0xF) as usize;
    let offset = if test_bit(i, 22) {
        OpData::Immediate(((i >> 4) & 0xF0) | (i & 0xF))
    } else {
        OpData::Register((i & 0xF) as usize)
    };
    let transfer_params = transfer_params(i);

    match (test_bit(i, 20), (i >> 5) & 0x3) {
        (true, 0b01)    => Some(ARMv4InstructionType::LDRH{transfer_params, data_reg, offset}),
        (true, 0b10)    => Some(ARMv4InstructionType::LDRSB{transfer_params, data_reg, offset}),
        (true, 0b11)    => Some(ARMv4InstructionType::LDRSH{transfer_params, data_reg, offset}),
        (false, 0b01)   => Some(ARMv4InstructionType::STRH{transfer_params, data_reg, offset}),
        _ => None,
    }
}

/// Decode a transfer multiple instruction.
/// Writes registers low-high into low-high addresses.
fn decode_transfer_multiple(i: u32) -> Option<ARMv4InstructionType> {
    let transfer_params = transfer_params(i);
    if transfer_params.base_reg == PC_REG {
        return None;
    }
    let reg_list = i & 0xFFFF;
    let load_from_user = test_bit(i, 22);

    if test_bit(i, 20) {
        Some(ARMv4InstructionType::LDM{transfer_params, reg_list, load_from_user})
    } else {
        Some(ARMv4InstructionType::STM{transfer_params, reg_list, load_from_user})
    }
}

/// i has the value cccc11...
fn decode_coproc(i: u32) -> Option<ARMv4InstructionType> {
    Some(ARMv4InstructionType::COPROC{coproc: ((i >> 8) & 0xF) as usize})
}
