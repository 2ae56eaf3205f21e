/// ARM Thumb (narrow) instruction decoding.
///
/// Each format is expressed as the equivalent wide instruction,
/// apart from a few PC-relative forms that have no wide counterpart.

use crate::{
    common::u16::*,
    core::{
        constants::*,
        ARMCondition,
        instructions::*
    }
};

/// Decode the thumb instruction.
pub fn decode_thumb(i: u16) -> Option<ARMv4Instruction> {
    const ALU: u16          = 0b000 << 13;
    const ALU_IMM: u16      = 0b001 << 13;
    const OTHER_LO: u16     = 0b010 << 13;
    const TRANSFER: u16     = 0b011 << 13;
    const TRANSFER_EXT: u16 = 0b100 << 13;
    const STACK: u16        = 0b101 << 13;
    const OTHER_HI: u16     = 0b110 << 13;
    let instr = match i & bits(13, 15) {
        ALU =>          decode_thumb_alu(i),
        ALU_IMM =>      decode_thumb_alu_imm(i),
        OTHER_LO =>     decode_thumb_other_lo(i)?,
        TRANSFER =>     decode_thumb_transfer(i),
        TRANSFER_EXT => decode_thumb_transfer_ext(i),
        STACK =>        decode_thumb_stack(i)?,
        OTHER_HI =>     return decode_thumb_other_hi(i),
        _ =>            decode_thumb_branch(i)?,
    };
    Some(ARMv4Instruction::new(ARMCondition::AL, instr))
}

/// Decode shift & arithmetic
fn decode_thumb_alu(i: u16) -> ARMv4InstructionType {
    let rs = ((i >> 3) & 0x7) as usize;
    let rd = (i & 0x7) as usize;
    let shift_amount = ((i >> 6) & 0x1F) as u32;
    match (i & bits(11, 12)) >> 11 {
        0b00 => {
            let op2 = if shift_amount == 0 {
                ShiftOperand::Register(rs)
            } else {
                ShiftOperand::LSL{shift_amount, reg: rs}
            };
            ARMv4InstructionType::MOV{rd, op2: ALUOperand::Normal(op2), set_flags: true}
        },
        0b01 => {
            let op2 = if shift_amount == 0 {
                ShiftOperand::LSR32{reg: rs}
            } else {
                ShiftOperand::LSR{shift_amount, reg: rs}
            };
            ARMv4InstructionType::MOV{rd, op2: ALUOperand::Normal(op2), set_flags: true}
        },
        0b10 => {
            let op2 = if shift_amount == 0 {
                ShiftOperand::ASR32{reg: rs}
            } else {
                ShiftOperand::ASR{shift_amount, reg: rs}
            };
            ARMv4InstructionType::MOV{rd, op2: ALUOperand::Normal(op2), set_flags: true}
        },
        _ => {
            let field = (i >> 6) & 0x7;
            let op2 = if test_bit(i, 10) {
                ALUOperand::Normal(ShiftOperand::Immediate(field as u32))
            } else {
                ALUOperand::Normal(ShiftOperand::Register(field as usize))
            };
            if test_bit(i, 9) {
                ARMv4InstructionType::SUB{rd, rn: rs, op2, set_flags: true}
            } else {
                ARMv4InstructionType::ADD{rd, rn: rs, op2, set_flags: true}
            }
        }
    }
}

/// Decode move/compare/arith with 8-bit immediate
fn decode_thumb_alu_imm(i: u16) -> ARMv4InstructionType {
    let rd = ((i >> 8) & 0x7) as usize;
    let imm = (i & 0xFF) as u32;
    let op2 = ALUOperand::Normal(ShiftOperand::Immediate(imm));
    match (i & bits(11, 12)) >> 11 {
        0b00 => ARMv4InstructionType::MOV{rd, op2, set_flags: true},
        0b01 => ARMv4InstructionType::CMP{rn: rd, op2},
        0b10 => ARMv4InstructionType::ADD{rd, rn: rd, op2, set_flags: true},
        _    => ARMv4InstructionType::SUB{rd, rn: rd, op2, set_flags: true},
    }
}

/// Decode other ALU operations, branch exchange, and register offset memory ops
fn decode_thumb_other_lo(i: u16) -> Option<ARMv4InstructionType> {
    if test_bit(i, 12) {
        Some(decode_thumb_transfer_reg(i))
    } else if test_bit(i, 11) {
        // Load PC-relative
        let rd = ((i >> 8) & 0x7) as usize;
        let offset = ((i & 0xFF) as u32) << 2;
        Some(ARMv4InstructionType::TLDRPC{data_reg: rd, offset})
    } else if test_bit(i, 10) {
        decode_thumb_hi_reg_ops(i)
    } else {
        Some(decode_thumb_alu_ops(i))
    }
}

/// Decode transfer of data with register offset
fn decode_thumb_transfer_reg(i: u16) -> ARMv4InstructionType {
    let ro = ((i >> 6) & 0x7) as usize;
    let rb = ((i >> 3) & 0x7) as usize;
    let rd = (i & 0x7) as usize;

    let transfer_params = TransferParams{
        base_reg: rb,
        inc: true,
        pre_index: true,
        writeback: false,
    };
    if test_bit(i, 9) {
        let offset = OpData::Register(ro);
        match (i & bits(10, 11)) >> 10 {
            0b00 => ARMv4InstructionType::STRH{transfer_params, data_reg: rd, offset},
            0b01 => ARMv4InstructionType::LDRSB{transfer_params, data_reg: rd, offset},
            0b10 => ARMv4InstructionType::LDRH{transfer_params, data_reg: rd, offset},
            _    => ARMv4InstructionType::LDRSH{transfer_params, data_reg: rd, offset},
        }
    } else {
        let offset = ShiftOperand::Register(ro);
        match (i & bits(10, 11)) >> 10 {
            0b00 => ARMv4InstructionType::STR{transfer_params, data_reg: rd, offset},
            0b01 => ARMv4InstructionType::STRB{transfer_params, data_reg: rd, offset},
            0b10 => ARMv4InstructionType::LDR{transfer_params, data_reg: rd, offset},
            _    => ARMv4InstructionType::LDRB{transfer_params, data_reg: rd, offset},
        }
    }
}

/// Decode operations on the high registers, and BX
fn decode_thumb_hi_reg_ops(i: u16) -> Option<ARMv4InstructionType> {
    let rs = ((i >> 3) & 0xF) as usize;
    let rd = (((i >> 4) & 8) | (i & 7)) as usize;
    let op2 = ALUOperand::Normal(ShiftOperand::Register(rs));
    match (i & bits(8, 9)) >> 8 {
        0b00 => Some(ARMv4InstructionType::ADD{rd, rn: rd, op2, set_flags: false}),
        0b01 => Some(ARMv4InstructionType::CMP{rn: rd, op2}),
        0b10 => Some(ARMv4InstructionType::MOV{rd, op2, set_flags: false}),
        // BLX is ARMv5 only.
        _ if test_bit(i, 7) => None,
        _ => Some(ARMv4InstructionType::BX{reg: rs}),
    }
}

/// Decode alu operations
fn decode_thumb_alu_ops(i: u16) -> ARMv4InstructionType {
    let rs = ((i >> 3) & 7) as usize;
    let rd = (i & 7) as usize;
    let op2 = ALUOperand::Normal(ShiftOperand::Register(rs));
    let reg_shift = |op| ALUOperand::RegShift{op, shift_reg: rs, reg: rd};
    match (i & bits(6, 9)) >> 6 {
        0x0 => ARMv4InstructionType::AND{rd, rn: rd, op2, set_flags: true},
        0x1 => ARMv4InstructionType::EOR{rd, rn: rd, op2, set_flags: true},
        0x2 => ARMv4InstructionType::MOV{rd, op2: reg_shift(RegShiftOperand::LSL), set_flags: true},
        0x3 => ARMv4InstructionType::MOV{rd, op2: reg_shift(RegShiftOperand::LSR), set_flags: true},
        0x4 => ARMv4InstructionType::MOV{rd, op2: reg_shift(RegShiftOperand::ASR), set_flags: true},
        0x5 => ARMv4InstructionType::ADC{rd, rn: rd, op2, set_flags: true},
        0x6 => ARMv4InstructionType::SBC{rd, rn: rd, op2, set_flags: true},
        0x7 => ARMv4InstructionType::MOV{rd, op2: reg_shift(RegShiftOperand::ROR), set_flags: true},
        0x8 => ARMv4InstructionType::TST{rn: rd, op2},
        0x9 => ARMv4InstructionType::RSB{rd, rn: rs, op2: ALUOperand::Normal(ShiftOperand::Immediate(0)), set_flags: true},
        0xA => ARMv4InstructionType::CMP{rn: rd, op2},
        0xB => ARMv4InstructionType::CMN{rn: rd, op2},
        0xC => ARMv4InstructionType::ORR{rd, rn: rd, op2, set_flags: true},
        0xD => ARMv4InstructionType::MUL{set_flags: true, rd, rs: rd, rm: rs},
        0xE => ARMv4InstructionType::BIC{rd, rn: rd, op2, set_flags: true},
        _   => ARMv4InstructionType::MVN{rd, op2, set_flags: true},
    }
}

/// Decode transfer of words and bytes with immediate offset
fn decode_thumb_transfer(i: u16) -> ARMv4InstructionType {
    let offset = ((i >> 6) & 0x1F) as u32;
    let rb = ((i >> 3) & 0x7) as usize;
    let rd = (i & 0x7) as usize;
    let transfer_params = TransferParams{
        base_reg: rb,
        inc: true,
        pre_index: true,
        writeback: false,
    };
    match (i & bits(11, 12)) >> 11 {
        0b00 => ARMv4InstructionType::STR{transfer_params, data_reg: rd, offset: ShiftOperand::Immediate(offset << 2)},
        0b01 => ARMv4InstructionType::LDR{transfer_params, data_reg: rd, offset: ShiftOperand::Immediate(offset << 2)},
        0b10 => ARMv4InstructionType::STRB{transfer_params, data_reg: rd, offset: ShiftOperand::Immediate(offset)},
        _    => ARMv4InstructionType::LDRB{transfer_params, data_reg: rd, offset: ShiftOperand::Immediate(offset)},
    }
}

/// Decode transfer of halfwords and stack-relative transfers
fn decode_thumb_transfer_ext(i: u16) -> ARMv4InstructionType {
    if test_bit(i, 12) {
        let rd = ((i >> 8) & 0x7) as usize;
        let offset = ((i & 0xFF) as u32) << 2;
        let transfer_params = TransferParams{
            base_reg: SP_REG,
            inc: true,
            pre_index: true,
            writeback: false,
        };
        if test_bit(i, 11) {
            ARMv4InstructionType::LDR{transfer_params, data_reg: rd, offset: ShiftOperand::Immediate(offset)}
        } else {
            ARMv4InstructionType::STR{transfer_params, data_reg: rd, offset: ShiftOperand::Immediate(offset)}
        }
    } else {
        let offset = ((i >> 5) & 0x3E) as u32;
        let rb = ((i >> 3) & 0x7) as usize;
        let rd = (i & 0x7) as usize;
        let transfer_params = TransferParams{
            base_reg: rb,
            inc: true,
            pre_index: true,
            writeback: false,
        };
        if test_bit(i, 11) {
            ARMv4InstructionType::LDRH{transfer_params, data_reg: rd, offset: OpData::Immediate(offset)}
        } else {
            ARMv4InstructionType::STRH{transfer_params, data_reg: rd, offset: OpData::Immediate(offset)}
        }
    }
}

/// Decode load address, SP adjust, and push/pop
fn decode_thumb_stack(i: u16) -> Option<ARMv4InstructionType> {
    if test_bit(i, 12) {
        match (i >> 8) & 0xF {
            0b0000 => {
                let offset = ((i & 0x7F) as u32) << 2;
                let op2 = ALUOperand::Normal(ShiftOperand::Immediate(offset));
                if test_bit(i, 7) {
                    Some(ARMv4InstructionType::SUB{rd: SP_REG, rn: SP_REG, op2, set_flags: false})
                } else {
                    Some(ARMv4InstructionType::ADD{rd: SP_REG, rn: SP_REG, op2, set_flags: false})
                }
            },
            0b0100 | 0b0101 | 0b1100 | 0b1101 => Some(decode_push_pop(i)),
            // BKPT and everything else here is ARMv5 or later.
            _ => None,
        }
    } else {
        let rd = ((i >> 8) & 0x7) as usize;
        let offset = ((i & 0xFF) as u32) << 2;
        if test_bit(i, 11) {
            let op2 = ALUOperand::Normal(ShiftOperand::Immediate(offset));
            Some(ARMv4InstructionType::ADD{rd, rn: SP_REG, op2, set_flags: false})
        } else {
            Some(ARMv4InstructionType::TADDPC{rd, op2: offset})
        }
    }
}

/// Decode push and pop for thumb
fn decode_push_pop(i: u16) -> ARMv4InstructionType {
    let mut reg_list = (i & 0xFF) as u32;
    if test_bit(i, 11) {
        // POP
        let transfer_params = TransferParams{
            base_reg: SP_REG,
            inc: true,
            pre_index: false,
            writeback: true,
        };
        if test_bit(i, 8) {
            reg_list |= 1 << PC_REG;
        }
        ARMv4InstructionType::LDM{transfer_params, reg_list, load_from_user: false}
    } else {
        // PUSH
        let transfer_params = TransferParams{
            base_reg: SP_REG,
            inc: false,
            pre_index: true,
            writeback: true,
        };
        if test_bit(i, 8) {
            reg_list |= 1 << LINK_REG;
        }
        ARMv4InstructionType::STM{transfer_params, reg_list, load_from_user: false}
    }
}

/// Decode load/store multiple and conditional branches
fn decode_thumb_other_hi(i: u16) -> Option<ARMv4Instruction> {
    if test_bit(i, 12) {
        decode_thumb_cond_branch(i)
    } else {
        Some(ARMv4Instruction::new(ARMCondition::AL, decode_thumb_transfer_mul(i)))
    }
}

/// Decode conditional branches and software interrupt
fn decode_thumb_cond_branch(i: u16) -> Option<ARMv4Instruction> {
    match (i >> 8) & 0xF {
        0xF => Some(ARMv4Instruction::new(ARMCondition::AL, ARMv4InstructionType::SWI{comment: (i & 0xFF) as u32})),
        0xE => None,
        cond_bits => {
            let cond = ARMCondition::from_bits(cond_bits as u32);
            let offset_i = ((i & 0xFF) as u8) as i8;
            let offset = ((offset_i as i32) << 1) as u32;
            Some(ARMv4Instruction::new(cond, ARMv4InstructionType::TB{offset}))
        }
    }
}

/// Decode LDMIA and STMIA
fn decode_thumb_transfer_mul(i: u16) -> ARMv4InstructionType {
    let rb = ((i >> 8) & 0x7) as usize;
    let reg_list = (i & 0xFF) as u32;
    let transfer_params = TransferParams{
        base_reg: rb,
        inc: true,
        pre_index: false,
        writeback: true,
    };
    if test_bit(i, 11) {
        ARMv4InstructionType::LDM{transfer_params, reg_list, load_from_user: false}
    } else {
        ARMv4InstructionType::STM{transfer_params, reg_list, load_from_user: false}
    }
}

/// Decode branches
fn decode_thumb_branch(i: u16) -> Option<ARMv4InstructionType> {
    let offset_imm = (i & bits(0, 10)) as u32;
    match (i & bits(11, 12)) >> 11 {
        0b00 => {   // B
            let offset = ((offset_imm as i32) << 21) >> 20;
            Some(ARMv4InstructionType::TB{offset: offset as u32})
        },
        0b01 => None,   // BLX suffix is ARMv5 only.
        0b10 => {   // Long branch, high part of the offset
            let offset = ((offset_imm as i32) << 21) >> 9;
            Some(ARMv4InstructionType::TBLLO{offset: offset as u32})
        },
        _ => {      // Long branch, low part of the offset
            Some(ARMv4InstructionType::TBLHI{offset: offset_imm << 1})
        },
    }
}
