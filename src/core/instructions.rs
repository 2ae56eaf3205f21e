// Instructions

use crate::core::ARMCondition;
use crate::common::u32::test_bit;
use std::fmt;

/// A decoded instruction: condition plus operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ARMv4Instruction {
    pub cond:   ARMCondition,
    pub instr:  ARMv4InstructionType,
}

impl ARMv4Instruction {
    pub fn new(cond: ARMCondition, instr: ARMv4InstructionType) -> Self {
        Self {
            cond, instr
        }
    }

    pub fn category(&self) -> Category {
        self.instr.category()
    }
}

/// Broad instruction classes, in decode order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    SoftwareInterrupt,
    Branch,
    Multiply,
    MultiplyLong,
    Swap,
    DataProcessing,
    PsrTransfer,
    SingleTransfer,
    HalfwordTransfer,
    BlockTransfer,
    Coprocessor,
}

fn reg_list_to_str(reg_list: u32) -> String {
    let mut out = String::new();
    let mut prev_reg: Option<usize> = None;
    let mut consecutive = false;
    for reg in 0..16 {
        if test_bit(reg_list, reg) {
            if let Some(prev) = prev_reg {
                if (prev + 1) != reg {
                    if consecutive {
                        out.push_str(&format!("-R{}", prev));
                    }
                    out.push_str(&format!(",R{}", reg));
                    consecutive = false;
                } else {
                    consecutive = true;
                }
            } else {
                out.push_str(&format!("R{}", reg));
            }

            prev_reg = Some(reg);
        }
    }
    if let Some(prev) = prev_reg {
        if consecutive {
            out.push_str(&format!("-R{}", prev));
        }
    }
    out
}

fn s(set_flags: bool) -> &'static str {
    if set_flags {"S"} else {""}
}

impl fmt::Display for ARMv4Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ARMv4InstructionType::*;
        let c = self.cond;
        match &self.instr {
            SWI{comment} => write!(f, "SWI{} {:X}", c, comment),
            COPROC{coproc} => write!(f, "CP{}{}", c, coproc),

            B{offset} => write!(f, "B{} #{:X}", c, offset),
            TB{offset} => write!(f, "B{} #{:X}", c, offset),
            BL{offset} => write!(f, "BL{} #{:X}", c, offset),
            TBLLO{offset} => write!(f, "BL{} #{:X}", c, offset),
            TBLHI{offset} => write!(f, "BL{} #{:X}", c, offset),
            BX{reg} => write!(f, "BX{} R{}", c, reg),

            SWP{rn, rd, rm} => write!(f, "SWP{} R{},R{},[R{}]", c, rd, rm, rn),
            SWPB{rn, rd, rm} => write!(f, "SWP{}B R{},R{},[R{}]", c, rd, rm, rn),
            LDR{transfer_params, data_reg, offset} => write!(f, "LDR{} R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            TLDRPC{data_reg, offset} => write!(f, "LDR R{},[PC,#{:X}]", data_reg, offset),
            STR{transfer_params, data_reg, offset} => write!(f, "STR{} R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            LDRB{transfer_params, data_reg, offset} => write!(f, "LDR{}B R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            STRB{transfer_params, data_reg, offset} => write!(f, "STR{}B R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            LDRH{transfer_params, data_reg, offset} => write!(f, "LDR{}H R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            STRH{transfer_params, data_reg, offset} => write!(f, "STR{}H R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            LDRSB{transfer_params, data_reg, offset} => write!(f, "LDR{}SB R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            LDRSH{transfer_params, data_reg, offset} => write!(f, "LDR{}SH R{},{}", c, data_reg, transfer_params.with_offset(offset)),
            LDM{transfer_params, reg_list, load_from_user} => write!(f,
                "LDM{}{} R{}{},{{{}}}{}", c, transfer_params.block_suffix(), transfer_params.base_reg,
                if transfer_params.writeback {"!"} else {""}, reg_list_to_str(*reg_list), if *load_from_user {"^"} else {""}
            ),
            STM{transfer_params, reg_list, load_from_user} => write!(f,
                "STM{}{} R{}{},{{{}}}{}", c, transfer_params.block_suffix(), transfer_params.base_reg,
                if transfer_params.writeback {"!"} else {""}, reg_list_to_str(*reg_list), if *load_from_user {"^"} else {""}
            ),

            AND{rd, rn, op2, set_flags} => write!(f, "AND{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            EOR{rd, rn, op2, set_flags} => write!(f, "EOR{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            ORR{rd, rn, op2, set_flags} => write!(f, "ORR{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            BIC{rd, rn, op2, set_flags} => write!(f, "BIC{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            ADD{rd, rn, op2, set_flags} => write!(f, "ADD{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            TADDPC{rd, op2} => write!(f, "ADD R{},PC,#{:X}", rd, op2),
            SUB{rd, rn, op2, set_flags} => write!(f, "SUB{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            RSB{rd, rn, op2, set_flags} => write!(f, "RSB{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            ADC{rd, rn, op2, set_flags} => write!(f, "ADC{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            SBC{rd, rn, op2, set_flags} => write!(f, "SBC{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            RSC{rd, rn, op2, set_flags} => write!(f, "RSC{}{} R{},R{},{}", c, s(*set_flags), rd, rn, op2),
            TST{rn, op2} => write!(f, "TST{} R{},{}", c, rn, op2),
            TEQ{rn, op2} => write!(f, "TEQ{} R{},{}", c, rn, op2),
            CMP{rn, op2} => write!(f, "CMP{} R{},{}", c, rn, op2),
            CMN{rn, op2} => write!(f, "CMN{} R{},{}", c, rn, op2),
            MOV{rd, op2, set_flags} => write!(f, "MOV{}{} R{},{}", c, s(*set_flags), rd, op2),
            MVN{rd, op2, set_flags} => write!(f, "MVN{}{} R{},{}", c, s(*set_flags), rd, op2),

            MUL{set_flags, rd, rs, rm} => write!(f, "MUL{}{} R{},R{},R{}", c, s(*set_flags), rd, rm, rs),
            MLA{set_flags, rd, rn, rs, rm} => write!(f, "MLA{}{} R{},R{},R{},R{}", c, s(*set_flags), rd, rm, rs, rn),
            UMULL{set_flags, rd_hi, rd_lo, rs, rm} => write!(f, "UMULL{}{} R{},R{},R{},R{}", c, s(*set_flags), rd_lo, rd_hi, rm, rs),
            UMLAL{set_flags, rd_hi, rd_lo, rs, rm} => write!(f, "UMLAL{}{} R{},R{},R{},R{}", c, s(*set_flags), rd_lo, rd_hi, rm, rs),
            SMULL{set_flags, rd_hi, rd_lo, rs, rm} => write!(f, "SMULL{}{} R{},R{},R{},R{}", c, s(*set_flags), rd_lo, rd_hi, rm, rs),
            SMLAL{set_flags, rd_hi, rd_lo, rs, rm} => write!(f, "SMLAL{}{} R{},R{},R{},R{}", c, s(*set_flags), rd_lo, rd_hi, rm, rs),

            MSR{spsr, mask, data} => write!(f, "MSR{} {}_{:X},{}", c, if *spsr {"SPSR"} else {"CPSR"}, mask, data),
            MRS{spsr, rd} => write!(f, "MRS{} R{},{}", c, rd, if *spsr {"SPSR"} else {"CPSR"}),
        }
    }
}

/// Common parameters for transfer instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferParams {
    pub base_reg:   usize,
    pub inc:        bool,
    pub pre_index:  bool,
    pub writeback:  bool,
}

impl TransferParams {
    /// Addressing mode with an offset.
    fn with_offset<T: fmt::Display + IsZero>(&self, offset: &T) -> String {
        if !offset.is_zero() {
            if self.pre_index {
                format!("[R{},{}{}]{}", self.base_reg, if self.inc {""} else {"-"}, offset, if self.writeback {"!"} else {""})
            } else {
                format!("[R{}],{}{}", self.base_reg, if self.inc {""} else {"-"}, offset)
            }
        } else {
            format!("[R{}]", self.base_reg)
        }
    }

    fn block_suffix(&self) -> &'static str {
        match (self.inc, self.pre_index) {
            (true, false) => "IA",
            (true, true) => "IB",
            (false, false) => "DA",
            (false, true) => "DB",
        }
    }
}

trait IsZero {
    fn is_zero(&self) -> bool;
}

impl IsZero for ShiftOperand {
    fn is_zero(&self) -> bool {
        matches!(self, ShiftOperand::Immediate(0))
    }
}

impl IsZero for OpData {
    fn is_zero(&self) -> bool {
        matches!(self, OpData::Immediate(0))
    }
}

/// ALU 2nd operand types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ALUOperand {
    Normal(ShiftOperand),
    /// Shift "reg" by the value in "shift_reg".
    RegShift{
        op: RegShiftOperand,
        shift_reg: usize,
        reg: usize
    }
}

impl fmt::Display for ALUOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ALUOperand::*;
        match self {
            Normal(op) => write!(f, "{}", op),
            RegShift{op, shift_reg, reg} => write!(f, "R{},{} R{}", reg, op, shift_reg),
        }
    }
}

/// ALU 2nd operand types with a shift by register value.
///
/// These all take an extra cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegShiftOperand {
    LSL,
    LSR,
    ASR,
    ROR,
}

impl fmt::Display for RegShiftOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RegShiftOperand::*;
        match self {
            LSL => write!(f, "LSL"),
            LSR => write!(f, "LSR"),
            ASR => write!(f, "ASR"),
            ROR => write!(f, "ROR"),
        }
    }
}

/// Transfer offset and ALU 2nd operand types.
///
/// None of these take an extra cycle when used in the ALU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOperand {
    /// Immediate value. Leaves the carry unchanged.
    Immediate(u32),
    /// Immediate value that was rotated when decoded. Bit 31 is the carry-out.
    RotatedImmediate(u32),
    Register(usize),
    LSL{shift_amount: u32, reg: usize},
    LSR{shift_amount: u32, reg: usize},
    ASR{shift_amount: u32, reg: usize},
    ROR{shift_amount: u32, reg: usize},
    LSR32{reg: usize},
    ASR32{reg: usize},
    RRX{reg: usize},
}

impl fmt::Display for ShiftOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ShiftOperand::*;
        match self {
            Immediate(i) => write!(f, "#{:X}", i),
            RotatedImmediate(i) => write!(f, "#{:X}", i),
            Register(r) => write!(f, "R{}", r),
            LSL{shift_amount, reg} => write!(f, "R{},LSL #{}", reg, shift_amount),
            LSR{shift_amount, reg} => write!(f, "R{},LSR #{}", reg, shift_amount),
            ASR{shift_amount, reg} => write!(f, "R{},ASR #{}", reg, shift_amount),
            ROR{shift_amount, reg} => write!(f, "R{},ROR #{}", reg, shift_amount),
            LSR32{reg} => write!(f, "R{},LSR #32", reg),
            ASR32{reg} => write!(f, "R{},ASR #32", reg),
            RRX{reg} => write!(f, "R{},RRX", reg),
        }
    }
}

/// Simple data types, used for halfword offset and msr.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpData {
    Immediate(u32),
    Register(usize)
}

impl fmt::Display for OpData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use OpData::*;
        match self {
            Immediate(i) => write!(f, "#{:X}", i),
            Register(r) => write!(f, "R{}", r),
        }
    }
}

/// Decoded instructions.
///
/// Each instruction has a set of parameters.
/// Instructions prefixed with T only come from the narrow (thumb) encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ARMv4InstructionType {
    SWI{comment: u32},
    /// Any coprocessor instruction. There are no coprocessors attached.
    COPROC{coproc: usize},
    // Branch
    B{offset: u32},
    TB{offset: u32},
    BL{offset: u32},
    TBLLO{offset: u32},
    TBLHI{offset: u32},
    BX{reg: usize},
    // Transfer
    SWP{rn: usize, rd: usize, rm: usize},
    SWPB{rn: usize, rd: usize, rm: usize},
    LDR{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    /// Thumb PC-relative load
    TLDRPC{data_reg: usize, offset: u32},
    STR{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    LDRB{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    STRB{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    LDRH{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    STRH{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    LDRSB{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    LDRSH{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    LDM{transfer_params: TransferParams, reg_list: u32, load_from_user: bool},
    STM{transfer_params: TransferParams, reg_list: u32, load_from_user: bool},
    // ALU
    AND{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    EOR{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    SUB{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    RSB{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    ADD{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    /// Thumb PC-relative add
    TADDPC{rd: usize, op2: u32},
    ADC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    SBC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    RSC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    ORR{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    BIC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    TST{rn: usize, op2: ALUOperand},
    TEQ{rn: usize, op2: ALUOperand},
    CMP{rn: usize, op2: ALUOperand},
    CMN{rn: usize, op2: ALUOperand},
    MOV{rd: usize, op2: ALUOperand, set_flags: bool},
    MVN{rd: usize, op2: ALUOperand, set_flags: bool},
    // Multiply
    MUL{set_flags: bool, rd: usize, rs: usize, rm: usize},
    MLA{set_flags: bool, rd: usize, rn: usize, rs: usize, rm: usize},
    UMULL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    UMLAL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    SMULL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    SMLAL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    // Other
    MSR{spsr: bool, mask: u32, data: OpData},
    MRS{spsr: bool, rd: usize},
}

impl ARMv4InstructionType {
    pub fn category(&self) -> Category {
        use ARMv4InstructionType::*;
        match self {
            SWI{..} => Category::SoftwareInterrupt,
            COPROC{..} => Category::Coprocessor,
            B{..} | TB{..} | BL{..} | TBLLO{..} | TBLHI{..} | BX{..} => Category::Branch,
            SWP{..} | SWPB{..} => Category::Swap,
            LDR{..} | TLDRPC{..} | STR{..} | LDRB{..} | STRB{..} => Category::SingleTransfer,
            LDRH{..} | STRH{..} | LDRSB{..} | LDRSH{..} => Category::HalfwordTransfer,
            LDM{..} | STM{..} => Category::BlockTransfer,
            MUL{..} | MLA{..} => Category::Multiply,
            UMULL{..} | UMLAL{..} | SMULL{..} | SMLAL{..} => Category::MultiplyLong,
            MSR{..} | MRS{..} => Category::PsrTransfer,
            _ => Category::DataProcessing,
        }
    }
}
