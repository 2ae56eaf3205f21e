/// Execution of ARMv4 and Thumb instructions.

use super::{
    constants::*,
    instructions::*,
    registers::RegisterFile,
    ARMCore, CPSR, SPSR, Mode, SwiHook
};
use crate::{
    common::{
        u32::*,
        u64
    },
    error::CoreError,
    memory::{Mem32, MemWidth}
};

/// Outcome of executing a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Executed {
    pub cycles: usize,
    /// The program counter was written, so it must not be advanced.
    pub branched: bool,
}

/// Execute a decoded instruction at the address held in the program counter.
///
/// The program counter is left pointing at the executed instruction unless it branched.
pub fn execute<M: Mem32>(instr: ARMv4Instruction, regs: &mut RegisterFile, mem: &mut M) -> Result<Executed, CoreError> {
    ExecContext::new(regs, mem).execute(instr)
}

/// Registers and memory borrowed for the execution of one instruction.
pub struct ExecContext<'a, M: Mem32> {
    regs:       &'a mut RegisterFile,
    mem:        &'a mut M,
    swi_hook:   Option<SwiHook<M>>,

    /// Address of the executing instruction.
    pc:         u32,
    /// Size of the executing instruction.
    size:       u32,
    branched:   bool,
}

impl<'a, M: Mem32> ExecContext<'a, M> {
    pub fn new(regs: &'a mut RegisterFile, mem: &'a mut M) -> Self {
        let pc = regs.pc();
        let size = regs.read_status().instr_size();
        Self {
            regs,
            mem,
            swi_hook: None,
            pc,
            size,
            branched: false,
        }
    }

    pub fn with_swi_hook(mut self, swi_hook: Option<SwiHook<M>>) -> Self {
        self.swi_hook = swi_hook;
        self
    }

    pub fn execute(&mut self, instr: ARMv4Instruction) -> Result<Executed, CoreError> {
        let cycles = if instr.cond.eval(self.regs.read_status()) {
            self.execute_instruction(instr.instr)?
        } else {
            1
        };
        Ok(Executed {
            cycles,
            branched: self.branched,
        })
    }
}

impl<'a, M: Mem32> ARMCore<M> for ExecContext<'a, M> {
    fn read_reg(&self, n: usize) -> u32 {
        if n == PC_REG {
            self.pc.wrapping_add(self.size * 2)
        } else {
            self.regs.read(n)
        }
    }
    fn write_reg(&mut self, n: usize, data: u32) {
        if n == PC_REG {
            let align = if self.regs.is_thumb() {!1} else {!3};
            self.regs.set_pc(data & align);
            self.branched = true;
        } else {
            self.regs.write(n, data);
        }
    }

    fn read_usr_reg(&self, n: usize) -> u32 {
        if n == PC_REG {
            self.read_reg(n)
        } else {
            self.regs.read_usr(n)
        }
    }
    fn write_usr_reg(&mut self, n: usize, data: u32) {
        if n == PC_REG {
            self.write_reg(n, data);
        } else {
            self.regs.write_usr(n, data);
        }
    }

    fn read_cpsr(&self) -> CPSR {
        self.regs.read_status()
    }
    fn write_cpsr(&mut self, data: CPSR) {
        self.regs.write_status(data);
    }
    fn write_flags(&mut self, flags: CPSR) {
        self.regs.set_flags(CPSR::all(), flags);
    }

    fn read_spsr(&self) -> SPSR {
        self.regs.read_spsr()
    }
    fn write_spsr(&mut self, data: SPSR) {
        self.regs.write_spsr(data);
    }

    fn return_from_exception(&mut self) {
        let spsr = self.regs.read_spsr();
        self.regs.write_status(spsr);
    }

    fn software_exception(&mut self) {
        let cpsr = self.regs.read_status();
        let return_addr = self.pc.wrapping_add(self.size);
        self.regs.switch_mode(Mode::SVC);
        self.regs.write_spsr(cpsr);
        self.regs.write(LINK_REG, return_addr);
        self.regs.set_flags(CPSR::I | CPSR::T, CPSR::I);
        self.write_reg(PC_REG, SWI_VECTOR);
    }

    fn try_swi_hook(&mut self, comment: u32) -> bool {
        if let Some(hook) = self.swi_hook {
            let args = [self.regs.read(0), self.regs.read(1), self.regs.read(2), self.regs.read(3)];
            let ret = hook(comment, self.mem, &args);
            self.regs.write(0, ret[0]);
            self.regs.write(1, ret[1]);
            self.regs.write(3, ret[2]);
            true
        } else {
            false
        }
    }

    fn current_pc(&self) -> u32 {
        self.pc
    }

    fn ref_mem(&mut self) -> &mut M {
        self.mem
    }
}

impl<'a, M: Mem32> ARMv4<M> for ExecContext<'a, M> {}

/// Execution of ARMv4 instructions.
///
/// All methods return the number of cycles taken.
pub trait ARMv4<M: Mem32>: ARMCore<M> {

    /// Run an instruction that has passed its condition check.
    fn execute_instruction(&mut self, instr: ARMv4InstructionType) -> Result<usize, CoreError> {
        use ARMv4InstructionType::*;
        Ok(match instr {
            SWI{comment} => self.swi(comment),
            COPROC{..} => return Err(self.not_implemented()),

            B{offset} => self.b(offset),
            TB{offset} => self.b(offset),
            BL{offset} => self.bl(offset),
            TBLLO{offset} => self.tbl_lo(offset),
            TBLHI{offset} => self.tbl_hi(offset),
            BX{reg} => self.bx(reg),

            SWP{rn, rd, rm} => self.swp(rn, rd, rm),
            SWPB{rn, rd, rm} => self.swpb(rn, rd, rm),
            LDR{transfer_params, data_reg, offset} => self.ldr(transfer_params, data_reg, offset),
            TLDRPC{data_reg, offset} => self.tldrpc(data_reg, offset),
            STR{transfer_params, data_reg, offset} => self.str(transfer_params, data_reg, offset),
            LDRB{transfer_params, data_reg, offset} => self.ldrb(transfer_params, data_reg, offset),
            STRB{transfer_params, data_reg, offset} => self.strb(transfer_params, data_reg, offset),
            LDRH{transfer_params, data_reg, offset} => self.ldrh(transfer_params, data_reg, offset),
            STRH{transfer_params, data_reg, offset} => self.strh(transfer_params, data_reg, offset),
            LDRSB{transfer_params, data_reg, offset} => self.ldrsb(transfer_params, data_reg, offset),
            LDRSH{transfer_params, data_reg, offset} => self.ldrsh(transfer_params, data_reg, offset),
            LDM{transfer_params, reg_list, load_from_user} => self.ldm(transfer_params, reg_list, load_from_user),
            STM{transfer_params, reg_list, load_from_user} => self.stm(transfer_params, reg_list, load_from_user),

            AND{rd, rn, op2, set_flags} => self.and(set_flags, rd, rn, op2),
            EOR{rd, rn, op2, set_flags} => self.eor(set_flags, rd, rn, op2),
            ORR{rd, rn, op2, set_flags} => self.orr(set_flags, rd, rn, op2),
            BIC{rd, rn, op2, set_flags} => self.bic(set_flags, rd, rn, op2),
            ADD{rd, rn, op2, set_flags} => self.add(set_flags, rd, rn, op2),
            TADDPC{rd, op2} => self.taddpc(rd, op2),
            SUB{rd, rn, op2, set_flags} => self.sub(set_flags, rd, rn, op2),
            RSB{rd, rn, op2, set_flags} => self.rsb(set_flags, rd, rn, op2),
            ADC{rd, rn, op2, set_flags} => self.adc(set_flags, rd, rn, op2),
            SBC{rd, rn, op2, set_flags} => self.sbc(set_flags, rd, rn, op2),
            RSC{rd, rn, op2, set_flags} => self.rsc(set_flags, rd, rn, op2),
            TST{rn, op2} => self.tst(rn, op2),
            TEQ{rn, op2} => self.teq(rn, op2),
            CMP{rn, op2} => self.cmp(rn, op2),
            CMN{rn, op2} => self.cmn(rn, op2),
            MOV{rd, op2, set_flags} => self.mov(set_flags, rd, op2),
            MVN{rd, op2, set_flags} => self.mvn(set_flags, rd, op2),

            MUL{set_flags, rd, rs, rm} => self.mul(set_flags, rd, rs, rm),
            MLA{set_flags, rd, rn, rs, rm} => self.mla(set_flags, rd, rn, rs, rm),
            UMULL{set_flags, rd_hi, rd_lo, rs, rm} => self.umull(set_flags, rd_hi, rd_lo, rs, rm),
            UMLAL{set_flags, rd_hi, rd_lo, rs, rm} => self.umlal(set_flags, rd_hi, rd_lo, rs, rm),
            SMULL{set_flags, rd_hi, rd_lo, rs, rm} => self.smull(set_flags, rd_hi, rd_lo, rs, rm),
            SMLAL{set_flags, rd_hi, rd_lo, rs, rm} => self.smlal(set_flags, rd_hi, rd_lo, rs, rm),

            MSR{spsr, mask, data} => self.msr(spsr, mask, data),
            MRS{spsr, rd} => self.mrs(spsr, rd),
        })
    }

    /// SWI
    /// Software interrupt
    fn swi(&mut self, comment: u32) -> usize {
        if !self.try_swi_hook(comment) {
            self.software_exception();
        }
        3
    }

    /// Called when an instruction with no implementation is encountered.
    fn not_implemented(&mut self) -> CoreError {
        let addr = self.current_pc();
        let word = if self.read_cpsr().contains(CPSR::T) {
            self.ref_mem().load_halfword(addr) as u32
        } else {
            self.ref_mem().load_word(addr)
        };
        CoreError::NotImplemented { addr, word }
    }

    // Shifts
    // Each returns the result and the carry out.

    /// LSL
    /// Logical shift left (fill with zeroes)
    fn lsl(&self, val: u32, shift_amount: u32) -> (u32, bool) {
        match shift_amount {
            0 => (val, self.read_cpsr().contains(CPSR::C)),
            1..=31 => (val << shift_amount, test_bit(val, (32 - shift_amount) as usize)),
            32 => (0, test_bit(val, 0)),
            _ => (0, false),
        }
    }

    /// LSR
    /// Logical shift right (fill with zeroes)
    fn lsr(&self, val: u32, shift_amount: u32) -> (u32, bool) {
        match shift_amount {
            0 => (val, self.read_cpsr().contains(CPSR::C)),
            1..=31 => (val >> shift_amount, test_bit(val, (shift_amount - 1) as usize)),
            32 => (0, test_bit(val, 31)),
            _ => (0, false),
        }
    }

    /// ASR
    /// Arithmetic shift right (sign-extend)
    fn asr(&self, val: u32, shift_amount: u32) -> (u32, bool) {
        match shift_amount {
            0 => (val, self.read_cpsr().contains(CPSR::C)),
            1..=31 => (((val as i32) >> shift_amount) as u32, test_bit(val, (shift_amount - 1) as usize)),
            _ => (((val as i32) >> 31) as u32, test_bit(val, 31)),
        }
    }

    /// ROR
    /// Rotate right
    fn ror(&self, val: u32, shift_amount: u32) -> (u32, bool) {
        if shift_amount == 0 {
            (val, self.read_cpsr().contains(CPSR::C))
        } else {
            let result = val.rotate_right(shift_amount & 0x1F);
            (result, test_bit(result, 31))
        }
    }

    /// RRX
    /// Rotate right by one, through the carry.
    fn rrx(&self, val: u32) -> (u32, bool) {
        let carry = self.read_cpsr().carry() << 31;
        ((val >> 1) | carry, test_bit(val, 0))
    }

    // Logic

    /// Write the result of a logical operation.
    /// Sets N and Z from the result, C from the shifter.
    fn write_logical(&mut self, s: bool, rd: usize, result: u32, carry: bool) {
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, test_bit(result, 31));
        cpsr.set(CPSR::Z, result == 0);
        cpsr.set(CPSR::C, carry);
        self.writeback(s, rd, result, cpsr);
    }

    /// Write the result of an arithmetic operation.
    fn write_arithmetic(&mut self, s: bool, rd: usize, result: u32, carry: bool, overflow: bool) {
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, test_bit(result, 31));
        cpsr.set(CPSR::Z, result == 0);
        cpsr.set(CPSR::C, carry);
        cpsr.set(CPSR::V, overflow);
        self.writeback(s, rd, result, cpsr);
    }

    /// Writeback a data processing instruction.
    ///
    /// Writing the PC with S set returns from an exception instead of setting flags.
    fn writeback(&mut self, s: bool, rd: usize, result: u32, flags: CPSR) {
        if rd == PC_REG {
            if s {
                self.return_from_exception();
            }
            self.write_reg(rd, result);
        } else {
            self.write_reg(rd, result);
            if s {
                self.write_flags(flags);
            }
        }
    }

    /// Cycles for a data processing instruction.
    fn alu_cycles(&self, rd: usize, shift_cycles: usize) -> usize {
        1 + shift_cycles + if rd == PC_REG {2} else {0}
    }

    /// AND
    /// Bitwise AND
    fn and(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, carry, cycles) = self.eval_alu_op(op2);
        let result = self.read_reg(rn) & op2;
        self.write_logical(s, rd, result, carry);
        self.alu_cycles(rd, cycles)
    }

    /// EOR
    /// Bitwise exclusive OR (xor)
    fn eor(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, carry, cycles) = self.eval_alu_op(op2);
        let result = self.read_reg(rn) ^ op2;
        self.write_logical(s, rd, result, carry);
        self.alu_cycles(rd, cycles)
    }

    /// ORR
    /// Bitwise inclusive OR
    fn orr(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, carry, cycles) = self.eval_alu_op(op2);
        let result = self.read_reg(rn) | op2;
        self.write_logical(s, rd, result, carry);
        self.alu_cycles(rd, cycles)
    }

    /// BIC
    /// NOT op2 with AND
    fn bic(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, carry, cycles) = self.eval_alu_op(op2);
        let result = self.read_reg(rn) & !op2;
        self.write_logical(s, rd, result, carry);
        self.alu_cycles(rd, cycles)
    }

    /// MOV
    /// Move op2 into rd.
    fn mov(&mut self, s: bool, rd: usize, op2: ALUOperand) -> usize {
        let (result, carry, cycles) = self.eval_alu_op(op2);
        self.write_logical(s, rd, result, carry);
        self.alu_cycles(rd, cycles)
    }

    /// MVN
    /// Move NOT op2 into rd.
    fn mvn(&mut self, s: bool, rd: usize, op2: ALUOperand) -> usize {
        let (data, carry, cycles) = self.eval_alu_op(op2);
        self.write_logical(s, rd, !data, carry);
        self.alu_cycles(rd, cycles)
    }

    // Comparisons
    // These always set flags.

    /// TST
    /// Bitwise AND and set flags.
    fn tst(&mut self, rn: usize, op2: ALUOperand) -> usize {
        let (op2, carry, cycles) = self.eval_alu_op(op2);
        let result = self.read_reg(rn) & op2;
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, test_bit(result, 31));
        cpsr.set(CPSR::Z, result == 0);
        cpsr.set(CPSR::C, carry);
        self.write_flags(cpsr);
        1 + cycles
    }

    /// TEQ
    /// Bitwise XOR and set flags.
    fn teq(&mut self, rn: usize, op2: ALUOperand) -> usize {
        let (op2, carry, cycles) = self.eval_alu_op(op2);
        let result = self.read_reg(rn) ^ op2;
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, test_bit(result, 31));
        cpsr.set(CPSR::Z, result == 0);
        cpsr.set(CPSR::C, carry);
        self.write_flags(cpsr);
        1 + cycles
    }

    /// CMP
    /// Arithmetic sub and set flags.
    fn cmp(&mut self, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        let (result, borrow) = op1.overflowing_sub(op2);
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, test_bit(result, 31));
        cpsr.set(CPSR::Z, result == 0);
        cpsr.set(CPSR::C, !borrow);
        cpsr.set(CPSR::V, sub_overflow(op1, op2, result));
        self.write_flags(cpsr);
        1 + cycles
    }

    /// CMN
    /// Arithmetic add and set flags.
    fn cmn(&mut self, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        let (result, carry) = op1.overflowing_add(op2);
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, test_bit(result, 31));
        cpsr.set(CPSR::Z, result == 0);
        cpsr.set(CPSR::C, carry);
        cpsr.set(CPSR::V, add_overflow(op1, op2, result));
        self.write_flags(cpsr);
        1 + cycles
    }

    // Arithmetic

    /// ADD
    /// Arithmetic add without carry.
    fn add(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        let (result, carry) = op1.overflowing_add(op2);
        self.write_arithmetic(s, rd, result, carry, add_overflow(op1, op2, result));
        self.alu_cycles(rd, cycles)
    }

    /// ADD Rd,PC,#
    /// Arithmetic add constant to word-aligned PC. (thumb)
    fn taddpc(&mut self, rd: usize, op2: u32) -> usize {
        let op1 = self.read_reg(PC_REG) & 0xFFFF_FFFC;
        self.write_reg(rd, op1.wrapping_add(op2));
        1
    }

    /// SUB
    /// Arithmetic subtract without carry.
    fn sub(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        let (result, borrow) = op1.overflowing_sub(op2);
        self.write_arithmetic(s, rd, result, !borrow, sub_overflow(op1, op2, result));
        self.alu_cycles(rd, cycles)
    }

    /// RSB
    /// Reverse subtract without carry.
    fn rsb(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        let (result, borrow) = op2.overflowing_sub(op1);
        self.write_arithmetic(s, rd, result, !borrow, sub_overflow(op2, op1, result));
        self.alu_cycles(rd, cycles)
    }

    /// ADC
    /// Arithmetic add with carry.
    fn adc(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        self.arithmetic_carry(s, rd, op1, op2);
        self.alu_cycles(rd, cycles)
    }

    /// SBC
    /// Arithmetic subtract with borrow.
    fn sbc(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        self.arithmetic_carry(s, rd, op1, !op2);
        self.alu_cycles(rd, cycles)
    }

    /// RSC
    /// Reverse subtract with borrow.
    fn rsc(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> usize {
        let (op2, _, cycles) = self.eval_alu_op(op2);
        let op1 = self.read_reg(rn);
        self.arithmetic_carry(s, rd, op2, !op1);
        self.alu_cycles(rd, cycles)
    }

    /// Do an arithmetic add / subtract with carry / borrow.
    /// Bitwise invert op2 to do subtract.
    fn arithmetic_carry(&mut self, s: bool, rd: usize, op1: u32, op2: u32) {
        let (r1, o1) = op1.overflowing_add(op2);
        let (result, o2) = r1.overflowing_add(self.read_cpsr().carry());
        self.write_arithmetic(s, rd, result, o1 || o2, add_overflow(op1, op2, result));
    }

    // Multiplication
    // C and V are left as they are.

    /// Set N and Z after a multiply.
    fn write_mul_flags(&mut self, negative: bool, zero: bool) {
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, negative);
        cpsr.set(CPSR::Z, zero);
        self.write_flags(cpsr);
    }

    /// MUL
    /// Multiply
    fn mul(&mut self, s: bool, rd: usize, rs: usize, rm: usize) -> usize {
        let result = self.read_reg(rm).wrapping_mul(self.read_reg(rs));
        self.write_reg(rd, result);
        if s {
            self.write_mul_flags(test_bit(result, 31), result == 0);
        }
        3
    }

    /// MLA
    /// Multiply and accumulate
    fn mla(&mut self, s: bool, rd: usize, rn: usize, rs: usize, rm: usize) -> usize {
        let mul_result = self.read_reg(rm).wrapping_mul(self.read_reg(rs));
        let result = mul_result.wrapping_add(self.read_reg(rn));
        self.write_reg(rd, result);
        if s {
            self.write_mul_flags(test_bit(result, 31), result == 0);
        }
        4
    }

    /// Write a 64-bit multiply result.
    fn write_long(&mut self, s: bool, rd_hi: usize, rd_lo: usize, result: u64) {
        self.write_reg(rd_lo, u64::lo(result));
        self.write_reg(rd_hi, u64::hi(result));
        if s {
            self.write_mul_flags(u64::test_bit(result, 63), result == 0);
        }
    }

    /// UMULL
    /// Unsigned long multiply
    fn umull(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> usize {
        let result = (self.read_reg(rm) as u64).wrapping_mul(self.read_reg(rs) as u64);
        self.write_long(s, rd_hi, rd_lo, result);
        4
    }

    /// UMLAL
    /// Unsigned long multiply and accumulate
    fn umlal(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> usize {
        let mul_result = (self.read_reg(rm) as u64).wrapping_mul(self.read_reg(rs) as u64);
        let acc_op = u64::make(self.read_reg(rd_hi), self.read_reg(rd_lo));
        self.write_long(s, rd_hi, rd_lo, mul_result.wrapping_add(acc_op));
        5
    }

    /// SMULL
    /// Signed long multiply
    fn smull(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> usize {
        let op1 = (self.read_reg(rm) as i32) as i64;
        let op2 = (self.read_reg(rs) as i32) as i64;
        self.write_long(s, rd_hi, rd_lo, op1.wrapping_mul(op2) as u64);
        4
    }

    /// SMLAL
    /// Signed long multiply and accumulate
    fn smlal(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> usize {
        let op1 = (self.read_reg(rm) as i32) as i64;
        let op2 = (self.read_reg(rs) as i32) as i64;
        let mul_result = op1.wrapping_mul(op2) as u64;
        let acc_op = u64::make(self.read_reg(rd_hi), self.read_reg(rd_lo));
        self.write_long(s, rd_hi, rd_lo, mul_result.wrapping_add(acc_op));
        5
    }

    // Branch

    /// B
    /// Branch, relative to the pipeline-adjusted PC.
    fn b(&mut self, offset: u32) -> usize {
        let dest = self.read_reg(PC_REG).wrapping_add(offset);
        self.write_reg(PC_REG, dest);
        3
    }

    /// BL
    /// Branch and link (using r14)
    fn bl(&mut self, offset: u32) -> usize {
        let current_pc = self.current_pc();
        self.write_reg(LINK_REG, current_pc.wrapping_sub(I_SIZE));
        self.b(offset)
    }

    /// BX
    /// Branch and exchange - switch instruction width based on bit 0 of the target.
    fn bx(&mut self, reg: usize) -> usize {
        let reg_val = self.read_reg(reg);
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::T, test_bit(reg_val, 0));
        self.write_flags(cpsr);
        self.write_reg(PC_REG, reg_val);
        3
    }

    /// Thumb BL (first halfword)
    /// Stores the high part of the target in LR.
    fn tbl_lo(&mut self, offset: u32) -> usize {
        let target_addr = self.read_reg(PC_REG).wrapping_add(offset);
        self.write_reg(LINK_REG, target_addr);
        1
    }

    /// Thumb BL (second halfword)
    /// Branch and link. The return address has bit 0 set.
    fn tbl_hi(&mut self, offset: u32) -> usize {
        let return_addr = self.current_pc().wrapping_add(T_SIZE);
        let dest = self.read_reg(LINK_REG).wrapping_add(offset);
        self.write_reg(LINK_REG, return_addr | 1);
        self.write_reg(PC_REG, dest);
        3
    }

    // PSR transfer

    /// MRS
    /// Move program status register into general purpose register
    fn mrs(&mut self, spsr: bool, rd: usize) -> usize {
        if spsr {
            self.write_reg(rd, self.read_spsr().bits());
        } else {
            self.write_reg(rd, self.read_cpsr().bits());
        }
        1
    }

    /// MSR
    /// Move general purpose register into program status register
    ///
    /// User mode can only write the flags. The T bit is never written.
    fn msr(&mut self, spsr: bool, mask: u32, op: OpData) -> usize {
        let data = self.eval_op_data(op);
        if spsr {
            let old_spsr = self.read_spsr().bits() & !mask;
            let new_spsr = CPSR::from_bits_truncate((data & mask) | old_spsr);
            self.write_spsr(new_spsr);
        } else {
            let cpsr = self.read_cpsr();
            let mut mask = mask & !CPSR::T.bits();
            if cpsr.mode() == Some(Mode::USR) {
                mask &= CPSR::FLAGS.bits();
            }
            let new_cpsr = CPSR::from_bits_truncate((data & mask) | (cpsr.bits() & !mask));
            self.write_cpsr(new_cpsr);
        }
        1
    }

    // Data transfer

    /// SWP
    /// Single data swap (word).
    fn swp(&mut self, rn: usize, rd: usize, rm: usize) -> usize {
        let addr = self.read_reg(rn);
        let reg_data = self.read_reg(rm);
        let mem_data = self.load_word_rotated(addr);
        self.ref_mem().store_word(addr, reg_data);
        self.write_reg(rd, mem_data);
        4
    }

    /// SWPB
    /// Single data swap (byte).
    fn swpb(&mut self, rn: usize, rd: usize, rm: usize) -> usize {
        let addr = self.read_reg(rn);
        let reg_data = self.read_reg(rm);
        let mem_data = self.ref_mem().load_byte(addr);
        self.ref_mem().store_byte(addr, reg_data as u8);
        self.write_reg(rd, mem_data as u32);
        4
    }

    /// Load a word. Misaligned addresses rotate the aligned word.
    fn load_word_rotated(&mut self, addr: u32) -> u32 {
        let data = self.ref_mem().load_word(addr & !3);
        data.rotate_right((addr & 3) * 8)
    }

    /// Returns the address to transfer at, and the address to write back.
    fn transfer_address(&self, transfer_params: &TransferParams, offset: u32) -> (u32, u32) {
        let base_addr = self.read_reg(transfer_params.base_reg);
        let offset_addr = if transfer_params.inc {
            base_addr.wrapping_add(offset)  // Inc
        } else {
            base_addr.wrapping_sub(offset)  // Dec
        };
        if transfer_params.pre_index {
            (offset_addr, offset_addr)  // Pre
        } else {
            (base_addr, offset_addr)    // Post
        }
    }

    /// Post-indexed transfers always write back.
    fn transfer_writeback(&mut self, transfer_params: &TransferParams, offset_addr: u32) {
        if !transfer_params.pre_index || transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, offset_addr);
        }
    }

    /// Load a value and write it into a register.
    /// The loaded value wins over the base writeback.
    fn load(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: u32, width: MemWidth, signed: bool) -> usize {
        let (transfer_addr, offset_addr) = self.transfer_address(&transfer_params, offset);
        let data = match (width, signed) {
            (MemWidth::Word, _) => self.load_word_rotated(transfer_addr),
            (MemWidth::Byte, false) => self.ref_mem().load_byte(transfer_addr) as u32,
            (MemWidth::Byte, true) => (self.ref_mem().load_byte(transfer_addr) as i8) as u32,
            (MemWidth::Halfword, false) => (self.ref_mem().load_halfword(transfer_addr) as u32).rotate_right((transfer_addr & 1) * 8),
            // A misaligned signed halfword loads the byte instead.
            (MemWidth::Halfword, true) if test_bit(transfer_addr, 0) => (self.ref_mem().load_byte(transfer_addr) as i8) as u32,
            (MemWidth::Halfword, true) => (self.ref_mem().load_halfword(transfer_addr) as i16) as u32,
        };
        self.transfer_writeback(&transfer_params, offset_addr);
        self.write_reg(dest_reg, data);

        let pc_cycles = if dest_reg == PC_REG {2} else {0};
        2 + width.cycles() + pc_cycles
    }

    /// Store a register. Storing the PC stores the address of the instruction + 12.
    fn store(&mut self, transfer_params: TransferParams, src_reg: usize, offset: u32, width: MemWidth) -> usize {
        let data = if src_reg == PC_REG {
            self.read_reg(src_reg).wrapping_add(4)
        } else {
            self.read_reg(src_reg)
        };
        let (transfer_addr, offset_addr) = self.transfer_address(&transfer_params, offset);
        let aligned = match width {
            MemWidth::Word => transfer_addr & !3,
            MemWidth::Halfword => transfer_addr & !1,
            MemWidth::Byte => transfer_addr,
        };
        self.ref_mem().write(aligned, width, data);
        self.transfer_writeback(&transfer_params, offset_addr);
        1 + width.cycles()
    }

    /// LDR
    /// Load a single word from memory and store it in a register.
    fn ldr(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: ShiftOperand) -> usize {
        let (offset, _) = self.eval_shift_op(offset);
        self.load(transfer_params, dest_reg, offset, MemWidth::Word, false)
    }

    /// Thumb LDR PC-relative
    fn tldrpc(&mut self, dest_reg: usize, offset: u32) -> usize {
        let base_addr = self.read_reg(PC_REG) & 0xFFFF_FFFC;
        let data = self.ref_mem().load_word(base_addr.wrapping_add(offset));
        self.write_reg(dest_reg, data);
        2 + MemWidth::Word.cycles()
    }

    /// LDRB
    /// Load a single byte from memory and store it in a register.
    fn ldrb(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: ShiftOperand) -> usize {
        let (offset, _) = self.eval_shift_op(offset);
        self.load(transfer_params, dest_reg, offset, MemWidth::Byte, false)
    }

    /// STR
    /// Store a single word into memory.
    fn str(&mut self, transfer_params: TransferParams, src_reg: usize, offset: ShiftOperand) -> usize {
        let (offset, _) = self.eval_shift_op(offset);
        self.store(transfer_params, src_reg, offset, MemWidth::Word)
    }

    /// STRB
    /// Store a single byte into memory.
    fn strb(&mut self, transfer_params: TransferParams, src_reg: usize, offset: ShiftOperand) -> usize {
        let (offset, _) = self.eval_shift_op(offset);
        self.store(transfer_params, src_reg, offset, MemWidth::Byte)
    }

    /// LDRH
    /// Load 2 bytes from memory.
    fn ldrh(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: OpData) -> usize {
        let offset = self.eval_op_data(offset);
        self.load(transfer_params, dest_reg, offset, MemWidth::Halfword, false)
    }

    /// LDRSB
    /// Load byte from memory, and sign-extend.
    fn ldrsb(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: OpData) -> usize {
        let offset = self.eval_op_data(offset);
        self.load(transfer_params, dest_reg, offset, MemWidth::Byte, true)
    }

    /// LDRSH
    /// Load halfword from memory, and sign-extend.
    fn ldrsh(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: OpData) -> usize {
        let offset = self.eval_op_data(offset);
        self.load(transfer_params, dest_reg, offset, MemWidth::Halfword, true)
    }

    /// STRH
    /// Store 2 bytes into memory.
    fn strh(&mut self, transfer_params: TransferParams, src_reg: usize, offset: OpData) -> usize {
        let offset = self.eval_op_data(offset);
        self.store(transfer_params, src_reg, offset, MemWidth::Halfword)
    }

    /// Lowest address of a block transfer, and the address to write back.
    fn block_address(&self, transfer_params: &TransferParams, reg_list: u32) -> (u32, u32) {
        let base_addr = self.read_reg(transfer_params.base_reg);
        let offset = reg_list.count_ones() * 4;
        match (transfer_params.inc, transfer_params.pre_index) {
            (true, false) => (base_addr, base_addr.wrapping_add(offset)),
            (true, true) => (base_addr.wrapping_add(4), base_addr.wrapping_add(offset)),
            (false, false) => (base_addr.wrapping_sub(offset).wrapping_add(4), base_addr.wrapping_sub(offset)),
            (false, true) => (base_addr.wrapping_sub(offset), base_addr.wrapping_sub(offset)),
        }
    }

    /// LDM
    /// Block load from memory into registers.
    /// Registers are loaded low-high from the lowest address up.
    ///
    /// If s == true, then the processor will return from exception if PC is loaded,
    /// or it will transfer into user registers.
    fn ldm(&mut self, transfer_params: TransferParams, reg_list: u32, s: bool) -> usize {
        let load_pc = test_bit(reg_list, PC_REG);
        let load_from_user = s && !load_pc;

        let (mut transfer_addr, writeback_addr) = self.block_address(&transfer_params, reg_list);
        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, writeback_addr);
        }

        for reg in (0..16).filter(|reg| test_bit(reg_list, *reg)) {
            let data = self.ref_mem().load_word(transfer_addr & !3);
            if reg == PC_REG && s {
                self.return_from_exception();
            }
            if load_from_user {
                self.write_usr_reg(reg, data);
            } else {
                self.write_reg(reg, data);
            }
            transfer_addr = transfer_addr.wrapping_add(4);
        }

        let pc_cycles = if load_pc {2} else {0};
        reg_list.count_ones() as usize + 2 + pc_cycles
    }

    /// STM
    /// Block store from registers into memory.
    /// Registers are stored low-high from the lowest address up.
    ///
    /// If s == true, then the processor will transfer from user registers.
    fn stm(&mut self, transfer_params: TransferParams, reg_list: u32, s: bool) -> usize {
        let (mut transfer_addr, writeback_addr) = self.block_address(&transfer_params, reg_list);

        for reg in (0..16).filter(|reg| test_bit(reg_list, *reg)) {
            let data = match reg {
                PC_REG => self.read_reg(PC_REG).wrapping_add(4),
                _ if s => self.read_usr_reg(reg),
                _ => self.read_reg(reg),
            };
            self.ref_mem().store_word(transfer_addr & !3, data);
            transfer_addr = transfer_addr.wrapping_add(4);
        }

        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, writeback_addr);
        }
        reg_list.count_ones() as usize + 1
    }

    // Helpers

    /// Evaluate the second operand of the ALU.
    ///
    /// Returns the value, the shifter carry out, and how many extra cycles it took to eval.
    fn eval_alu_op(&mut self, op: ALUOperand) -> (u32, bool, usize) {
        use ALUOperand::*;
        use RegShiftOperand::*;
        match op {
            Normal(n) => {
                let (val, carry) = self.eval_shift_op(n);
                (val, carry, 0)
            },
            RegShift{op, shift_reg, reg} => {
                // The PC is one instruction further ahead when shifting by register.
                let val = if reg == PC_REG {
                    self.read_reg(reg).wrapping_add(4)
                } else {
                    self.read_reg(reg)
                };
                let shift_amount = self.read_reg(shift_reg) & 0xFF;
                let (result, carry) = match op {
                    LSL => self.lsl(val, shift_amount),
                    LSR => self.lsr(val, shift_amount),
                    ASR => self.asr(val, shift_amount),
                    ROR => self.ror(val, shift_amount),
                };
                (result, carry, 1)
            }
        }
    }

    /// Evaluate the operand.
    ///
    /// Returns the value and the shifter carry out.
    fn eval_shift_op(&mut self, op: ShiftOperand) -> (u32, bool) {
        use ShiftOperand::*;
        match op {
            Immediate(i) => (i, self.read_cpsr().contains(CPSR::C)),
            RotatedImmediate(i) => (i, test_bit(i, 31)),
            Register(reg) => (self.read_reg(reg), self.read_cpsr().contains(CPSR::C)),
            LSL{shift_amount, reg} => self.lsl(self.read_reg(reg), shift_amount),
            LSR{shift_amount, reg} => self.lsr(self.read_reg(reg), shift_amount),
            ASR{shift_amount, reg} => self.asr(self.read_reg(reg), shift_amount),
            ROR{shift_amount, reg} => self.ror(self.read_reg(reg), shift_amount),
            LSR32{reg} => self.lsr(self.read_reg(reg), 32),
            ASR32{reg} => self.asr(self.read_reg(reg), 32),
            RRX{reg} => self.rrx(self.read_reg(reg)),
        }
    }

    /// Evaluate the operand.
    fn eval_op_data(&mut self, op: OpData) -> u32 {
        use OpData::*;
        match op {
            Immediate(i) => i,
            Register(reg) => self.read_reg(reg),
        }
    }
}

/// Signed overflow of op1 + op2.
const fn add_overflow(op1: u32, op2: u32, result: u32) -> bool {
    test_bit(!(op1 ^ op2) & (op1 ^ result), 31)
}

/// Signed overflow of op1 - op2.
const fn sub_overflow(op1: u32, op2: u32, result: u32) -> bool {
    test_bit((op1 ^ op2) & (op1 ^ result), 31)
}
