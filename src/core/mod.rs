/// Core traits and types for ARM processors (data access).

pub mod decode;
pub mod execute;
pub mod instructions;
pub mod registers;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod armv4_test;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::{
    common::u32::{bit, bits},
    memory::Mem32
};

pub use execute::{execute, ARMv4, ExecContext, Executed};
pub use instructions::{ARMv4Instruction, ARMv4InstructionType, Category};
pub use registers::{Bank, RegisterFile};

pub mod constants {
    pub const SP_REG: usize = 13;
    pub const LINK_REG: usize = 14;
    pub const PC_REG: usize = 15;

    /// Wide instruction size.
    pub const I_SIZE: u32 = 4;
    /// Narrow (thumb) instruction size.
    pub const T_SIZE: u32 = 2;

    pub const SWI_VECTOR: u32 = 0x0000_0008;
    pub const IRQ_VECTOR: u32 = 0x0000_0018;

    /// Stack pointer value after reset.
    pub const RESET_SP: u32 = 0x0300_7F00;
}

/// Called on SWI instead of entering the exception handler.
///
/// Receives the comment field, the memory, and r0-r3.
/// Returns the new values of r0, r1 and r3.
pub type SwiHook<M> = fn(u32, &mut M, &[u32; 4]) -> [u32; 3];

bitflags! {
    #[derive(Default)]
    pub struct CPSR: u32 {
        const N = bit(31);
        const Z = bit(30);
        const C = bit(29);
        const V = bit(28);
        const I = bit(7);
        const F = bit(6);
        const T = bit(5);
        const MODE = bits(0, 4);

        const FLAGS = bits(28, 31);
    }
}

pub type SPSR = CPSR;

impl CPSR {
    pub fn carry(self) -> u32 {
        if self.contains(CPSR::C) {
            1
        } else {
            0
        }
    }

    /// The processor mode encoded in the mode bits, if valid.
    pub fn mode(self) -> Option<Mode> {
        Mode::from_bits((self & CPSR::MODE).bits())
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.remove(CPSR::MODE);
        self.insert(CPSR::from_bits_truncate(mode as u32));
    }

    /// Size of the instructions currently being executed.
    pub fn instr_size(self) -> u32 {
        if self.contains(CPSR::T) {
            constants::T_SIZE
        } else {
            constants::I_SIZE
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    USR = 0x10, // User
    FIQ = 0x11, // Fast Interrupt
    IRQ = 0x12, // Interrupt
    SVC = 0x13, // Supervisor
    ABT = 0x17, // Abort
    UND = 0x1B, // Undefined
    SYS = 0x1F, // System
}

/// User and System share one bank.
pub const NUM_BANKS: usize = 6;

impl Mode {
    pub fn from_bits(bits: u32) -> Option<Mode> {
        use Mode::*;
        match bits & 0x1F {
            0x10 => Some(USR),
            0x11 => Some(FIQ),
            0x12 => Some(IRQ),
            0x13 => Some(SVC),
            0x17 => Some(ABT),
            0x1B => Some(UND),
            0x1F => Some(SYS),
            _ => None,
        }
    }

    /// Index of the register bank this mode uses.
    pub const fn bank(self) -> usize {
        use Mode::*;
        match self {
            USR | SYS => 0,
            FIQ => 1,
            IRQ => 2,
            SVC => 3,
            ABT => 4,
            UND => 5,
        }
    }

    /// Privileged modes other than System have their own SPSR.
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Mode::USR | Mode::SYS)
    }
}

/// Condition field of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ARMCondition {
    EQ, // Z set
    NE, // Z clear
    CS, // C set
    CC, // C clear
    MI, // N set
    PL, // N clear
    VS, // V set
    VC, // V clear
    HI, // C set and Z clear
    LS, // C clear or Z set
    GE, // N == V
    LT, // N != V
    GT, // Z clear and N == V
    LE, // Z set or N != V
    AL, // Always
    NV, // Never
}

impl ARMCondition {
    pub fn from_bits(cond_bits: u32) -> ARMCondition {
        use ARMCondition::*;
        match cond_bits & 0xF {
            0x0 => EQ,
            0x1 => NE,
            0x2 => CS,
            0x3 => CC,
            0x4 => MI,
            0x5 => PL,
            0x6 => VS,
            0x7 => VC,
            0x8 => HI,
            0x9 => LS,
            0xA => GE,
            0xB => LT,
            0xC => GT,
            0xD => LE,
            0xE => AL,
            _ => NV,
        }
    }

    /// Check if the instruction should run based on the flags.
    pub fn eval(self, cpsr: CPSR) -> bool {
        use ARMCondition::*;
        let n = cpsr.contains(CPSR::N);
        let z = cpsr.contains(CPSR::Z);
        let c = cpsr.contains(CPSR::C);
        let v = cpsr.contains(CPSR::V);
        match self {
            EQ => z,
            NE => !z,
            CS => c,
            CC => !c,
            MI => n,
            PL => !n,
            VS => v,
            VC => !v,
            HI => c && !z,
            LS => !c || z,
            GE => n == v,
            LT => n != v,
            GT => !z && (n == v),
            LE => z || (n != v),
            AL => true,
            NV => false,
        }
    }
}

impl fmt::Display for ARMCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ARMCondition::*;
        match self {
            EQ => write!(f, "EQ"),
            NE => write!(f, "NE"),
            CS => write!(f, "CS"),
            CC => write!(f, "CC"),
            MI => write!(f, "MI"),
            PL => write!(f, "PL"),
            VS => write!(f, "VS"),
            VC => write!(f, "VC"),
            HI => write!(f, "HI"),
            LS => write!(f, "LS"),
            GE => write!(f, "GE"),
            LT => write!(f, "LT"),
            GT => write!(f, "GT"),
            LE => write!(f, "LE"),
            AL => write!(f, ""),
            NV => write!(f, "NV"),
        }
    }
}

/// Register and memory access used by instruction execution.
pub trait ARMCore<M: Mem32> {
    /// Read a register. The program counter reads ahead of the executing instruction.
    fn read_reg(&self, n: usize) -> u32;
    /// Write a register. Writing the program counter redirects execution.
    fn write_reg(&mut self, n: usize, data: u32);

    /// Access the user-mode registers regardless of current mode.
    fn read_usr_reg(&self, n: usize) -> u32;
    fn write_usr_reg(&mut self, n: usize, data: u32);

    fn read_cpsr(&self) -> CPSR;
    /// Write the CPSR, switching register banks if the mode changes.
    fn write_cpsr(&mut self, data: CPSR);
    /// Write the CPSR flags only.
    fn write_flags(&mut self, flags: CPSR);

    fn read_spsr(&self) -> SPSR;
    fn write_spsr(&mut self, data: SPSR);

    /// Restore CPSR from SPSR.
    fn return_from_exception(&mut self);
    /// Enter supervisor mode at the SWI vector.
    fn software_exception(&mut self);
    /// Returns true if the SWI was handled by the host.
    fn try_swi_hook(&mut self, comment: u32) -> bool;

    /// Address of the instruction being executed.
    fn current_pc(&self) -> u32;

    fn ref_mem(&mut self) -> &mut M;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canonical condition truth table, indexed by condition then NZCV.
    fn expected(cond: u32, nzcv: u32) -> bool {
        let n = nzcv & 8 != 0;
        let z = nzcv & 4 != 0;
        let c = nzcv & 2 != 0;
        let v = nzcv & 1 != 0;
        match cond {
            0x0 => z,
            0x1 => !z,
            0x2 => c,
            0x3 => !c,
            0x4 => n,
            0x5 => !n,
            0x6 => v,
            0x7 => !v,
            0x8 => c && !z,
            0x9 => !c || z,
            0xA => n == v,
            0xB => n != v,
            0xC => !z && n == v,
            0xD => z || n != v,
            0xE => true,
            _ => false,
        }
    }

    #[test]
    fn condition_truth_table() {
        for cond in 0..16 {
            for nzcv in 0..16 {
                let cpsr = CPSR::from_bits_truncate(nzcv << 28);
                assert_eq!(
                    ARMCondition::from_bits(cond).eval(cpsr),
                    expected(cond, nzcv),
                    "cond {:X} flags {:04b}", cond, nzcv
                );
            }
        }
    }

    #[test]
    fn mode_bits() {
        for bits in 0..0x20 {
            if let Some(mode) = Mode::from_bits(bits) {
                assert_eq!(mode as u32, bits);
            }
        }
        assert_eq!(Mode::from_bits(0x14), None);
        assert_eq!(Mode::USR.bank(), Mode::SYS.bank());
    }

    #[test]
    fn cpsr_mode() {
        let mut cpsr = CPSR::N | CPSR::T;
        cpsr.set_mode(Mode::IRQ);
        assert_eq!(cpsr.mode(), Some(Mode::IRQ));
        assert_eq!(cpsr.bits(), 0x8000_0032);
        assert_eq!(cpsr.instr_size(), constants::T_SIZE);
    }
}
