/// Register file with per-mode banking.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{constants::*, Mode, CPSR, NUM_BANKS, SPSR};

/// Registers stored away while their mode is inactive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Only used by the FIQ bank, and by the user bank while FIQ is active.
    pub r8_12: [u32; 5],
    pub r13: u32,
    pub r14: u32,
    pub spsr: u32,
}

/// The 16 visible registers plus the status registers.
///
/// The visible registers always belong to the current mode.
/// The registers of all other modes live in `banks` and are copied in and out on a mode switch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u32; 16],
    cpsr: CPSR,
    mode: Mode,
    banks: [Bank; NUM_BANKS],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        let mut regs = Self {
            regs: [0; 16],
            cpsr: CPSR::default(),
            mode: Mode::SYS,
            banks: [Bank::default(); NUM_BANKS],
        };
        regs.reset();
        regs
    }

    /// System mode, all registers cleared, except the stack pointer.
    pub fn reset(&mut self) {
        self.regs = [0; 16];
        self.banks = [Bank::default(); NUM_BANKS];
        self.cpsr = CPSR::default();
        self.cpsr.set_mode(Mode::SYS);
        self.mode = Mode::SYS;
        self.regs[SP_REG] = RESET_SP;
    }

    pub fn read(&self, n: usize) -> u32 {
        self.regs[n]
    }

    pub fn write(&mut self, n: usize, data: u32) {
        self.regs[n] = data;
    }

    pub fn pc(&self) -> u32 {
        self.regs[PC_REG]
    }

    pub fn set_pc(&mut self, data: u32) {
        self.regs[PC_REG] = data;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_thumb(&self) -> bool {
        self.cpsr.contains(CPSR::T)
    }

    pub fn read_status(&self) -> CPSR {
        self.cpsr
    }

    /// Write the whole CPSR.
    ///
    /// If the mode bits change, the register banks are switched first.
    /// An invalid mode encoding leaves the current mode in place.
    pub fn write_status(&mut self, data: CPSR) {
        match data.mode() {
            Some(mode) => self.switch_mode(mode),
            None => debug!("Ignoring invalid mode bits {:#04X} in CPSR write", (data & CPSR::MODE).bits()),
        }
        let mode_bits = self.cpsr & CPSR::MODE;
        self.cpsr = (data - CPSR::MODE) | mode_bits;
    }

    /// SPSR of the current mode. User and System modes read the CPSR.
    pub fn read_spsr(&self) -> SPSR {
        if self.mode.has_spsr() {
            SPSR::from_bits_truncate(self.banks[self.mode.bank()].spsr)
        } else {
            self.cpsr
        }
    }

    /// Write the SPSR of the current mode. Ignored in User and System mode.
    pub fn write_spsr(&mut self, data: SPSR) {
        if self.mode.has_spsr() {
            self.banks[self.mode.bank()].spsr = data.bits();
        }
    }

    pub fn get_flag(&self, flag: CPSR) -> bool {
        self.cpsr.contains(flag)
    }

    /// Replace the bits in `mask` with those in `values`. Mode bits are never touched.
    pub fn set_flags(&mut self, mask: CPSR, values: CPSR) {
        let mask = mask - CPSR::MODE;
        self.cpsr = (self.cpsr - mask) | (values & mask);
    }

    /// Make the registers of `mode` visible.
    ///
    /// The outgoing registers are copied into their bank, then the incoming bank is copied in.
    pub fn switch_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        let old = self.mode;

        let out = &mut self.banks[old.bank()];
        out.r13 = self.regs[SP_REG];
        out.r14 = self.regs[LINK_REG];
        if old == Mode::FIQ {
            self.banks[Mode::FIQ.bank()].r8_12.copy_from_slice(&self.regs[8..13]);
        } else if mode == Mode::FIQ {
            self.banks[Mode::USR.bank()].r8_12.copy_from_slice(&self.regs[8..13]);
        }

        let incoming = self.banks[mode.bank()];
        self.regs[SP_REG] = incoming.r13;
        self.regs[LINK_REG] = incoming.r14;
        if mode == Mode::FIQ {
            self.regs[8..13].copy_from_slice(&incoming.r8_12);
        } else if old == Mode::FIQ {
            let usr = self.banks[Mode::USR.bank()];
            self.regs[8..13].copy_from_slice(&usr.r8_12);
        }

        debug!("Mode switch: {:?} -> {:?}", old, mode);
        self.mode = mode;
        self.cpsr.set_mode(mode);
    }

    /// Read the user-mode view of a register.
    pub fn read_usr(&self, n: usize) -> u32 {
        match n {
            8..=12 if self.mode == Mode::FIQ => self.banks[Mode::USR.bank()].r8_12[n - 8],
            13 if self.mode.bank() != 0 => self.banks[Mode::USR.bank()].r13,
            14 if self.mode.bank() != 0 => self.banks[Mode::USR.bank()].r14,
            _ => self.regs[n],
        }
    }

    /// Write the user-mode view of a register.
    pub fn write_usr(&mut self, n: usize, data: u32) {
        let usr = Mode::USR.bank();
        match n {
            8..=12 if self.mode == Mode::FIQ => self.banks[usr].r8_12[n - 8] = data,
            13 if self.mode.bank() != 0 => self.banks[usr].r13 = data,
            14 if self.mode.bank() != 0 => self.banks[usr].r14 = data,
            _ => self.regs[n] = data,
        }
    }

    /// Visible registers.
    pub fn regs(&self) -> &[u32; 16] {
        &self.regs
    }

    /// Stored banks, indexed by `Mode::bank`.
    /// The bank of the current mode may be stale.
    pub fn banks(&self) -> &[Bank; NUM_BANKS] {
        &self.banks
    }

    /// Directly write the banked registers of a mode, whether it is active or not.
    pub fn set_banked_sp(&mut self, mode: Mode, data: u32) {
        if mode.bank() == self.mode.bank() {
            self.regs[SP_REG] = data;
        } else {
            self.banks[mode.bank()].r13 = data;
        }
    }

    /// Rebuild a register file from raw parts.
    ///
    /// `cpsr` must hold a valid mode; the visible registers must belong to it.
    pub(crate) fn from_parts(regs: [u32; 16], cpsr: CPSR, banks: [Bank; NUM_BANKS]) -> Option<Self> {
        let mode = cpsr.mode()?;
        Some(Self {
            regs,
            cpsr,
            mode,
            banks,
        })
    }
}
