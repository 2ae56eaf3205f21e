/// Debugger interface

use crate::core::{ARMv4Instruction, Mode};
use crate::interrupt::InterruptState;

pub struct CPUState {
    pub regs: [u32; 16],
    pub flags: u32,
    pub thumb_mode: bool,
    pub mode: Mode,
    pub interrupts: InterruptState,
    pub cycles: u64,

    /// Raw word or halfword at the program counter.
    pub next_word: u32,
    /// None if the next word does not decode.
    pub next_instr: Option<ARMv4Instruction>,
}

pub trait Debugger {
    fn inspect_state(&mut self) -> CPUState;
}
