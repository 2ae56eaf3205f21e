mod core;
mod common;
mod arm7;
mod memory;
mod debugger;
mod error;
mod snapshot;

pub mod bus;
pub mod interrupt;

pub use crate::core::{
    constants,
    decode::{classify, NotRecognized},
    instructions,
    execute,
    ARMCondition, ARMCore, ARMv4, ARMv4Instruction, ARMv4InstructionType,
    Bank, Category, ExecContext, Executed, Mode, RegisterFile, SwiHook, CPSR, SPSR
};

pub use crate::memory::{
    Mem32, MemWidth, Ram
};

pub use crate::arm7::{
    ARM7TDMI, ARM7TDMIBuilder
};

pub use crate::error::{
    CoreError, StateError
};

pub use crate::snapshot::{
    CpuSnapshot, SNAPSHOT_VERSION
};

pub use crate::debugger::*;
