/// Errors raised by the core.

use thiserror::Error;

/// Failure to execute an instruction.
///
/// The step that raised it has no effect: the program counter and cycle count are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Undefined instruction {word:#010x} at {addr:#010x}")]
    Undefined { addr: u32, word: u32 },

    #[error("Unimplemented instruction {word:#010x} at {addr:#010x}")]
    NotImplemented { addr: u32, word: u32 },
}

/// Failure to restore a snapshot.
///
/// The core is left untouched when any of these is returned.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Snapshot version mismatch: expected {expected}, found {found}")]
    Version { expected: String, found: String },

    #[error("Invalid processor mode {0:#04x}")]
    InvalidMode(u32),

    #[error("Snapshot mode {mode:#04x} does not match status register {cpsr:#010x}")]
    ModeMismatch { mode: u32, cpsr: u32 },

    #[error("Snapshot thumb flag does not match status register {0:#010x}")]
    ThumbMismatch(u32),

    #[error("Malformed snapshot: {0}")]
    Decode(#[from] bincode::Error),
}
