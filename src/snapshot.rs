/// Save state for the processor.

use serde::{Deserialize, Serialize};

use crate::{
    core::{Bank, Mode, NUM_BANKS},
    error::StateError,
    interrupt::InterruptRegisters
};

/// Version identifier for snapshot compatibility checks.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Serializable processor state.
///
/// Memory belongs to the bus and its components, and is not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub version:    String,
    /// The active registers.
    pub regs:       [u32; 16],
    pub cpsr:       u32,
    /// Banked registers and SPSRs, indexed by `Mode::bank`.
    pub banks:      [Bank; NUM_BANKS],
    pub mode:       Mode,
    pub thumb:      bool,
    pub cycles:     u64,
    /// Includes the interrupt being serviced.
    pub interrupts: InterruptRegisters,
    pub halted:     bool,
}

impl CpuSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, StateError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StateError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
