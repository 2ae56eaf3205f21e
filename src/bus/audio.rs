/// Sound registers.
///
/// Mixing is done by the host. The processor side only needs the registers
/// and wave RAM to read back what was written.

use super::Peripheral;
use crate::{
    common::u16::test_bit,
    interrupt::InterruptRequests
};

pub const AUDIO_REG_START: u32 = 0x060;
pub const SOUNDCNT_X_REG: u32 = 0x084;
pub const WAVE_RAM_START: u32 = 0x090;
pub const WAVE_RAM_END: u32 = 0x0A0;
pub const AUDIO_REG_END: u32 = 0x0B0;

const MASTER_ENABLE_BIT: usize = 7;

pub struct Audio {
    regs: Vec<u16>,
}

impl Audio {
    pub fn new() -> Self {
        Self {
            regs: vec![0; ((AUDIO_REG_END - AUDIO_REG_START) / 2) as usize],
        }
    }

    pub fn master_enabled(&self) -> bool {
        test_bit(self.read_register(SOUNDCNT_X_REG), MASTER_ENABLE_BIT)
    }

    /// The 32 4-bit wave samples, two per byte.
    pub fn wave_ram(&self) -> Vec<u8> {
        let start = ((WAVE_RAM_START - AUDIO_REG_START) / 2) as usize;
        let end = ((WAVE_RAM_END - AUDIO_REG_START) / 2) as usize;
        self.regs[start..end].iter()
            .flat_map(|r| r.to_le_bytes())
            .collect()
    }

    fn index(addr: u32) -> Option<usize> {
        if (AUDIO_REG_START..AUDIO_REG_END).contains(&addr) {
            Some(((addr - AUDIO_REG_START) / 2) as usize)
        } else {
            None
        }
    }
}

impl Default for Audio {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Audio {
    fn read_register(&self, addr: u32) -> u16 {
        Self::index(addr).map_or(0, |idx| self.regs[idx])
    }

    fn write_register(&mut self, addr: u32, value: u16, mask: u16, _requests: &mut InterruptRequests) {
        if let Some(idx) = Self::index(addr) {
            self.regs[idx] = (self.regs[idx] & !mask) | (value & mask);
        }
    }
}
