/// Game pak: ROM, save memory and the cartridge control registers.

use log::trace;

use super::Peripheral;
use crate::interrupt::{InterruptRequests, InterruptType};

pub const WAITCNT_REG: u32 = 0x204;
pub const GPSTAT_REG: u32 = 0x800;

/// ROM mirrors repeat every 32MiB.
const ROM_MASK: u32 = 0x01FF_FFFF;
/// SRAM is addressed with 16 bits.
const SAVE_MASK: u32 = 0xFFFF;
const DEFAULT_SAVE_SIZE: usize = 64 * 1024;

/// Location of the game code in the ROM header.
const GAME_CODE: std::ops::Range<usize> = 0xAC..0xB0;

pub struct Cartridge {
    rom:    Vec<u8>,
    save:   Vec<u8>,

    waitcnt: u16,
    gpstat:  u16,
}

impl Cartridge {
    pub fn new(rom: Vec<u8>) -> Self {
        Self::with_save_size(rom, DEFAULT_SAVE_SIZE)
    }

    /// Create a cartridge with a specific amount of save memory.
    pub fn with_save_size(rom: Vec<u8>, save_size: usize) -> Self {
        Self {
            rom,
            save: vec![0xFF; save_size],
            waitcnt: 0,
            gpstat: 0,
        }
    }

    /// The four character game code from the header, if present.
    pub fn game_code(&self) -> Option<String> {
        let code = self.rom.get(GAME_CODE)?;
        Some(code.iter().map(|b| *b as char).collect())
    }

    pub fn rom_len(&self) -> usize {
        self.rom.len()
    }

    /// Reads past the end of the ROM return 0xFF.
    pub fn read_rom(&self, addr: u32) -> u8 {
        let offset = (addr & ROM_MASK) as usize;
        match self.rom.get(offset) {
            Some(data) => *data,
            None => {
                trace!("Read past end of ROM: {:08X}", addr);
                0xFF
            }
        }
    }

    /// Reads outside of the save memory return 0xFF.
    pub fn read_save(&self, addr: u32) -> u8 {
        let offset = (addr & SAVE_MASK) as usize;
        self.save.get(offset).copied().unwrap_or(0xFF)
    }

    /// Write a byte of save memory. Marks the save as dirty and raises the game pak interrupt.
    pub fn write_save(&mut self, addr: u32, data: u8, requests: &mut InterruptRequests) {
        let offset = (addr & SAVE_MASK) as usize;
        if let Some(byte) = self.save.get_mut(offset) {
            *byte = data;
            self.gpstat |= 1;
            requests.raise(InterruptType::GamePak);
        }
    }

    pub fn save_data(&self) -> &[u8] {
        &self.save
    }

    /// Replace the save memory contents.
    pub fn load_save(&mut self, data: &[u8]) {
        self.save = data.to_vec();
    }

    pub fn waitcnt(&self) -> u16 {
        self.waitcnt
    }
}

impl Peripheral for Cartridge {
    fn read_register(&self, addr: u32) -> u16 {
        match addr {
            WAITCNT_REG => self.waitcnt,
            GPSTAT_REG => self.gpstat,
            _ => 0,
        }
    }

    fn write_register(&mut self, addr: u32, value: u16, mask: u16, _requests: &mut InterruptRequests) {
        match addr {
            WAITCNT_REG => self.waitcnt = (self.waitcnt & !mask) | (value & mask),
            GPSTAT_REG => self.gpstat &= !(value & mask),
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::Interrupts;

    fn test_rom() -> Vec<u8> {
        let mut rom = vec![0; 0x200];
        rom[0xAC..0xB0].copy_from_slice(b"AXVE");
        rom[0x1FF] = 0x5A;
        rom
    }

    #[test]
    fn rom_reads() {
        let cart = Cartridge::new(test_rom());
        assert_eq!(cart.game_code().as_deref(), Some("AXVE"));
        assert_eq!(cart.read_rom(0x0800_01FF), 0x5A);
        // Wait state mirror.
        assert_eq!(cart.read_rom(0x0A00_01FF), 0x5A);
        assert_eq!(cart.read_rom(0x0800_0200), 0xFF);
        assert_eq!(Cartridge::new(vec![0; 4]).game_code(), None);
    }

    #[test]
    fn save_writes() {
        let mut cart = Cartridge::with_save_size(test_rom(), 0x8000);
        let mut requests = InterruptRequests::default();
        assert_eq!(cart.read_save(0x0E00_0010), 0xFF);

        cart.write_save(0x0E00_0010, 0x42, &mut requests);
        assert_eq!(cart.read_save(0x0E00_0010), 0x42);
        assert_eq!(cart.read_register(GPSTAT_REG), 1);
        assert_eq!(requests.take(), Interrupts::GAME_PAK);

        // Outside of the save memory.
        cart.write_save(0x0E00_9000, 0x42, &mut requests);
        assert_eq!(cart.read_save(0x0E00_9000), 0xFF);
        assert!(requests.is_empty());
    }

    #[test]
    fn registers() {
        let mut cart = Cartridge::new(test_rom());
        let mut requests = InterruptRequests::default();
        cart.write_register(WAITCNT_REG, 0x4317, 0xFFFF, &mut requests);
        assert_eq!(cart.read_register(WAITCNT_REG), 0x4317);

        cart.write_save(0x0E00_0000, 0, &mut requests);
        // Writing zero leaves GPSTAT alone.
        cart.write_register(GPSTAT_REG, 0, 0xFFFF, &mut requests);
        assert_eq!(cart.read_register(GPSTAT_REG), 1);
        cart.write_register(GPSTAT_REG, 1, 0xFFFF, &mut requests);
        assert_eq!(cart.read_register(GPSTAT_REG), 0);
    }
}
