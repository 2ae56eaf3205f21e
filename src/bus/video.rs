/// Video registers and memory.
///
/// Rendering happens elsewhere. This only stores what the processor writes,
/// and keeps the scanline counter and its interrupts.

use super::Peripheral;
use crate::{
    common::u16::test_bit,
    interrupt::{InterruptRequests, InterruptType},
    memory::Ram
};

pub const DISPCNT_REG: u32 = 0x000;
pub const DISPSTAT_REG: u32 = 0x004;
pub const VCOUNT_REG: u32 = 0x006;
pub const BG0CNT_REG: u32 = 0x008;
pub const BG3CNT_REG: u32 = 0x00E;
/// End of the video register block.
pub const VIDEO_REG_END: u32 = 0x060;

pub const VISIBLE_LINES: u16 = 160;
pub const TOTAL_LINES: u16 = 228;

const PALETTE_SIZE: usize = 1024;
const VRAM_SIZE: usize = 128 * 1024;
const OAM_SIZE: usize = 1024;

/// The upper 32KiB of the VRAM region mirrors the 32KiB below it.
const VRAM_MIRROR_START: u32 = 0x1_8000;
const VRAM_MIRROR_OFFSET: u32 = 0x8000;

mod dispstat {
    use crate::common::u16::bit;

    pub const VBLANK: u16 = bit(0);
    pub const HBLANK: u16 = bit(1);
    pub const VCOUNT: u16 = bit(2);
    pub const VBLANK_IRQ: usize = 3;
    pub const HBLANK_IRQ: usize = 4;
    pub const VCOUNT_IRQ: usize = 5;
    /// Status bits are read-only.
    pub const STATUS: u16 = VBLANK | HBLANK | VCOUNT;
}

pub struct Video {
    regs:       Vec<u16>,
    vcount:     u16,

    palette:    Ram,
    vram:       Ram,
    oam:        Ram,
}

impl Video {
    pub fn new() -> Self {
        Self {
            regs:       vec![0; (VIDEO_REG_END / 2) as usize],
            vcount:     0,

            palette:    Ram::new(PALETTE_SIZE),
            vram:       Ram::new(VRAM_SIZE),
            oam:        Ram::new(OAM_SIZE),
        }
    }

    pub fn vcount(&self) -> u16 {
        self.vcount
    }

    pub fn dispcnt(&self) -> u16 {
        self.regs[(DISPCNT_REG / 2) as usize]
    }

    /// Background control for background 0-3.
    pub fn bg_control(&self, bg: usize) -> u16 {
        self.regs[(BG0CNT_REG / 2) as usize + bg]
    }

    fn dispstat(&self) -> u16 {
        self.regs[(DISPSTAT_REG / 2) as usize]
    }

    fn set_dispstat(&mut self, data: u16) {
        self.regs[(DISPSTAT_REG / 2) as usize] = data;
    }

    /// Move on to the next scanline, wrapping after the last vblank line.
    ///
    /// Raises VBlank on entering line 160, VCount when the line matches the
    /// DISPSTAT setting, and HBlank on every line, each only if enabled in DISPSTAT.
    pub fn advance_scanline(&mut self, requests: &mut InterruptRequests) {
        self.vcount = (self.vcount + 1) % TOTAL_LINES;

        let mut stat = self.dispstat() & !dispstat::STATUS;
        let in_vblank = self.vcount >= VISIBLE_LINES && self.vcount < (TOTAL_LINES - 1);
        let vcount_match = self.vcount == (stat >> 8);
        if in_vblank {
            stat |= dispstat::VBLANK;
        }
        if vcount_match {
            stat |= dispstat::VCOUNT;
        }
        self.set_dispstat(stat);

        if self.vcount == VISIBLE_LINES && test_bit(stat, dispstat::VBLANK_IRQ) {
            requests.raise(InterruptType::VBlank);
        }
        if test_bit(stat, dispstat::HBLANK_IRQ) {
            requests.raise(InterruptType::HBlank);
        }
        if vcount_match && test_bit(stat, dispstat::VCOUNT_IRQ) {
            requests.raise(InterruptType::VCount);
        }
    }

    pub fn palette(&self) -> &Ram {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut Ram {
        &mut self.palette
    }

    pub fn oam(&self) -> &Ram {
        &self.oam
    }

    pub fn oam_mut(&mut self) -> &mut Ram {
        &mut self.oam
    }

    pub fn vram(&self) -> &Ram {
        &self.vram
    }

    pub fn vram_mut(&mut self) -> &mut Ram {
        &mut self.vram
    }

    /// Map a VRAM region address to its offset inside VRAM.
    pub fn vram_offset(addr: u32) -> u32 {
        let offset = addr & 0x1_FFFF;
        if offset >= VRAM_MIRROR_START {
            offset - VRAM_MIRROR_OFFSET
        } else {
            offset
        }
    }
}

impl Default for Video {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Video {
    fn read_register(&self, addr: u32) -> u16 {
        match addr {
            VCOUNT_REG => self.vcount,
            _ if addr < VIDEO_REG_END => self.regs[(addr / 2) as usize],
            _ => 0,
        }
    }

    fn write_register(&mut self, addr: u32, value: u16, mask: u16, _requests: &mut InterruptRequests) {
        match addr {
            VCOUNT_REG => {},
            DISPSTAT_REG => {
                let mask = mask & !dispstat::STATUS;
                let stat = (self.dispstat() & !mask) | (value & mask);
                self.set_dispstat(stat);
            },
            _ if addr < VIDEO_REG_END => {
                let idx = (addr / 2) as usize;
                self.regs[idx] = (self.regs[idx] & !mask) | (value & mask);
            },
            _ => {},
        }
    }
}
