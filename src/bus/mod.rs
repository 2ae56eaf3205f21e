/// The system bus. Routes processor memory accesses to the component that owns them.

pub mod audio;
pub mod cartridge;
pub mod io;
pub mod keypad;
pub mod video;

use log::trace;

use crate::{
    interrupt::{InterruptController, InterruptRequests, InterruptType},
    memory::{Mem32, Ram}
};

pub use audio::Audio;
pub use cartridge::Cartridge;
pub use io::IoStorage;
pub use keypad::{Key, Keypad};
pub use video::Video;

/// A block of memory-mapped I/O registers.
///
/// Addresses are offsets from the start of the I/O region, aligned to a halfword.
/// The mask selects which bytes of the halfword are being written.
pub trait Peripheral {
    fn read_register(&self, addr: u32) -> u16;
    fn write_register(&mut self, addr: u32, value: u16, mask: u16, requests: &mut InterruptRequests);
}

const BIOS_SIZE: usize = 16 * 1024;
const EWRAM_SIZE: usize = 256 * 1024;
const IWRAM_SIZE: usize = 32 * 1024;

const IO_BASE: u32 = 0x0400_0000;

const DMA_START: u32 = 0x0B0;
const DMA_END: u32 = 0x100;
const TIMER_START: u32 = 0x100;
const TIMER_END: u32 = 0x110;
const SERIAL_START: u32 = 0x120;
const SERIAL_END: u32 = 0x200;

/// Which component owns an I/O register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IoOwner {
    Video,
    Audio,
    Dma,
    Timers,
    Serial,
    Keypad,
    Interrupts,
    Cartridge,
    Unmapped,
}

fn io_owner(offset: u32) -> IoOwner {
    use IoOwner::*;
    match offset {
        0x000..=0x05F => Video,
        0x060..=0x0AF => Audio,
        0x0B0..=0x0FF => Dma,
        0x100..=0x10F => Timers,
        0x130..=0x133 => Keypad,
        0x120..=0x1FF => Serial,
        0x200..=0x203 | 0x208..=0x209 | 0x300..=0x301 => Interrupts,
        0x204..=0x205 | 0x800..=0x801 => Cartridge,
        _ => Unmapped,
    }
}

pub struct SystemBus {
    bios:       Ram,
    ewram:      Ram,
    iwram:      Ram,

    video:      Video,
    audio:      Audio,
    dma:        IoStorage,
    timers:     IoStorage,
    serial:     IoStorage,
    keypad:     Keypad,
    interrupts: InterruptController,
    cartridge:  Cartridge,

    requests:   InterruptRequests,
}

impl SystemBus {
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            bios:       Ram::new(BIOS_SIZE),
            ewram:      Ram::new(EWRAM_SIZE),
            iwram:      Ram::new(IWRAM_SIZE),

            video:      Video::new(),
            audio:      Audio::new(),
            dma:        IoStorage::new(DMA_START, DMA_END),
            timers:     IoStorage::new(TIMER_START, TIMER_END),
            serial:     IoStorage::new(SERIAL_START, SERIAL_END),
            keypad:     Keypad::new(),
            interrupts: InterruptController::new(),
            cartridge,

            requests:   InterruptRequests::default(),
        }
    }

    /// Copy a BIOS image in. Anything past 16KiB is ignored.
    pub fn load_bios(&mut self, bios: &[u8]) {
        for (addr, data) in bios.iter().take(BIOS_SIZE).enumerate() {
            self.bios.write_byte(addr as u32, *data);
        }
    }

    /// Move interrupts raised by peripherals into the interrupt controller.
    pub fn deliver_interrupts(&mut self) {
        let raised = self.requests.take();
        for kind in InterruptType::ALL.iter().filter(|kind| raised.contains(kind.flag())) {
            self.interrupts.request_interrupt(*kind);
        }
    }

    /// Drop interrupts raised but not yet delivered.
    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Queue an interrupt, to be delivered at the start of the next step.
    pub fn raise_interrupt(&mut self, kind: InterruptType) {
        self.requests.raise(kind);
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }

    pub fn advance_scanline(&mut self) {
        self.video.advance_scanline(&mut self.requests);
    }

    pub fn press_key(&mut self, key: Key) {
        self.keypad.press(key, &mut self.requests);
    }

    pub fn release_key(&mut self, key: Key) {
        self.keypad.release(key, &mut self.requests);
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cartridge
    }
}

// I/O
impl SystemBus {
    fn io_read(&self, offset: u32) -> u16 {
        let offset = offset & !1;
        let peripheral: &dyn Peripheral = match io_owner(offset) {
            IoOwner::Video => &self.video,
            IoOwner::Audio => &self.audio,
            IoOwner::Dma => &self.dma,
            IoOwner::Timers => &self.timers,
            IoOwner::Serial => &self.serial,
            IoOwner::Keypad => &self.keypad,
            IoOwner::Interrupts => &self.interrupts,
            IoOwner::Cartridge => &self.cartridge,
            IoOwner::Unmapped => {
                trace!("Read from unmapped I/O: {:03X}", offset);
                return 0;
            },
        };
        peripheral.read_register(offset)
    }

    fn io_write(&mut self, offset: u32, value: u16, mask: u16) {
        let offset = offset & !1;
        let SystemBus {
            video, audio, dma, timers, serial, keypad, interrupts, cartridge, requests, ..
        } = self;
        let peripheral: &mut dyn Peripheral = match io_owner(offset) {
            IoOwner::Video => video,
            IoOwner::Audio => audio,
            IoOwner::Dma => dma,
            IoOwner::Timers => timers,
            IoOwner::Serial => serial,
            IoOwner::Keypad => keypad,
            IoOwner::Interrupts => interrupts,
            IoOwner::Cartridge => cartridge,
            IoOwner::Unmapped => {
                trace!("Write to unmapped I/O: {:03X} = {:04X}", offset, value);
                return;
            },
        };
        peripheral.write_register(offset, value, mask, requests);
    }

    fn io_read_byte(&self, offset: u32) -> u8 {
        let data = self.io_read(offset);
        if (offset & 1) == 0 {
            data as u8
        } else {
            (data >> 8) as u8
        }
    }

    fn io_write_byte(&mut self, offset: u32, data: u8) {
        if (offset & 1) == 0 {
            self.io_write(offset, data as u16, 0x00FF);
        } else {
            self.io_write(offset, (data as u16) << 8, 0xFF00);
        }
    }
}

// Cartridge bytes. Halfwords and words are assembled little-endian from the aligned address.
impl SystemBus {
    fn cart_read_byte(&self, addr: u32) -> u8 {
        if addr < 0x0E00_0000 {
            self.cartridge.read_rom(addr)
        } else {
            self.cartridge.read_save(addr)
        }
    }

    fn cart_read(&self, addr: u32, bytes: u32) -> u32 {
        let base = addr & !(bytes - 1);
        (0..bytes).fold(0, |acc, i| acc | ((self.cart_read_byte(base + i) as u32) << (i * 8)))
    }

    fn cart_write(&mut self, addr: u32, data: u32, bytes: u32) {
        if addr < 0x0E00_0000 {
            trace!("Write to ROM: {:08X}", addr);
            return;
        }
        let base = addr & !(bytes - 1);
        for i in 0..bytes {
            self.cartridge.write_save(base + i, (data >> (i * 8)) as u8, &mut self.requests);
        }
    }
}

impl Mem32 for SystemBus {
    fn load_byte(&mut self, addr: u32) -> u8 {
        match addr >> 24 {
            0x00 if (addr as usize) < BIOS_SIZE => self.bios.read_byte(addr),
            0x02 => self.ewram.read_byte(addr),
            0x03 => self.iwram.read_byte(addr),
            0x04 => self.io_read_byte(addr - IO_BASE),
            0x05 => self.video.palette().read_byte(addr),
            0x06 => self.video.vram().read_byte(Video::vram_offset(addr)),
            0x07 => self.video.oam().read_byte(addr),
            0x08..=0x0F => self.cart_read_byte(addr),
            _ => {
                trace!("Read byte from unmapped address: {:08X}", addr);
                0
            },
        }
    }

    fn store_byte(&mut self, addr: u32, data: u8) {
        match addr >> 24 {
            0x02 => self.ewram.write_byte(addr, data),
            0x03 => self.iwram.write_byte(addr, data),
            0x04 => self.io_write_byte(addr - IO_BASE, data),
            0x05 => self.video.palette_mut().write_byte(addr, data),
            0x06 => self.video.vram_mut().write_byte(Video::vram_offset(addr), data),
            0x07 => self.video.oam_mut().write_byte(addr, data),
            0x08..=0x0F => self.cart_write(addr, data as u32, 1),
            _ => trace!("Write byte to unmapped address: {:08X}", addr),
        }
    }

    fn load_halfword(&mut self, addr: u32) -> u16 {
        match addr >> 24 {
            0x00 if (addr as usize) < BIOS_SIZE => self.bios.read_halfword(addr),
            0x02 => self.ewram.read_halfword(addr),
            0x03 => self.iwram.read_halfword(addr),
            0x04 => self.io_read(addr - IO_BASE),
            0x05 => self.video.palette().read_halfword(addr),
            0x06 => self.video.vram().read_halfword(Video::vram_offset(addr)),
            0x07 => self.video.oam().read_halfword(addr),
            0x08..=0x0F => self.cart_read(addr, 2) as u16,
            _ => {
                trace!("Read halfword from unmapped address: {:08X}", addr);
                0
            },
        }
    }

    fn store_halfword(&mut self, addr: u32, data: u16) {
        match addr >> 24 {
            0x02 => self.ewram.write_halfword(addr, data),
            0x03 => self.iwram.write_halfword(addr, data),
            0x04 => self.io_write(addr - IO_BASE, data, 0xFFFF),
            0x05 => self.video.palette_mut().write_halfword(addr, data),
            0x06 => self.video.vram_mut().write_halfword(Video::vram_offset(addr), data),
            0x07 => self.video.oam_mut().write_halfword(addr, data),
            0x08..=0x0F => self.cart_write(addr, data as u32, 2),
            _ => trace!("Write halfword to unmapped address: {:08X}", addr),
        }
    }

    fn load_word(&mut self, addr: u32) -> u32 {
        match addr >> 24 {
            0x00 if (addr as usize) < BIOS_SIZE => self.bios.read_word(addr),
            0x02 => self.ewram.read_word(addr),
            0x03 => self.iwram.read_word(addr),
            0x04 => {
                let offset = (addr - IO_BASE) & !3;
                let lo = self.io_read(offset) as u32;
                let hi = self.io_read(offset + 2) as u32;
                lo | (hi << 16)
            },
            0x05 => self.video.palette().read_word(addr),
            0x06 => self.video.vram().read_word(Video::vram_offset(addr)),
            0x07 => self.video.oam().read_word(addr),
            0x08..=0x0F => self.cart_read(addr, 4),
            _ => {
                trace!("Read word from unmapped address: {:08X}", addr);
                0
            },
        }
    }

    fn store_word(&mut self, addr: u32, data: u32) {
        match addr >> 24 {
            0x02 => self.ewram.write_word(addr, data),
            0x03 => self.iwram.write_word(addr, data),
            0x04 => {
                let offset = (addr - IO_BASE) & !3;
                self.io_write(offset, data as u16, 0xFFFF);
                self.io_write(offset + 2, (data >> 16) as u16, 0xFFFF);
            },
            0x05 => self.video.palette_mut().write_word(addr, data),
            0x06 => self.video.vram_mut().write_word(Video::vram_offset(addr), data),
            0x07 => self.video.oam_mut().write_word(addr, data),
            0x08..=0x0F => self.cart_write(addr, data, 4),
            _ => trace!("Write word to unmapped address: {:08X}", addr),
        }
    }
}
