/// Interrupt controller.
///
/// Holds the enable (IE), request (IF) and master enable (IME) registers,
/// along with the halt state set through HALTCNT.

use bitflags::bitflags;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    bus::Peripheral,
    common::u16::{bit, bits}
};

pub const IE_REG: u32 = 0x200;
pub const IF_REG: u32 = 0x202;
pub const IME_REG: u32 = 0x208;
/// POSTFLG in the low byte, HALTCNT in the high byte.
pub const POSTFLG_REG: u32 = 0x300;

/// Interrupt sources, numbered by their bit in IE and IF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterruptType {
    VBlank  = 0,
    HBlank  = 1,
    VCount  = 2,
    Timer0  = 3,
    Timer1  = 4,
    Timer2  = 5,
    Timer3  = 6,
    Serial  = 7,
    Dma0    = 8,
    Dma1    = 9,
    Dma2    = 10,
    Dma3    = 11,
    Keypad  = 12,
    GamePak = 13,
}

impl InterruptType {
    pub const ALL: [InterruptType; 14] = {
        use InterruptType::*;
        [VBlank, HBlank, VCount, Timer0, Timer1, Timer2, Timer3, Serial, Dma0, Dma1, Dma2, Dma3, Keypad, GamePak]
    };

    pub fn from_index(n: usize) -> Option<InterruptType> {
        Self::ALL.get(n).copied()
    }

    pub fn flag(self) -> Interrupts {
        Interrupts::from_bits_truncate(bit(self as usize))
    }
}

bitflags! {
    #[derive(Default)]
    pub struct Interrupts: u16 {
        const V_BLANK   = bit(0);
        const H_BLANK   = bit(1);
        const V_COUNT   = bit(2);
        const TIMER_0   = bit(3);
        const TIMER_1   = bit(4);
        const TIMER_2   = bit(5);
        const TIMER_3   = bit(6);
        const SERIAL    = bit(7);
        const DMA_0     = bit(8);
        const DMA_1     = bit(9);
        const DMA_2     = bit(10);
        const DMA_3     = bit(11);
        const KEYPAD    = bit(12);
        const GAME_PAK  = bit(13);

        const ALL_SOURCES = bits(0, 13);
    }
}

impl Interrupts {
    /// The lowest numbered source, which has the highest priority.
    pub fn highest_priority(self) -> Option<InterruptType> {
        if self.is_empty() {
            None
        } else {
            InterruptType::from_index(self.bits().trailing_zeros() as usize)
        }
    }
}

/// Requests raised while accessing peripherals.
///
/// Taken by the processor at the start of every step.
/// Raising the same source twice before then is the same as raising it once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterruptRequests(Interrupts);

impl InterruptRequests {
    pub fn raise(&mut self, kind: InterruptType) {
        self.0.insert(kind.flag());
    }

    pub fn raised(&self) -> Interrupts {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All raised sources, leaving none behind.
    pub fn take(&mut self) -> Interrupts {
        std::mem::take(&mut self.0)
    }

    pub fn clear(&mut self) {
        self.0 = Interrupts::empty();
    }
}

/// Externally visible state of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptState {
    /// Nothing to do.
    Idle,
    /// An enabled interrupt is waiting to be serviced.
    Pending,
    /// A handler is running and has not yet acknowledged its interrupt.
    Servicing,
    /// The processor is halted until an enabled interrupt arrives.
    Halted,
}

/// Raw register values, used for save states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptRegisters {
    pub enable:         u16,
    pub flags:          u16,
    pub master_enable:  bool,
    pub postflg:        u8,
    /// Interrupt whose handler has not yet acknowledged it through IF.
    pub servicing:      Option<InterruptType>,
}

#[derive(Clone, Debug, Default)]
pub struct InterruptController {
    enable:         Interrupts,
    flags:          Interrupts,
    master_enable:  bool,
    postflg:        u8,
    halted:         bool,
    servicing:      Option<InterruptType>,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag an interrupt. If it is enabled, the processor wakes from halt.
    pub fn request_interrupt(&mut self, kind: InterruptType) {
        self.flags.insert(kind.flag());
        if self.halted && self.enable.contains(kind.flag()) {
            debug!("Woken from halt by {:?}", kind);
            self.halted = false;
        }
    }

    /// An enabled interrupt is flagged and the master enable is set.
    pub fn check_pending(&self) -> bool {
        self.master_enable && self.enable.intersects(self.flags)
    }

    /// Take the highest priority pending interrupt, and clear its flag.
    pub fn acknowledge(&mut self) -> Option<InterruptType> {
        if !self.master_enable {
            return None;
        }
        let kind = (self.enable & self.flags).highest_priority()?;
        self.flags.remove(kind.flag());
        self.servicing = Some(kind);
        self.halted = false;
        Some(kind)
    }

    pub fn state(&self) -> InterruptState {
        if self.halted {
            InterruptState::Halted
        } else if self.servicing.is_some() {
            InterruptState::Servicing
        } else if self.check_pending() {
            InterruptState::Pending
        } else {
            InterruptState::Idle
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn halt(&mut self) {
        debug!("Halted");
        self.halted = true;
    }

    pub fn servicing(&self) -> Option<InterruptType> {
        self.servicing
    }

    pub fn enabled(&self) -> Interrupts {
        self.enable
    }

    pub fn flagged(&self) -> Interrupts {
        self.flags
    }

    pub fn registers(&self) -> InterruptRegisters {
        InterruptRegisters {
            enable:         self.enable.bits(),
            flags:          self.flags.bits(),
            master_enable:  self.master_enable,
            postflg:        self.postflg,
            servicing:      self.servicing,
        }
    }

    /// Restore registers from a save state.
    pub fn restore(&mut self, regs: &InterruptRegisters, halted: bool) {
        self.enable = Interrupts::from_bits_truncate(regs.enable);
        self.flags = Interrupts::from_bits_truncate(regs.flags);
        self.master_enable = regs.master_enable;
        self.postflg = regs.postflg;
        self.halted = halted;
        self.servicing = regs.servicing;
    }

    fn write_flags(&mut self, acknowledged: Interrupts) {
        self.flags.remove(acknowledged);
        if let Some(kind) = self.servicing {
            if acknowledged.contains(kind.flag()) {
                self.servicing = None;
            }
        }
    }
}

impl Peripheral for InterruptController {
    fn read_register(&self, addr: u32) -> u16 {
        match addr {
            IE_REG => self.enable.bits(),
            IF_REG => self.flags.bits(),
            IME_REG => self.master_enable as u16,
            // HALTCNT is write-only.
            POSTFLG_REG => self.postflg as u16,
            _ => 0,
        }
    }

    fn write_register(&mut self, addr: u32, value: u16, mask: u16, _requests: &mut InterruptRequests) {
        match addr {
            IE_REG => {
                let enable = (self.enable.bits() & !mask) | (value & mask);
                self.enable = Interrupts::from_bits_truncate(enable);
            },
            IF_REG => self.write_flags(Interrupts::from_bits_truncate(value & mask)),
            IME_REG => if (mask & 1) != 0 {
                self.master_enable = (value & 1) != 0;
            },
            POSTFLG_REG => {
                if (mask & 0xFF) != 0 {
                    self.postflg = (value & 1) as u8;
                }
                if (mask & 0xFF00) != 0 && (value & bit(15)) == 0 {
                    self.halt();
                }
            },
            _ => {},
        }
    }
}
