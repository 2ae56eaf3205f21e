/// Button input.

use log::trace;

use super::Peripheral;
use crate::{
    common::u16::bit,
    interrupt::{InterruptRequests, InterruptType}
};

pub const KEYINPUT_REG: u32 = 0x130;
pub const KEYCNT_REG: u32 = 0x132;

/// All buttons released. KEYINPUT is active-low.
const KEYS_RELEASED: u16 = 0x03FF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    A       = 0,
    B       = 1,
    Select  = 2,
    Start   = 3,
    Right   = 4,
    Left    = 5,
    Up      = 6,
    Down    = 7,
    R       = 8,
    L       = 9,
}

impl Key {
    fn mask(self) -> u16 {
        bit(self as usize)
    }
}

pub struct Keypad {
    keyinput:   u16,
    keycnt:     u16,
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            keyinput:   KEYS_RELEASED,
            keycnt:     0,
        }
    }

    pub fn press(&mut self, key: Key, requests: &mut InterruptRequests) {
        self.set_keys(self.keyinput & !key.mask(), requests);
    }

    pub fn release(&mut self, key: Key, requests: &mut InterruptRequests) {
        self.set_keys(self.keyinput | key.mask(), requests);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        (self.keyinput & key.mask()) == 0
    }

    /// Set the raw KEYINPUT value. A change in any button raises the keypad interrupt.
    pub fn set_keys(&mut self, keyinput: u16, requests: &mut InterruptRequests) {
        let keyinput = keyinput & KEYS_RELEASED;
        if keyinput != self.keyinput {
            trace!("Keys: {:03X}", keyinput);
            self.keyinput = keyinput;
            requests.raise(InterruptType::Keypad);
        }
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Keypad {
    fn read_register(&self, addr: u32) -> u16 {
        match addr {
            KEYINPUT_REG => self.keyinput,
            KEYCNT_REG => self.keycnt,
            _ => 0,
        }
    }

    fn write_register(&mut self, addr: u32, value: u16, mask: u16, _requests: &mut InterruptRequests) {
        // KEYINPUT is read-only.
        if addr == KEYCNT_REG {
            self.keycnt = (self.keycnt & !mask) | (value & mask);
        }
    }
}
