/// Plain I/O register storage.

use super::Peripheral;
use crate::interrupt::InterruptRequests;

/// A block of halfword registers that read back what was written.
///
/// Used for register blocks whose behaviour lives outside of the core
/// (DMA, timers, serial).
#[derive(Clone, Debug)]
pub struct IoStorage {
    base: u32,
    regs: Vec<u16>,
}

impl IoStorage {
    /// Storage for the I/O offsets `base..end`.
    pub fn new(base: u32, end: u32) -> Self {
        Self {
            base,
            regs: vec![0; ((end - base) / 2) as usize],
        }
    }

    fn index(&self, addr: u32) -> Option<usize> {
        let idx = (addr.checked_sub(self.base)? / 2) as usize;
        if idx < self.regs.len() {
            Some(idx)
        } else {
            None
        }
    }
}

impl Peripheral for IoStorage {
    fn read_register(&self, addr: u32) -> u16 {
        self.index(addr).map_or(0, |idx| self.regs[idx])
    }

    fn write_register(&mut self, addr: u32, value: u16, mask: u16, _requests: &mut InterruptRequests) {
        if let Some(idx) = self.index(addr) {
            self.regs[idx] = (self.regs[idx] & !mask) | (value & mask);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_with_lanes() {
        let mut io = IoStorage::new(0x100, 0x110);
        let mut requests = InterruptRequests::default();
        io.write_register(0x102, 0x1234, 0xFFFF, &mut requests);
        io.write_register(0x102, 0xAB00, 0xFF00, &mut requests);
        assert_eq!(io.read_register(0x102), 0xAB34);
        assert_eq!(io.read_register(0x110), 0);
        assert_eq!(io.read_register(0x0FE), 0);
        assert!(requests.is_empty());
    }
}
