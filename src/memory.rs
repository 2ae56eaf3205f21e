/// Memory interface for the ARM processor.

/// Width of a single bus access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemWidth {
    Byte,
    Halfword,
    Word,
}

impl MemWidth {
    /// Bus cycles needed to move a value of this width.
    pub const fn cycles(self) -> usize {
        match self {
            MemWidth::Byte => 1,
            MemWidth::Halfword => 1,
            MemWidth::Word => 2,
        }
    }
}

/// A 32-bit memory interface.
/// Capable of loading and storing bytes (8-bit), halfwords (16-bit), and words (32-bit).
///
/// Halfword and word accesses are aligned down by the implementor.
/// Accesses never fail: unmapped reads return a fallback value and unmapped writes are dropped.
pub trait Mem32 {
    fn load_byte(&mut self, addr: u32) -> u8;
    fn store_byte(&mut self, addr: u32, data: u8);

    fn load_halfword(&mut self, addr: u32) -> u16;
    fn store_halfword(&mut self, addr: u32, data: u16);

    fn load_word(&mut self, addr: u32) -> u32;
    fn store_word(&mut self, addr: u32, data: u32);

    /// Read a value of the given width, zero-extended.
    fn read(&mut self, addr: u32, width: MemWidth) -> u32 {
        match width {
            MemWidth::Byte => self.load_byte(addr) as u32,
            MemWidth::Halfword => self.load_halfword(addr) as u32,
            MemWidth::Word => self.load_word(addr),
        }
    }

    /// Write the low bits of `data` with the given width.
    fn write(&mut self, addr: u32, width: MemWidth, data: u32) {
        match width {
            MemWidth::Byte => self.store_byte(addr, data as u8),
            MemWidth::Halfword => self.store_halfword(addr, data as u16),
            MemWidth::Word => self.store_word(addr, data),
        }
    }
}

/// Little-endian RAM block, mirrored across its address range.
pub struct Ram {
    data: Vec<u8>,
    mask: u32,
}

impl Ram {
    /// Size must be a power of two.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
            mask: (size - 1) as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn index(&self, addr: u32) -> usize {
        (addr & self.mask) as usize
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        self.data[self.index(addr)]
    }

    pub fn write_byte(&mut self, addr: u32, data: u8) {
        let idx = self.index(addr);
        self.data[idx] = data;
    }

    pub fn read_halfword(&self, addr: u32) -> u16 {
        let idx = self.index(addr & !1);
        u16::from_le_bytes([self.data[idx], self.data[idx + 1]])
    }

    pub fn write_halfword(&mut self, addr: u32, data: u16) {
        let idx = self.index(addr & !1);
        self.data[idx..(idx + 2)].copy_from_slice(&data.to_le_bytes());
    }

    pub fn read_word(&self, addr: u32) -> u32 {
        let idx = self.index(addr & !3);
        u32::from_le_bytes([self.data[idx], self.data[idx + 1], self.data[idx + 2], self.data[idx + 3]])
    }

    pub fn write_word(&mut self, addr: u32, data: u32) {
        let idx = self.index(addr & !3);
        self.data[idx..(idx + 4)].copy_from_slice(&data.to_le_bytes());
    }
}
