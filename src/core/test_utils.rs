use crate::memory::*;
use crate::core::{
    decode::classify,
    constants::PC_REG,
    execute,
    RegisterFile,
    CPSR
};

/// Construct a word from bytes (high to low).
const fn make_32(bytes: &[u8]) -> u32 {
    ((bytes[3] as u32) << 24) |
    ((bytes[2] as u32) << 16) |
    ((bytes[1] as u32) << 8) |
    (bytes[0] as u32)
}

/// Memory where each byte holds the low byte of its own address.
pub struct TestMem(Vec<u32>);

impl TestMem {
    pub fn new(size: usize) -> Self {
        Self((0..size).map(|i| (i & 0xFF) as u8)
            .collect::<Vec<_>>()
            .chunks_exact(4)
            .map(make_32)
            .collect::<Vec<_>>()
        )
    }
}

impl Mem32 for TestMem {
    fn load_byte(&mut self, addr: u32) -> u8 {
        let idx = (addr >> 2) as usize;
        let data = self.0[idx];
        let shift = (addr & 3) * 8;
        (data >> shift) as u8
    }
    fn store_byte(&mut self, addr: u32, data: u8) {
        let idx = (addr >> 2) as usize;
        let stored = self.0[idx];
        let shift = (addr & 3) * 8;
        let mask = !(0xFF << shift);
        self.0[idx] = (stored & mask) | ((data as u32) << shift);
    }

    fn load_halfword(&mut self, addr: u32) -> u16 {
        let idx = (addr >> 2) as usize;
        let data = self.0[idx];
        let shift = (addr & 2) * 8;
        (data >> shift) as u16
    }
    fn store_halfword(&mut self, addr: u32, data: u16) {
        let idx = (addr >> 2) as usize;
        let stored = self.0[idx];
        let shift = (addr & 2) * 8;
        let mask = !(0xFFFF << shift);
        self.0[idx] = (stored & mask) | ((data as u32) << shift);
    }

    fn load_word(&mut self, addr: u32) -> u32 {
        let idx = (addr >> 2) as usize;
        self.0[idx]
    }
    fn store_word(&mut self, addr: u32, data: u32) {
        let idx = (addr >> 2) as usize;
        self.0[idx] = data;
    }
}

// Use to setup in state
#[derive(Default)]
pub struct TestIn {
    pub regs: Vec<u32>,
    /// Flags and control bits. The mode bits are ignored; tests run in System mode.
    pub cpsr: Option<CPSR>,
    pub instr: u32,
}

// Use to assert output state
#[derive(Default)]
pub struct TestOut {
    pub regs: Vec<Option<u32>>,
    /// Compared without the mode bits.
    pub cpsr: Option<CPSR>,
    pub cycles: Option<usize>,
}

impl TestIn {
    /// Decode and run the instruction, then advance the PC as the scheduler would.
    pub fn run(&self, mem: &mut TestMem) -> (RegisterFile, usize) {
        let mut regs = RegisterFile::new();
        for (i, val) in self.regs.iter().enumerate() {
            regs.write(i, *val);
        }
        if let Some(init_flags) = self.cpsr {
            regs.set_flags(CPSR::all(), init_flags);
        }

        let instr = classify(self.instr, regs.is_thumb()).unwrap();
        let size = regs.read_status().instr_size();
        let executed = execute(instr, &mut regs, mem).unwrap();
        if !executed.branched {
            let pc = regs.read(PC_REG);
            regs.write(PC_REG, pc.wrapping_add(size));
        }
        (regs, executed.cycles)
    }

    pub fn run_test(&self, out: &TestOut) {
        let mut mem = TestMem::new(0x2000);
        let (regs, cycles) = self.run(&mut mem);

        for (i, val) in out.regs.iter().enumerate() {
            if let Some(assert_reg) = val {
                assert_eq!(*assert_reg, regs.read(i), "r{} mismatch ({:08X})", i, self.instr);
            }
        }
        if let Some(assert_flags) = out.cpsr {
            let flags = regs.read_status() - CPSR::MODE;
            assert_eq!(assert_flags - CPSR::MODE, flags, "flags mismatch ({:08X})", self.instr);
        }
        if let Some(assert_cycles) = out.cycles {
            assert_eq!(assert_cycles, cycles, "cycles mismatch ({:08X})", self.instr);
        }
    }
}

/// Run each test case in turn.
pub fn run_tests(data: Vec<(TestIn, TestOut)>) {
    for (test_in, test_out) in data.iter() {
        test_in.run_test(test_out);
    }
}
