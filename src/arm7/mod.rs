/// ARM7TDMI processor.


use log::{debug, trace};

use crate::core::{
    constants::*,
    decode::classify,
    ExecContext,
    Mode,
    RegisterFile,
    SwiHook,
    CPSR
};
use crate::bus::SystemBus;
use crate::error::{CoreError, StateError};
use crate::interrupt::InterruptType;
use crate::memory::Mem32;
use crate::snapshot::{CpuSnapshot, SNAPSHOT_VERSION};
use crate::{Debugger, CPUState};

/// Cost of entering an interrupt handler.
const IRQ_CYCLES: usize = 3;
/// Cost of a step while halted.
const HALT_CYCLES: usize = 1;

/// Stack pointers set up by the BIOS before it jumps to the cartridge.
const BIOS_SVC_SP: u32 = 0x0300_7FE0;
const BIOS_IRQ_SP: u32 = 0x0300_7FA0;

/// Builder class for the ARM7.
///
/// Call `build` to finish building.
pub struct ARM7TDMIBuilder {
    bus:        SystemBus,
    swi_hook:   Option<SwiHook<SystemBus>>,
    initial_sp: Option<u32>,
    entry:      Option<u32>,
}

impl ARM7TDMIBuilder {
    pub fn build(self) -> ARM7TDMI {
        let mut regs = RegisterFile::new();
        if let Some(entry) = self.entry {
            regs.set_banked_sp(Mode::SVC, BIOS_SVC_SP);
            regs.set_banked_sp(Mode::IRQ, BIOS_IRQ_SP);
            regs.set_pc(entry);
        }
        if let Some(sp) = self.initial_sp {
            regs.write(SP_REG, sp);
        }
        ARM7TDMI {
            regs,
            bus:        self.bus,
            cycles:     0,
            swi_hook:   self.swi_hook,
        }
    }

    /// Handle SWI calls on the host instead of in the BIOS.
    pub fn set_swi_hook(mut self, swi_hook: SwiHook<SystemBus>) -> Self {
        self.swi_hook = Some(swi_hook);
        self
    }

    /// Stack pointer for the starting (system) mode.
    pub fn set_initial_sp(mut self, sp: u32) -> Self {
        self.initial_sp = Some(sp);
        self
    }

    /// Start executing at `entry` with the registers the BIOS leaves behind.
    pub fn skip_bios(mut self, entry: u32) -> Self {
        self.entry = Some(entry);
        self
    }
}

pub struct ARM7TDMI {
    regs:       RegisterFile,
    bus:        SystemBus,
    cycles:     u64,
    swi_hook:   Option<SwiHook<SystemBus>>,
}

impl ARM7TDMI {
    pub fn new(bus: SystemBus) -> ARM7TDMIBuilder {
        ARM7TDMIBuilder {
            bus,
            swi_hook:   None,
            initial_sp: None,
            entry:      None,
        }
    }

    /// Service an interrupt, wait in halt, or execute a single instruction.
    ///
    /// Returns how many cycles passed.
    /// If the instruction can't be executed, nothing changes and the error is returned.
    pub fn step(&mut self) -> Result<usize, CoreError> {
        self.bus.deliver_interrupts();

        let cycles = if let Some(kind) = self.pending_interrupt() {
            self.enter_interrupt(kind)
        } else if self.bus.interrupts().is_halted() {
            HALT_CYCLES
        } else {
            self.execute_next()?
        };

        self.cycles += cycles as u64;
        Ok(cycles)
    }

    /// Flag an interrupt in the controller.
    pub fn request_interrupt(&mut self, kind: InterruptType) {
        self.bus.interrupts_mut().request_interrupt(kind);
    }

    /// Cycles passed since reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    pub fn save_state(&self) -> CpuSnapshot {
        CpuSnapshot {
            version:    SNAPSHOT_VERSION.to_string(),
            regs:       *self.regs.regs(),
            cpsr:       self.regs.read_status().bits(),
            banks:      *self.regs.banks(),
            mode:       self.regs.mode(),
            thumb:      self.regs.is_thumb(),
            cycles:     self.cycles,
            interrupts: self.bus.interrupts().registers(),
            halted:     self.bus.interrupts().is_halted(),
        }
    }

    /// Restore a snapshot. The snapshot is checked fully before anything is modified.
    pub fn load_state(&mut self, snapshot: &CpuSnapshot) -> Result<(), StateError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StateError::Version {
                expected:   SNAPSHOT_VERSION.to_string(),
                found:      snapshot.version.clone(),
            });
        }

        let cpsr = CPSR::from_bits_truncate(snapshot.cpsr);
        let invalid_mode = StateError::InvalidMode(snapshot.cpsr & CPSR::MODE.bits());
        let mode = cpsr.mode().ok_or(invalid_mode)?;
        if mode != snapshot.mode {
            return Err(StateError::ModeMismatch {
                mode:   snapshot.mode as u32,
                cpsr:   snapshot.cpsr,
            });
        }
        if cpsr.contains(CPSR::T) != snapshot.thumb {
            return Err(StateError::ThumbMismatch(snapshot.cpsr));
        }
        let regs = RegisterFile::from_parts(snapshot.regs, cpsr, snapshot.banks)
            .ok_or(StateError::InvalidMode(snapshot.cpsr & CPSR::MODE.bits()))?;

        self.regs = regs;
        self.cycles = snapshot.cycles;
        self.bus.interrupts_mut().restore(&snapshot.interrupts, snapshot.halted);
        self.bus.clear_requests();
        debug!("Loaded state: PC {:08X}, mode {:?}, cycles {}", self.regs.pc(), mode, self.cycles);
        Ok(())
    }
}

// Internal
impl ARM7TDMI {
    /// An interrupt to take now. Only IME and IE gate this.
    fn pending_interrupt(&mut self) -> Option<InterruptType> {
        if !self.bus.interrupts().check_pending() {
            None
        } else {
            self.bus.interrupts_mut().acknowledge()
        }
    }

    fn enter_interrupt(&mut self, kind: InterruptType) -> usize {
        let cpsr = self.regs.read_status();
        let return_addr = self.regs.pc().wrapping_sub(I_SIZE);
        debug!("Interrupt {:?} at {:08X}", kind, self.regs.pc());

        self.regs.switch_mode(Mode::IRQ);
        self.regs.write_spsr(cpsr);
        self.regs.write(LINK_REG, return_addr);
        self.regs.set_flags(CPSR::I | CPSR::T, CPSR::I);
        self.regs.set_pc(IRQ_VECTOR);
        IRQ_CYCLES
    }

    fn execute_next(&mut self) -> Result<usize, CoreError> {
        let pc = self.regs.pc();
        let thumb = self.regs.is_thumb();
        let (word, size) = if thumb {
            (self.bus.load_halfword(pc) as u32, T_SIZE)
        } else {
            (self.bus.load_word(pc), I_SIZE)
        };

        let instr = classify(word, thumb).map_err(|_| CoreError::Undefined { addr: pc, word })?;
        trace!("{:08X}: {}", pc, instr);

        let executed = ExecContext::new(&mut self.regs, &mut self.bus)
            .with_swi_hook(self.swi_hook)
            .execute(instr)?;
        if !executed.branched {
            self.regs.set_pc(pc.wrapping_add(size));
        }
        Ok(executed.cycles)
    }
}

impl Debugger for ARM7TDMI {
    fn inspect_state(&mut self) -> CPUState {
        let pc = self.regs.pc();
        let thumb_mode = self.regs.is_thumb();
        let next_word = if thumb_mode {
            self.bus.load_halfword(pc) as u32
        } else {
            self.bus.load_word(pc)
        };
        CPUState {
            regs:       *self.regs.regs(),
            flags:      self.regs.read_status().bits(),
            thumb_mode,
            mode:       self.regs.mode(),
            interrupts: self.bus.interrupts().state(),
            cycles:     self.cycles,

            next_word,
            next_instr: classify(next_word, thumb_mode).ok(),
        }
    }
}
