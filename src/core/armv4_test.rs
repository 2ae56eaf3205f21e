use crate::core::{
    constants::*,
    decode::classify,
    test_utils::*,
    ExecContext,
    Mode,
    RegisterFile,
    CPSR
};
use crate::error::CoreError;
use crate::memory::Mem32;

/// Run a single wide instruction at the current PC.
fn exec(regs: &mut RegisterFile, mem: &mut TestMem, word: u32) -> Result<usize, CoreError> {
    let instr = classify(word, false).unwrap();
    ExecContext::new(regs, mem).execute(instr).map(|e| e.cycles)
}

#[test]
fn test_logic() {
    let data = vec![
        (
            // AND R2, R0, R1: Cond=AL, I=0, Instr=0, S=0, Rn=0, Rd=2, Sh=0, Rm=1
            TestIn {
                regs: vec![0x15151515, 0x84848484, 1],
                cpsr: None,
                instr: 0xE0002001
            },
            TestOut {
                regs: vec![None, None, Some(0x04040404)],
                cpsr: Some(CPSR::default()),
                cycles: Some(1),
            }
        ),
        (
            // AND R1, R0, #0x1F0000: Cond=AL, I=1, Instr=0, S=0, Rn=0, Rd=1, Rot=16, Imm=1F
            TestIn {
                regs: vec![0x95959595, 1],
                cpsr: None,
                instr: 0xE200181F
            },
            TestOut {
                regs: vec![None, Some(0x150000)],
                cpsr: Some(CPSR::default()),
                cycles: Some(1),
            }
        ),
        (
            // ANDS R1, R0, #0: Cond=AL, I=1, Instr=0, S=1, Rn=0, Rd=1, Rot=0, Imm=0
            TestIn {
                regs: vec![0x95959595, 1],
                cpsr: None,
                instr: 0xE2101000
            },
            TestOut {
                regs: vec![None, Some(0)],
                cpsr: Some(CPSR::Z),
                cycles: None,
            }
        ),
        (
            // TST R0, #0x80000000: Cond=AL, I=1, Instr=8, S=1, Rn=0, Rot=1, Imm=2
            // Carry comes from the rotated immediate.
            TestIn {
                regs: vec![0x80000000],
                cpsr: None,
                instr: 0xE3100102
            },
            TestOut {
                regs: vec![Some(0x80000000)],
                cpsr: Some(CPSR::N | CPSR::C),
                cycles: Some(1),
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_arithmetic() {
    let data = vec![
        (
            // SUBS R2, R0, R1: Cond=AL, I=0, Instr=2, S=1, Rn=0, Rd=2, Sh=0, Rm=1
            TestIn {
                regs: vec![5, 3],
                cpsr: None,
                instr: 0xE0502001
            },
            TestOut {
                regs: vec![None, None, Some(2)],
                cpsr: Some(CPSR::C),
                cycles: Some(1),
            }
        ),
        (
            // SUBS R2, R0, R1: borrow
            TestIn {
                regs: vec![3, 5],
                cpsr: None,
                instr: 0xE0502001
            },
            TestOut {
                regs: vec![None, None, Some(0xFFFFFFFE)],
                cpsr: Some(CPSR::N),
                cycles: None,
            }
        ),
        (
            // ADDS R2, R0, R1: Cond=AL, I=0, Instr=4, S=1, Rn=0, Rd=2, Sh=0, Rm=1
            TestIn {
                regs: vec![0x80000000, 0x80000000],
                cpsr: None,
                instr: 0xE0902001
            },
            TestOut {
                regs: vec![None, None, Some(0)],
                cpsr: Some(CPSR::Z | CPSR::C | CPSR::V),
                cycles: Some(1),
            }
        ),
        (
            // ADDS R2, R0, R1: signed overflow
            TestIn {
                regs: vec![0x7FFFFFFF, 1],
                cpsr: None,
                instr: 0xE0902001
            },
            TestOut {
                regs: vec![None, None, Some(0x80000000)],
                cpsr: Some(CPSR::N | CPSR::V),
                cycles: None,
            }
        ),
        (
            // ADC R2, R0, R1: Cond=AL, I=0, Instr=5, S=0, Rn=0, Rd=2, Sh=0, Rm=1
            TestIn {
                regs: vec![1, 2],
                cpsr: Some(CPSR::C),
                instr: 0xE0A02001
            },
            TestOut {
                regs: vec![None, None, Some(4)],
                cpsr: Some(CPSR::C),
                cycles: None,
            }
        ),
        (
            // SBCS R2, R0, R1: Cond=AL, I=0, Instr=6, S=1, Rn=0, Rd=2, Sh=0, Rm=1
            TestIn {
                regs: vec![5, 3],
                cpsr: None,
                instr: 0xE0D02001
            },
            TestOut {
                regs: vec![None, None, Some(1)],
                cpsr: Some(CPSR::C),
                cycles: None,
            }
        ),
        (
            // RSBS R2, R0, #0: Cond=AL, I=1, Instr=3, S=1, Rn=0, Rd=2, Rot=0, Imm=0
            TestIn {
                regs: vec![1],
                cpsr: None,
                instr: 0xE2702000
            },
            TestOut {
                regs: vec![None, None, Some(0xFFFFFFFF)],
                cpsr: Some(CPSR::N),
                cycles: None,
            }
        ),
        (
            // CMP R0, R1: Cond=AL, I=0, Instr=A, S=1, Rn=0, Sh=0, Rm=1
            TestIn {
                regs: vec![7, 7, 0x1234],
                cpsr: None,
                instr: 0xE1500001
            },
            TestOut {
                regs: vec![Some(7), Some(7), Some(0x1234)],
                cpsr: Some(CPSR::Z | CPSR::C),
                cycles: Some(1),
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_shifts() {
    let data = vec![
        (
            // MOVS R0, R1: LSL #0 leaves C alone
            TestIn {
                regs: vec![0, 0x80000001],
                cpsr: Some(CPSR::C),
                instr: 0xE1B00001
            },
            TestOut {
                regs: vec![Some(0x80000001)],
                cpsr: Some(CPSR::N | CPSR::C),
                cycles: Some(1),
            }
        ),
        (
            // MOVS R0, R1 with C clear
            TestIn {
                regs: vec![0, 0x80000001],
                cpsr: None,
                instr: 0xE1B00001
            },
            TestOut {
                regs: vec![Some(0x80000001)],
                cpsr: Some(CPSR::N),
                cycles: Some(1),
            }
        ),
        (
            // MOVS R0, R1 with a zero result
            TestIn {
                regs: vec![5, 0],
                cpsr: Some(CPSR::C | CPSR::V),
                instr: 0xE1B00001
            },
            TestOut {
                regs: vec![Some(0)],
                cpsr: Some(CPSR::Z | CPSR::C | CPSR::V),
                cycles: None,
            }
        ),
        (
            // MOVS R0, R1, LSL #1: Cond=AL, I=0, Instr=D, S=1, Rd=0, Sh=LSL 1, Rm=1
            TestIn {
                regs: vec![0, 0x80000001],
                cpsr: None,
                instr: 0xE1B00081
            },
            TestOut {
                regs: vec![Some(2)],
                cpsr: Some(CPSR::C),
                cycles: Some(1),
            }
        ),
        (
            // MOVS R0, R1, LSR #32
            TestIn {
                regs: vec![0, 0x80000000],
                cpsr: None,
                instr: 0xE1B00021
            },
            TestOut {
                regs: vec![Some(0)],
                cpsr: Some(CPSR::Z | CPSR::C),
                cycles: None,
            }
        ),
        (
            // MOVS R0, R1, ASR #32
            TestIn {
                regs: vec![0, 0x80000000],
                cpsr: None,
                instr: 0xE1B00041
            },
            TestOut {
                regs: vec![Some(0xFFFFFFFF)],
                cpsr: Some(CPSR::N | CPSR::C),
                cycles: None,
            }
        ),
        (
            // MOVS R0, R1, RRX
            TestIn {
                regs: vec![0, 2],
                cpsr: Some(CPSR::C),
                instr: 0xE1B00061
            },
            TestOut {
                regs: vec![Some(0x80000001)],
                cpsr: Some(CPSR::N),
                cycles: None,
            }
        ),
        (
            // MOVS R0, R1, LSL R2: Cond=AL, I=0, Instr=D, S=1, Rd=0, Rs=2, Sh=LSL, Rm=1
            TestIn {
                regs: vec![0, 1, 32],
                cpsr: None,
                instr: 0xE1B00211
            },
            TestOut {
                regs: vec![Some(0)],
                cpsr: Some(CPSR::Z | CPSR::C),
                cycles: Some(2),
            }
        ),
        (
            // MOVS R0, R1, LSL R2: only the bottom byte of R2 counts
            TestIn {
                regs: vec![0, 5, 0x100],
                cpsr: Some(CPSR::C),
                instr: 0xE1B00211
            },
            TestOut {
                regs: vec![Some(5)],
                cpsr: Some(CPSR::C),
                cycles: Some(2),
            }
        ),
        (
            // MOVS R0, R1, LSR R2: more than 32
            TestIn {
                regs: vec![0, 0xFFFFFFFF, 33],
                cpsr: Some(CPSR::C),
                instr: 0xE1B00231
            },
            TestOut {
                regs: vec![Some(0)],
                cpsr: Some(CPSR::Z),
                cycles: None,
            }
        ),
        (
            // MOVS R0, R1, ROR R2: multiple of 32
            TestIn {
                regs: vec![0, 0x80000000, 32],
                cpsr: None,
                instr: 0xE1B00271
            },
            TestOut {
                regs: vec![Some(0x80000000)],
                cpsr: Some(CPSR::N | CPSR::C),
                cycles: None,
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_multiply() {
    let data = vec![
        (
            // MUL R0, R1, R2: Cond=AL, A=0, S=0, Rd=0, Rs=2, Rm=1
            TestIn {
                regs: vec![0, 3, 4],
                cpsr: None,
                instr: 0xE0000291
            },
            TestOut {
                regs: vec![Some(12)],
                cpsr: Some(CPSR::default()),
                cycles: Some(3),
            }
        ),
        (
            // MLAS R0, R1, R2, R3: Cond=AL, A=1, S=1, Rd=0, Rn=3, Rs=2, Rm=1
            TestIn {
                regs: vec![0, 0xFFFFFFFF, 1, 1],
                cpsr: Some(CPSR::C | CPSR::V),
                instr: 0xE0303291
            },
            TestOut {
                regs: vec![Some(0)],
                cpsr: Some(CPSR::Z | CPSR::C | CPSR::V),
                cycles: Some(4),
            }
        ),
        (
            // UMULL R0, R1, R2, R3: Cond=AL, U=0, A=0, S=0, RdHi=1, RdLo=0, Rs=3, Rm=2
            TestIn {
                regs: vec![0, 0, 0xFFFFFFFF, 2],
                cpsr: None,
                instr: 0xE0810392
            },
            TestOut {
                regs: vec![Some(0xFFFFFFFE), Some(1)],
                cpsr: None,
                cycles: Some(4),
            }
        ),
        (
            // SMULLS R0, R1, R2, R3: Cond=AL, U=1, A=0, S=1, RdHi=1, RdLo=0, Rs=3, Rm=2
            TestIn {
                regs: vec![0, 0, 0xFFFFFFFF, 2],
                cpsr: None,
                instr: 0xE0D10392
            },
            TestOut {
                regs: vec![Some(0xFFFFFFFE), Some(0xFFFFFFFF)],
                cpsr: Some(CPSR::N),
                cycles: Some(4),
            }
        ),
        (
            // UMLAL R0, R1, R2, R3: Cond=AL, U=0, A=1, S=0, RdHi=1, RdLo=0, Rs=3, Rm=2
            TestIn {
                regs: vec![1, 0, 0xFFFFFFFF, 1],
                cpsr: None,
                instr: 0xE0A10392
            },
            TestOut {
                regs: vec![Some(0), Some(1)],
                cpsr: None,
                cycles: Some(5),
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_branch() {
    let mut regs = vec![0; 16];
    regs[PC_REG] = 0x1000;
    let with_pc = |r0: u32| {
        let mut regs = regs.clone();
        regs[0] = r0;
        regs
    };

    let data = vec![
        (
            // B #8: Cond=AL, L=0, Offset=2
            TestIn {
                regs: with_pc(0),
                cpsr: None,
                instr: 0xEA000002
            },
            TestOut {
                regs: vec![None; 15].into_iter().chain(Some(Some(0x1010))).collect(),
                cpsr: None,
                cycles: Some(3),
            }
        ),
        (
            // BL #16: Cond=AL, L=1, Offset=4
            TestIn {
                regs: with_pc(0),
                cpsr: None,
                instr: 0xEB000004
            },
            TestOut {
                regs: vec![None; 14].into_iter().chain(vec![Some(0x0FFC), Some(0x1018)]).collect(),
                cpsr: None,
                cycles: Some(3),
            }
        ),
        (
            // BNE #8: Cond=NE, not taken.
            TestIn {
                regs: with_pc(0),
                cpsr: Some(CPSR::Z),
                instr: 0x1A000002
            },
            TestOut {
                regs: vec![None; 15].into_iter().chain(Some(Some(0x1004))).collect(),
                cpsr: Some(CPSR::Z),
                cycles: Some(1),
            }
        ),
        (
            // BX R0: into thumb.
            TestIn {
                regs: with_pc(0x1201),
                cpsr: None,
                instr: 0xE12FFF10
            },
            TestOut {
                regs: vec![None; 15].into_iter().chain(Some(Some(0x1200))).collect(),
                cpsr: Some(CPSR::T),
                cycles: Some(3),
            }
        ),
        (
            // MOV PC, R0: Cond=AL, I=0, Instr=D, S=0, Rd=15, Rm=0
            TestIn {
                regs: with_pc(0x1233),
                cpsr: None,
                instr: 0xE1A0F000
            },
            TestOut {
                regs: vec![None; 15].into_iter().chain(Some(Some(0x1230))).collect(),
                cpsr: None,
                cycles: Some(3),
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_single_transfer() {
    let data = vec![
        (
            // LDR R0, [R1]: Cond=AL, I=0, P=1, U=1, B=0, W=0, L=1, Rn=1, Rd=0
            TestIn {
                regs: vec![0, 0x100],
                cpsr: None,
                instr: 0xE5910000
            },
            TestOut {
                regs: vec![Some(0x03020100), Some(0x100)],
                cpsr: None,
                cycles: Some(4),
            }
        ),
        (
            // LDR R0, [R1]: misaligned address rotates the word.
            TestIn {
                regs: vec![0, 0x101],
                cpsr: None,
                instr: 0xE5910000
            },
            TestOut {
                regs: vec![Some(0x00030201)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDR R0, [R1, #4]!
            TestIn {
                regs: vec![0, 0x100],
                cpsr: None,
                instr: 0xE5B10004
            },
            TestOut {
                regs: vec![Some(0x07060504), Some(0x104)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDR R0, [R1], #4
            TestIn {
                regs: vec![0, 0x100],
                cpsr: None,
                instr: 0xE4910004
            },
            TestOut {
                regs: vec![Some(0x03020100), Some(0x104)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDRB R0, [R1, #-1]
            TestIn {
                regs: vec![0, 0x105],
                cpsr: None,
                instr: 0xE5510001
            },
            TestOut {
                regs: vec![Some(0x04), Some(0x105)],
                cpsr: None,
                cycles: Some(3),
            }
        ),
        (
            // LDR PC, [R1]
            TestIn {
                regs: vec![0, 0x100],
                cpsr: None,
                instr: 0xE591F000
            },
            TestOut {
                regs: vec![None; 15].into_iter().chain(Some(Some(0x03020100))).collect(),
                cpsr: None,
                cycles: Some(6),
            }
        ),
        (
            // LDRH R0, [R1]
            TestIn {
                regs: vec![0, 0x102],
                cpsr: None,
                instr: 0xE1D100B0
            },
            TestOut {
                regs: vec![Some(0x0302)],
                cpsr: None,
                cycles: Some(3),
            }
        ),
        (
            // LDRH R0, [R1]: misaligned
            TestIn {
                regs: vec![0, 0x101],
                cpsr: None,
                instr: 0xE1D100B0
            },
            TestOut {
                regs: vec![Some(0x00000001)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDRSB R0, [R1]
            TestIn {
                regs: vec![0, 0x80],
                cpsr: None,
                instr: 0xE1D100D0
            },
            TestOut {
                regs: vec![Some(0xFFFFFF80)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDRSH R0, [R1]
            TestIn {
                regs: vec![0, 0x1FE],
                cpsr: None,
                instr: 0xE1D100F0
            },
            TestOut {
                regs: vec![Some(0xFFFFFFFE)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDRSH R0, [R1]: misaligned loads a signed byte
            TestIn {
                regs: vec![0, 0x181],
                cpsr: None,
                instr: 0xE1D100F0
            },
            TestOut {
                regs: vec![Some(0xFFFFFF81)],
                cpsr: None,
                cycles: None,
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_block_transfer() {
    let data = vec![
        (
            // LDMIA R0!, {R1-R3}
            TestIn {
                regs: vec![0x100],
                cpsr: None,
                instr: 0xE8B0000E
            },
            TestOut {
                regs: vec![Some(0x10C), Some(0x03020100), Some(0x07060504), Some(0x0B0A0908)],
                cpsr: None,
                cycles: Some(5),
            }
        ),
        (
            // LDMDB R0, {R1, R2}
            TestIn {
                regs: vec![0x108],
                cpsr: None,
                instr: 0xE9100006
            },
            TestOut {
                regs: vec![Some(0x108), Some(0x03020100), Some(0x07060504)],
                cpsr: None,
                cycles: Some(4),
            }
        ),
        (
            // LDMIB R0!, {R1}
            TestIn {
                regs: vec![0x100],
                cpsr: None,
                instr: 0xE9B00002
            },
            TestOut {
                regs: vec![Some(0x104), Some(0x07060504)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDMDA R0, {R1, R2}
            TestIn {
                regs: vec![0x108],
                cpsr: None,
                instr: 0xE8100006
            },
            TestOut {
                regs: vec![Some(0x108), Some(0x07060504), Some(0x0B0A0908)],
                cpsr: None,
                cycles: None,
            }
        ),
        (
            // LDMIA R0, {R1}: misaligned base is forced to a word boundary
            TestIn {
                regs: vec![0x102],
                cpsr: None,
                instr: 0xE8900002
            },
            TestOut {
                regs: vec![Some(0x102), Some(0x03020100)],
                cpsr: None,
                cycles: None,
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_stores() {
    let mut mem = TestMem::new(0x2000);

    // STR R0, [R1]
    let (_, cycles) = TestIn {
        regs: vec![0xDEADBEEF, 0x100],
        cpsr: None,
        instr: 0xE5810000
    }.run(&mut mem);
    assert_eq!(mem.load_word(0x100), 0xDEADBEEF);
    assert_eq!(cycles, 3);

    // STRB R0, [R1, #1]
    TestIn {
        regs: vec![0xAB, 0x200],
        cpsr: None,
        instr: 0xE5C10001
    }.run(&mut mem);
    assert_eq!(mem.load_word(0x200), 0x0302AB00);

    // STRH R0, [R1]
    TestIn {
        regs: vec![0x1234ABCD, 0x302],
        cpsr: None,
        instr: 0xE1C100B0
    }.run(&mut mem);
    assert_eq!(mem.load_word(0x300), 0xABCD0100);

    // STR PC, [R1] stores the instruction address + 12.
    let mut regs = vec![0; 16];
    regs[1] = 0x400;
    regs[PC_REG] = 0x100;
    TestIn {
        regs,
        cpsr: None,
        instr: 0xE581F000
    }.run(&mut mem);
    assert_eq!(mem.load_word(0x400), 0x10C);

    // STMDB SP!, {R0, R1}
    let mut regs = vec![0; 16];
    regs[0] = 0x11111111;
    regs[1] = 0x22222222;
    regs[SP_REG] = 0x600;
    let (regs, cycles) = TestIn {
        regs,
        cpsr: None,
        instr: 0xE92D0003
    }.run(&mut mem);
    assert_eq!(regs.read(SP_REG), 0x5F8);
    assert_eq!(mem.load_word(0x5F8), 0x11111111);
    assert_eq!(mem.load_word(0x5FC), 0x22222222);
    assert_eq!(cycles, 3);
}

#[test]
fn test_swap() {
    let mut mem = TestMem::new(0x2000);

    // SWP R0, R2, [R1]
    let (regs, cycles) = TestIn {
        regs: vec![0, 0x100, 0x12345678],
        cpsr: None,
        instr: 0xE1010092
    }.run(&mut mem);
    assert_eq!(regs.read(0), 0x03020100);
    assert_eq!(mem.load_word(0x100), 0x12345678);
    assert_eq!(cycles, 4);

    // SWPB R0, R2, [R1]
    let (regs, _) = TestIn {
        regs: vec![0, 0x205, 0xFF],
        cpsr: None,
        instr: 0xE1410092
    }.run(&mut mem);
    assert_eq!(regs.read(0), 0x05);
    assert_eq!(mem.load_byte(0x205), 0xFF);
}

#[test]
fn test_psr_transfer() {
    let data = vec![
        (
            // MRS R0, CPSR
            TestIn {
                regs: vec![],
                cpsr: Some(CPSR::N),
                instr: 0xE10F0000
            },
            TestOut {
                regs: vec![Some(0x8000001F)],
                cpsr: Some(CPSR::N),
                cycles: Some(1),
            }
        ),
        (
            // MSR CPSR_f, #0xF0000000
            TestIn {
                regs: vec![],
                cpsr: None,
                instr: 0xE328F20F
            },
            TestOut {
                regs: vec![],
                cpsr: Some(CPSR::N | CPSR::Z | CPSR::C | CPSR::V),
                cycles: Some(1),
            }
        ),
        (
            // MSR CPSR_c, R0: the T bit cannot be written.
            TestIn {
                regs: vec![0x3F],
                cpsr: None,
                instr: 0xE121F000
            },
            TestOut {
                regs: vec![],
                cpsr: Some(CPSR::default()),
                cycles: None,
            }
        ),
    ];

    run_tests(data);
}

#[test]
fn test_msr_mode_switch() {
    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.write(0, Mode::IRQ as u32 | CPSR::I.bits());

    // MSR CPSR_c, R0
    exec(&mut regs, &mut mem, 0xE121F000).unwrap();
    assert_eq!(regs.mode(), Mode::IRQ);
    assert!(regs.get_flag(CPSR::I));
    // IRQ has its own stack pointer.
    assert_eq!(regs.read(SP_REG), 0);

    // MSR SPSR_fc, R0
    regs.write(0, 0x8000_0010);
    exec(&mut regs, &mut mem, 0xE169F000).unwrap();
    assert_eq!(regs.read_spsr().bits(), 0x8000_0010);
}

#[test]
fn test_msr_user_mode() {
    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.switch_mode(Mode::USR);
    regs.write(0, 0xF000_0013);

    // MSR CPSR_fc, R0: only the flags change in User mode.
    exec(&mut regs, &mut mem, 0xE129F000).unwrap();
    assert_eq!(regs.mode(), Mode::USR);
    assert_eq!(regs.read_status().bits(), 0xF000_0010);
}

#[test]
fn test_return_from_exception() {
    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.switch_mode(Mode::SVC);
    regs.write_spsr(CPSR::from_bits_truncate(0x2000_0030));
    regs.write(LINK_REG, 0x2001);

    // MOVS PC, LR
    let cycles = exec(&mut regs, &mut mem, 0xE1B0F00E).unwrap();
    assert_eq!(regs.mode(), Mode::USR);
    assert!(regs.is_thumb());
    assert!(regs.get_flag(CPSR::C));
    assert_eq!(regs.pc(), 0x2000);
    assert_eq!(cycles, 3);
}

#[test]
fn test_ldm_user_bank() {
    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.switch_mode(Mode::IRQ);
    regs.write(0, 0x100);
    regs.write(SP_REG, 0x1234);

    // LDMIA R0, {SP}^
    exec(&mut regs, &mut mem, 0xE8D02000).unwrap();
    assert_eq!(regs.read(SP_REG), 0x1234);
    assert_eq!(regs.read_usr(SP_REG), 0x03020100);
}

#[test]
fn test_swi() {
    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.set_pc(0x1000);
    regs.set_flags(CPSR::N, CPSR::N);

    // SWI #0x10
    let cycles = exec(&mut regs, &mut mem, 0xEF000010).unwrap();
    assert_eq!(regs.mode(), Mode::SVC);
    assert_eq!(regs.pc(), SWI_VECTOR);
    assert_eq!(regs.read(LINK_REG), 0x1004);
    assert_eq!(regs.read_spsr().bits(), 0x8000_001F);
    assert!(regs.get_flag(CPSR::I));
    assert_eq!(cycles, 3);
}

#[test]
fn test_swi_hook() {
    fn hook(comment: u32, mem: &mut TestMem, args: &[u32; 4]) -> [u32; 3] {
        mem.store_word(0x100, args[2]);
        [args[0] + args[1], comment, 7]
    }

    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.set_pc(0x1000);
    regs.write(0, 2);
    regs.write(1, 3);
    regs.write(2, 0xCAFE);

    let instr = classify(0xEF000006, false).unwrap();
    let executed = ExecContext::new(&mut regs, &mut mem)
        .with_swi_hook(Some(hook))
        .execute(instr)
        .unwrap();

    assert!(!executed.branched);
    assert_eq!(regs.mode(), Mode::SYS);
    assert_eq!(regs.read(0), 5);
    assert_eq!(regs.read(1), 6);
    assert_eq!(regs.read(3), 7);
    assert_eq!(mem.load_word(0x100), 0xCAFE);
}

#[test]
fn test_coprocessor() {
    let mut mem = TestMem::new(0x2000);
    let mut regs = RegisterFile::new();
    regs.set_pc(0x100);

    // MRC p15, 0, R0, c1, c0, 0
    let result = exec(&mut regs, &mut mem, 0xEE110F10);
    assert_eq!(result, Err(CoreError::NotImplemented{addr: 0x100, word: 0x03020100}));
    assert_eq!(regs.pc(), 0x100);
}
