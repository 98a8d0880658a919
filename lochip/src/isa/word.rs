//! Word instruction set: three 16-bit general registers A, X and Y, an index
//! register I and carry/negative/zero flags. Opcodes occupy 0x00-0x5B.

use std::fmt;

use log::warn;

use crate::cpu::{InstructionSet, Machine};
use crate::registers::{WordReg, WordRegisters};

/// Where the second operand of a load or an A-register operation comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// The word following the opcode
    Imm,
    /// The word in memory at I
    Ind,
    Reg(WordReg),
}

/// Where a jump, call or branch goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The word following the opcode
    Abs,
    /// The address held in I
    Index,
    /// The address of the operand word, plus that word
    Rel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    CarrySet,
    CarryClear,
    NegativeSet,
    NegativeClear,
    ZeroSet,
    ZeroClear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    And,
    Or,
    Xor,
    Add,
    Sub,
    Cmp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    ShiftLeft,
    ShiftRight,
    RotateLeft,
    RotateRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordOp {
    Exit,
    Input,
    Call(Target),
    Return,
    Jump(Target),
    Load(WordReg, Operand),
    Store(WordReg),
    Transfer { from: WordReg, to: WordReg },
    Alu(AluOp, Operand),
    Shift(ShiftOp),
    Branch(Cond, Target),
}

pub struct WordIsa;

impl InstructionSet for WordIsa {
    type Registers = WordRegisters;
    type Op = WordOp;

    fn decode(opcode: u8) -> Option<WordOp> {
        use WordReg::{A, I, X, Y};

        let op = match opcode {
            /* System */
            0x00 => WordOp::Exit,
            0x01 => WordOp::Input,

            /* Jumps and routines */
            0x0A => WordOp::Call(Target::Abs),
            0x0B => WordOp::Call(Target::Index),
            0x0C => WordOp::Return,
            0x0D => WordOp::Jump(Target::Abs),
            0x0E => WordOp::Jump(Target::Index),

            /* Load and store */
            0x10 => WordOp::Load(A, Operand::Imm),
            0x11 => WordOp::Load(A, Operand::Ind),
            0x12 => WordOp::Load(I, Operand::Imm),
            0x13 => WordOp::Load(X, Operand::Imm),
            0x14 => WordOp::Load(X, Operand::Ind),
            0x15 => WordOp::Load(Y, Operand::Imm),
            0x16 => WordOp::Load(Y, Operand::Ind),
            0x17 => WordOp::Store(A),
            0x18 => WordOp::Store(X),
            0x19 => WordOp::Store(Y),

            /* Register transfers */
            0x20 => WordOp::Transfer { from: A, to: X },
            0x21 => WordOp::Transfer { from: A, to: Y },
            0x22 => WordOp::Transfer { from: A, to: I },
            0x23 => WordOp::Transfer { from: I, to: A },
            0x24 => WordOp::Transfer { from: I, to: X },
            0x25 => WordOp::Transfer { from: I, to: Y },
            0x26 => WordOp::Transfer { from: X, to: A },
            0x27 => WordOp::Transfer { from: X, to: I },
            0x28 => WordOp::Transfer { from: X, to: Y },
            0x29 => WordOp::Transfer { from: Y, to: A },
            0x2A => WordOp::Transfer { from: Y, to: I },
            0x2B => WordOp::Transfer { from: Y, to: X },

            /* Logical and arithmetic, four operand forms each */
            0x30..=0x3B | 0x40..=0x4B => {
                let alu = match opcode {
                    0x30..=0x33 => AluOp::And,
                    0x34..=0x37 => AluOp::Or,
                    0x38..=0x3B => AluOp::Xor,
                    0x40..=0x43 => AluOp::Add,
                    0x44..=0x47 => AluOp::Sub,
                    _ => AluOp::Cmp,
                };
                let operand = match opcode % 4 {
                    0 => Operand::Imm,
                    1 => Operand::Ind,
                    2 => Operand::Reg(X),
                    _ => Operand::Reg(Y),
                };
                WordOp::Alu(alu, operand)
            }

            /* Shifts */
            0x4C => WordOp::Shift(ShiftOp::ShiftLeft),
            0x4D => WordOp::Shift(ShiftOp::ShiftRight),
            0x4E => WordOp::Shift(ShiftOp::RotateLeft),
            0x4F => WordOp::Shift(ShiftOp::RotateRight),

            /* Branches, even opcodes jump to I, odd ones are relative */
            0x50..=0x5B => {
                let cond = match (opcode - 0x50) / 2 {
                    0 => Cond::CarrySet,
                    1 => Cond::CarryClear,
                    2 => Cond::NegativeSet,
                    3 => Cond::NegativeClear,
                    4 => Cond::ZeroSet,
                    _ => Cond::ZeroClear,
                };
                let target = if opcode % 2 == 0 {
                    Target::Index
                } else {
                    Target::Rel
                };
                WordOp::Branch(cond, target)
            }

            _ => return None,
        };
        Some(op)
    }

    fn execute(op: WordOp, m: &mut Machine<WordRegisters>) {
        match op {
            WordOp::Exit => m.halt(),
            WordOp::Input => warn!("instruction IN is not implemented"),
            WordOp::Call(target) => {
                let addr = resolve(m, target);
                m.call(addr);
            }
            WordOp::Return => m.ret(),
            WordOp::Jump(target) => {
                let addr = resolve(m, target);
                m.pc = addr;
            }
            WordOp::Load(reg, operand) => {
                let value = read(m, operand);
                m.regs.set(reg, value);
            }
            WordOp::Store(reg) => m.memory.write_word(m.regs.i, m.regs.get(reg)),
            WordOp::Transfer { from, to } => {
                let value = m.regs.get(from);
                m.regs.set(to, value);
            }
            WordOp::Alu(alu, operand) => {
                let value = read(m, operand);
                alu_a(&mut m.regs, alu, value);
            }
            WordOp::Shift(shift) => shift_a(&mut m.regs, shift),
            WordOp::Branch(cond, target) => {
                // the operand is consumed whether or not the branch is taken
                let addr = resolve(m, target);
                if holds(&m.regs, cond) {
                    m.pc = addr;
                }
            }
        }
    }
}

fn read(m: &mut Machine<WordRegisters>, operand: Operand) -> u16 {
    match operand {
        Operand::Imm => m.fetch_word(),
        Operand::Ind => m.memory.fetch_word(m.regs.i),
        Operand::Reg(reg) => m.regs.get(reg),
    }
}

fn resolve(m: &mut Machine<WordRegisters>, target: Target) -> u16 {
    match target {
        Target::Abs => m.fetch_word(),
        Target::Index => m.regs.i,
        Target::Rel => {
            let base = m.pc;
            let offset = m.fetch_word();
            base.wrapping_add(offset)
        }
    }
}

fn holds(regs: &WordRegisters, cond: Cond) -> bool {
    let flags = regs.flags;
    match cond {
        Cond::CarrySet => flags.carry,
        Cond::CarryClear => !flags.carry,
        Cond::NegativeSet => flags.negative,
        Cond::NegativeClear => !flags.negative,
        Cond::ZeroSet => flags.zero,
        Cond::ZeroClear => !flags.zero,
    }
}

/// Signed sum exceeding 0x7FFF sets carry, signed difference below -0x8000
/// sets it as a borrow. CMP sets the flags of SUB without storing.
fn alu_a(regs: &mut WordRegisters, alu: AluOp, value: u16) {
    let a = regs.a;
    let wide = |v: u16| v as i16 as i32;
    match alu {
        AluOp::And => regs.set_a(a & value),
        AluOp::Or => regs.set_a(a | value),
        AluOp::Xor => regs.set_a(a ^ value),
        AluOp::Add => {
            regs.flags.carry = wide(a) + wide(value) > i16::MAX as i32;
            regs.set_a(a.wrapping_add(value));
        }
        AluOp::Sub => {
            regs.flags.carry = wide(a) - wide(value) < i16::MIN as i32;
            regs.set_a(a.wrapping_sub(value));
        }
        AluOp::Cmp => {
            regs.flags.carry = wide(a) - wide(value) < i16::MIN as i32;
            regs.set_nz(a.wrapping_sub(value));
        }
    }
}

/// Carry receives the bit shifted or rotated out
fn shift_a(regs: &mut WordRegisters, shift: ShiftOp) {
    let a = regs.a;
    let (carry, result) = match shift {
        ShiftOp::ShiftLeft => (a & 0x8000 != 0, a << 1),
        ShiftOp::ShiftRight => (a & 0x0001 != 0, a >> 1),
        ShiftOp::RotateLeft => (a & 0x8000 != 0, a.rotate_left(1)),
        ShiftOp::RotateRight => (a & 0x0001 != 0, a.rotate_right(1)),
    };
    regs.flags.carry = carry;
    regs.set_a(result);
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm => f.write_str("#imm"),
            Operand::Ind => f.write_str("[I]"),
            Operand::Reg(reg) => write!(f, "{:?}", reg),
        }
    }
}

impl fmt::Display for WordOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = |t: &Target| match t {
            Target::Abs => "abs",
            Target::Index => "I",
            Target::Rel => "rel",
        };
        match self {
            WordOp::Exit => f.write_str("EXIT"),
            WordOp::Input => f.write_str("IN"),
            WordOp::Call(t) => write!(f, "CAL {}", target(t)),
            WordOp::Return => f.write_str("RET"),
            WordOp::Jump(t) => write!(f, "JMP {}", target(t)),
            WordOp::Load(reg, operand) => write!(f, "LD{:?} {}", reg, operand),
            WordOp::Store(reg) => write!(f, "ST{:?} [I]", reg),
            WordOp::Transfer { from, to } => write!(f, "T{:?}{:?}", from, to),
            WordOp::Alu(alu, operand) => write!(f, "{:?} {}", alu, operand),
            WordOp::Shift(shift) => write!(f, "{:?}", shift),
            WordOp::Branch(cond, t) => write!(f, "B{:?} {}", cond, target(t)),
        }
    }
}
