//! Byte instruction set in the CHIP-8 manner: two 8-bit registers Rx and Ry,
//! a flag register F, a 16-bit index register I, 60 Hz delay and sound timers,
//! the keypad and the sprite display. Opcodes are grouped by high nibble.

use std::fmt;
use std::time::Instant;

use log::warn;
use rand::Rng;

use crate::cpu::{Cpu, InstructionSet, Machine};
use crate::registers::{ByteReg, ByteRegisters};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteCond {
    /// Rx equals the byte operand
    EqImm,
    NeImm,
    /// Rx equals Ry
    EqReg,
    NeReg,
    FlagSet,
    FlagClear,
    /// The key numbered by Rx is held down
    KeyDown,
    KeyUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOp {
    LoadImm(ByteReg),
    LoadIndex,
    LoadInd(ByteReg),
    StoreInd(ByteReg),
    Transfer { from: ByteReg, to: ByteReg },
    AddToIndex,
    Jump,
    JumpIndex,
    JumpOffset,
    Call,
    CallIndex,
    Return,
    Branch(ByteCond),
    AddImm,
    Or,
    And,
    Xor,
    Add,
    Sub,
    SubReverse,
    ShiftRight,
    ShiftLeft,
    Random,
    StorePair,
    LoadPair,
    GetDelay,
    SetDelay,
    SetSound,
    WaitKey,
    Bcd,
    Exit,
    Draw,
    Clear,
    Interrupt,
}

pub struct ByteIsa;

impl InstructionSet for ByteIsa {
    type Registers = ByteRegisters;
    type Op = ByteOp;

    fn decode(opcode: u8) -> Option<ByteOp> {
        use ByteReg::{X, Y};

        let op = match opcode {
            0x10 => ByteOp::LoadImm(X),
            0x11 => ByteOp::LoadImm(Y),
            0x12 => ByteOp::LoadIndex,
            0x13 => ByteOp::LoadInd(X),
            0x14 => ByteOp::LoadInd(Y),
            0x15 => ByteOp::StoreInd(X),
            0x16 => ByteOp::StoreInd(Y),
            0x17 => ByteOp::Transfer { from: X, to: Y },
            0x18 => ByteOp::Transfer { from: Y, to: X },
            0x19 => ByteOp::AddToIndex,

            0x20 => ByteOp::Jump,
            0x21 => ByteOp::JumpIndex,
            0x22 => ByteOp::Call,
            0x23 => ByteOp::CallIndex,
            0x24 => ByteOp::Return,
            0x25 => ByteOp::JumpOffset,

            0x30 => ByteOp::Branch(ByteCond::EqImm),
            0x31 => ByteOp::Branch(ByteCond::NeImm),
            0x32 => ByteOp::Branch(ByteCond::EqReg),
            0x33 => ByteOp::Branch(ByteCond::NeReg),
            0x34 => ByteOp::Branch(ByteCond::FlagSet),
            0x35 => ByteOp::Branch(ByteCond::FlagClear),

            0x40 => ByteOp::AddImm,
            0x41 => ByteOp::Or,
            0x42 => ByteOp::And,
            0x43 => ByteOp::Xor,
            0x44 => ByteOp::Add,
            0x45 => ByteOp::Sub,
            0x46 => ByteOp::ShiftRight,
            0x47 => ByteOp::SubReverse,
            0x48 => ByteOp::ShiftLeft,

            0x50 => ByteOp::Random,

            0x60 => ByteOp::StorePair,
            0x61 => ByteOp::LoadPair,

            0x70 => ByteOp::GetDelay,
            0x71 => ByteOp::SetDelay,
            0x72 => ByteOp::SetSound,

            0x80 => ByteOp::Branch(ByteCond::KeyDown),
            0x81 => ByteOp::Branch(ByteCond::KeyUp),
            0x82 => ByteOp::WaitKey,

            0x90 => ByteOp::Bcd,
            0xAA => ByteOp::Exit,
            0xD0 => ByteOp::Draw,
            0xE0 => ByteOp::Clear,
            0xFE => ByteOp::Interrupt,
            _ => return None,
        };
        Some(op)
    }

    fn execute(op: ByteOp, m: &mut Machine<ByteRegisters>) {
        match op {
            ByteOp::LoadImm(reg) => op_load_imm(m, reg),
            ByteOp::LoadIndex => m.regs.i = m.fetch_word(),
            ByteOp::LoadInd(reg) => {
                let value = m.memory.fetch(m.regs.i);
                m.regs.set(reg, value);
            }
            ByteOp::StoreInd(reg) => m.memory.write(m.regs.i, m.regs.get(reg)),
            ByteOp::Transfer { from, to } => {
                let value = m.regs.get(from);
                m.regs.set(to, value);
            }
            ByteOp::AddToIndex => m.regs.i = m.regs.i.wrapping_add(m.regs.rx as u16),
            ByteOp::Jump => m.pc = m.fetch_word(),
            ByteOp::JumpIndex => m.pc = m.regs.i,
            ByteOp::JumpOffset => op_jump_offset(m),
            ByteOp::Call => {
                let addr = m.fetch_word();
                m.call(addr);
            }
            ByteOp::CallIndex => m.call(m.regs.i),
            ByteOp::Return => m.ret(),
            ByteOp::Branch(cond) => op_branch(m, cond),
            ByteOp::AddImm => {
                let nn = m.fetch_byte();
                m.regs.rx = m.regs.rx.wrapping_add(nn);
            }
            ByteOp::Or => m.regs.rx |= m.regs.ry,
            ByteOp::And => m.regs.rx &= m.regs.ry,
            ByteOp::Xor => m.regs.rx ^= m.regs.ry,
            ByteOp::Add => op_add(&mut m.regs),
            ByteOp::Sub => op_sub(&mut m.regs),
            ByteOp::SubReverse => op_sub_reverse(&mut m.regs),
            ByteOp::ShiftRight => op_shift_right(&mut m.regs),
            ByteOp::ShiftLeft => op_shift_left(&mut m.regs),
            ByteOp::Random => op_random(m),
            ByteOp::StorePair => {
                let i = m.regs.i;
                m.memory.write(i, m.regs.rx);
                m.memory.write(i.wrapping_add(1), m.regs.ry);
            }
            ByteOp::LoadPair => {
                let i = m.regs.i;
                m.regs.rx = m.memory.fetch(i);
                m.regs.ry = m.memory.fetch(i.wrapping_add(1));
            }
            ByteOp::GetDelay => m.regs.rx = m.regs.timers.delay,
            ByteOp::SetDelay => m.regs.timers.delay = m.regs.rx,
            ByteOp::SetSound => m.regs.timers.sound = m.regs.rx,
            ByteOp::WaitKey => op_wait_key(m),
            ByteOp::Bcd => op_bcd(m),
            ByteOp::Exit => m.halt(),
            ByteOp::Draw => op_draw(m),
            ByteOp::Clear => m.display.clear(),
            ByteOp::Interrupt => warn!("instruction INT is not implemented"),
        }
    }

    fn tick(m: &mut Machine<ByteRegisters>, now: Instant) {
        m.regs.timers.tick(now);
    }
}

impl Cpu<ByteIsa> {
    /// True while the sound timer is running
    pub fn is_sound_active(&self) -> bool {
        self.registers().timers.sound > 0
    }
}

/* Operations */

/// 0x10 LDX #nn, 0x11 LDY #nn
fn op_load_imm(m: &mut Machine<ByteRegisters>, reg: ByteReg) {
    let nn = m.fetch_byte();
    m.regs.set(reg, nn);
}

/// 0x25 JPX nnnn
fn op_jump_offset(m: &mut Machine<ByteRegisters>) {
    let nnnn = m.fetch_word();
    m.pc = nnnn.wrapping_add(m.regs.rx as u16);
}

/// 0x30-0x35, 0x80, 0x81: the target word is always consumed
fn op_branch(m: &mut Machine<ByteRegisters>, cond: ByteCond) {
    let taken = match cond {
        ByteCond::EqImm => m.fetch_byte() == m.regs.rx,
        ByteCond::NeImm => m.fetch_byte() != m.regs.rx,
        ByteCond::EqReg => m.regs.rx == m.regs.ry,
        ByteCond::NeReg => m.regs.rx != m.regs.ry,
        ByteCond::FlagSet => m.regs.f != 0,
        ByteCond::FlagClear => m.regs.f == 0,
        ByteCond::KeyDown => m.keyboard.is_down(m.regs.rx),
        ByteCond::KeyUp => !m.keyboard.is_down(m.regs.rx),
    };
    let target = m.fetch_word();
    if taken {
        m.pc = target;
    }
}

/// 0x44 ADD Y
fn op_add(regs: &mut ByteRegisters) {
    let (sum, overflow) = regs.rx.overflowing_add(regs.ry);
    regs.rx = sum;
    regs.f = overflow as u8;
}

/// 0x45 SUB Y
fn op_sub(regs: &mut ByteRegisters) {
    let (diff, borrow) = regs.rx.overflowing_sub(regs.ry);
    regs.rx = diff;
    regs.f = borrow as u8;
}

/// 0x47 SBN Y
fn op_sub_reverse(regs: &mut ByteRegisters) {
    let (diff, borrow) = regs.ry.overflowing_sub(regs.rx);
    regs.rx = diff;
    regs.f = borrow as u8;
}

/// 0x46 SHR
fn op_shift_right(regs: &mut ByteRegisters) {
    let flag = regs.rx & 0x1;
    regs.rx >>= 1;
    regs.f = flag;
}

/// 0x48 SHL
fn op_shift_left(regs: &mut ByteRegisters) {
    let flag = regs.rx >> 7 & 0x1;
    regs.rx <<= 1;
    regs.f = flag;
}

/// 0x50 RND #nn
fn op_random(m: &mut Machine<ByteRegisters>) {
    let nn = m.fetch_byte();
    m.regs.rx = nn & rand::rng().random::<u8>();
}

/// 0x82 WKY
///
/// Spins on the keyboard until a key arrives. This blocks the interpreter
/// thread entirely; there is no timeout.
fn op_wait_key(m: &mut Machine<ByteRegisters>) {
    m.regs.rx = loop {
        if let Some(key) = m.keyboard.next_key() {
            break key;
        }
        std::hint::spin_loop();
    };
}

/// 0x90 BCD
fn op_bcd(m: &mut Machine<ByteRegisters>) {
    let n = m.regs.rx;
    let i = m.regs.i;
    m.memory.write(i, n / 100 % 10);
    m.memory.write(i.wrapping_add(1), n / 10 % 10);
    m.memory.write(i.wrapping_add(2), n % 10);
}

/// 0xD0 DRW n
fn op_draw(m: &mut Machine<ByteRegisters>) {
    let rows = m.fetch_byte();
    let sprite = m.memory.fetch_array(m.regs.i, rows as usize);
    let collision =
        m.display
            .draw_sprite(&sprite, m.regs.rx, m.regs.ry, m.config.sticky_collision);
    m.regs.f = collision as u8;
}

impl fmt::Display for ByteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = |r: &ByteReg| match r {
            ByteReg::X => 'X',
            ByteReg::Y => 'Y',
        };
        match self {
            ByteOp::LoadImm(r) => write!(f, "LD{} #nn", reg(r)),
            ByteOp::LoadIndex => f.write_str("LDI #nnnn"),
            ByteOp::LoadInd(r) => write!(f, "LD{} [I]", reg(r)),
            ByteOp::StoreInd(r) => write!(f, "ST{} [I]", reg(r)),
            ByteOp::Transfer { from, to } => write!(f, "T{}{}", reg(from), reg(to)),
            ByteOp::AddToIndex => f.write_str("ADI X"),
            ByteOp::Jump => f.write_str("JMP nnnn"),
            ByteOp::JumpIndex => f.write_str("JMP I"),
            ByteOp::JumpOffset => f.write_str("JPX nnnn"),
            ByteOp::Call => f.write_str("CAL nnnn"),
            ByteOp::CallIndex => f.write_str("CAL I"),
            ByteOp::Return => f.write_str("RET"),
            ByteOp::Branch(cond) => match cond {
                ByteCond::EqImm => f.write_str("BEQ #nn, nnnn"),
                ByteCond::NeImm => f.write_str("BNE #nn, nnnn"),
                ByteCond::EqReg => f.write_str("BEQ Y, nnnn"),
                ByteCond::NeReg => f.write_str("BNE Y, nnnn"),
                ByteCond::FlagSet => f.write_str("BFS nnnn"),
                ByteCond::FlagClear => f.write_str("BFC nnnn"),
                ByteCond::KeyDown => f.write_str("BKD nnnn"),
                ByteCond::KeyUp => f.write_str("BKU nnnn"),
            },
            ByteOp::AddImm => f.write_str("ADD #nn"),
            ByteOp::Or => f.write_str("OR Y"),
            ByteOp::And => f.write_str("AND Y"),
            ByteOp::Xor => f.write_str("XOR Y"),
            ByteOp::Add => f.write_str("ADD Y"),
            ByteOp::Sub => f.write_str("SUB Y"),
            ByteOp::SubReverse => f.write_str("SBN Y"),
            ByteOp::ShiftRight => f.write_str("SHR"),
            ByteOp::ShiftLeft => f.write_str("SHL"),
            ByteOp::Random => f.write_str("RND #nn"),
            ByteOp::StorePair => f.write_str("STP [I]"),
            ByteOp::LoadPair => f.write_str("LDP [I]"),
            ByteOp::GetDelay => f.write_str("GDT"),
            ByteOp::SetDelay => f.write_str("SDT"),
            ByteOp::SetSound => f.write_str("SST"),
            ByteOp::WaitKey => f.write_str("WKY"),
            ByteOp::Bcd => f.write_str("BCD"),
            ByteOp::Exit => f.write_str("EXIT"),
            ByteOp::Draw => f.write_str("DRW n"),
            ByteOp::Clear => f.write_str("CLS"),
            ByteOp::Interrupt => f.write_str("INT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteCond, ByteIsa, ByteOp};
    use crate::cpu::{Cpu, InstructionSet};
    use crate::display::Display;
    use crate::keypad::{Key, Keypad};
    use crate::program::Program;
    use crate::registers::ByteReg;
    use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};
    use std::sync::Arc;

    /// A CPU whose entry vector points at `code`, placed at 0x0002
    fn boot(code: &[u8]) -> Cpu<ByteIsa> {
        boot_with_keypad(code).0
    }

    fn boot_with_keypad(code: &[u8]) -> (Cpu<ByteIsa>, Arc<Keypad>) {
        let mut image = vec![0x00, 0x02];
        image.extend_from_slice(code);
        let keypad = Arc::new(Keypad::new());
        let cpu = Cpu::with_devices(
            &Program::new(image),
            Arc::new(Display::default()),
            keypad.clone(),
        );
        (cpu, keypad)
    }

    #[test]
    fn test_decode_table() {
        assert_eq!(ByteIsa::decode(0x10), Some(ByteOp::LoadImm(ByteReg::X)));
        assert_eq!(ByteIsa::decode(0x34), Some(ByteOp::Branch(ByteCond::FlagSet)));
        assert_eq!(ByteIsa::decode(0xAA), Some(ByteOp::Exit));
        assert_eq!(ByteIsa::decode(0xE0), Some(ByteOp::Clear));
        assert_eq!(ByteIsa::decode(0x00), None);
        assert_eq!(ByteIsa::decode(0x0F), None);
        assert_eq!(ByteIsa::decode(0xFF), None);
    }

    #[test]
    fn test_op_load_imm() {
        let mut cpu = boot(&[0x10, 0xAB, 0x11, 0xCD]);
        cpu.run_for(2);
        assert_eq!(cpu.registers().rx, 0xAB);
        assert_eq!(cpu.registers().ry, 0xCD);
        assert_eq!(cpu.pc(), 0x0006);
    }

    #[test]
    fn test_op_load_index() {
        let mut cpu = boot(&[0x12, 0x03, 0x21]);
        cpu.step();
        assert_eq!(cpu.registers().i, 0x0321);
    }

    #[test]
    fn test_op_load_store_ind() {
        let mut cpu = boot(&[0x13, 0x14, 0x15, 0x16]);
        cpu.machine_mut().regs.i = 0x300;
        cpu.machine_mut().memory.write(0x300, 0x42);
        cpu.run_for(2);
        assert_eq!(cpu.registers().rx, 0x42);
        assert_eq!(cpu.registers().ry, 0x42);

        cpu.machine_mut().regs.i = 0x301;
        cpu.machine_mut().regs.rx = 0x11;
        cpu.step();
        assert_eq!(cpu.memory().fetch(0x301), 0x11);
        cpu.machine_mut().regs.ry = 0x22;
        cpu.step();
        assert_eq!(cpu.memory().fetch(0x301), 0x22);
    }

    #[test]
    fn test_op_transfer() {
        let mut cpu = boot(&[0x17, 0x18]);
        cpu.machine_mut().regs.rx = 5;
        cpu.step();
        assert_eq!(cpu.registers().ry, 5);
        cpu.machine_mut().regs.ry = 9;
        cpu.step();
        assert_eq!(cpu.registers().rx, 9);
    }

    #[test]
    fn test_op_add_to_index() {
        let mut cpu = boot(&[0x19]);
        cpu.machine_mut().regs.i = 0xFFFF;
        cpu.machine_mut().regs.rx = 0x02;
        cpu.step();
        assert_eq!(cpu.registers().i, 0x0001);
        assert_eq!(cpu.registers().f, 0);
    }

    #[test]
    fn test_op_jump() {
        let mut cpu = boot(&[0x20, 0x01, 0x2C]);
        cpu.step();
        assert_eq!(cpu.pc(), 300);

        let mut cpu = boot(&[0x21]);
        cpu.machine_mut().regs.i = 0x0456;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0456);
    }

    #[test]
    fn test_op_jump_offset() {
        let mut cpu = boot(&[0x25, 0x03, 0x00]);
        cpu.machine_mut().regs.rx = 0x10;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0310);
    }

    #[test]
    fn test_op_sub_call_and_return() {
        let mut cpu = boot(&[0x22, 0x02, 0x00]);
        cpu.machine_mut().memory.write(0x0200, 0x24);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0200);
        assert_eq!(cpu.stack_pointer(), 1);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0005);
        assert_eq!(cpu.stack_pointer(), 0);
    }

    #[test]
    fn test_op_call_index() {
        let mut cpu = boot(&[0x23]);
        cpu.machine_mut().regs.i = 0x0300;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0300);
        assert_eq!(cpu.machine_mut().stack.pop(), 0x0003);
    }

    #[test]
    fn test_op_branch_eq_imm() {
        let mut cpu = boot(&[0x30, 0x10, 0x03, 0x00]);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0006);

        let mut cpu = boot(&[0x30, 0x10, 0x03, 0x00]);
        cpu.machine_mut().regs.rx = 0x10;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0300);
    }

    #[test]
    fn test_op_branch_ne_imm() {
        let mut cpu = boot(&[0x31, 0x10, 0x03, 0x00]);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0300);

        let mut cpu = boot(&[0x31, 0x10, 0x03, 0x00]);
        cpu.machine_mut().regs.rx = 0x10;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0006);
    }

    #[test]
    fn test_op_branch_reg() {
        let mut cpu = boot(&[0x32, 0x03, 0x00, 0x33, 0x04, 0x00]);
        cpu.machine_mut().regs.ry = 1;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0005);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0400);
    }

    #[test]
    fn test_op_branch_flag() {
        let mut cpu = boot(&[0x34, 0x03, 0x00, 0x35, 0x04, 0x00]);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0005);
        cpu.step();
        assert_eq!(cpu.pc(), 0x0400);

        let mut cpu = boot(&[0x34, 0x03, 0x00]);
        cpu.machine_mut().regs.f = 1;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0300);
    }

    #[test]
    fn test_op_add_imm() {
        let mut cpu = boot(&[0x40, 0x20, 0x40, 0x20]);
        cpu.machine_mut().regs.rx = 16;
        cpu.step();
        assert_eq!(cpu.registers().rx, 48);

        cpu.machine_mut().regs.rx = 0xFE;
        cpu.step();
        assert_eq!(cpu.registers().rx, 30);
        assert_eq!(cpu.registers().f, 0);
    }

    #[test]
    fn test_op_bitwise() {
        let mut cpu = boot(&[0x41, 0x42, 0x43]);
        cpu.machine_mut().regs.rx = 0b10010000;
        cpu.machine_mut().regs.ry = 0b11000001;
        cpu.step();
        assert_eq!(cpu.registers().rx, 0b11010001);
        cpu.step();
        assert_eq!(cpu.registers().rx, 0b11000001);
        cpu.step();
        assert_eq!(cpu.registers().rx, 0);
    }

    #[test]
    fn test_op_add() {
        let mut cpu = boot(&[0x44, 0x44]);
        cpu.machine_mut().regs.rx = 200;
        cpu.machine_mut().regs.ry = 100;
        cpu.step();
        assert_eq!(cpu.registers().rx, 44);
        assert_eq!(cpu.registers().f, 1);

        cpu.machine_mut().regs.rx = 10;
        cpu.machine_mut().regs.ry = 20;
        cpu.step();
        assert_eq!(cpu.registers().rx, 30);
        assert_eq!(cpu.registers().f, 0);
    }

    #[test]
    fn test_op_sub() {
        let mut cpu = boot(&[0x45, 0x45]);
        cpu.machine_mut().regs.rx = 100;
        cpu.machine_mut().regs.ry = 25;
        cpu.step();
        assert_eq!(cpu.registers().rx, 75);
        assert_eq!(cpu.registers().f, 0);

        cpu.machine_mut().regs.rx = 25;
        cpu.machine_mut().regs.ry = 100;
        cpu.step();
        assert_eq!(cpu.registers().rx, 181);
        assert_eq!(cpu.registers().f, 1);
    }

    #[test]
    fn test_op_sub_reverse() {
        let mut cpu = boot(&[0x47, 0x47]);
        cpu.machine_mut().regs.rx = 25;
        cpu.machine_mut().regs.ry = 100;
        cpu.step();
        assert_eq!(cpu.registers().rx, 75);
        assert_eq!(cpu.registers().f, 0);

        cpu.machine_mut().regs.rx = 100;
        cpu.machine_mut().regs.ry = 25;
        cpu.step();
        assert_eq!(cpu.registers().rx, 181);
        assert_eq!(cpu.registers().f, 1);
    }

    #[test]
    fn test_op_shift_right() {
        let mut cpu = boot(&[0x46, 0x46]);
        cpu.machine_mut().regs.rx = 0b00000100;
        cpu.step();
        assert_eq!(cpu.registers().rx, 0b00000010);
        assert_eq!(cpu.registers().f, 0);

        cpu.machine_mut().regs.rx = 0b00000101;
        cpu.step();
        assert_eq!(cpu.registers().rx, 0b00000010);
        assert_eq!(cpu.registers().f, 1);
    }

    #[test]
    fn test_op_shift_left() {
        let mut cpu = boot(&[0x48, 0x48]);
        cpu.machine_mut().regs.rx = 0b00100000;
        cpu.step();
        assert_eq!(cpu.registers().rx, 0b01000000);
        assert_eq!(cpu.registers().f, 0);

        cpu.machine_mut().regs.rx = 0b10100000;
        cpu.step();
        assert_eq!(cpu.registers().rx, 0b01000000);
        assert_eq!(cpu.registers().f, 1);
    }

    #[test]
    fn test_op_random() {
        let mut cpu = boot(&[0x50, 0x0F]);
        cpu.machine_mut().regs.rx = 0xF0;
        cpu.step();
        assert_eq!(cpu.registers().rx & 0xF0, 0);
        assert_eq!(cpu.pc(), 0x0004);
    }

    #[test]
    fn test_op_pair() {
        let mut cpu = boot(&[0x60, 0x61]);
        cpu.machine_mut().regs.i = 0x300;
        cpu.machine_mut().regs.rx = 0x12;
        cpu.machine_mut().regs.ry = 0x34;
        cpu.step();
        assert_eq!(cpu.memory().fetch_word(0x300), 0x1234);

        cpu.machine_mut().regs.rx = 0;
        cpu.machine_mut().regs.ry = 0;
        cpu.step();
        assert_eq!((cpu.registers().rx, cpu.registers().ry), (0x12, 0x34));
    }

    #[test]
    fn test_op_timers() {
        let mut cpu = boot(&[0x71, 0x72]);
        cpu.machine_mut().regs.rx = 0x10;
        cpu.step();
        assert_eq!(cpu.registers().timers.delay, 0x10);
        cpu.step();
        assert_eq!(cpu.registers().timers.sound, 0x10);
        assert!(cpu.is_sound_active());
    }

    #[test]
    fn test_op_dt_get() {
        let mut cpu = boot(&[0x70]);
        cpu.machine_mut().regs.timers.delay = 0x10;
        cpu.step();
        assert_eq!(cpu.registers().rx, 0x10);
    }

    #[test]
    fn test_sound_inactive_at_zero() {
        let cpu = boot(&[]);
        assert!(!cpu.is_sound_active());
    }

    #[test]
    fn test_op_branch_key() {
        let mut cpu = boot(&[0x80, 0x03, 0x00]);
        cpu.machine_mut().regs.rx = 0x1;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0005);

        let (mut cpu, keypad) = boot_with_keypad(&[0x80, 0x03, 0x00]);
        cpu.machine_mut().regs.rx = 0x1;
        keypad.keydown(Key::from_index(0x1).unwrap());
        cpu.step();
        assert_eq!(cpu.pc(), 0x0300);

        let mut cpu = boot(&[0x81, 0x03, 0x00]);
        cpu.machine_mut().regs.rx = 0x1;
        cpu.step();
        assert_eq!(cpu.pc(), 0x0300);
    }

    #[test]
    fn test_op_wait_key() {
        let (mut cpu, keypad) = boot_with_keypad(&[0x82]);
        keypad.keydown(Key::from_index(0xF).unwrap());
        cpu.step();
        assert_eq!(cpu.registers().rx, 0xF);
        assert_eq!(cpu.pc(), 0x0003);
    }

    #[test]
    fn test_op_bcd() {
        let mut cpu = boot(&[0x90]);
        cpu.machine_mut().regs.rx = 156;
        cpu.machine_mut().regs.i = 0x300;
        cpu.step();
        assert_eq!(cpu.memory().fetch_array(0x300, 3), vec![1, 5, 6]);
    }

    #[test]
    fn test_op_bcd_wraps_address() {
        let mut cpu = boot(&[0x90]);
        cpu.machine_mut().regs.rx = 255;
        cpu.machine_mut().regs.i = 0xFFFF;
        cpu.step();
        assert_eq!(cpu.memory().fetch(0xFFFF), 2);
        assert_eq!(cpu.memory().fetch(0x0000), 5);
        assert_eq!(cpu.memory().fetch(0x0001), 5);
    }

    #[test]
    fn test_op_exit() {
        let mut cpu = boot(&[0x10, 0x01, 0xAA, 0x10, 0x02]);
        assert_eq!(cpu.run_for(10), 2);
        assert_eq!(cpu.registers().rx, 1);
    }

    #[test]
    fn test_op_display() {
        #[rustfmt::skip]
        let mut cpu = boot(&[
            0xD0, 0x02, // draw 2 rows
            0b00000010, // sprite
            0b00000001,
        ]);

        let sx = SCREEN_WIDTH - 8;
        let sy = SCREEN_HEIGHT - 2;

        cpu.machine_mut().regs.rx = sx as u8;
        cpu.machine_mut().regs.ry = sy as u8;
        cpu.machine_mut().regs.i = 0x0004;
        cpu.step();

        let display = cpu.display();
        assert!(display.is_set(sx + 6, sy));
        assert!(!display.is_set(sx + 7, sy));
        assert!(!display.is_set(sx + 6, sy + 1));
        assert!(display.is_set(sx + 7, sy + 1));
        assert_eq!(cpu.registers().f, 0);
    }

    #[test]
    fn test_op_display_collision() {
        let mut cpu = boot(&[0xD0, 0x01, 0xD0, 0x01, 0b10000000]);
        cpu.machine_mut().regs.i = 0x0006;
        cpu.step();
        assert_eq!(cpu.registers().f, 0);
        assert!(cpu.display().is_set(0, 0));
        cpu.step();
        assert_eq!(cpu.registers().f, 1);
        assert!(!cpu.display().is_set(0, 0));
    }

    #[test]
    fn test_op_display_sticky_collision() {
        let mut cpu = boot(&[0xD0, 0x01, 0b11000000]).sticky_collision(true);
        cpu.machine_mut().regs.i = 0x0004;
        cpu.display().set_pixel(0, 0);
        cpu.step();
        assert_eq!(cpu.registers().f, 1);
    }

    #[test]
    fn test_op_cls() {
        let mut cpu = boot(&[0xE0]);
        cpu.display().set_pixel(3, 3);
        cpu.step();
        assert!(!cpu.display().is_set(3, 3));
    }

    #[test]
    fn test_op_interrupt_is_noop() {
        let mut cpu = boot(&[0xFE, 0xAA]);
        assert_eq!(cpu.run_for(10), 2);
    }
}
