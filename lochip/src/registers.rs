use crate::timers::Timers;

/// Condition bits of the word instruction set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub carry: bool,
    pub negative: bool,
    pub zero: bool,
}

/// Names the four 16-bit registers of the word instruction set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordReg {
    A,
    X,
    Y,
    I,
}

/// Register file of the word instruction set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordRegisters {
    pub a: u16,
    pub x: u16,
    pub y: u16,
    /// Index register, the implicit address of every indirect operand
    pub i: u16,
    pub flags: Flags,
}

impl WordRegisters {
    pub fn get(&self, reg: WordReg) -> u16 {
        match reg {
            WordReg::A => self.a,
            WordReg::X => self.x,
            WordReg::Y => self.y,
            WordReg::I => self.i,
        }
    }

    /// Store into `reg`. Writes to A also refresh the negative and zero flags.
    pub fn set(&mut self, reg: WordReg, value: u16) {
        match reg {
            WordReg::A => self.set_a(value),
            WordReg::X => self.x = value,
            WordReg::Y => self.y = value,
            WordReg::I => self.i = value,
        }
    }

    pub fn set_a(&mut self, value: u16) {
        self.a = value;
        self.set_nz(value);
    }

    pub fn set_nz(&mut self, value: u16) {
        self.flags.negative = (value as i16) < 0;
        self.flags.zero = value == 0;
    }
}

/// Names the two general registers of the byte instruction set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteReg {
    X,
    Y,
}

/// Register file of the byte instruction set
#[derive(Clone, Debug, Default)]
pub struct ByteRegisters {
    pub rx: u8,
    pub ry: u8,
    /// Flag register, set to 1 on carry, borrow, shifted-out bits and collisions
    pub f: u8,
    pub i: u16,
    pub timers: Timers,
}

impl ByteRegisters {
    pub fn get(&self, reg: ByteReg) -> u8 {
        match reg {
            ByteReg::X => self.rx,
            ByteReg::Y => self.ry,
        }
    }

    pub fn set(&mut self, reg: ByteReg, value: u8) {
        match reg {
            ByteReg::X => self.rx = value,
            ByteReg::Y => self.ry = value,
        }
    }
}
