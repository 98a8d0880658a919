//! A small virtual machine in the CHIP-8 tradition: 64 KiB of byte memory,
//! a 256-slot call stack that wraps, a shared monochrome display, a
//! hexadecimal keypad and an interpreter generic over its instruction set.

pub mod cpu;
pub mod display;
pub mod isa;
pub mod keypad;
pub mod memory;
pub mod program;
pub mod registers;
pub mod stack;
pub mod timers;

pub use crate::cpu::{Cpu, CpuConfig, InstructionSet, Machine, SharedKeyboard, ENTRY_VECTOR};
pub use crate::display::Display;
pub use crate::isa::{ByteIsa, WordIsa};
pub use crate::keypad::{Key, Keyboard, Keypad};
pub use crate::memory::Memory;
pub use crate::program::Program;
pub use crate::stack::CallStack;

pub const MEMORY_SIZE: usize = 0x10000;
pub const STACK_SIZE: usize = 0x100;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// Rate at which the byte instruction set's timers count down
pub const TIMER_HZ: u64 = 60;

/// Interpreter for the 16-bit accumulator instruction set
pub type WordCpu = Cpu<WordIsa>;
/// Interpreter for the 8-bit CHIP-8 style instruction set
pub type ByteCpu = Cpu<ByteIsa>;
