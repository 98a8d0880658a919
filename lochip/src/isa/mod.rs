//! The two instruction sets the interpreter ships with

pub mod byte;
pub mod word;

pub use byte::{ByteCond, ByteIsa, ByteOp};
pub use word::{AluOp, Cond, Operand, ShiftOp, Target, WordIsa, WordOp};
