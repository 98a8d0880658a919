use std::fmt::{Debug, Display as FmtDisplay};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info, warn};

use crate::display::Display;
use crate::keypad::{Keyboard, Keypad};
use crate::memory::Memory;
use crate::program::Program;
use crate::stack::CallStack;

/// Address of the big-endian entry point word read after every program load
pub const ENTRY_VECTOR: u16 = 0x0000;

/// The keyboard handle shared between the interpreter and whoever feeds it keys
pub type SharedKeyboard = Arc<dyn Keyboard + Send + Sync>;

#[derive(Clone, Copy, Debug, Default)]
pub struct CpuConfig {
    pub trace_operations: bool,
    pub sticky_collision: bool,
}

/// An opcode table and the semantics behind it
pub trait InstructionSet {
    type Registers: Default + Debug;
    type Op: Copy + FmtDisplay;

    /// Map one opcode byte to an instruction, `None` if the byte is unassigned
    fn decode(opcode: u8) -> Option<Self::Op>;

    /// Run `op`, whose opcode byte has already been consumed
    fn execute(op: Self::Op, machine: &mut Machine<Self::Registers>);

    /// Called once at the start of every cycle
    fn tick(_machine: &mut Machine<Self::Registers>, _now: Instant) {}
}

/// Everything an instruction may touch, handed to it explicitly
pub struct Machine<R> {
    pub memory: Memory,
    pub stack: CallStack,
    pub display: Arc<Display>,
    pub keyboard: SharedKeyboard,
    pub regs: R,
    /// The program counter points to the next byte to fetch
    pub pc: u16,
    pub running: bool,
    pub config: CpuConfig,
}

impl<R> Machine<R> {
    /// Read the byte at the program counter and advance past it
    pub fn fetch_byte(&mut self) -> u8 {
        let byte = self.memory.fetch(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    /// Read the big-endian word at the program counter and advance past it
    pub fn fetch_word(&mut self) -> u16 {
        let hi = self.fetch_byte();
        let lo = self.fetch_byte();
        u16::from_be_bytes([hi, lo])
    }

    /// Push the return address and continue at `addr`
    pub fn call(&mut self, addr: u16) {
        self.stack.push(self.pc);
        self.pc = addr;
    }

    pub fn ret(&mut self) {
        self.pc = self.stack.pop();
    }

    pub fn halt(&mut self) {
        self.running = false;
    }
}

/// The fetch-decode-execute loop over an instruction set `I`
pub struct Cpu<I: InstructionSet> {
    machine: Machine<I::Registers>,
    /// Built once from `I::decode` and never changed afterwards
    table: [Option<I::Op>; 256],
    cycles: u64,
}

impl<I: InstructionSet> Cpu<I> {
    /// A CPU with a default 64x32 display and an idle keypad
    pub fn new(program: &Program) -> Self {
        Self::with_devices(program, Arc::new(Display::default()), Arc::new(Keypad::new()))
    }

    pub fn with_devices(program: &Program, display: Arc<Display>, keyboard: SharedKeyboard) -> Self {
        let mut cpu = Cpu {
            machine: Machine {
                memory: Memory::new(),
                stack: CallStack::new(),
                display,
                keyboard,
                regs: I::Registers::default(),
                pc: 0,
                running: false,
                config: CpuConfig::default(),
            },
            table: std::array::from_fn(|opcode| I::decode(opcode as u8)),
            cycles: 0,
        };
        cpu.load_program(program);
        cpu
    }

    /* Config builder functions */
    pub fn trace_operations(mut self, value: bool) -> Self {
        self.machine.config.trace_operations = value;
        self
    }

    pub fn sticky_collision(mut self, value: bool) -> Self {
        self.machine.config.sticky_collision = value;
        self
    }

    /// Copy the image into memory at the program counter, then jump to the
    /// entry point stored at address 0
    pub fn load_program(&mut self, program: &Program) {
        let machine = &mut self.machine;
        debug!("load {} byte program at {:#06x}", program.len(), machine.pc);
        machine.memory.write_slice(machine.pc, program.as_bytes());
        machine.pc = machine.memory.fetch_word(ENTRY_VECTOR);
    }

    pub fn load_program_from_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let program = Program::from_file(path).context("load program from file")?;
        self.load_program(&program);
        Ok(())
    }

    /// Run until the program halts. Never returns for a program that doesn't.
    pub fn run(&mut self) -> u64 {
        self.run_loop(None)
    }

    /// Run at most `max_instructions` cycles and return how many were executed
    pub fn run_for(&mut self, max_instructions: u64) -> u64 {
        self.run_loop(Some(max_instructions))
    }

    fn run_loop(&mut self, mut remaining: Option<u64>) -> u64 {
        info!("start loop at {:#06x}", self.machine.pc);
        self.machine.running = true;
        self.cycles = 0;
        let start = Instant::now();

        while self.machine.running && remaining != Some(0) {
            self.step();
            self.cycles += 1;
            if let Some(left) = remaining.as_mut() {
                *left -= 1;
            }
        }
        self.machine.running = false;

        let elapsed = start.elapsed();
        let per_ms = self.cycles as f64 / elapsed.as_secs_f64().max(f64::EPSILON) / 1000.0;
        info!(
            "executed {} cycles in {:?} ({:.0} instructions per millisecond)",
            self.cycles, elapsed, per_ms
        );
        self.cycles
    }

    /// Execute a single fetch-decode-execute cycle
    pub fn step(&mut self) {
        I::tick(&mut self.machine, Instant::now());

        let pc = self.machine.pc;
        let opcode = self.machine.fetch_byte();
        match self.table[opcode as usize] {
            Some(op) => {
                if self.machine.config.trace_operations {
                    debug!("{:#06x}: {}", pc, op);
                }
                I::execute(op, &mut self.machine);
            }
            None => warn!("opcode {:#04x} not found at {:#06x}", opcode, pc),
        }
    }

    pub fn dump_memory(&self) -> Vec<u8> {
        self.machine.memory.copy()
    }

    pub fn log_memory(&self) {
        info!("memory:\n{}", self.machine.memory.hex_dump());
    }

    pub fn memory(&self) -> &Memory {
        &self.machine.memory
    }

    pub fn registers(&self) -> &I::Registers {
        &self.machine.regs
    }

    pub fn pc(&self) -> u16 {
        self.machine.pc
    }

    /// Cycles executed by the most recent run
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_running(&self) -> bool {
        self.machine.running
    }

    pub fn display(&self) -> Arc<Display> {
        Arc::clone(&self.machine.display)
    }

    pub fn keyboard(&self) -> SharedKeyboard {
        Arc::clone(&self.machine.keyboard)
    }

    pub fn stack_pointer(&self) -> u8 {
        self.machine.stack.stack_pointer()
    }

    #[cfg(test)]
    pub(crate) fn machine_mut(&mut self) -> &mut Machine<I::Registers> {
        &mut self.machine
    }
}

impl<I: InstructionSet> FmtDisplay for Cpu<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "=== Registers ===\npc: {:#06x} sp: {:#04x}\n{:?}\n=== Memory ===\n{}",
            self.machine.pc,
            self.machine.stack.stack_pointer(),
            self.machine.regs,
            self.machine.memory.hex_dump()
        )
    }
}
