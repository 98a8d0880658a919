use std::fmt::Display;

use crate::MEMORY_SIZE;

const BYTES_PER_LINE: usize = 16;

/// Flat 64 KiB address space. Every address is valid; accesses that would run
/// past the top of memory are clamped instead of faulting.
pub struct Memory {
    data: Box<[u8]>,
}

impl Memory {
    /// Create a zeroed instance of the Memory struct
    pub fn new() -> Self {
        Self {
            data: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn fetch(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    /// Read a big-endian word. The last address has no second byte, so it reads as 0.
    pub fn fetch_word(&self, addr: u16) -> u16 {
        let addr = addr as usize;
        if addr + 1 >= self.data.len() {
            return 0;
        }
        u16::from_be_bytes([self.data[addr], self.data[addr + 1]])
    }

    /// Read up to `len` bytes starting at `addr`, stopping at the end of memory
    pub fn fetch_array(&self, addr: u16, len: usize) -> Vec<u8> {
        let start = addr as usize;
        let end = start.saturating_add(len).min(self.data.len());
        self.data[start..end].to_vec()
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    /// Write a big-endian word. At the last address the low byte has nowhere to go and is dropped.
    pub fn write_word(&mut self, addr: u16, word: u16) {
        let [hi, lo] = word.to_be_bytes();
        self.write(addr, hi);
        if let Some(next) = addr.checked_add(1) {
            self.write(next, lo);
        }
    }

    /// Write `data` into memory starting at `addr`, wrapping around to address 0
    pub fn write_slice(&mut self, addr: u16, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.write(addr.wrapping_add(offset as u16), *byte);
        }
    }

    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Independent byte-for-byte snapshot of the whole address space
    pub fn copy(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// A hex dump that stops after the line holding the last non-zero byte
    pub fn hex_dump(&self) -> HexDump<'_> {
        let end = self
            .data
            .iter()
            .rposition(|byte| *byte != 0)
            .map_or(BYTES_PER_LINE, |last| {
                (last / BYTES_PER_LINE + 1) * BYTES_PER_LINE
            });
        HexDump {
            data: &self.data[..end],
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HexDump<'a> {
    data: &'a [u8],
}

impl Display for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_lines(f, self.data)
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_lines(f, &self.data)
    }
}

fn write_lines(f: &mut std::fmt::Formatter<'_>, data: &[u8]) -> std::fmt::Result {
    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        write!(f, "{:04X}: ", line * BYTES_PER_LINE)?;
        for byte in chunk {
            write!(f, "{:02X} ", byte)?;
        }
        writeln!(f)?;
    }
    Ok(())
}
