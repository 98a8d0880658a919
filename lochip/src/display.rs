use std::fmt::Display as FmtDisplay;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Row-major snapshot of on/off pixel states, indexed `[y][x]`
pub type BitFrame = Vec<Vec<bool>>;
/// Row-major snapshot of pixel colors, indexed `[y][x]`
pub type ByteFrame = Vec<Vec<u8>>;

struct FrameBuffer {
    /// One color byte per pixel, zero meaning off
    cells: Vec<u8>,
    dirty: bool,
}

/// A frame buffer shared between the interpreter thread, which draws into it,
/// and a presentation thread, which takes snapshots. Every public method holds
/// the lock for its whole duration, so a snapshot never sees half a sprite.
pub struct Display {
    width: usize,
    height: usize,
    fb: Mutex<FrameBuffer>,
}

impl Display {
    /// A blank buffer of `width` x `height` pixels.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "display must have at least one pixel");
        Self {
            width,
            height,
            fb: Mutex::new(FrameBuffer {
                cells: vec![0; width * height],
                dirty: false,
            }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn lock(&self) -> MutexGuard<'_, FrameBuffer> {
        self.fb.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Toggle the pixel at the coordinates and return true if it was already on.
    /// Coordinates outside the buffer are ignored.
    pub fn set_pixel(&self, x: usize, y: usize) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        toggle(&mut self.lock(), idx)
    }

    /// Overwrite the pixel with `color` and return true if it was non-zero before
    pub fn set_pixel_color(&self, x: usize, y: usize, color: u8) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        let mut fb = self.lock();
        fb.dirty = true;
        let prev = fb.cells[idx];
        fb.cells[idx] = color;
        prev != 0
    }

    pub fn clear(&self) {
        let mut fb = self.lock();
        fb.dirty = true;
        fb.cells.fill(0);
    }

    /// XOR `sprite` onto the buffer with its top-left corner at (x, y).
    ///
    /// The origin wraps around the buffer, the sprite itself is clipped at the
    /// right and bottom edges. Each byte is one row, most significant bit
    /// leftmost. The result is the collision state of the last set bit drawn;
    /// with `sticky` it is true if any drawn pixel was already on.
    pub fn draw_sprite(&self, sprite: &[u8], x: u8, y: u8, sticky: bool) -> bool {
        let x0 = x as usize % self.width;
        let y0 = y as usize % self.height;
        let mut fb = self.lock();

        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            let y = y0 + row;
            if y >= self.height {
                break;
            }
            for col in 0..8 {
                let x = x0 + col;
                if x >= self.width {
                    break;
                }
                if (byte >> (7 - col)) & 0x1 == 1 {
                    let hit = toggle(&mut fb, y * self.width + x);
                    collision = if sticky { collision || hit } else { hit };
                }
            }
        }
        collision
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.index(x, y)
            .is_some_and(|idx| self.lock().cells[idx] != 0)
    }

    pub fn copy_bits(&self) -> BitFrame {
        self.bits(&self.lock())
    }

    pub fn copy_bytes(&self) -> ByteFrame {
        self.lock()
            .cells
            .chunks(self.width)
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// True if the buffer changed since the last `take_frame`
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Snapshot the buffer if it changed since the last call, clearing the dirty mark
    pub fn take_frame(&self) -> Option<BitFrame> {
        let mut fb = self.lock();
        if !fb.dirty {
            return None;
        }
        fb.dirty = false;
        Some(self.bits(&fb))
    }

    fn bits(&self, fb: &FrameBuffer) -> BitFrame {
        fb.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|cell| *cell != 0).collect())
            .collect()
    }
}

fn toggle(fb: &mut FrameBuffer, idx: usize) -> bool {
    fb.dirty = true;
    let prev = fb.cells[idx];
    fb.cells[idx] = if prev == 0 { 0xFF } else { 0 };
    prev != 0
}

impl Default for Display {
    fn default() -> Self {
        Self::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl FmtDisplay for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.copy_bits() {
            for on in row {
                write!(f, "{}", if on { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
