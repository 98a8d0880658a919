use crate::STACK_SIZE;

/// A fixed ring of return addresses. The pointer wraps in both directions, so
/// sustained overflow silently overwrites the oldest entries.
pub struct CallStack {
    slots: [u16; STACK_SIZE],
    sp: u8,
}

impl CallStack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_SIZE],
            sp: 0,
        }
    }

    /// Advance the pointer, then store `addr` in the new slot
    pub fn push(&mut self, addr: u16) {
        self.sp = self.sp.wrapping_add(1);
        self.slots[self.sp as usize] = addr;
    }

    /// Read the current slot, then retreat the pointer
    pub fn pop(&mut self) -> u16 {
        let addr = self.slots[self.sp as usize];
        self.sp = self.sp.wrapping_sub(1);
        addr
    }

    pub fn stack_pointer(&self) -> u8 {
        self.sp
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}
