use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const KEY_COUNT: usize = 0x10;

/// Presses kept for `next_key`; older ones are dropped first
pub const PRESS_QUEUE_LEN: usize = KEY_COUNT;

/// The input device as seen by the interpreter
pub trait Keyboard {
    /// Whether `key` is currently held down
    fn is_down(&self, key: u8) -> bool;

    /// The next key pressed since the last call, or `None` if there was none
    fn next_key(&self) -> Option<u8>;
}

/// A keypad label mapped to one of the 16 hexadecimal keys
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Key(u8);

impl Key {
    /// Map the left-hand QWERTY block onto the hex keypad
    pub fn from_label(value: &str) -> Option<Self> {
        let key = match value {
            "1" => 0x1, // 1 -> 1
            "2" => 0x2, // 2 -> 2
            "3" => 0x3, // 3 -> 3
            "4" => 0xC, // 4 -> C
            "q" => 0x4, // Q -> 4
            "w" => 0x5, // W -> 5
            "e" => 0x6, // E -> 6
            "r" => 0xD, // R -> D
            "a" => 0x7, // A -> 7
            "s" => 0x8, // S -> 8
            "d" => 0x9, // D -> 9
            "f" => 0xE, // F -> E
            "z" => 0xA, // Z -> A
            "x" => 0x0, // X -> 0
            "c" => 0xB, // C -> B
            "v" => 0xF, // V -> F
            _ => return None,
        };
        Some(Self(key))
    }

    pub fn from_index(value: u8) -> Option<Self> {
        ((value as usize) < KEY_COUNT).then_some(Self(value))
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

struct KeyState {
    keys: [bool; KEY_COUNT],
    pressed: VecDeque<u8>,
}

/// A hexadecimal keypad that can be fed from one thread while the interpreter
/// reads it from another
pub struct Keypad {
    state: Mutex<KeyState>,
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(KeyState {
                keys: [false; KEY_COUNT],
                pressed: VecDeque::with_capacity(PRESS_QUEUE_LEN),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, KeyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold `key` down and queue it for `next_key`
    pub fn keydown(&self, key: Key) {
        let mut state = self.lock();
        state.keys[key.0 as usize] = true;
        if state.pressed.len() == PRESS_QUEUE_LEN {
            state.pressed.pop_front();
        }
        state.pressed.push_back(key.0);
    }

    pub fn keyup(&self, key: Key) {
        self.lock().keys[key.0 as usize] = false;
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard for Keypad {
    fn is_down(&self, key: u8) -> bool {
        self.lock()
            .keys
            .get(key as usize)
            .copied()
            .unwrap_or(false)
    }

    fn next_key(&self) -> Option<u8> {
        self.lock().pressed.pop_front()
    }
}
