use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

pub const NUM_KEYS: usize = 16;

/// Key's variants are the 16 keys from the CHIP-8's hexadecimal keyboard, each with
/// its hex value as discriminant. The recommended key mapping is:
///
/// Keypad                   Keyboard
/// +-+-+-+-+                +-+-+-+-+
/// |1|2|3|C|                |1|2|3|4|
/// +-+-+-+-+                +-+-+-+-+
/// |4|5|6|D|                |Q|W|E|R|
/// +-+-+-+-+       =>       +-+-+-+-+
/// |7|8|9|E|                |A|S|D|F|
/// +-+-+-+-+                +-+-+-+-+
/// |A|0|B|F|                |Z|X|C|V|
/// +-+-+-+-+                +-+-+-+-+
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum Key {
    Key0 = 0x0,
    Key1 = 0x1,
    Key2 = 0x2,
    Key3 = 0x3,
    Key4 = 0x4,
    Key5 = 0x5,
    Key6 = 0x6,
    Key7 = 0x7,
    Key8 = 0x8,
    Key9 = 0x9,
    A = 0xA,
    B = 0xB,
    C = 0xC,
    D = 0xD,
    E = 0xE,
    F = 0xF,
}

impl Key {
    const ALL: [Key; NUM_KEYS] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
        Key::A,
        Key::B,
        Key::C,
        Key::D,
        Key::E,
        Key::F,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Key {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Key::ALL.get(value as usize).copied().ok_or(value)
    }
}

impl From<Key> for usize {
    fn from(key: Key) -> Self {
        key.index()
    }
}

/// Anything that can report which of the 16 keys are currently held down. The host's
/// input collaborator implements this and hands it to `Emulator::handle_key_input`
pub trait AsKeyboard {
    fn keys_down(&self) -> Vec<Key>;
}

/// Contains the state (up or down) of the CHIP-8's 16 keys, as well as the key press
/// latched for instruction FX0A
pub struct Keyboard {
    key_input: [bool; NUM_KEYS],
    listening: bool,            // true while an FX0A instruction waits on a press
    latched_press: Option<Key>, // first key pressed while listening
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard {
            key_input: [false; NUM_KEYS],
            listening: false,
            latched_press: None,
        }
    }

    /// Handle the key down event for one of the 16 possible keys. Returns true if the
    /// key was previously up
    pub fn handle_key_down(&mut self, key: Key) -> bool {
        let was_down = self.key_input[key.index()];
        self.key_input[key.index()] = true;

        if !was_down && self.listening && self.latched_press.is_none() {
            self.latched_press = Some(key);
        }

        !was_down
    }

    /// Handle the key up event for one of the 16 possible keys. Returns true if the
    /// key was previously down
    pub fn handle_key_up(&mut self, key: Key) -> bool {
        let was_down = self.key_input[key.index()];
        self.key_input[key.index()] = false;
        was_down
    }

    /// Given the keys held down on the host keyboard, fire the appropriate key_up and
    /// key_down handlers for every key whose state changed
    pub fn update_keyboard_with_keys(&mut self, keys_down: &[Key]) {
        for &key in Key::ALL.iter() {
            let system_key_is_down = keys_down.contains(&key);
            let interpreter_key_is_down = self.get_key_state(key.index());

            if system_key_is_down && !interpreter_key_is_down {
                self.handle_key_down(key);
            } else if !system_key_is_down && interpreter_key_is_down {
                self.handle_key_up(key);
            }
        }
    }

    /// Return whether the key with the given index is held down. Indices past 0xF
    /// only look at their low nibble
    pub fn get_key_state(&self, idx: usize) -> bool {
        self.key_input[idx & 0xF]
    }

    /// Snapshot of all 16 key states, indexed by key value
    pub fn snapshot(&self) -> [bool; NUM_KEYS] {
        self.key_input
    }

    /// Start latching the next key press. Keys already held down do not count
    pub fn listen(&mut self) {
        self.listening = true;
        self.latched_press = None;
    }

    /// Take the latched key press, if any, and stop listening when there was one
    pub fn take_press(&mut self) -> Option<Key> {
        let press = self.latched_press.take();
        if press.is_some() {
            self.listening = false;
        }
        press
    }

    pub fn stop_listening(&mut self) {
        self.listening = false;
        self.latched_press = None;
    }

    /// Release every key and drop any latched press
    pub fn reset(&mut self) {
        *self = Keyboard::new();
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}
