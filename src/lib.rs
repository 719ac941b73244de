//! An interpreter for the original 35 opcode CHIP 8 instruction set. The crate is only
//! the virtual machine: hosts load a ROM, call [`Emulator::cycle`] in a loop, feed it
//! key state and read the framebuffer back out.

// # Interpreter
// * 4096 (0x1000) bytes of memory
// * interpreter reserves the first 512 (0x200) bytes, the font set lives at 0x050
// * programs are loaded at 0x200, which is where the program counter starts
// * 16 8-bit registers: V0 - VF
// * VF is the carry flag in addition, the "no borrow" flag in subtraction, the shifted out
// bit in shifts and the collision flag in the draw operation
// * the address register I is 16 bits wide
// * the stack is only used to store return addresses when subroutines are called, 16 deep

// # Timers
// * two 8-bit timers, decremented once per cycle
//  - delay timer is used for events, it can be set and read
//  - sound timer plays a tone while its value is nonzero

// # Input
// there is a 16 symbol hex keyboard with values 0 - F. There are 3 opcode that deal with handling input
//  - one skips an instruction if a specific key is pressed
//  - one skips an instruction if a specific key is NOT pressed
//  - waits for a key press and stores it in a register once it detects it

// # Graphics
// 64x32 monochrome pixels

pub mod config;
mod error;
pub mod graphics;
pub mod keyboard;
mod op;


pub use config::Config;
pub use error::{Error, Result};
pub use graphics::{Graphics, HEIGHT, WIDTH};
pub use keyboard::{AsKeyboard, Key, Keyboard};
pub use op::Op;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slog::{debug, error, o, trace, warn, Discard, Logger};
use std::convert::TryFrom;
use std::fs;
use std::path::Path;

pub const MEMORY_SIZE: usize = 4096;
pub const STARTING_MEMORY_BYTE: usize = 0x200;
pub const FONT_START: usize = 0x050;
pub const NUM_BYTES_IN_FONT_CHAR: usize = 5;
pub const NUM_REGISTERS: usize = 16;
pub const STACK_DEPTH: usize = 16;

const FLAG: usize = 0xF;

/// stores the 16 5-byte hex font set, one glyph per hex digit
pub const FONT_SET: [u8; 16 * NUM_BYTES_IN_FONT_CHAR] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The host's audio collaborator. The emulator only tells it when the tone should
/// start and stop, producing sound is up to the implementor
pub trait AsSpeaker {
    /// Called when FX18 moves the sound timer from zero to a nonzero value
    fn start_tone(&mut self) {}

    /// Called exactly once each time the sound timer reaches 0, whether it counted down
    /// from 1, FX18 wrote 0 over it or the emulator was reset while it was running
    fn stop_tone(&mut self);
}

/// Whether the interpreter is executing instructions or suspended on FX0A
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecState {
    Running,
    /// waiting for a key press to store in the given register
    AwaitingKey(u8),
}

pub struct Emulator {
    pub memory: [u8; MEMORY_SIZE], // 4k of RAM

    pub stack: [u16; STACK_DEPTH], // return addresses of the active subroutine calls
    pub sp: usize,                 // number of return addresses on the stack

    pub addr: u16, // the I register
    pub pc: u16,   // program counter

    // 16 8-bit registers. VF is used as a flag by several of the opcodes (see @Op)
    pub v: [u8; NUM_REGISTERS],

    pub graphics: Graphics, // 64x32 pixel monochrome screen

    pub delay_timer: u8, // timer that can be set and read
    pub sound_timer: u8, // timer that plays a tone whenever it is nonzero

    pub keyboard: Keyboard, // 16 key hex keyboard input (0-F)

    state: ExecState,
    unrecognized: u64,
    rng: StdRng,
    speaker: Option<Box<dyn AsSpeaker>>,
    logger: Logger,
}

impl Emulator {
    /// Create an emulator in its reset state. Without a logger all records are discarded
    pub fn new(logger: Option<Logger>) -> Self {
        let logger = logger.unwrap_or_else(|| Logger::root(Discard, o!()));

        let mut emulator = Emulator {
            memory: [0; MEMORY_SIZE],
            stack: [0; STACK_DEPTH],
            sp: 0,
            addr: 0,
            pc: STARTING_MEMORY_BYTE as u16,
            v: [0; NUM_REGISTERS],
            graphics: Graphics::new(),
            delay_timer: 0,
            sound_timer: 0,
            keyboard: Keyboard::new(),
            state: ExecState::Running,
            unrecognized: 0,
            rng: StdRng::from_entropy(),
            speaker: None,
            logger,
        };
        emulator.reset();
        emulator
    }

    /// Create an emulator logging to the terminal at the configured level, with its
    /// random source seeded if the config asks for it
    pub fn from_config(config: &Config) -> Result<Self> {
        let logger = config.build_logger()?;
        let mut emulator = Emulator::new(Some(logger));
        if let Some(seed) = config.rng_seed {
            emulator.seed_rng(seed);
        }
        Ok(emulator)
    }

    /// Create an emulator and load the raw ROM image at `path` into it
    pub fn with_game_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let program = fs::read(path)?;
        let mut emulator = Emulator::new(None);
        emulator.load_program(&program)?;
        Ok(emulator)
    }

    /// Put every piece of machine state back to its power-on value: memory cleared apart
    /// from the font set, registers, timers and stack zeroed, PC at 0x200
    pub fn reset(&mut self) {
        self.memory = [0; MEMORY_SIZE];
        self.memory[FONT_START..FONT_START + FONT_SET.len()].copy_from_slice(&FONT_SET);

        self.stack = [0; STACK_DEPTH];
        self.sp = 0;
        self.addr = 0;
        self.pc = STARTING_MEMORY_BYTE as u16;
        self.v = [0; NUM_REGISTERS];
        self.delay_timer = 0;
        self.set_sound_timer(0);

        self.graphics.clear();
        self.keyboard.reset();
        self.state = ExecState::Running;
        self.unrecognized = 0;

        debug!(self.logger, "reset interpreter");
    }

    /// Copy a raw program image into memory starting at 0x200. Memory is left untouched
    /// if the program does not fit
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        let capacity = MEMORY_SIZE - STARTING_MEMORY_BYTE;
        if program.len() > capacity {
            return Err(Error::LoadCapacity {
                len: program.len(),
                capacity,
            });
        }

        let end = STARTING_MEMORY_BYTE + program.len();
        self.memory[STARTING_MEMORY_BYTE..end].copy_from_slice(program);

        debug!(self.logger, "loaded program"; "bytes" => program.len());
        Ok(())
    }

    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn set_speaker<S: AsSpeaker + 'static>(&mut self, speaker: S) {
        self.speaker = Some(Box::new(speaker));
    }

    /// Run one cycle: execute the instruction at the program counter, then tick the
    /// timers. Returns the op that was executed, or None while waiting on a key press
    /// or after skipping an unrecognized opcode
    pub fn cycle(&mut self) -> Result<Option<Op>> {
        let op = match self.fetch_and_execute() {
            Ok(op) => op,
            Err(e) => {
                error!(self.logger, "halting"; "pc" => format!("{:#06X}", self.pc), "error" => e.to_string());
                return Err(e);
            }
        };

        self.tick_timers();
        Ok(op)
    }

    /// Execute exactly one instruction without touching the timers. Hosts that pace the
    /// 60 Hz timers themselves call this and `tick_timers` at their own rates
    pub fn step(&mut self) -> Result<()> {
        self.fetch_and_execute().map(|_| ())
    }

    fn fetch_and_execute(&mut self) -> Result<Option<Op>> {
        if let ExecState::AwaitingKey(x) = self.state {
            self.resolve_key_wait(x);
            return Ok(None);
        }

        let opcode = self.fetch()?;
        match Op::try_from(opcode) {
            Ok(op) => {
                trace!(self.logger, "execute";
                    "pc" => format!("{:#06X}", self.pc),
                    "opcode" => format!("{:#06X}", opcode),
                    "op" => format!("{:?}", op));
                self.execute(op)?;
                Ok(Some(op))
            }
            Err(Error::UnrecognizedOpcode { opcode }) => {
                warn!(self.logger, "skipping unrecognized opcode";
                    "pc" => format!("{:#06X}", self.pc),
                    "opcode" => format!("{:#06X}", opcode));
                self.unrecognized += 1;
                self.advance();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Read the big endian opcode at the program counter
    fn fetch(&self) -> Result<u16> {
        let pc = self.pc as usize;
        if pc + 1 >= MEMORY_SIZE {
            return Err(Error::FetchOutOfBounds { pc: self.pc });
        }

        Ok(((self.memory[pc] as u16) << 8) | self.memory[pc + 1] as u16)
    }

    fn resolve_key_wait(&mut self, x: u8) {
        if let Some(key) = self.keyboard.take_press() {
            debug!(self.logger, "key wait resolved"; "register" => x, "key" => key.index());
            self.v[x as usize] = key.index() as u8;
            self.state = ExecState::Running;
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// skip the next instruction when `cond` holds
    fn skip_if(&mut self, cond: bool) {
        self.pc = self.pc.wrapping_add(if cond { 4 } else { 2 });
    }

    /// Fail unless all `len` bytes starting at `start` are inside memory
    fn check_mem_range(start: usize, len: usize) -> Result<()> {
        if len > 0 && start + len > MEMORY_SIZE {
            return Err(Error::MemoryOutOfBounds {
                addr: start.max(MEMORY_SIZE),
            });
        }
        Ok(())
    }

    /// Apply the semantics of a single decoded op to the machine state. Every op leaves
    /// the program counter at the next instruction to run
    pub fn execute(&mut self, op: Op) -> Result<()> {
        match op {
            Op::CallRca { addr } => {
                warn!(self.logger, "ignoring machine code call"; "addr" => format!("{:#05X}", addr));
                self.advance();
            }
            Op::DispClear => {
                self.graphics.clear();
                self.advance();
            }
            Op::Return => {
                if self.sp == 0 {
                    return Err(Error::StackUnderflow { pc: self.pc });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp];
                self.stack[self.sp] = 0;
            }
            Op::Goto { addr } => self.pc = addr,
            Op::CallSub { addr } => {
                if self.sp == STACK_DEPTH {
                    return Err(Error::StackOverflow { pc: self.pc });
                }
                self.stack[self.sp] = self.pc.wrapping_add(2);
                self.sp += 1;
                self.pc = addr;
            }
            Op::CondVxEq { x, nn } => self.skip_if(self.v[x as usize] == nn),
            Op::CondVxNe { x, nn } => self.skip_if(self.v[x as usize] != nn),
            Op::CondVxVyEq { x, y } => self.skip_if(self.v[x as usize] == self.v[y as usize]),
            Op::ConstSetVx { x, nn } => {
                self.v[x as usize] = nn;
                self.advance();
            }
            Op::ConstAddVx { x, nn } => {
                self.v[x as usize] = self.v[x as usize].wrapping_add(nn);
                self.advance();
            }
            Op::Assign { x, y } => {
                self.v[x as usize] = self.v[y as usize];
                self.advance();
            }
            Op::BitOr { x, y } => {
                self.v[x as usize] |= self.v[y as usize];
                self.advance();
            }
            Op::BitAnd { x, y } => {
                self.v[x as usize] &= self.v[y as usize];
                self.advance();
            }
            Op::BitXor { x, y } => {
                self.v[x as usize] ^= self.v[y as usize];
                self.advance();
            }
            // the flag ops write VF last so it wins when x is 0xF
            Op::Add { x, y } => {
                let (sum, carry) = self.v[x as usize].overflowing_add(self.v[y as usize]);
                self.set_with_flag(x, sum, carry);
            }
            Op::Sub { x, y } => {
                let (vx, vy) = (self.v[x as usize], self.v[y as usize]);
                self.set_with_flag(x, vx.wrapping_sub(vy), vx >= vy);
            }
            Op::ShiftRight { x } => {
                let vx = self.v[x as usize];
                self.set_with_flag(x, vx >> 1, vx & 0x1 == 1);
            }
            Op::SubN { x, y } => {
                let (vx, vy) = (self.v[x as usize], self.v[y as usize]);
                self.set_with_flag(x, vy.wrapping_sub(vx), vy >= vx);
            }
            Op::ShiftLeft { x } => {
                let vx = self.v[x as usize];
                self.set_with_flag(x, vx << 1, vx >> 7 == 1);
            }
            Op::CondVxVyNe { x, y } => self.skip_if(self.v[x as usize] != self.v[y as usize]),
            Op::SetI { addr } => {
                self.addr = addr;
                self.advance();
            }
            Op::GotoPlusV0 { addr } => self.pc = addr + self.v[0] as u16,
            Op::Rand { x, nn } => {
                self.v[x as usize] = self.rng.gen::<u8>() & nn;
                self.advance();
            }
            Op::Draw { x, y, n } => {
                self.draw(self.v[x as usize], self.v[y as usize], n)?;
                self.advance();
            }
            Op::SkipKeyDown { x } => {
                let pressed = self.keyboard.get_key_state(self.v[x as usize] as usize);
                self.skip_if(pressed);
            }
            Op::SkipKeyUp { x } => {
                let pressed = self.keyboard.get_key_state(self.v[x as usize] as usize);
                self.skip_if(!pressed);
            }
            Op::DelayGet { x } => {
                self.v[x as usize] = self.delay_timer;
                self.advance();
            }
            Op::WaitKey { x } => {
                // the program counter stays on this instruction until a key arrives
                debug!(self.logger, "waiting on key press"; "register" => x);
                self.keyboard.listen();
                self.state = ExecState::AwaitingKey(x);
            }
            Op::DelaySet { x } => {
                self.delay_timer = self.v[x as usize];
                self.advance();
            }
            Op::SoundSet { x } => {
                self.set_sound_timer(self.v[x as usize]);
                self.advance();
            }
            Op::AddI { x } => {
                self.addr = self.addr.wrapping_add(self.v[x as usize] as u16);
                self.advance();
            }
            Op::FontChar { x } => {
                let digit = (self.v[x as usize] & 0xF) as usize;
                self.addr = (FONT_START + digit * NUM_BYTES_IN_FONT_CHAR) as u16;
                self.advance();
            }
            Op::Bcd { x } => {
                let start = self.addr as usize;
                Self::check_mem_range(start, 3)?;

                let vx = self.v[x as usize];
                self.memory[start] = vx / 100;
                self.memory[start + 1] = vx / 10 % 10;
                self.memory[start + 2] = vx % 10;
                self.advance();
            }
            Op::RegDump { x } => {
                let start = self.addr as usize;
                let count = x as usize + 1;
                Self::check_mem_range(start, count)?;

                self.memory[start..start + count].copy_from_slice(&self.v[..count]);
                self.advance();
            }
            Op::RegLoad { x } => {
                let start = self.addr as usize;
                let count = x as usize + 1;
                Self::check_mem_range(start, count)?;

                self.v[..count].copy_from_slice(&self.memory[start..start + count]);
                self.advance();
            }
        }

        Ok(())
    }

    /// Write `value` to Vx and then the flag to VF, then move on to the next instruction
    fn set_with_flag(&mut self, x: u8, value: u8, flag: bool) {
        self.v[x as usize] = value;
        self.v[FLAG] = flag as u8;
        self.advance();
    }

    /// XOR an 8 pixel wide, `n` row tall sprite read from I onto the screen at
    /// (`x`, `y`). VF is set to 1 if any pixel was turned off
    fn draw(&mut self, x: u8, y: u8, n: u8) -> Result<()> {
        let start = self.addr as usize;
        Self::check_mem_range(start, n as usize)?;

        let mut collision = false;
        for row in 0..n {
            let sprite = self.memory[start + row as usize];
            for col in 0..8u8 {
                let bit = (sprite >> (7 - col)) & 1 == 1;
                // u8 wrapping keeps (v + col) mod 64 and (v + row) mod 32 intact
                collision |= self
                    .graphics
                    .xor_set(x.wrapping_add(col), y.wrapping_add(row), bit);
            }
        }

        self.graphics.mark_dirty();
        self.v[FLAG] = collision as u8;
        Ok(())
    }

    /// Count the delay and sound timers down by one. The speaker hears about the sound
    /// timer running out exactly once
    pub fn tick_timers(&mut self) {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }

        if self.sound_timer > 0 {
            self.sound_timer -= 1;
            if self.sound_timer == 0 {
                debug!(self.logger, "tone stop");
                if let Some(speaker) = self.speaker.as_mut() {
                    speaker.stop_tone();
                }
            }
        }
    }

    /// Overwrite the sound timer, telling the speaker when that starts or silences the tone
    fn set_sound_timer(&mut self, ticks: u8) {
        let was_playing = self.sound_timer > 0;
        self.sound_timer = ticks;

        if !was_playing && ticks > 0 {
            debug!(self.logger, "tone start"; "ticks" => ticks);
            if let Some(speaker) = self.speaker.as_mut() {
                speaker.start_tone();
            }
        } else if was_playing && ticks == 0 {
            debug!(self.logger, "tone stop"; "cause" => "timer overwritten");
            if let Some(speaker) = self.speaker.as_mut() {
                speaker.stop_tone();
            }
        }
    }

    pub fn is_tone_playing(&self) -> bool {
        self.sound_timer > 0
    }

    /// Poll the host keyboard and update which of the 16 keys are up or down
    pub fn handle_key_input<K: AsKeyboard>(&mut self, keyboard: &K) {
        self.keyboard.update_keyboard_with_keys(&keyboard.keys_down());
    }

    pub fn key_down(&mut self, key: Key) {
        self.keyboard.handle_key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.keyboard.handle_key_up(key);
    }

    pub fn set_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.key_down(key);
        } else {
            self.key_up(key);
        }
    }

    pub fn keys(&self) -> [bool; keyboard::NUM_KEYS] {
        self.keyboard.snapshot()
    }

    pub fn exec_state(&self) -> ExecState {
        self.state
    }

    pub fn is_awaiting_key(&self) -> bool {
        self.state != ExecState::Running
    }

    /// Abandon a pending FX0A wait: the register is left as is and execution resumes
    /// after the instruction. Returns false if nothing was waiting
    pub fn cancel_key_wait(&mut self) -> bool {
        if let ExecState::AwaitingKey(x) = self.state {
            debug!(self.logger, "key wait cancelled"; "register" => x);
            self.keyboard.stop_listening();
            self.state = ExecState::Running;
            self.advance();
            return true;
        }
        false
    }

    pub fn get_pixels(&self) -> &[bool] {
        self.graphics.pixels()
    }

    pub fn is_display_dirty(&self) -> bool {
        self.graphics.is_dirty()
    }

    /// Mark the current frame as consumed by the renderer
    pub fn clear_display_dirty(&mut self) {
        self.graphics.clear_dirty();
    }

    /// Return the dirty flag and clear it in one go
    pub fn take_display_dirty(&mut self) -> bool {
        let dirty = self.graphics.is_dirty();
        self.graphics.clear_dirty();
        dirty
    }

    /// Number of unrecognized opcodes skipped since the last reset
    pub fn unrecognized_count(&self) -> u64 {
        self.unrecognized
    }
}
