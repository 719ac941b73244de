use thiserror::Error;

/// Everything that can go wrong while loading or running a CHIP-8 program.
///
/// All variants except [`Error::UnrecognizedOpcode`] are fatal to the current run:
/// the host should stop calling [`crate::Emulator::cycle`] and report them.
/// `UnrecognizedOpcode` is produced by the decoder and swallowed by
/// [`crate::Emulator::step`], which logs it and skips the instruction.
#[derive(Debug, Error)]
pub enum Error {
    #[error("program is {len} bytes but only {capacity} bytes are available from 0x200")]
    LoadCapacity { len: usize, capacity: usize },

    #[error("program counter {pc:#06X} points outside of memory")]
    FetchOutOfBounds { pc: u16 },

    #[error("call at {pc:#06X} exceeds the 16 level call stack")]
    StackOverflow { pc: u16 },

    #[error("return at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("memory access at {addr:#06X} is outside of memory")]
    MemoryOutOfBounds { addr: usize },

    #[error("unrecognized opcode {opcode:#06X}")]
    UnrecognizedOpcode { opcode: u16 },

    #[error("unable to read game file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to build logger: {0}")]
    Logger(String),
}

impl Error {
    /// Returns false only for errors a run can continue past
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::UnrecognizedOpcode { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
