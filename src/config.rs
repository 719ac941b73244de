use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use slog::Logger;
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Knobs a host can set when building an `Emulator`. Every field has a default, so
/// a partial document deserializes fine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// minimum severity written by the terminal logger
    pub log_level: Severity,
    /// seed for the CXNN random source, taken from entropy when unset
    pub rng_seed: Option<u64>,
    /// cycles the bundled runner executes between two display polls
    pub cycles_per_frame: u32,
    /// the bundled runner stops after this many cycles
    pub max_cycles: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: Severity::Info,
            rng_seed: None,
            cycles_per_frame: 10,
            max_cycles: None,
        }
    }
}

impl Config {
    /// Build a stderr terminal logger filtered at `log_level`
    pub fn build_logger(&self) -> Result<Logger> {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(self.log_level);
        builder.destination(Destination::Stderr);

        builder.build().map_err(|e| Error::Logger(e.to_string()))
    }
}
