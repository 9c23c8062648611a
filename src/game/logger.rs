//! Centralized logger for game events
//!
//! The logger lives on the `GameState` - no global state, so multiple game
//! instances can log independently. Tests run with `OutputMode::Memory` and
//! inspect the captured entries.

use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};

/// Verbosity level for game output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Silent - no output during game
    Silent = 0,
    /// Minimal - only game outcome
    Minimal = 1,
    /// Normal - turns and key actions (default)
    #[default]
    Normal = 2,
    /// Verbose - every resolved event and trigger
    Verbose = 3,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Output only to stdout (default)
    #[default]
    Stdout,
    /// Capture only to the in-memory buffer (no stdout)
    Memory,
    /// Both stdout and in-memory buffer
    Both,
}

/// A captured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
}

/// Centralized logger with verbosity filtering and optional memory capture
#[derive(Debug)]
pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    log_buffer: RefCell<Vec<LogEntry>>,
}

impl GameLogger {
    pub fn new() -> Self {
        GameLogger {
            verbosity: VerbosityLevel::default(),
            output_mode: OutputMode::default(),
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            ..GameLogger::new()
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    /// Log at a specific level; filtered by the current verbosity
    pub fn log(&self, level: VerbosityLevel, message: &str) {
        if level > self.verbosity {
            return;
        }
        match self.output_mode {
            OutputMode::Stdout => println!("{message}"),
            OutputMode::Memory => self.capture(level, message),
            OutputMode::Both => {
                println!("{message}");
                self.capture(level, message);
            }
        }
    }

    pub fn minimal(&self, message: &str) {
        self.log(VerbosityLevel::Minimal, message);
    }

    pub fn normal(&self, message: &str) {
        self.log(VerbosityLevel::Normal, message);
    }

    pub fn verbose(&self, message: &str) {
        self.log(VerbosityLevel::Verbose, message);
    }

    fn capture(&self, level: VerbosityLevel, message: &str) {
        self.log_buffer.borrow_mut().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }

    /// Read-only access to captured entries (Memory/Both modes)
    pub fn entries(&self) -> Ref<'_, Vec<LogEntry>> {
        self.log_buffer.borrow()
    }

    pub fn clear(&self) {
        self.log_buffer.borrow_mut().clear();
    }
}

impl Default for GameLogger {
    fn default() -> Self {
        GameLogger::new()
    }
}
