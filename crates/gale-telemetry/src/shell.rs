// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The shell channel: leveled console output with an error stack.
//!
//! Messages at or below the current [`ShellLevel`] reach the print callback
//! registered by the embedding shell. Every message is also appended to the
//! log file when logging is on, and forwarded to the `log` facade.
//!
//! The error stack holds context lines describing what the engine is doing
//! ("In mod: x", "In VarValidator for: y"). They stay silent until an error
//! is printed, at which point the context lines not yet shown are printed
//! first, indented by depth.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gale_core::DynArray;

/// Importance of a shell message. Lower is more important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ShellLevel {
    /// Messages meant for the user.
    User = 0,
    /// Errors.
    #[default]
    Error = 1,
    /// General information.
    Info = 2,
    /// Debug output.
    Debug = 3,
    /// Verbose debug output.
    HardDebug = 4,
}

impl ShellLevel {
    /// Converts a numeric level, clamping it to `User..=HardDebug`.
    pub fn clamped(level: i32) -> Self {
        match level {
            i32::MIN..=0 => ShellLevel::User,
            1 => ShellLevel::Error,
            2 => ShellLevel::Info,
            3 => ShellLevel::Debug,
            _ => ShellLevel::HardDebug,
        }
    }

    /// Tag written in front of the message in the log file.
    pub fn prefix(self) -> &'static str {
        match self {
            ShellLevel::User => "",
            ShellLevel::Error => "ERROR| ",
            ShellLevel::Info => "INFO | ",
            ShellLevel::Debug => "DEBUG| ",
            ShellLevel::HardDebug => "# ",
        }
    }

    /// The `log` level a shell message is forwarded at.
    pub fn log_level(self) -> log::Level {
        match self {
            ShellLevel::User | ShellLevel::Info => log::Level::Info,
            ShellLevel::Error => log::Level::Error,
            ShellLevel::Debug => log::Level::Debug,
            ShellLevel::HardDebug => log::Level::Trace,
        }
    }
}

impl From<log::Level> for ShellLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => ShellLevel::Error,
            log::Level::Warn | log::Level::Info => ShellLevel::Info,
            log::Level::Debug => ShellLevel::Debug,
            log::Level::Trace => ShellLevel::HardDebug,
        }
    }
}

impl fmt::Display for ShellLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Receives the messages the shell displays.
pub type PrintCallback = Arc<dyn Fn(ShellLevel, &str) + Send + Sync>;

const STACK_PREFIX: &str = "STACK| ";
const LOG_TARGET: &str = "gale::shell";

struct ShellState {
    level: ShellLevel,
    print: Option<PrintCallback>,
    log_file: Option<File>,
    stack: DynArray<String>,
    printed: usize,
}

impl ShellState {
    fn write_log(&mut self, prefix: &str, msg: &str) {
        if let Some(file) = self.log_file.as_mut() {
            if let Err(e) = writeln!(file, "{prefix}{msg}") {
                log::warn!(target: LOG_TARGET, "Failed to write shell log: {e}");
            }
        }
    }
}

/// Thread-safe leveled output channel.
pub struct ShellChannel {
    state: Mutex<ShellState>,
}

impl fmt::Debug for ShellChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ShellChannel")
            .field("level", &state.level)
            .field("logging", &state.log_file.is_some())
            .field("stack_depth", &state.stack.len())
            .finish()
    }
}

impl Default for ShellChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellChannel {
    /// Creates a channel showing errors and user messages, with no callback.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ShellState {
                level: ShellLevel::Error,
                print: None,
                log_file: None,
                stack: DynArray::new(),
                printed: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ShellState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current display level.
    pub fn level(&self) -> ShellLevel {
        self.lock().level
    }

    /// Changes the display level.
    pub fn set_level(&self, level: ShellLevel) {
        self.lock().level = level;
    }

    /// Installs the callback receiving displayed messages.
    pub fn set_print_callback<F>(&self, callback: F)
    where
        F: Fn(ShellLevel, &str) + Send + Sync + 'static,
    {
        self.lock().print = Some(Arc::new(callback));
    }

    /// Removes the print callback.
    pub fn clear_print_callback(&self) {
        self.lock().print = None;
    }

    /// Appends every following message to `path`, closing any previous log.
    pub fn start_logging(&self, path: &Path) -> io::Result<()> {
        self.stop_logging();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.lock().log_file = Some(file);
        log::info!(target: LOG_TARGET, "*** Starting shell logging to file: {} ***", path.display());
        Ok(())
    }

    /// Closes the log file, if any.
    pub fn stop_logging(&self) {
        let mut state = self.lock();
        if state.log_file.is_some() {
            state.write_log(ShellLevel::Info.prefix(), "*** End of log ***");
            state.log_file = None;
        }
    }

    /// Returns `true` while a log file is open.
    pub fn is_logging(&self) -> bool {
        self.lock().log_file.is_some()
    }

    /// Prints a message.
    pub fn print(&self, level: ShellLevel, msg: &str) {
        let mut shown: Vec<String> = Vec::new();
        let callback = {
            let mut state = self.lock();
            if level == ShellLevel::Error {
                let pending: Vec<String> =
                    state.stack.iter().skip(state.printed).cloned().collect();
                state.printed = state.stack.len();
                for line in pending {
                    state.write_log(STACK_PREFIX, &line);
                    log::error!(target: LOG_TARGET, "{line}");
                    shown.push(line);
                }
            }
            state.write_log(level.prefix(), msg);
            if level <= state.level {
                shown.push(msg.to_owned());
                state.print.clone()
            } else {
                shown.clear();
                None
            }
        };

        log::log!(target: LOG_TARGET, level.log_level(), "{msg}");

        if let Some(callback) = callback {
            for line in &shown {
                callback(level, line);
            }
        }
    }

    /// Pushes a context line on the error stack.
    pub fn push_context(&self, msg: &str) {
        let mut state = self.lock();
        let line = format!("{}{msg}", " ".repeat(state.stack.len()));
        log::trace!(target: LOG_TARGET, "{line}");
        state.stack.append(line);
    }

    /// Pops the innermost context line.
    pub fn pop_context(&self) {
        let underrun = {
            let mut state = self.lock();
            let len = state.stack.len();
            if len == 0 {
                true
            } else {
                state.stack.remove(len - 1);
                state.printed = state.printed.min(len - 1);
                false
            }
        };
        if underrun {
            self.print(ShellLevel::Error, "Error stack underrun.");
        }
    }

    /// Current depth of the error stack.
    pub fn stack_depth(&self) -> usize {
        self.lock().stack.len()
    }
}

impl Drop for ShellChannel {
    fn drop(&mut self) {
        self.stop_logging();
    }
}
