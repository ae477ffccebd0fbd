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

//! The parse environment of typed variables.
//!
//! Parsing a value can require services owned by the embedding engine: a
//! translation table for `&"..."` strings, a shell for nested function calls,
//! the active mod directory for links and a diagnostics channel. [`VarEnv`]
//! gathers them; every method has a standalone default.

use std::path::{Path, PathBuf};

use crate::error::VarError;
use crate::reader::Reader;
use crate::var::Var;

/// Services available to the typed-variable parser.
pub trait VarEnv {
    /// Translates a string flagged with a leading `&`.
    fn translate(&self, text: &str) -> String {
        text.to_owned()
    }

    /// Executes the shell call starting at the current token of `reader`.
    ///
    /// The current token is the leading identifier of the call.
    fn exec_call(&self, reader: &mut Reader) -> Result<Var, VarError> {
        let _ = reader;
        Err(VarError::Call("no shell available".to_owned()))
    }

    /// Resolves a data-relative path (links, `read_file`).
    fn resolve_path(&self, path: &str) -> PathBuf {
        Path::new(path).to_path_buf()
    }

    /// Reports a diagnostic.
    fn report(&self, level: log::Level, msg: &str) {
        log::log!(level, "{msg}");
    }

    /// Opens an error context; following reports belong to it until popped.
    fn push_context(&self, msg: &str) {
        log::debug!("{msg}");
    }

    /// Closes the innermost error context.
    fn pop_context(&self) {}
}

/// Environment with every default: no translation, no shell, paths used as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandaloneEnv;

impl VarEnv for StandaloneEnv {}
