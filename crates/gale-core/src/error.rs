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

//! Error type of the typed-variable layer.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while parsing, building or loading typed variables.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VarError {
    /// The token stream did not match the value grammar.
    #[error("Parse error: {0}")]
    Syntax(String),
    /// A named child with the same name already sits in the array.
    #[error("A value named '{0}' already exists in this array")]
    DuplicateName(String),
    /// A file could not be read.
    #[error("Can't open file: {}", .0.display())]
    FileOpen(PathBuf),
    /// A file could not be written.
    #[error("Can't write file: {}", .0.display())]
    FileWrite(PathBuf),
    /// The operation only applies to arrays.
    #[error("'{0}' is not an array")]
    NotAnArray(String),
    /// A nested shell call failed or no shell is available.
    #[error("Shell call failed: {0}")]
    Call(String),
}
