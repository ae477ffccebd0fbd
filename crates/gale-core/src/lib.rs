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

//! # Gale Core
//!
//! Foundational data types of the gale engine: the dynamic array backing
//! every registry, the token reader and the typed variable used as the data
//! interchange format between modules.

#![warn(missing_docs)]

pub mod collection;
pub mod env;
pub mod error;
pub mod reader;
pub mod utils;
pub mod var;

pub use collection::{DynArray, NameIndex};
pub use env::{StandaloneEnv, VarEnv};
pub use error::VarError;
pub use reader::{Reader, Token};
pub use utils::timer::Stopwatch;
pub use var::{Float, Int, Var, VarArray, VarType, VarValidator, VarValue};
