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

//! # Gale Control
//!
//! The [`CoreEngine`] context object: modules plug into it through a set of
//! optional callbacks, expose shell functions, share typed resources and run
//! on cooperative scheduler threads.
//!
//! ```no_run
//! use gale_control::{CoreEngine, EngineConfig, ModuleCallbacks};
//! use gale_core::{Var, VarType};
//!
//! let engine = CoreEngine::new(EngineConfig::default());
//! let math = engine
//!     .declare_module(
//!         "math",
//!         ModuleCallbacks::new().on_shell(|_, call| {
//!             let sum = call.int_arg(0).unwrap_or(0) + call.int_arg(1).unwrap_or(0);
//!             call.ret = Var::from(sum);
//!         }),
//!     )
//!     .unwrap();
//! engine
//!     .declare_shell_function(math, "add", VarType::Int, &[VarType::Int, VarType::Int])
//!     .unwrap();
//! assert_eq!(engine.shell_exec("math.add(2,3)").unwrap().as_int(), Some(5));
//! ```

#![warn(missing_docs)]

mod builtins;
pub mod completion;
pub mod config;
mod data;
pub mod engine;
pub mod error;
pub mod ids;
pub mod module;
mod prefs;
pub mod resource;
pub mod scheduler;
pub mod shell;

pub use completion::{CompletionCursor, CompletionList};
pub use config::EngineConfig;
pub use engine::{CoreEngine, CORE_MODULE, SHELL_MODULE};
pub use error::CoreError;
pub use ids::{FunctionId, ModuleId, ResourceId, ThreadId, MAIN_THREAD};
pub use module::{
    CoreEvent, DataCallback, EventCallback, ModuleCallbacks, PrefsCallback, ResourceCallback,
    ShellCallback, ThreadCallback,
};
pub use scheduler::{CoreState, ThreadCommand, ThreadState};
pub use shell::{ShellCall, ShellFunction};
